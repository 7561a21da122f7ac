use std::future::Future;

use crate::Result;
use crate::registration::{Registration, RegistrationEntry};
use crate::selector::SelectorSet;

/// Recovers the id of an existing entry after the authority refused a create
/// with `AlreadyExists`.
pub trait EntryLookup: Send + Sync {
    fn find_entry<R: Registration>(
        &self,
        registration: &R,
        parent_id: &str,
        spiffe_id: &str,
        selectors: &SelectorSet,
    ) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Lists every entry under the parent and scans for a match. Linear in the
/// number of entries under the parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListByParent;

impl EntryLookup for ListByParent {
    async fn find_entry<R: Registration>(
        &self,
        registration: &R,
        parent_id: &str,
        spiffe_id: &str,
        selectors: &SelectorSet,
    ) -> Result<Option<String>> {
        let entries = registration.list_by_parent_id(parent_id).await?;
        Ok(first_match(&entries, spiffe_id, selectors).map(|e| e.entry_id.clone()))
    }
}

/// The first entry, in list order, with the same SPIFFE ID and selector set.
pub fn first_match<'a>(
    entries: &'a [RegistrationEntry],
    spiffe_id: &str,
    selectors: &SelectorSet,
) -> Option<&'a RegistrationEntry> {
    entries
        .iter()
        .find(|entry| entry.spiffe_id == spiffe_id && selectors.matches(&entry.selectors))
}
