//! An in-process stand-in for the SPIRE registration API.

use std::sync::{Mutex, MutexGuard};

use tonic::Status;

use crate::registration::{Registration, RegistrationEntry};
use crate::selector::SelectorSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String),
    Delete(String),
    List(String),
}

#[derive(Default)]
struct State {
    entries: Vec<RegistrationEntry>,
    next_id: u64,
    calls: Vec<Call>,
    create_failures: Vec<Status>,
    delete_failures: Vec<Status>,
    list_failures: Vec<Status>,
}

/// Enforces uniqueness of `(parent, spiffe id, selector set)` and answers
/// `AlreadyExists`/`NotFound` the way the server does. Entry ids are `E1`,
/// `E2`, ... in creation order.
#[derive(Default)]
pub struct InMemoryRegistration {
    state: Mutex<State>,
}

impl InMemoryRegistration {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn entries(&self) -> Vec<RegistrationEntry> {
        self.state().entries.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Places an entry directly, bypassing uniqueness checks.
    pub fn insert(&self, entry: RegistrationEntry) {
        self.state().entries.push(entry);
    }

    /// Removes an entry without recording a call, as an out-of-band delete.
    pub fn remove(&self, entry_id: &str) {
        self.state().entries.retain(|e| e.entry_id != entry_id);
    }

    pub fn fail_next_create(&self, status: Status) {
        self.state().create_failures.push(status);
    }

    pub fn fail_next_delete(&self, status: Status) {
        self.state().delete_failures.push(status);
    }

    pub fn fail_next_list(&self, status: Status) {
        self.state().list_failures.push(status);
    }
}

impl Registration for InMemoryRegistration {
    async fn create_entry(
        &self,
        parent_id: &str,
        spiffe_id: &str,
        selectors: &SelectorSet,
    ) -> Result<String, Status> {
        let mut state = self.state();
        state.calls.push(Call::Create(spiffe_id.to_owned()));
        if !state.create_failures.is_empty() {
            return Err(state.create_failures.remove(0));
        }

        let exists = state.entries.iter().any(|e| {
            e.parent_id == parent_id && e.spiffe_id == spiffe_id && selectors.matches(&e.selectors)
        });
        if exists {
            return Err(Status::already_exists("similar entry already exists"));
        }

        state.next_id += 1;
        let entry_id = format!("E{}", state.next_id);
        state.entries.push(RegistrationEntry {
            entry_id: entry_id.clone(),
            spiffe_id: spiffe_id.to_owned(),
            parent_id: parent_id.to_owned(),
            selectors: selectors.iter().cloned().collect(),
        });
        Ok(entry_id)
    }

    async fn delete_entry(&self, entry_id: &str) -> Result<(), Status> {
        let mut state = self.state();
        state.calls.push(Call::Delete(entry_id.to_owned()));
        if !state.delete_failures.is_empty() {
            return Err(state.delete_failures.remove(0));
        }

        let before = state.entries.len();
        state.entries.retain(|e| e.entry_id != entry_id);
        if state.entries.len() == before {
            return Err(Status::not_found(format!("no such registration entry {entry_id}")));
        }
        Ok(())
    }

    async fn list_by_parent_id(&self, parent_id: &str) -> Result<Vec<RegistrationEntry>, Status> {
        let mut state = self.state();
        state.calls.push(Call::List(parent_id.to_owned()));
        if !state.list_failures.is_empty() {
            return Err(state.list_failures.remove(0));
        }

        Ok(state
            .entries
            .iter()
            .filter(|e| e.parent_id == parent_id)
            .cloned()
            .collect())
    }
}
