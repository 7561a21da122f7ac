use std::future::Future;
use std::sync::Arc;

use spire_operator_api::{
    ParentId, RegistrationClient, RegistrationEntry as ApiEntry, RegistrationEntryId,
};
use tonic::Status;
use tonic::transport::Channel;

use crate::selector::{Selector, SelectorSet};

/// An entry as held by the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationEntry {
    pub entry_id: String,
    pub spiffe_id: String,
    pub parent_id: String,
    pub selectors: Vec<Selector>,
}

impl From<ApiEntry> for RegistrationEntry {
    fn from(entry: ApiEntry) -> Self {
        Self {
            entry_id: entry.entry_id,
            spiffe_id: entry.spiffe_id,
            parent_id: entry.parent_id,
            selectors: entry.selectors.into_iter().map(Selector::from).collect(),
        }
    }
}

/// Raw operations of the identity authority. Errors carry the gRPC status so
/// callers can tell `AlreadyExists` and `NotFound` apart from failures.
pub trait Registration: Send + Sync {
    fn create_entry(
        &self,
        parent_id: &str,
        spiffe_id: &str,
        selectors: &SelectorSet,
    ) -> impl Future<Output = Result<String, Status>> + Send;

    fn delete_entry(&self, entry_id: &str) -> impl Future<Output = Result<(), Status>> + Send;

    fn list_by_parent_id(
        &self,
        parent_id: &str,
    ) -> impl Future<Output = Result<Vec<RegistrationEntry>, Status>> + Send;
}

impl<R: Registration> Registration for Arc<R> {
    fn create_entry(
        &self,
        parent_id: &str,
        spiffe_id: &str,
        selectors: &SelectorSet,
    ) -> impl Future<Output = Result<String, Status>> + Send {
        (**self).create_entry(parent_id, spiffe_id, selectors)
    }

    fn delete_entry(&self, entry_id: &str) -> impl Future<Output = Result<(), Status>> + Send {
        (**self).delete_entry(entry_id)
    }

    fn list_by_parent_id(
        &self,
        parent_id: &str,
    ) -> impl Future<Output = Result<Vec<RegistrationEntry>, Status>> + Send {
        (**self).list_by_parent_id(parent_id)
    }
}

/// [`Registration`] backed by the SPIRE server registration gRPC API.
#[derive(Clone)]
pub struct GrpcRegistration {
    client: RegistrationClient<Channel>,
}

impl GrpcRegistration {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: RegistrationClient::new(channel),
        }
    }
}

impl Registration for GrpcRegistration {
    async fn create_entry(
        &self,
        parent_id: &str,
        spiffe_id: &str,
        selectors: &SelectorSet,
    ) -> Result<String, Status> {
        let request = ApiEntry {
            selectors: selectors.to_api(),
            parent_id: parent_id.to_owned(),
            spiffe_id: spiffe_id.to_owned(),
            ..Default::default()
        };
        let mut client = self.client.clone();
        let reply = client.create_entry(request).await?;
        Ok(reply.into_inner().id)
    }

    async fn delete_entry(&self, entry_id: &str) -> Result<(), Status> {
        let mut client = self.client.clone();
        client
            .delete_entry(RegistrationEntryId {
                id: entry_id.to_owned(),
            })
            .await?;
        Ok(())
    }

    async fn list_by_parent_id(&self, parent_id: &str) -> Result<Vec<RegistrationEntry>, Status> {
        let mut client = self.client.clone();
        let reply = client
            .list_by_parent_id(ParentId {
                id: parent_id.to_owned(),
            })
            .await?;
        Ok(reply
            .into_inner()
            .entries
            .into_iter()
            .map(RegistrationEntry::from)
            .collect())
    }
}
