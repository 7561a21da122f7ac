pub mod spire {
    pub mod common {
        tonic::include_proto!("spire.common");
    }

    pub mod api {
        pub mod registration {
            tonic::include_proto!("spire.api.registration");
        }
    }
}

pub use spire::api::registration::registration_client::RegistrationClient;
pub use spire::api::registration::{ParentId, RegistrationEntryId};
pub use spire::common::{RegistrationEntries, RegistrationEntry, Selector};
