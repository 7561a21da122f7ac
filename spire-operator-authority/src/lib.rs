mod authority;
mod bootstrap;
mod connect;
mod error;
mod lookup;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
mod registration;
mod selector;
mod spiffe;

pub use authority::{Authority, DeletePolicy, OPERATOR_SELECTOR_TYPE, operator_spiffe_id};
pub use bootstrap::OperatorIdentity;
pub use connect::connect;
pub use error::Error;
pub use lookup::{EntryLookup, ListByParent, first_match};
pub use registration::{GrpcRegistration, Registration, RegistrationEntry};
pub use selector::{Selector, SelectorSet};
pub use spiffe::SpiffeId;

pub type Result<T, E = Error> = std::result::Result<T, E>;
