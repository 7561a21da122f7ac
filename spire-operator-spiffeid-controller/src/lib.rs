mod context;
mod controller;
mod error;
mod finalizer;
mod resource;
mod runtime;
mod selector;

pub use error::Error;
pub use finalizer::Finalizer;
pub use resource::SpiffeIdResource;
pub use runtime::start_spiffeid_controllers;
pub use selector::{K8S_SELECTOR_TYPE, build_selectors};

pub type Result<T> = std::result::Result<T, Error>;
