mod context;
mod controller;
mod derive;
mod error;
mod runtime;

pub use derive::PodIdentityMode;
pub use error::Error;
pub use runtime::start_pod_controller;

pub type Result<T> = std::result::Result<T, Error>;
