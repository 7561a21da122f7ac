use crate::PodIdentityMode;

pub struct Context<S> {
    pub trust_domain: String,
    pub mode: PodIdentityMode,
    pub store: S,
}
