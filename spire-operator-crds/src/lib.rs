use thiserror::Error;

pub mod v1alpha1;

use kube::CustomResourceExt;

pub const GROUP: &str = "spiffeid.spiffe.io";

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("yaml error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

pub fn crd_gen_spiffeid() -> Result<()> {
    print!(
        "---\n{}",
        serde_yaml::to_string(&v1alpha1::spiffe_id::SpiffeId::crd())?
    );
    Ok(())
}

pub fn crd_gen_cluster_spiffeid() -> Result<()> {
    print!(
        "---\n{}",
        serde_yaml::to_string(&v1alpha1::spiffe_id::ClusterSpiffeId::crd())?
    );
    Ok(())
}

pub fn crd_gen_all() -> Result<()> {
    let crds = vec![
        v1alpha1::spiffe_id::SpiffeId::crd(),
        v1alpha1::spiffe_id::ClusterSpiffeId::crd(),
    ];
    for crd in crds {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
