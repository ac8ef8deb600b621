use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a registry transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The tag or manifest does not exist. The registry itself answered.
    #[error("not found: {0}")]
    NotFound(String),

    /// The registry could not be reached or returned a server-side failure.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Port for the OCI registry holding artifacts, tags and manifest annotations.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Returns the registry identity used to key circuit breakers and messages.
    fn registry(&self) -> &str;

    /// Resolves a tag to its content digest.
    async fn get_digest(&self, tag: &str) -> Result<String, TransportError>;

    /// Creates or moves a tag so it points at the digest.
    async fn create_tag(&self, name: &str, digest: &str) -> Result<(), TransportError>;

    /// Lists every tag in the repository.
    async fn list_tags(&self) -> Result<Vec<String>, TransportError>;

    /// Returns the manifest annotations of the tagged artifact.
    async fn get_annotations(&self, tag: &str) -> Result<BTreeMap<String, String>, TransportError>;

    /// Merges the given keys into the manifest annotations of the tagged artifact.
    async fn set_annotations(
        &self,
        tag: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), TransportError>;
}
