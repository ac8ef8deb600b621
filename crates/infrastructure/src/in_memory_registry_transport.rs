use std::collections::BTreeMap;

use async_trait::async_trait;
use floe_application::{RegistryTransport, TransportError};
use tokio::sync::RwLock;

use crate::registry_document::RegistryDocument;

/// In-memory registry transport implementation.
#[derive(Debug)]
pub struct InMemoryRegistryTransport {
    registry: String,
    document: RwLock<RegistryDocument>,
}

impl InMemoryRegistryTransport {
    /// Creates an empty in-memory registry identified by `registry`.
    #[must_use]
    pub fn new(registry: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            document: RwLock::new(RegistryDocument::default()),
        }
    }

    /// Seeds an artifact under `tag` with the given manifest annotations.
    pub async fn push_artifact(
        &self,
        tag: &str,
        digest: &str,
        annotations: BTreeMap<String, String>,
    ) {
        let mut document = self.document.write().await;
        document.set_tag(tag, digest);
        document.annotate_digest(digest, annotations);
    }
}

#[async_trait]
impl RegistryTransport for InMemoryRegistryTransport {
    fn registry(&self) -> &str {
        self.registry.as_str()
    }

    async fn get_digest(&self, tag: &str) -> Result<String, TransportError> {
        self.document.read().await.digest(tag)
    }

    async fn create_tag(&self, name: &str, digest: &str) -> Result<(), TransportError> {
        self.document.write().await.set_tag(name, digest);
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<String>, TransportError> {
        Ok(self.document.read().await.tag_names())
    }

    async fn get_annotations(&self, tag: &str) -> Result<BTreeMap<String, String>, TransportError> {
        self.document.read().await.annotations(tag)
    }

    async fn set_annotations(
        &self,
        tag: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), TransportError> {
        self.document
            .write()
            .await
            .merge_annotations(tag, annotations)
    }
}
