use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use floe_application::{RegistryTransport, TransportError};
use tokio::sync::Mutex;
use tracing::debug;

use crate::registry_document::RegistryDocument;

/// Registry transport persisting tags and annotations to a local JSON file.
///
/// Writes go to a sibling temporary file that is renamed over the document,
/// so readers never observe a partially written registry.
#[derive(Debug)]
pub struct JsonFileRegistryTransport {
    registry: String,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileRegistryTransport {
    /// Creates a transport over the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            registry: format!("file://{}", path.display()),
            path,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<RegistryDocument, TransportError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Err(TransportError::Unavailable(format!(
                    "registry document '{}' does not exist",
                    self.path.display()
                )));
            }
            Err(error) => {
                return Err(TransportError::Unavailable(format!(
                    "failed to read registry document '{}': {error}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_str(&raw).map_err(|error| {
            TransportError::Unavailable(format!(
                "registry document '{}' is malformed: {error}",
                self.path.display()
            ))
        })
    }

    async fn store(&self, document: &RegistryDocument) -> Result<(), TransportError> {
        let encoded = serde_json::to_string_pretty(document).map_err(|error| {
            TransportError::Unavailable(format!("failed to encode registry document: {error}"))
        })?;

        let staging_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging_path, encoded)
            .await
            .map_err(|error| {
                TransportError::Unavailable(format!(
                    "failed to write registry document '{}': {error}",
                    staging_path.display()
                ))
            })?;
        tokio::fs::rename(&staging_path, &self.path)
            .await
            .map_err(|error| {
                TransportError::Unavailable(format!(
                    "failed to replace registry document '{}': {error}",
                    self.path.display()
                ))
            })?;

        debug!(path = %self.path.display(), "registry document written");
        Ok(())
    }

    async fn update<F>(&self, mutate: F) -> Result<(), TransportError>
    where
        F: FnOnce(&mut RegistryDocument) -> Result<(), TransportError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        mutate(&mut document)?;
        self.store(&document).await
    }
}

#[async_trait]
impl RegistryTransport for JsonFileRegistryTransport {
    fn registry(&self) -> &str {
        self.registry.as_str()
    }

    async fn get_digest(&self, tag: &str) -> Result<String, TransportError> {
        self.load().await?.digest(tag)
    }

    async fn create_tag(&self, name: &str, digest: &str) -> Result<(), TransportError> {
        self.update(|document| {
            document.set_tag(name, digest);
            Ok(())
        })
        .await
    }

    async fn list_tags(&self) -> Result<Vec<String>, TransportError> {
        Ok(self.load().await?.tag_names())
    }

    async fn get_annotations(&self, tag: &str) -> Result<BTreeMap<String, String>, TransportError> {
        self.load().await?.annotations(tag)
    }

    async fn set_annotations(
        &self,
        tag: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), TransportError> {
        self.update(|document| document.merge_annotations(tag, annotations))
            .await
    }
}
