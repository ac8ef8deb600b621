use std::collections::BTreeMap;

use floe_application::TransportError;
use serde::{Deserialize, Serialize};

/// Tag and manifest-annotation state of a single repository.
///
/// Annotations are keyed by digest so every tag pointing at a manifest sees
/// the same metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RegistryDocument {
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    annotations: BTreeMap<String, BTreeMap<String, String>>,
}

impl RegistryDocument {
    pub(crate) fn digest(&self, tag: &str) -> Result<String, TransportError> {
        self.tags
            .get(tag)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(format!("manifest unknown: tag '{tag}'")))
    }

    pub(crate) fn set_tag(&mut self, name: &str, digest: &str) {
        self.tags.insert(name.to_owned(), digest.to_owned());
    }

    pub(crate) fn tag_names(&self) -> Vec<String> {
        self.tags.keys().cloned().collect()
    }

    pub(crate) fn annotations(&self, tag: &str) -> Result<BTreeMap<String, String>, TransportError> {
        let digest = self.digest(tag)?;
        Ok(self.annotations.get(&digest).cloned().unwrap_or_default())
    }

    pub(crate) fn merge_annotations(
        &mut self,
        tag: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), TransportError> {
        let digest = self.digest(tag)?;
        self.annotate_digest(&digest, annotations);
        Ok(())
    }

    pub(crate) fn annotate_digest(&mut self, digest: &str, annotations: BTreeMap<String, String>) {
        self.annotations
            .entry(digest.to_owned())
            .or_default()
            .extend(annotations);
    }
}
