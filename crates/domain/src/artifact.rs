use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Fully resolved artifact handed to gate collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactReference {
    /// Registry host or location the artifact lives in.
    pub registry: String,
    /// Human-readable tag that was resolved.
    pub tag: String,
    /// Content digest the tag resolved to.
    pub digest: String,
}

impl ArtifactReference {
    /// Creates an artifact reference.
    #[must_use]
    pub fn new(
        registry: impl Into<String>,
        tag: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            tag: tag.into(),
            digest: digest.into(),
        }
    }
}

impl Display for ArtifactReference {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}@{}", self.registry, self.tag, self.digest)
    }
}
