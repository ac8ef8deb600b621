use serde::{Deserialize, Serialize};

/// Operator performing a promotion or rollback, with groups resolved by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorIdentity {
    subject: String,
    groups: Vec<String>,
}

impl OperatorIdentity {
    /// Creates an operator identity from its subject and group memberships.
    #[must_use]
    pub fn new(subject: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            groups,
        }
    }

    /// Returns the stable operator subject (usually an e-mail or CI principal).
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the groups the operator belongs to.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        self.groups.as_slice()
    }
}
