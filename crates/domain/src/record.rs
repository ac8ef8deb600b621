use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use floe_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gate::GateResult;

/// Which authorization rule admitted an operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AuthorizedVia {
    /// Target environment has no authorization rule.
    NoConfig,
    /// Operator belongs to the named allowed group.
    Group(String),
    /// Operator is listed individually.
    Operator(String),
    /// No rule matched.
    Denied,
}

impl Display for AuthorizedVia {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoConfig => formatter.write_str("no_config"),
            Self::Group(group) => write!(formatter, "group:{group}"),
            Self::Operator(operator) => write!(formatter, "operator:{operator}"),
            Self::Denied => formatter.write_str("denied"),
        }
    }
}

impl From<AuthorizedVia> for String {
    fn from(value: AuthorizedVia) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for AuthorizedVia {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "no_config" => Ok(Self::NoConfig),
            "denied" => Ok(Self::Denied),
            other => {
                if let Some(group) = other.strip_prefix("group:") {
                    return Ok(Self::Group(group.to_owned()));
                }
                if let Some(operator) = other.strip_prefix("operator:") {
                    return Ok(Self::Operator(operator.to_owned()));
                }
                Err(AppError::Validation(format!(
                    "unknown authorized_via value '{other}'"
                )))
            }
        }
    }
}

/// Result of evaluating an operator against an environment rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    /// Whether the operator may proceed.
    pub passed: bool,
    /// Rule that produced the decision.
    pub via: AuthorizedVia,
}

/// Fields captured when a promotion succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPromotionRecord {
    /// Digest the environment tag points at.
    pub artifact_digest: String,
    /// Environment promoted from.
    pub source_environment: String,
    /// Environment promoted to.
    pub target_environment: String,
    /// Operator identity.
    pub operator: String,
    /// Groups resolved for the operator at authorization time.
    pub operator_groups: Vec<String>,
    /// Authorization decision.
    pub authorization: AuthorizationDecision,
    /// Gate results in execution order.
    pub gate_results: Vec<GateResult>,
    /// Whether the signature gate verified the artifact.
    pub signature_verified: bool,
    /// Distributed trace correlation id.
    pub trace_id: String,
    /// Whether the promotion was evaluated without mutating the registry.
    pub dry_run: bool,
}

/// Append-only audit entry for one promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionRecord {
    promotion_id: Uuid,
    artifact_digest: String,
    source_environment: String,
    target_environment: String,
    operator: String,
    operator_groups: Vec<String>,
    authorized_via: AuthorizedVia,
    authorization_passed: bool,
    gate_results: Vec<GateResult>,
    signature_verified: bool,
    promoted_at: DateTime<Utc>,
    trace_id: String,
    #[serde(default)]
    dry_run: bool,
}

impl PromotionRecord {
    /// Creates a record with a fresh identifier, stamped now.
    #[must_use]
    pub fn new(input: NewPromotionRecord) -> Self {
        Self {
            promotion_id: Uuid::new_v4(),
            artifact_digest: input.artifact_digest,
            source_environment: input.source_environment,
            target_environment: input.target_environment,
            operator: input.operator,
            operator_groups: input.operator_groups,
            authorized_via: input.authorization.via,
            authorization_passed: input.authorization.passed,
            gate_results: input.gate_results,
            signature_verified: input.signature_verified,
            promoted_at: Utc::now(),
            trace_id: input.trace_id,
            dry_run: input.dry_run,
        }
    }

    /// Returns the promotion identifier.
    #[must_use]
    pub fn promotion_id(&self) -> Uuid {
        self.promotion_id
    }

    /// Returns the promoted digest.
    #[must_use]
    pub fn artifact_digest(&self) -> &str {
        self.artifact_digest.as_str()
    }

    /// Returns the source environment.
    #[must_use]
    pub fn source_environment(&self) -> &str {
        self.source_environment.as_str()
    }

    /// Returns the target environment.
    #[must_use]
    pub fn target_environment(&self) -> &str {
        self.target_environment.as_str()
    }

    /// Returns the operator identity.
    #[must_use]
    pub fn operator(&self) -> &str {
        self.operator.as_str()
    }

    /// Returns the operator groups resolved at authorization time.
    #[must_use]
    pub fn operator_groups(&self) -> &[String] {
        self.operator_groups.as_slice()
    }

    /// Returns the rule that authorized the promotion.
    #[must_use]
    pub fn authorized_via(&self) -> &AuthorizedVia {
        &self.authorized_via
    }

    /// Returns whether authorization passed.
    #[must_use]
    pub fn authorization_passed(&self) -> bool {
        self.authorization_passed
    }

    /// Returns gate results in execution order.
    #[must_use]
    pub fn gate_results(&self) -> &[GateResult] {
        self.gate_results.as_slice()
    }

    /// Returns whether the signature was verified.
    #[must_use]
    pub fn signature_verified(&self) -> bool {
        self.signature_verified
    }

    /// Returns the promotion timestamp.
    #[must_use]
    pub fn promoted_at(&self) -> DateTime<Utc> {
        self.promoted_at
    }

    /// Returns the trace correlation id.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        self.trace_id.as_str()
    }

    /// Returns whether the record describes a dry run.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Fields captured when a rollback succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRollbackRecord {
    /// Digest being restored.
    pub artifact_digest: String,
    /// Digest active in the environment before the rollback.
    pub previous_digest: String,
    /// Environment rolled back.
    pub environment: String,
    /// Operator-supplied reason.
    pub reason: String,
    /// Operator identity.
    pub operator: String,
    /// Rollback tag created for this rollback.
    pub rollback_tag: String,
    /// Distributed trace correlation id.
    pub trace_id: String,
}

/// Append-only audit entry for one rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRecord {
    rollback_id: Uuid,
    artifact_digest: String,
    previous_digest: String,
    environment: String,
    reason: NonEmptyString,
    operator: String,
    rollback_tag: String,
    rolled_back_at: DateTime<Utc>,
    trace_id: String,
}

impl RollbackRecord {
    /// Creates a record with a fresh identifier, stamped now.
    pub fn new(input: NewRollbackRecord) -> AppResult<Self> {
        let reason = NonEmptyString::new(input.reason)
            .map_err(|_| AppError::Validation("rollback reason must not be empty".to_owned()))?;

        Ok(Self {
            rollback_id: Uuid::new_v4(),
            artifact_digest: input.artifact_digest,
            previous_digest: input.previous_digest,
            environment: input.environment,
            reason,
            operator: input.operator,
            rollback_tag: input.rollback_tag,
            rolled_back_at: Utc::now(),
            trace_id: input.trace_id,
        })
    }

    /// Returns the rollback identifier.
    #[must_use]
    pub fn rollback_id(&self) -> Uuid {
        self.rollback_id
    }

    /// Returns the restored digest.
    #[must_use]
    pub fn artifact_digest(&self) -> &str {
        self.artifact_digest.as_str()
    }

    /// Returns the digest that was active before the rollback.
    #[must_use]
    pub fn previous_digest(&self) -> &str {
        self.previous_digest.as_str()
    }

    /// Returns the environment rolled back.
    #[must_use]
    pub fn environment(&self) -> &str {
        self.environment.as_str()
    }

    /// Returns the operator-supplied reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.reason.as_str()
    }

    /// Returns the operator identity.
    #[must_use]
    pub fn operator(&self) -> &str {
        self.operator.as_str()
    }

    /// Returns the rollback tag.
    #[must_use]
    pub fn rollback_tag(&self) -> &str {
        self.rollback_tag.as_str()
    }

    /// Returns the rollback timestamp.
    #[must_use]
    pub fn rolled_back_at(&self) -> DateTime<Utc> {
        self.rolled_back_at
    }

    /// Returns the trace correlation id.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        self.trace_id.as_str()
    }
}

/// Promotion state of one environment for a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentStatus {
    /// Whether the environment tag currently resolves to the tag's digest.
    pub promoted: bool,
    /// Time of the most recent promotion into the environment, if recorded.
    pub promoted_at: Option<DateTime<Utc>>,
}

/// Status view of a tag across environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionStatusResponse {
    /// Queried tag.
    pub tag: String,
    /// Digest the tag resolves to.
    pub digest: String,
    /// Per-environment promotion state.
    pub environments: BTreeMap<String, EnvironmentStatus>,
    /// Promotion history, most recent first.
    pub history: Vec<PromotionRecord>,
}

#[cfg(test)]
mod tests {
    use super::{AuthorizationDecision, AuthorizedVia, NewPromotionRecord, NewRollbackRecord};
    use super::{PromotionRecord, RollbackRecord};

    #[test]
    fn authorized_via_roundtrip_storage_value() {
        for via in [
            AuthorizedVia::NoConfig,
            AuthorizedVia::Group("release-managers".to_owned()),
            AuthorizedVia::Operator("alice@example.com".to_owned()),
            AuthorizedVia::Denied,
        ] {
            let restored = AuthorizedVia::try_from(via.to_string());
            assert_eq!(restored.ok(), Some(via));
        }

        assert!(AuthorizedVia::try_from("role:admin".to_owned()).is_err());
    }

    #[test]
    fn promotion_record_serializes_authorized_via_as_string() {
        let record = PromotionRecord::new(NewPromotionRecord {
            artifact_digest: "sha256:abc".to_owned(),
            source_environment: "dev".to_owned(),
            target_environment: "staging".to_owned(),
            operator: "ci@example.com".to_owned(),
            operator_groups: vec!["platform".to_owned()],
            authorization: AuthorizationDecision {
                passed: true,
                via: AuthorizedVia::Group("platform".to_owned()),
            },
            gate_results: Vec::new(),
            signature_verified: false,
            trace_id: "trace-1".to_owned(),
            dry_run: false,
        });

        let encoded = serde_json::to_value(&record);
        let Ok(encoded) = encoded else {
            panic!("record should serialize");
        };
        assert_eq!(encoded["authorized_via"], "group:platform");
        assert_eq!(encoded["authorization_passed"], true);

        let decoded: Result<PromotionRecord, _> = serde_json::from_value(encoded);
        assert_eq!(decoded.ok(), Some(record));
    }

    #[test]
    fn rollback_record_requires_reason() {
        let result = RollbackRecord::new(NewRollbackRecord {
            artifact_digest: "sha256:old".to_owned(),
            previous_digest: "sha256:new".to_owned(),
            environment: "prod".to_owned(),
            reason: "  ".to_owned(),
            operator: "sre@example.com".to_owned(),
            rollback_tag: "v1.0.0-prod-rollback-1".to_owned(),
            trace_id: "trace-2".to_owned(),
        });

        assert!(result.is_err());
    }
}
