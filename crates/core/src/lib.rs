//! Shared primitives for all Rust crates in Floe promotion.

#![forbid(unsafe_code)]

/// Operator identity primitives shared across services.
pub mod auth;
mod report;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::OperatorIdentity;
pub use report::ExitCode;

/// Result type used across Floe crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Failure categories observable by callers of the promotion controller.
///
/// Every variant maps to a stable process exit code through
/// [`AppError::exit_code`] and renders a message an operator can act on
/// without correlating logs.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Promotion configuration is missing, malformed or forbids the request.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Scanner output could not be parsed.
    #[error("failed to parse {scanner} scan output: {reason} (input: {snippet})")]
    ScanParse {
        /// Scanner format the input was parsed as.
        scanner: String,
        /// Parser failure description.
        reason: String,
        /// Truncated prefix of the offending input.
        snippet: String,
    },

    /// Registry transport failed or timed out.
    #[error("registry '{registry}' is unavailable: {reason}")]
    RegistryUnavailable {
        /// Registry host the call was addressed to.
        registry: String,
        /// Transport failure description.
        reason: String,
    },

    /// Registry calls are being rejected until the circuit recovers.
    #[error(
        "circuit breaker open for registry '{registry}' after {failure_count} consecutive failures, retry after {recovery_at}"
    )]
    CircuitBreakerOpen {
        /// Registry host guarded by the breaker.
        registry: String,
        /// Consecutive failures recorded by the breaker.
        failure_count: u32,
        /// Earliest instant a trial call is admitted.
        recovery_at: DateTime<Utc>,
    },

    /// Artifact signature is missing or invalid.
    #[error("signature verification failed for '{artifact}': {reason}")]
    SignatureVerification {
        /// Artifact reference that failed verification.
        artifact: String,
        /// Verifier detail.
        reason: String,
    },

    /// Operator is not permitted to act on the environment.
    #[error(
        "operator '{operator}' is not authorized for environment '{environment}': {reason} (allowed groups: [{}], allowed operators: [{}])",
        .required_groups.join(", "),
        .allowed_operators.join(", ")
    )]
    Authorization {
        /// Operator identity that was denied.
        operator: String,
        /// Target environment.
        environment: String,
        /// Groups that would have granted access.
        required_groups: Vec<String>,
        /// Operators that would have been granted access.
        allowed_operators: Vec<String>,
        /// Denial description.
        reason: String,
    },

    /// Rollback target was never promoted to the environment.
    #[error(
        "version '{tag}' is not promoted to '{environment}' (available versions: [{}])",
        .available_versions.join(", ")
    )]
    VersionNotPromoted {
        /// Requested version tag.
        tag: String,
        /// Environment the rollback targeted.
        environment: String,
        /// Versions currently promoted to the environment.
        available_versions: Vec<String>,
    },

    /// Environment is administratively locked.
    #[error("environment '{environment}' is locked by '{locked_by}': {reason}")]
    EnvironmentLocked {
        /// Locked environment.
        environment: String,
        /// Lock reason.
        reason: String,
        /// Identity that placed the lock.
        locked_by: String,
    },

    /// Artifact reference does not resolve in the registry.
    #[error("artifact '{reference}' not found in registry '{registry}'")]
    ArtifactNotFound {
        /// Tag or reference that was looked up.
        reference: String,
        /// Registry host.
        registry: String,
    },

    /// A promotion gate reported a failure.
    #[error("gate '{gate}' failed for environment '{environment}': {detail}")]
    GateFailed {
        /// Stable gate identifier.
        gate: String,
        /// Target environment.
        environment: String,
        /// Gate failure detail.
        detail: String,
    },

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn authorization_message_names_operator_and_allowed_sets() {
        let error = AppError::Authorization {
            operator: "mallory@example.com".to_owned(),
            environment: "prod".to_owned(),
            required_groups: vec!["release-managers".to_owned(), "sre".to_owned()],
            allowed_operators: vec!["alice@example.com".to_owned()],
            reason: "operator holds none of the allowed groups".to_owned(),
        };

        let message = error.to_string();
        assert!(message.contains("mallory@example.com"));
        assert!(message.contains("release-managers, sre"));
        assert!(message.contains("alice@example.com"));
    }

    #[test]
    fn version_not_promoted_lists_available_versions() {
        let error = AppError::VersionNotPromoted {
            tag: "v1.0.0".to_owned(),
            environment: "prod".to_owned(),
            available_versions: vec!["v1.1.0".to_owned(), "v1.2.0".to_owned()],
        };

        assert!(error.to_string().contains("v1.1.0, v1.2.0"));
    }
}
