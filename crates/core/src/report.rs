use serde_json::{Map, Value, json};

use crate::AppError;

/// Process exit codes exposed to wrappers of the promotion controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitCode {
    /// Operation completed.
    Success,
    /// Unexpected internal failure.
    Internal,
    /// Invalid input or configuration.
    InvalidInput,
    /// Artifact reference did not resolve.
    ArtifactNotFound,
    /// Registry unavailable or circuit breaker open.
    RegistryUnavailable,
    /// Signature verification failed.
    SignatureInvalid,
    /// Scanner output could not be parsed.
    ScanParseFailed,
    /// A promotion gate failed.
    GateFailed,
    /// Rollback target was never promoted.
    VersionNotPromoted,
    /// Operator authorization denied.
    AuthorizationDenied,
    /// Target environment is locked.
    EnvironmentLocked,
}

impl ExitCode {
    /// Returns the numeric process exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Internal => 1,
            Self::InvalidInput => 2,
            Self::ArtifactNotFound => 3,
            Self::RegistryUnavailable => 5,
            Self::SignatureInvalid => 6,
            Self::ScanParseFailed => 7,
            Self::GateFailed => 8,
            Self::VersionNotPromoted => 11,
            Self::AuthorizationDenied => 12,
            Self::EnvironmentLocked => 13,
        }
    }
}

impl AppError {
    /// Returns the exit code wrappers must terminate with for this error.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Validation(_) | Self::Configuration(_) => ExitCode::InvalidInput,
            Self::ScanParse { .. } => ExitCode::ScanParseFailed,
            Self::RegistryUnavailable { .. } | Self::CircuitBreakerOpen { .. } => {
                ExitCode::RegistryUnavailable
            }
            Self::SignatureVerification { .. } => ExitCode::SignatureInvalid,
            Self::Authorization { .. } => ExitCode::AuthorizationDenied,
            Self::VersionNotPromoted { .. } => ExitCode::VersionNotPromoted,
            Self::EnvironmentLocked { .. } => ExitCode::EnvironmentLocked,
            Self::ArtifactNotFound { .. } => ExitCode::ArtifactNotFound,
            Self::GateFailed { .. } => ExitCode::GateFailed,
            Self::Internal(_) => ExitCode::Internal,
        }
    }

    /// Returns a stable machine-readable error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Configuration(_) => "configuration_error",
            Self::ScanParse { .. } => "scan_parse_error",
            Self::RegistryUnavailable { .. } => "registry_unavailable",
            Self::CircuitBreakerOpen { .. } => "circuit_breaker_open",
            Self::SignatureVerification { .. } => "signature_verification_failed",
            Self::Authorization { .. } => "authorization_denied",
            Self::VersionNotPromoted { .. } => "version_not_promoted",
            Self::EnvironmentLocked { .. } => "environment_locked",
            Self::ArtifactNotFound { .. } => "artifact_not_found",
            Self::GateFailed { .. } => "gate_failed",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Returns whether retrying later may succeed without operator action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RegistryUnavailable { .. } | Self::CircuitBreakerOpen { .. }
        )
    }

    /// Renders the JSON error payload: `error`, `error_kind`, `exit_code` plus
    /// kind-specific context fields.
    #[must_use]
    pub fn to_report(&self) -> Value {
        let mut report = Map::new();
        report.insert("error".to_owned(), Value::String(self.to_string()));
        report.insert("error_kind".to_owned(), Value::String(self.kind().to_owned()));
        report.insert("exit_code".to_owned(), json!(self.exit_code().as_i32()));

        let context = match self {
            Self::Validation(_) | Self::Configuration(_) | Self::Internal(_) => json!({}),
            Self::ScanParse { scanner, .. } => json!({ "scanner": scanner }),
            Self::RegistryUnavailable { registry, .. } => json!({ "registry": registry }),
            Self::CircuitBreakerOpen {
                registry,
                failure_count,
                recovery_at,
            } => json!({
                "registry": registry,
                "failure_count": failure_count,
                "recovery_at": recovery_at.to_rfc3339(),
            }),
            Self::SignatureVerification { artifact, .. } => json!({ "artifact": artifact }),
            Self::Authorization {
                operator,
                environment,
                required_groups,
                allowed_operators,
                ..
            } => json!({
                "operator": operator,
                "environment": environment,
                "required_groups": required_groups,
                "allowed_operators": allowed_operators,
            }),
            Self::VersionNotPromoted {
                tag,
                environment,
                available_versions,
            } => json!({
                "tag": tag,
                "environment": environment,
                "available_versions": available_versions,
            }),
            Self::EnvironmentLocked {
                environment,
                locked_by,
                ..
            } => json!({ "environment": environment, "locked_by": locked_by }),
            Self::ArtifactNotFound {
                reference,
                registry,
            } => json!({ "tag": reference, "registry": registry }),
            Self::GateFailed {
                gate, environment, ..
            } => json!({ "gate": gate, "environment": environment }),
        };

        if let Value::Object(fields) = context {
            report.extend(fields);
        }

        Value::Object(report)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::AppError;

    #[test]
    fn registry_failures_share_exit_code_five() {
        let unavailable = AppError::RegistryUnavailable {
            registry: "ghcr.io".to_owned(),
            reason: "connection reset".to_owned(),
        };
        let open = AppError::CircuitBreakerOpen {
            registry: "ghcr.io".to_owned(),
            failure_count: 5,
            recovery_at: Utc::now(),
        };

        assert_eq!(unavailable.exit_code().as_i32(), 5);
        assert_eq!(open.exit_code().as_i32(), 5);
        assert!(unavailable.is_retryable());
        assert!(open.is_retryable());
    }

    #[test]
    fn fatal_errors_use_documented_exit_codes() {
        let signature = AppError::SignatureVerification {
            artifact: "oci://ghcr.io/acme/demo:v1.0.0".to_owned(),
            reason: "no bundle".to_owned(),
        };
        let locked = AppError::EnvironmentLocked {
            environment: "prod".to_owned(),
            reason: "incident".to_owned(),
            locked_by: "sre".to_owned(),
        };

        assert_eq!(signature.exit_code().as_i32(), 6);
        assert_eq!(locked.exit_code().as_i32(), 13);
        assert!(!signature.is_retryable());
    }

    #[test]
    fn version_not_promoted_report_carries_context() {
        let error = AppError::VersionNotPromoted {
            tag: "v1.0.0".to_owned(),
            environment: "prod".to_owned(),
            available_versions: vec!["v1.1.0".to_owned()],
        };

        let report = error.to_report();
        assert_eq!(report["exit_code"], 11);
        assert_eq!(report["error_kind"], "version_not_promoted");
        assert_eq!(report["tag"], "v1.0.0");
        assert_eq!(report["environment"], "prod");
        assert_eq!(report["available_versions"][0], "v1.1.0");
        assert!(report["error"].as_str().is_some_and(|value| value.contains("v1.0.0")));
    }
}
