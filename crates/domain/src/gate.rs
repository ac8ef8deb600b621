use std::fmt::{Display, Formatter};
use std::str::FromStr;

use floe_core::AppError;
use serde::{Deserialize, Serialize};

/// Checks that may guard a promotion into an environment.
///
/// Declaration order is the canonical execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// Compiled policy enforcement reported the artifact as compliant.
    PolicyCompliance,
    /// Vulnerability scan results stay under configured thresholds.
    SecurityScan,
    /// Artifact carries a valid signature.
    SignatureVerification,
}

impl GateKind {
    /// Returns a stable storage value for this gate.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PolicyCompliance => "policy_compliance",
            Self::SecurityScan => "security_scan",
            Self::SignatureVerification => "signature_verification",
        }
    }

    /// Returns all gates in canonical execution order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[GateKind] = &[
            GateKind::PolicyCompliance,
            GateKind::SecurityScan,
            GateKind::SignatureVerification,
        ];

        ALL
    }
}

impl Display for GateKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for GateKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "policy_compliance" => Ok(Self::PolicyCompliance),
            "security_scan" => Ok(Self::SecurityScan),
            "signature_verification" => Ok(Self::SignatureVerification),
            _ => Err(AppError::Validation(format!("unknown gate value '{value}'"))),
        }
    }
}

/// Outcome of one gate execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    /// Gate executed and passed.
    Passed,
    /// Gate executed and failed.
    Failed,
    /// Gate was not executed because an earlier gate failed.
    Skipped,
}

impl GateStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Immutable result of a single gate execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    gate: GateKind,
    status: GateStatus,
    duration_ms: u64,
    detail: Option<String>,
}

impl GateResult {
    /// Creates a passed result.
    #[must_use]
    pub fn passed(gate: GateKind, duration_ms: u64, detail: Option<String>) -> Self {
        Self {
            gate,
            status: GateStatus::Passed,
            duration_ms,
            detail,
        }
    }

    /// Creates a failed result with a mandatory failure detail.
    #[must_use]
    pub fn failed(gate: GateKind, duration_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            gate,
            status: GateStatus::Failed,
            duration_ms,
            detail: Some(detail.into()),
        }
    }

    /// Creates a skipped result for a gate that never ran.
    #[must_use]
    pub fn skipped(gate: GateKind) -> Self {
        Self {
            gate,
            status: GateStatus::Skipped,
            duration_ms: 0,
            detail: None,
        }
    }

    /// Returns the gate this result belongs to.
    #[must_use]
    pub fn gate(&self) -> GateKind {
        self.gate
    }

    /// Returns the gate status.
    #[must_use]
    pub fn status(&self) -> GateStatus {
        self.status
    }

    /// Returns wall-clock execution time of this gate alone.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Returns optional gate detail.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns whether the gate failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == GateStatus::Failed
    }
}
