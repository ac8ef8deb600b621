use async_trait::async_trait;
use floe_core::AppResult;
use floe_domain::{ArtifactReference, ScannerFormat};

/// Verdict of the signing subsystem for one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Signature bundle present and valid for the digest.
    Valid,
    /// Signature missing, expired or issued for another digest.
    Invalid,
}

/// Signature verification outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureVerification {
    /// Verification verdict.
    pub status: SignatureStatus,
    /// Optional verifier detail, e.g. signer identity or failure cause.
    pub detail: Option<String>,
}

/// Port for the keyless-signing subsystem.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Verifies the signature of the referenced artifact.
    async fn verify(&self, artifact: &ArtifactReference) -> AppResult<SignatureVerification>;
}

/// Port supplying raw scanner output for an artifact.
#[async_trait]
pub trait ScanReportSource: Send + Sync {
    /// Returns the raw JSON report produced by the scanner.
    async fn fetch_report(
        &self,
        artifact: &ArtifactReference,
        format: ScannerFormat,
    ) -> AppResult<String>;
}

/// Compliance verdict of compiled policy enforcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOutcome {
    /// Whether the artifact complies with enforced policies.
    pub compliant: bool,
    /// Optional violation summary.
    pub detail: Option<String>,
}

/// Port evaluating policy compliance of an artifact.
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    /// Evaluates the referenced artifact.
    async fn evaluate(&self, artifact: &ArtifactReference) -> AppResult<PolicyOutcome>;
}
