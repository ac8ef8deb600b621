use std::sync::Arc;
use std::time::Instant;

use floe_core::{AppError, AppResult};
use floe_domain::{ArtifactReference, Environment, GateKind, GateResult, SecurityGateConfig};
use tracing::{debug, info};

use crate::gate_ports::{PolicyEvaluator, ScanReportSource, SignatureStatus, SignatureVerifier};
use crate::security_gate_evaluator::SecurityGateEvaluator;

/// How the runner reacts to a failed gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateRunMode {
    /// Later gates are recorded as skipped after the first failure.
    #[default]
    FailFast,
    /// Every enabled gate runs, for reporting.
    RunAll,
}

/// Results of running the gates of one transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GateReport {
    /// Gate results in canonical order.
    pub results: Vec<GateResult>,
    /// Whether the signature gate ran and verified the artifact.
    pub signature_verified: bool,
}

impl GateReport {
    /// Returns the first failed gate, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&GateResult> {
        self.results.iter().find(|result| result.is_failed())
    }
}

struct GateCheck {
    passed: bool,
    detail: Option<String>,
}

/// Executes the enabled gates of a target environment.
#[derive(Clone)]
pub struct GateRunner {
    signature_verifier: Arc<dyn SignatureVerifier>,
    policy_evaluator: Option<Arc<dyn PolicyEvaluator>>,
    scan_report_source: Option<Arc<dyn ScanReportSource>>,
    security_gate_evaluator: SecurityGateEvaluator,
}

impl GateRunner {
    /// Creates a gate runner backed by the signing subsystem.
    #[must_use]
    pub fn new(signature_verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            signature_verifier,
            policy_evaluator: None,
            scan_report_source: None,
            security_gate_evaluator: SecurityGateEvaluator,
        }
    }

    /// Adds the policy compliance collaborator.
    #[must_use]
    pub fn with_policy_evaluator(mut self, policy_evaluator: Arc<dyn PolicyEvaluator>) -> Self {
        self.policy_evaluator = Some(policy_evaluator);
        self
    }

    /// Adds the scanner output collaborator.
    #[must_use]
    pub fn with_scan_report_source(mut self, scan_report_source: Arc<dyn ScanReportSource>) -> Self {
        self.scan_report_source = Some(scan_report_source);
        self
    }

    /// Runs the enabled gates of `environment` against the artifact.
    ///
    /// A failed signature is returned as [`AppError::SignatureVerification`]
    /// regardless of `mode`; other gate failures are reported as failed results.
    pub async fn run(
        &self,
        environment: &Environment,
        artifact: &ArtifactReference,
        mode: GateRunMode,
    ) -> AppResult<GateReport> {
        let mut report = GateReport::default();
        let mut failed = false;

        for gate in environment.enabled_gates() {
            if failed && mode == GateRunMode::FailFast {
                report.results.push(GateResult::skipped(gate));
                continue;
            }

            let started = Instant::now();
            let check = self.execute(gate, environment, artifact).await?;
            let duration_ms = elapsed_ms(started);

            debug!(
                gate = gate.as_str(),
                environment = environment.name(),
                passed = check.passed,
                duration_ms,
                "gate executed"
            );

            if check.passed {
                if gate == GateKind::SignatureVerification {
                    report.signature_verified = true;
                }
                report
                    .results
                    .push(GateResult::passed(gate, duration_ms, check.detail));
            } else {
                failed = true;
                let detail = check
                    .detail
                    .unwrap_or_else(|| format!("{gate} gate failed"));
                info!(
                    gate = gate.as_str(),
                    environment = environment.name(),
                    artifact = %artifact,
                    detail = %detail,
                    "gate failed"
                );
                report
                    .results
                    .push(GateResult::failed(gate, duration_ms, detail));
            }
        }

        Ok(report)
    }

    /// Verifies the artifact signature outside of any environment gate set.
    pub async fn verify_signature(&self, artifact: &ArtifactReference) -> AppResult<GateResult> {
        let started = Instant::now();
        let check = self.check_signature(artifact).await?;
        Ok(GateResult::passed(
            GateKind::SignatureVerification,
            elapsed_ms(started),
            check.detail,
        ))
    }

    async fn execute(
        &self,
        gate: GateKind,
        environment: &Environment,
        artifact: &ArtifactReference,
    ) -> AppResult<GateCheck> {
        match gate {
            GateKind::PolicyCompliance => self.check_policy(environment, artifact).await,
            GateKind::SecurityScan => self.check_security_scan(environment, artifact).await,
            GateKind::SignatureVerification => self.check_signature(artifact).await,
        }
    }

    async fn check_policy(
        &self,
        environment: &Environment,
        artifact: &ArtifactReference,
    ) -> AppResult<GateCheck> {
        let evaluator = self.policy_evaluator.as_ref().ok_or_else(|| {
            AppError::Configuration(format!(
                "environment '{}' enables the policy_compliance gate but no policy evaluator is configured",
                environment.name()
            ))
        })?;

        let outcome = evaluator.evaluate(artifact).await?;
        Ok(GateCheck {
            passed: outcome.compliant,
            detail: outcome.detail,
        })
    }

    async fn check_security_scan(
        &self,
        environment: &Environment,
        artifact: &ArtifactReference,
    ) -> AppResult<GateCheck> {
        let source = self.scan_report_source.as_ref().ok_or_else(|| {
            AppError::Configuration(format!(
                "environment '{}' enables the security_scan gate but no scan report source is configured",
                environment.name()
            ))
        })?;

        let config = environment.security_gate();
        let parse_config = config.cloned().unwrap_or_default();
        let raw = source.fetch_report(artifact, parse_config.scanner).await?;
        let summary = self
            .security_gate_evaluator
            .parse_with_config(raw.as_str(), &parse_config)?;
        let decision = self.security_gate_evaluator.evaluate(&summary, config);

        Ok(GateCheck {
            passed: decision.passed,
            detail: Some(decision.reason.unwrap_or_else(|| {
                format!(
                    "critical={} high={} medium={} low={} ignored_unfixed={}",
                    summary.critical_count,
                    summary.high_count,
                    summary.medium_count,
                    summary.low_count,
                    summary.ignored_unfixed
                )
            })),
        })
    }

    async fn check_signature(&self, artifact: &ArtifactReference) -> AppResult<GateCheck> {
        let verification = self.signature_verifier.verify(artifact).await?;

        match verification.status {
            SignatureStatus::Valid => Ok(GateCheck {
                passed: true,
                detail: verification.detail,
            }),
            SignatureStatus::Invalid => Err(AppError::SignatureVerification {
                artifact: artifact.to_string(),
                reason: verification
                    .detail
                    .unwrap_or_else(|| "signature is invalid".to_owned()),
            }),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests;
