use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use floe_core::AppResult;
use floe_domain::{
    ArtifactReference, Environment, GateKind, GateStatus, ScannerFormat, SecurityGateConfig,
};

use crate::gate_ports::{
    PolicyEvaluator, PolicyOutcome, ScanReportSource, SignatureStatus, SignatureVerification,
    SignatureVerifier,
};

use super::{GateRunMode, GateRunner};

const CLEAN_REPORT: &str = r#"{"Results":[{"Target":"app","Vulnerabilities":[]}]}"#;
const CRITICAL_REPORT: &str = r#"{"Results":[{"Target":"app","Vulnerabilities":[
    {"VulnerabilityID":"CVE-2024-3094","Severity":"CRITICAL","FixedVersion":"5.6.2"}
]}]}"#;

struct FakeSignatureVerifier {
    status: SignatureStatus,
    calls: AtomicUsize,
}

impl FakeSignatureVerifier {
    fn new(status: SignatureStatus) -> Self {
        Self {
            status,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SignatureVerifier for FakeSignatureVerifier {
    async fn verify(&self, _artifact: &ArtifactReference) -> AppResult<SignatureVerification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SignatureVerification {
            status: self.status,
            detail: match self.status {
                SignatureStatus::Valid => Some("issuer=https://token.actions.githubusercontent.com".to_owned()),
                SignatureStatus::Invalid => Some("no signature bundle for digest".to_owned()),
            },
        })
    }
}

struct FakePolicyEvaluator {
    compliant: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl PolicyEvaluator for FakePolicyEvaluator {
    async fn evaluate(&self, _artifact: &ArtifactReference) -> AppResult<PolicyOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PolicyOutcome {
            compliant: self.compliant,
            detail: (!self.compliant).then(|| "2 policy violations".to_owned()),
        })
    }
}

struct FakeScanReportSource {
    report: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl ScanReportSource for FakeScanReportSource {
    async fn fetch_report(
        &self,
        _artifact: &ArtifactReference,
        _format: ScannerFormat,
    ) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.report.to_owned())
    }
}

fn artifact() -> ArtifactReference {
    ArtifactReference::new("registry.example.com/floe/demo", "v1.0.0", "sha256:aaa")
}

fn environment_with_all_gates() -> Environment {
    let Ok(environment) = Environment::new("prod") else {
        panic!("valid environment name");
    };
    environment
        .with_gate(GateKind::PolicyCompliance, true)
        .with_gate(GateKind::SecurityScan, true)
        .with_gate(GateKind::SignatureVerification, true)
        .with_security_gate(SecurityGateConfig::default())
}

struct Fixture {
    runner: GateRunner,
    signer: Arc<FakeSignatureVerifier>,
    policy: Arc<FakePolicyEvaluator>,
    scanner: Arc<FakeScanReportSource>,
}

fn fixture(compliant: bool, report: &'static str, signature: SignatureStatus) -> Fixture {
    let signer = Arc::new(FakeSignatureVerifier::new(signature));
    let policy = Arc::new(FakePolicyEvaluator {
        compliant,
        calls: AtomicUsize::new(0),
    });
    let scanner = Arc::new(FakeScanReportSource {
        report,
        calls: AtomicUsize::new(0),
    });
    let runner = GateRunner::new(signer.clone())
        .with_policy_evaluator(policy.clone())
        .with_scan_report_source(scanner.clone());

    Fixture {
        runner,
        signer,
        policy,
        scanner,
    }
}

#[tokio::test]
async fn all_gates_pass_in_canonical_order() {
    let fixture = fixture(true, CLEAN_REPORT, SignatureStatus::Valid);

    let report = fixture
        .runner
        .run(&environment_with_all_gates(), &artifact(), GateRunMode::FailFast)
        .await;
    let Ok(report) = report else {
        panic!("gates should pass");
    };

    let gates: Vec<GateKind> = report.results.iter().map(|result| result.gate()).collect();
    assert_eq!(gates, GateKind::all());
    assert!(report
        .results
        .iter()
        .all(|result| result.status() == GateStatus::Passed));
    assert!(report.signature_verified);
    assert!(report.first_failure().is_none());
}

#[tokio::test]
async fn first_failure_skips_remaining_gates() {
    let fixture = fixture(false, CLEAN_REPORT, SignatureStatus::Valid);

    let report = fixture
        .runner
        .run(&environment_with_all_gates(), &artifact(), GateRunMode::FailFast)
        .await;
    let Ok(report) = report else {
        panic!("policy failure is a result, not an error");
    };

    let statuses: Vec<GateStatus> = report.results.iter().map(|result| result.status()).collect();
    assert_eq!(
        statuses,
        vec![GateStatus::Failed, GateStatus::Skipped, GateStatus::Skipped]
    );
    assert_eq!(
        report.first_failure().and_then(|result| result.detail()),
        Some("2 policy violations")
    );
    assert_eq!(fixture.scanner.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.signer.calls.load(Ordering::SeqCst), 0);
    assert!(!report.signature_verified);
}

#[tokio::test]
async fn run_all_mode_executes_every_gate() {
    let fixture = fixture(false, CRITICAL_REPORT, SignatureStatus::Valid);

    let report = fixture
        .runner
        .run(&environment_with_all_gates(), &artifact(), GateRunMode::RunAll)
        .await;
    let Ok(report) = report else {
        panic!("run-all report should be produced");
    };

    let statuses: Vec<GateStatus> = report.results.iter().map(|result| result.status()).collect();
    assert_eq!(
        statuses,
        vec![GateStatus::Failed, GateStatus::Failed, GateStatus::Passed]
    );
    assert_eq!(fixture.policy.calls.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.scanner.calls.load(Ordering::SeqCst), 1);
    assert!(report.signature_verified);
}

#[tokio::test]
async fn blocked_scan_reports_cve_ids() {
    let fixture = fixture(true, CRITICAL_REPORT, SignatureStatus::Valid);

    let report = fixture
        .runner
        .run(&environment_with_all_gates(), &artifact(), GateRunMode::FailFast)
        .await;
    let Ok(report) = report else {
        panic!("blocked scan is a result, not an error");
    };

    let failure = report.first_failure();
    assert_eq!(failure.map(|result| result.gate()), Some(GateKind::SecurityScan));
    assert!(failure
        .and_then(|result| result.detail())
        .is_some_and(|detail| detail.contains("CVE-2024-3094")));
}

#[tokio::test]
async fn scan_without_thresholds_passes_with_summary_detail() {
    let fixture = fixture(true, CRITICAL_REPORT, SignatureStatus::Valid);
    let Ok(environment) = Environment::new("staging") else {
        panic!("valid environment name");
    };
    let environment = environment.with_gate(GateKind::SecurityScan, true);

    let report = fixture
        .runner
        .run(&environment, &artifact(), GateRunMode::FailFast)
        .await;
    let Ok(report) = report else {
        panic!("scan without thresholds should pass");
    };

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status(), GateStatus::Passed);
    assert!(report.results[0]
        .detail()
        .is_some_and(|detail| detail.contains("critical=1")));
}

#[tokio::test]
async fn invalid_signature_aborts_even_in_run_all_mode() {
    let fixture = fixture(true, CLEAN_REPORT, SignatureStatus::Invalid);

    let result = fixture
        .runner
        .run(&environment_with_all_gates(), &artifact(), GateRunMode::RunAll)
        .await;

    let Err(error) = result else {
        panic!("invalid signature must be fatal");
    };
    assert_eq!(error.kind(), "signature_verification_failed");
    assert_eq!(error.exit_code().as_i32(), 6);
    assert!(error.to_string().contains("sha256:aaa"));
}

#[tokio::test]
async fn scan_parse_errors_propagate() {
    let fixture = fixture(true, "<html>502 Bad Gateway</html>", SignatureStatus::Valid);

    let result = fixture
        .runner
        .run(&environment_with_all_gates(), &artifact(), GateRunMode::FailFast)
        .await;

    let Err(error) = result else {
        panic!("unparseable report must not be swallowed");
    };
    assert_eq!(error.kind(), "scan_parse_error");
}

#[tokio::test]
async fn enabled_gate_without_collaborator_is_a_configuration_error() {
    let runner = GateRunner::new(Arc::new(FakeSignatureVerifier::new(SignatureStatus::Valid)));

    let result = runner
        .run(&environment_with_all_gates(), &artifact(), GateRunMode::FailFast)
        .await;

    let Err(error) = result else {
        panic!("missing policy evaluator must be reported");
    };
    assert_eq!(error.kind(), "configuration_error");
}

#[tokio::test]
async fn environment_without_gates_produces_empty_report() {
    let fixture = fixture(false, CRITICAL_REPORT, SignatureStatus::Invalid);
    let Ok(environment) = Environment::new("dev") else {
        panic!("valid environment name");
    };

    let report = fixture
        .runner
        .run(&environment, &artifact(), GateRunMode::FailFast)
        .await;

    assert_eq!(report.ok().map(|report| report.results.len()), Some(0));
}

#[tokio::test]
async fn verify_signature_returns_passed_result() {
    let fixture = fixture(true, CLEAN_REPORT, SignatureStatus::Valid);

    let result = fixture.runner.verify_signature(&artifact()).await;

    assert_eq!(
        result.ok().map(|result| (result.gate(), result.status())),
        Some((GateKind::SignatureVerification, GateStatus::Passed))
    );
}
