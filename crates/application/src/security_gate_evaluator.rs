//! Normalizes scanner output into a vulnerability summary and decides whether
//! the security scan gate blocks a promotion.

use std::collections::HashSet;

use floe_core::{AppError, AppResult};
use floe_domain::{
    ScannerFormat, SecurityGateConfig, SecurityGateDecision, Severity, VulnerabilitySummary,
};

mod grype;
mod trivy;

use grype::GrypeReportParser;
use trivy::TrivyReportParser;

const SNIPPET_MAX_BYTES: usize = 500;

/// One vulnerability entry as reported by a scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFinding {
    /// Vulnerability identifier, usually a CVE id.
    pub id: String,
    /// Normalized severity.
    pub severity: Severity,
    /// Whether a fixed version is available.
    pub has_fix: bool,
}

/// Parser for one scanner output schema.
pub trait ScanReportParser: Send + Sync {
    /// Returns the format handled by this parser.
    fn format(&self) -> ScannerFormat;

    /// Extracts findings in report order, duplicates included.
    fn findings(&self, raw: &str) -> AppResult<Vec<ScanFinding>>;
}

/// Returns the parser registered for the format.
#[must_use]
pub fn parser_for(format: ScannerFormat) -> &'static dyn ScanReportParser {
    match format {
        ScannerFormat::Trivy => &TrivyReportParser,
        ScannerFormat::Grype => &GrypeReportParser,
    }
}

/// Security scan gate evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityGateEvaluator;

impl SecurityGateEvaluator {
    /// Parses a raw report into a summary over unique vulnerability ids.
    ///
    /// A vulnerability blocks when its severity is listed in
    /// `block_on_severity` and it either has a fix or `ignore_unfixed` is off.
    /// Unfixed candidates excluded by `ignore_unfixed` are counted in
    /// `ignored_unfixed` instead.
    pub fn parse(
        &self,
        format: ScannerFormat,
        raw: &str,
        block_on_severity: &[Severity],
        ignore_unfixed: bool,
    ) -> AppResult<VulnerabilitySummary> {
        self.parse_with_config(
            raw,
            &SecurityGateConfig {
                scanner: format,
                block_on_severity: block_on_severity.to_vec(),
                ignore_unfixed,
            },
        )
    }

    /// Parses a raw report using the thresholds of a gate configuration.
    pub fn parse_with_config(
        &self,
        raw: &str,
        config: &SecurityGateConfig,
    ) -> AppResult<VulnerabilitySummary> {
        let findings = parser_for(config.scanner).findings(raw)?;
        Ok(summarize(findings, config))
    }

    /// Decides the gate outcome. Without a configuration the gate always passes.
    #[must_use]
    pub fn evaluate(
        &self,
        summary: &VulnerabilitySummary,
        config: Option<&SecurityGateConfig>,
    ) -> SecurityGateDecision {
        if config.is_none() || summary.blocking_cves.is_empty() {
            return SecurityGateDecision {
                passed: true,
                blocked: false,
                blocking_cves: Vec::new(),
                reason: None,
                summary: summary.clone(),
            };
        }

        let count = summary.blocking_cves.len();
        let noun = if count == 1 {
            "vulnerability"
        } else {
            "vulnerabilities"
        };

        SecurityGateDecision {
            passed: false,
            blocked: true,
            blocking_cves: summary.blocking_cves.clone(),
            reason: Some(format!(
                "{count} blocking {noun} found: {}",
                summary.blocking_cves.join(", ")
            )),
            summary: summary.clone(),
        }
    }
}

fn summarize(findings: Vec<ScanFinding>, config: &SecurityGateConfig) -> VulnerabilitySummary {
    let mut summary = VulnerabilitySummary::default();
    let mut seen = HashSet::new();

    for finding in findings {
        if !seen.insert(finding.id.clone()) {
            continue;
        }

        summary.count(finding.severity);

        if !config.blocks(finding.severity) {
            continue;
        }

        if finding.has_fix || !config.ignore_unfixed {
            summary.blocking_cves.push(finding.id);
        } else {
            summary.ignored_unfixed = summary.ignored_unfixed.saturating_add(1);
        }
    }

    summary
}

pub(crate) fn scan_parse_error(
    format: ScannerFormat,
    reason: impl Into<String>,
    raw: &str,
) -> AppError {
    AppError::ScanParse {
        scanner: format.as_str().to_owned(),
        reason: reason.into(),
        snippet: snippet(raw).to_owned(),
    }
}

fn snippet(raw: &str) -> &str {
    if raw.len() <= SNIPPET_MAX_BYTES {
        return raw;
    }

    let mut end = SNIPPET_MAX_BYTES;
    while !raw.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    &raw[..end]
}
