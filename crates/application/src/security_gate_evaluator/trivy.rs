use floe_core::AppResult;
use floe_domain::{ScannerFormat, Severity};
use serde::Deserialize;

use super::{ScanFinding, ScanReportParser, scan_parse_error};

#[derive(Deserialize)]
struct TrivyReport {
    #[serde(rename = "Results")]
    results: Vec<TrivyTarget>,
}

#[derive(Deserialize)]
struct TrivyTarget {
    #[serde(rename = "Vulnerabilities", default)]
    vulnerabilities: Option<Vec<TrivyVulnerability>>,
}

#[derive(Deserialize)]
struct TrivyVulnerability {
    #[serde(rename = "VulnerabilityID")]
    vulnerability_id: String,
    #[serde(rename = "Severity", default)]
    severity: String,
    #[serde(rename = "FixedVersion", default)]
    fixed_version: Option<String>,
}

/// Parser for Trivy JSON reports.
pub(super) struct TrivyReportParser;

impl ScanReportParser for TrivyReportParser {
    fn format(&self) -> ScannerFormat {
        ScannerFormat::Trivy
    }

    fn findings(&self, raw: &str) -> AppResult<Vec<ScanFinding>> {
        let report: TrivyReport = serde_json::from_str(raw)
            .map_err(|error| scan_parse_error(self.format(), error.to_string(), raw))?;

        Ok(report
            .results
            .into_iter()
            .flat_map(|target| target.vulnerabilities.unwrap_or_default())
            .map(|vulnerability| ScanFinding {
                has_fix: vulnerability
                    .fixed_version
                    .as_deref()
                    .is_some_and(|version| !version.trim().is_empty()),
                severity: Severity::from_label(vulnerability.severity.as_str()),
                id: vulnerability.vulnerability_id,
            })
            .collect())
    }
}
