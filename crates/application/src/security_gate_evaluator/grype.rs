use floe_core::AppResult;
use floe_domain::{ScannerFormat, Severity};
use serde::Deserialize;

use super::{ScanFinding, ScanReportParser, scan_parse_error};

#[derive(Deserialize)]
struct GrypeReport {
    matches: Vec<GrypeMatch>,
}

#[derive(Deserialize)]
struct GrypeMatch {
    vulnerability: GrypeVulnerability,
}

#[derive(Deserialize)]
struct GrypeVulnerability {
    id: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    fix: Option<GrypeFix>,
}

#[derive(Deserialize)]
struct GrypeFix {
    #[serde(default)]
    state: String,
}

/// Parser for Grype JSON reports.
pub(super) struct GrypeReportParser;

impl ScanReportParser for GrypeReportParser {
    fn format(&self) -> ScannerFormat {
        ScannerFormat::Grype
    }

    fn findings(&self, raw: &str) -> AppResult<Vec<ScanFinding>> {
        let report: GrypeReport = serde_json::from_str(raw)
            .map_err(|error| scan_parse_error(self.format(), error.to_string(), raw))?;

        Ok(report
            .matches
            .into_iter()
            .map(|matched| {
                let vulnerability = matched.vulnerability;
                ScanFinding {
                    has_fix: vulnerability
                        .fix
                        .as_ref()
                        .is_some_and(|fix| fix.state == "fixed"),
                    severity: Severity::from_label(vulnerability.severity.as_str()),
                    id: vulnerability.id,
                }
            })
            .collect())
    }
}
