use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Vulnerability severity as reported by scanners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Critical severity.
    Critical,
    /// High severity.
    High,
    /// Medium severity.
    Medium,
    /// Low severity.
    Low,
    /// Unknown, negligible or unrecognized severity.
    Unknown,
}

impl Severity {
    /// Normalizes a scanner severity label; unrecognized labels map to `Unknown`.
    #[must_use]
    pub fn from_label(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Self::Critical,
            "HIGH" => Self::High,
            "MEDIUM" => Self::Medium,
            "LOW" => Self::Low,
            _ => Self::Unknown,
        }
    }

    /// Returns the upper-case label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Supported scanner output schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerFormat {
    /// Trivy JSON report (`Results[].Vulnerabilities[]`).
    #[default]
    Trivy,
    /// Grype JSON report (`matches[].vulnerability`).
    Grype,
}

impl ScannerFormat {
    /// Returns a stable storage value for this format.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trivy => "trivy",
            Self::Grype => "grype",
        }
    }
}

impl Display for ScannerFormat {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

fn default_block_on_severity() -> Vec<Severity> {
    vec![Severity::Critical, Severity::High]
}

/// Security scan gate thresholds for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGateConfig {
    /// Scanner whose report is consumed.
    #[serde(default)]
    pub scanner: ScannerFormat,
    /// Severities that block promotion.
    #[serde(default = "default_block_on_severity")]
    pub block_on_severity: Vec<Severity>,
    /// Excludes vulnerabilities without an available fix from blocking.
    #[serde(default)]
    pub ignore_unfixed: bool,
}

impl SecurityGateConfig {
    /// Returns whether a vulnerability with this severity is a blocking candidate.
    #[must_use]
    pub fn blocks(&self, severity: Severity) -> bool {
        self.block_on_severity.contains(&severity)
    }
}

impl Default for SecurityGateConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerFormat::default(),
            block_on_severity: default_block_on_severity(),
            ignore_unfixed: false,
        }
    }
}

/// Normalized vulnerability counts over unique CVE identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilitySummary {
    /// Unique critical vulnerabilities.
    pub critical_count: u32,
    /// Unique high vulnerabilities.
    pub high_count: u32,
    /// Unique medium vulnerabilities.
    pub medium_count: u32,
    /// Unique low vulnerabilities.
    pub low_count: u32,
    /// Blocking vulnerability ids in first-seen order, without duplicates.
    pub blocking_cves: Vec<String>,
    /// Blocking candidates excluded because no fix exists.
    pub ignored_unfixed: u32,
}

impl VulnerabilitySummary {
    /// Increments the counter for a counted severity.
    pub fn count(&mut self, severity: Severity) {
        let counter = match severity {
            Severity::Critical => &mut self.critical_count,
            Severity::High => &mut self.high_count,
            Severity::Medium => &mut self.medium_count,
            Severity::Low => &mut self.low_count,
            Severity::Unknown => return,
        };
        *counter = counter.saturating_add(1);
    }

    /// Returns the number of counted vulnerabilities.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.critical_count
            .saturating_add(self.high_count)
            .saturating_add(self.medium_count)
            .saturating_add(self.low_count)
    }
}

/// Pass/block decision of the security scan gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGateDecision {
    /// Whether promotion may proceed.
    pub passed: bool,
    /// Whether blocking vulnerabilities were found.
    pub blocked: bool,
    /// Blocking vulnerability ids.
    pub blocking_cves: Vec<String>,
    /// Human-readable block reason, present only when blocked.
    pub reason: Option<String>,
    /// Summary the decision was made from.
    pub summary: VulnerabilitySummary,
}

#[cfg(test)]
mod tests {
    use super::{ScannerFormat, SecurityGateConfig, Severity, VulnerabilitySummary};

    #[test]
    fn severity_labels_are_case_insensitive() {
        assert_eq!(Severity::from_label("critical"), Severity::Critical);
        assert_eq!(Severity::from_label("High"), Severity::High);
        assert_eq!(Severity::from_label("Negligible"), Severity::Unknown);
    }

    #[test]
    fn unknown_severity_is_not_counted() {
        let mut summary = VulnerabilitySummary::default();
        summary.count(Severity::Unknown);
        summary.count(Severity::Low);
        assert_eq!(summary.total_count(), 1);
        assert_eq!(summary.low_count, 1);
    }

    #[test]
    fn default_config_blocks_critical_and_high() {
        let config = SecurityGateConfig::default();
        assert!(config.blocks(Severity::Critical));
        assert!(config.blocks(Severity::High));
        assert!(!config.blocks(Severity::Medium));
        assert!(!config.ignore_unfixed);
        assert_eq!(config.scanner, ScannerFormat::Trivy);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: Result<SecurityGateConfig, _> =
            serde_json::from_str(r#"{"scanner":"grype","ignore_unfixed":true}"#);
        let Ok(config) = config else {
            panic!("config should deserialize");
        };
        assert_eq!(config.scanner, ScannerFormat::Grype);
        assert_eq!(
            config.block_on_severity,
            vec![Severity::Critical, Severity::High]
        );
    }
}
