use std::fmt::Write as _;

use floe_application::GateEvaluation;
use floe_domain::{GateResult, PromotionRecord, PromotionStatusResponse, RollbackRecord};
use serde_json::{Value, json};

use crate::OutputFormat;

/// Command result prepared for both output formats.
#[derive(Debug, Clone)]
pub struct Rendered {
    text: String,
    json: Value,
}

impl Rendered {
    pub fn promotion(record: &PromotionRecord) -> Self {
        let mode = if record.is_dry_run() { " (dry run)" } else { "" };
        let mut text = format!(
            "promoted {} from {} to {}{mode}\n  promotion_id: {}\n  authorized_via: {}\n  trace_id: {}",
            record.artifact_digest(),
            record.source_environment(),
            record.target_environment(),
            record.promotion_id(),
            record.authorized_via(),
            record.trace_id(),
        );
        push_gate_lines(&mut text, record.gate_results());

        Self {
            text,
            json: json!({
                "promotion_id": record.promotion_id(),
                "artifact_digest": record.artifact_digest(),
                "source_environment": record.source_environment(),
                "environment": record.target_environment(),
                "authorized_via": record.authorized_via(),
                "signature_verified": record.signature_verified(),
                "gate_results": record.gate_results(),
                "dry_run": record.is_dry_run(),
                "trace_id": record.trace_id(),
            }),
        }
    }

    pub fn rollback(record: &RollbackRecord) -> Self {
        Self {
            text: format!(
                "rolled back {} to {} (was {})\n  rollback_id: {}\n  rollback_tag: {}\n  trace_id: {}",
                record.environment(),
                record.artifact_digest(),
                record.previous_digest(),
                record.rollback_id(),
                record.rollback_tag(),
                record.trace_id(),
            ),
            json: json!({
                "rollback_id": record.rollback_id(),
                "artifact_digest": record.artifact_digest(),
                "previous_digest": record.previous_digest(),
                "environment": record.environment(),
                "rollback_tag": record.rollback_tag(),
                "reason": record.reason(),
                "trace_id": record.trace_id(),
            }),
        }
    }

    pub fn status(status: &PromotionStatusResponse) -> Self {
        let mut text = format!("{} -> {}", status.tag, status.digest);
        for (environment, state) in &status.environments {
            let marker = if state.promoted { "promoted" } else { "not promoted" };
            let _ = write!(text, "\n  {environment}: {marker}");
            if let Some(promoted_at) = state.promoted_at {
                let _ = write!(text, " at {}", promoted_at.to_rfc3339());
            }
        }
        for record in &status.history {
            let _ = write!(
                text,
                "\n  {} {} -> {} by {}",
                record.promoted_at().to_rfc3339(),
                record.source_environment(),
                record.target_environment(),
                record.operator(),
            );
        }

        Self {
            text,
            json: serde_json::to_value(status).unwrap_or(Value::Null),
        }
    }

    pub fn gates(evaluation: &GateEvaluation) -> Self {
        let mut text = format!(
            "gates for {} ({}) into {}",
            evaluation.tag, evaluation.digest, evaluation.environment
        );
        push_gate_lines(&mut text, &evaluation.report.results);

        Self {
            text,
            json: json!({
                "tag": evaluation.tag,
                "digest": evaluation.digest,
                "environment": evaluation.environment,
                "passed": evaluation.report.first_failure().is_none(),
                "signature_verified": evaluation.report.signature_verified,
                "gate_results": evaluation.report.results,
            }),
        }
    }

    pub fn format(&self, output: OutputFormat) -> String {
        match output {
            OutputFormat::Text => self.text.clone(),
            OutputFormat::Json => self.json.to_string(),
        }
    }
}

fn push_gate_lines(text: &mut String, results: &[GateResult]) {
    for result in results {
        let _ = write!(
            text,
            "\n  {}: {} ({}ms)",
            result.gate().as_str(),
            result.status().as_str(),
            result.duration_ms()
        );
        if let Some(detail) = result.detail() {
            let _ = write!(text, " {detail}");
        }
    }
}
