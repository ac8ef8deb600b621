use floe_core::{AppError, AppResult};
use floe_domain::{ArtifactReference, NewPromotionRecord, PromotionRecord};
use tracing::{debug, info, warn};

use super::audit::{PROMOTION_ANNOTATION, PROMOTION_HISTORY_ANNOTATION, record_annotations};
use super::{PromoteInput, PromotionController, resolve_trace_id};

#[derive(Debug, Clone, Copy)]
enum PromotionPhase {
    Validating,
    GatesRunning,
    Authorizing,
    TaggingCritical,
    TaggingBestEffort,
    RecordingAudit,
}

impl PromotionPhase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::GatesRunning => "gates_running",
            Self::Authorizing => "authorizing",
            Self::TaggingCritical => "tagging_critical",
            Self::TaggingBestEffort => "tagging_best_effort",
            Self::RecordingAudit => "recording_audit",
        }
    }
}

impl PromotionController {
    /// Promotes `input.tag` from one environment to the next.
    ///
    /// Nothing is written to the registry until gates and authorization pass.
    /// Creating the environment tag is the only mutation whose failure aborts
    /// the call; the latest tag and the audit record are best effort.
    pub async fn promote(&self, input: PromoteInput) -> AppResult<PromotionRecord> {
        let trace_id = resolve_trace_id(input.trace_id.clone());
        let tag = input.tag.as_str();
        let enter = |phase: PromotionPhase| {
            debug!(
                phase = phase.as_str(),
                tag,
                environment = %input.to_environment,
                trace_id = %trace_id,
                "promotion phase"
            );
        };

        enter(PromotionPhase::Validating);
        let (source, target) = self
            .config
            .validate_transition(&input.from_environment, &input.to_environment)?;
        target.ensure_unlocked()?;
        let digest = self.registry.resolve_digest(tag).await?;
        let artifact = ArtifactReference::new(self.registry.registry(), tag, digest.as_str());

        enter(PromotionPhase::GatesRunning);
        let report = self.gate_runner.run(target, &artifact, input.gate_mode).await?;
        if let Some(failure) = report.first_failure() {
            return Err(AppError::GateFailed {
                gate: failure.gate().to_string(),
                environment: target.name().to_owned(),
                detail: failure.detail().unwrap_or_default().to_owned(),
            });
        }

        enter(PromotionPhase::Authorizing);
        let authorization = self.authorization.require(&input.operator, target)?;

        let new_record = NewPromotionRecord {
            artifact_digest: digest.clone(),
            source_environment: source.name().to_owned(),
            target_environment: target.name().to_owned(),
            operator: input.operator.subject().to_owned(),
            operator_groups: input.operator.groups().to_vec(),
            authorization,
            gate_results: report.results,
            signature_verified: report.signature_verified,
            trace_id: trace_id.clone(),
            dry_run: input.dry_run,
        };

        if input.dry_run {
            info!(
                tag,
                environment = target.name(),
                digest = %digest,
                trace_id = %trace_id,
                "dry run passed gates and authorization"
            );
            return Ok(PromotionRecord::new(new_record));
        }

        enter(PromotionPhase::TaggingCritical);
        let environment_tag = self
            .registry
            .create_environment_tag(tag, target.name(), digest.as_str())
            .await?;

        enter(PromotionPhase::TaggingBestEffort);
        if let Err(error) = self
            .registry
            .update_latest_tag(target.name(), digest.as_str())
            .await
        {
            warn!(
                tag,
                environment = target.name(),
                digest = %digest,
                trace_id = %trace_id,
                error = %error,
                "failed to update latest tag; environment tag is authoritative"
            );
        }

        let record = PromotionRecord::new(new_record);

        enter(PromotionPhase::RecordingAudit);
        if let Err(error) = self.store_promotion_record(tag, &record).await {
            warn!(
                tag,
                environment = target.name(),
                promotion_id = %record.promotion_id(),
                trace_id = %trace_id,
                error = %error,
                "failed to persist promotion record"
            );
        }

        info!(
            tag,
            environment_tag = %environment_tag,
            environment = target.name(),
            digest = %digest,
            operator = record.operator(),
            authorized_via = %record.authorized_via(),
            promotion_id = %record.promotion_id(),
            trace_id = %trace_id,
            "artifact promoted"
        );

        Ok(record)
    }

    async fn store_promotion_record(&self, tag: &str, record: &PromotionRecord) -> AppResult<()> {
        let existing = self.registry.read_annotations(tag).await?;
        let update = record_annotations(
            &existing,
            PROMOTION_ANNOTATION,
            PROMOTION_HISTORY_ANNOTATION,
            record,
            self.settings.max_history_entries,
        )?;

        self.registry.write_annotations(tag, update).await
    }
}
