use floe_core::{AppError, AppResult};
use floe_domain::tag::{
    SemanticVersionTag, environment_tag, latest_tag, next_rollback_number, promoted_versions,
};
use floe_domain::{ArtifactReference, NewRollbackRecord, RollbackRecord};
use tracing::{debug, info, warn};

use super::audit::{ROLLBACK_ANNOTATION, ROLLBACK_HISTORY_ANNOTATION, record_annotations};
use super::{PromotionController, RollbackInput, resolve_trace_id};

impl PromotionController {
    /// Restores `input.tag` as the active artifact of `input.environment`.
    ///
    /// The version must currently carry its environment tag. Moving
    /// `latest-{env}` back to the restored digest is the only write whose
    /// failure aborts the call; the numbered rollback tag and the audit
    /// record are best effort.
    pub async fn rollback(&self, input: RollbackInput) -> AppResult<RollbackRecord> {
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "rollback reason must not be empty".to_owned(),
            ));
        }

        let trace_id = resolve_trace_id(input.trace_id.clone());
        let version = SemanticVersionTag::parse(&input.tag)?;
        let environment = self.config.require_environment(&input.environment)?;
        environment.ensure_unlocked()?;

        let tags = self.registry.list_tags().await?;
        let promoted_tag = environment_tag(&input.tag, environment.name());
        if !tags.iter().any(|existing| existing == &promoted_tag) {
            return Err(AppError::VersionNotPromoted {
                tag: input.tag.clone(),
                environment: environment.name().to_owned(),
                available_versions: promoted_versions(
                    tags.iter().map(String::as_str),
                    environment.name(),
                )?,
            });
        }

        let restored_digest = self.registry.resolve_digest(&promoted_tag).await?;
        let previous_digest = self
            .registry
            .try_resolve_digest(&latest_tag(environment.name()))
            .await?
            .unwrap_or_else(|| restored_digest.clone());
        debug!(
            tag = %input.tag,
            environment = environment.name(),
            restored_digest = %restored_digest,
            previous_digest = %previous_digest,
            trace_id = %trace_id,
            "rollback target resolved"
        );

        let artifact = ArtifactReference::new(
            self.registry.registry(),
            input.tag.as_str(),
            restored_digest.as_str(),
        );
        self.gate_runner.verify_signature(&artifact).await?;
        self.authorization.require(&input.operator, environment)?;

        let number =
            next_rollback_number(tags.iter().map(String::as_str), &version, environment.name())?;
        let rollback_tag = version.rollback_tag(environment.name(), number);

        self.registry
            .update_latest_tag(environment.name(), &restored_digest)
            .await?;

        if let Err(error) = self.registry.create_tag(&rollback_tag, &restored_digest).await {
            warn!(
                tag = %input.tag,
                environment = environment.name(),
                rollback_tag = %rollback_tag,
                trace_id = %trace_id,
                error = %error,
                "failed to create rollback tag"
            );
        }

        let record = RollbackRecord::new(NewRollbackRecord {
            artifact_digest: restored_digest,
            previous_digest,
            environment: environment.name().to_owned(),
            reason: reason.to_owned(),
            operator: input.operator.subject().to_owned(),
            rollback_tag,
            trace_id: trace_id.clone(),
        })?;

        if let Err(error) = self.store_rollback_record(&input.tag, &record).await {
            warn!(
                tag = %input.tag,
                environment = environment.name(),
                rollback_id = %record.rollback_id(),
                trace_id = %trace_id,
                error = %error,
                "failed to persist rollback record"
            );
        }

        info!(
            tag = %input.tag,
            environment = environment.name(),
            rollback_tag = record.rollback_tag(),
            digest = record.artifact_digest(),
            previous_digest = record.previous_digest(),
            operator = record.operator(),
            rollback_id = %record.rollback_id(),
            trace_id = %trace_id,
            "environment rolled back"
        );

        Ok(record)
    }

    async fn store_rollback_record(&self, tag: &str, record: &RollbackRecord) -> AppResult<()> {
        let existing = self.registry.read_annotations(tag).await?;
        let update = record_annotations(
            &existing,
            ROLLBACK_ANNOTATION,
            ROLLBACK_HISTORY_ANNOTATION,
            record,
            self.settings.max_history_entries,
        )?;

        self.registry.write_annotations(tag, update).await
    }
}
