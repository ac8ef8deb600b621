use std::collections::{BTreeMap, HashSet};

use floe_core::AppResult;
use floe_domain::tag::environment_tag;
use floe_domain::{
    ArtifactReference, Environment, EnvironmentStatus, PromotionRecord, PromotionStatusResponse,
    RollbackRecord,
};

use super::audit::{PROMOTION_HISTORY_ANNOTATION, ROLLBACK_HISTORY_ANNOTATION, decode_history};
use super::{GateEvaluation, PromotionController};
use crate::gate_runner::GateRunMode;

impl PromotionController {
    /// Returns where `tag` is promoted and its promotion history.
    ///
    /// An environment counts as promoted only while its environment tag
    /// resolves to the tag's digest. History is most recent first.
    pub async fn get_status(
        &self,
        tag: &str,
        environment: Option<&str>,
        history_limit: Option<usize>,
    ) -> AppResult<PromotionStatusResponse> {
        let environments: Vec<&Environment> = match environment {
            Some(name) => vec![self.config.require_environment(name)?],
            None => self.config.environments().iter().collect(),
        };

        let digest = self.registry.resolve_digest(tag).await?;
        let annotations = self.registry.read_annotations(tag).await?;
        let mut history: Vec<PromotionRecord> =
            decode_history(&annotations, PROMOTION_HISTORY_ANNOTATION)?;
        history.reverse();

        let tags: HashSet<String> = self.registry.list_tags().await?.into_iter().collect();
        let mut statuses = BTreeMap::new();
        for environment in environments {
            let promoted_tag = environment_tag(tag, environment.name());
            let promoted = tags.contains(&promoted_tag)
                && self
                    .registry
                    .try_resolve_digest(&promoted_tag)
                    .await?
                    .is_some_and(|current| current == digest);
            let promoted_at = promoted
                .then(|| {
                    history.iter().find(|record| {
                        !record.is_dry_run()
                            && record.target_environment() == environment.name()
                            && record.artifact_digest() == digest
                    })
                })
                .flatten()
                .map(PromotionRecord::promoted_at);

            statuses.insert(
                environment.name().to_owned(),
                EnvironmentStatus {
                    promoted,
                    promoted_at,
                },
            );
        }

        if let Some(limit) = history_limit {
            history.truncate(limit);
        }

        Ok(PromotionStatusResponse {
            tag: tag.to_owned(),
            digest,
            environments: statuses,
            history,
        })
    }

    /// Returns stored rollback records for `tag`, most recent first.
    pub async fn rollback_history(&self, tag: &str) -> AppResult<Vec<RollbackRecord>> {
        let annotations = self.registry.read_annotations(tag).await?;
        let mut history: Vec<RollbackRecord> =
            decode_history(&annotations, ROLLBACK_HISTORY_ANNOTATION)?;
        history.reverse();
        Ok(history)
    }

    /// Runs every enabled gate of the transition without mutating the registry.
    pub async fn evaluate_gates(
        &self,
        tag: &str,
        from_environment: &str,
        to_environment: &str,
    ) -> AppResult<GateEvaluation> {
        let (_, target) = self
            .config
            .validate_transition(from_environment, to_environment)?;
        let digest = self.registry.resolve_digest(tag).await?;
        let artifact = ArtifactReference::new(self.registry.registry(), tag, digest.as_str());
        let report = self
            .gate_runner
            .run(target, &artifact, GateRunMode::RunAll)
            .await?;

        Ok(GateEvaluation {
            tag: tag.to_owned(),
            digest,
            environment: target.name().to_owned(),
            report,
        })
    }
}
