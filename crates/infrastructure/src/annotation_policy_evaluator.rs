use async_trait::async_trait;
use floe_application::{PolicyEvaluator, PolicyOutcome, RegistryFacade};
use floe_core::AppResult;
use floe_domain::ArtifactReference;

/// Manifest annotation recording the policy enforcement verdict.
pub const POLICY_COMPLIANT_ANNOTATION: &str = "dev.floe.policy.compliant";
/// Manifest annotation summarizing policy violations.
pub const POLICY_VIOLATIONS_ANNOTATION: &str = "dev.floe.policy.violations";

/// Policy evaluator reading the verdict recorded by compiled policy enforcement.
#[derive(Clone)]
pub struct AnnotationPolicyEvaluator {
    registry: RegistryFacade,
}

impl AnnotationPolicyEvaluator {
    /// Creates an evaluator reading annotations through `registry`.
    #[must_use]
    pub fn new(registry: RegistryFacade) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl PolicyEvaluator for AnnotationPolicyEvaluator {
    async fn evaluate(&self, artifact: &ArtifactReference) -> AppResult<PolicyOutcome> {
        let annotations = self.registry.read_annotations(&artifact.tag).await?;
        let violations = annotations
            .get(POLICY_VIOLATIONS_ANNOTATION)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty());

        let outcome = match annotations
            .get(POLICY_COMPLIANT_ANNOTATION)
            .map(|value| value.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("true") => PolicyOutcome {
                compliant: true,
                detail: None,
            },
            Some("false") => PolicyOutcome {
                compliant: false,
                detail: Some(
                    violations
                        .map(|value| format!("policy violations: {value}"))
                        .unwrap_or_else(|| "artifact is not policy compliant".to_owned()),
                ),
            },
            Some(other) => PolicyOutcome {
                compliant: false,
                detail: Some(format!(
                    "'{POLICY_COMPLIANT_ANNOTATION}' must be 'true' or 'false', found '{other}'"
                )),
            },
            None => PolicyOutcome {
                compliant: false,
                detail: Some(format!(
                    "no policy verdict recorded in '{POLICY_COMPLIANT_ANNOTATION}'"
                )),
            },
        };

        Ok(outcome)
    }
}
