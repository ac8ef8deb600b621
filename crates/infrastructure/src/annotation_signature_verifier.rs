use async_trait::async_trait;
use floe_application::{RegistryFacade, SignatureStatus, SignatureVerification, SignatureVerifier};
use floe_core::AppResult;
use floe_domain::ArtifactReference;
use serde::Deserialize;
use tracing::debug;

/// Manifest annotation carrying the keyless-signing bundle summary.
pub const SIGNATURE_BUNDLE_ANNOTATION: &str = "dev.floe.signature.bundle";

#[derive(Debug, Deserialize)]
struct SignatureBundle {
    digest: String,
    issuer: String,
}

/// Signature verifier reading bundles attached by the signing pipeline.
///
/// A bundle is valid when it names the exact digest being promoted.
#[derive(Clone)]
pub struct AnnotationSignatureVerifier {
    registry: RegistryFacade,
}

impl AnnotationSignatureVerifier {
    /// Creates a verifier reading annotations through `registry`.
    #[must_use]
    pub fn new(registry: RegistryFacade) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl SignatureVerifier for AnnotationSignatureVerifier {
    async fn verify(&self, artifact: &ArtifactReference) -> AppResult<SignatureVerification> {
        let annotations = self.registry.read_annotations(&artifact.tag).await?;

        let Some(raw) = annotations.get(SIGNATURE_BUNDLE_ANNOTATION) else {
            return Ok(SignatureVerification {
                status: SignatureStatus::Invalid,
                detail: Some(format!(
                    "no '{SIGNATURE_BUNDLE_ANNOTATION}' annotation on artifact"
                )),
            });
        };

        let bundle: SignatureBundle = match serde_json::from_str(raw) {
            Ok(bundle) => bundle,
            Err(error) => {
                return Ok(SignatureVerification {
                    status: SignatureStatus::Invalid,
                    detail: Some(format!("malformed signature bundle: {error}")),
                });
            }
        };

        if bundle.digest != artifact.digest {
            return Ok(SignatureVerification {
                status: SignatureStatus::Invalid,
                detail: Some(format!(
                    "signature bundle was issued for '{}', not '{}'",
                    bundle.digest, artifact.digest
                )),
            });
        }

        debug!(artifact = %artifact, issuer = %bundle.issuer, "signature bundle verified");
        Ok(SignatureVerification {
            status: SignatureStatus::Valid,
            detail: Some(format!("issuer={}", bundle.issuer)),
        })
    }
}
