use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use floe_core::{AppError, AppResult};
use floe_domain::tag::{environment_tag, latest_tag};
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreakerRegistry;
use crate::registry_ports::{RegistryTransport, TransportError};

/// Breaker- and timeout-guarded access to one registry.
#[derive(Clone)]
pub struct RegistryFacade {
    transport: Arc<dyn RegistryTransport>,
    breakers: Arc<CircuitBreakerRegistry>,
    call_timeout: Duration,
}

impl RegistryFacade {
    /// Creates a facade sharing breakers from `breakers`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn RegistryTransport>,
        breakers: Arc<CircuitBreakerRegistry>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            breakers,
            call_timeout,
        }
    }

    /// Returns the registry identity.
    #[must_use]
    pub fn registry(&self) -> &str {
        self.transport.registry()
    }

    /// Resolves `tag` to its digest, failing with [`AppError::ArtifactNotFound`].
    pub async fn resolve_digest(&self, tag: &str) -> AppResult<String> {
        self.call("get_digest", tag, self.transport.get_digest(tag)).await
    }

    /// Resolves `tag`, returning `None` when the registry reports it missing.
    pub async fn try_resolve_digest(&self, tag: &str) -> AppResult<Option<String>> {
        match self.resolve_digest(tag).await {
            Ok(digest) => Ok(Some(digest)),
            Err(AppError::ArtifactNotFound { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Points `{tag}-{environment}` at the digest.
    pub async fn create_environment_tag(
        &self,
        tag: &str,
        environment: &str,
        digest: &str,
    ) -> AppResult<String> {
        let name = environment_tag(tag, environment);
        self.create_tag(name.as_str(), digest).await?;
        Ok(name)
    }

    /// Points `latest-{environment}` at the digest.
    pub async fn update_latest_tag(&self, environment: &str, digest: &str) -> AppResult<String> {
        let name = latest_tag(environment);
        self.create_tag(name.as_str(), digest).await?;
        Ok(name)
    }

    /// Creates or moves an arbitrary tag.
    pub async fn create_tag(&self, name: &str, digest: &str) -> AppResult<()> {
        self.call("create_tag", name, self.transport.create_tag(name, digest)).await
    }

    /// Lists repository tags.
    pub async fn list_tags(&self) -> AppResult<Vec<String>> {
        self.call("list_tags", "*", self.transport.list_tags()).await
    }

    /// Reads manifest annotations of the tagged artifact.
    pub async fn read_annotations(&self, tag: &str) -> AppResult<BTreeMap<String, String>> {
        self.call("get_annotations", tag, self.transport.get_annotations(tag)).await
    }

    /// Merges annotations into the manifest of the tagged artifact.
    pub async fn write_annotations(
        &self,
        tag: &str,
        annotations: BTreeMap<String, String>,
    ) -> AppResult<()> {
        self.call(
            "set_annotations",
            tag,
            self.transport.set_annotations(tag, annotations),
        )
        .await
    }

    async fn call<T, F>(&self, operation: &'static str, reference: &str, future: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let registry = self.registry().to_owned();
        let breaker = self.breakers.breaker_for(registry.as_str()).await;
        breaker.acquire(Utc::now(), self.call_timeout).await?;

        match tokio::time::timeout(self.call_timeout, future).await {
            Ok(Ok(value)) => {
                breaker.record_success().await;
                debug!(registry = %registry, operation, reference, "registry call succeeded");
                Ok(value)
            }
            Ok(Err(TransportError::NotFound(detail))) => {
                breaker.record_success().await;
                debug!(registry = %registry, operation, reference, detail = %detail, "registry reported not found");
                Err(AppError::ArtifactNotFound {
                    reference: reference.to_owned(),
                    registry,
                })
            }
            Ok(Err(TransportError::Unavailable(reason))) => {
                breaker.record_failure(Utc::now()).await;
                warn!(registry = %registry, operation, reference, error = %reason, "registry call failed");
                Err(AppError::RegistryUnavailable { registry, reason })
            }
            Err(_) => {
                breaker.record_failure(Utc::now()).await;
                let reason = format!(
                    "{operation} timed out after {}ms",
                    self.call_timeout.as_millis()
                );
                warn!(registry = %registry, operation, reference, error = %reason, "registry call timed out");
                Err(AppError::RegistryUnavailable { registry, reason })
            }
        }
    }
}
