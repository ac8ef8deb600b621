use std::sync::Arc;
use std::time::Duration;

use floe_core::OperatorIdentity;
use floe_domain::PromotionConfig;
use uuid::Uuid;

use crate::authorization_engine::AuthorizationEngine;
use crate::circuit_breaker::{CircuitBreakerRegistry, CircuitBreakerSettings};
use crate::gate_runner::{GateReport, GateRunMode, GateRunner};
use crate::registry_facade::RegistryFacade;
use crate::registry_ports::RegistryTransport;

mod audit;
mod promote;
mod rollback;
mod status;

pub use audit::{
    PROMOTION_ANNOTATION, PROMOTION_HISTORY_ANNOTATION, ROLLBACK_ANNOTATION,
    ROLLBACK_HISTORY_ANNOTATION,
};

/// Runtime knobs of the promotion controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Deadline applied to every registry call.
    pub registry_call_timeout: Duration,
    /// Maximum entries kept in each history annotation; oldest are dropped.
    pub max_history_entries: usize,
    /// Breaker thresholds for registries the controller talks to.
    pub circuit_breaker: CircuitBreakerSettings,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            registry_call_timeout: Duration::from_secs(30),
            max_history_entries: 100,
            circuit_breaker: CircuitBreakerSettings::default(),
        }
    }
}

/// Input payload for a forward promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoteInput {
    /// Version tag to promote.
    pub tag: String,
    /// Environment the artifact currently lives in.
    pub from_environment: String,
    /// Environment to promote into.
    pub to_environment: String,
    /// Acting operator.
    pub operator: OperatorIdentity,
    /// Caller-supplied trace id; generated when absent.
    pub trace_id: Option<String>,
    /// Gate execution mode.
    pub gate_mode: GateRunMode,
    /// Evaluate gates and authorization without touching the registry.
    pub dry_run: bool,
}

/// Input payload for a rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackInput {
    /// Version tag to restore.
    pub tag: String,
    /// Environment to roll back.
    pub environment: String,
    /// Why the rollback is happening.
    pub reason: String,
    /// Acting operator.
    pub operator: OperatorIdentity,
    /// Caller-supplied trace id; generated when absent.
    pub trace_id: Option<String>,
}

/// Gate report for a transition, produced without mutating the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateEvaluation {
    /// Evaluated tag.
    pub tag: String,
    /// Digest the tag resolved to.
    pub digest: String,
    /// Target environment whose gates ran.
    pub environment: String,
    /// Every enabled gate's result.
    pub report: GateReport,
}

/// Orchestrates promote, rollback and status workflows against one registry.
#[derive(Clone)]
pub struct PromotionController {
    config: Arc<PromotionConfig>,
    registry: RegistryFacade,
    breakers: Arc<CircuitBreakerRegistry>,
    gate_runner: GateRunner,
    authorization: AuthorizationEngine,
    settings: ControllerSettings,
}

impl PromotionController {
    /// Creates a controller owning a fresh breaker registry built from `settings`.
    #[must_use]
    pub fn new(
        config: PromotionConfig,
        transport: Arc<dyn RegistryTransport>,
        gate_runner: GateRunner,
        settings: ControllerSettings,
    ) -> Self {
        let breakers = Arc::new(CircuitBreakerRegistry::new(settings.circuit_breaker));
        Self::with_circuit_breakers(config, transport, gate_runner, settings, breakers)
    }

    /// Creates a controller sharing breaker state with other controllers.
    #[must_use]
    pub fn with_circuit_breakers(
        config: PromotionConfig,
        transport: Arc<dyn RegistryTransport>,
        gate_runner: GateRunner,
        settings: ControllerSettings,
        breakers: Arc<CircuitBreakerRegistry>,
    ) -> Self {
        let registry =
            RegistryFacade::new(transport, breakers.clone(), settings.registry_call_timeout);

        Self {
            config: Arc::new(config),
            registry,
            breakers,
            gate_runner,
            authorization: AuthorizationEngine,
            settings,
        }
    }

    /// Returns the breaker registry guarding registry calls.
    #[must_use]
    pub fn circuit_breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }
}

fn resolve_trace_id(trace_id: Option<String>) -> String {
    trace_id
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}
