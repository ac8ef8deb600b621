use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use floe_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::gate::GateKind;
use crate::vulnerability::SecurityGateConfig;

/// Operator and group allow-lists guarding one environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRule {
    /// Groups allowed to promote, in priority order.
    #[serde(default)]
    pub allowed_groups: Vec<String>,
    /// Individual operators allowed to promote.
    #[serde(default)]
    pub allowed_operators: Vec<String>,
    /// Whether the operator who produced an artifact may not also promote it.
    #[serde(default)]
    pub separation_of_duties: bool,
}

impl AuthorizationRule {
    /// Creates a rule with duplicate entries removed, keeping first occurrences.
    #[must_use]
    pub fn new(
        allowed_groups: Vec<String>,
        allowed_operators: Vec<String>,
        separation_of_duties: bool,
    ) -> Self {
        Self {
            allowed_groups: dedup_preserving_order(allowed_groups),
            allowed_operators: dedup_preserving_order(allowed_operators),
            separation_of_duties,
        }
    }
}

/// Administrative lock that blocks promotions and rollbacks into an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentLock {
    /// Why the environment is locked, e.g. an active incident.
    pub reason: String,
    /// Identity that placed the lock.
    pub locked_by: String,
    /// When the lock was placed.
    #[serde(default)]
    pub locked_at: Option<DateTime<Utc>>,
}

/// One deployment stage in the promotion chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    name: String,
    #[serde(default)]
    gates: BTreeMap<GateKind, bool>,
    #[serde(default)]
    authorization: Option<AuthorizationRule>,
    #[serde(default)]
    security_gate: Option<SecurityGateConfig>,
    #[serde(default)]
    lock: Option<EnvironmentLock>,
}

impl Environment {
    /// Creates an environment without gates, rules or locks.
    pub fn new(name: impl Into<String>) -> AppResult<Self> {
        let name = name.into();
        validate_environment_name(name.as_str())?;

        Ok(Self {
            name,
            gates: BTreeMap::new(),
            authorization: None,
            security_gate: None,
            lock: None,
        })
    }

    /// Enables or disables one gate.
    #[must_use]
    pub fn with_gate(mut self, gate: GateKind, enabled: bool) -> Self {
        self.gates.insert(gate, enabled);
        self
    }

    /// Attaches an authorization rule.
    #[must_use]
    pub fn with_authorization(mut self, rule: AuthorizationRule) -> Self {
        self.authorization = Some(rule);
        self
    }

    /// Attaches security scan thresholds.
    #[must_use]
    pub fn with_security_gate(mut self, config: SecurityGateConfig) -> Self {
        self.security_gate = Some(config);
        self
    }

    /// Locks the environment.
    #[must_use]
    pub fn with_lock(mut self, lock: EnvironmentLock) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Returns the environment name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns whether the gate is enabled.
    #[must_use]
    pub fn is_gate_enabled(&self, gate: GateKind) -> bool {
        self.gates.get(&gate).copied().unwrap_or(false)
    }

    /// Returns enabled gates in canonical execution order.
    #[must_use]
    pub fn enabled_gates(&self) -> Vec<GateKind> {
        GateKind::all()
            .iter()
            .copied()
            .filter(|gate| self.is_gate_enabled(*gate))
            .collect()
    }

    /// Returns the optional authorization rule.
    #[must_use]
    pub fn authorization(&self) -> Option<&AuthorizationRule> {
        self.authorization.as_ref()
    }

    /// Returns the optional security gate thresholds.
    #[must_use]
    pub fn security_gate(&self) -> Option<&SecurityGateConfig> {
        self.security_gate.as_ref()
    }

    /// Returns the active lock, if any.
    #[must_use]
    pub fn lock(&self) -> Option<&EnvironmentLock> {
        self.lock.as_ref()
    }

    /// Fails with [`AppError::EnvironmentLocked`] when the environment is locked.
    pub fn ensure_unlocked(&self) -> AppResult<()> {
        match &self.lock {
            Some(lock) => Err(AppError::EnvironmentLocked {
                environment: self.name.clone(),
                reason: lock.reason.clone(),
                locked_by: lock.locked_by.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Deserialize)]
struct PromotionConfigDocument {
    environments: Vec<Environment>,
}

/// Ordered promotion chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PromotionConfigDocument")]
pub struct PromotionConfig {
    environments: Vec<Environment>,
}

impl TryFrom<PromotionConfigDocument> for PromotionConfig {
    type Error = AppError;

    fn try_from(value: PromotionConfigDocument) -> Result<Self, Self::Error> {
        Self::new(value.environments)
    }
}

impl PromotionConfig {
    /// Creates a validated promotion chain.
    pub fn new(environments: Vec<Environment>) -> AppResult<Self> {
        if environments.is_empty() {
            return Err(AppError::Configuration(
                "promotion config requires at least one environment".to_owned(),
            ));
        }

        let mut seen = HashSet::new();
        for environment in &environments {
            validate_environment_name(environment.name())
                .map_err(|error| AppError::Configuration(error.to_string()))?;
            if !seen.insert(environment.name()) {
                return Err(AppError::Configuration(format!(
                    "environment '{}' is declared more than once",
                    environment.name()
                )));
            }
        }

        Ok(Self { environments })
    }

    /// Returns environments in promotion order.
    #[must_use]
    pub fn environments(&self) -> &[Environment] {
        self.environments.as_slice()
    }

    /// Returns environment names in promotion order.
    #[must_use]
    pub fn environment_names(&self) -> Vec<&str> {
        self.environments
            .iter()
            .map(Environment::name)
            .collect()
    }

    /// Finds an environment by name.
    #[must_use]
    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.environments
            .iter()
            .find(|environment| environment.name() == name)
    }

    /// Finds an environment by name or fails with a configuration error.
    pub fn require_environment(&self, name: &str) -> AppResult<&Environment> {
        self.environment(name).ok_or_else(|| {
            AppError::Configuration(format!(
                "unknown environment '{name}', configured environments: [{}]",
                self.environment_names().join(", ")
            ))
        })
    }

    /// Returns the zero-based position of an environment in the chain.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.environments
            .iter()
            .position(|environment| environment.name() == name)
    }

    /// Returns the environment directly after `name`, if any.
    #[must_use]
    pub fn next_environment(&self, name: &str) -> Option<&Environment> {
        self.position(name)
            .and_then(|position| self.environments.get(position.saturating_add(1)))
    }

    /// Validates that `to` directly follows `from` and returns both environments.
    pub fn validate_transition(
        &self,
        from: &str,
        to: &str,
    ) -> AppResult<(&Environment, &Environment)> {
        let source = self.require_environment(from)?;
        let target = self.require_environment(to)?;

        match self.next_environment(from) {
            Some(next) if next.name() == to => Ok((source, target)),
            Some(next) => Err(AppError::Configuration(format!(
                "transition '{from}' -> '{to}' is not allowed, '{from}' promotes only to '{}'",
                next.name()
            ))),
            None => Err(AppError::Configuration(format!(
                "transition '{from}' -> '{to}' is not allowed, '{from}' is the final environment"
            ))),
        }
    }
}

fn validate_environment_name(name: &str) -> AppResult<()> {
    if name.is_empty() || !name.chars().all(|character| character.is_ascii_lowercase()) {
        return Err(AppError::Validation(format!(
            "environment name '{name}' must be non-empty lower-case ASCII letters"
        )));
    }

    Ok(())
}

fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
