use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use floe_core::{AppError, AppResult};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Breaker position for one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls fail fast until the cool-down elapses.
    Open,
    /// A single trial call decides whether to close again.
    HalfOpen,
}

/// Thresholds shared by every breaker of a [`CircuitBreakerRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerSettings {
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl CircuitBreakerSettings {
    /// Creates settings; the threshold must be at least one.
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> AppResult<Self> {
        if failure_threshold == 0 {
            return Err(AppError::Validation(
                "circuit breaker failure threshold must be at least 1".to_owned(),
            ));
        }

        Ok(Self {
            failure_threshold,
            recovery_timeout,
        })
    }

    /// Returns consecutive failures that open the circuit.
    #[must_use]
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Returns the cool-down before a trial call is admitted.
    #[must_use]
    pub fn recovery_timeout(&self) -> Duration {
        self.recovery_timeout
    }

    fn recovery_deadline(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        deadline_after(now, self.recovery_timeout)
    }

    fn trial_deadline(&self, now: DateTime<Utc>, call_timeout: Duration) -> DateTime<Utc> {
        deadline_after(now, self.recovery_timeout.max(call_timeout))
    }
}

fn deadline_after(now: DateTime<Utc>, timeout: Duration) -> DateTime<Utc> {
    let delta = TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX);
    now.checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Snapshot of one registry's breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitBreakerState {
    /// Current position.
    pub state: CircuitState,
    /// Consecutive failures since the last success.
    pub failure_count: u32,
    /// Earliest instant a trial call is admitted while open, or the trial
    /// deadline while half-open.
    pub recovery_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    trial_in_flight: bool,
}

impl Default for CircuitBreakerState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            recovery_at: None,
            trial_in_flight: false,
        }
    }
}

impl CircuitBreakerState {
    fn admit(
        &mut self,
        settings: &CircuitBreakerSettings,
        now: DateTime<Utc>,
        call_timeout: Duration,
    ) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if self.recovery_at.is_some_and(|recovery_at| now < recovery_at) {
                    return false;
                }
                self.state = CircuitState::HalfOpen;
                self.start_trial(settings, now, call_timeout);
                true
            }
            CircuitState::HalfOpen => {
                let trial_pending = self.trial_in_flight
                    && self.recovery_at.is_some_and(|deadline| now < deadline);
                if trial_pending {
                    return false;
                }
                self.start_trial(settings, now, call_timeout);
                true
            }
        }
    }

    fn start_trial(
        &mut self,
        settings: &CircuitBreakerSettings,
        now: DateTime<Utc>,
        call_timeout: Duration,
    ) {
        self.trial_in_flight = true;
        self.recovery_at = Some(settings.trial_deadline(now, call_timeout));
    }

    fn succeed(&mut self) {
        *self = Self::default();
    }

    fn fail(&mut self, settings: &CircuitBreakerSettings, now: DateTime<Utc>) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.trial_in_flight = false;

        if self.state == CircuitState::HalfOpen
            || self.failure_count >= settings.failure_threshold
        {
            self.state = CircuitState::Open;
            self.recovery_at = Some(settings.recovery_deadline(now));
        }
    }
}

/// Failure tracker guarding calls to one registry host.
#[derive(Debug)]
pub struct CircuitBreaker {
    registry: String,
    settings: CircuitBreakerSettings,
    state: Mutex<CircuitBreakerState>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    #[must_use]
    pub fn new(registry: impl Into<String>, settings: CircuitBreakerSettings) -> Self {
        Self {
            registry: registry.into(),
            settings,
            state: Mutex::new(CircuitBreakerState::default()),
        }
    }

    /// Admits a call or fails fast with [`AppError::CircuitBreakerOpen`].
    ///
    /// A half-open trial stays exclusive until its outcome is recorded or
    /// until the later of the recovery timeout and `call_timeout` elapses.
    pub async fn acquire(&self, now: DateTime<Utc>, call_timeout: Duration) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let previous = state.state;

        if state.admit(&self.settings, now, call_timeout) {
            if previous == CircuitState::Open {
                info!(registry = %self.registry, "circuit breaker half-open, admitting trial call");
            }
            return Ok(());
        }

        Err(AppError::CircuitBreakerOpen {
            registry: self.registry.clone(),
            failure_count: state.failure_count,
            recovery_at: state.recovery_at.unwrap_or(now),
        })
    }

    /// Records a call that reached the registry and got an answer.
    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;
        if state.state != CircuitState::Closed {
            info!(registry = %self.registry, "circuit breaker closed");
        }
        state.succeed();
    }

    /// Records a transport failure or timeout.
    pub async fn record_failure(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        let previous = state.state;
        state.fail(&self.settings, now);

        if previous != CircuitState::Open && state.state == CircuitState::Open {
            warn!(
                registry = %self.registry,
                failure_count = state.failure_count,
                recovery_at = ?state.recovery_at,
                "circuit breaker opened"
            );
        }
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> CircuitBreakerState {
        self.state.lock().await.clone()
    }
}

/// Process-owned set of breakers, one per registry host, created lazily.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    settings: CircuitBreakerSettings,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    /// Creates an empty registry whose breakers use `settings`.
    #[must_use]
    pub fn new(settings: CircuitBreakerSettings) -> Self {
        Self {
            settings,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the breaker for `registry`, creating it on first use.
    pub async fn breaker_for(&self, registry: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.read().await.get(registry) {
            return breaker.clone();
        }

        self.breakers
            .write()
            .await
            .entry(registry.to_owned())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(registry, self.settings)))
            .clone()
    }

    /// Returns the state of an existing breaker.
    pub async fn snapshot(&self, registry: &str) -> Option<CircuitBreakerState> {
        let breaker = self.breakers.read().await.get(registry).cloned()?;
        Some(breaker.snapshot().await)
    }
}

#[cfg(test)]
mod tests;
