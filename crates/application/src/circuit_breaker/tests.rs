use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use super::{CircuitBreaker, CircuitBreakerRegistry, CircuitBreakerSettings, CircuitState};

const CALL_TIMEOUT: Duration = Duration::from_secs(1);

fn start() -> DateTime<Utc> {
    let Some(value) = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single() else {
        panic!("valid timestamp");
    };
    value
}

fn settings(threshold: u32, recovery_seconds: u64) -> CircuitBreakerSettings {
    let Ok(settings) = CircuitBreakerSettings::new(threshold, Duration::from_secs(recovery_seconds))
    else {
        panic!("valid breaker settings");
    };
    settings
}

#[test]
fn zero_threshold_is_rejected() {
    assert!(CircuitBreakerSettings::new(0, Duration::from_secs(1)).is_err());
}

#[test]
fn default_settings_match_documented_values() {
    let defaults = CircuitBreakerSettings::default();

    assert_eq!(defaults.failure_threshold(), 5);
    assert_eq!(defaults.recovery_timeout(), Duration::from_secs(60));
}

#[tokio::test]
async fn opens_after_consecutive_failures() {
    let breaker = CircuitBreaker::new("registry.example.com", settings(3, 60));
    let now = start();

    for _ in 0..2 {
        assert!(breaker.acquire(now, CALL_TIMEOUT).await.is_ok());
        breaker.record_failure(now).await;
    }
    assert_eq!(breaker.snapshot().await.state, CircuitState::Closed);

    assert!(breaker.acquire(now, CALL_TIMEOUT).await.is_ok());
    breaker.record_failure(now).await;

    let snapshot = breaker.snapshot().await;
    assert_eq!(snapshot.state, CircuitState::Open);
    assert_eq!(snapshot.failure_count, 3);
    assert_eq!(snapshot.recovery_at, Some(now + TimeDelta::seconds(60)));
}

#[tokio::test]
async fn open_breaker_fails_fast_with_context() {
    let breaker = CircuitBreaker::new("registry.example.com", settings(1, 30));
    let now = start();
    breaker.record_failure(now).await;

    let result = breaker.acquire(now + TimeDelta::seconds(10), CALL_TIMEOUT).await;

    let Err(floe_core::AppError::CircuitBreakerOpen {
        registry,
        failure_count,
        recovery_at,
    }) = result
    else {
        panic!("open breaker must reject calls");
    };
    assert_eq!(registry, "registry.example.com");
    assert_eq!(failure_count, 1);
    assert_eq!(recovery_at, now + TimeDelta::seconds(30));
}

#[tokio::test]
async fn success_resets_failure_count() {
    let breaker = CircuitBreaker::new("registry.example.com", settings(3, 60));
    let now = start();

    breaker.record_failure(now).await;
    breaker.record_failure(now).await;
    breaker.record_success().await;
    breaker.record_failure(now).await;

    let snapshot = breaker.snapshot().await;
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.failure_count, 1);
}

#[tokio::test]
async fn half_open_admits_exactly_one_trial() {
    let breaker = CircuitBreaker::new("registry.example.com", settings(1, 30));
    let now = start();
    breaker.record_failure(now).await;

    let after_cooldown = now + TimeDelta::seconds(30);
    assert!(breaker.acquire(after_cooldown, CALL_TIMEOUT).await.is_ok());
    assert_eq!(breaker.snapshot().await.state, CircuitState::HalfOpen);

    let concurrent = breaker
        .acquire(after_cooldown + TimeDelta::seconds(1), CALL_TIMEOUT)
        .await;
    assert!(matches!(
        concurrent,
        Err(floe_core::AppError::CircuitBreakerOpen { .. })
    ));
}

#[tokio::test]
async fn successful_trial_closes_the_circuit() {
    let breaker = CircuitBreaker::new("registry.example.com", settings(1, 30));
    let now = start();
    breaker.record_failure(now).await;

    assert!(breaker.acquire(now + TimeDelta::seconds(31), CALL_TIMEOUT).await.is_ok());
    breaker.record_success().await;

    let snapshot = breaker.snapshot().await;
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.failure_count, 0);
    assert_eq!(snapshot.recovery_at, None);
}

#[tokio::test]
async fn failed_trial_restarts_cooldown() {
    let breaker = CircuitBreaker::new("registry.example.com", settings(2, 30));
    let now = start();
    breaker.record_failure(now).await;
    breaker.record_failure(now).await;

    let trial_at = now + TimeDelta::seconds(45);
    assert!(breaker.acquire(trial_at, CALL_TIMEOUT).await.is_ok());
    breaker.record_failure(trial_at).await;

    let snapshot = breaker.snapshot().await;
    assert_eq!(snapshot.state, CircuitState::Open);
    assert_eq!(snapshot.recovery_at, Some(trial_at + TimeDelta::seconds(30)));
    let during_cooldown = breaker
        .acquire(trial_at + TimeDelta::seconds(29), CALL_TIMEOUT)
        .await;
    assert!(during_cooldown.is_err());
}

#[tokio::test]
async fn abandoned_trial_is_replaced_after_deadline() {
    let breaker = CircuitBreaker::new("registry.example.com", settings(1, 30));
    let now = start();
    breaker.record_failure(now).await;

    let trial_at = now + TimeDelta::seconds(30);
    assert!(breaker.acquire(trial_at, CALL_TIMEOUT).await.is_ok());

    let replacement = breaker
        .acquire(trial_at + TimeDelta::seconds(30), CALL_TIMEOUT)
        .await;
    assert!(replacement.is_ok());
}

#[tokio::test]
async fn trial_outlasting_recovery_timeout_stays_exclusive() {
    let breaker = CircuitBreaker::new("registry.example.com", settings(1, 5));
    let now = start();
    breaker.record_failure(now).await;
    let call_timeout = Duration::from_secs(30);

    let trial_at = now + TimeDelta::seconds(5);
    assert!(breaker.acquire(trial_at, call_timeout).await.is_ok());

    let while_in_flight = breaker
        .acquire(trial_at + TimeDelta::seconds(20), call_timeout)
        .await;
    assert!(while_in_flight.is_err());
    assert_eq!(
        breaker.snapshot().await.recovery_at,
        Some(trial_at + TimeDelta::seconds(30))
    );

    let after_call_timeout = breaker
        .acquire(trial_at + TimeDelta::seconds(30), call_timeout)
        .await;
    assert!(after_call_timeout.is_ok());
}

#[tokio::test]
async fn registry_shares_one_breaker_per_host() {
    let registry = Arc::new(CircuitBreakerRegistry::new(settings(1, 60)));

    let first = registry.breaker_for("registry-a.example.com").await;
    let second = registry.breaker_for("registry-a.example.com").await;
    let other = registry.breaker_for("registry-b.example.com").await;

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &other));

    first.record_failure(start()).await;
    let snapshot_a = registry.snapshot("registry-a.example.com").await;
    let snapshot_b = registry.snapshot("registry-b.example.com").await;
    assert_eq!(snapshot_a.map(|state| state.state), Some(CircuitState::Open));
    assert_eq!(snapshot_b.map(|state| state.state), Some(CircuitState::Closed));
    assert!(registry.snapshot("unknown.example.com").await.is_none());
}

#[tokio::test]
async fn concurrent_failures_are_all_counted() {
    let breaker = Arc::new(CircuitBreaker::new("registry.example.com", settings(50, 60)));
    let now = start();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let breaker = breaker.clone();
            tokio::spawn(async move { breaker.record_failure(now).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.is_ok());
    }

    assert_eq!(breaker.snapshot().await.failure_count, 20);
}
