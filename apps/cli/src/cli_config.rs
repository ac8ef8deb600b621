use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use floe_application::{CircuitBreakerSettings, ControllerSettings};
use floe_core::{AppError, AppResult, OperatorIdentity};

/// Runtime configuration read from the process environment.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub registry_path: PathBuf,
    pub promotion_config_path: PathBuf,
    pub scan_report_dir: PathBuf,
    pub settings: ControllerSettings,
    pub operator: Option<OperatorIdentity>,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let registry_path = PathBuf::from(required_env(&lookup, "FLOE_REGISTRY_PATH")?);
        let promotion_config_path =
            PathBuf::from(required_env(&lookup, "FLOE_PROMOTION_CONFIG")?);
        let scan_report_dir = optional_env(&lookup, "FLOE_SCAN_REPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("scan-reports"));

        let defaults = ControllerSettings::default();
        let registry_call_timeout = Duration::from_secs(parse_env(
            &lookup,
            "FLOE_REGISTRY_TIMEOUT_SECONDS",
            defaults.registry_call_timeout.as_secs(),
        )?);
        if registry_call_timeout.is_zero() {
            return Err(AppError::Validation(
                "FLOE_REGISTRY_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }

        let max_history_entries = parse_env(
            &lookup,
            "FLOE_MAX_HISTORY_ENTRIES",
            defaults.max_history_entries,
        )?;
        if max_history_entries == 0 {
            return Err(AppError::Validation(
                "FLOE_MAX_HISTORY_ENTRIES must be greater than zero".to_owned(),
            ));
        }

        let failure_threshold = parse_env(
            &lookup,
            "FLOE_CIRCUIT_BREAKER_THRESHOLD",
            defaults.circuit_breaker.failure_threshold(),
        )?;
        let recovery_seconds = parse_env(
            &lookup,
            "FLOE_CIRCUIT_BREAKER_RECOVERY_SECONDS",
            defaults.circuit_breaker.recovery_timeout().as_secs(),
        )?;
        let circuit_breaker =
            CircuitBreakerSettings::new(failure_threshold, Duration::from_secs(recovery_seconds))
                .map_err(|error| {
                    AppError::Validation(format!("FLOE_CIRCUIT_BREAKER_THRESHOLD: {error}"))
                })?;

        let groups = optional_env(&lookup, "FLOE_OPERATOR_GROUPS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|group| !group.is_empty())
                    .map(ToOwned::to_owned)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let operator = optional_env(&lookup, "FLOE_OPERATOR")
            .map(|subject| OperatorIdentity::new(subject, groups));

        Ok(Self {
            registry_path,
            promotion_config_path,
            scan_report_dir,
            settings: ControllerSettings {
                registry_call_timeout,
                max_history_entries,
                circuit_breaker,
            },
            operator,
        })
    }

    /// Returns the operator identity, required by mutating commands.
    pub fn require_operator(&self) -> AppResult<OperatorIdentity> {
        self.operator.clone().ok_or_else(|| {
            AppError::Validation(
                "FLOE_OPERATOR is required to promote or roll back artifacts".to_owned(),
            )
        })
    }
}

pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn required_env<F>(lookup: &F, name: &str) -> AppResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional_env(lookup, name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn optional_env<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env<F, T>(lookup: &F, name: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(lookup, name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}"))),
        None => Ok(default),
    }
}
