//! Floe artifact promotion command line.

#![forbid(unsafe_code)]

mod cli_config;
mod cli_output;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use floe_application::{
    CircuitBreakerRegistry, GateRunMode, GateRunner, PromoteInput, PromotionController,
    RegistryFacade, RollbackInput,
};
use floe_core::{AppError, AppResult};
use floe_domain::PromotionConfig;
use floe_infrastructure::{
    AnnotationPolicyEvaluator, AnnotationSignatureVerifier, FileScanReportSource,
    JsonFileRegistryTransport,
};
use tracing::{debug, error};

use crate::cli_config::{CliConfig, init_tracing};
use crate::cli_output::Rendered;

#[derive(Parser)]
#[command(name = "floe-promote")]
#[command(about = "Promote, roll back and inspect artifacts across environments")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format for results and errors.
    #[arg(long, short = 'o', global = true, default_value = "text", value_enum)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Promote a tag from one environment to the next
    Promote {
        /// Semantic version tag, e.g. v1.2.3
        tag: String,
        #[arg(long = "from")]
        from_environment: String,
        #[arg(long = "to")]
        to_environment: String,
        /// Run gates and authorization without touching the registry
        #[arg(long)]
        dry_run: bool,
        /// Run every gate instead of stopping at the first failure
        #[arg(long)]
        run_all_gates: bool,
        #[arg(long)]
        trace_id: Option<String>,
    },
    /// Restore a previously promoted tag in an environment
    Rollback {
        tag: String,
        #[arg(long = "env")]
        environment: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        trace_id: Option<String>,
    },
    /// Show where a tag has been promoted
    Status {
        tag: String,
        #[arg(long = "env")]
        environment: Option<String>,
        #[arg(long)]
        history_limit: Option<usize>,
    },
    /// Report every gate of a transition without promoting
    Gates {
        tag: String,
        #[arg(long = "from")]
        from_environment: String,
        #[arg(long = "to")]
        to_environment: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let output = cli.output;

    match run(cli).await {
        Ok(rendered) => {
            println!("{}", rendered.format(output));
            ExitCode::SUCCESS
        }
        Err(app_error) => {
            error!(kind = app_error.kind(), error = %app_error, "command failed");
            match output {
                OutputFormat::Json => println!("{}", app_error.to_report()),
                OutputFormat::Text => eprintln!("error: {app_error}"),
            }
            ExitCode::from(u8::try_from(app_error.exit_code().as_i32()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> AppResult<Rendered> {
    let config = CliConfig::load()?;
    let controller = build_controller(&config).await?;

    match cli.command {
        Command::Promote {
            tag,
            from_environment,
            to_environment,
            dry_run,
            run_all_gates,
            trace_id,
        } => {
            let record = controller
                .promote(PromoteInput {
                    tag,
                    from_environment,
                    to_environment,
                    operator: config.require_operator()?,
                    trace_id,
                    gate_mode: if run_all_gates {
                        GateRunMode::RunAll
                    } else {
                        GateRunMode::FailFast
                    },
                    dry_run,
                })
                .await?;
            Ok(Rendered::promotion(&record))
        }
        Command::Rollback {
            tag,
            environment,
            reason,
            trace_id,
        } => {
            let record = controller
                .rollback(RollbackInput {
                    tag,
                    environment,
                    reason,
                    operator: config.require_operator()?,
                    trace_id,
                })
                .await?;
            Ok(Rendered::rollback(&record))
        }
        Command::Status {
            tag,
            environment,
            history_limit,
        } => {
            let status = controller
                .get_status(&tag, environment.as_deref(), history_limit)
                .await?;
            Ok(Rendered::status(&status))
        }
        Command::Gates {
            tag,
            from_environment,
            to_environment,
        } => {
            let evaluation = controller
                .evaluate_gates(&tag, &from_environment, &to_environment)
                .await?;
            Ok(Rendered::gates(&evaluation))
        }
    }
}

async fn build_controller(config: &CliConfig) -> AppResult<PromotionController> {
    let promotion_config = load_promotion_config(config).await?;
    let transport = Arc::new(JsonFileRegistryTransport::new(config.registry_path.clone()));
    let breakers = Arc::new(CircuitBreakerRegistry::new(
        config.settings.circuit_breaker,
    ));
    let facade = RegistryFacade::new(
        transport.clone(),
        breakers.clone(),
        config.settings.registry_call_timeout,
    );

    let gate_runner = GateRunner::new(Arc::new(AnnotationSignatureVerifier::new(facade.clone())))
        .with_policy_evaluator(Arc::new(AnnotationPolicyEvaluator::new(facade)))
        .with_scan_report_source(Arc::new(FileScanReportSource::new(
            config.scan_report_dir.clone(),
        )));

    debug!(
        registry = %config.registry_path.display(),
        environments = promotion_config.environments().len(),
        "promotion controller configured"
    );

    Ok(PromotionController::with_circuit_breakers(
        promotion_config,
        transport,
        gate_runner,
        config.settings,
        breakers,
    ))
}

async fn load_promotion_config(config: &CliConfig) -> AppResult<PromotionConfig> {
    let path = &config.promotion_config_path;
    let raw = tokio::fs::read_to_string(path).await.map_err(|error| {
        AppError::Configuration(format!(
            "failed to read promotion config '{}': {error}",
            path.display()
        ))
    })?;

    serde_json::from_str(&raw).map_err(|error| {
        AppError::Configuration(format!(
            "invalid promotion config '{}': {error}",
            path.display()
        ))
    })
}
