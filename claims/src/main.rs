use clap::Parser;
use config::{Config, MetricsConfig};
use gitlab_projects::metrics_defs::ALL_METRICS;
use gitlab_projects::{ApiError, ProjectResolver, ResolveError};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process::ExitCode;

mod config;

/// Prints the GitLab projects a user can access as a JSON array of claims.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "claims.yaml")]
    config: PathBuf,
    /// GitLab username to resolve projects for
    username: String,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("could not set up metrics: {0}")]
    Metrics(String),
    #[error("could not create GitLab client: {0}")]
    Client(#[from] ApiError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("could not encode output: {0}")]
    Output(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    // Flushes pending events when dropped at the end of main
    let sentry_guard = config
        .common
        .logging
        .sentry_dsn
        .as_deref()
        .map(shared::logging::init_sentry);

    if let Err(e) = shared::logging::init(&config.common.logging.level, sentry_guard.is_some()) {
        eprintln!("Failed to set up logging: {e}");
        return ExitCode::FAILURE;
    }

    if let Some(metrics_config) = &config.common.metrics
        && let Err(e) = init_metrics(metrics_config)
    {
        tracing::error!(error = %e, "Failed to set up metrics");
        return ExitCode::FAILURE;
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(&cli.username, &config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(username = %cli.username, error = %e, "Failed to resolve projects");
            ExitCode::FAILURE
        }
    }
}

async fn run(username: &str, config: &Config) -> Result<(), CliError> {
    let resolver = ProjectResolver::from_config(&config.projects)?;
    let paths = resolver
        .get_user_projects(username, &config.projects.resolver.privileged_groups)
        .await?;

    println!("{}", serde_json::to_string(&paths)?);
    Ok(())
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some("claims"))
        .map_err(|e| CliError::Metrics(e.to_string()))?;

    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;
    shared::metrics_defs::describe_all(ALL_METRICS);

    Ok(())
}
