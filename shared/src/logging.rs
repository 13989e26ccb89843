//! Process-wide tracing setup shared by the binaries.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(thiserror::Error, Debug)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),
    #[error("could not install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `level`.
/// Events are forwarded to sentry when `with_sentry` is set, so sentry should
/// be initialized before anything is logged.
pub fn init(level: &str, with_sentry: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let sentry_layer = with_sentry.then(sentry::integrations::tracing::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(sentry_layer)
        .try_init()?;

    Ok(())
}

/// Keep the returned guard alive for the lifetime of the process, dropping it
/// flushes pending events.
pub fn init_sentry(dsn: &str) -> sentry::ClientInitGuard {
    sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ))
}
