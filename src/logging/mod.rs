// Logging module for structured logging using the tracing crate

use std::error::Error;
use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Build the event filter: RUST_LOG wins, otherwise the configured level.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, Box<dyn Error + Send + Sync>> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.level)?),
    }
}

/// Initialize the tracing subscriber for structured logging
///
/// The subscriber is configured with:
/// - JSON formatting by default, for log aggregation systems
/// - Filtering from RUST_LOG, falling back to `logging.level`
/// - Output to stderr so finished images can be piped on stdout
///
/// Only the first call installs a subscriber; later calls return `Ok(())`.
///
/// # Examples
///
/// ```
/// use shiage::config::LoggingConfig;
/// use shiage::logging::init_subscriber;
///
/// init_subscriber(&LoggingConfig::default()).expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let filter = build_filter(config)?;
    let registry = Registry::default().with(filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };

    // Another subscriber (e.g. a test harness) already owns the global slot
    if let Err(e) = result {
        tracing::debug!(error = %e, "global subscriber already set");
    }

    let _ = INITIALIZED.set(());
    Ok(())
}
