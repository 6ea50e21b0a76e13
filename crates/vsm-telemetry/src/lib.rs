//! # VSM Telemetry
//!
//! Structured-logging bootstrap for the bus and the subsystems around it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vsm_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(&config).expect("failed to init telemetry");
//!
//!     // Bus and subsystems log via `tracing` from here on.
//! }
//! ```

mod config;

pub use config::TelemetryConfig;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Telemetry initialization errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log-level filter string did not parse.
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter {
        /// The offending filter string.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Guard that keeps telemetry active for the process lifetime.
pub struct TelemetryGuard {
    _private: (),
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry");
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// - `TelemetryError::InvalidFilter` - unparsable log level / directives
/// - `TelemetryError::SubscriberInit` - a subscriber is already installed
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let filter =
        EnvFilter::try_new(&config.log_level).map_err(|e| TelemetryError::InvalidFilter {
            filter: config.log_level.clone(),
            reason: e.to_string(),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::info!(
        service = %config.full_service_name(),
        node_id = %config.node_id,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { _private: () })
}
