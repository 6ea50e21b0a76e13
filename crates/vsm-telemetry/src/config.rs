//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for the tracing/logging layer.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to log lines.
    pub service_name: String,

    /// Node identifier (matches the bus's HLC node id in deployments).
    pub node_id: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// env-filter directive string.
    pub log_level: String,

    /// Whether to emit JSON-formatted logs (for log shippers).
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "vsm-bus".to_string(),
            node_id: "00".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `VSM_SERVICE_NAME`: Service name (default: vsm-bus)
    /// - `VSM_NODE_ID`: Node identifier (default: 00)
    /// - `VSM_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `VSM_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    #[must_use]
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("VSM_SERVICE_NAME").unwrap_or_else(|_| "vsm-bus".to_string()),

            node_id: env::var("VSM_NODE_ID").unwrap_or_else(|_| "00".to_string()),

            log_level: env::var("VSM_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("VSM_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),
        }
    }

    /// Full service name including the node id.
    #[must_use]
    pub fn full_service_name(&self) -> String {
        if self.node_id == "00" {
            self.service_name.clone()
        } else {
            format!("{}-{}", self.service_name, self.node_id)
        }
    }
}
