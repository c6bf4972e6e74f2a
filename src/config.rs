//! Configuration types.

use std::time::Duration;

/// Backend gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the advisor service.
    pub base_url: String,
    /// Per-request timeout applied by the HTTP client. The engine itself
    /// enforces no timeouts; a stalled call is the gateway's to cut off.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fin-advisor-ashokkumar5.replit.app".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    /// Build a config from the environment, falling back to defaults.
    ///
    /// Honors `FINFLOW_API_BASE` and `FINFLOW_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base_url = std::env::var("FINFLOW_API_BASE").unwrap_or(defaults.base_url);
        let timeout = std::env::var("FINFLOW_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        Self { base_url, timeout }
    }
}
