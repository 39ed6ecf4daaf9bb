//! Client configuration and logging setup

use anyhow::Context;
use std::time::Duration;

use crate::backend::HttpBackendConfig;
use crate::capture::CaptureConfig;
use crate::chat::SessionConfig;

/// Top-level configuration for the assistant client core.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub backend: HttpBackendConfig,
    pub capture: CaptureConfig,
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset:
    ///
    /// - `OPS_AGENT_BASE_URL` - answer service base URL
    /// - `OPS_AGENT_TIMEOUT_SECS` - HTTP request timeout
    /// - `OPS_AGENT_SETTLE_DELAY_MS` - capture settle delay
    /// - `OPS_AGENT_WELCOME` - greeting seeded into new sessions
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("OPS_AGENT_BASE_URL") {
            config.backend.base_url = url;
        }
        if let Ok(value) = std::env::var("OPS_AGENT_TIMEOUT_SECS") {
            config.backend.timeout_secs = value
                .parse()
                .context("OPS_AGENT_TIMEOUT_SECS must be an integer")?;
        }
        if let Ok(value) = std::env::var("OPS_AGENT_SETTLE_DELAY_MS") {
            let millis: u64 = value
                .parse()
                .context("OPS_AGENT_SETTLE_DELAY_MS must be an integer")?;
            config.capture.settle_delay = Duration::from_millis(millis);
        }
        if let Ok(welcome) = std::env::var("OPS_AGENT_WELCOME") {
            config.session.welcome_message = Some(welcome);
        }
        Ok(config)
    }
}

/// Initialize env_logger; safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-global, so defaults and overrides
    // are exercised in one test to avoid racing a parallel test run.
    #[test]
    fn test_from_env_defaults_and_overrides() {
        std::env::remove_var("OPS_AGENT_BASE_URL");
        std::env::remove_var("OPS_AGENT_TIMEOUT_SECS");
        std::env::remove_var("OPS_AGENT_SETTLE_DELAY_MS");
        std::env::remove_var("OPS_AGENT_WELCOME");

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.capture.settle_delay, Duration::from_millis(500));
        assert!(config.session.welcome_message.is_none());

        std::env::set_var("OPS_AGENT_BASE_URL", "http://assist.internal:9000");
        std::env::set_var("OPS_AGENT_SETTLE_DELAY_MS", "50");
        std::env::set_var("OPS_AGENT_WELCOME", "Hi there");

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.backend.base_url, "http://assist.internal:9000");
        assert_eq!(config.capture.settle_delay, Duration::from_millis(50));
        assert_eq!(config.session.welcome_message.as_deref(), Some("Hi there"));

        std::env::set_var("OPS_AGENT_SETTLE_DELAY_MS", "not-a-number");
        assert!(ClientConfig::from_env().is_err());

        std::env::remove_var("OPS_AGENT_BASE_URL");
        std::env::remove_var("OPS_AGENT_SETTLE_DELAY_MS");
        std::env::remove_var("OPS_AGENT_WELCOME");
    }
}
