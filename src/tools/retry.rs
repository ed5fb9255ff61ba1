//! Retry policy for transient tool failures
//!
//! The policy does not re-invoke anything itself. [`ToolRegistry::execute`]
//! consults it when a tool fails: retryable failures wait out the backoff and
//! are then handed back to the agent loop, which decides whether the model
//! gets another attempt.
//!
//! [`ToolRegistry::execute`]: crate::tools::ToolRegistry::execute

use std::time::Duration;

use crate::tools::ToolError;
use crate::types::AppError;
use crate::utils::toml_config::RetryConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts a single tool call gets before the model is told to give up on it
    pub max_attempts: u32,
    pub rate_limit_backoff: Duration,
    pub server_error_backoff: Duration,
    pub network_backoff: Duration,
    /// Backoff growth per repeated attempt
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            server_error_backoff: Duration::from_millis(config.server_error_backoff_ms),
            network_backoff: Duration::from_millis(config.network_backoff_ms),
            multiplier: config.multiplier,
        }
    }

    /// A policy that signals retries without waiting
    pub fn immediate() -> Self {
        Self {
            rate_limit_backoff: Duration::ZERO,
            server_error_backoff: Duration::ZERO,
            network_backoff: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn retryable(&self, error: &AppError) -> bool {
        match error {
            AppError::Tool(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Wait before handing the failure back. `attempt` starts at 1.
    pub fn backoff(&self, error: &AppError, attempt: u32) -> Duration {
        let base = match error {
            AppError::Tool(ToolError::RateLimited { .. }) => self.rate_limit_backoff,
            AppError::Tool(ToolError::ServerError { .. }) => self.server_error_backoff,
            AppError::Tool(ToolError::Network(_)) => self.network_backoff,
            _ => return Duration::ZERO,
        };

        let exponent = attempt.saturating_sub(1).min(16) as i32;
        base.mul_f64(self.multiplier.max(1.0).powi(exponent))
    }

    /// Whether a call that has failed `attempt` times may be tried again
    pub fn allows_another(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
