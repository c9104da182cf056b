use std::time::Duration;

use marginalia_core::ConfigError;
use marginalia_core::config::env_or;

use crate::retry::{Backoff, RetryPolicy};

/// Settings for the chunked lint pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct LintConfig {
    /// Document lines per chunk sent to the model.
    pub chunk_lines: usize,
    /// Chunks analyzed at the same time.
    pub concurrency: usize,
    /// Delay between dispatching concurrent chunks.
    pub stagger: Duration,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Reported errors with shorter descriptions are discarded.
    pub min_description_len: usize,
    pub endpoint: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            chunk_lines: 40,
            concurrency: 4,
            stagger: Duration::from_millis(250),
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            min_description_len: 10,
            endpoint: None,
            model: "default".to_string(),
            api_key: None,
        }
    }
}

impl LintConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Optional env vars:
    /// - `MARGINALIA_LINT_CHUNK_LINES` (default: 40)
    /// - `MARGINALIA_LINT_CONCURRENCY` (default: 4)
    /// - `MARGINALIA_LINT_STAGGER_MS` (default: 250)
    /// - `MARGINALIA_LINT_MAX_ATTEMPTS` (default: 3)
    /// - `MARGINALIA_LINT_BASE_DELAY_MS` (default: 1000)
    /// - `MARGINALIA_LINT_MIN_DESCRIPTION_LEN` (default: 10)
    /// - `MARGINALIA_LINT_ENDPOINT`, `MARGINALIA_LINT_MODEL`, `MARGINALIA_LINT_API_KEY`
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let millis = |d: Duration| d.as_millis() as u64;
        Ok(Self {
            chunk_lines: env_or("MARGINALIA_LINT_CHUNK_LINES", defaults.chunk_lines, "an integer")?,
            concurrency: env_or("MARGINALIA_LINT_CONCURRENCY", defaults.concurrency, "an integer")?,
            stagger: Duration::from_millis(env_or(
                "MARGINALIA_LINT_STAGGER_MS",
                millis(defaults.stagger),
                "milliseconds as an integer",
            )?),
            max_attempts: env_or("MARGINALIA_LINT_MAX_ATTEMPTS", defaults.max_attempts, "an integer")?,
            base_delay: Duration::from_millis(env_or(
                "MARGINALIA_LINT_BASE_DELAY_MS",
                millis(defaults.base_delay),
                "milliseconds as an integer",
            )?),
            max_delay: defaults.max_delay,
            min_description_len: env_or(
                "MARGINALIA_LINT_MIN_DESCRIPTION_LEN",
                defaults.min_description_len,
                "an integer",
            )?,
            endpoint: std::env::var("MARGINALIA_LINT_ENDPOINT").ok(),
            model: std::env::var("MARGINALIA_LINT_MODEL").unwrap_or(defaults.model),
            api_key: std::env::var("MARGINALIA_LINT_API_KEY").ok(),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            backoff: Backoff::Exponential { factor: 2 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LintConfig::default();
        assert_eq!(config.chunk_lines, 40);
        assert_eq!(config.min_description_len, 10);
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
    }
}
