use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Tunables for reconciliation and decoration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// How far (in chars, either direction) to probe for a mapped offset when
    /// the exact markdown offset has no counterpart in rendered text.
    pub probe_window: usize,
    /// The partial-prefix fallback only runs when the first line of the
    /// normalized quote is longer than this many chars.
    pub min_prefix_len: usize,
    /// Upper bound on the char diff. Past it the diff degrades to a coarser
    /// alignment instead of running unbounded.
    pub diff_timeout: Duration,
    /// Prepared documents kept by a [`crate::cache::DocumentCache`].
    pub cache_capacity: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_window: Self::DEFAULT_PROBE_WINDOW,
            min_prefix_len: 10,
            diff_timeout: Duration::from_millis(2000),
            cache_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub const DEFAULT_PROBE_WINDOW: usize = 5;

    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Optional env vars:
    /// - `MARGINALIA_PROBE_WINDOW`: nearby-offset probe distance (default: 5)
    /// - `MARGINALIA_MIN_PREFIX_LEN`: prefix fallback threshold (default: 10)
    /// - `MARGINALIA_DIFF_TIMEOUT_MS`: diff deadline in milliseconds (default: 2000)
    /// - `MARGINALIA_CACHE_CAPACITY`: prepared document cache size (default: 64)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            probe_window: env_or("MARGINALIA_PROBE_WINDOW", defaults.probe_window, "an integer")?,
            min_prefix_len: env_or(
                "MARGINALIA_MIN_PREFIX_LEN",
                defaults.min_prefix_len,
                "an integer",
            )?,
            diff_timeout: env_or(
                "MARGINALIA_DIFF_TIMEOUT_MS",
                defaults.diff_timeout.as_millis() as u64,
                "milliseconds as an integer",
            )
            .map(Duration::from_millis)?,
            cache_capacity: env_or(
                "MARGINALIA_CACHE_CAPACITY",
                defaults.cache_capacity,
                "an integer",
            )?,
        })
    }

    pub fn with_probe_window(mut self, window: usize) -> Self {
        self.probe_window = window;
        self
    }
}

/// Read and parse an optional env var. Unset means `default`; set but
/// unparseable is an error rather than a silent fallback.
pub fn env_or<T: FromStr>(
    var: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv {
                var,
                value,
                expected,
            }),
        Err(_) => Ok(default),
    }
}
