//! Runtime configuration shared by the invocation pipeline.
//!
//! One plain struct with sensible defaults and fluent setters. The breaker
//! threshold and recovery window are process-wide constants shared by every
//! target; the failure counters themselves stay per-target.

use std::time::Duration;

/// Default end-to-end call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);
/// Default maximum retry count (attempts = retries + 1).
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default wait between retry attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(1000);
/// Default consecutive-failure threshold before the circuit opens.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
/// Default window after which an open circuit allows a probe.
pub const DEFAULT_RECOVERY_WINDOW: Duration = Duration::from_millis(5000);

/// Configuration for the client invocation pipeline.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// End-to-end timeout for a single invocation.
    pub timeout: Duration,
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Fixed wait between retry attempts.
    pub retry_interval: Duration,
    /// Consecutive failures before a target's circuit opens.
    pub failure_threshold: u32,
    /// Time an open circuit waits before allowing a recovery probe.
    pub recovery_window: Duration,
    /// Host used to synthesize the default endpoint URL.
    pub default_host: String,
    /// Port used to synthesize the default endpoint URL.
    pub default_port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_window: DEFAULT_RECOVERY_WINDOW,
            default_host: "localhost".to_string(),
            default_port: 8080,
        }
    }
}

impl RpcConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the end-to-end call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum retry count.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the wait between retry attempts.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Set the circuit breaker failure threshold.
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set the circuit breaker recovery window.
    pub fn recovery_window(mut self, window: Duration) -> Self {
        self.recovery_window = window;
        self
    }

    /// Set the host and port used for default endpoint synthesis.
    pub fn default_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.default_host = host.into();
        self.default_port = port;
        self
    }
}
