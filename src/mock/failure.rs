//! Failure Injection for the Mock Site
//!
//! Supports configurable per-endpoint failures for testing error paths.

use std::collections::HashMap;

use zync_protocol::Endpoint;

/// How an injected failure surfaces
#[derive(Debug, Clone, PartialEq)]
pub enum FailureMode {
    /// Answer with a non-zero envelope code (or the bare message for
    /// unenveloped endpoints)
    Remote { code: i64, message: String },
    /// Answer with an HTTP error status
    HttpStatus(u16),
    /// Fail at the transport level as if the request timed out
    Timeout,
}

/// Failure configuration for an endpoint
#[derive(Debug, Clone)]
pub struct FailureConfig {
    pub mode: FailureMode,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Fail with a remote error code and message
    pub fn error(code: i64, message: impl Into<String>) -> Self {
        Self {
            mode: FailureMode::Remote {
                code,
                message: message.into(),
            },
            fail_count: None,
        }
    }

    /// Fail with an HTTP status
    pub fn http_status(status: u16) -> Self {
        Self {
            mode: FailureMode::HttpStatus(status),
            fail_count: None,
        }
    }

    /// Fail with a transport timeout
    pub fn timeout() -> Self {
        Self {
            mode: FailureMode::Timeout,
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

/// Failure injector for the mock site
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<Endpoint, FailureConfig>,
    call_counts: HashMap<Endpoint, u32>,
}

impl FailureInjector {
    /// Create a new failure injector
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for an endpoint
    pub fn inject(&mut self, endpoint: Endpoint, config: FailureConfig) {
        self.configs.insert(endpoint, config);
        self.call_counts.insert(endpoint, 0);
    }

    /// Inject a one-shot remote error for an endpoint
    pub fn inject_error(&mut self, endpoint: Endpoint, code: i64, message: impl Into<String>) {
        self.inject(endpoint, FailureConfig::error(code, message).with_fail_count(1));
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Failure mode to apply to this call, if any
    pub fn check(&mut self, endpoint: Endpoint) -> Option<FailureMode> {
        let config = self.configs.get(&endpoint)?;
        let count = self.call_counts.entry(endpoint).or_insert(0);
        *count += 1;

        match config.fail_count {
            Some(limit) if *count > limit => None,
            _ => Some(config.mode.clone()),
        }
    }
}
