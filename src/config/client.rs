//! Typed client configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

use super::defaults::DEFAULT_TIMEOUT_SECONDS;
use super::effective::ConfigError;

/// Maya releases older than this bundle an SSL stack that cannot verify the
/// service certificate chain.
const MAYA_FIRST_VERIFIED_TLS_YEAR: u32 = 2015;

/// The authoring application the client runs inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostApp {
    /// Lowercase application name (`maya`, `nuke`, `standalone`, ...)
    pub name: String,

    /// Application version string as reported by the application
    #[serde(default)]
    pub version: String,
}

impl HostApp {
    /// Create a host app description
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            version: version.into(),
        }
    }

    /// Running outside any authoring application
    pub fn standalone() -> Self {
        Self::new("standalone", "")
    }

    /// Leading numeric component of the version (`"2014 x64"` -> 2014).
    pub fn major_version(&self) -> Option<u32> {
        let digits: String = self
            .version
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }

    /// Whether certificate validation should be enforced for this host.
    pub fn supports_tls_validation(&self) -> bool {
        match (self.name.as_str(), self.major_version()) {
            ("maya", Some(year)) => year >= MAYA_FIRST_VERIFIED_TLS_YEAR,
            _ => true,
        }
    }
}

impl Default for HostApp {
    fn default() -> Self {
        Self::standalone()
    }
}

/// Validated configuration for one session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Site base URL, e.g. `https://studio.zync.io`
    pub url: String,

    /// Script credential name
    pub script_name: String,

    /// Script credential token
    pub token: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Application the client runs inside
    #[serde(default)]
    pub host_app: HostApp,

    /// Explicit certificate validation setting; derived from `host_app` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_tls: Option<bool>,
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl ClientConfig {
    /// Create a config with defaults for everything but the site and credentials.
    pub fn new(
        url: impl Into<String>,
        script_name: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            script_name: script_name.into(),
            token: token.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            host_app: HostApp::standalone(),
            verify_tls: None,
        }
    }

    /// Set the host application
    pub fn with_host_app(mut self, host_app: HostApp) -> Self {
        self.host_app = host_app;
        self
    }

    /// Set the request timeout
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Force certificate validation on or off
    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = Some(verify);
        self
    }

    /// Check the config is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        if self.script_name.trim().is_empty() {
            return Err(ConfigError::ValidationError("script_name must not be empty".to_string()));
        }
        if self.token.trim().is_empty() {
            return Err(ConfigError::ValidationError("token must not be empty".to_string()));
        }
        if self.timeout_seconds == 0 || self.timeout_seconds > 600 {
            return Err(ConfigError::ValidationError(
                "timeout_seconds must be in (0, 600]".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed site URL. Only http and https are accepted.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.url.trim())
            .map_err(|e| ConfigError::ValidationError(format!("invalid url '{}': {}", self.url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::ValidationError(format!(
                "url scheme must be http or https, got '{}'",
                scheme
            ))),
        }
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Effective certificate validation mode
    pub fn verify_tls(&self) -> bool {
        self.verify_tls
            .unwrap_or_else(|| self.host_app.supports_tls_validation())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("script_name", &self.script_name)
            .field("token", &"[REDACTED]")
            .field("timeout_seconds", &self.timeout_seconds)
            .field("host_app", &self.host_app)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}
