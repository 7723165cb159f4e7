//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Per-request timeout used when no layer sets one.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Request timeout in seconds (default: 10)
    pub timeout_seconds: u64,

    /// Host application name (default: "standalone")
    pub host_app_name: String,

    /// Host application version (default: empty)
    pub host_app_version: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            host_app_name: "standalone".to_string(),
            host_app_version: String::new(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "timeout_seconds": self.timeout_seconds,
            "host_app": {
                "name": self.host_app_name,
                "version": self.host_app_version
            }
        })
    }
}
