//! Effective configuration with provenance
//!
//! Records the merged configuration, where each layer came from (with a
//! digest of file layers) and which keys were redacted from the
//! serializable view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use super::client::ClientConfig;
use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;

/// Origin of a configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    User,
    Project,
    Override,
}

/// A contributing layer with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this layer
    pub origin: ConfigOrigin,

    /// File path (None for builtin/override)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (None for builtin/override)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration.
///
/// `config` is the redacted view and is safe to log or write out. The
/// unredacted merge is only reachable through [`EffectiveConfig::client_config`].
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// Redacted merged configuration
    pub config: Value,

    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,

    /// Redacted key paths
    pub redactions: Vec<String>,

    #[serde(skip)]
    merged: Value,
}

/// Keys whose values are secrets
const SECRET_KEYS: &[&str] = &["token", "password", "pass", "cookie", "secret"];

const REDACTED: &str = "[REDACTED]";

impl EffectiveConfig {
    /// Build the effective config from layers. Missing files are skipped.
    pub fn build(
        user_config_path: Option<&Path>,
        project_config_path: Option<&Path>,
        overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        for (origin, path) in [
            (ConfigOrigin::User, user_config_path),
            (ConfigOrigin::Project, project_config_path),
        ] {
            let Some(path) = path.filter(|p| p.exists()) else {
                continue;
            };
            let (value, digest) = load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(overrides) = overrides {
            if !overrides.is_object() {
                return Err(ConfigError::ParseError(
                    "overrides must be a JSON object".to_string(),
                ));
            }
            layers.push(overrides);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Override,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let mut config = merged.clone();
        let mut redactions = Vec::new();
        redact(&mut config, "", &mut redactions);

        Ok(Self {
            created_at: Utc::now(),
            config,
            sources,
            redactions,
            merged,
        })
    }

    /// Typed, validated client configuration.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let config: ClientConfig = serde_json::from_value(self.merged.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Get a redacted value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.config, |current, part| current.get(part))
    }

    /// Get a redacted value as string
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Serialize the redacted view to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Load and parse a TOML file, returning the value and the digest of its bytes
fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
    let digest = hex::encode(Sha256::digest(&bytes));

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::ParseError(format!("{}: invalid UTF-8: {}", path.display(), e)))?;
    let table: toml::Value = toml::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

    Ok((toml_to_json(table), digest))
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

fn redact(value: &mut Value, path: &str, redactions: &mut Vec<String>) {
    if let Value::Object(map) = value {
        for (key, val) in map.iter_mut() {
            let current = if path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", path, key)
            };
            let key_lower = key.to_lowercase();
            let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

            if is_secret && !val.is_object() && !val.is_null() {
                *val = Value::String(REDACTED.to_string());
                redactions.push(current);
            } else {
                redact(val, &current, redactions);
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_only() {
        let config = EffectiveConfig::build(None, None, None).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].origin, ConfigOrigin::Builtin);
        assert_eq!(config.get("timeout_seconds"), Some(&json!(10)));
        assert_eq!(config.get_str("host_app.name"), Some("standalone"));
    }

    #[test]
    fn test_defaults_alone_do_not_validate() {
        let config = EffectiveConfig::build(None, None, None).unwrap();
        let err = config.client_config().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_token_redacted_but_usable() {
        let overrides = json!({
            "url": "https://studio.zync.io",
            "script_name": "maya_submitter",
            "token": "s3cr3t"
        });
        let config = EffectiveConfig::build(None, None, Some(overrides)).unwrap();

        assert_eq!(config.get_str("token"), Some("[REDACTED]"));
        assert_eq!(config.redactions, vec!["token".to_string()]);
        assert!(!config.to_json().unwrap().contains("s3cr3t"));

        let client = config.client_config().unwrap();
        assert_eq!(client.token, "s3cr3t");
    }

    #[test]
    fn test_file_layers_tracked_with_digest() {
        let mut user = NamedTempFile::new().unwrap();
        writeln!(user, "url = \"https://studio.zync.io\"").unwrap();
        writeln!(user, "timeout_seconds = 30").unwrap();

        let mut project = NamedTempFile::new().unwrap();
        writeln!(project, "timeout_seconds = 5").unwrap();
        writeln!(project, "[host_app]").unwrap();
        writeln!(project, "name = \"nuke\"").unwrap();

        let config = EffectiveConfig::build(Some(user.path()), Some(project.path()), None).unwrap();

        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[1].origin, ConfigOrigin::User);
        assert_eq!(config.sources[2].origin, ConfigOrigin::Project);
        assert_eq!(config.sources[1].digest.as_ref().map(String::len), Some(64));
        assert_eq!(config.get("timeout_seconds"), Some(&json!(5)));
        assert_eq!(config.get_str("host_app.name"), Some("nuke"));
        assert_eq!(config.get_str("url"), Some("https://studio.zync.io"));
    }

    #[test]
    fn test_missing_file_skipped() {
        let config =
            EffectiveConfig::build(Some(Path::new("/nonexistent/zync.toml")), None, None).unwrap();
        assert_eq!(config.sources.len(), 1);
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "url = ").unwrap();
        let err = EffectiveConfig::build(Some(file.path()), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_overrides_must_be_object() {
        let err = EffectiveConfig::build(None, None, Some(json!(["x"]))).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
