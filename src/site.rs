//! Site configuration
//!
//! Fetched once when a session is opened and held for its lifetime.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;
use zync_protocol::{Endpoint, InstanceType};

use crate::error::{ZyncError, ZyncResult};
use crate::session::Session;

/// Site configuration keys naming the farm's storage roots
const SERVER_ROOT_KEYS: [&str; 2] = ["WIN_ROOT", "MAC_ROOT"];

/// Configuration published by a site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Raw site configuration map
    pub config: Map<String, Value>,
    /// Instance types by name
    pub instance_types: BTreeMap<String, InstanceType>,
    /// Feature flags as published
    pub features: BTreeMap<String, Value>,
    /// Maya renderer code to label
    pub maya_renderers: BTreeMap<String, String>,
    pub job_subtypes: Vec<String>,
}

impl SiteConfig {
    /// Fetch every site configuration endpoint.
    pub fn fetch(session: &Session) -> ZyncResult<Self> {
        let config = match session.call(Endpoint::GetConfig, &[])? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => return Err(shape_error(Endpoint::GetConfig, "an object", &other)),
        };
        let instance_types = serde_json::from_value(session.call(Endpoint::GetInstanceTypes, &[])?)?;
        let features = feature_map(session.call(Endpoint::GetEnabledFeatures, &[])?)?;
        let maya_renderers = serde_json::from_value(session.call(Endpoint::GetMayaRenderers, &[])?)?;
        let job_subtypes = subtype_list(session.call(Endpoint::GetJobSubtypes, &[])?)?;

        let site = Self {
            config,
            instance_types,
            features,
            maya_renderers,
            job_subtypes,
        };
        debug!(
            instance_types = site.instance_types.len(),
            features = site.features.len(),
            renderers = site.maya_renderers.len(),
            subtypes = site.job_subtypes.len(),
            "fetched site configuration"
        );
        Ok(site)
    }

    /// A site configuration value
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Instance type by name
    pub fn instance_type(&self, name: &str) -> Option<&InstanceType> {
        self.instance_types.get(name)
    }

    /// Whether a feature flag is set to a truthy value
    pub fn feature_enabled(&self, name: &str) -> bool {
        self.features.get(name).map_or(false, is_truthy)
    }

    /// Whether the site supports a Maya renderer code
    pub fn supports_renderer(&self, code: &str) -> bool {
        self.maya_renderers.contains_key(code)
    }

    /// Storage roots the farm mounts, as published in the site configuration
    pub fn server_paths(&self) -> Vec<&str> {
        SERVER_ROOT_KEYS
            .iter()
            .filter_map(|key| self.config.get(*key).and_then(Value::as_str))
            .collect()
    }
}

/// Feature flags arrive either as `{name: flag}` or as a list of enabled names.
fn feature_map(value: Value) -> ZyncResult<BTreeMap<String, Value>> {
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(|name| (name.to_string(), Value::Bool(true)))
            .collect()),
        Value::Null => Ok(BTreeMap::new()),
        other => Err(shape_error(Endpoint::GetEnabledFeatures, "an object or list", &other)),
    }
}

/// Subtypes arrive either as a list or as a map keyed by subtype.
fn subtype_list(value: Value) -> ZyncResult<Vec<String>> {
    match value {
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()),
        Value::Object(map) => Ok(map.keys().cloned().collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(shape_error(Endpoint::GetJobSubtypes, "a list or object", &other)),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !matches!(s.trim().to_lowercase().as_str(), "" | "0" | "false" | "no" | "off"),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn shape_error(endpoint: Endpoint, expected: &str, got: &Value) -> ZyncError {
    ZyncError::RemoteProtocol {
        endpoint,
        message: format!("expected {}, got {}", expected, got),
    }
}
