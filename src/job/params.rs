//! Submission parameters and form encoding

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::error::{ZyncError, ZyncResult};

use super::{JobKind, PathMappings, DEFAULT_INSTANCE_TYPE};

/// Param carrying scene metadata; always sent as JSON text
pub const SCENE_INFO_KEY: &str = "scene_info";

/// Site-wide defaults every submission starts from
pub fn default_params() -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("instance_type".to_string(), json!(DEFAULT_INSTANCE_TYPE)),
        ("upload_only".to_string(), json!(0)),
        ("start_new_instances".to_string(), json!(1)),
        ("chunk_size".to_string(), json!(1)),
        ("distributed".to_string(), json!(0)),
        ("num_instances".to_string(), json!(1)),
        ("skip_check".to_string(), json!(0)),
        ("notify_complete".to_string(), json!(0)),
        ("job_subtype".to_string(), json!("render")),
    ])
}

/// Caller-supplied submission parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobParams(BTreeMap<String, Value>);

impl JobParams {
    /// No params
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for JobParams {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Map<String, Value>> for JobParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl TryFrom<Value> for JobParams {
    type Error = ZyncError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(map.into()),
            Value::Null => Ok(Self::new()),
            other => Err(ZyncError::Configuration(format!(
                "job params must be an object, got {}",
                other
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for JobParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Build the form fields of a submission.
///
/// Layers, lowest first: site-wide defaults, the kind's `job_type`, `file` and
/// defaults, then the caller's params. Path mappings rewrite `file` and the
/// caller's top-level string values only; defaults are sent as-is.
/// `scene_info` is encoded as JSON text. `params` is never modified.
pub fn build_submission(
    kind: JobKind,
    file: &str,
    params: &JobParams,
    mappings: &PathMappings,
) -> ZyncResult<Vec<(String, String)>> {
    if file.trim().is_empty() {
        return Err(ZyncError::Configuration("scene file must not be empty".to_string()));
    }

    let mut caller: BTreeMap<String, Value> = params.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    mappings.apply_to_params(&mut caller);

    let mut merged = default_params();
    merged.insert("job_type".to_string(), json!(kind.wire_job_type()));
    merged.insert("file".to_string(), json!(mappings.apply(file)));
    for (key, value) in kind.defaults() {
        merged.insert(key.to_string(), value);
    }
    merged.extend(caller);

    for required in kind.required_params() {
        if merged.get(*required).map_or(true, is_blank) {
            return Err(ZyncError::Configuration(format!(
                "{} jobs require the '{}' param",
                kind.wire_job_type(),
                required
            )));
        }
    }

    let mut form = Vec::with_capacity(merged.len());
    for (key, value) in merged {
        let encoded = if key == SCENE_INFO_KEY {
            Some(serde_json::to_string(&value)?)
        } else {
            encode_value(&value)
        };
        if let Some(encoded) = encoded {
            form.push((key, encoded));
        }
    }
    Ok(form)
}

/// Form text of a param value. Nulls are omitted.
///
/// Booleans become `1`/`0`, lists of scalars are comma-joined (the layer
/// list format), anything else nested is sent as JSON.
pub fn encode_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.iter().all(is_scalar) => Some(
            items
                .iter()
                .filter_map(encode_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        nested => Some(nested.to_string()),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
