//! Preflight rule records.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

use crate::PreflightError;

/// Placeholder replaced by the offending values in a rule's error template.
pub const MATCH_PLACEHOLDER: &str = "%match%";

/// Comparison applied between evaluated values and a rule's condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// A value blocks if it is in the condition set
    Equal,
    /// A value blocks if it is not in the condition set
    NotEqual,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationType::Equal => write!(f, "equal"),
            OperationType::NotEqual => write!(f, "not_equal"),
        }
    }
}

/// One server-declared validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightRule {
    /// Identifier of the host query to evaluate
    pub api_call: String,

    /// Comparison semantics
    pub operation_type: OperationType,

    /// Values the evaluated scalars are tested against
    #[serde(default, deserialize_with = "condition_values")]
    pub condition: Vec<String>,

    /// Message template; `%match%` is replaced by the offending values
    pub error: String,
}

impl PreflightRule {
    /// Create a new rule
    pub fn new(
        api_call: impl Into<String>,
        operation_type: OperationType,
        condition: Vec<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            api_call: api_call.into(),
            operation_type,
            condition,
            error: error.into(),
        }
    }

    /// Format this rule's error template for the given matches.
    pub fn format_error(&self, matches: &[String]) -> String {
        self.error.replace(MATCH_PLACEHOLDER, &matches.join(", "))
    }
}

/// Decode the `response` payload of the rule endpoint.
///
/// The payload must be an array. Individual records that fail to decode are
/// logged and dropped; a malformed rule never blocks a submission.
pub fn rules_from_value(value: Value) -> Result<Vec<PreflightRule>, PreflightError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(PreflightError::RemoteProtocol(format!(
                "expected a list of preflight rules, got {}",
                other
            )))
        }
    };

    let mut rules = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<PreflightRule>(item) {
            Ok(rule) => rules.push(rule),
            Err(e) => warn!(index, error = %e, "dropping undecodable preflight rule"),
        }
    }
    Ok(rules)
}

/// String form of a JSON scalar, as used for condition membership.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accepts a list of scalars or a single scalar; nulls are dropped.
fn condition_values<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| {
                scalar_to_string(v).ok_or_else(|| {
                    serde::de::Error::custom(format!("condition entries must be scalars, got {}", v))
                })
            })
            .collect(),
        scalar => scalar_to_string(&scalar).map(|s| vec![s]).ok_or_else(|| {
            serde::de::Error::custom(format!("condition must be a list or scalar, got {}", scalar))
        }),
    }
}
