//! Records returned by the site endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// One entry of the instance-type table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceType {
    /// Human-readable description (cores, memory)
    #[serde(default)]
    pub description: String,

    /// Hourly cost, if the site publishes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// An event from the trigger feed (job completion and friends).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Event kind, e.g. `job_complete`
    pub event_type: String,

    /// Job the event refers to
    #[serde(deserialize_with = "string_or_number")]
    pub job_id: String,

    /// Any additional fields the service sent
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TriggerEvent {
    /// Returns true for job-completion events
    pub fn is_job_complete(&self) -> bool {
        self.event_type == "job_complete"
    }
}

/// Status values accepted by `set_job_status.php`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job stopped by the user
    Canceled,
    /// Job held; can be resumed
    Paused,
    /// Job waiting for instances
    Queued,
    /// Job rendering
    Running,
}

impl JobStatus {
    /// Wire value of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Canceled => "canceled",
            JobStatus::Paused => "paused",
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "canceled" | "cancelled" => Ok(JobStatus::Canceled),
            "paused" => Ok(JobStatus::Paused),
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            _ => Err(format!("unknown job status: {}", s)),
        }
    }
}

/// Render a JSON id (string or number) as a string.
pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_to_string(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected string or number id, got {}", value)))
}
