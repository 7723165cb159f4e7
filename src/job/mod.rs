//! Job kinds and submission parameters
//!
//! A [`JobKind`] supplies the job-type identifier and the per-application
//! defaults; [`build_submission`] layers them with the site-wide defaults and
//! the caller's parameters into the form sent to `submit_job.php`.

mod mapping;
mod params;

pub use mapping::PathMappings;
pub use params::{build_submission, encode_value, default_params, JobParams, SCENE_INFO_KEY};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use zync_preflight::QueryRegistry;

/// Instance type used when the caller does not pick one
pub const DEFAULT_INSTANCE_TYPE: &str = "20x7";

/// Maya renderer used when the caller does not pick one
pub const MAYA_DEFAULT_RENDERER: &str = "vray";

/// Nuke write node value that renders every write node
pub const NUKE_ALL_WRITE_NODES: &str = "All";

/// Target application of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Compositing script
    Nuke,
    /// 3D scene
    Maya,
    /// Standalone Arnold scene description
    Arnold,
}

impl JobKind {
    /// Job-type identifier the rule service recognizes
    pub fn job_type(&self) -> &'static str {
        match self {
            JobKind::Nuke => "nuke",
            JobKind::Maya => "maya",
            JobKind::Arnold => "arnold",
        }
    }

    /// `job_type` form value sent with a submission
    pub fn wire_job_type(&self) -> &'static str {
        match self {
            JobKind::Nuke => "Nuke",
            JobKind::Maya => "Maya",
            JobKind::Arnold => "Arnold",
        }
    }

    /// Kind-specific fields layered over the site-wide defaults
    pub fn defaults(&self) -> Vec<(&'static str, Value)> {
        match self {
            JobKind::Nuke => vec![("write_node", json!(NUKE_ALL_WRITE_NODES))],
            JobKind::Maya => vec![("renderer", json!(MAYA_DEFAULT_RENDERER))],
            JobKind::Arnold => vec![("renderer", json!("arnold"))],
        }
    }

    /// Params the caller must supply
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            JobKind::Maya => &["layers"],
            JobKind::Nuke | JobKind::Arnold => &[],
        }
    }

    /// Query registry for preflight rules against this application
    pub fn registry(&self) -> QueryRegistry {
        match self {
            JobKind::Nuke => QueryRegistry::nuke(),
            JobKind::Maya => QueryRegistry::maya(),
            JobKind::Arnold => QueryRegistry::arnold(),
        }
    }

    /// Kind matching a host application name, if any
    pub fn for_host_app(name: &str) -> Option<JobKind> {
        name.parse().ok()
    }

    pub const ALL: [JobKind; 3] = [JobKind::Nuke, JobKind::Maya, JobKind::Arnold];
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.job_type())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nuke" => Ok(JobKind::Nuke),
            "maya" => Ok(JobKind::Maya),
            "arnold" | "kick" => Ok(JobKind::Arnold),
            other => Err(format!("unknown job kind: {}", other)),
        }
    }
}
