//! Remote procedure endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Response body framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{code, response}` envelope
    Envelope,
    /// Bare JSON, possibly paren-framed
    Json,
    /// Plain text the client does not decode
    Text,
}

/// Known endpoint paths, relative to the site base URL.
pub mod names {
    pub const VALIDATE: &str = "validate.php";
    pub const LOGIN: &str = "lib/login.php";
    pub const CHECK_SERVER: &str = "lib/check_server.php";
    pub const GET_CONFIG: &str = "lib/get_config_api.php";
    pub const GET_INSTANCE_TYPES: &str = "lib/get_instance_types.php";
    pub const GET_ENABLED_FEATURES: &str = "lib/get_enabled_features.php";
    pub const GET_MAYA_RENDERERS: &str = "lib/get_maya_renderers.php";
    pub const GET_JOB_SUBTYPES: &str = "lib/get_job_subtypes.php";
    pub const GET_PREFLIGHT_CHECKS: &str = "lib/get_preflight_checks.php";
    pub const SUBMIT_JOB: &str = "lib/submit_job.php";
    pub const GET_JOBS: &str = "lib/get_jobs.php";
    pub const GET_JOB_PARAMS: &str = "lib/get_job_params.php";
    pub const SET_JOB_STATUS: &str = "lib/set_job_status.php";
    pub const RETRY_ERRORS: &str = "lib/retry_errors.php";
    pub const DELETE_JOB: &str = "lib/delete_job.php";
    pub const GET_TRIGGERS: &str = "lib/get_triggers.php";
    pub const GET_PROJECT_NAME: &str = "lib/get_project_name.php";
    pub const GET_MAYA_OUTPUT: &str = "lib/get_maya_output.php";
}

/// A remote procedure exposed by the Zync site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// Script credential check; issues the session cookie
    Validate,
    /// User/password elevation of an existing session
    Login,
    /// Plain-text server status
    CheckServer,
    /// Site configuration map (or a single variable)
    GetConfig,
    /// Instance types available to the site
    GetInstanceTypes,
    /// Feature flags enabled for the site
    GetEnabledFeatures,
    /// Maya renderers the farm supports
    GetMayaRenderers,
    /// Job subtypes the farm accepts
    GetJobSubtypes,
    /// Preflight rules for a job type
    GetPreflightChecks,
    /// Job submission
    SubmitJob,
    /// Job listing
    GetJobs,
    /// Submitted parameters of one job
    GetJobParams,
    /// Job status transition
    SetJobStatus,
    /// Requeue errored tasks of a job
    RetryErrors,
    /// Job removal
    DeleteJob,
    /// Unseen trigger events
    GetTriggers,
    /// Project lookup for a scene file
    GetProjectName,
    /// Output path lookup for a Maya scene
    GetMayaOutput,
}

impl Endpoint {
    /// Path of this endpoint relative to the site URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Validate => names::VALIDATE,
            Endpoint::Login => names::LOGIN,
            Endpoint::CheckServer => names::CHECK_SERVER,
            Endpoint::GetConfig => names::GET_CONFIG,
            Endpoint::GetInstanceTypes => names::GET_INSTANCE_TYPES,
            Endpoint::GetEnabledFeatures => names::GET_ENABLED_FEATURES,
            Endpoint::GetMayaRenderers => names::GET_MAYA_RENDERERS,
            Endpoint::GetJobSubtypes => names::GET_JOB_SUBTYPES,
            Endpoint::GetPreflightChecks => names::GET_PREFLIGHT_CHECKS,
            Endpoint::SubmitJob => names::SUBMIT_JOB,
            Endpoint::GetJobs => names::GET_JOBS,
            Endpoint::GetJobParams => names::GET_JOB_PARAMS,
            Endpoint::SetJobStatus => names::SET_JOB_STATUS,
            Endpoint::RetryErrors => names::RETRY_ERRORS,
            Endpoint::DeleteJob => names::DELETE_JOB,
            Endpoint::GetTriggers => names::GET_TRIGGERS,
            Endpoint::GetProjectName => names::GET_PROJECT_NAME,
            Endpoint::GetMayaOutput => names::GET_MAYA_OUTPUT,
        }
    }

    /// Look up an endpoint by its relative path.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim_start_matches('/');
        Self::ALL.iter().copied().find(|e| e.path() == path)
    }

    /// Returns true if the endpoint takes a form-encoded POST body.
    pub fn is_post(&self) -> bool {
        matches!(
            self,
            Endpoint::Validate | Endpoint::Login | Endpoint::SubmitJob | Endpoint::DeleteJob
        )
    }

    /// How the endpoint frames its response body.
    pub fn response_shape(&self) -> ResponseShape {
        match self {
            Endpoint::Validate
            | Endpoint::CheckServer
            | Endpoint::SetJobStatus
            | Endpoint::RetryErrors
            | Endpoint::DeleteJob => ResponseShape::Text,
            Endpoint::GetConfig
            | Endpoint::GetJobs
            | Endpoint::GetJobParams
            | Endpoint::GetProjectName
            | Endpoint::GetMayaOutput => ResponseShape::Json,
            _ => ResponseShape::Envelope,
        }
    }

    /// Returns true if the endpoint answers with a `{code, response}` envelope.
    pub fn is_enveloped(&self) -> bool {
        self.response_shape() == ResponseShape::Envelope
    }

    /// Every endpoint, in declaration order.
    pub const ALL: [Endpoint; 18] = [
        Endpoint::Validate,
        Endpoint::Login,
        Endpoint::CheckServer,
        Endpoint::GetConfig,
        Endpoint::GetInstanceTypes,
        Endpoint::GetEnabledFeatures,
        Endpoint::GetMayaRenderers,
        Endpoint::GetJobSubtypes,
        Endpoint::GetPreflightChecks,
        Endpoint::SubmitJob,
        Endpoint::GetJobs,
        Endpoint::GetJobParams,
        Endpoint::SetJobStatus,
        Endpoint::RetryErrors,
        Endpoint::DeleteJob,
        Endpoint::GetTriggers,
        Endpoint::GetProjectName,
        Endpoint::GetMayaOutput,
    ];
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
