//! The Zync client facade
//!
//! Owns one authenticated [`Session`], the site configuration fetched when it
//! was opened, the path mappings and the optional scripting host preflight
//! rules are evaluated against.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;
use zync_preflight::{run_preflight, PreflightOutcome, ScriptHost};
use zync_protocol::{id_to_string, Endpoint, JobStatus, TriggerEvent};

use crate::config::ClientConfig;
use crate::error::{ZyncError, ZyncResult};
use crate::job::{build_submission, JobKind, JobParams, PathMappings};
use crate::session::{Session, Transport};
use crate::site::SiteConfig;

/// Jobs returned by [`Zync::list_jobs`] when no limit is given
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Entry point to a Zync site
pub struct Zync {
    session: Session,
    site: SiteConfig,
    mappings: PathMappings,
    host: Option<Box<dyn ScriptHost>>,
}

impl Zync {
    /// Connect over HTTP: liveness check, script authentication, site
    /// configuration fetch.
    pub fn connect(config: ClientConfig) -> ZyncResult<Self> {
        Self::from_session(Session::connect(config)?)
    }

    /// Connect over a caller-supplied transport
    pub fn connect_with(config: ClientConfig, transport: Arc<dyn Transport>) -> ZyncResult<Self> {
        Self::from_session(Session::open(config, transport)?)
    }

    fn from_session(session: Session) -> ZyncResult<Self> {
        let site = SiteConfig::fetch(&session)?;
        Ok(Self {
            session,
            site,
            mappings: PathMappings::new(),
            host: None,
        })
    }

    /// Evaluate preflight rules against this scripting host
    pub fn with_script_host(mut self, host: impl ScriptHost + 'static) -> Self {
        self.host = Some(Box::new(host));
        self
    }

    /// Replace (or remove) the scripting host
    pub fn set_script_host(&mut self, host: Option<Box<dyn ScriptHost>>) {
        self.host = host;
    }

    /// Elevate the session with a user login
    pub fn login(&mut self, username: &str, password: &str) -> ZyncResult<()> {
        self.session.login(username, password)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Site configuration fetched at connect time
    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Whether the site answers on its base URL
    pub fn up(&self) -> bool {
        self.session.up()
    }

    /// Server status string, `"down"` when unreachable
    pub fn status(&self) -> ZyncResult<String> {
        self.session.status()
    }

    // === Path mappings ===

    pub fn mappings(&self) -> &PathMappings {
        &self.mappings
    }

    /// Add a mapping applied to string params at submission
    pub fn add_path_mapping(&mut self, from: &str, to: &str) {
        self.mappings.add(from, to);
    }

    /// Add several mappings in order
    pub fn add_path_mappings<'a>(&mut self, mappings: impl IntoIterator<Item = (&'a str, &'a str)>) {
        self.mappings.extend(mappings);
    }

    /// Apply the registered mappings to a path
    pub fn apply_mapping(&self, input: &str) -> String {
        self.mappings.apply(input)
    }

    // === Site lookups ===

    /// A single site configuration variable, fetched fresh
    pub fn fetch_config_var(&self, name: &str) -> ZyncResult<String> {
        self.session.config_var(name)
    }

    /// Project a scene file belongs to
    pub fn project_name(&self, file: &str) -> ZyncResult<String> {
        let value = self.session.call(Endpoint::GetProjectName, &[("file", require("file", file)?)])?;
        Ok(text_of(value))
    }

    /// Output path the site will render a Maya scene to
    pub fn maya_output_path(&self, file: &str) -> ZyncResult<String> {
        let value = self.session.call(Endpoint::GetMayaOutput, &[("file", require("file", file)?)])?;
        Ok(text_of(value))
    }

    // === Jobs ===

    /// Most recent jobs on the site, at most `max`
    pub fn list_jobs(&self, max: usize) -> ZyncResult<Vec<Value>> {
        let max = max.to_string();
        match self.session.call(Endpoint::GetJobs, &[("max", max.as_str())])? {
            Value::Array(jobs) => Ok(jobs),
            Value::Null => Ok(Vec::new()),
            other => Err(ZyncError::RemoteProtocol {
                endpoint: Endpoint::GetJobs,
                message: format!("expected a job list, got {}", other),
            }),
        }
    }

    /// Parameters a job was submitted with
    pub fn job_params(&self, job_id: &str) -> ZyncResult<JobParams> {
        let value = self
            .session
            .call(Endpoint::GetJobParams, &[("job_id", require("job_id", job_id)?)])?;
        JobParams::try_from(value)
    }

    /// Set a job's status
    pub fn set_status(&self, job_id: &str, status: JobStatus) -> ZyncResult<()> {
        self.session.call(
            Endpoint::SetJobStatus,
            &[("job_id", require("job_id", job_id)?), ("status", status.as_str())],
        )?;
        info!(job_id, status = %status, "job status set");
        Ok(())
    }

    /// Stop a job
    pub fn cancel(&self, job_id: &str) -> ZyncResult<()> {
        self.set_status(job_id, JobStatus::Canceled)
    }

    /// Hold a job
    pub fn pause(&self, job_id: &str) -> ZyncResult<()> {
        self.set_status(job_id, JobStatus::Paused)
    }

    /// Resume a paused job
    pub fn unpause(&self, job_id: &str) -> ZyncResult<()> {
        self.set_status(job_id, JobStatus::Running)
    }

    /// Requeue a job
    pub fn restart(&self, job_id: &str) -> ZyncResult<()> {
        self.set_status(job_id, JobStatus::Queued)
    }

    /// Retry a job's errored tasks
    pub fn retry_errors(&self, job_id: &str) -> ZyncResult<()> {
        self.session
            .call(Endpoint::RetryErrors, &[("job_id", require("job_id", job_id)?)])?;
        Ok(())
    }

    /// Delete a job
    pub fn delete_job(&self, job_id: &str) -> ZyncResult<()> {
        self.session
            .call(Endpoint::DeleteJob, &[("job_id", require("job_id", job_id)?)])?;
        info!(job_id, "job deleted");
        Ok(())
    }

    /// Pending events from the trigger feed
    pub fn get_triggers(&self) -> ZyncResult<Vec<TriggerEvent>> {
        match self.session.call(Endpoint::GetTriggers, &[])? {
            Value::Null => Ok(Vec::new()),
            value => Ok(serde_json::from_value(value)?),
        }
    }

    // === Submission ===

    /// Run the preflight pass for a job kind against the current host.
    pub fn run_preflight(&self, kind: JobKind) -> ZyncResult<PreflightOutcome> {
        Ok(run_preflight(&self.session, self.host.as_deref(), kind.job_type())?)
    }

    /// Submit a job and return its id.
    ///
    /// Nothing is sent to `submit_job.php` if preflight blocks.
    pub fn submit_job(&self, kind: JobKind, file: &str, params: &JobParams) -> ZyncResult<String> {
        let outcome = self.run_preflight(kind)?;
        info!(kind = %kind, ?outcome, "preflight complete");

        let form = build_submission(kind, file, params, &self.mappings)?;
        let pairs: Vec<(&str, &str)> = form.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let response = self
            .session
            .call(Endpoint::SubmitJob, &pairs)
            .map_err(|e| match e {
                ZyncError::RemoteProtocol { message, .. } => ZyncError::Submission(message),
                other => other,
            })?;

        let job_id = id_to_string(&response)
            .ok_or_else(|| ZyncError::Submission(format!("site returned no job id: {}", response)))?;
        info!(kind = %kind, job_id = %job_id, "job submitted");
        Ok(job_id)
    }
}

fn require<'a>(name: &str, value: &'a str) -> ZyncResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(ZyncError::Configuration(format!("{} must not be empty", name)))
    } else {
        Ok(value)
    }
}

fn text_of(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
