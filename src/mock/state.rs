//! Mock Site State Management
//!
//! Holds the site configuration, preflight rules, jobs and trigger feed of
//! the mock site.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use zync_protocol::JobStatus;

/// A job accepted by the mock site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockJob {
    pub id: u64,
    /// Wire job type, e.g. `Maya`
    pub job_type: String,
    pub file: String,
    pub status: JobStatus,
    /// Form fields exactly as submitted
    pub params: BTreeMap<String, String>,
    /// Number of retry-errors requests received
    pub retries: u32,
    pub status_history: Vec<(JobStatus, DateTime<Utc>)>,
    pub submitted_at: DateTime<Utc>,
}

impl MockJob {
    /// Create a queued job from submitted form fields
    pub fn new(id: u64, params: BTreeMap<String, String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            job_type: params.get("job_type").cloned().unwrap_or_default(),
            file: params.get("file").cloned().unwrap_or_default(),
            status: JobStatus::Queued,
            params,
            retries: 0,
            status_history: vec![(JobStatus::Queued, now)],
            submitted_at: now,
        }
    }

    /// Move to a new status
    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.status_history.push((status, Utc::now()));
    }

    /// Row as returned by the job listing
    pub fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "job_type": self.job_type,
            "file": self.file,
            "status": self.status.as_str(),
            "submit_time": self.submitted_at.to_rfc3339(),
        })
    }
}

/// Mock site state container
#[derive(Debug)]
pub struct MockState {
    /// Refuse every connection
    pub down: bool,
    /// Answer the site root with a redirect instead of 200
    pub redirect_root: bool,
    /// Issue a session cookie on successful validation
    pub issue_cookie: bool,
    /// Body of `check_server.php`
    pub server_status: String,
    /// Site configuration map
    pub site_config: Value,
    pub instance_types: Value,
    pub features: Value,
    pub maya_renderers: Value,
    pub job_subtypes: Value,
    /// Rules payload per job type, served verbatim
    pub rules: BTreeMap<String, Value>,
    /// Project name per scene file
    pub project_names: BTreeMap<String, String>,
    /// Output path per Maya scene file
    pub maya_outputs: BTreeMap<String, String>,
    pub jobs: BTreeMap<u64, MockJob>,
    pub triggers: Vec<Value>,
    /// Issued session id and the user logged in on it, if any
    pub session_id: Option<String>,
    pub logged_in_user: Option<String>,
    next_job_id: u64,
    next_session: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            down: false,
            redirect_root: false,
            issue_cookie: true,
            server_status: "up".to_string(),
            site_config: json!({
                "WIN_ROOT": "Z:/",
                "MAC_ROOT": "/Volumes/zync/",
                "FILE_ROOT": "/mnt/zync/",
                "BROWSE_DIR": "projects/",
            }),
            instance_types: json!({
                "20x7": {"description": "20 cores, 7.5 GB RAM", "cost": 1.2},
                "32x60": {"description": "32 cores, 60 GB RAM", "cost": 3.4},
            }),
            features: json!({"maya_distributed": 1, "nuke_proxy": 0}),
            maya_renderers: json!({"vray": "V-Ray", "sw": "Maya Software", "mr": "Mental Ray"}),
            job_subtypes: json!(["render", "cache_sim"]),
            rules: BTreeMap::new(),
            project_names: BTreeMap::new(),
            maya_outputs: BTreeMap::new(),
            jobs: BTreeMap::new(),
            triggers: Vec::new(),
            session_id: None,
            logged_in_user: None,
            next_job_id: 1000,
            next_session: 0,
        }
    }
}

impl MockState {
    /// Create the default site state
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh session id
    pub fn open_session(&mut self) -> String {
        self.next_session += 1;
        let id = format!("mock-session-{:04}", self.next_session);
        self.session_id = Some(id.clone());
        self.logged_in_user = None;
        id
    }

    /// Accept a job and return its id
    pub fn add_job(&mut self, params: BTreeMap<String, String>) -> u64 {
        self.next_job_id += 1;
        let id = self.next_job_id;
        self.jobs.insert(id, MockJob::new(id, params));
        id
    }

    /// Look up a job by its wire id
    pub fn job_mut(&mut self, job_id: &str) -> Option<&mut MockJob> {
        let id: u64 = job_id.trim().parse().ok()?;
        self.jobs.get_mut(&id)
    }

    /// Jobs newest first, at most `max`
    pub fn job_summaries(&self, max: usize) -> Vec<Value> {
        self.jobs.values().rev().take(max).map(MockJob::summary).collect()
    }

    /// Project name for a scene file: configured, else the file's directory name
    pub fn project_name(&self, file: &str) -> String {
        if let Some(name) = self.project_names.get(file) {
            return name.clone();
        }
        let mut parts = file.trim_end_matches('/').rsplit('/');
        parts.next();
        parts.next().unwrap_or_default().to_string()
    }

    /// Output path for a Maya scene: configured, else `images/` next to it
    pub fn maya_output(&self, file: &str) -> String {
        if let Some(path) = self.maya_outputs.get(file) {
            return path.clone();
        }
        match file.rsplit_once('/') {
            Some((dir, _)) => format!("{}/images", dir),
            None => "images".to_string(),
        }
    }
}
