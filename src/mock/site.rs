//! Mock Site Implementation
//!
//! An in-process stand-in for a Zync site. Answers every endpoint the client
//! uses, tracks sessions and jobs, records requests and supports failure
//! injection.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{json, Value};
use url::Url;
use zync_protocol::{Endpoint, Envelope, JobStatus, COOKIE_HEADER, SET_COOKIE_HEADER};

use crate::session::{HttpRequest, HttpResponse, Method, TransportError};

use super::failure::{FailureConfig, FailureInjector, FailureMode};
use super::state::{MockJob, MockState};

/// Base URL the mock site answers on
pub const MOCK_BASE_URL: &str = "https://mock.zync.test/";
/// Script credentials the mock site accepts
pub const MOCK_SCRIPT_NAME: &str = "mock_submitter";
pub const MOCK_TOKEN: &str = "mock-token-0001";
/// User credentials the mock site accepts
pub const MOCK_USER: &str = "artist";
pub const MOCK_PASSWORD: &str = "hunter2";

const SESSION_COOKIE: &str = "PHPSESSID";
const DEFAULT_JOB_LIMIT: usize = 100;

/// Configurable mock site for testing. Clones share state.
#[derive(Clone)]
pub struct MockSite {
    base_url: String,
    state: Arc<Mutex<MockState>>,
    failures: Arc<Mutex<FailureInjector>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockSite {
    /// Create a mock site on [`MOCK_BASE_URL`]
    pub fn new() -> Self {
        Self::with_base_url(MOCK_BASE_URL)
    }

    /// Create a mock site on another base URL (must end in `/`)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: Arc::new(Mutex::new(MockState::new())),
            failures: Arc::new(Mutex::new(FailureInjector::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    // === Public API for test configuration ===

    /// Site base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Refuse every connection
    pub fn set_down(&self, down: bool) {
        self.state().down = down;
    }

    /// Answer the site root with a 302
    pub fn set_redirect_root(&self, redirect: bool) {
        self.state().redirect_root = redirect;
    }

    /// Accept validation but omit the session cookie
    pub fn set_issue_cookie(&self, issue: bool) {
        self.state().issue_cookie = issue;
    }

    /// Body of `check_server.php`
    pub fn set_server_status(&self, status: &str) {
        self.state().server_status = status.to_string();
    }

    /// Serve this rules payload for a job type, verbatim
    pub fn set_rules(&self, job_type: &str, rules: Value) {
        self.state().rules.insert(job_type.to_string(), rules);
    }

    /// Replace the site configuration map
    pub fn set_site_config(&self, config: Value) {
        self.state().site_config = config;
    }

    /// Replace the enabled-feature map
    pub fn set_features(&self, features: Value) {
        self.state().features = features;
    }

    /// Answer `get_project_name.php` for a file
    pub fn set_project_name(&self, file: &str, name: &str) {
        self.state().project_names.insert(file.to_string(), name.to_string());
    }

    /// Add an event to the trigger feed
    pub fn push_trigger(&self, event: Value) {
        self.state().triggers.push(event);
    }

    /// Inject a one-shot remote error for the next call to an endpoint
    pub fn inject_error(&self, endpoint: Endpoint, code: i64, message: &str) {
        self.failures().inject_error(endpoint, code, message);
    }

    /// Inject a failure configuration for an endpoint
    pub fn inject_failure(&self, endpoint: Endpoint, config: FailureConfig) {
        self.failures().inject(endpoint, config);
    }

    /// Clear all failure injections
    pub fn clear_failures(&self) {
        self.failures().clear();
    }

    // === Inspection ===

    /// Every request received, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.request_log().clone()
    }

    /// The most recent request
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.request_log().last().cloned()
    }

    /// Number of requests addressed to an endpoint
    pub fn request_count(&self, endpoint: Endpoint) -> usize {
        self.request_log()
            .iter()
            .filter(|r| self.endpoint_of(r) == Some(endpoint))
            .count()
    }

    /// A job by id
    pub fn job(&self, job_id: &str) -> Option<MockJob> {
        self.state().job_mut(job_id).map(|job| job.clone())
    }

    /// All jobs, oldest first
    pub fn jobs(&self) -> Vec<MockJob> {
        self.state().jobs.values().cloned().collect()
    }

    /// User logged in on the current session, if any
    pub fn logged_in_user(&self) -> Option<String> {
        self.state().logged_in_user.clone()
    }

    // === Request handling ===

    /// Answer one request.
    pub fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.request_log().push(request.clone());

        if self.state().down {
            return Err(TransportError::ConnectionFailed(format!(
                "connection refused: {}",
                request.url
            )));
        }

        let url = Url::parse(&request.url).map_err(|e| TransportError::Http(e.to_string()))?;
        let Some(relative) = self.relative_path(&url) else {
            return Ok(HttpResponse::with_status(404, "not found"));
        };
        if relative.is_empty() {
            return Ok(self.root());
        }
        let Some(endpoint) = Endpoint::from_path(&relative) else {
            return Ok(HttpResponse::with_status(404, "not found"));
        };

        if let Some(mode) = self.failures().check(endpoint) {
            return match mode {
                FailureMode::Timeout => Err(TransportError::Timeout),
                FailureMode::HttpStatus(status) => Ok(HttpResponse::with_status(status, "error")),
                FailureMode::Remote { code, message } if endpoint.is_enveloped() => {
                    Ok(envelope(Envelope::failure(code, message)))
                }
                FailureMode::Remote { message, .. } => Ok(HttpResponse::ok(message)),
            };
        }

        let params = params_of(request, &url);
        let mut state = self.state();

        if endpoint != Endpoint::Validate && !has_session(&state, request) {
            return Ok(if endpoint.is_enveloped() {
                envelope(Envelope::failure(2, "not authenticated"))
            } else {
                HttpResponse::with_status(403, "not authenticated")
            });
        }

        Ok(match endpoint {
            Endpoint::Validate => validate(&mut state, &params),
            Endpoint::Login => login(&mut state, &params),
            Endpoint::CheckServer => HttpResponse::ok(state.server_status.clone()),
            Endpoint::GetConfig => match params.get("var") {
                Some(var) => HttpResponse::ok(raw_text(state.site_config.get(var.as_str()))),
                None => bare(&state.site_config),
            },
            Endpoint::GetInstanceTypes => success(state.instance_types.clone()),
            Endpoint::GetEnabledFeatures => success(state.features.clone()),
            Endpoint::GetMayaRenderers => success(state.maya_renderers.clone()),
            Endpoint::GetJobSubtypes => success(state.job_subtypes.clone()),
            Endpoint::GetPreflightChecks => match params.get("job_type") {
                Some(job_type) => success(state.rules.get(job_type).cloned().unwrap_or_else(|| json!([]))),
                None => envelope(Envelope::failure(1, "job_type is required")),
            },
            Endpoint::SubmitJob => submit(&mut state, params),
            Endpoint::GetJobs => {
                let max = params
                    .get("max")
                    .and_then(|m| m.parse().ok())
                    .unwrap_or(DEFAULT_JOB_LIMIT);
                HttpResponse::ok(format!("({})", Value::Array(state.job_summaries(max))))
            }
            Endpoint::GetJobParams => match job_arg(&mut state, &params) {
                Some(job) => bare(&json!(job.params)),
                None => no_such_job(),
            },
            Endpoint::SetJobStatus => set_status(&mut state, &params),
            Endpoint::RetryErrors => match job_arg(&mut state, &params) {
                Some(job) => {
                    job.retries += 1;
                    HttpResponse::ok(job.retries.to_string())
                }
                None => no_such_job(),
            },
            Endpoint::DeleteJob => {
                let removed = params
                    .get("job_id")
                    .and_then(|id| id.parse::<u64>().ok())
                    .and_then(|id| state.jobs.remove(&id));
                match removed {
                    Some(_) => HttpResponse::ok("deleted"),
                    None => no_such_job(),
                }
            }
            Endpoint::GetTriggers => success(Value::Array(state.triggers.clone())),
            Endpoint::GetProjectName => match params.get("file") {
                Some(file) => bare(&json!(state.project_name(file))),
                None => HttpResponse::with_status(400, "file is required"),
            },
            Endpoint::GetMayaOutput => match params.get("file") {
                Some(file) => bare(&json!(state.maya_output(file))),
                None => HttpResponse::with_status(400, "file is required"),
            },
        })
    }

    fn root(&self) -> HttpResponse {
        if self.state().redirect_root {
            HttpResponse::with_status(302, "").with_header("Location", format!("{}index.php", self.base_url))
        } else {
            HttpResponse::ok("<html>zync</html>")
        }
    }

    fn relative_path(&self, url: &Url) -> Option<String> {
        let base = Url::parse(&self.base_url).ok()?;
        if base.host_str() != url.host_str() {
            return None;
        }
        url.path()
            .strip_prefix(base.path())
            .map(|rest| rest.to_string())
    }

    fn endpoint_of(&self, request: &HttpRequest) -> Option<Endpoint> {
        let url = Url::parse(&request.url).ok()?;
        Endpoint::from_path(&self.relative_path(&url)?)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn failures(&self) -> MutexGuard<'_, FailureInjector> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_log(&self) -> MutexGuard<'_, Vec<HttpRequest>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockSite {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(state: &mut MockState, params: &BTreeMap<String, String>) -> HttpResponse {
    let name = params.get("script_name").map(String::as_str);
    let token = params.get("token").map(String::as_str);
    if name != Some(MOCK_SCRIPT_NAME) || token != Some(MOCK_TOKEN) {
        return HttpResponse::ok("invalid script credentials");
    }

    let session = state.open_session();
    let response = HttpResponse::ok("ok");
    if state.issue_cookie {
        response.with_header(SET_COOKIE_HEADER, format!("{}={}; path=/; HttpOnly", SESSION_COOKIE, session))
    } else {
        response
    }
}

fn login(state: &mut MockState, params: &BTreeMap<String, String>) -> HttpResponse {
    let user = params.get("user").map(String::as_str);
    let pass = params.get("pass").map(String::as_str);
    if user != Some(MOCK_USER) || pass != Some(MOCK_PASSWORD) {
        return envelope(Envelope::failure(1, "invalid username or password"));
    }

    state.logged_in_user = Some(MOCK_USER.to_string());
    let session = state.session_id.clone().unwrap_or_default();
    success(json!("ok"))
        .with_header(SET_COOKIE_HEADER, format!("{}={}; path=/", SESSION_COOKIE, session))
        .with_header(SET_COOKIE_HEADER, format!("zync_user={}; path=/", MOCK_USER))
}

fn submit(state: &mut MockState, params: BTreeMap<String, String>) -> HttpResponse {
    for required in ["job_type", "file"] {
        if params.get(required).map_or(true, |v| v.is_empty()) {
            return envelope(Envelope::failure(1, format!("{} is required", required)));
        }
    }
    if let Some(scene_info) = params.get("scene_info") {
        if serde_json::from_str::<Value>(scene_info).is_err() {
            return envelope(Envelope::failure(1, "scene_info is not valid JSON"));
        }
    }
    let id = state.add_job(params);
    success(json!(id))
}

fn set_status(state: &mut MockState, params: &BTreeMap<String, String>) -> HttpResponse {
    let Some(status) = params.get("status").and_then(|s| s.parse::<JobStatus>().ok()) else {
        return HttpResponse::with_status(400, "invalid status");
    };
    match job_arg(state, params) {
        Some(job) => {
            job.set_status(status);
            HttpResponse::ok(status.as_str())
        }
        None => no_such_job(),
    }
}

fn job_arg<'a>(state: &'a mut MockState, params: &BTreeMap<String, String>) -> Option<&'a mut MockJob> {
    state.job_mut(params.get("job_id")?)
}

fn has_session(state: &MockState, request: &HttpRequest) -> bool {
    let Some(session) = state.session_id.as_deref() else {
        return false;
    };
    let expected = format!("{}={}", SESSION_COOKIE, session);
    request
        .header(COOKIE_HEADER)
        .map(|cookie| cookie.split(';').any(|pair| pair.trim() == expected))
        .unwrap_or(false)
}

fn params_of(request: &HttpRequest, url: &Url) -> BTreeMap<String, String> {
    let mut params: BTreeMap<String, String> = url.query_pairs().into_owned().collect();
    if request.method == Method::Post {
        if let Some(body) = &request.body {
            params.extend(url::form_urlencoded::parse(body.as_bytes()).into_owned());
        }
    }
    params
}

fn raw_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn envelope(envelope: Envelope) -> HttpResponse {
    HttpResponse::ok(serde_json::to_string(&envelope).unwrap_or_default())
}

fn success(response: Value) -> HttpResponse {
    envelope(Envelope::success(response))
}

fn bare(value: &Value) -> HttpResponse {
    HttpResponse::ok(value.to_string())
}

fn no_such_job() -> HttpResponse {
    HttpResponse::with_status(404, "no such job")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(site: &MockSite, path: &str) -> HttpResponse {
        site.handle(&HttpRequest::get(format!("{}{}", site.base_url(), path))).unwrap()
    }

    #[test]
    fn test_root_is_up() {
        let site = MockSite::new();
        assert_eq!(get(&site, "").status, 200);
        site.set_redirect_root(true);
        assert_eq!(get(&site, "").status, 302);
    }

    #[test]
    fn test_down_refuses_connections() {
        let site = MockSite::new();
        site.set_down(true);
        let result = site.handle(&HttpRequest::get(site.base_url()));
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    }

    #[test]
    fn test_unknown_path_404() {
        let site = MockSite::new();
        assert_eq!(get(&site, "lib/nope.php").status, 404);
    }

    #[test]
    fn test_requires_session_cookie() {
        let site = MockSite::new();
        let body = get(&site, "lib/get_instance_types.php").body;
        let envelope: Envelope = serde_json::from_str(&body).unwrap();
        assert_eq!(envelope.code, 2);
    }

    #[test]
    fn test_bare_endpoints_without_session() {
        let site = MockSite::new();
        assert_eq!(get(&site, "lib/get_config_api.php").status, 403);
    }

    #[test]
    fn test_validate_issues_cookie() {
        let site = MockSite::new();
        let body = format!("script_name={}&token={}", MOCK_SCRIPT_NAME, MOCK_TOKEN);
        let response = site
            .handle(&HttpRequest::post(format!("{}validate.php", site.base_url()), body))
            .unwrap();
        assert!(response.header(SET_COOKIE_HEADER).unwrap().starts_with("PHPSESSID=mock-session-"));
        assert_eq!(site.request_count(Endpoint::Validate), 1);
    }

    #[test]
    fn test_bad_script_credentials() {
        let site = MockSite::new();
        let response = site
            .handle(&HttpRequest::post(
                format!("{}validate.php", site.base_url()),
                "script_name=x&token=y",
            ))
            .unwrap();
        assert_eq!(response.body, "invalid script credentials");
        assert!(response.header(SET_COOKIE_HEADER).is_none());
    }
}
