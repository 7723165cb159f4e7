//! Authenticated session against a Zync site

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;
use zync_preflight::{rules_from_value, PreflightError, PreflightRule, RuleSource};
use zync_protocol::{
    load_json, parse_envelope, Endpoint, ProtocolError, ResponseShape, COOKIE_HEADER,
    FORM_CONTENT_TYPE, SET_COOKIE_HEADER,
};

use crate::config::ClientConfig;
use crate::error::{ZyncError, ZyncResult};

use super::transport::{HttpRequest, HttpResponse, HttpTransport, Transport, TransportError};

/// Status string reported when the liveness check fails
pub const STATUS_DOWN: &str = "down";

/// An authenticated connection to one site.
pub struct Session {
    config: ClientConfig,
    base_url: Url,
    transport: Arc<dyn Transport>,
    cookie: String,
}

impl Session {
    /// Open a session over the production HTTP transport.
    pub fn connect(config: ClientConfig) -> ZyncResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.timeout(), config.verify_tls())?;
        Self::open(config, Arc::new(transport))
    }

    /// Open a session: check liveness, then authenticate with the script
    /// credentials.
    pub fn open(config: ClientConfig, transport: Arc<dyn Transport>) -> ZyncResult<Self> {
        config.validate()?;
        let base_url = directory_url(config.base_url()?);

        if !probe(transport.as_ref(), &base_url) {
            return Err(ZyncError::ServiceDown {
                url: config.url.clone(),
            });
        }

        let cookie = authenticate(transport.as_ref(), &base_url, &config)?;
        info!(url = %base_url, script = %config.script_name, "authenticated with zync");

        Ok(Self {
            config,
            base_url,
            transport,
            cookie,
        })
    }

    /// The configuration this session was opened with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Site base URL, always ending in `/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The session cookie sent with every request
    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    /// Whether the site answers on its base URL with 2xx or 3xx.
    pub fn up(&self) -> bool {
        probe(self.transport.as_ref(), &self.base_url)
    }

    /// Server status string, or `"down"` if the site is not up.
    pub fn status(&self) -> ZyncResult<String> {
        if !self.up() {
            return Ok(STATUS_DOWN.to_string());
        }
        self.call_raw(Endpoint::CheckServer, &[])
    }

    /// Elevate the session with a user login.
    pub fn login(&mut self, username: &str, password: &str) -> ZyncResult<()> {
        if username.trim().is_empty() {
            return Err(ZyncError::Configuration("username must not be empty".to_string()));
        }

        let response = self.send(Endpoint::Login, &[("user", username), ("pass", password)])?;
        parse_envelope(&response.body)?
            .into_result()
            .map_err(|e| {
                ZyncError::Authentication(e.remote_message().map_or_else(|| e.to_string(), str::to_string))
            })?;

        if let Some(cookie) = cookie_from(&response) {
            self.cookie = cookie;
        }
        info!(user = %username, "logged in");
        Ok(())
    }

    /// URL of an endpoint with the given query parameters.
    pub fn url_for(&self, endpoint: Endpoint, query: &[(&str, &str)]) -> ZyncResult<Url> {
        let mut url = self.base_url.join(endpoint.path()).map_err(|e| {
            ZyncError::Configuration(format!("cannot build URL for {}: {}", endpoint, e))
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Call an endpoint and return its payload.
    ///
    /// Enveloped endpoints are unwrapped; a non-zero code becomes
    /// [`ZyncError::RemoteProtocol`]. Bare JSON endpoints are parsed after
    /// stripping the parenthesis framing. Text endpoints come back as a
    /// JSON string holding the body, undecoded.
    pub fn call(&self, endpoint: Endpoint, params: &[(&str, &str)]) -> ZyncResult<Value> {
        let response = self.send(endpoint, params)?;
        check_status(endpoint, &response)?;

        match endpoint.response_shape() {
            ResponseShape::Text => return Ok(Value::String(response.body)),
            ResponseShape::Json => return Ok(load_json(&response.body)?),
            ResponseShape::Envelope => {}
        }

        parse_envelope(&response.body)?
            .into_result()
            .map_err(|e| match e {
                ProtocolError::Remote { code, message } => {
                    warn!(endpoint = %endpoint, code, "remote call failed");
                    ZyncError::RemoteProtocol { endpoint, message }
                }
                other => ZyncError::Protocol(other),
            })
    }

    /// Call an endpoint and return the raw response body.
    pub fn call_raw(&self, endpoint: Endpoint, params: &[(&str, &str)]) -> ZyncResult<String> {
        let response = self.send(endpoint, params)?;
        check_status(endpoint, &response)?;
        Ok(response.body)
    }

    /// A single site configuration variable, as the raw text the site returns.
    pub fn config_var(&self, name: &str) -> ZyncResult<String> {
        if name.trim().is_empty() {
            return Err(ZyncError::Configuration("config variable name must not be empty".to_string()));
        }
        let body = self.call_raw(Endpoint::GetConfig, &[("var", name)])?;
        Ok(body.trim().to_string())
    }

    fn send(&self, endpoint: Endpoint, params: &[(&str, &str)]) -> ZyncResult<HttpResponse> {
        let mut request = if endpoint.is_post() {
            HttpRequest::post(self.url_for(endpoint, &[])?.as_str(), encode_form(params))
                .with_header("Content-Type", FORM_CONTENT_TYPE)
        } else {
            HttpRequest::get(self.url_for(endpoint, params)?.as_str())
        };
        request.headers.push((COOKIE_HEADER.to_string(), self.cookie.clone()));

        debug!(endpoint = %endpoint, method = %request.method, "calling endpoint");
        Ok(self.transport.request(&request)?)
    }
}

impl RuleSource for Session {
    fn fetch_rules(&self, job_type: &str) -> Result<Vec<PreflightRule>, PreflightError> {
        let value = self
            .call(Endpoint::GetPreflightChecks, &[("job_type", job_type)])
            .map_err(|e| match e {
                ZyncError::RemoteProtocol { message, .. } => PreflightError::RemoteProtocol(message),
                ZyncError::Transport(TransportError::Timeout) => PreflightError::Unreachable {
                    message: TransportError::Timeout.to_string(),
                    timed_out: true,
                },
                ZyncError::Transport(TransportError::ConnectionFailed(message))
                | ZyncError::Transport(TransportError::Http(message)) => PreflightError::Unreachable {
                    message,
                    timed_out: false,
                },
                other => PreflightError::RemoteProtocol(other.to_string()),
            })?;
        let rules = rules_from_value(value)?;
        debug!(job_type, count = rules.len(), "fetched preflight rules");
        Ok(rules)
    }
}

/// Make relative endpoint paths resolve under the configured path.
fn directory_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    url
}

fn probe(transport: &dyn Transport, base_url: &Url) -> bool {
    match transport.request(&HttpRequest::get(base_url.as_str())) {
        Ok(response) => response.is_up(),
        Err(e) => {
            debug!(url = %base_url, error = %e, "liveness check failed");
            false
        }
    }
}

fn authenticate(transport: &dyn Transport, base_url: &Url, config: &ClientConfig) -> ZyncResult<String> {
    let url = base_url
        .join(Endpoint::Validate.path())
        .map_err(|e| ZyncError::Configuration(e.to_string()))?;
    let body = encode_form(&[
        ("script_name", config.script_name.as_str()),
        ("token", config.token.as_str()),
    ]);
    let request = HttpRequest::post(url.as_str(), body).with_header("Content-Type", FORM_CONTENT_TYPE);
    let response = transport.request(&request)?;
    if !response.is_success() {
        return Err(ZyncError::Authentication(format!("HTTP {}", response.status)));
    }

    // validate.php has no body contract; the cookie alone signals success
    cookie_from(&response).ok_or_else(|| {
        let body = response.body.trim();
        ZyncError::Authentication(if body.is_empty() {
            "no session cookie issued".to_string()
        } else {
            format!("no session cookie issued: {}", body)
        })
    })
}

/// Name=value pairs of every `set-cookie` header, attributes dropped.
fn cookie_from(response: &HttpResponse) -> Option<String> {
    let pairs: Vec<&str> = response
        .header_values(SET_COOKIE_HEADER)
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

fn encode_form(params: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

fn check_status(endpoint: Endpoint, response: &HttpResponse) -> ZyncResult<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(ZyncError::RemoteProtocol {
            endpoint,
            message: format!("HTTP {}", response.status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockSite, MOCK_SCRIPT_NAME, MOCK_TOKEN};
    use crate::session::MockTransport;

    fn open(site: &MockSite) -> ZyncResult<Session> {
        let config = ClientConfig::new(site.base_url(), MOCK_SCRIPT_NAME, MOCK_TOKEN);
        Session::open(config, Arc::new(MockTransport::with_site(site.clone())))
    }

    #[test]
    fn test_open_sets_cookie() {
        let site = MockSite::new();
        let session = open(&site).unwrap();
        assert!(session.cookie().starts_with("PHPSESSID="));
        assert!(session.base_url().path().ends_with('/'));
    }

    #[test]
    fn test_cookie_attached_to_calls() {
        let site = MockSite::new();
        let session = open(&site).unwrap();
        session.call(Endpoint::GetInstanceTypes, &[]).unwrap();

        let last = site.last_request().unwrap();
        assert_eq!(last.header(COOKIE_HEADER), Some(session.cookie()));
    }

    #[test]
    fn test_url_for_encodes_query() {
        let site = MockSite::new();
        let session = open(&site).unwrap();
        let url = session
            .url_for(Endpoint::GetProjectName, &[("file", "/mnt/proj/a b.nk")])
            .unwrap();
        assert!(url.path().ends_with("lib/get_project_name.php"));
        assert_eq!(url.query(), Some("file=%2Fmnt%2Fproj%2Fa+b.nk"));
    }

    #[test]
    fn test_cookie_from_multiple_headers() {
        let response = HttpResponse::ok("")
            .with_header("Set-Cookie", "PHPSESSID=abc; path=/; HttpOnly")
            .with_header("set-cookie", "zync_user=7; path=/");
        assert_eq!(cookie_from(&response).as_deref(), Some("PHPSESSID=abc; zync_user=7"));
        assert_eq!(cookie_from(&HttpResponse::ok("")), None);
    }

    #[test]
    fn test_directory_url_keeps_subpath() {
        let url = directory_url(Url::parse("https://studio.zync.io/farm?x=1").unwrap());
        assert_eq!(url.as_str(), "https://studio.zync.io/farm/");
        assert_eq!(
            url.join("lib/get_jobs.php").unwrap().as_str(),
            "https://studio.zync.io/farm/lib/get_jobs.php"
        );
    }

    #[test]
    fn test_remote_error_names_endpoint() {
        let site = MockSite::new();
        let session = open(&site).unwrap();
        site.inject_error(Endpoint::GetEnabledFeatures, 1, "feature table locked");

        let err = session.call(Endpoint::GetEnabledFeatures, &[]).unwrap_err();
        match err {
            ZyncError::RemoteProtocol { endpoint, message } => {
                assert_eq!(endpoint, Endpoint::GetEnabledFeatures);
                assert_eq!(message, "feature table locked");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_when_down() {
        let site = MockSite::new();
        let session = open(&site).unwrap();
        site.set_down(true);
        assert!(!session.up());
        assert_eq!(session.status().unwrap(), STATUS_DOWN);
    }
}
