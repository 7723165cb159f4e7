//! Configuration loading tests
//!
//! Tests layered config files feeding a real client:
//! - User and project TOML layers with overrides on top
//! - Provenance and secret redaction
//! - TLS validation derived from the host application

use std::fs;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use zync::config::{ConfigError, ConfigOrigin, EffectiveConfig};
use zync::mock::{MockSite, MOCK_SCRIPT_NAME, MOCK_TOKEN};
use zync::{HostApp, JobKind, MockTransport, Zync};

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_layers_produce_working_client() {
    let site = MockSite::new();
    let dir = TempDir::new().unwrap();
    let user = write(
        &dir,
        "config.toml",
        &format!(
            "url = \"{}\"\nscript_name = \"{}\"\ntoken = \"{}\"\ntimeout_seconds = 30\n",
            site.base_url(),
            MOCK_SCRIPT_NAME,
            MOCK_TOKEN
        ),
    );
    let project = write(&dir, ".zync.toml", "timeout_seconds = 15\n[host_app]\nname = \"maya\"\nversion = \"2016\"\n");

    let effective = EffectiveConfig::build(Some(&user), Some(&project), None).unwrap();
    let config = effective.client_config().unwrap();

    assert_eq!(config.timeout_seconds, 15);
    assert_eq!(config.host_app, HostApp::new("maya", "2016"));
    assert_eq!(JobKind::for_host_app(&config.host_app.name), Some(JobKind::Maya));

    let zync = Zync::connect_with(config, Arc::new(MockTransport::with_site(site.clone()))).unwrap();
    assert!(zync.up());
}

#[test]
fn test_overrides_win_and_are_tracked() {
    let dir = TempDir::new().unwrap();
    let user = write(&dir, "config.toml", "url = \"https://a.zync.io\"\nscript_name = \"s\"\ntoken = \"t\"\n");

    let effective = EffectiveConfig::build(
        Some(&user),
        None,
        Some(json!({"url": "https://b.zync.io", "verify_tls": false})),
    )
    .unwrap();

    let origins: Vec<_> = effective.sources.iter().map(|s| s.origin.clone()).collect();
    assert_eq!(origins, vec![ConfigOrigin::Builtin, ConfigOrigin::User, ConfigOrigin::Override]);

    let config = effective.client_config().unwrap();
    assert_eq!(config.url, "https://b.zync.io");
    assert!(!config.verify_tls());
}

#[test]
fn test_secrets_never_serialized() {
    let dir = TempDir::new().unwrap();
    let user = write(
        &dir,
        "config.toml",
        "url = \"https://a.zync.io\"\nscript_name = \"s\"\ntoken = \"super-secret-token\"\n[login]\nuser = \"artist\"\npassword = \"hunter2\"\n",
    );

    let effective = EffectiveConfig::build(Some(&user), None, None).unwrap();
    let rendered = effective.to_json().unwrap();

    assert!(!rendered.contains("super-secret-token"));
    assert!(!rendered.contains("hunter2"));
    assert!(effective.redactions.contains(&"token".to_string()));
    assert!(effective.redactions.contains(&"login.password".to_string()));
    assert_eq!(effective.get_str("login.user"), Some("artist"));
}

#[test]
fn test_digest_changes_with_content() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.toml", "timeout_seconds = 5\n");
    let first = EffectiveConfig::build(Some(&path), None, None).unwrap();

    fs::write(&path, "timeout_seconds = 6\n").unwrap();
    let second = EffectiveConfig::build(Some(&path), None, None).unwrap();

    assert_ne!(first.sources[1].digest, second.sources[1].digest);
}

#[test]
fn test_old_maya_disables_tls_validation() {
    let dir = TempDir::new().unwrap();
    let user = write(
        &dir,
        "config.toml",
        "url = \"https://a.zync.io\"\nscript_name = \"s\"\ntoken = \"t\"\n[host_app]\nname = \"maya\"\nversion = \"2014\"\n",
    );

    let config = EffectiveConfig::build(Some(&user), None, None)
        .unwrap()
        .client_config()
        .unwrap();
    assert!(!config.verify_tls());
}

#[test]
fn test_invalid_url_rejected() {
    let dir = TempDir::new().unwrap();
    let user = write(&dir, "config.toml", "url = \"zync.io\"\nscript_name = \"s\"\ntoken = \"t\"\n");

    let err = EffectiveConfig::build(Some(&user), None, None)
        .unwrap()
        .client_config()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}

#[test]
fn test_logging_init_is_idempotent() {
    zync::logging::init();
    assert!(!zync::logging::init());
}
