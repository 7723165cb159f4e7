//! Mock Site Implementation
//!
//! An in-process Zync site for tests, reached through
//! [`MockTransport`](crate::session::MockTransport).
//!
//! # Endpoints
//!
//! - `validate.php`, `lib/login.php`: check credentials, issue cookies
//! - `lib/check_server.php`: configurable status string
//! - site configuration, instance types, features, renderers, subtypes
//! - `lib/get_preflight_checks.php`: rules per job type, served verbatim
//! - job submission, listing, params, status, retry and delete
//! - trigger feed, project name and Maya output path lookups

mod failure;
mod site;
mod state;

pub use failure::{FailureConfig, FailureInjector, FailureMode};
pub use site::{MockSite, MOCK_BASE_URL, MOCK_PASSWORD, MOCK_SCRIPT_NAME, MOCK_TOKEN, MOCK_USER};
pub use state::{MockJob, MockState};
