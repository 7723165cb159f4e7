//! Zync Protocol Types
//!
//! Defines the wire contract between the client and the Zync HTTP API:
//! endpoint paths, the `{code, response}` envelope, response framing and the
//! records returned by the site-configuration endpoints.

pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod framing;
pub mod records;

pub use endpoints::{Endpoint, ResponseShape};
pub use envelope::Envelope;
pub use error::ProtocolError;
pub use framing::{load_json, parse_envelope};
pub use records::{id_to_string, InstanceType, JobStatus, TriggerEvent};

/// Envelope code the service uses for success.
pub const SUCCESS_CODE: i64 = 0;

/// Cookie header name the service reads the session from.
pub const COOKIE_HEADER: &str = "Cookie";

/// Response header carrying a freshly issued session cookie.
pub const SET_COOKIE_HEADER: &str = "set-cookie";

/// Content type of every POST body the service accepts.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
