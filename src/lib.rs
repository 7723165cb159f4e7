//! Zync render-farm client
//!
//! Submits and manages rendering jobs on a Zync site from artist
//! workstations. A [`Zync`] opens an authenticated session, fetches the site
//! configuration, runs the preflight pass against the live authoring
//! application and submits jobs through the site's remote procedures.
//!
//! The preflight engine lives in [`zync_preflight`]; the wire contract in
//! [`zync_protocol`].

pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod mock;
pub mod session;
pub mod site;
mod zync;

pub use config::{ClientConfig, EffectiveConfig, HostApp};
pub use error::{ZyncError, ZyncResult};
pub use job::{JobKind, JobParams, PathMappings};
pub use session::{HttpTransport, MockTransport, Session, Transport};
pub use site::SiteConfig;
pub use zync::{Zync, DEFAULT_LIST_LIMIT};

pub use zync_preflight::{
    PreflightOutcome, PreflightRule, QueryRegistry, QueryValue, RegistryHost, SceneState, ScriptHost,
    SkipReason,
};
pub use zync_protocol::{Endpoint, JobStatus, TriggerEvent};
