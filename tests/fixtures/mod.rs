//! Shared fixtures for integration tests
//!
//! - A configurable scene and scripting host for preflight tests
//! - Rule payload builders matching the rule service's wire shape
//! - Helpers that connect a client to an in-process mock site

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::{json, Value};
use zync::mock::{MockSite, MOCK_SCRIPT_NAME, MOCK_TOKEN};
use zync::{ClientConfig, MockTransport, Zync};
use zync_preflight::{EvalError, QueryValue, SceneState, ScriptHost};

/// A scene with fixed answers. Unset fields are unsupported queries.
#[derive(Debug, Clone, Default)]
pub struct FixtureScene {
    pub version: Option<String>,
    pub renderer: Option<String>,
    pub render_layers: Option<Vec<String>>,
    pub cameras: Option<Vec<String>>,
    pub missing_plugins: Option<Vec<String>>,
    pub write_nodes: Option<Vec<String>>,
    pub missing_files: Option<Vec<String>>,
}

fn answer<T: Clone>(value: &Option<T>, query: &'static str) -> Result<T, EvalError> {
    value.clone().ok_or(EvalError::Unsupported(query))
}

impl SceneState for FixtureScene {
    fn version(&self) -> Result<String, EvalError> {
        answer(&self.version, "getVersion")
    }

    fn renderer(&self) -> Result<String, EvalError> {
        answer(&self.renderer, "getRenderer")
    }

    fn render_layers(&self) -> Result<Vec<String>, EvalError> {
        answer(&self.render_layers, "getRenderLayers")
    }

    fn cameras(&self) -> Result<Vec<String>, EvalError> {
        answer(&self.cameras, "getCameras")
    }

    fn missing_plugins(&self) -> Result<Vec<String>, EvalError> {
        answer(&self.missing_plugins, "getMissingPlugins")
    }

    fn write_nodes(&self) -> Result<Vec<String>, EvalError> {
        answer(&self.write_nodes, "getWriteNodes")
    }

    fn missing_files(&self) -> Result<Vec<String>, EvalError> {
        answer(&self.missing_files, "getMissingFiles")
    }
}

/// A scripting host with scripted answers per expression that records every
/// evaluation in order.
#[derive(Clone, Default)]
pub struct ScriptedHost {
    pub available: bool,
    answers: BTreeMap<String, Result<QueryValue, String>>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self {
            available: true,
            ..Default::default()
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn answer(mut self, expression: &str, value: impl Into<QueryValue>) -> Self {
        self.answers.insert(expression.to_string(), Ok(value.into()));
        self
    }

    pub fn fail(mut self, expression: &str, message: &str) -> Self {
        self.answers.insert(expression.to_string(), Err(message.to_string()));
        self
    }

    /// Shared handle on the evaluation log
    pub fn calls(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.calls)
    }
}

impl ScriptHost for ScriptedHost {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn evaluate(&self, expression: &str) -> Result<QueryValue, EvalError> {
        self.calls.borrow_mut().push(expression.to_string());
        match self.answers.get(expression) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(EvalError::Host(message.clone())),
            None => Err(EvalError::UnknownQuery(expression.to_string())),
        }
    }
}

/// One rule in the rule service's wire shape
pub fn rule(api_call: &str, operation_type: &str, condition: &[&str], error: &str) -> Value {
    json!({
        "api_call": api_call,
        "operation_type": operation_type,
        "condition": condition,
        "error": error,
    })
}

/// Config accepted by the mock site
pub fn mock_config(site: &MockSite) -> ClientConfig {
    ClientConfig::new(site.base_url(), MOCK_SCRIPT_NAME, MOCK_TOKEN)
}

/// Connect a client to a mock site
pub fn connect(site: &MockSite) -> Zync {
    Zync::connect_with(mock_config(site), Arc::new(MockTransport::with_site(site.clone())))
        .expect("connect to mock site")
}

/// Owned strings from literals
pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
