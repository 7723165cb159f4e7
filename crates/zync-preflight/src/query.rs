//! Host queries
//!
//! Rules name a scene query by identifier (`getRenderLayers()`,
//! `getMissingPlugins()`, ...). Instead of evaluating free-form script, each
//! supported application ships a [`QueryRegistry`] mapping those identifiers
//! to typed functions over a [`SceneState`]. A [`ScriptHost`] is whatever the
//! orchestrator evaluates against; [`RegistryHost`] pairs a registry with a
//! live scene.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::rule::scalar_to_string;

/// Result of evaluating a host query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// A single value
    Scalar(String),
    /// An ordered sequence of values
    Sequence(Vec<String>),
}

impl QueryValue {
    /// Normalize to a sequence; a scalar becomes a one-element sequence.
    pub fn into_values(self) -> Vec<String> {
        match self {
            QueryValue::Scalar(s) => vec![s],
            QueryValue::Sequence(values) => values,
        }
    }

    /// Convert a JSON result into a query value.
    ///
    /// Strings, numbers and booleans are scalars; an array of those is a
    /// sequence. Anything else is not a valid query result.
    pub fn from_json(value: &Value) -> Result<Self, EvalError> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|v| scalar_to_string(v).ok_or_else(|| EvalError::NotScalar(v.to_string())))
                .collect::<Result<Vec<_>, _>>()
                .map(QueryValue::Sequence),
            other => scalar_to_string(other)
                .map(QueryValue::Scalar)
                .ok_or_else(|| EvalError::NotScalar(other.to_string())),
        }
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Scalar(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::Sequence(values)
    }
}

/// Why a query could not be evaluated. Always recovered by skipping the rule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("unknown query: {0}")]
    UnknownQuery(String),

    #[error("query {0} is not supported by this application")]
    Unsupported(&'static str),

    #[error("scene object not found: {0}")]
    MissingObject(String),

    #[error("query result is not a scalar: {0}")]
    NotScalar(String),

    #[error("host application error: {0}")]
    Host(String),
}

/// The embedded scripting environment of an authoring application.
pub trait ScriptHost {
    /// Application name, for logging
    fn name(&self) -> &str;

    /// Whether the scripting environment is usable in this process.
    fn is_available(&self) -> bool {
        true
    }

    /// Evaluate a rule's query identifier against the live scene.
    fn evaluate(&self, expression: &str) -> Result<QueryValue, EvalError>;
}

/// Scene introspection a host application can answer.
///
/// Every method defaults to [`EvalError::Unsupported`] so an application only
/// implements what it has.
pub trait SceneState {
    /// Application version string, e.g. `"2016"` or `"10.0v4"`
    fn version(&self) -> Result<String, EvalError> {
        Err(EvalError::Unsupported("getVersion"))
    }

    /// Active renderer identifier
    fn renderer(&self) -> Result<String, EvalError> {
        Err(EvalError::Unsupported("getRenderer"))
    }

    /// Render layer names, in scene order
    fn render_layers(&self) -> Result<Vec<String>, EvalError> {
        Err(EvalError::Unsupported("getRenderLayers"))
    }

    /// Renderable camera names
    fn cameras(&self) -> Result<Vec<String>, EvalError> {
        Err(EvalError::Unsupported("getCameras"))
    }

    /// Plugins the scene requires but the session has not loaded
    fn missing_plugins(&self) -> Result<Vec<String>, EvalError> {
        Err(EvalError::Unsupported("getMissingPlugins"))
    }

    /// Plugins loaded in the session
    fn loaded_plugins(&self) -> Result<Vec<String>, EvalError> {
        Err(EvalError::Unsupported("getLoadedPlugins"))
    }

    /// Write node names (compositing applications)
    fn write_nodes(&self) -> Result<Vec<String>, EvalError> {
        Err(EvalError::Unsupported("getWriteNodes"))
    }

    /// File references that do not resolve on disk
    fn missing_files(&self) -> Result<Vec<String>, EvalError> {
        Err(EvalError::Unsupported("getMissingFiles"))
    }
}

/// A typed query over a scene.
pub type QueryFn = fn(&dyn SceneState) -> Result<QueryValue, EvalError>;

/// Registry of query identifiers known to one application.
#[derive(Clone)]
pub struct QueryRegistry {
    app: &'static str,
    queries: BTreeMap<String, QueryFn>,
}

impl QueryRegistry {
    /// Create an empty registry for an application
    pub fn new(app: &'static str) -> Self {
        Self {
            app,
            queries: BTreeMap::new(),
        }
    }

    /// Register a query under an identifier. Trailing `()` is ignored.
    pub fn register(mut self, identifier: &str, query: QueryFn) -> Self {
        self.queries.insert(normalize(identifier).to_string(), query);
        self
    }

    /// Application this registry serves
    pub fn app(&self) -> &'static str {
        self.app
    }

    /// Registered identifiers, sorted
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    /// Returns true if the identifier resolves to a query
    pub fn contains(&self, identifier: &str) -> bool {
        self.queries.contains_key(normalize(identifier))
    }

    /// Evaluate an identifier against a scene.
    pub fn evaluate(&self, identifier: &str, scene: &dyn SceneState) -> Result<QueryValue, EvalError> {
        let query = self
            .queries
            .get(normalize(identifier))
            .ok_or_else(|| EvalError::UnknownQuery(identifier.to_string()))?;
        query(scene)
    }

    /// Queries shared by every 3D application
    fn scene_common(self) -> Self {
        self.register("getVersion", |s| s.version().map(QueryValue::Scalar))
            .register("getRenderer", |s| s.renderer().map(QueryValue::Scalar))
            .register("getCameras", |s| s.cameras().map(QueryValue::Sequence))
            .register("getMissingFiles", |s| s.missing_files().map(QueryValue::Sequence))
    }

    /// Queries for the 3D-animation application
    pub fn maya() -> Self {
        Self::new("maya")
            .scene_common()
            .register("getRenderLayers", |s| s.render_layers().map(QueryValue::Sequence))
            .register("getMissingPlugins", |s| s.missing_plugins().map(QueryValue::Sequence))
            .register("getLoadedPlugins", |s| s.loaded_plugins().map(QueryValue::Sequence))
    }

    /// Queries for the compositing application
    pub fn nuke() -> Self {
        Self::new("nuke")
            .register("getVersion", |s| s.version().map(QueryValue::Scalar))
            .register("getWriteNodes", |s| s.write_nodes().map(QueryValue::Sequence))
            .register("getMissingPlugins", |s| s.missing_plugins().map(QueryValue::Sequence))
            .register("getMissingFiles", |s| s.missing_files().map(QueryValue::Sequence))
    }

    /// Queries for the standalone renderer
    pub fn arnold() -> Self {
        Self::new("arnold").scene_common()
    }
}

impl std::fmt::Debug for QueryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryRegistry")
            .field("app", &self.app)
            .field("queries", &self.queries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// `getRenderer()` and `getRenderer` name the same query.
fn normalize(identifier: &str) -> &str {
    let trimmed = identifier.trim();
    trimmed.strip_suffix("()").unwrap_or(trimmed).trim_end()
}

/// A [`ScriptHost`] backed by a registry and a live scene.
pub struct RegistryHost<S> {
    registry: QueryRegistry,
    scene: S,
}

impl<S: SceneState> RegistryHost<S> {
    /// Pair a registry with a scene
    pub fn new(registry: QueryRegistry, scene: S) -> Self {
        Self { registry, scene }
    }

    /// The underlying scene
    pub fn scene(&self) -> &S {
        &self.scene
    }
}

impl<S: SceneState> ScriptHost for RegistryHost<S> {
    fn name(&self) -> &str {
        self.registry.app()
    }

    fn evaluate(&self, expression: &str) -> Result<QueryValue, EvalError> {
        self.registry.evaluate(expression, &self.scene)
    }
}
