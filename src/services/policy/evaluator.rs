//! Boundary to the policy engine.
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::input::PolicyInput;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk policy directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("failed to compile policy {name}: {reason}")]
    Compile { name: String, reason: String },

    #[error("invalid policy data {name}: {reason}")]
    Data { name: String, reason: String },

    #[error("no policy modules found in {0}")]
    NoModules(PathBuf),

    #[error("policy evaluation failed: {0}")]
    Evaluation(String),
}

/// One result set of a query: the value of each expression in it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub expressions: Vec<Value>,
}

/// Evaluates a query against compiled rules and a `PolicyInput`.
///
/// Implementations are immutable after construction and shared by all requests.
pub trait PolicyEvaluator: Send + Sync {
    fn evaluate(&self, query: &str, input: &PolicyInput) -> Result<Vec<ResultSet>, PolicyError>;
}

/// Compiled policy plus the query that yields the allow decision.
///
/// Built once at startup and passed by reference into `decide`.
#[derive(Clone)]
pub struct PolicyContext {
    evaluator: Arc<dyn PolicyEvaluator>,
    query: String,
}

impl PolicyContext {
    pub fn new(evaluator: Arc<dyn PolicyEvaluator>, query: impl Into<String>) -> Self {
        Self {
            evaluator,
            query: query.into(),
        }
    }

    pub fn evaluator(&self) -> &dyn PolicyEvaluator {
        self.evaluator.as_ref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl fmt::Debug for PolicyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyContext")
            .field("query", &self.query)
            .finish()
    }
}
