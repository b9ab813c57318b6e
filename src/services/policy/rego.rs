//! Rego policy compiled with `regorus`.
//!
//! Directory layout follows the OPA bundle loader: every `*.rego` file is a
//! module, every `data.json` is merged into `data` under the path of the
//! directory that contains it.
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::evaluator::{PolicyError, PolicyEvaluator, ResultSet};
use super::input::PolicyInput;

#[derive(Clone)]
pub struct RegoPolicy {
    engine: regorus::Engine,
    modules: Vec<String>,
}

impl std::fmt::Debug for RegoPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegoPolicy")
            .field("modules", &self.modules)
            .finish()
    }
}

impl RegoPolicy {
    /// Compile `(name, source)` modules and merge optional data.
    pub fn from_sources(modules: &[(&str, &str)], data: Option<Value>) -> Result<Self, PolicyError> {
        let mut policy = Self {
            engine: regorus::Engine::new(),
            modules: Vec::with_capacity(modules.len()),
        };

        for (name, source) in modules {
            policy.add_module(name, source)?;
        }
        if let Some(data) = data {
            policy.add_data("data", data)?;
        }

        if policy.modules.is_empty() {
            return Err(PolicyError::NoModules(PathBuf::from("<inline>")));
        }
        Ok(policy)
    }

    /// Load every module and data document below `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, PolicyError> {
        let mut policy = Self {
            engine: regorus::Engine::new(),
            modules: Vec::new(),
        };

        let mut entries = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                entries.push(entry.into_path());
            }
        }

        for path in entries {
            let is_rego = path.extension().is_some_and(|ext| ext == "rego");
            let is_data = path.file_name().is_some_and(|name| name == "data.json");
            if !is_rego && !is_data {
                debug!(path = %path.display(), "skipping non-policy file");
                continue;
            }

            let source = fs::read_to_string(&path).map_err(|source| PolicyError::Io {
                path: path.clone(),
                source,
            })?;
            let name = path
                .strip_prefix(dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");

            if is_rego {
                policy.add_module(&name, &source)?;
            } else {
                let value: Value = serde_json::from_str(&source).map_err(|e| PolicyError::Data {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
                policy.add_data(&name, namespace(&name, value))?;
            }
        }

        if policy.modules.is_empty() {
            return Err(PolicyError::NoModules(dir.to_path_buf()));
        }

        info!(dir = %dir.display(), modules = policy.modules.len(), "policy bundle loaded");
        Ok(policy)
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    fn add_module(&mut self, name: &str, source: &str) -> Result<(), PolicyError> {
        self.engine
            .add_policy(name.to_string(), source.to_string())
            .map_err(|e| PolicyError::Compile {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        self.modules.push(name.to_string());
        Ok(())
    }

    fn add_data(&mut self, name: &str, data: Value) -> Result<(), PolicyError> {
        if !data.is_object() {
            return Err(PolicyError::Data {
                name: name.to_string(),
                reason: "data document must be a JSON object".to_string(),
            });
        }

        let value = regorus::Value::from_json_str(&data.to_string()).map_err(|e| PolicyError::Data {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.engine.add_data(value).map_err(|e| PolicyError::Data {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

// `a/b/data.json` holding `{..}` becomes `{"a": {"b": {..}}}`.
fn namespace(name: &str, value: Value) -> Value {
    let mut segments: Vec<&str> = name.split('/').collect();
    segments.pop();

    segments.into_iter().rev().fold(value, |inner, segment| {
        let mut outer = Map::new();
        outer.insert(segment.to_string(), inner);
        Value::Object(outer)
    })
}

impl PolicyEvaluator for RegoPolicy {
    fn evaluate(&self, query: &str, input: &PolicyInput) -> Result<Vec<ResultSet>, PolicyError> {
        let input = serde_json::to_string(input)
            .map_err(|e| PolicyError::Evaluation(format!("failed to encode input: {e}")))?;
        let input = regorus::Value::from_json_str(&input)
            .map_err(|e| PolicyError::Evaluation(format!("failed to encode input: {e}")))?;

        // The compiled engine is shared; each evaluation works on its own copy.
        let mut engine = self.engine.clone();
        engine.set_input(input);

        let results = engine
            .eval_query(query.to_string(), false)
            .map_err(|e| PolicyError::Evaluation(e.to_string()))?;

        results
            .result
            .into_iter()
            .map(|set| {
                let expressions = set
                    .expressions
                    .into_iter()
                    .map(|expr| serde_json::to_value(&expr.value))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| PolicyError::Evaluation(format!("failed to decode result: {e}")))?;
                Ok(ResultSet { expressions })
            })
            .collect()
    }
}
