use crate::error::EnvelopeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

pub const DEFAULT_LOG_PATH: &str = "logs/";

/// Builder-wide settings. Handed to a `ResponseBuilder` once and never mutated there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Tag attached to every envelope; always overrides caller-supplied `context`.
    pub context: String,
    /// Directory for the rotating log files.
    pub log_path: PathBuf,
    /// Mirror every envelope to the debug sink.
    pub debug: bool,
    pub log_info: bool,
    pub log_client_errors: bool,
    pub log_internal_errors: bool,
    /// Lowest-precedence fields merged into every envelope.
    pub response_template: Map<String, Value>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            context: String::new(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            debug: false,
            log_info: false,
            log_client_errors: false,
            log_internal_errors: true,
            response_template: Map::new(),
        }
    }
}

impl BuilderConfig {
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    #[must_use]
    pub fn with_log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = log_path.into();
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: Map<String, Value>) -> Self {
        self.response_template = template;
        self
    }

    /// Validates the settings and returns an error if invalid.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        validate_log_path(&self.log_path)?;
        Ok(())
    }
}

fn validate_log_path(path: &std::path::Path) -> Result<(), EnvelopeError> {
    if path.as_os_str().is_empty() {
        return Err(EnvelopeError::Config("Log path cannot be empty".into()));
    }
    Ok(())
}

/// Parses a response template; only a JSON object is accepted.
pub fn parse_template(raw: &str) -> Result<Map<String, Value>, EnvelopeError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(EnvelopeError::Config(format!(
            "Response template must be a JSON object, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(EnvelopeError::Config(format!(
            "Response template is not valid JSON: {e}"
        ))),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
