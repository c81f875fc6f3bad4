use crate::config::{BuilderConfig, DEFAULT_LOG_PATH, parse_template};
use crate::error::EnvelopeError;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Build and forward response envelopes", long_about = None)]
pub struct Cli {
    /// Context tag attached to every envelope
    #[arg(long, env = "ENVELOPE_CONTEXT", default_value = "")]
    pub context: String,

    /// Directory for rotating log files
    #[arg(long, env = "ENVELOPE_LOG_PATH", default_value = DEFAULT_LOG_PATH)]
    pub log_path: PathBuf,

    /// Mirror every envelope to the debug log
    #[arg(long, env = "ENVELOPE_DEBUG")]
    pub debug: bool,

    /// Log 1xx-3xx responses
    #[arg(long, env = "ENVELOPE_LOG_INFO")]
    pub log_info: bool,

    /// Log 4xx responses
    #[arg(long, env = "ENVELOPE_LOG_CLIENT_ERRORS")]
    pub log_client_errors: bool,

    /// Do not log 5xx responses
    #[arg(long, env = "ENVELOPE_NO_LOG_INTERNAL_ERRORS")]
    pub no_log_internal_errors: bool,

    /// JSON object merged into every envelope at lowest precedence
    #[arg(long, env = "ENVELOPE_TEMPLATE")]
    pub template: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build a new envelope for a status code
    Make {
        /// Status code, as JSON (`404`, or `"404"` to see the type check fail)
        code: String,
        /// JSON object of call-specific fields
        args: Option<String>,
    },
    /// Relay an already-built message as an HTTP-ready envelope
    Forward {
        /// JSON object carrying a `status` field
        message: String,
        /// JSON object of call-specific fields
        args: Option<String>,
    },
    /// Print the status table
    Codes,
}

impl Cli {
    pub fn builder_config(&self) -> Result<BuilderConfig, EnvelopeError> {
        let response_template = match &self.template {
            Some(raw) => parse_template(raw)?,
            None => Map::new(),
        };
        let config = BuilderConfig {
            context: self.context.clone(),
            log_path: self.log_path.clone(),
            debug: self.debug,
            log_info: self.log_info,
            log_client_errors: self.log_client_errors,
            log_internal_errors: !self.no_log_internal_errors,
            response_template,
        };
        config.validate()?;
        Ok(config)
    }
}

/// A code argument is parsed as JSON; anything that is not JSON is taken as a string.
pub fn parse_code(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Parses an optional JSON object argument; absent means empty.
pub fn parse_object(name: &str, raw: Option<&str>) -> Result<Map<String, Value>, EnvelopeError> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(EnvelopeError::Config(format!("{name} must be a JSON object"))),
        Err(e) => Err(EnvelopeError::Config(format!("{name} is not valid JSON: {e}"))),
    }
}
