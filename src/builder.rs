//! Envelope construction.
//!
//! A [`ResponseBuilder`] is configured once and then builds envelopes through
//! [`ResponseBuilder::make`] (fresh response for a status code) and
//! [`ResponseBuilder::forward`] (relay of an already-built message). Both merge
//! four layers in order, last writer wins per key:
//!
//! 1. the response template
//! 2. the status descriptor (`make`) or the relayed message (`forward`)
//! 3. the call arguments
//! 4. `{context: <builder context>}`
//!
//! The merged `status.code` must be in the status table. Validation happens
//! before any sink write, so a failed call never logs.

use crate::adapter::FileSinkFactory;
use crate::config::{BuilderConfig, json_type_name};
use crate::domain::envelope::{CONTEXT_KEY, ERROR_KEY, HTTP_KEY, STATUS_KEY};
use crate::domain::merge::merge_layers;
use crate::domain::{Envelope, HttpSummary, SeverityTier, StatusDescriptor, status};
use crate::error::EnvelopeError;
use crate::port::{LogRecord, LogSink, SinkFactory, SinkLevel};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

const DEBUG_DESCRIPTION: &str = "debug response";

pub struct ResponseBuilder {
    config: BuilderConfig,
    context_layer: Map<String, Value>,
    info_sink: Arc<dyn LogSink>,
    error_sink: Arc<dyn LogSink>,
    debug_sink: Arc<dyn LogSink>,
}

impl ResponseBuilder {
    /// Builds with rotating file sinks under `config.log_path`, creating the directory if needed.
    pub fn new(config: BuilderConfig) -> Result<Self, EnvelopeError> {
        config.validate()?;
        let factory = FileSinkFactory::new(&config.log_path)?;
        Self::with_sink_factory(config, &factory)
    }

    /// Builds with sinks obtained from `factory`. No filesystem work happens here.
    pub fn with_sink_factory<F>(config: BuilderConfig, factory: &F) -> Result<Self, EnvelopeError>
    where
        F: SinkFactory + ?Sized,
    {
        config.validate()?;
        let info_sink = factory.sink(&config.context, SinkLevel::Info)?;
        let error_sink = factory.sink(&config.context, SinkLevel::Error)?;
        let debug_sink = factory.sink(&config.context, SinkLevel::Debug)?;

        let mut context_layer = Map::new();
        context_layer.insert(CONTEXT_KEY.to_string(), Value::String(config.context.clone()));

        info!(
            context = %config.context,
            debug = config.debug,
            log_info = config.log_info,
            log_client_errors = config.log_client_errors,
            log_internal_errors = config.log_internal_errors,
            "Response builder ready"
        );

        Ok(Self {
            config,
            context_layer,
            info_sink,
            error_sink,
            debug_sink,
        })
    }

    #[must_use]
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Builds a new envelope for `code`.
    ///
    /// # Errors
    /// [`EnvelopeError::InvalidCodeType`] when `code` (or the merged `status.code`)
    /// is not a number, [`EnvelopeError::UnknownStatusCode`] when it is not in the table.
    pub fn make(
        &self,
        code: impl Into<Value>,
        args: &Map<String, Value>,
    ) -> Result<Envelope, EnvelopeError> {
        let code: Value = code.into();
        let descriptor = descriptor_for(Some(&code))?;
        let mut status_layer = Map::new();
        status_layer.insert(STATUS_KEY.to_string(), serde_json::to_value(descriptor)?);

        let (envelope, code) = self.assemble(&status_layer, args)?;
        self.dispatch(&envelope, code);
        Ok(envelope)
    }

    /// Relays `message`, redacting `error` on server errors and replacing
    /// `status` with an `http$` summary dated now.
    ///
    /// # Errors
    /// Same validation as [`ResponseBuilder::make`], applied to the merged `status.code`.
    pub fn forward(
        &self,
        message: &Map<String, Value>,
        args: &Map<String, Value>,
    ) -> Result<Envelope, EnvelopeError> {
        self.forward_at(message, args, Utc::now())
    }

    /// [`ResponseBuilder::forward`] with an explicit `Date` header time.
    pub fn forward_at(
        &self,
        message: &Map<String, Value>,
        args: &Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<Envelope, EnvelopeError> {
        let (mut envelope, code) = self.assemble(message, args)?;
        let http = serde_json::to_value(HttpSummary::new(code, now))?;

        self.dispatch(&envelope, code);

        if SeverityTier::classify(code) == SeverityTier::ServerError
            && envelope.remove(ERROR_KEY).is_some()
        {
            debug!(code, "Redacted error detail from forwarded response");
        }
        envelope.remove(STATUS_KEY);
        envelope.insert(HTTP_KEY, http);
        Ok(envelope)
    }

    /// [`ResponseBuilder::make`], also handing the result to `hook` before returning it.
    pub fn make_with<F>(
        &self,
        code: impl Into<Value>,
        args: &Map<String, Value>,
        hook: F,
    ) -> Result<Envelope, EnvelopeError>
    where
        F: FnOnce(&Result<Envelope, EnvelopeError>),
    {
        let result = self.make(code, args);
        hook(&result);
        result
    }

    /// [`ResponseBuilder::forward`], also handing the result to `hook` before returning it.
    pub fn forward_with<F>(
        &self,
        message: &Map<String, Value>,
        args: &Map<String, Value>,
        hook: F,
    ) -> Result<Envelope, EnvelopeError>
    where
        F: FnOnce(&Result<Envelope, EnvelopeError>),
    {
        let result = self.forward(message, args);
        hook(&result);
        result
    }

    fn assemble(
        &self,
        middle: &Map<String, Value>,
        args: &Map<String, Value>,
    ) -> Result<(Envelope, u16), EnvelopeError> {
        let merged = merge_layers([
            &self.config.response_template,
            middle,
            args,
            &self.context_layer,
        ]);
        let envelope = Envelope::from_map(merged);
        let descriptor = descriptor_for(envelope.status_code_value())?;
        Ok((envelope, descriptor.code))
    }

    fn dispatch(&self, envelope: &Envelope, code: u16) {
        let tier = SeverityTier::classify(code);
        let (enabled, sink, level) = match tier {
            SeverityTier::Success => (self.config.log_info, &self.info_sink, SinkLevel::Info),
            SeverityTier::ClientError => {
                (self.config.log_client_errors, &self.info_sink, SinkLevel::Info)
            }
            SeverityTier::ServerError => {
                (self.config.log_internal_errors, &self.error_sink, SinkLevel::Error)
            }
        };

        if enabled {
            debug!(code, ?tier, %level, "Logging response");
            emit(sink.as_ref(), level, envelope, tier.description());
        }
        if self.config.debug {
            emit(
                self.debug_sink.as_ref(),
                SinkLevel::Debug,
                envelope,
                DEBUG_DESCRIPTION,
            );
        }
    }
}

fn emit(sink: &dyn LogSink, level: SinkLevel, envelope: &Envelope, description: &str) {
    let record = LogRecord {
        response: envelope,
        description,
    };
    if let Err(e) = sink.write(&record) {
        error!(%level, "Failed to write response to {level} sink: {e}");
    }
}

/// Resolves a raw code to its table entry.
fn descriptor_for(code: Option<&Value>) -> Result<&'static StatusDescriptor, EnvelopeError> {
    let number = match code {
        Some(Value::Number(n)) => n,
        Some(other) => {
            return Err(EnvelopeError::InvalidCodeType(
                json_type_name(other).to_string(),
            ));
        }
        None => return Err(EnvelopeError::InvalidCodeType("nothing".to_string())),
    };

    let integral = number.as_u64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u16::MAX))
            .map(|f| f as u64)
    });

    integral
        .and_then(|c| u16::try_from(c).ok())
        .and_then(status::lookup)
        .ok_or_else(|| EnvelopeError::UnknownStatusCode(number.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSinkFactory;
    use chrono::TimeZone;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    fn builder(config: BuilderConfig) -> (ResponseBuilder, RecordingSinkFactory) {
        let factory = RecordingSinkFactory::new();
        let builder = ResponseBuilder::with_sink_factory(config, &factory).unwrap();
        (builder, factory)
    }

    #[test]
    fn test_descriptor_for_number_kinds() {
        assert_eq!(descriptor_for(Some(&json!(200))).unwrap().code, 200);
        assert_eq!(descriptor_for(Some(&json!(404.0))).unwrap().code, 404);
        assert!(matches!(
            descriptor_for(Some(&json!(200.5))),
            Err(EnvelopeError::UnknownStatusCode(_))
        ));
        assert!(matches!(
            descriptor_for(Some(&json!(-200))),
            Err(EnvelopeError::UnknownStatusCode(_))
        ));
        assert!(matches!(
            descriptor_for(Some(&json!(70000))),
            Err(EnvelopeError::UnknownStatusCode(_))
        ));
    }

    #[test]
    fn test_descriptor_for_non_numbers() {
        for value in [json!("200"), json!(null), json!(true), json!([200]), json!({})] {
            assert!(matches!(
                descriptor_for(Some(&value)),
                Err(EnvelopeError::InvalidCodeType(_))
            ));
        }
        assert!(matches!(
            descriptor_for(None),
            Err(EnvelopeError::InvalidCodeType(_))
        ));
    }

    #[test]
    fn test_make_status_matches_table() {
        let (builder, _) = builder(BuilderConfig::default());
        for descriptor in status::all() {
            let envelope = builder.make(descriptor.code, &Map::new()).unwrap();
            assert_eq!(
                envelope.status(),
                Some(&serde_json::to_value(descriptor).unwrap())
            );
            assert_eq!(envelope.context(), Some(""));
        }
    }

    #[test]
    fn test_make_merge_precedence() {
        let config = BuilderConfig::default()
            .with_context("builder-ctx")
            .with_template(map(json!({"foo": 0, "bar": 2})));
        let (builder, _) = builder(config);

        let envelope = builder
            .make(200, &map(json!({"context": "x", "foo": 1})))
            .unwrap();

        assert_eq!(
            envelope.into_value(),
            json!({
                "status": {"code": 200, "message": "OK"},
                "context": "builder-ctx",
                "foo": 1,
                "bar": 2
            })
        );
    }

    #[test]
    fn test_make_args_deep_merge_into_status() {
        let (builder, _) = builder(BuilderConfig::default());
        let envelope = builder
            .make(200, &map(json!({"status": {"description": "All good."}})))
            .unwrap();
        assert_eq!(
            envelope.status(),
            Some(&json!({"code": 200, "message": "OK", "description": "All good."}))
        );
    }

    #[test]
    fn test_make_args_cannot_smuggle_unknown_code() {
        let (builder, factory) = builder(BuilderConfig {
            log_info: true,
            ..BuilderConfig::default()
        });
        let err = builder
            .make(200, &map(json!({"status": {"code": 299}})))
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::UnknownStatusCode(_)));
        assert!(factory.records().is_empty());
    }

    #[test]
    fn test_make_invalid_code_type_does_not_log() {
        let (builder, factory) = builder(BuilderConfig {
            debug: true,
            log_info: true,
            log_client_errors: true,
            ..BuilderConfig::default()
        });
        let err = builder.make("200", &Map::new()).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidCodeType(_)));
        assert!(factory.records().is_empty());
    }

    #[test]
    fn test_severity_gating() {
        let (quiet, quiet_sinks) = builder(BuilderConfig::default());
        quiet.make(404, &Map::new()).unwrap();
        quiet.make(200, &Map::new()).unwrap();
        assert!(quiet_sinks.records().is_empty());

        let (loud, loud_sinks) = builder(BuilderConfig {
            log_client_errors: true,
            ..BuilderConfig::default()
        });
        loud.make(404, &Map::new()).unwrap();
        let records = loud_sinks.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, SinkLevel::Info);
        assert_eq!(records[0].description, "client error response");
    }

    #[test]
    fn test_server_errors_logged_by_default() {
        let (builder, factory) = builder(BuilderConfig::default());
        builder.make(503, &Map::new()).unwrap();
        let records = factory.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, SinkLevel::Error);
        assert_eq!(records[0].response.status_code_value(), Some(&json!(503)));
    }

    #[test]
    fn test_debug_mirrors_every_envelope() {
        let (builder, factory) = builder(BuilderConfig {
            debug: true,
            log_internal_errors: false,
            ..BuilderConfig::default()
        });
        builder.make(200, &Map::new()).unwrap();
        builder.make(500, &Map::new()).unwrap();
        assert_eq!(factory.records_at(SinkLevel::Debug).len(), 2);
        assert!(factory.records_at(SinkLevel::Error).is_empty());
        assert!(factory.records_at(SinkLevel::Info).is_empty());
    }

    #[test]
    fn test_forward_redacts_server_error_detail() {
        let (builder, _) = builder(BuilderConfig::default().with_context("relay"));
        let message = map(json!({
            "status": {"code": 500, "message": "Internal Server Error"},
            "error": "stack trace",
            "requestId": "r-1"
        }));
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();

        let envelope = builder.forward_at(&message, &Map::new(), now).unwrap();

        assert_eq!(
            envelope.into_value(),
            json!({
                "http$": {
                    "status": 500,
                    "headers": {
                        "date": "Fri, 10 Jan 2025 12:00:00 GMT",
                        "content-type": "application/json"
                    }
                },
                "context": "relay",
                "requestId": "r-1"
            })
        );
    }

    #[test]
    fn test_forward_keeps_client_error_detail() {
        let (builder, _) = builder(BuilderConfig::default());
        let message = map(json!({"status": {"code": 400}, "error": "missing id"}));

        let envelope = builder.forward(&message, &Map::new()).unwrap();

        assert_eq!(envelope.get("error"), Some(&json!("missing id")));
        assert!(envelope.status().is_none());
        assert_eq!(envelope.http().map(|h| h.status), Some(400));
    }

    #[test]
    fn test_forward_logs_before_redaction() {
        let (builder, factory) = builder(BuilderConfig::default());
        let message = map(json!({"status": {"code": 500}, "error": "db down"}));

        builder.forward(&message, &Map::new()).unwrap();

        let records = factory.records_at(SinkLevel::Error);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].response.get("error"), Some(&json!("db down")));
    }

    #[test]
    fn test_forward_args_override_message() {
        let (builder, _) = builder(BuilderConfig::default());
        let message = map(json!({"status": {"code": 200}, "page": 1}));

        let envelope = builder
            .forward(&message, &map(json!({"page": 2})))
            .unwrap();

        assert_eq!(envelope.get("page"), Some(&json!(2)));
    }

    #[test]
    fn test_forward_requires_status() {
        let (builder, factory) = builder(BuilderConfig {
            debug: true,
            ..BuilderConfig::default()
        });
        let err = builder
            .forward(&map(json!({"data": 1})), &Map::new())
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidCodeType(_)));

        let err = builder
            .forward(&map(json!({"status": {"code": 302}})), &Map::new())
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::UnknownStatusCode(_)));
        assert!(factory.records().is_empty());
    }

    #[test]
    fn test_hooks_see_returned_result() {
        let (builder, _) = builder(BuilderConfig::default());

        let mut seen = None;
        let result = builder.make_with(201, &Map::new(), |r| {
            seen = Some(r.as_ref().map(Clone::clone).map_err(ToString::to_string));
        });
        assert_eq!(seen, Some(Ok(result.unwrap())));

        let mut failed = false;
        let result = builder.forward_with(&Map::new(), &Map::new(), |r| failed = r.is_err());
        assert!(failed);
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResponseBuilder>();
    }
}
