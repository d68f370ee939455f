use crate::error::FunctionError;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::error::Error;
use std::str::FromStr;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// The two sinks the bridge reports request outcomes to.
/// Anything implementing it can be injected, e.g. a test double that records the messages.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// The process-wide logger. Forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Logs the payload as JSON with 4-space indentation to the info sink.
pub fn log_success<T: Serialize + ?Sized>(logger: &dyn Logger, payload: &T) {
    logger.info(&to_pretty_json(payload));
}

/// Logs the full diagnostic trace of the error to the error sink.
pub fn log_failure(logger: &dyn Logger, error: &(dyn Error + 'static)) {
    logger.error(&diagnostic_trace(error));
}

/// The error message followed by the stack frames of a function error, if any,
/// and every error in the `source()` chain.
pub fn diagnostic_trace(error: &(dyn Error + 'static)) -> String {
    let mut trace = match error.downcast_ref::<FunctionError>() {
        Some(function_error) => function_error.trace(),
        None => error.to_string(),
    };

    let mut source = error.source();
    while let Some(cause) = source {
        trace.push_str("\nCaused by: ");
        trace.push_str(&cause.to_string());
        source = cause.source();
    }

    trace
}

pub(crate) fn to_pretty_json<T: Serialize + ?Sized>(payload: &T) -> String {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));

    match payload.serialize(&mut serializer) {
        // serde_json only ever writes valid UTF-8
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(e) => format!("<payload cannot be serialized: {e}>"),
    }
}

/// Initializes the tracing from RUST_LOG env var if present or sets minimal logging:
/// - INFO for the bridge
/// - ERROR for everything else
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(
                    Directive::from_str(&[env!("CARGO_CRATE_NAME"), "=info"].concat())
                        .expect("Invalid logging filter. It's a bug."),
                )
                .from_env_lossy(),
        )
        .with_ansi(true)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingLogger;
    use serde_json::json;

    #[test]
    fn log_success_pretty_prints_with_four_spaces() {
        let logger = RecordingLogger::default();
        let payload = json!({
            "a": {
                "b": {
                    "c": [1, 2, 3],
                    "d": 42
                }
            },
            "e": 42
        });

        log_success(&logger, &payload);

        let expected = r#"{
    "a": {
        "b": {
            "c": [
                1,
                2,
                3
            ],
            "d": 42
        }
    },
    "e": 42
}"#;
        assert_eq!(logger.infos(), vec![expected.to_string()]);
        assert!(logger.errors().is_empty());
    }

    #[test]
    fn log_success_keeps_key_order() {
        let logger = RecordingLogger::default();
        log_success(&logger, &json!({"z": 1, "a": 2}));

        assert_eq!(logger.infos(), vec!["{\n    \"z\": 1,\n    \"a\": 2\n}".to_string()]);
    }

    #[test]
    fn log_failure_includes_function_stack() {
        let logger = RecordingLogger::default();
        let error = FunctionError {
            error_type: "Error".into(),
            error_message: "Fail!".into(),
            stack_trace: vec!["at handler (/var/task/index.js:10:11)".into()],
        };

        log_failure(&logger, &error);

        assert_eq!(
            logger.errors(),
            vec!["Error: Fail!\n    at handler (/var/task/index.js:10:11)".to_string()]
        );
        assert!(logger.infos().is_empty());
    }

    #[test]
    fn log_failure_walks_the_source_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("Fail!")]
        struct Outer(#[source] std::io::Error);

        let logger = RecordingLogger::default();
        let error = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"));

        log_failure(&logger, &error);

        assert_eq!(logger.errors(), vec!["Fail!\nCaused by: disk on fire".to_string()]);
    }
}
