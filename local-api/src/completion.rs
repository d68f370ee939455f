use crate::error::RouterError;
use crate::logging::{log_failure, log_success, Logger};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// The outcome a router reports on success: `{ headers?, statusCode?, body? }`.
/// Any field may be left out, `null` counts as left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// The response that is logged and sent, with all defaults applied.
/// The field order is the order of the logged JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedResponse {
    pub headers: Map<String, Value>,
    pub status_code: u16,
    pub body: Value,
}

impl ResolvedResponse {
    /// Missing headers default to `{}`, status code to 200 and body to `{}`.
    pub fn from_result(result: CompletionResult) -> Self {
        Self {
            headers: result.headers.unwrap_or_default(),
            status_code: result.status_code.unwrap_or(200),
            body: result.body.unwrap_or_else(|| Value::Object(Map::new())),
        }
    }

    /// Always a 500 with no headers and the error message as the only field of the body.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            headers: Map::new(),
            status_code: 500,
            body: json!({ "message": error.to_string() }),
        }
    }
}

/// The HTTP response a completion writes to.
/// The completion calls `set`, `status` and `send` exactly once each, in that order.
pub trait NativeResponse: Send {
    fn set(&mut self, headers: &Map<String, Value>);
    fn status(&mut self, status_code: u16);
    fn send(self: Box<Self>, body: &Value);
}

/// A one-shot completion bound to the response of a single request.
pub struct Completion {
    logger: Arc<dyn Logger>,
    response: Box<dyn NativeResponse>,
}

/// Binds a completion to the logger and the response it will write to.
pub fn make_completion(logger: Arc<dyn Logger>, response: Box<dyn NativeResponse>) -> Completion {
    Completion { logger, response }
}

impl Completion {
    /// Resolves the outcome, logs it and emits the response.
    /// Takes `self` so a second call cannot be made.
    pub fn complete(self, outcome: Result<CompletionResult, RouterError>) {
        let resolved = match outcome {
            Err(error) => {
                let resolved = ResolvedResponse::from_error(&*error);
                log_failure(&*self.logger, &*error);
                resolved
            }
            Ok(result) => {
                let resolved = ResolvedResponse::from_result(result);
                log_success(&*self.logger, &resolved);
                resolved
            }
        };

        let mut response = self.response;
        response.set(&resolved.headers);
        response.status(resolved.status_code);
        response.send(&resolved.body);
    }
}

/// Handed to the router along with the event.
/// The router must call `done` (or one of its shortcuts) exactly once.
pub struct ControlFlow {
    done: Completion,
}

impl ControlFlow {
    pub fn new(done: Completion) -> Self {
        Self { done }
    }

    pub fn done(self, outcome: Result<CompletionResult, RouterError>) {
        self.done.complete(outcome);
    }

    /// Shortcut for `done(Ok(result))`
    pub fn succeed(self, result: CompletionResult) {
        self.done(Ok(result));
    }

    /// Shortcut for `done(Err(error))`
    pub fn fail<E: Into<RouterError>>(self, error: E) {
        self.done(Err(error.into()));
    }
}
