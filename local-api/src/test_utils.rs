//! Test doubles shared by the unit and integration tests.
//! Built for `cfg(test)` and with the `test-utils` feature.
use crate::completion::NativeResponse;
use crate::logging::Logger;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

/// Keeps every message so tests can check what was logged and how many times.
#[derive(Default)]
pub struct RecordingLogger {
    infos: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_owned());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_owned());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseCall {
    Set(Map<String, Value>),
    Status(u16),
    Send(Value),
}

/// Records the calls made against a native response, in order.
#[derive(Clone, Default)]
pub struct RecordingResponse {
    calls: Arc<Mutex<Vec<ResponseCall>>>,
}

impl RecordingResponse {
    pub fn calls(&self) -> Vec<ResponseCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl NativeResponse for RecordingResponse {
    fn set(&mut self, headers: &Map<String, Value>) {
        self.calls.lock().unwrap().push(ResponseCall::Set(headers.clone()));
    }

    fn status(&mut self, status_code: u16) {
        self.calls.lock().unwrap().push(ResponseCall::Status(status_code));
    }

    fn send(self: Box<Self>, body: &Value) {
        self.calls.lock().unwrap().push(ResponseCall::Send(body.clone()));
    }
}
