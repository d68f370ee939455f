use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// An error reported by a router through `ControlFlow::done`.
/// Its `Display` text becomes the `message` of the 500 response.
pub type RouterError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that prevent the bridge from starting.
/// Request-scoped failures never end up here, they are turned into HTTP responses.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot start the API module {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The error payload a function posts to `/runtime/invocation/{id}/error`.
/// See https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html#runtimes-api-invokeerror
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionError {
    #[serde(default)]
    pub error_type: String,
    #[serde(default)]
    pub error_message: String,
    /// The Node.js runtime calls it `trace`, the docs call it `stackTrace`
    #[serde(default, alias = "trace")]
    pub stack_trace: Vec<String>,
}

impl FunctionError {
    /// The error type, message and stack frames as a single multi-line string.
    pub fn trace(&self) -> String {
        let mut trace = if self.error_type.is_empty() {
            self.error_message.clone()
        } else {
            [&self.error_type, ": ", &self.error_message].concat()
        };

        for frame in &self.stack_trace {
            trace.push_str("\n    ");
            trace.push_str(frame.trim());
        }

        trace
    }
}

impl fmt::Display for FunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error_message)
    }
}

impl std::error::Error for FunctionError {}
