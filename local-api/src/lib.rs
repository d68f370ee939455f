//! Runs API Gateway proxy handlers on a local HTTP server.
//!
//! Every HTTP request is translated into a proxy [`Event`] and handed to a [`Router`] along with a
//! one-shot [`ControlFlow`]. Whatever the router completes it with becomes the HTTP response:
//! missing fields default to `{}` / 200 / `{}` and errors become a 500 with `{"message": ...}`.
//!
//! The router used by the `local-api` binary is a [`FunctionRouter`]: a function executable
//! built with `lambda_runtime` that fetches its invocations from a local Lambda Runtime API.

pub mod bootstrap;
pub mod completion;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
mod handlers;
pub mod logging;
pub mod router;
pub mod runtime_api;
pub mod server;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use bootstrap::bootstrap;
pub use completion::{make_completion, Completion, CompletionResult, ControlFlow, NativeResponse, ResolvedResponse};
pub use config::{get_default_config, DefaultConfig, Options};
pub use error::{BridgeError, FunctionError, RouterError};
pub use event::{to_event, Event, NativeRequest, RequestContext};
pub use handler::{make_request_handler, RequestHandler};
pub use logging::{log_failure, log_success, Logger, TracingLogger};
pub use router::Router;
pub use runtime_api::FunctionRouter;
pub use server::{HttpServer, HyperServer, RunningServer};
