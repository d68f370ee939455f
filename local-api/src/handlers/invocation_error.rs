use super::status_only;
use crate::error::FunctionError;
use crate::runtime_api::RuntimeState;
use http_body_util::{combinators::BoxBody, BodyExt};
use hyper::body::{Bytes, Incoming};
use hyper::Error;
use hyper::{Request, Response, StatusCode};
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

/// Contains compiled regex for extracting the request ID from the URL.
static ERROR_REGEX: OnceLock<Regex> = OnceLock::new();

/// Handles an invocation error reported by the function and completes the original HTTP request with it.
/// See https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html#runtimes-api-invokeerror
pub(crate) async fn handler(state: &RuntimeState, req: Request<Incoming>) -> Response<BoxBody<Bytes, Error>> {
    let regex = ERROR_REGEX.get_or_init(|| {
        Regex::new(r"/runtime/invocation/(.+)/error$").expect("Invalid error URL regex. It's a bug.")
    });
    let request_id = match regex.captures(req.uri().path()).and_then(|c| c.get(1)) {
        Some(v) => v.as_str().to_owned(),
        None => {
            warn!("Request URL does not conform to /runtime/invocation/AwsRequestId/error: {}", req.uri());
            return status_only(StatusCode::BAD_REQUEST);
        }
    };

    let resp = match req.into_body().collect().await {
        Ok(v) => v.to_bytes(),
        Err(e) => {
            warn!("Failed to read the function error for {request_id}: {e}");
            return status_only(StatusCode::BAD_REQUEST);
        }
    };

    let control_flow = match state.finish(&request_id) {
        Some(v) => v,
        None => {
            warn!("Error for an unknown or completed invocation: {request_id}");
            return status_only(StatusCode::BAD_REQUEST);
        }
    };

    control_flow.fail(parse_function_error(&resp));

    status_only(StatusCode::ACCEPTED)
}

/// Anything that is not the documented error JSON is taken as the error message.
fn parse_function_error(resp: &[u8]) -> FunctionError {
    match serde_json::from_slice::<FunctionError>(resp) {
        Ok(v) => v,
        Err(_) => FunctionError {
            error_type: "Unhandled".to_owned(),
            error_message: String::from_utf8_lossy(resp).into_owned(),
            stack_trace: Vec::new(),
        },
    }
}
