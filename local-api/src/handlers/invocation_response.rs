use super::status_only;
use crate::completion::CompletionResult;
use crate::runtime_api::RuntimeState;
use http_body_util::{combinators::BoxBody, BodyExt};
use hyper::body::{Bytes, Incoming};
use hyper::Error;
use hyper::{Request, Response, StatusCode};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Contains compiled regex for extracting the request ID from the URL.
static RESPONSE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Handles an invocation response from the function when it successfully completed processing.
/// The response is expected to be an API Gateway proxy result and completes the original HTTP request.
/// See https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html#runtimes-api-response
pub(crate) async fn handler(state: &RuntimeState, req: Request<Incoming>) -> Response<BoxBody<Bytes, Error>> {
    // e.g. /2018-06-01/runtime/invocation/8476a536-e9f4-11e8-9739-2dfe598c3fcd/response
    let regex = RESPONSE_REGEX.get_or_init(|| {
        Regex::new(r"/runtime/invocation/(.+)/response$").expect("Invalid response URL regex. It's a bug.")
    });
    let request_id = match regex.captures(req.uri().path()).and_then(|c| c.get(1)) {
        Some(v) => v.as_str().to_owned(),
        None => {
            warn!("Request URL does not conform to /runtime/invocation/AwsRequestId/response: {}", req.uri());
            return status_only(StatusCode::BAD_REQUEST);
        }
    };

    // convert the function response to bytes
    let response = match req.into_body().collect().await {
        Ok(v) => v.to_bytes(),
        Err(e) => {
            warn!("Failed to read the function response for {request_id}: {e}");
            return status_only(StatusCode::BAD_REQUEST);
        }
    };

    let control_flow = match state.finish(&request_id) {
        Some(v) => v,
        None => {
            warn!("Response for an unknown or completed invocation: {request_id}");
            return status_only(StatusCode::BAD_REQUEST);
        }
    };

    match parse_function_result(&response) {
        Ok(result) => {
            debug!("Invocation {request_id} completed");
            control_flow.succeed(result);
        }
        Err(e) => {
            match std::str::from_utf8(&response) {
                Ok(v) => warn!("Function response is not a proxy result: {e}\n{v}"),
                Err(_) => warn!(
                    "Non-UTF-8 response from the function. {e}\n{}",
                    hex::encode(response.as_ref())
                ),
            }
            control_flow.fail(format!("Invalid function response: {e}"));
        }
    }

    status_only(StatusCode::ACCEPTED)
}

/// An empty body or `null` is a result with nothing set, i.e. all defaults.
/// Anything else has to be a proxy result object.
fn parse_function_result(response: &[u8]) -> Result<CompletionResult, serde_json::Error> {
    if response.iter().all(u8::is_ascii_whitespace) {
        return Ok(CompletionResult::default());
    }

    Ok(serde_json::from_slice::<Option<CompletionResult>>(response)?.unwrap_or_default())
}
