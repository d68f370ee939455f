use super::{full, status_only};
use crate::runtime_api::{RuntimeState, FUNCTION_EXITED};
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::Error;
use hyper::{Response, StatusCode};
use tracing::{debug, warn};

/// Far enough in the future for a debugging session, 2034
const DEADLINE_MS: &str = "2035313041000";

const TRACE_ID: &str = "Root=0-00000000-000000000000000000000000;Parent=0000000000000000;Sampled=0;Lineage=00000000:0";

/// Handles _next invocation_ request from the function.
/// It waits indefinitely for the next HTTP request to arrive and passes its event onto the function.
/// See https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html#runtimes-api-next
pub(crate) async fn handler(state: &RuntimeState) -> Response<BoxBody<Bytes, Error>> {
    // the function handles one invocation at a time, asking for the next one means
    // it is not going to answer the previous one
    state.abandon_in_flight("The function moved on to the next invocation without answering this one");

    // this call will block until a request is routed
    let (request_id, payload) = loop {
        let invocation = match state.next_invocation().await {
            Some(v) => v,
            None => {
                warn!("No more invocations: the router has been shut down");
                return status_only(StatusCode::SERVICE_UNAVAILABLE);
            }
        };

        // a poll left over from a function that is gone
        if state.has_exited() {
            invocation.control_flow.fail(FUNCTION_EXITED);
            continue;
        }

        match serde_json::to_string(&invocation.event) {
            Ok(payload) => {
                state.start(invocation.request_id.clone(), invocation.control_flow);
                break (invocation.request_id, payload);
            }
            Err(e) => invocation.control_flow.fail(e),
        }
    };

    debug!("Invocation {request_id}:\n{payload}");

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .header("lambda-runtime-aws-request-id", &request_id)
        .header("lambda-runtime-deadline-ms", DEADLINE_MS)
        .header("lambda-runtime-invoked-function-arn", &state.function_arn)
        .header("lambda-runtime-trace-id", TRACE_ID)
        .body(full(payload))
        .expect("Failed to create a response")
}
