use crate::completion::{make_completion, ControlFlow, NativeResponse};
use crate::event::{to_event, NativeRequest};
use crate::logging::Logger;
use crate::router::Router;
use std::sync::Arc;

/// Handles a single request. Returns as soon as the router has been invoked,
/// the response is written when the router completes.
pub type RequestHandler = Arc<dyn Fn(NativeRequest, Box<dyn NativeResponse>) + Send + Sync>;

/// Binds a request handler to the logger and the router shared by all requests.
pub fn make_request_handler(logger: Arc<dyn Logger>, router: Arc<dyn Router>) -> RequestHandler {
    Arc::new(move |request, response| {
        let event = to_event(&request);
        let control_flow = ControlFlow::new(make_completion(logger.clone(), response));
        router.route(event, control_flow);
    })
}
