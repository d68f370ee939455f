use crate::completion::ControlFlow;
use crate::error::BridgeError;
use crate::event::Event;
use crate::handlers;
use crate::router::Router;
use crate::server::spawn_accept_loop;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::{Method, Request, Response, StatusCode};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpListener;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// An event waiting to be picked up by the function.
pub(crate) struct Invocation {
    pub request_id: String,
    pub event: Event,
    pub control_flow: ControlFlow,
}

/// State shared by the Runtime API handlers.
pub(crate) struct RuntimeState {
    /// There is only one consumer, the function polling `/invocation/next`
    queue: tokio::sync::Mutex<mpsc::UnboundedReceiver<Invocation>>,
    /// Invocations handed to the function and not answered yet, by request ID
    in_flight: Mutex<HashMap<String, ControlFlow>>,
    /// Set once the function process is gone, nothing queued after that can be answered
    exited: AtomicBool,
    /// E.g. arn:aws:lambda:us-east-1:000000000000:function:local-api
    pub function_arn: String,
}

/// Error message for requests the exited function can no longer answer.
pub(crate) const FUNCTION_EXITED: &str = "The function exited before answering the request";

impl RuntimeState {
    pub(crate) fn new(queue: mpsc::UnboundedReceiver<Invocation>, function_name: &str) -> Self {
        Self {
            queue: tokio::sync::Mutex::new(queue),
            in_flight: Mutex::new(HashMap::new()),
            exited: AtomicBool::new(false),
            function_arn: ["arn:aws:lambda:us-east-1:000000000000:function:", function_name].concat(),
        }
    }

    /// Waits for the next invocation. Returns None once the router is gone.
    pub(crate) async fn next_invocation(&self) -> Option<Invocation> {
        self.queue.lock().await.recv().await
    }

    /// Remembers the control flow until the function responds to the invocation.
    pub(crate) fn start(&self, request_id: String, control_flow: ControlFlow) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_id, control_flow);
    }

    /// Removes the invocation so it cannot be completed twice.
    pub(crate) fn finish(&self, request_id: &str) -> Option<ControlFlow> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(request_id)
    }

    /// Fails every invocation handed to the function and not answered yet.
    pub(crate) fn abandon_in_flight(&self, reason: &str) {
        // the lock is released before the completions run
        let abandoned: Vec<(String, ControlFlow)> = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        for (request_id, control_flow) in abandoned {
            warn!("Invocation {request_id} abandoned: {reason}");
            control_flow.fail(reason.to_owned());
        }
    }

    pub(crate) fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Fails everything in flight or queued once the function process is gone.
    pub(crate) fn function_exited(&self) {
        self.exited.store(true, Ordering::SeqCst);
        self.abandon_in_flight(FUNCTION_EXITED);
        self.fail_queued();
    }

    /// Invocations queued behind a stale `/invocation/next` poll are failed by that poll instead.
    fn fail_queued(&self) {
        if let Ok(mut queue) = self.queue.try_lock() {
            while let Ok(invocation) = queue.try_recv() {
                debug!("Invocation {} dropped: {FUNCTION_EXITED}", invocation.request_id);
                invocation.control_flow.fail(FUNCTION_EXITED);
            }
        }
    }
}

/// A router backed by a function executable that talks to us over the Lambda Runtime API,
/// e.g. anything built with `lambda_runtime`.
///
/// Each routed event is queued and handed to the function when it asks for the next invocation.
/// The function's response or error completes the request.
pub struct FunctionRouter {
    queue: mpsc::UnboundedSender<Invocation>,
    state: Arc<RuntimeState>,
    runtime_api: SocketAddr,
    function_name: String,
    // the accept loop stops when this is dropped
    _shutdown: oneshot::Sender<()>,
}

impl FunctionRouter {
    /// Starts serving the Runtime API on `addr`.
    pub async fn listen(addr: SocketAddr, function_name: &str) -> Result<Self, BridgeError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| BridgeError::Bind { addr, source })?;
        let runtime_api = listener.local_addr()?;

        let (queue, queue_rx) = mpsc::unbounded_channel();
        let state = Arc::new(RuntimeState::new(queue_rx, function_name));

        let (shutdown, shutdown_rx) = oneshot::channel();
        let handler_state = state.clone();
        spawn_accept_loop(listener, shutdown_rx, move |req| {
            runtime_api_handler(handler_state.clone(), req)
        });

        debug!("Runtime API listening on {runtime_api}");

        Ok(Self {
            queue,
            state,
            runtime_api,
            function_name: function_name.to_owned(),
            _shutdown: shutdown,
        })
    }

    /// The address to put into AWS_LAMBDA_RUNTIME_API.
    pub fn runtime_api(&self) -> SocketAddr {
        self.runtime_api
    }

    /// Starts the function executable pointed at this Runtime API.
    /// The process is killed when the bridge exits.
    /// If it exits first, every request waiting on it gets a 500.
    pub fn spawn_function(&self, path: &Path) -> Result<(), BridgeError> {
        let mut child = Command::new(path)
            .env("AWS_LAMBDA_RUNTIME_API", self.runtime_api.to_string())
            .env("AWS_LAMBDA_FUNCTION_NAME", &self.function_name)
            .env("AWS_LAMBDA_FUNCTION_VERSION", "$LATEST")
            .env("AWS_LAMBDA_FUNCTION_MEMORY_SIZE", "128")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                path: path.to_owned(),
                source,
            })?;

        info!("Started {} with Runtime API at {}", path.display(), self.runtime_api);

        let path = path.to_owned();
        let state = self.state.clone();
        tokio::task::spawn(async move {
            match child.wait().await {
                Ok(status) => warn!("{} exited: {status}", path.display()),
                Err(e) => error!("Failed to wait for {}: {e}", path.display()),
            }
            state.function_exited();
        });

        Ok(())
    }
}

impl Router for FunctionRouter {
    fn route(&self, event: Event, control_flow: ControlFlow) {
        if self.state.has_exited() {
            control_flow.fail(FUNCTION_EXITED);
            return;
        }

        let invocation = Invocation {
            request_id: Uuid::new_v4().to_string(),
            event,
            control_flow,
        };

        debug!("Queued invocation {}", invocation.request_id);

        if let Err(mpsc::error::SendError(invocation)) = self.queue.send(invocation) {
            invocation.control_flow.fail("The function runtime is not running");
            return;
        }

        // the function may have exited after the check above
        if self.state.has_exited() {
            self.state.fail_queued();
        }
    }
}

/// The handler function converted into a Tower service to run in the background
/// and serve the incoming HTTP requests from the function.
async fn runtime_api_handler(
    state: Arc<RuntimeState>,
    req: Request<Incoming>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, hyper::Error> {
    debug!("Runtime API request: {} {}", req.method(), req.uri());

    if req.method() == Method::GET && req.uri().path().ends_with("/invocation/next") {
        return Ok(handlers::next_invocation::handler(&state).await);
    }

    if req.method() != Method::POST {
        warn!("Unexpected Runtime API request: {} {}", req.method(), req.uri());
        return Ok(handlers::status_only(StatusCode::NOT_FOUND));
    }

    // must be checked before the invocation error because of the shared suffix
    if req.uri().path().ends_with("/init/error") {
        return Ok(handlers::init_error::handler(req).await);
    }

    if req.uri().path().ends_with("/response") {
        return Ok(handlers::invocation_response::handler(&state, req).await);
    }

    if req.uri().path().ends_with("/error") {
        return Ok(handlers::invocation_error::handler(&state, req).await);
    }

    // this should not be happening unless someone is sending requests manually
    warn!("Unknown Runtime API request: {} {}", req.method(), req.uri());
    Ok(handlers::status_only(StatusCode::NOT_FOUND))
}
