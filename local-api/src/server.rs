use crate::completion::NativeResponse;
use crate::error::BridgeError;
use crate::event::{header_map, parse_body, parse_query, NativeRequest};
use crate::handler::RequestHandler;
use crate::handlers::{full, status_only};
use http_body_util::{combinators::BoxBody, BodyExt};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

type HttpResponse = Response<BoxBody<Bytes, hyper::Error>>;

/// The HTTP server the bridge is mounted on.
pub trait HttpServer {
    /// Whatever the caller needs to stop the server later.
    type Running;

    /// Registers `handler` for every method on the paths matching `pattern`.
    fn all(&mut self, pattern: &str, handler: RequestHandler);

    /// Binds to `port` and starts serving in the background.
    fn listen(self, port: u16) -> impl Future<Output = Result<Self::Running, BridgeError>> + Send;
}

struct Route {
    pattern: String,
    handler: RequestHandler,
}

impl Route {
    /// `*` matches everything, a trailing `*` matches a prefix, anything else is an exact match.
    fn matches(&self, path: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => path == self.pattern,
        }
    }
}

/// An HTTP/1 server on top of hyper, listening on the loopback interface.
pub struct HyperServer {
    host: Ipv4Addr,
    routes: Vec<Route>,
}

impl Default for HyperServer {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperServer {
    pub fn new() -> Self {
        Self {
            host: Ipv4Addr::LOCALHOST,
            routes: Vec::new(),
        }
    }
}

impl HttpServer for HyperServer {
    type Running = RunningServer;

    fn all(&mut self, pattern: &str, handler: RequestHandler) {
        self.routes.push(Route {
            pattern: pattern.to_owned(),
            handler,
        });
    }

    async fn listen(self, port: u16) -> Result<RunningServer, BridgeError> {
        let addr = SocketAddr::from((self.host, port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| BridgeError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let routes = Arc::new(self.routes);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = spawn_accept_loop(listener, shutdown_rx, move |req| dispatch(routes.clone(), req));

        Ok(RunningServer {
            local_addr,
            shutdown,
            task,
        })
    }
}

/// A server that is accepting connections.
/// Dropping it stops the accept loop, same as `close`.
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RunningServer {
    /// The address the server is bound to, with the actual port if it was started on port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting new connections. Requests already in progress are allowed to finish.
    pub async fn close(self) {
        // the loop may have ended on its own, in which case there is no one to notify
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            error!("HTTP server task failed: {e}");
        }
    }
}

/// Accepts TCP connections until `shutdown` fires or its sender is dropped.
/// Every connection is served on its own task with `handler` converted into a service.
pub(crate) fn spawn_accept_loop<F, Fut>(
    listener: TcpListener,
    mut shutdown: oneshot::Receiver<()>,
    handler: F,
) -> JoinHandle<()>
where
    F: Fn(Request<Incoming>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<HttpResponse, hyper::Error>> + Send + 'static,
{
    tokio::task::spawn(async move {
        loop {
            let stream = tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        warn!("Failed to accept a TCP connection: {e}");
                        continue;
                    }
                },
            };

            let io = TokioIo::new(stream);
            let handler = handler.clone();

            // Spawn a tokio task to serve multiple connections concurrently
            tokio::task::spawn(async move {
                if let Err(err) = http1::Builder::new()
                    // `service_fn` comes from Tower, convert the handler function into a service
                    .serve_connection(io, service_fn(handler))
                    .await
                {
                    debug!("Error serving TCP connection: {:?}", err);
                }
            });
        }
    })
}

/// Finds the handler for the request, hands it the request and waits for the completion to write the response.
async fn dispatch(routes: Arc<Vec<Route>>, req: Request<Incoming>) -> Result<HttpResponse, hyper::Error> {
    debug!("Request: {} {}", req.method(), req.uri());

    let handler = match routes.iter().find(|route| route.matches(req.uri().path())) {
        Some(route) => route.handler.clone(),
        None => return Ok(status_only(StatusCode::NOT_FOUND)),
    };

    let request = read_request(req).await?;
    let (sender, receiver) = oneshot::channel();
    handler(request, Box::new(HyperResponse::new(sender)));

    match receiver.await {
        Ok(response) => Ok(response),
        Err(_) => {
            error!("The router dropped the request without completing it");
            let mut response = Response::new(full(
                json!({ "message": "The router dropped the request without completing it" }).to_string(),
            ));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            Ok(response)
        }
    }
}

/// Collects the body and copies out the parts the event is built from.
async fn read_request(req: Request<Incoming>) -> Result<NativeRequest, hyper::Error> {
    let original_url = req.uri().to_string();
    let method = req.method().to_string();
    let headers = header_map(req.headers());
    let query = req.uri().query().map(parse_query).unwrap_or_default();
    let body = req.into_body().collect().await?.to_bytes();

    Ok(NativeRequest {
        original_url,
        method,
        headers,
        query,
        body: parse_body(&body),
    })
}

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Builds the hyper response from the completion calls and passes it back to `dispatch`.
pub(crate) struct HyperResponse {
    headers: HeaderMap,
    status: StatusCode,
    sender: oneshot::Sender<HttpResponse>,
}

impl HyperResponse {
    pub(crate) fn new(sender: oneshot::Sender<HttpResponse>) -> Self {
        Self {
            headers: HeaderMap::new(),
            status: StatusCode::OK,
            sender,
        }
    }
}

impl NativeResponse for HyperResponse {
    fn set(&mut self, headers: &Map<String, Value>) {
        for (name, value) in headers {
            let value = match value {
                Value::String(v) => v.clone(),
                // same as leaving the header out
                Value::Null => {
                    debug!("Null response header skipped: {name}");
                    continue;
                }
                other => other.to_string(),
            };

            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                (Ok(name), Ok(value)) => {
                    self.headers.insert(name, value);
                }
                _ => warn!("Invalid response header skipped: {name}: {value}"),
            }
        }
    }

    fn status(&mut self, status_code: u16) {
        self.status = match StatusCode::from_u16(status_code) {
            Ok(v) => v,
            Err(_) => {
                warn!("Invalid status code {status_code} replaced with 500");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
    }

    fn send(self: Box<Self>, body: &Value) {
        let Self {
            mut headers,
            status,
            sender,
        } = *self;

        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }

        let mut response = Response::new(full(body.to_string()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        if sender.send(response).is_err() {
            debug!("Client disconnected before the response was sent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(pattern: &str) -> Route {
        Route {
            pattern: pattern.to_owned(),
            handler: Arc::new(|_: NativeRequest, _: Box<dyn NativeResponse>| {}),
        }
    }

    #[test]
    fn route_patterns() {
        assert!(route("*").matches("/"));
        assert!(route("*").matches("/any/path"));
        assert!(route("/api/*").matches("/api/users"));
        assert!(!route("/api/*").matches("/other"));
        assert!(route("/health").matches("/health"));
        assert!(!route("/health").matches("/health/deep"));
    }

    #[tokio::test]
    async fn hyper_response_applies_headers_status_and_json_body() {
        let (sender, receiver) = oneshot::channel();
        let mut response = Box::new(HyperResponse::new(sender));
        let mut headers = Map::new();
        headers.insert("called".into(), Value::from("handleGetRequest"));
        headers.insert("x-count".into(), Value::from(3));
        headers.insert("bad header".into(), Value::from("skipped"));
        headers.insert("x-unset".into(), Value::Null);

        response.set(&headers);
        response.status(201);
        response.send(&Value::from("OK"));

        let response = receiver.await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["called"], "handleGetRequest");
        assert_eq!(response.headers()["x-count"], "3");
        assert_eq!(response.headers()[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert!(!response.headers().contains_key("x-unset"));
        assert_eq!(response.headers().len(), 3);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#""OK""#);
    }

    #[tokio::test]
    async fn hyper_response_keeps_router_content_type() {
        let (sender, receiver) = oneshot::channel();
        let mut response = Box::new(HyperResponse::new(sender));
        let mut headers = Map::new();
        headers.insert("content-type".into(), Value::from("text/plain"));

        response.set(&headers);
        response.status(1000);
        response.send(&Value::from("OK"));

        let response = receiver.await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    }
}
