use crate::config::Options;
use crate::error::BridgeError;
use crate::handler::make_request_handler;
use crate::logging::Logger;
use crate::router::Router;
use crate::server::HttpServer;
use std::sync::Arc;

/// Mounts the router on every path of the server and starts listening on the configured port.
/// A bind failure is returned as is, there are no retries.
pub async fn bootstrap<S: HttpServer>(
    mut server: S,
    logger: Arc<dyn Logger>,
    router: Arc<dyn Router>,
    options: &Options,
) -> Result<S::Running, BridgeError> {
    server.all("*", make_request_handler(logger.clone(), router));
    let running = server.listen(options.port).await?;

    logger.info(&format!("Listening on port {}", options.port));

    Ok(running)
}
