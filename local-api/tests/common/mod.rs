#![allow(dead_code)]

use local_api::{bootstrap, HyperServer, Options, Router, RunningServer};
use std::sync::Arc;

pub use local_api::test_utils::RecordingLogger;

/// Options as the command line would produce them, with an ephemeral port.
pub fn options(port: u16) -> Options {
    Options::parse_from_args(["local-api", "--api-module", "target/debug/test-router", "--port", port.to_string().as_str()]).unwrap()
}

/// Bootstraps a real server for the router on an ephemeral port.
pub async fn start(router: Arc<dyn Router>) -> (RunningServer, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::default());
    let server = bootstrap(HyperServer::new(), logger.clone(), router, &options(0)).await.unwrap();
    (server, logger)
}

pub fn url(server: &RunningServer, path: &str) -> String {
    format!("http://{}{}", server.local_addr(), path)
}

/// A client that never goes through a proxy from the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
