use local_api::logging::init_tracing;
use local_api::{bootstrap, FunctionRouter, HyperServer, Options, TracingLogger};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    // clap prints the usage and exits on invalid arguments
    let options = match Options::parse_from_args(std::env::args_os()) {
        Ok(v) => v,
        Err(e) => e.exit(),
    };

    let router = FunctionRouter::listen(options.runtime_api, &options.function_name).await?;
    router.spawn_function(&options.api_module)?;

    let server = bootstrap(HyperServer::new(), Arc::new(TracingLogger), Arc::new(router), &options).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    server.close().await;

    Ok(())
}
