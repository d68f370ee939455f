/// A basic API Gateway proxy function for trying out local-api.
/// Run it with `cargo run -p local-api -- --api-module target/debug/test-router`.
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // minimal logging to keep it simple
    // intended to run locally only
    tracing_subscriber::fmt()
        .without_time()
        .with_ansi(true) // the color codes work in the terminal only
        .with_target(false)
        .init();

    lambda_runtime::run(service_fn(proxy_router)).await?;

    Ok(())
}

pub(crate) async fn proxy_router(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let method = event.payload["requestContext"]["httpMethod"].as_str().unwrap_or_default();
    let path = event.payload["requestContext"]["resourcePath"].as_str().unwrap_or_default();

    info!("{method} {path}");

    if path.starts_with("/fail") {
        return Err(Error::from("Fail"));
    }

    let response = match method {
        "GET" => json!({
            "statusCode": 200,
            "headers": {"called": "handleGetRequest"},
            "body": "OK"
        }),
        "POST" => json!({
            "statusCode": 201,
            "headers": {"called": "handlePostRequest"},
            "body": "OK"
        }),
        _ => json!({
            "statusCode": 405,
            "body": {"message": format!("{method} is not supported")}
        }),
    };

    Ok(response)
}
