use super::status_only;
use http_body_util::{combinators::BoxBody, BodyExt};
use hyper::body::{Bytes, Incoming};
use hyper::Error;
use hyper::{Request, Response, StatusCode};
use tracing::{error, warn};

/// Initialization error (https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html#runtimes-api-initerror)
/// is only logged. The function usually exits after reporting it.
pub(crate) async fn handler(req: Request<Incoming>) -> Response<BoxBody<Bytes, Error>> {
    let resp = match req.into_body().collect().await {
        Ok(v) => v.to_bytes(),
        Err(e) => {
            warn!("Failed to read the init error: {e}");
            return status_only(StatusCode::BAD_REQUEST);
        }
    };

    match String::from_utf8(resp.to_vec()) {
        Ok(v) => {
            error!("Function init error: {v}");
        }
        Err(e) => {
            warn!("Non-UTF-8 init error from the function. {:?}\n{}", e, hex::encode(resp.as_ref()));
        }
    }

    status_only(StatusCode::ACCEPTED)
}
