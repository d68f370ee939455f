//! Lambda Runtime API endpoints served to the function started by `FunctionRouter`.
//! See https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

pub(crate) mod init_error;
pub(crate) mod invocation_error;
pub(crate) mod invocation_response;
pub(crate) mod next_invocation;

/// Returns an empty response body.
pub(crate) fn empty() -> BoxBody<Bytes, hyper::Error> {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

/// Returns an response body with contents of `chunk` which can be some type convertible into Bytes, e.g. &str.
pub(crate) fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, hyper::Error> {
    Full::new(chunk.into()).map_err(|never| match never {}).boxed()
}

/// A bodyless response with the given status.
pub(crate) fn status_only(status: StatusCode) -> Response<BoxBody<Bytes, hyper::Error>> {
    let mut response = Response::new(empty());
    *response.status_mut() = status;
    response
}
