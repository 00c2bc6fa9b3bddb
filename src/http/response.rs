//! HTTP response building module
//!
//! Default responses used when the caller does not handle a redirect or error
//! outcome itself, plus the few method-level responses the handler needs.

use crate::error::SendError;
use crate::http::range::unsatisfiable_content_range;
use crate::send::body::SendBody;
use hyper::header::{ALLOW, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION};
use hyper::{Response, StatusCode};

const TEXT_PLAIN: &str = "text/plain; charset=UTF-8";

/// `"<code> <reason>"`, e.g. `404 Not Found`
pub fn status_line(status: StatusCode) -> String {
    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

/// Minimal error response: status and a status-text body
///
/// 416 carries `Content-Range: bytes */<size>` and no body.
pub fn build_error_response(err: &SendError) -> Response<SendBody> {
    let status = err.status();

    if let SendError::RangeNotSatisfiable { size } = err {
        return Response::builder()
            .status(status)
            .header(CONTENT_RANGE, unsatisfiable_content_range(*size))
            .header(CONTENT_LENGTH, 0)
            .body(SendBody::empty())
            .unwrap_or_else(|e| {
                log_build_error("416", &e);
                fallback(status)
            });
    }

    let text = status_line(status);
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, TEXT_PLAIN)
        .header(CONTENT_LENGTH, text.len())
        .body(SendBody::full(text))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            fallback(status)
        })
}

/// Build 301 redirect response for a directory requested without trailing slash
pub fn build_redirect_response(location: &str) -> Response<SendBody> {
    let text = format!("Redirecting to {location}");
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location)
        .header(CONTENT_TYPE, TEXT_PLAIN)
        .header(CONTENT_LENGTH, text.len())
        .body(SendBody::full(text))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            fallback(StatusCode::MOVED_PERMANENTLY)
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<SendBody> {
    let text = status_line(StatusCode::METHOD_NOT_ALLOWED);
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(ALLOW, "GET, HEAD")
        .header(CONTENT_TYPE, TEXT_PLAIN)
        .header(CONTENT_LENGTH, text.len())
        .body(SendBody::full(text))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            fallback(StatusCode::METHOD_NOT_ALLOWED)
        })
}

/// Build OPTIONS response
pub fn build_options_response() -> Response<SendBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ALLOW, "GET, HEAD, OPTIONS")
        .body(SendBody::empty())
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            fallback(StatusCode::NO_CONTENT)
        })
}

/// Status-only response used when a builder rejects our headers
fn fallback(status: StatusCode) -> Response<SendBody> {
    let mut resp = Response::new(SendBody::empty());
    *resp.status_mut() = status;
    resp
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
