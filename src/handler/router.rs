//! Request dispatch module
//!
//! Entry point for HTTP request processing: method validation, handing the
//! request to the sender and writing the access log line.

use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::send::body::SendBody;
use crate::send::{RequestDescriptor, SendOutcome};
use hyper::header::{CONTENT_LENGTH, RANGE, REFERER, USER_AGENT};
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<SendBody>, Infallible> {
    let started = Instant::now();
    let descriptor = RequestDescriptor::from_request(&req);

    let response = match check_http_method(req.method()) {
        Some(resp) => resp,
        None => {
            let outcome = state.sender.send(&descriptor).await;
            log_outcome(&descriptor, &outcome);
            outcome.into_response()
        }
    };

    if state.access_log() {
        let entry = access_entry(&req, &response, peer_addr, started);
        logger::log_access(&entry, state.access_log_format());
    }

    Ok(response)
}

/// GET and HEAD go to the sender; everything else is answered here
fn check_http_method(method: &Method) -> Option<Response<SendBody>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

fn log_outcome(req: &RequestDescriptor, outcome: &SendOutcome) {
    match outcome {
        SendOutcome::Stream(_) => {}
        SendOutcome::Redirect { location } => {
            logger::log_debug(&format!("{} -> 301 {location}", req.path()));
        }
        SendOutcome::Error(err) => {
            logger::log_debug(&format!("{} -> {}: {err}", req.path(), err.status()));
        }
    }
}

fn access_entry<B>(
    req: &Request<B>,
    response: &Response<SendBody>,
    peer_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let header = |name| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.http_version = version_label(req.version()).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.range = header(RANGE);
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use hyper::header::{ALLOW, LOCATION};
    use hyper::StatusCode;

    fn state_for(root: &std::path::Path) -> Arc<AppState> {
        let mut config = Config::load_from("does-not-exist/config").unwrap();
        config.logging.access_log = false;
        config.send.root = root.to_path_buf();
        Arc::new(AppState::new(&config).unwrap())
    }

    fn request(method: Method, path: &str) -> Request<()> {
        Request::builder().method(method).uri(path).body(()).unwrap()
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_get_streams_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello world").unwrap();
        let state = state_for(dir.path());

        let resp = handle_request(request(Method::GET, "/hello.txt"), state, peer())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello world");
    }

    #[tokio::test]
    async fn test_directory_redirect_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        let state = state_for(dir.path());

        let resp = handle_request(request(Method::GET, "/docs"), Arc::clone(&state), peer())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[LOCATION], "/docs/");

        let resp = handle_request(request(Method::GET, "/nope.txt"), state, peer())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_checks() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_for(dir.path());

        let resp = handle_request(request(Method::POST, "/"), Arc::clone(&state), peer())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()[ALLOW], "GET, HEAD");

        let resp = handle_request(request(Method::OPTIONS, "/"), state, peer())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_access_entry_fields() {
        let req = Request::builder()
            .uri("/a.bin")
            .header(RANGE, "bytes=0-9")
            .header(USER_AGENT, "curl/8")
            .body(())
            .unwrap();
        let resp = Response::builder()
            .status(StatusCode::PARTIAL_CONTENT)
            .header(CONTENT_LENGTH, "10")
            .body(SendBody::empty())
            .unwrap();

        let entry = access_entry(&req, &resp, peer(), Instant::now());
        assert_eq!(entry.remote_addr, "127.0.0.1");
        assert_eq!(entry.status, 206);
        assert_eq!(entry.body_bytes, 10);
        assert_eq!(entry.range.as_deref(), Some("bytes=0-9"));
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8"));
        assert_eq!(entry.referer, None);
    }
}
