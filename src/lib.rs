//! Static file delivery over HTTP/1.1
//!
//! The [`send::Sender`] resolves a request path under a root directory, applies
//! conditional and range semantics and streams the file back as a hyper body.
//! The binary in `main.rs` wires it to a tokio listener.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod send;
