//! HTTP protocol layer module
//!
//! Protocol pieces of static file delivery, decoupled from path resolution and I/O:
//! validators, conditional requests, byte ranges, content types and default responses.

pub mod cache;
pub mod conditional;
pub mod mime;
pub mod range;
pub mod response;

// Re-export the responses the request handler builds directly
pub use response::{build_405_response, build_options_response};
