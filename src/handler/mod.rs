//! Request handler module
//!
//! Bridges hyper's service layer to the static file sender.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
