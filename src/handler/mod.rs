//! Request handler module
//!
//! Responsible for authentication, method dispatch and the download/upload
//! business logic.

pub mod download;
pub mod router;
pub mod upload;

// Re-export main entry point
pub use router::handle_request;
