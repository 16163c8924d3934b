//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! download and upload handlers.

pub mod mime;
pub mod response;

// Re-export commonly used types
pub use response::{
    build_200_text_response, build_400_response, build_401_response, build_404_response,
    build_405_response, build_413_response, build_500_response, build_file_response, full_body,
    ResponseBody,
};
