//! HTTP protocol layer module
//!
//! Response builders and CORS handling, decoupled from the endpoints.

pub mod cors;
pub mod response;

// Re-export commonly used types
pub use cors::{apply_common_headers, build_preflight_response};
pub use response::{
    build_404_response, build_405_response, build_413_response, error_response, json_response,
};
