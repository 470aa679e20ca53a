//! HTTP protocol layer module
//!
//! Response builders shared by the application and management listeners.

pub mod response;

// Re-export commonly used types
pub use response::{
    build_413_response, build_500_response, build_text_response, with_server_header,
};
