//! Request handler module
//!
//! Every application request is answered by the object named after its
//! path; the greeting parameters come from the query string.

pub mod params;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
