//! REST API module for concept-shift.
//!
//! Serves the tracking pipeline to web front-ends over HTTP.

mod handlers;
mod rest;

pub use handlers::*;
pub use rest::*;
