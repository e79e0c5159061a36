//! HTTP surface: registration, mentorship intake and session queries.

pub mod routes;
pub mod types;

pub use routes::{AppState, api_routes};
