//! Mentor Match: skill-exchange mentorship matchmaking backend.

pub mod agent;
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod logging;
pub mod matchmaking;
pub mod security;
pub mod store;
pub mod tools;
