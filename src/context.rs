//! Run context: identifies one agent conversation for tools and logs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Context handed to every tool execution within a conversation.
#[derive(Debug, Clone, Serialize)]
pub struct RunContext {
    /// Unique id of this conversation run.
    pub run_id: Uuid,
    /// Name of the agent persona driving the conversation.
    pub agent: String,
    /// Mentorship session this run works for, when known.
    pub session_id: Option<i64>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            agent: agent.into(),
            session_id: None,
            started_at: Utc::now(),
        }
    }

    pub fn with_session(mut self, session_id: i64) -> Self {
        self.session_id = Some(session_id);
        self
    }
}
