//! Agent module: personas and the conversation tool loop.

pub mod conversation;
pub mod personas;

pub use conversation::{AgentConversation, ConversationOutcome, ToolInvocation};
pub use personas::{AgentPersona, MATCHMAKING_AGENT, SUMMARY_AGENT, TRUST_AGENT};
