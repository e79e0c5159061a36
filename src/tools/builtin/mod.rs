//! Built-in tools backing the matchmaking agents.

pub mod mentors;
pub mod summary;
pub mod trust;

use std::sync::Arc;

pub use mentors::FindPotentialMentorsTool;
pub use summary::SaveSessionSummaryTool;
pub use trust::VerifyUserTrustTool;

use crate::config::MatchingConfig;
use crate::store::Database;
use crate::tools::ToolRegistry;

/// Build a registry holding every matchmaking tool, bound to `store`.
pub async fn matchmaking_registry(
    store: Arc<dyn Database>,
    config: &MatchingConfig,
) -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry
        .register(Arc::new(VerifyUserTrustTool::new(
            Arc::clone(&store),
            config.trust_threshold,
        )))
        .await;
    registry
        .register(Arc::new(FindPotentialMentorsTool::new(
            Arc::clone(&store),
            config.clone(),
        )))
        .await;
    registry
        .register(Arc::new(SaveSessionSummaryTool::new(store)))
        .await;
    registry
}
