//! `find_potential_mentors`: exposes the mentor finder to the matchmaking agent.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::config::MatchingConfig;
use crate::context::RunContext;
use crate::matchmaking::finder;
use crate::store::Database;
use crate::tools::tool::{Tool, ToolError, ToolOutput, require_str};

pub struct FindPotentialMentorsTool {
    store: Arc<dyn Database>,
    config: MatchingConfig,
}

impl FindPotentialMentorsTool {
    pub fn new(store: Arc<dyn Database>, config: MatchingConfig) -> Self {
        Self { store, config }
    }
}

#[async_trait]
impl Tool for FindPotentialMentorsTool {
    fn name(&self) -> &str {
        "find_potential_mentors"
    }

    fn description(&self) -> &str {
        "Find trusted mentors who teach a skill, highest trust score first. \
         Returns {\"skill_name\", \"mentors\": [{\"id\", \"username\", \"trust_score\"}]}."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "skill_name": {
                    "type": "string",
                    "description": "Skill to search for; partial names match"
                }
            },
            "required": ["skill_name"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &RunContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let skill_name = require_str(&params, "skill_name")?;

        let search = finder::find_potential_mentors(self.store.as_ref(), skill_name, &self.config)
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        let result = serde_json::to_value(&search)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        Ok(ToolOutput::success(result, start.elapsed()))
    }
}
