//! Matchmaking orchestrator: verify the mentee, then pick a mentor.
//!
//! Each phase is one agent conversation holding exactly one tool. The
//! agent's final reply goes through a `ResponseClassifier`; anything the
//! classifier cannot confirm ends the run as a failure.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::agent::{
    AgentConversation, AgentPersona, ConversationOutcome, MATCHMAKING_AGENT, SUMMARY_AGENT,
    TRUST_AGENT,
};
use crate::config::MatchingConfig;
use crate::error::Error;
use crate::llm::LlmProvider;
use crate::matchmaking::model::MentorSearch;
use crate::matchmaking::state::{MatchPhase, MatchRun};
use crate::matchmaking::verdict::{
    JsonMentorChoiceClassifier, MarkerVerificationClassifier, MentorChoice, ResponseClassifier,
    SummaryConfirmationClassifier, SummaryVerdict, VerificationVerdict,
};
use crate::store::Database;
use crate::tools::ToolRegistry;
use crate::tools::builtin::matchmaking_registry;

pub const UNEXPECTED_VERIFICATION_REASON: &str =
    "Verification failed with an unexpected agent response.";
pub const NO_VALID_MENTOR_REASON: &str = "Matchmaking agent did not return a valid mentor ID.";
pub const UNLISTED_MENTOR_REASON: &str =
    "Matchmaking agent chose a mentor that was not among the candidates.";
pub const SUMMARY_NOT_SAVED_REASON: &str = "Agent failed to save summary.";

/// Result of a matchmaking orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchOutcome {
    Success {
        mentor_id: i64,
    },
    Failed {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_message: Option<String>,
    },
}

/// Result of the session summary flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryOutcome {
    Saved,
    Failed {
        reason: String,
        last_message: Option<String>,
    },
}

/// Runs the agent flows that resolve mentorship requests.
///
/// `Err` means infrastructure failure (oracle or store unreachable); domain
/// failures are `Ok(..::Failed)`.
#[async_trait]
pub trait Matchmaker: Send + Sync {
    async fn initiate_matchmaking_flow(
        &self,
        user_id: i64,
        skill_name: &str,
        request_details: &str,
    ) -> Result<MatchOutcome, Error>;

    async fn facilitate_session_summary(
        &self,
        session_id: i64,
        transcript: &str,
    ) -> Result<SummaryOutcome, Error>;
}

/// Orchestrator backed by an LLM and the tool set bound to one store.
pub struct MatchmakingOrchestrator {
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn Database>,
    config: MatchingConfig,
    verification: Arc<dyn ResponseClassifier<Verdict = VerificationVerdict>>,
    mentor_choice: Arc<dyn ResponseClassifier<Verdict = MentorChoice>>,
    summary: Arc<dyn ResponseClassifier<Verdict = SummaryVerdict>>,
}

impl MatchmakingOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn Database>,
        config: MatchingConfig,
    ) -> Self {
        Self {
            llm,
            store,
            config,
            verification: Arc::new(MarkerVerificationClassifier),
            mentor_choice: Arc::new(JsonMentorChoiceClassifier::new()),
            summary: Arc::new(SummaryConfirmationClassifier),
        }
    }

    pub fn with_verification_classifier(
        mut self,
        classifier: Arc<dyn ResponseClassifier<Verdict = VerificationVerdict>>,
    ) -> Self {
        self.verification = classifier;
        self
    }

    pub fn with_mentor_choice_classifier(
        mut self,
        classifier: Arc<dyn ResponseClassifier<Verdict = MentorChoice>>,
    ) -> Self {
        self.mentor_choice = classifier;
        self
    }

    pub fn with_summary_classifier(
        mut self,
        classifier: Arc<dyn ResponseClassifier<Verdict = SummaryVerdict>>,
    ) -> Self {
        self.summary = classifier;
        self
    }

    async fn converse(
        &self,
        registry: &ToolRegistry,
        persona: &AgentPersona,
        session_id: Option<i64>,
        directive: &str,
    ) -> Result<ConversationOutcome, Error> {
        let tools = registry.scoped(persona.tools).await;
        let mut conversation =
            AgentConversation::new(Arc::clone(&self.llm), persona, tools, self.config.max_turns);
        if let Some(session_id) = session_id {
            conversation = conversation.with_session(session_id);
        }
        let outcome = conversation.run(directive).await?;

        tracing::debug!(
            agent = persona.name,
            tokens = outcome.usage.total(),
            tool_calls = outcome.tool_invocations.len(),
            "Agent conversation finished"
        );
        Ok(outcome)
    }

    /// Ids of every mentor the finder returned during a conversation.
    fn offered_mentors(outcome: &ConversationOutcome) -> HashSet<i64> {
        outcome
            .outputs_of("find_potential_mentors")
            .filter_map(|raw| serde_json::from_str::<MentorSearch>(raw).ok())
            .flat_map(|search| search.mentors.into_iter().map(|m| m.id))
            .collect()
    }
}

fn advance(run: &mut MatchRun, target: MatchPhase, reason: Option<String>) -> Result<(), Error> {
    run.transition_to(target, reason).map_err(Error::Orchestration)
}

#[async_trait]
impl Matchmaker for MatchmakingOrchestrator {
    async fn initiate_matchmaking_flow(
        &self,
        user_id: i64,
        skill_name: &str,
        request_details: &str,
    ) -> Result<MatchOutcome, Error> {
        let registry = matchmaking_registry(Arc::clone(&self.store), &self.config).await;
        let mut run = MatchRun::new(user_id, skill_name);

        // Phase 1: verification
        advance(&mut run, MatchPhase::Verifying, None)?;
        let directive = format!(
            "Verify the trustworthiness of the user with id {user_id}. \
             Use the verify_user_trust tool."
        );
        let verification = self.converse(&registry, &TRUST_AGENT, None, &directive).await?;

        match self.verification.classify(&verification.final_message) {
            VerificationVerdict::Untrustworthy { detail } => {
                let reason = format!("User is untrustworthy: {detail}");
                advance(&mut run, MatchPhase::VerificationFailed, Some(reason.clone()))?;
                tracing::info!(user_id, "Verification failed: user is untrustworthy");
                return Ok(MatchOutcome::Failed {
                    reason,
                    last_message: None,
                });
            }
            VerificationVerdict::Inconclusive => {
                advance(
                    &mut run,
                    MatchPhase::VerificationFailed,
                    Some(UNEXPECTED_VERIFICATION_REASON.to_string()),
                )?;
                tracing::info!(
                    user_id,
                    reply = %verification.final_message,
                    "Verification failed: unexpected agent response"
                );
                return Ok(MatchOutcome::Failed {
                    reason: UNEXPECTED_VERIFICATION_REASON.to_string(),
                    last_message: Some(verification.final_message),
                });
            }
            VerificationVerdict::Verified => {
                advance(&mut run, MatchPhase::Verified, None)?;
            }
        }

        // Phase 2: matching
        advance(&mut run, MatchPhase::Matching, None)?;
        let directive = format!(
            "The user is verified. Find a mentor for the skill '{skill_name}'. \
             The user's request details are: '{request_details}'. \
             First use the find_potential_mentors tool, then analyze the list and \
             respond with only the JSON for the best mentor."
        );
        let matching = self
            .converse(&registry, &MATCHMAKING_AGENT, None, &directive)
            .await?;

        let (reason, last_message) = match self.mentor_choice.classify(&matching.final_message) {
            MentorChoice::Chosen { mentor_id } => {
                if Self::offered_mentors(&matching).contains(&mentor_id) {
                    advance(&mut run, MatchPhase::MatchFound, None)?;
                    tracing::info!(user_id, mentor_id, skill = %skill_name, "Mentor chosen");
                    return Ok(MatchOutcome::Success { mentor_id });
                }
                tracing::warn!(
                    user_id,
                    mentor_id,
                    "Agent chose a mentor that the finder did not return"
                );
                (UNLISTED_MENTOR_REASON, matching.final_message)
            }
            MentorChoice::Missing => (NO_VALID_MENTOR_REASON, matching.final_message),
        };

        advance(&mut run, MatchPhase::MatchFailed, Some(reason.to_string()))?;
        tracing::info!(user_id, skill = %skill_name, "Matchmaking failed: {reason}");
        Ok(MatchOutcome::Failed {
            reason: reason.to_string(),
            last_message: Some(last_message),
        })
    }

    async fn facilitate_session_summary(
        &self,
        session_id: i64,
        transcript: &str,
    ) -> Result<SummaryOutcome, Error> {
        let registry = matchmaking_registry(Arc::clone(&self.store), &self.config).await;
        let directive = format!(
            "The mentorship session with id {session_id} has concluded.\n\
             Transcript:\n---\n{transcript}\n---\n\
             Write a concise summary, save it with the save_session_summary tool \
             and confirm once it is saved."
        );
        let outcome = self
            .converse(&registry, &SUMMARY_AGENT, Some(session_id), &directive)
            .await?;

        match self.summary.classify(&outcome.final_message) {
            SummaryVerdict::Saved => {
                tracing::info!(session_id, "Session summary saved");
                Ok(SummaryOutcome::Saved)
            }
            SummaryVerdict::NotSaved => {
                tracing::info!(session_id, "Summary agent did not confirm saving");
                Ok(SummaryOutcome::Failed {
                    reason: SUMMARY_NOT_SAVED_REASON.to_string(),
                    last_message: Some(outcome.final_message),
                })
            }
        }
    }
}
