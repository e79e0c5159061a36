//! Matchmaking state machine.
//!
//! `Start -> Verifying -> {VerificationFailed | Verified} -> Matching ->
//! {MatchFound | MatchFailed}`. Only the orchestrator drives it; the outcome
//! of a terminal phase is what leaves the orchestrator.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Phase of one matchmaking orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Start,
    Verifying,
    VerificationFailed,
    Verified,
    Matching,
    MatchFound,
    MatchFailed,
}

impl MatchPhase {
    /// Check if this phase allows transitioning to another phase.
    pub fn can_transition_to(&self, target: MatchPhase) -> bool {
        use MatchPhase::*;

        matches!(
            (self, target),
            (Start, Verifying)
                | (Verifying, VerificationFailed)
                | (Verifying, Verified)
                | (Verified, Matching)
                | (Matching, MatchFound)
                | (Matching, MatchFailed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::VerificationFailed | Self::MatchFound | Self::MatchFailed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Verifying => "verifying",
            Self::VerificationFailed => "verification_failed",
            Self::Verified => "verified",
            Self::Matching => "matching",
            Self::MatchFound => "match_found",
            Self::MatchFailed => "match_failed",
        }
    }
}

impl std::fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phase transition event.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseTransition {
    pub from: MatchPhase,
    pub to: MatchPhase,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Progress of one orchestration: current phase and how it got there.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRun {
    pub user_id: i64,
    pub skill_name: String,
    pub phase: MatchPhase,
    pub transitions: Vec<PhaseTransition>,
}

impl MatchRun {
    pub fn new(user_id: i64, skill_name: impl Into<String>) -> Self {
        Self {
            user_id,
            skill_name: skill_name.into(),
            phase: MatchPhase::Start,
            transitions: Vec::new(),
        }
    }

    /// Move to `target`, recording the transition.
    pub fn transition_to(
        &mut self,
        target: MatchPhase,
        reason: Option<String>,
    ) -> Result<(), String> {
        if !self.phase.can_transition_to(target) {
            return Err(format!(
                "Cannot transition from {} to {}",
                self.phase, target
            ));
        }

        tracing::debug!(
            user_id = self.user_id,
            skill = %self.skill_name,
            from = %self.phase,
            to = %target,
            "Matchmaking phase transition"
        );
        self.transitions.push(PhaseTransition {
            from: self.phase,
            to: target,
            timestamp: Utc::now(),
            reason,
        });
        self.phase = target;
        Ok(())
    }
}
