//! Request intake: admits mentorship and summary requests and schedules the
//! background work. Never waits for, or reports, the outcome.

use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::error::DatabaseError;
use crate::matchmaking::model::{MentorshipSession, SessionStatus};
use crate::matchmaking::runner::{BackgroundRunner, MatchJob, SummaryJob};
use crate::store::Database;

/// A mentee asking for a mentor.
#[derive(Debug, Clone, Deserialize)]
pub struct MentorshipRequest {
    pub user_id: i64,
    pub skill_name: String,
    pub request_details: String,
}

/// An admitted request: the PENDING session and its background unit.
pub struct Admission {
    pub session: MentorshipSession,
    pub handle: JoinHandle<()>,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Skill '{0}' not found.")]
    SkillNotFound(String),

    #[error("Session {0} not found.")]
    SessionNotFound(i64),

    #[error("Session {session_id} is {status}; only matched or active sessions can be summarized.")]
    NotSummarizable {
        session_id: i64,
        status: SessionStatus,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub struct MentorshipService {
    store: Arc<dyn Database>,
    runner: BackgroundRunner,
}

impl MentorshipService {
    pub fn new(store: Arc<dyn Database>, runner: BackgroundRunner) -> Self {
        Self { store, runner }
    }

    /// Validate the skill, create a PENDING session and schedule matchmaking.
    ///
    /// An unknown skill creates nothing and schedules nothing.
    pub async fn request_mentorship(
        &self,
        request: MentorshipRequest,
    ) -> Result<Admission, IntakeError> {
        let skill = self
            .store
            .get_skill_by_name(&request.skill_name)
            .await?
            .ok_or_else(|| IntakeError::SkillNotFound(request.skill_name.clone()))?;

        let session = self.store.create_session(request.user_id, skill.id).await?;
        tracing::info!(
            session_id = session.id,
            user_id = request.user_id,
            skill = %skill.name,
            "Mentorship request admitted"
        );

        let handle = self.runner.spawn(MatchJob {
            session_id: session.id,
            user_id: request.user_id,
            skill_name: request.skill_name,
            request_details: request.request_details,
        });
        Ok(Admission { session, handle })
    }

    /// Store the transcript of a held session and schedule its summary.
    ///
    /// Only sessions that have a mentor are accepted, so a summary never
    /// races matchmaking or completes a failed request.
    pub async fn request_summary(
        &self,
        session_id: i64,
        transcript: String,
    ) -> Result<Admission, IntakeError> {
        let current = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(IntakeError::SessionNotFound(session_id))?;
        if !current.status.accepts_summary() {
            return Err(IntakeError::NotSummarizable {
                session_id,
                status: current.status,
            });
        }

        let session = self
            .store
            .save_session_transcript(session_id, &transcript)
            .await?
            .ok_or(IntakeError::SessionNotFound(session_id))?;

        tracing::info!(session_id, "Summary request admitted");
        let handle = self.runner.spawn_summary(SummaryJob {
            session_id,
            transcript,
        });
        Ok(Admission { session, handle })
    }

    pub async fn get_session(
        &self,
        session_id: i64,
    ) -> Result<Option<MentorshipSession>, IntakeError> {
        Ok(self.store.get_session(session_id).await?)
    }
}
