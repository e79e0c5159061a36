//! Unified `Database` trait: single async interface for all persistence.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::matchmaking::model::{MentorCandidate, MentorshipSession, NewUser, Skill, User};

/// Backend-agnostic database trait covering users, skills and sessions.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    /// Open a fresh persistence context on the same database.
    ///
    /// Background units call this so they never share a connection with the
    /// request that scheduled them.
    async fn open_context(&self) -> Result<Arc<dyn Database>, DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    /// Create a user and link their skills, creating missing skills.
    ///
    /// Duplicate username or email yields `DatabaseError::Constraint`.
    async fn create_user(&self, user: &NewUser) -> Result<User, DatabaseError>;

    /// Get a user (with skills) by id.
    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;

    /// Overwrite a user's trust score. Returns false for unknown users.
    async fn update_trust_score(&self, id: i64, trust_score: f64) -> Result<bool, DatabaseError>;

    // ── Skills ──────────────────────────────────────────────────────

    /// Case-insensitive exact lookup.
    async fn get_skill_by_name(&self, name: &str) -> Result<Option<Skill>, DatabaseError>;

    /// Return the existing skill (case-insensitive) or create it.
    async fn get_or_create_skill(&self, name: &str, domain: &str) -> Result<Skill, DatabaseError>;

    /// Mentors whose skill names contain `skill_name` (case-insensitive),
    /// with role mentor/both and `trust_score > min_trust_score`, best first.
    async fn find_mentors(
        &self,
        skill_name: &str,
        min_trust_score: f64,
        limit: usize,
    ) -> Result<Vec<MentorCandidate>, DatabaseError>;

    // ── Sessions ────────────────────────────────────────────────────

    /// Create a PENDING session.
    async fn create_session(
        &self,
        mentee_id: i64,
        skill_id: i64,
    ) -> Result<MentorshipSession, DatabaseError>;

    /// Get a session by id; `None` when unknown.
    async fn get_session(&self, id: i64) -> Result<Option<MentorshipSession>, DatabaseError>;

    /// Set status MATCHED and the mentor. Overwrites any previous outcome.
    async fn assign_mentor(
        &self,
        id: i64,
        mentor_id: i64,
    ) -> Result<Option<MentorshipSession>, DatabaseError>;

    /// Set status FAILED with a reason. Overwrites any previous outcome.
    async fn mark_session_failed(
        &self,
        id: i64,
        reason: &str,
    ) -> Result<Option<MentorshipSession>, DatabaseError>;

    /// Store the raw transcript of a held session.
    async fn save_session_transcript(
        &self,
        id: i64,
        transcript: &str,
    ) -> Result<Option<MentorshipSession>, DatabaseError>;

    /// Store the summary and set status COMPLETED.
    ///
    /// Only MATCHED or ACTIVE sessions are completed; any other session, like
    /// an unknown id, yields `None` and is left untouched.
    async fn save_session_summary(
        &self,
        id: i64,
        summary: &str,
    ) -> Result<Option<MentorshipSession>, DatabaseError>;
}
