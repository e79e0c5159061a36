//! Domain types: users, skills, mentorship sessions and the results the
//! trust oracle and mentor finder hand back to the agents.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a user is on the network for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Mentor,
    #[default]
    Mentee,
    Both,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Mentor => "mentor",
            UserRole::Mentee => "mentee",
            UserRole::Both => "both",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mentor" => Ok(UserRole::Mentor),
            "mentee" => Ok(UserRole::Mentee),
            "both" => Ok(UserRole::Both),
            other => Err(format!("unknown user role '{other}'")),
        }
    }
}

/// Lifecycle status of a mentorship session.
///
/// Matchmaking moves `Pending` to `Matched` or `Failed`. `Completed` is set
/// by the summary flow; `Active` and `Cancelled` belong to flows outside this
/// crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Pending,
    Matched,
    Active,
    Completed,
    Cancelled,
    Failed,
}

impl SessionStatus {
    /// Whether a held session can be summarized: it must have a mentor.
    pub fn accepts_summary(&self) -> bool {
        matches!(self, SessionStatus::Matched | SessionStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Matched => "matched",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SessionStatus::Pending),
            "matched" => Ok(SessionStatus::Matched),
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            "failed" => Ok(SessionStatus::Failed),
            other => Err(format!("unknown session status '{other}'")),
        }
    }
}

/// A skill users can teach or learn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: i64,
    pub name: String,
    pub domain: Option<String>,
}

/// A registered user with their skills.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub role: UserRole,
    pub trust_score: f64,
    pub skills: Vec<Skill>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub role: UserRole,
    /// Skill names; unknown skills are created as "Uncategorized".
    pub skills: Vec<String>,
}

/// A request for mentorship and its outcome.
#[derive(Debug, Clone, Serialize)]
pub struct MentorshipSession {
    pub id: i64,
    pub mentee_id: i64,
    /// Set iff the session was matched (or later completed).
    pub mentor_id: Option<i64>,
    pub requested_skill_id: i64,
    pub status: SessionStatus,
    pub failure_reason: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Verdict of the trust oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustStatus {
    Verified,
    Untrustworthy,
    NotFound,
}

/// What the trust oracle reports about one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustReport {
    pub user_id: i64,
    pub status: TrustStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub details: String,
}

/// A mentor suggested by the mentor finder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentorCandidate {
    pub id: i64,
    pub username: String,
    pub trust_score: f64,
}

/// The mentor finder's answer for one skill query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentorSearch {
    pub skill_name: String,
    pub mentors: Vec<MentorCandidate>,
}
