//! Request and response bodies.

use serde::{Deserialize, Serialize};

use crate::matchmaking::model::{Skill, User, UserRole};

/// POST /api/v1/users/register
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOut {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub skills: Vec<Skill>,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            skills: user.skills,
        }
    }
}

/// 202 body for admitted background work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accepted {
    pub message: String,
    pub session_id: i64,
}

/// POST /api/v1/sessions/{id}/summary
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryRequest {
    pub transcript: String,
}

/// Loose shape check: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
