//! Mentor finder: candidate mentors for a skill, best first.

use crate::config::MatchingConfig;
use crate::error::DatabaseError;
use crate::matchmaking::model::MentorSearch;
use crate::store::Database;

/// Mentors whose skills contain `skill_name`, filtered and ranked per `config`.
///
/// The query text is echoed back unchanged. No matches is an empty list.
pub async fn find_potential_mentors(
    store: &dyn Database,
    skill_name: &str,
    config: &MatchingConfig,
) -> Result<MentorSearch, DatabaseError> {
    let mentors = store
        .find_mentors(
            skill_name,
            config.mentor_min_trust_score,
            config.mentor_limit,
        )
        .await?;

    tracing::debug!(skill = %skill_name, found = mentors.len(), "Mentor search");
    Ok(MentorSearch {
        skill_name: skill_name.to_string(),
        mentors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchmaking::model::{NewUser, UserRole};
    use crate::store::LibSqlBackend;

    #[tokio::test]
    async fn echoes_query_and_applies_limit() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        for i in 0..3 {
            let user = db
                .create_user(&NewUser {
                    username: format!("m{i}"),
                    email: format!("m{i}@test.com"),
                    hashed_password: "x".into(),
                    role: UserRole::Both,
                    skills: vec!["Data Science".into()],
                })
                .await
                .unwrap();
            db.update_trust_score(user.id, 80.0 + i as f64).await.unwrap();
        }

        let config = MatchingConfig {
            mentor_limit: 2,
            ..MatchingConfig::default()
        };
        let search = find_potential_mentors(&db, "data", &config).await.unwrap();
        assert_eq!(search.skill_name, "data");
        assert_eq!(search.mentors.len(), 2);
        assert_eq!(search.mentors[0].username, "m2");
    }

    #[tokio::test]
    async fn no_match_is_empty() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        let search = find_potential_mentors(&db, "Cobol", &MatchingConfig::default())
            .await
            .unwrap();
        assert!(search.mentors.is_empty());
        let json = serde_json::to_value(&search).unwrap();
        assert_eq!(json, serde_json::json!({"skill_name": "Cobol", "mentors": []}));
    }
}
