//! Trust oracle: decides whether a user is in good standing.

use crate::error::DatabaseError;
use crate::matchmaking::model::{TrustReport, TrustStatus};
use crate::store::Database;

/// Report on `user_id` against `threshold`.
///
/// A score exactly at the threshold is verified.
pub async fn verify_user(
    store: &dyn Database,
    user_id: i64,
    threshold: f64,
) -> Result<TrustReport, DatabaseError> {
    let Some(user) = store.get_user(user_id).await? else {
        return Ok(TrustReport {
            user_id,
            status: TrustStatus::NotFound,
            score: None,
            details: "User does not exist.".to_string(),
        });
    };

    let report = if user.trust_score < threshold {
        TrustReport {
            user_id,
            status: TrustStatus::Untrustworthy,
            score: Some(user.trust_score),
            details: format!("User trust score is below the {threshold} point threshold."),
        }
    } else {
        TrustReport {
            user_id,
            status: TrustStatus::Verified,
            score: Some(user.trust_score),
            details: "User is verified and in good standing.".to_string(),
        }
    };

    tracing::debug!(user_id, status = ?report.status, "Trust check");
    Ok(report)
}
