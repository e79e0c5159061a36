//! REST endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use super::types::{Accepted, RegisterRequest, SummaryRequest, UserOut, is_valid_email};
use crate::error::DatabaseError;
use crate::matchmaking::model::NewUser;
use crate::matchmaking::{IntakeError, MentorshipRequest, MentorshipService};
use crate::security::Hasher;
use crate::store::Database;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub project_name: String,
    pub store: Arc<dyn Database>,
    pub service: Arc<MentorshipService>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({"error": message.into()}))).into_response()
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> Response {
    tracing::error!("{context}: {e}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
}

/// GET /
async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": format!("{} API is running.", state.project_name),
    }))
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// POST /api/v1/users/register
async fn register_user(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Response {
    if !is_valid_email(&body.email) {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Invalid email address.");
    }

    let hashed_password = match Hasher::hash_password_async(body.password).await {
        Ok(hash) => hash,
        Err(e) => return internal_error("register_user", e),
    };

    let new_user = NewUser {
        username: body.username,
        email: body.email,
        hashed_password,
        role: body.role,
        skills: body.skills,
    };

    match state.store.create_user(&new_user).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, role = %user.role, "User registered");
            (StatusCode::CREATED, Json(UserOut::from(user))).into_response()
        }
        Err(DatabaseError::Constraint(_)) => {
            error_response(StatusCode::BAD_REQUEST, "Username or email already exists.")
        }
        Err(e) => internal_error("register_user", e),
    }
}

/// GET /api/v1/users/{id}
async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.store.get_user(id).await {
        Ok(Some(user)) => Json(UserOut::from(user)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found."),
        Err(e) => internal_error("get_user", e),
    }
}

/// POST /api/v1/mentorship-requests
///
/// Admits the request and answers 202 at once; the outcome is only visible
/// on the session record.
async fn request_mentorship(
    State(state): State<AppState>,
    Json(body): Json<MentorshipRequest>,
) -> Response {
    match state.service.request_mentorship(body).await {
        Ok(admission) => (
            StatusCode::ACCEPTED,
            Json(Accepted {
                message: "Matchmaking request received and is being processed.".to_string(),
                session_id: admission.session.id,
            }),
        )
            .into_response(),
        Err(e @ IntakeError::SkillNotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e) => internal_error("request_mentorship", e),
    }
}

/// GET /api/v1/sessions/{id}
async fn get_session(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.service.get_session(id).await {
        Ok(Some(session)) => Json(session).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Session not found."),
        Err(e) => internal_error("get_session", e),
    }
}

/// POST /api/v1/sessions/{id}/summary
async fn request_summary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SummaryRequest>,
) -> Response {
    match state.service.request_summary(id, body.transcript).await {
        Ok(admission) => (
            StatusCode::ACCEPTED,
            Json(Accepted {
                message: "Summary request received and is being processed.".to_string(),
                session_id: admission.session.id,
            }),
        )
            .into_response(),
        Err(IntakeError::SessionNotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, "Session not found.")
        }
        Err(e @ IntakeError::NotSummarizable { .. }) => {
            error_response(StatusCode::CONFLICT, e.to_string())
        }
        Err(e) => internal_error("request_summary", e),
    }
}

/// Build the REST routes.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/users/register", post(register_user))
        .route("/api/v1/users/{id}", get(get_user))
        .route("/api/v1/mentorship-requests", post(request_mentorship))
        .route("/api/v1/sessions/{id}", get(get_session))
        .route("/api/v1/sessions/{id}/summary", post(request_summary))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
