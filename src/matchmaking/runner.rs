//! Background runner: resolves mentorship requests outside the request cycle.
//!
//! Every unit opens its own persistence context, runs the matchmaker and
//! applies exactly one terminal transition to the session. Errors and panics
//! stop here; the session is marked FAILED with a fixed message and the
//! detail goes to the log only.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::config::MatchingConfig;
use crate::llm::LlmProvider;
use crate::matchmaking::orchestrator::{
    MatchOutcome, Matchmaker, MatchmakingOrchestrator, SummaryOutcome,
};
use crate::store::Database;

pub const INTERNAL_ERROR_REASON: &str = "An unexpected internal error occurred.";
pub const NO_REASON_PROVIDED: &str = "No reason provided.";

/// Input of one matchmaking unit.
#[derive(Debug, Clone)]
pub struct MatchJob {
    pub session_id: i64,
    pub user_id: i64,
    pub skill_name: String,
    pub request_details: String,
}

/// Input of one summary unit.
#[derive(Debug, Clone)]
pub struct SummaryJob {
    pub session_id: i64,
    pub transcript: String,
}

/// Builds a matchmaker bound to a unit's persistence context.
pub trait MatchmakerFactory: Send + Sync {
    fn build(&self, store: Arc<dyn Database>) -> Arc<dyn Matchmaker>;
}

/// Production factory: LLM-backed orchestrators.
pub struct OrchestratorFactory {
    llm: Arc<dyn LlmProvider>,
    config: MatchingConfig,
}

impl OrchestratorFactory {
    pub fn new(llm: Arc<dyn LlmProvider>, config: MatchingConfig) -> Self {
        Self { llm, config }
    }
}

impl MatchmakerFactory for OrchestratorFactory {
    fn build(&self, store: Arc<dyn Database>) -> Arc<dyn Matchmaker> {
        Arc::new(MatchmakingOrchestrator::new(
            Arc::clone(&self.llm),
            store,
            self.config.clone(),
        ))
    }
}

/// Schedules and runs background units.
#[derive(Clone)]
pub struct BackgroundRunner {
    store: Arc<dyn Database>,
    factory: Arc<dyn MatchmakerFactory>,
}

impl BackgroundRunner {
    pub fn new(store: Arc<dyn Database>, factory: Arc<dyn MatchmakerFactory>) -> Self {
        Self { store, factory }
    }

    /// Fire-and-forget a matchmaking unit. Dropping the handle is fine.
    pub fn spawn(&self, job: MatchJob) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run_matchmaking_background(job, None).await })
    }

    /// Fire-and-forget a summary unit.
    pub fn spawn_summary(&self, job: SummaryJob) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run_summary_background(job, None).await })
    }

    /// Use the override when given, else open a fresh context.
    async fn unit_store(
        &self,
        store_override: Option<Arc<dyn Database>>,
    ) -> Option<Arc<dyn Database>> {
        if let Some(store) = store_override {
            return Some(store);
        }
        match self.store.open_context().await {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::error!("Failed to open persistence context: {e}");
                None
            }
        }
    }

    /// Run one matchmaking unit to its terminal transition.
    ///
    /// `store_override` lets tests observe the same context as the caller.
    pub async fn run_matchmaking_background(
        &self,
        job: MatchJob,
        store_override: Option<Arc<dyn Database>>,
    ) {
        let session_id = job.session_id;
        tracing::info!(
            session_id,
            user_id = job.user_id,
            skill = %job.skill_name,
            "Background matchmaking started"
        );

        let Some(store) = self.unit_store(store_override).await else {
            self.record_failure(self.store.as_ref(), session_id, INTERNAL_ERROR_REASON)
                .await;
            return;
        };

        let matchmaker = self.factory.build(Arc::clone(&store));
        let flow = AssertUnwindSafe(matchmaker.initiate_matchmaking_flow(
            job.user_id,
            &job.skill_name,
            &job.request_details,
        ))
        .catch_unwind()
        .await;

        let applied = match flow {
            Ok(Ok(MatchOutcome::Success { mentor_id })) => {
                tracing::info!(session_id, mentor_id, "Matchmaking succeeded");
                store.assign_mentor(session_id, mentor_id).await
            }
            Ok(Ok(MatchOutcome::Failed {
                reason,
                last_message,
            })) => {
                let reason = if reason.trim().is_empty() {
                    NO_REASON_PROVIDED.to_string()
                } else {
                    reason
                };
                tracing::info!(
                    session_id,
                    reason = %reason,
                    last_message = last_message.as_deref().unwrap_or(""),
                    "Matchmaking failed"
                );
                store.mark_session_failed(session_id, &reason).await
            }
            Ok(Err(e)) => {
                tracing::error!(session_id, "Matchmaking errored: {e}");
                store
                    .mark_session_failed(session_id, INTERNAL_ERROR_REASON)
                    .await
            }
            Err(panic) => {
                tracing::error!(
                    session_id,
                    "Matchmaking panicked: {}",
                    panic_message(panic.as_ref())
                );
                store
                    .mark_session_failed(session_id, INTERNAL_ERROR_REASON)
                    .await
            }
        };

        match applied {
            Ok(Some(session)) => {
                tracing::info!(session_id, status = %session.status, "Background matchmaking finished");
            }
            Ok(None) => {
                tracing::warn!(session_id, "Session disappeared before its outcome was recorded");
            }
            Err(e) => {
                tracing::error!(session_id, "Failed to record matchmaking outcome: {e}");
                self.record_failure(store.as_ref(), session_id, INTERNAL_ERROR_REASON)
                    .await;
            }
        }
    }

    /// Run one summary unit. Failures are logged; the session keeps its status.
    pub async fn run_summary_background(
        &self,
        job: SummaryJob,
        store_override: Option<Arc<dyn Database>>,
    ) {
        let session_id = job.session_id;
        let Some(store) = self.unit_store(store_override).await else {
            return;
        };

        let matchmaker = self.factory.build(store);
        let flow = AssertUnwindSafe(
            matchmaker.facilitate_session_summary(session_id, &job.transcript),
        )
        .catch_unwind()
        .await;

        match flow {
            Ok(Ok(SummaryOutcome::Saved)) => {
                tracing::info!(session_id, "Background summary finished");
            }
            Ok(Ok(SummaryOutcome::Failed {
                reason,
                last_message,
            })) => {
                tracing::warn!(
                    session_id,
                    last_message = last_message.as_deref().unwrap_or(""),
                    "Summary failed: {reason}"
                );
            }
            Ok(Err(e)) => tracing::error!(session_id, "Summary errored: {e}"),
            Err(panic) => tracing::error!(
                session_id,
                "Summary panicked: {}",
                panic_message(panic.as_ref())
            ),
        }
    }

    /// Last-resort FAILED transition; only logs if that fails too.
    async fn record_failure(&self, store: &dyn Database, session_id: i64, reason: &str) {
        if let Err(e) = store.mark_session_failed(session_id, reason).await {
            tracing::error!(session_id, "Failed to mark session as failed: {e}");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
