//! Mentorship matchmaking: domain model, trust oracle, mentor finder, the
//! orchestration state machine and the background runner that applies its
//! outcome.

pub mod finder;
pub mod intake;
pub mod model;
pub mod orchestrator;
pub mod runner;
pub mod state;
pub mod trust;
pub mod verdict;

pub use intake::{Admission, IntakeError, MentorshipRequest, MentorshipService};
pub use orchestrator::{MatchOutcome, Matchmaker, MatchmakingOrchestrator, SummaryOutcome};
pub use runner::{BackgroundRunner, MatchJob, MatchmakerFactory, OrchestratorFactory, SummaryJob};
pub use state::{MatchPhase, MatchRun};
