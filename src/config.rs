//! Configuration types.
//!
//! Everything is read from the environment once, in `main`, and handed to
//! components at construction time.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Trust score below which a user fails verification.
pub const DEFAULT_TRUST_THRESHOLD: f64 = 30.0;

/// Trust score a mentor must strictly exceed to be suggested.
pub const DEFAULT_MENTOR_MIN_TRUST_SCORE: f64 = 50.0;

/// Matchmaking policy knobs.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Users scoring below this are UNTRUSTWORTHY.
    pub trust_threshold: f64,
    /// Mentors must score strictly above this.
    pub mentor_min_trust_score: f64,
    /// Maximum number of candidates returned by the mentor finder.
    pub mentor_limit: usize,
    /// Maximum LLM round-trips per agent conversation.
    pub max_turns: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            trust_threshold: DEFAULT_TRUST_THRESHOLD,
            mentor_min_trust_score: DEFAULT_MENTOR_MIN_TRUST_SCORE,
            mentor_limit: 10,
            max_turns: 8,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Directory for the JSON log file. Stderr only when `None`.
    pub log_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub project_name: String,
    pub host: String,
    pub port: u16,
    /// Database file path, or `:memory:`.
    pub db_path: String,
    pub llm: LlmConfig,
    pub matching: MatchingConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_name = std::env::var("MENTOR_MATCH_PROJECT_NAME")
            .unwrap_or_else(|_| "Skill-Exchange Mentor Network".to_string());
        let host = std::env::var("MENTOR_MATCH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_env("MENTOR_MATCH_PORT", 8000u16)?;
        let db_path = std::env::var("MENTOR_MATCH_DB_PATH")
            .unwrap_or_else(|_| "./data/mentor-match.db".to_string());

        let llm = LlmConfig {
            backend: LlmBackend::OpenAiCompatible,
            base_url: std::env::var("MENTOR_MATCH_LLM_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:4000/v1".to_string()),
            api_key: secrecy::SecretString::from(
                std::env::var("MENTOR_MATCH_LLM_API_KEY")
                    .unwrap_or_else(|_| "not-needed".to_string()),
            ),
            model: std::env::var("MENTOR_MATCH_LLM_MODEL")
                .unwrap_or_else(|_| "llama3.2:1b".to_string()),
        };

        let matching = MatchingConfig {
            max_turns: parse_env("MENTOR_MATCH_MAX_TURNS", MatchingConfig::default().max_turns)?,
            ..MatchingConfig::default()
        };

        let log = LogConfig {
            log_dir: std::env::var("MENTOR_MATCH_LOG_DIR").ok().map(PathBuf::from),
        };

        Ok(Self {
            project_name,
            host,
            port,
            db_path,
            llm,
            matching,
            log,
        })
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse an optional env var, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_defaults_keep_both_thresholds() {
        let config = MatchingConfig::default();
        assert_eq!(config.trust_threshold, 30.0);
        assert_eq!(config.mentor_min_trust_score, 50.0);
        assert_eq!(config.mentor_limit, 10);
    }

    #[test]
    fn parse_env_uses_default_when_unset() {
        let value = parse_env("MENTOR_MATCH_TEST_UNSET_VARIABLE", 42u16).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_env_rejects_garbage() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("MENTOR_MATCH_TEST_BAD_PORT", "eighty") };
        let err = parse_env("MENTOR_MATCH_TEST_BAD_PORT", 8000u16).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        unsafe { std::env::remove_var("MENTOR_MATCH_TEST_BAD_PORT") };
    }
}
