//! Environment-driven service configuration.
//!
//! Every knob has a default suitable for local development; production
//! deployments override through `SCRIBE_*` environment variables. Mock
//! client toggles exist for offline development only.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, ScribeError};

/// Chat-model client settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub use_mock: bool,
}

/// Deep-research client settings.
#[derive(Debug, Clone)]
pub struct ResearchSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub use_mock: bool,
}

/// Draft-gateway client settings.
#[derive(Debug, Clone)]
pub struct DraftSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub use_mock: bool,
}

/// Complete service settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Path to the SQLite database file.
    pub database_path: PathBuf,
    /// Upper bound for the list endpoint's `limit` parameter.
    pub api_max_page_size: i64,
    /// Hard wall-clock budget per workflow run.
    pub task_time_limit: Duration,
    /// Soft budget; crossing it logs a warning but lets the run continue.
    pub task_soft_time_limit: Duration,
    /// Bounded capacity of the async task queue.
    pub queue_capacity: usize,
    /// Local vault checkout used for the vault summary; optional.
    pub vault_path: Option<PathBuf>,
    pub llm: LlmSettings,
    pub research: ResearchSettings,
    pub draft: DraftSettings,
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_addr: env_or("SCRIBE_BIND_ADDR", "0.0.0.0:8000"),
            database_path: PathBuf::from(env_or("SCRIBE_DATABASE_PATH", "scribe.db")),
            api_max_page_size: env_parse("SCRIBE_API_MAX_PAGE_SIZE", 100)?,
            task_time_limit: Duration::from_secs(env_parse(
                "SCRIBE_TASK_TIME_LIMIT_SECONDS",
                600,
            )?),
            task_soft_time_limit: Duration::from_secs(env_parse(
                "SCRIBE_TASK_SOFT_TIME_LIMIT_SECONDS",
                540,
            )?),
            queue_capacity: env_parse("SCRIBE_QUEUE_CAPACITY", 64)?,
            vault_path: std::env::var("SCRIBE_VAULT_PATH").ok().map(PathBuf::from),
            llm: LlmSettings {
                base_url: env_or("SCRIBE_LLM_BASE_URL", "http://localhost:11434"),
                model: env_or("SCRIBE_LLM_MODEL", "llama3.2:3b"),
                timeout: Duration::from_secs(env_parse("SCRIBE_LLM_TIMEOUT_SECONDS", 120)?),
                use_mock: env_flag("SCRIBE_USE_MOCK_LLM", false),
            },
            research: ResearchSettings {
                base_url: env_or("SCRIBE_RESEARCH_BASE_URL", "http://localhost:8100"),
                timeout: Duration::from_secs(env_parse(
                    "SCRIBE_RESEARCH_TIMEOUT_SECONDS",
                    300,
                )?),
                use_mock: env_flag("SCRIBE_USE_MOCK_RESEARCH", false),
            },
            draft: DraftSettings {
                base_url: env_or("SCRIBE_DRAFT_BASE_URL", "http://localhost:8200"),
                timeout: Duration::from_secs(env_parse("SCRIBE_DRAFT_TIMEOUT_SECONDS", 60)?),
                use_mock: env_flag("SCRIBE_USE_MOCK_DRAFT", false),
            },
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ScribeError::Config(format!("invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_environment() {
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.api_max_page_size, 100);
        assert_eq!(settings.task_time_limit, Duration::from_secs(600));
        assert_eq!(settings.task_soft_time_limit, Duration::from_secs(540));
        assert_eq!(settings.queue_capacity, 64);
    }

    #[test]
    fn test_env_flag_parsing() {
        std::env::set_var("SCRIBE_TEST_FLAG_ON", "YES");
        std::env::set_var("SCRIBE_TEST_FLAG_OFF", "nope");
        assert!(env_flag("SCRIBE_TEST_FLAG_ON", false));
        assert!(!env_flag("SCRIBE_TEST_FLAG_OFF", true));
        assert!(env_flag("SCRIBE_TEST_FLAG_MISSING", true));
        std::env::remove_var("SCRIBE_TEST_FLAG_ON");
        std::env::remove_var("SCRIBE_TEST_FLAG_OFF");
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        std::env::set_var("SCRIBE_TEST_NUMBER", "not-a-number");
        let result: Result<i64> = env_parse("SCRIBE_TEST_NUMBER", 5);
        assert!(result.is_err());
        std::env::remove_var("SCRIBE_TEST_NUMBER");
    }
}
