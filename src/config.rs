use std::env;
use std::time::Duration;

use crate::client::ClientConfig;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub summary: SummaryConfig,
}

/// Settings for the summary function endpoint.
#[derive(Clone, Debug)]
pub struct SummaryConfig {
    /// Hard ceiling for one generation; in-flight markers older than this are stale.
    pub timeout: Duration,
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            llm_base_url: "https://api.openai.com/v1".to_string(),
            llm_api_key: None,
            llm_model: "gpt-4o-mini".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = SummaryConfig::default();
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:gymlog.db?mode=rwc".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            summary: SummaryConfig {
                timeout: env_secs("SUMMARY_TIMEOUT_SECS").unwrap_or(defaults.timeout),
                llm_base_url: env::var("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
                llm_api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
                llm_model: env::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            },
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ClientConfig {
    /// Client knobs from `GYMLOG_*` variables, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("GYMLOG_API_URL").unwrap_or(defaults.base_url),
            max_login_attempts: env::var("GYMLOG_MAX_LOGIN_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_login_attempts),
            login_window: env_secs("GYMLOG_LOGIN_WINDOW_SECS").unwrap_or(defaults.login_window),
            session_timeout: env_secs("GYMLOG_SESSION_TIMEOUT_SECS")
                .unwrap_or(defaults.session_timeout),
            snapshot_max_age: env_secs("GYMLOG_SNAPSHOT_MAX_AGE_SECS")
                .unwrap_or(defaults.snapshot_max_age),
            summary_debounce: env_millis("GYMLOG_SUMMARY_DEBOUNCE_MS")
                .unwrap_or(defaults.summary_debounce),
            summary_timeout: env_secs("GYMLOG_SUMMARY_TIMEOUT_SECS")
                .unwrap_or(defaults.summary_timeout),
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}
