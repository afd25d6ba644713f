use chrono::NaiveTime;

use crate::error::{AppError, Result};

pub const SEARCH_API_URL: &str = "https://api.perplexity.ai";
pub const SEARCH_MODEL: &str = "sonar";
pub const BOXSCORE_API_URL: &str = "https://api.balldontlie.io/v1";
pub const SPORTSDB_API_URL: &str = "https://www.thesportsdb.com/api/v1/json";

/// TheSportsDB ships a shared free-tier key.
pub const SPORTSDB_FREE_KEY: &str = "3";

/// Delay between consecutive per-pick calls to search-based providers.
/// The search API rejects bursts with 429s, so picks are processed strictly
/// sequentially with this gap.
pub const PROVIDER_CALL_DELAY_MS: u64 = 1500;

/// Request timeout for the search provider (it runs a live web search).
pub const SEARCH_TIMEOUT_SECS: u64 = 60;

/// Request timeout for box-score / sports-database providers.
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Results are persisted in batches of this size so one bad write can only
/// take down one batch.
pub const RESULT_BATCH_SIZE: usize = 10;

/// Retry policy for persistence calls.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 2000;
pub const RETRY_BACKOFF_FACTOR: f64 = 1.5;

/// How often the daily scheduler wakes to check the clock (seconds).
pub const SCHEDULER_TICK_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Search provider credentials (SEARCH_API_KEY). Empty disables the tier.
    pub search_api_key: String,
    pub search_api_url: String,
    pub search_model: String,
    /// Box-score provider key (BOXSCORE_API_KEY). Empty disables the tier.
    pub boxscore_api_key: String,
    pub boxscore_api_url: String,
    pub sportsdb_api_key: String,
    pub sportsdb_api_url: String,
    /// Gap between sequential search calls (PROVIDER_CALL_DELAY_MS).
    pub provider_delay_ms: u64,
    /// Whether the daily result check starts enabled (SCHEDULE_ENABLED).
    pub schedule_enabled: bool,
    /// Local wall-clock time for the daily result check (SCHEDULE_TIME, HH:MM).
    pub schedule_time: NaiveTime,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let schedule_raw =
            std::env::var("SCHEDULE_TIME").unwrap_or_else(|_| "08:00".to_string());
        let schedule_time = NaiveTime::parse_from_str(&schedule_raw, "%H:%M")
            .map_err(|_| AppError::Config("SCHEDULE_TIME must be HH:MM".to_string()))?;

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "reconciler.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| {
                    AppError::Config("API_PORT must be a valid port number".to_string())
                })?,
            search_api_key: std::env::var("SEARCH_API_KEY").unwrap_or_default(),
            search_api_url: std::env::var("SEARCH_API_URL")
                .unwrap_or_else(|_| SEARCH_API_URL.to_string()),
            search_model: std::env::var("SEARCH_MODEL")
                .unwrap_or_else(|_| SEARCH_MODEL.to_string()),
            boxscore_api_key: std::env::var("BOXSCORE_API_KEY").unwrap_or_default(),
            boxscore_api_url: std::env::var("BOXSCORE_API_URL")
                .unwrap_or_else(|_| BOXSCORE_API_URL.to_string()),
            sportsdb_api_key: std::env::var("SPORTSDB_API_KEY")
                .unwrap_or_else(|_| SPORTSDB_FREE_KEY.to_string()),
            sportsdb_api_url: std::env::var("SPORTSDB_API_URL")
                .unwrap_or_else(|_| SPORTSDB_API_URL.to_string()),
            provider_delay_ms: std::env::var("PROVIDER_CALL_DELAY_MS")
                .unwrap_or_else(|_| PROVIDER_CALL_DELAY_MS.to_string())
                .parse::<u64>()
                .unwrap_or(PROVIDER_CALL_DELAY_MS),
            schedule_enabled: std::env::var("SCHEDULE_ENABLED")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
            schedule_time,
        })
    }
}
