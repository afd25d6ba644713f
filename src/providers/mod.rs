pub mod boxscore;
pub mod search;
pub mod sportsdb;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::types::{League, Pick, ScoreRecord};

pub use boxscore::BoxScoreProvider;
pub use search::SearchScoreProvider;
pub use sportsdb::SportsDbProvider;

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// One game the orchestrator wants a final score for.
#[derive(Debug, Clone)]
pub struct ScoreQuery {
    pub home_team: String,
    pub away_team: String,
    pub league: League,
    pub date: NaiveDate,
    /// Last-resort pass: providers that support it should issue a tighter,
    /// score-only query instead of their usual one.
    pub narrow: bool,
}

impl ScoreQuery {
    pub fn for_pick(pick: &Pick, narrow: bool) -> Self {
        Self {
            home_team: pick.home_team.clone(),
            away_team: pick.away_team.clone(),
            league: pick.league,
            date: pick.game_date,
            narrow,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider contract
// ---------------------------------------------------------------------------

/// How a provider is driven by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// One network call per pick; calls are strictly sequential with this
    /// delay between them (external rate limits).
    PerPick { delay: Duration },
    /// One call per (league, date) returning the whole slate; picks are
    /// matched locally afterwards.
    Scoreboard,
}

/// A source of final scores. "Not found" is `Ok(None)` / an empty vec;
/// errors are reserved for transport and credential failures.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    fn id(&self) -> &'static str;

    fn mode(&self) -> FetchMode;

    fn supports(&self, _league: League) -> bool {
        true
    }

    /// Whether this provider should be retried as the narrow last-resort
    /// tier after every other tier has run.
    fn supports_narrow(&self) -> bool {
        false
    }

    /// PerPick providers resolve a single game.
    async fn fetch_score(&self, _query: &ScoreQuery) -> Result<Option<ScoreRecord>> {
        Ok(None)
    }

    /// Scoreboard providers return every game they know for the date.
    async fn fetch_scoreboard(&self, _league: League, _date: NaiveDate) -> Result<Vec<ScoreRecord>> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Map a non-success HTTP status to the error taxonomy: 401/403 are fatal
/// for the run, 429 backs the tier off, anything else is transport.
pub(crate) fn status_error(
    provider: &'static str,
    status: reqwest::StatusCode,
    body: &str,
) -> AppError {
    use reqwest::StatusCode;
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized { provider },
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited { provider },
        _ => AppError::Provider {
            provider,
            message: format!("HTTP {status}: {}", body.chars().take(200).collect::<String>()),
        },
    }
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(AppError::Http)
}
