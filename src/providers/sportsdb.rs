//! General sports-database provider (TheSportsDB). Covers every league but
//! with looser data: field names vary, scores arrive as strings or nulls,
//! and unfinished games are listed alongside finals. Extraction leans on the
//! parser's field-variant helpers instead of rigid serde structs.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::config::PROVIDER_TIMEOUT_SECS;
use crate::error::Result;
use crate::parser;
use crate::providers::{http_client, status_error, FetchMode, ScoreProvider};
use crate::types::{League, ScoreRecord};

const PROVIDER_ID: &str = "sportsdb";

#[derive(Debug, Clone)]
pub struct SportsDbConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl SportsDbConfig {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            timeout_secs: PROVIDER_TIMEOUT_SECS,
        }
    }
}

pub struct SportsDbProvider {
    cfg: SportsDbConfig,
    http: reqwest::Client,
}

impl SportsDbProvider {
    pub fn new(cfg: SportsDbConfig) -> Result<Self> {
        let http = http_client(cfg.timeout_secs)?;
        Ok(Self { cfg, http })
    }
}

#[async_trait]
impl ScoreProvider for SportsDbProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Scoreboard
    }

    async fn fetch_scoreboard(&self, league: League, date: NaiveDate) -> Result<Vec<ScoreRecord>> {
        let url = format!(
            "{}/{}/eventsday.php?d={}&s={}",
            self.cfg.base_url,
            self.cfg.api_key,
            date.format("%Y-%m-%d"),
            league.sport().replace(' ', "%20"),
        );
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(PROVIDER_ID, status, &body));
        }

        let payload: Value = response.json().await?;
        let events = payload
            .get("events")
            .and_then(|e| e.as_array())
            .cloned()
            .unwrap_or_default();

        let records: Vec<ScoreRecord> = events
            .iter()
            .filter_map(|event| event_to_record(event, league))
            .collect();
        debug!(
            date = %date,
            league = %league,
            events = events.len(),
            scored = records.len(),
            "sports-db scoreboard fetched"
        );
        Ok(records)
    }
}

fn event_to_record(event: &Value, league: League) -> Option<ScoreRecord> {
    let home_team = parser::field(event, &["strHomeTeam", "home_team"])?.as_str()?.to_string();
    let away_team = parser::field(event, &["strAwayTeam", "away_team"])?.as_str()?.to_string();

    // Null scores mean the game has not been played yet.
    let home_score = parser::field(event, &["intHomeScore", "home_score"])
        .and_then(parser::value_u32)?;
    let away_score = parser::field(event, &["intAwayScore", "away_score"])
        .and_then(parser::value_u32)?;

    let is_final = parser::field(event, &["strStatus", "status"])
        .and_then(|s| s.as_str())
        .map(parser::status_is_final)
        // Scores present with no status field: the events-by-day feed only
        // fills scores in once a game is over.
        .unwrap_or(true);

    Some(ScoreRecord {
        home_team,
        away_team,
        home_score,
        away_score,
        league,
        source: PROVIDER_ID,
        is_final,
    })
}
