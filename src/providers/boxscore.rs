//! Box-score provider backed by the Ball Don't Lie API. NBA only: it has
//! clean per-date game data for basketball and nothing else, which is why it
//! sits behind the broad search tier rather than replacing it.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::config::PROVIDER_TIMEOUT_SECS;
use crate::error::Result;
use crate::providers::{http_client, status_error, FetchMode, ScoreProvider};
use crate::types::{League, ScoreRecord};

const PROVIDER_ID: &str = "boxscore";

#[derive(Debug, Clone)]
pub struct BoxScoreConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl BoxScoreConfig {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            timeout_secs: PROVIDER_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GamesResponse {
    #[serde(default)]
    data: Vec<Game>,
}

#[derive(Debug, Deserialize)]
struct Game {
    home_team: Team,
    visitor_team: Team,
    #[serde(default)]
    home_team_score: i64,
    #[serde(default)]
    visitor_team_score: i64,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct Team {
    #[serde(default)]
    full_name: String,
}

pub struct BoxScoreProvider {
    cfg: BoxScoreConfig,
    http: reqwest::Client,
}

impl BoxScoreProvider {
    pub fn new(cfg: BoxScoreConfig) -> Result<Self> {
        let http = http_client(cfg.timeout_secs)?;
        Ok(Self { cfg, http })
    }
}

#[async_trait]
impl ScoreProvider for BoxScoreProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn mode(&self) -> FetchMode {
        FetchMode::Scoreboard
    }

    fn supports(&self, league: League) -> bool {
        league == League::Nba
    }

    async fn fetch_scoreboard(&self, league: League, date: NaiveDate) -> Result<Vec<ScoreRecord>> {
        if !self.supports(league) {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/games?dates[]={}&per_page=100",
            self.cfg.base_url,
            date.format("%Y-%m-%d")
        );
        let response = self
            .http
            .get(&url)
            .header("Authorization", &self.cfg.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(PROVIDER_ID, status, &body));
        }

        let games: GamesResponse = response.json().await?;
        let records: Vec<ScoreRecord> = games
            .data
            .into_iter()
            .filter_map(|g| game_to_record(g, league))
            .collect();
        debug!(
            date = %date,
            games = records.len(),
            "box-score scoreboard fetched"
        );
        Ok(records)
    }
}

fn game_to_record(game: Game, league: League) -> Option<ScoreRecord> {
    if game.home_team.full_name.is_empty() || game.visitor_team.full_name.is_empty() {
        return None;
    }
    let home_score = u32::try_from(game.home_team_score).ok()?;
    let away_score = u32::try_from(game.visitor_team_score).ok()?;
    Some(ScoreRecord {
        home_team: game.home_team.full_name,
        away_team: game.visitor_team.full_name,
        home_score,
        away_score,
        league,
        source: PROVIDER_ID,
        is_final: game.status.trim().eq_ignore_ascii_case("final"),
    })
}
