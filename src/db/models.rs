//! Database row types. Dates, leagues and bet types are stored as text and
//! converted at the edge; a row that fails conversion is a data error, not a
//! silent skip.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::types::Pick;

#[derive(Debug, sqlx::FromRow)]
pub struct PickRow {
    pub id: String,
    pub game_date: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub pick_text: String,
    pub bet_type: String,
    pub line: Option<f64>,
    pub confidence: f64,
}

impl PickRow {
    pub fn into_pick(self) -> Result<Pick> {
        Ok(Pick {
            game_date: parse_date(&self.game_date)?,
            league: self.league.parse()?,
            bet_type: self.bet_type.parse()?,
            id: self.id,
            home_team: self.home_team,
            away_team: self.away_team,
            pick_text: self.pick_text,
            line: self.line,
            confidence: self.confidence,
        })
    }
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct PickResultRow {
    pub id: i64,
    pub pick_id: String,
    pub game_date: String,
    pub league: String,
    pub pick_text: String,
    pub outcome: String,
    pub final_score: String,
    pub confidence: f64,
    pub recorded_at: String,
}

pub fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Data(format!("bad date: {raw}")))
}
