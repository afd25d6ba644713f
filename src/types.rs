use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// League
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum League {
    Nba,
    Mlb,
    Nhl,
    Nfl,
}

impl League {
    /// Sport name as used by the sports-database provider.
    pub fn sport(&self) -> &'static str {
        match self {
            League::Nba => "Basketball",
            League::Mlb => "Baseball",
            League::Nhl => "Ice Hockey",
            League::Nfl => "American Football",
        }
    }

    /// Whether a regulation game in this league can legitimately end tied.
    /// Everywhere else a "tied final" is almost certainly a half-parsed
    /// in-progress game, so the evaluator refuses to grade it.
    pub fn ties_possible(&self) -> bool {
        matches!(self, League::Nfl)
    }
}

impl std::fmt::Display for League {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            League::Nba => "NBA",
            League::Mlb => "MLB",
            League::Nhl => "NHL",
            League::Nfl => "NFL",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for League {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nba" | "basketball" => Ok(League::Nba),
            "mlb" | "baseball" => Ok(League::Mlb),
            "nhl" | "hockey" | "ice hockey" => Ok(League::Nhl),
            "nfl" | "football" | "american football" => Ok(League::Nfl),
            other => Err(AppError::Data(format!("unknown league: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Bet type / outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    Moneyline,
    Spread,
    Total,
}

impl std::fmt::Display for BetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BetType::Moneyline => "moneyline",
            BetType::Spread => "spread",
            BetType::Total => "total",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for BetType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "moneyline" | "ml" | "h2h" => Ok(BetType::Moneyline),
            "spread" | "spreads" => Ok(BetType::Spread),
            "total" | "totals" | "over_under" => Ok(BetType::Total),
            other => Err(AppError::Data(format!("unknown bet type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Won,
    Lost,
    Push,
    /// Game not finished at resolution time.
    Pending,
    /// Score resolved but the pick could not be graded (name mismatch,
    /// missing line, suspicious tie). Never guessed, never persisted.
    Unknown,
}

impl Outcome {
    /// Only settled outcomes are ever written to the datastore.
    pub fn is_recordable(&self) -> bool {
        matches!(self, Outcome::Won | Outcome::Lost | Outcome::Push)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Won => "won",
            Outcome::Lost => "lost",
            Outcome::Push => "push",
            Outcome::Pending => "pending",
            Outcome::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Pick
// ---------------------------------------------------------------------------

/// A betting recommendation produced upstream. Immutable here.
#[derive(Debug, Clone)]
pub struct Pick {
    pub id: String,
    pub game_date: NaiveDate,
    pub league: League,
    pub home_team: String,
    pub away_team: String,
    /// Free-form, e.g. "Lakers -3.5", "Over 220.5", "Celtics ML".
    pub pick_text: String,
    pub bet_type: BetType,
    pub line: Option<f64>,
    pub confidence: f64,
}

// ---------------------------------------------------------------------------
// Score record
// ---------------------------------------------------------------------------

/// Normalized result of one game, as reported by a provider. Ephemeral;
/// only the derived PickResult is persisted.
#[derive(Debug, Clone)]
pub struct ScoreRecord {
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub league: League,
    /// Provider that produced this record.
    pub source: &'static str,
    pub is_final: bool,
}

impl ScoreRecord {
    /// Canonical HOME-AWAY score string, the format the recorder validates.
    pub fn score_string(&self) -> String {
        format!("{}-{}", self.home_score, self.away_score)
    }
}

// ---------------------------------------------------------------------------
// Persisted result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PickResultDraft {
    pub pick_id: String,
    pub game_date: NaiveDate,
    pub league: League,
    pub pick_text: String,
    pub outcome: Outcome,
    /// HOME-AWAY, must match `^\d+-\d+$`.
    pub final_score: String,
    pub confidence: f64,
}

impl PickResultDraft {
    pub fn from_evaluation(pick: &Pick, outcome: Outcome, score: &ScoreRecord) -> Self {
        Self {
            pick_id: pick.id.clone(),
            game_date: pick.game_date,
            league: pick.league,
            pick_text: pick.pick_text.clone(),
            outcome,
            final_score: score.score_string(),
            confidence: pick.confidence,
        }
    }
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Summary of one reconciliation run, surfaced via the admin API and logs.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub date: String,
    pub picks: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub pending: usize,
    pub ungraded: usize,
    pub recorded: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub invalid: usize,
    pub message: String,
}

impl RunReport {
    pub fn empty(date: NaiveDate) -> Self {
        let date = date.format("%Y-%m-%d").to_string();
        let message = format!("{date}: no picks to check");
        Self {
            date,
            picks: 0,
            resolved: 0,
            unresolved: 0,
            pending: 0,
            ungraded: 0,
            recorded: 0,
            skipped_existing: 0,
            failed: 0,
            invalid: 0,
            message,
        }
    }
}
