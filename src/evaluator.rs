//! Pure outcome grading: one pick, one aligned score, no hidden state.
//! Anything the evaluator cannot grade with certainty comes back as
//! `Unknown`; it never guesses a side.

use std::sync::LazyLock;

use regex::Regex;

use crate::teams::{self, Side};
use crate::types::{BetType, Outcome, Pick, ScoreRecord};

static TRAILING_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-]?\d+(?:\.\d+)?)\s*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TotalDirection {
    Over,
    Under,
}

/// Grade a pick against its game's score. The record must already be
/// aligned to the pick's matchup (home/away orientation).
pub fn evaluate(pick: &Pick, score: &ScoreRecord) -> Outcome {
    if !score.is_final {
        return Outcome::Pending;
    }

    match pick.bet_type {
        BetType::Moneyline => evaluate_moneyline(pick, score),
        BetType::Spread => evaluate_spread(pick, score),
        BetType::Total => evaluate_total(pick, score),
    }
}

fn evaluate_moneyline(pick: &Pick, score: &ScoreRecord) -> Outcome {
    let Some(side) = picked_side(pick) else {
        return Outcome::Unknown;
    };
    let (picked, opponent) = side_scores(score, side);
    if picked > opponent {
        Outcome::Won
    } else if picked < opponent {
        Outcome::Lost
    } else if pick.league.ties_possible() {
        Outcome::Push
    } else {
        // A "tied final" in a league without regulation ties is almost
        // always a half-parsed in-progress game. Refuse to grade it.
        Outcome::Unknown
    }
}

fn evaluate_spread(pick: &Pick, score: &ScoreRecord) -> Outcome {
    let Some(side) = picked_side(pick) else {
        return Outcome::Unknown;
    };
    let Some(line) = pick_line(pick) else {
        return Outcome::Unknown;
    };
    let (picked, opponent) = side_scores(score, side);
    let adjusted = picked as f64 + line;
    let opponent = opponent as f64;
    if adjusted > opponent {
        Outcome::Won
    } else if adjusted < opponent {
        Outcome::Lost
    } else {
        Outcome::Push
    }
}

fn evaluate_total(pick: &Pick, score: &ScoreRecord) -> Outcome {
    let Some(direction) = total_direction(&pick.pick_text) else {
        return Outcome::Unknown;
    };
    let Some(line) = pick_line(pick) else {
        return Outcome::Unknown;
    };
    let sum = (score.home_score + score.away_score) as f64;
    if sum == line {
        return Outcome::Push;
    }
    let over_hit = sum > line;
    match direction {
        TotalDirection::Over if over_hit => Outcome::Won,
        TotalDirection::Under if !over_hit => Outcome::Won,
        _ => Outcome::Lost,
    }
}

/// Which side of the matchup the pick text names, with the trailing line and
/// any "ML" marker stripped: "Lakers -3.5" → Lakers, "Celtics ML" → Celtics.
fn picked_side(pick: &Pick) -> Option<Side> {
    let stripped = TRAILING_LINE_RE.replace(&pick.pick_text, "");
    let name: String = stripped
        .split_whitespace()
        .filter(|tok| !tok.eq_ignore_ascii_case("ml"))
        .collect::<Vec<_>>()
        .join(" ");
    teams::side_of(&name, &pick.home_team, &pick.away_team)
}

fn side_scores(score: &ScoreRecord, side: Side) -> (u32, u32) {
    match side {
        Side::Home => (score.home_score, score.away_score),
        Side::Away => (score.away_score, score.home_score),
    }
}

/// The stored numeric line wins; otherwise fall back to the trailing number
/// in the pick text ("-3.5", "220.5").
fn pick_line(pick: &Pick) -> Option<f64> {
    pick.line.or_else(|| {
        TRAILING_LINE_RE
            .captures(&pick.pick_text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

fn total_direction(pick_text: &str) -> Option<TotalDirection> {
    for token in pick_text.split_whitespace() {
        if token.eq_ignore_ascii_case("over") || token.eq_ignore_ascii_case("o") {
            return Some(TotalDirection::Over);
        }
        if token.eq_ignore_ascii_case("under") || token.eq_ignore_ascii_case("u") {
            return Some(TotalDirection::Under);
        }
    }
    None
}
