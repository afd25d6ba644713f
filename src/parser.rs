//! Best-effort extraction of a final score from whatever a provider hands
//! back: well-shaped JSON, JSON buried in commentary or code fences, or
//! plain prose. Free text goes through an ordered rule table; the first rule
//! that matches and survives validation wins, and the terminal state is a
//! plain `None`; parsing never errors.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::providers::ScoreQuery;
use crate::teams::{self, Side};
use crate::types::ScoreRecord;

static SCORE_STRING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+-\d+$").unwrap());

/// The canonical persisted score format.
pub fn is_valid_score_string(s: &str) -> bool {
    SCORE_STRING_RE.is_match(s)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Extract a score for the queried matchup from a raw provider payload.
pub fn extract_score(raw: &str, query: &ScoreQuery) -> Option<ScoreRecord> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(rec) = score_from_value(&value, query) {
            return Some(rec);
        }
    }

    // Replies often wrap the JSON in commentary or a code fence; pull out the
    // first balanced object/array and try again.
    if let Some(block) = json_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(block) {
            if let Some(rec) = score_from_value(&value, query) {
                return Some(rec);
            }
        }
    }

    score_from_text(trimmed, query)
}

// ---------------------------------------------------------------------------
// Structured payloads
// ---------------------------------------------------------------------------

const HOME_SCORE_KEYS: &[&str] = &[
    "home_score",
    "homeScore",
    "home_points",
    "homePoints",
    "intHomeScore",
    "home_team_score",
];
const AWAY_SCORE_KEYS: &[&str] = &[
    "away_score",
    "awayScore",
    "away_points",
    "awayPoints",
    "intAwayScore",
    "away_team_score",
    "visitor_team_score",
    "visitor_score",
];
const HOME_TEAM_KEYS: &[&str] = &["home_team", "homeTeam", "strHomeTeam", "home"];
const AWAY_TEAM_KEYS: &[&str] = &["away_team", "awayTeam", "strAwayTeam", "visitor_team", "away"];
const STATUS_KEYS: &[&str] = &["status", "strStatus", "game_status", "state"];

/// First present field among known name variants.
pub fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| value.get(k)).filter(|v| !v.is_null())
}

/// Scores arrive as numbers or numeric strings depending on the provider.
pub fn value_u32(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    if let Some(f) = value.as_f64() {
        if f >= 0.0 && f.fract() == 0.0 {
            return Some(f as u32);
        }
    }
    value.as_str().and_then(|s| s.trim().parse().ok())
}

pub fn status_is_final(status: &str) -> bool {
    let s = status.trim().to_lowercase();
    matches!(
        s.as_str(),
        "final" | "finished" | "match finished" | "ft" | "aot" | "completed" | "complete"
            | "ended" | "full time"
    ) || s.starts_with("final")
}

/// Extract from a JSON object (or the first usable element of an array).
pub fn score_from_value(value: &Value, query: &ScoreQuery) -> Option<ScoreRecord> {
    if let Some(items) = value.as_array() {
        return items.iter().find_map(|item| score_from_value(item, query));
    }
    if !value.is_object() {
        return None;
    }

    let home_score = field(value, HOME_SCORE_KEYS).and_then(value_u32)?;
    let away_score = field(value, AWAY_SCORE_KEYS).and_then(value_u32)?;

    let is_final = match field(value, STATUS_KEYS) {
        Some(status) => match status.as_str() {
            Some(s) => status_is_final(s),
            // Some sources use a boolean `completed` style flag.
            None => status.as_bool().unwrap_or(true),
        },
        // A score-only reply to a "final score" question is taken as final.
        None => true,
    };

    let record = ScoreRecord {
        home_team: query.home_team.clone(),
        away_team: query.away_team.clone(),
        home_score,
        away_score,
        league: query.league,
        source: "",
        is_final,
    };

    // If the payload names its teams, make sure they are the queried matchup
    // and honor its orientation; otherwise trust the query's.
    let named_home = field(value, HOME_TEAM_KEYS).and_then(|v| v.as_str());
    let named_away = field(value, AWAY_TEAM_KEYS).and_then(|v| v.as_str());
    match (named_home, named_away) {
        (Some(h), Some(a)) => {
            let named = ScoreRecord {
                home_team: h.to_string(),
                away_team: a.to_string(),
                ..record
            };
            teams::align(&named, &query.home_team, &query.away_team)
        }
        _ => Some(record),
    }
}

/// Find the first balanced `{…}` or `[…]` substring.
fn json_block(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Free text
// ---------------------------------------------------------------------------

/// An ordered `(pattern, extractor)` rule. Extractors return
/// `(home_score, away_score)` aligned to the query's matchup.
struct TextRule {
    name: &'static str,
    re: &'static LazyLock<Regex>,
    extract: fn(&regex::Captures<'_>, &ScoreQuery) -> Option<(u32, u32)>,
}

static FINAL_AT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)final[:\s,]*([A-Za-z][A-Za-z .'&-]*?)\s*@\s*([A-Za-z][A-Za-z .'&-]*?)[:\s]+(\d{1,3})\s*[-\u{2013}]\s*(\d{1,3})").unwrap()
});

static TEAM_SCORE_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([A-Za-z][A-Za-z .'&-]*?)\s+(\d{1,3})\s*[,;\u{2013}-]\s*([A-Za-z][A-Za-z .'&-]*?)\s+(\d{1,3})").unwrap()
});

static BARE_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})\s*[-\u{2013}]\s*(\d{1,3})").unwrap());

static RULES: [TextRule; 2] = [
    TextRule {
        name: "final_at",
        re: &FINAL_AT_RE,
        extract: extract_final_at,
    },
    TextRule {
        name: "team_score_pair",
        re: &TEAM_SCORE_PAIR_RE,
        extract: extract_team_score_pair,
    },
];

fn score_from_text(text: &str, query: &ScoreQuery) -> Option<ScoreRecord> {
    for rule in &RULES {
        for caps in rule.re.captures_iter(text) {
            if let Some((home_score, away_score)) = (rule.extract)(&caps, query) {
                tracing::debug!(rule = rule.name, "text rule matched");
                return build_text_record(home_score, away_score, query);
            }
        }
    }
    // Terminal fallback: a bare digit pair, accepted only when both teams are
    // mentioned somewhere in the surrounding text.
    bare_pair(text, query)
        .and_then(|(home_score, away_score)| build_text_record(home_score, away_score, query))
}

fn build_text_record(home_score: u32, away_score: u32, query: &ScoreQuery) -> Option<ScoreRecord> {
    if !is_valid_score_string(&format!("{home_score}-{away_score}")) {
        return None;
    }
    Some(ScoreRecord {
        home_team: query.home_team.clone(),
        away_team: query.away_team.clone(),
        home_score,
        away_score,
        league: query.league,
        source: "",
        is_final: true,
    })
}

fn capture_u32(caps: &regex::Captures<'_>, idx: usize) -> Option<u32> {
    caps.get(idx)?.as_str().parse().ok()
}

/// `FINAL <AWAY> @ <HOME>: <away>-<home>`, the conventional away-first
/// orientation, corrected when the named teams say otherwise.
fn extract_final_at(caps: &regex::Captures<'_>, query: &ScoreQuery) -> Option<(u32, u32)> {
    let text_away = caps.get(1)?.as_str();
    let text_home = caps.get(2)?.as_str();
    let first = capture_u32(caps, 3)?;
    let second = capture_u32(caps, 4)?;

    let away_side = teams::side_of(text_away, &query.home_team, &query.away_team);
    let home_side = teams::side_of(text_home, &query.home_team, &query.away_team);
    match (away_side, home_side) {
        (Some(Side::Away), Some(Side::Home))
        | (Some(Side::Away), None)
        | (None, Some(Side::Home)) => Some((second, first)),
        (Some(Side::Home), Some(Side::Away))
        | (Some(Side::Home), None)
        | (None, Some(Side::Away)) => Some((first, second)),
        // Different game or unparseable names: keep scanning.
        _ => None,
    }
}

/// `<Team> <n>, <Team> <m>`: each score belongs to the team named before it.
fn extract_team_score_pair(caps: &regex::Captures<'_>, query: &ScoreQuery) -> Option<(u32, u32)> {
    let team_a = caps.get(1)?.as_str();
    let team_b = caps.get(3)?.as_str();
    let score_a = capture_u32(caps, 2)?;
    let score_b = capture_u32(caps, 4)?;

    let side_a = teams::side_of(team_a, &query.home_team, &query.away_team);
    let side_b = teams::side_of(team_b, &query.home_team, &query.away_team);
    match (side_a, side_b) {
        (Some(Side::Home), Some(Side::Away)) | (Some(Side::Home), None) | (None, Some(Side::Away)) => {
            Some((score_a, score_b))
        }
        (Some(Side::Away), Some(Side::Home)) | (Some(Side::Away), None) | (None, Some(Side::Home)) => {
            Some((score_b, score_a))
        }
        _ => None,
    }
}

/// Bare `<digits>-<digits>` windowed by team mentions: both queried teams
/// must appear, and the first-mentioned team takes the first number. Pairs
/// embedded in longer digit runs (dates like 2026-08-07) are rejected.
fn bare_pair(text: &str, query: &ScoreQuery) -> Option<(u32, u32)> {
    let home_pos = find_team_mention(text, &query.home_team)?;
    let away_pos = find_team_mention(text, &query.away_team)?;

    for caps in BARE_PAIR_RE.captures_iter(text) {
        let whole = caps.get(0)?;
        let before = text[..whole.start()].chars().next_back();
        let after = text[whole.end()..].chars().next();
        let boundary_ok = |c: Option<char>| !matches!(c, Some(c) if c.is_ascii_digit() || c == '-');
        if !boundary_ok(before) || !boundary_ok(after) {
            continue;
        }
        let first = capture_u32(&caps, 1)?;
        let second = capture_u32(&caps, 2)?;
        return if home_pos <= away_pos {
            Some((first, second))
        } else {
            Some((second, first))
        };
    }
    None
}

fn find_team_mention(text: &str, team: &str) -> Option<usize> {
    let haystack = teams::normalize(text);
    let full = teams::normalize(team);
    if !full.is_empty() {
        if let Some(pos) = haystack.find(&full) {
            return Some(pos);
        }
    }
    let nickname = full.split(' ').next_back()?;
    if nickname.len() >= 4 {
        return haystack.find(nickname);
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::League;
    use chrono::NaiveDate;

    fn query() -> ScoreQuery {
        ScoreQuery {
            home_team: "Boston Celtics".to_string(),
            away_team: "Los Angeles Lakers".to_string(),
            league: League::Nba,
            date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            narrow: false,
        }
    }

    #[test]
    fn clean_json_blob() {
        let raw = r#"{"home_team":"Boston Celtics","away_team":"Los Angeles Lakers","home_score":98,"away_score":102,"status":"final"}"#;
        let rec = extract_score(raw, &query()).unwrap();
        assert_eq!(rec.home_score, 98);
        assert_eq!(rec.away_score, 102);
        assert!(rec.is_final);
    }

    #[test]
    fn json_with_variant_keys_and_string_scores() {
        let raw = r#"{"homeScore":"98","awayScore":"102"}"#;
        let rec = extract_score(raw, &query()).unwrap();
        assert_eq!(rec.home_score, 98);
        assert_eq!(rec.away_score, 102);
    }

    #[test]
    fn json_inside_code_fence_with_commentary() {
        let raw = "Here is the result you asked for:\n```json\n{\"home_team\": \"Celtics\", \"away_team\": \"Lakers\", \"home_score\": 98, \"away_score\": 102, \"status\": \"Final\"}\n```\nLet me know if you need anything else.";
        let rec = extract_score(raw, &query()).unwrap();
        assert_eq!(rec.home_score, 98);
        assert_eq!(rec.away_score, 102);
    }

    #[test]
    fn json_flipped_teams_is_realigned() {
        let raw = r#"{"home_team":"Los Angeles Lakers","away_team":"Boston Celtics","home_score":102,"away_score":98}"#;
        let rec = extract_score(raw, &query()).unwrap();
        // Query says Celtics are home; provider had it the other way.
        assert_eq!(rec.home_score, 98);
        assert_eq!(rec.away_score, 102);
    }

    #[test]
    fn json_for_a_different_game_is_rejected() {
        let raw = r#"{"home_team":"Chicago Bulls","away_team":"Miami Heat","home_score":95,"away_score":90}"#;
        assert!(extract_score(raw, &query()).is_none());
    }

    #[test]
    fn final_at_line() {
        let rec = extract_score("FINAL LAL @ BOS: 102-98", &query()).unwrap();
        assert_eq!(rec.home_score, 98);
        assert_eq!(rec.away_score, 102);
    }

    #[test]
    fn team_score_pair_line() {
        let rec = extract_score("Last night: Celtics 98, Lakers 102 after a late rally.", &query())
            .unwrap();
        assert_eq!(rec.home_score, 98);
        assert_eq!(rec.away_score, 102);
    }

    #[test]
    fn bare_pair_with_team_windowing() {
        let rec = extract_score("The Celtics fell to the Lakers 98-102 at home.", &query()).unwrap();
        assert_eq!(rec.home_score, 98);
        assert_eq!(rec.away_score, 102);
    }

    #[test]
    fn bare_pair_ignores_dates() {
        let raw = "The Celtics face the Lakers on 2026-04-01; tip-off is at 7.";
        assert!(extract_score(raw, &query()).is_none());
    }

    #[test]
    fn no_numeric_pair_returns_none() {
        assert!(extract_score("The game was postponed due to weather.", &query()).is_none());
        assert!(extract_score("", &query()).is_none());
    }

    #[test]
    fn score_string_validation() {
        assert!(is_valid_score_string("102-98"));
        assert!(is_valid_score_string("0-0"));
        assert!(!is_valid_score_string("102-"));
        assert!(!is_valid_score_string("102-98 F"));
        assert!(!is_valid_score_string("-98"));
    }
}
