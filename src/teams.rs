//! Team-name matching. Provider outputs range from full names
//! ("Los Angeles Lakers") through city-only ("Boston") to abbreviations
//! ("LAL"), so matching is deliberately tolerant: substring either way,
//! shared nickname, or abbreviation against word initials / word prefix.

use crate::types::ScoreRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// Lowercase, punctuation stripped, whitespace collapsed.
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_space = true;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

pub fn name_matches(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(&b) || b.contains(&a) {
        return true;
    }
    // Shared nickname: "LA Lakers" vs "Los Angeles Lakers".
    if let (Some(na), Some(nb)) = (a.split(' ').next_back(), b.split(' ').next_back()) {
        if na.len() >= 4 && na == nb {
            return true;
        }
    }
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if short.len() >= 2 && short.len() <= 4 && !short.contains(' ') {
        return abbreviation_matches(short, long);
    }
    false
}

/// "lal" vs "los angeles lakers" (word initials) or "bos" vs
/// "boston celtics" (word prefix).
fn abbreviation_matches(abbr: &str, full: &str) -> bool {
    let initials: String = full
        .split(' ')
        .filter_map(|w| w.chars().next())
        .collect();
    if initials == abbr {
        return true;
    }
    abbr.len() >= 3 && full.split(' ').any(|w| w.starts_with(abbr))
}

/// Which side of the matchup a name refers to. `None` when the name matches
/// neither side or ambiguously matches both.
pub fn side_of(name: &str, home_team: &str, away_team: &str) -> Option<Side> {
    let home = name_matches(name, home_team);
    let away = name_matches(name, away_team);
    match (home, away) {
        (true, false) => Some(Side::Home),
        (false, true) => Some(Side::Away),
        _ => None,
    }
}

/// Align a provider record to a pick's matchup, flipping home/away if the
/// provider reported the teams the other way round. Both sides must match;
/// grading against the wrong game is worse than not grading at all.
pub fn align(record: &ScoreRecord, home_team: &str, away_team: &str) -> Option<ScoreRecord> {
    if name_matches(&record.home_team, home_team) && name_matches(&record.away_team, away_team) {
        return Some(record.clone());
    }
    if name_matches(&record.home_team, away_team) && name_matches(&record.away_team, home_team) {
        let mut flipped = record.clone();
        std::mem::swap(&mut flipped.home_team, &mut flipped.away_team);
        std::mem::swap(&mut flipped.home_score, &mut flipped.away_score);
        return Some(flipped);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::League;

    #[test]
    fn substring_matching() {
        assert!(name_matches("Lakers", "Los Angeles Lakers"));
        assert!(name_matches("Los Angeles Lakers", "lakers"));
        assert!(!name_matches("Celtics", "Los Angeles Lakers"));
    }

    #[test]
    fn nickname_matching() {
        assert!(name_matches("LA Lakers", "Los Angeles Lakers"));
        assert!(name_matches("NY Rangers", "New York Rangers"));
    }

    #[test]
    fn abbreviation_matching() {
        assert!(name_matches("LAL", "Los Angeles Lakers"));
        assert!(name_matches("BOS", "Boston Celtics"));
        assert!(name_matches("NYK", "New York Knicks"));
        assert!(!name_matches("MIA", "Boston Celtics"));
    }

    #[test]
    fn side_resolution() {
        assert_eq!(
            side_of("Lakers", "Los Angeles Lakers", "Boston Celtics"),
            Some(Side::Home)
        );
        assert_eq!(
            side_of("Celtics", "Los Angeles Lakers", "Boston Celtics"),
            Some(Side::Away)
        );
        assert_eq!(side_of("Bulls", "Los Angeles Lakers", "Boston Celtics"), None);
    }

    fn record(home: &str, away: &str, hs: u32, a: u32) -> ScoreRecord {
        ScoreRecord {
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_score: hs,
            away_score: a,
            league: League::Nba,
            source: "test",
            is_final: true,
        }
    }

    #[test]
    fn align_straight_and_flipped() {
        let rec = record("Boston Celtics", "Los Angeles Lakers", 100, 102);

        let aligned = align(&rec, "Celtics", "Lakers").unwrap();
        assert_eq!(aligned.home_score, 100);

        // Pick lists the matchup the other way round.
        let flipped = align(&rec, "Lakers", "Celtics").unwrap();
        assert_eq!(flipped.home_score, 102);
        assert_eq!(flipped.away_score, 100);
        assert!(name_matches(&flipped.home_team, "Lakers"));
    }

    #[test]
    fn align_rejects_wrong_game() {
        let rec = record("Chicago Bulls", "Miami Heat", 95, 90);
        assert!(align(&rec, "Celtics", "Lakers").is_none());
    }
}
