//! Read-only performance aggregation over recorded results. Pushes are
//! excluded from the win-rate denominator: a push decides nothing.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::models::fmt_date;
use crate::error::Result;
use crate::types::League;

#[derive(Clone)]
pub struct PerformanceAggregator {
    pool: SqlitePool,
}

#[derive(Debug, Default, Clone)]
pub struct PerformanceFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub league: Option<League>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub won: u64,
    pub lost: u64,
    pub push: u64,
}

impl Tally {
    fn add(&mut self, outcome: &str, n: u64) {
        match outcome {
            "won" => self.won += n,
            "lost" => self.lost += n,
            "push" => self.push += n,
            _ => {}
        }
    }

    pub fn decisive(&self) -> u64 {
        self.won + self.lost
    }

    /// won / (won + lost); `None` with no decisive results rather than a
    /// misleading 0%.
    pub fn win_rate(&self) -> Option<f64> {
        let decisive = self.decisive();
        (decisive > 0).then(|| self.won as f64 / decisive as f64)
    }

    pub fn record_string(&self) -> String {
        if self.push > 0 {
            format!("{}-{}-{}", self.won, self.lost, self.push)
        } else {
            format!("{}-{}", self.won, self.lost)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordSummary {
    pub league: Option<String>,
    pub won: u64,
    pub lost: u64,
    pub push: u64,
    pub decisive_win_rate: Option<f64>,
    pub record: String,
}

impl RecordSummary {
    fn from_tally(league: Option<String>, tally: Tally) -> Self {
        Self {
            league,
            won: tally.won,
            lost: tally.lost,
            push: tally.push,
            decisive_win_rate: tally.win_rate(),
            record: tally.record_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PerformanceSummary {
    pub overall: RecordSummary,
    pub leagues: Vec<RecordSummary>,
}

impl PerformanceAggregator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// No retry wrapper here: a transient read failure should surface
    /// instead of being retried into stale-looking numbers.
    pub async fn summary(&self, filter: &PerformanceFilter) -> Result<PerformanceSummary> {
        let mut sql = String::from(
            "SELECT league, outcome, COUNT(*) AS n FROM pick_results \
             WHERE outcome IN ('won','lost','push')",
        );
        if filter.from.is_some() {
            sql.push_str(" AND game_date >= ?");
        }
        if filter.to.is_some() {
            sql.push_str(" AND game_date <= ?");
        }
        if filter.league.is_some() {
            sql.push_str(" AND league = ?");
        }
        sql.push_str(" GROUP BY league, outcome");

        let mut query = sqlx::query_as::<_, (String, String, i64)>(&sql);
        if let Some(from) = filter.from {
            query = query.bind(fmt_date(from));
        }
        if let Some(to) = filter.to {
            query = query.bind(fmt_date(to));
        }
        if let Some(league) = filter.league {
            query = query.bind(league.to_string());
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut overall = Tally::default();
        let mut by_league: BTreeMap<String, Tally> = BTreeMap::new();
        for (league, outcome, n) in rows {
            let n = n.max(0) as u64;
            overall.add(&outcome, n);
            by_league.entry(league).or_default().add(&outcome, n);
        }

        Ok(PerformanceSummary {
            overall: RecordSummary::from_tally(None, overall),
            leagues: by_league
                .into_iter()
                .map(|(league, tally)| RecordSummary::from_tally(Some(league), tally))
                .collect(),
        })
    }
}
