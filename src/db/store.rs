//! SQLite-backed datastore access. Picks are read-only here; results are
//! written in single-transaction batches so a failed batch leaves nothing
//! half-inserted.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::db::models::{fmt_date, PickResultRow, PickRow};
use crate::error::Result;
use crate::recorder::ResultSink;
use crate::types::{Pick, PickResultDraft};

#[derive(Clone)]
pub struct ResultStore {
    pool: SqlitePool,
}

impl ResultStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn picks_for_date(&self, date: NaiveDate) -> Result<Vec<Pick>> {
        let rows: Vec<PickRow> = sqlx::query_as(
            r#"
            SELECT id, game_date, league, home_team, away_team,
                   pick_text, bet_type, line, confidence
            FROM picks
            WHERE game_date = ?
            ORDER BY id
            "#,
        )
        .bind(fmt_date(date))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PickRow::into_pick).collect()
    }

    pub async fn results_for_date(&self, date: NaiveDate) -> Result<Vec<PickResultRow>> {
        let rows = sqlx::query_as::<_, PickResultRow>(
            r#"
            SELECT id, pick_id, game_date, league, pick_text,
                   outcome, final_score, confidence, recorded_at
            FROM pick_results
            WHERE game_date = ?
            ORDER BY id
            "#,
        )
        .bind(fmt_date(date))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ResultSink for ResultStore {
    async fn existing_pick_texts(&self, date: NaiveDate) -> Result<HashSet<String>> {
        let texts: Vec<String> =
            sqlx::query_scalar("SELECT pick_text FROM pick_results WHERE game_date = ?")
                .bind(fmt_date(date))
                .fetch_all(&self.pool)
                .await?;
        Ok(texts.into_iter().collect())
    }

    async fn insert_results(&self, drafts: &[PickResultDraft]) -> Result<()> {
        let recorded_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for draft in drafts {
            sqlx::query(
                r#"
                INSERT INTO pick_results
                    (pick_id, game_date, league, pick_text, outcome,
                     final_score, confidence, recorded_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&draft.pick_id)
            .bind(fmt_date(draft.game_date))
            .bind(draft.league.to_string())
            .bind(&draft.pick_text)
            .bind(draft.outcome.to_string())
            .bind(&draft.final_score)
            .bind(draft.confidence)
            .bind(&recorded_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // One connection: every pooled connection to `:memory:` would otherwise
    // get its own empty database.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::ResultRecorder;
    use crate::types::{League, Outcome};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
    }

    async fn seed_pick(pool: &SqlitePool, id: &str, text: &str) {
        sqlx::query(
            r#"
            INSERT INTO picks (id, game_date, league, home_team, away_team,
                               pick_text, bet_type, line, confidence, created_at)
            VALUES (?, ?, 'NBA', 'Los Angeles Lakers', 'Boston Celtics', ?, 'spread', -3.5, 0.7, '')
            "#,
        )
        .bind(id)
        .bind(fmt_date(date()))
        .bind(text)
        .execute(pool)
        .await
        .unwrap();
    }

    fn draft(text: &str) -> PickResultDraft {
        PickResultDraft {
            pick_id: format!("id-{text}"),
            game_date: date(),
            league: League::Nba,
            pick_text: text.to_string(),
            outcome: Outcome::Won,
            final_score: "102-100".to_string(),
            confidence: 0.7,
        }
    }

    #[tokio::test]
    async fn picks_round_trip_through_rows() {
        let pool = test_pool().await;
        seed_pick(&pool, "p1", "Lakers -3.5").await;

        let store = ResultStore::new(pool);
        let picks = store.picks_for_date(date()).await.unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].league, League::Nba);
        assert_eq!(picks[0].line, Some(-3.5));
        assert_eq!(picks[0].bet_type, crate::types::BetType::Spread);
    }

    #[tokio::test]
    async fn recording_twice_is_idempotent() {
        let pool = test_pool().await;
        let store = ResultStore::new(pool.clone());
        let recorder = ResultRecorder::new(store.clone());

        let drafts = vec![draft("Lakers -3.5"), draft("Over 220.5")];
        let first = recorder.record(date(), drafts.clone()).await.unwrap();
        assert_eq!(first.inserted, 2);

        let second = recorder.record(date(), drafts).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped_existing, 2);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pick_results")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn results_query_returns_inserted_rows() {
        let pool = test_pool().await;
        let store = ResultStore::new(pool);
        store.insert_results(&[draft("Lakers -3.5")]).await.unwrap();

        let rows = store.results_for_date(date()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].outcome, "won");
        assert_eq!(rows[0].final_score, "102-100");
    }
}
