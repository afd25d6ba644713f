//! The run pipeline: load picks, resolve scores through the provider chain,
//! grade, persist, report. One run at a time per process: the duplicate
//! check in the recorder is read-before-write, so overlapping runs for the
//! same date are not safe.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::health::RunStatus;
use crate::db::store::ResultStore;
use crate::error::{AppError, Result};
use crate::evaluator;
use crate::recorder::ResultRecorder;
use crate::resolver::ScoreResolver;
use crate::types::{Outcome, PickResultDraft, RunReport};

pub struct Reconciler {
    store: ResultStore,
    resolver: ScoreResolver,
    recorder: ResultRecorder<ResultStore>,
    status: Arc<RunStatus>,
    run_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        store: ResultStore,
        resolver: ScoreResolver,
        recorder: ResultRecorder<ResultStore>,
        status: Arc<RunStatus>,
    ) -> Self {
        Self {
            store,
            resolver,
            recorder,
            status,
            run_lock: Mutex::new(()),
        }
    }

    /// Run reconciliation for one date, refusing if a run is already active.
    pub async fn try_run_for_date(&self, date: NaiveDate) -> Result<RunReport> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| AppError::RunInProgress)?;

        self.status.set_running(true);
        let result = self.run_inner(date).await;
        self.status.set_running(false);

        if let Ok(report) = &result {
            self.status.set_last_run(report.clone());
        }
        result
    }

    async fn run_inner(&self, date: NaiveDate) -> Result<RunReport> {
        let picks = self.store.picks_for_date(date).await?;
        if picks.is_empty() {
            info!(date = %date, "no picks to check");
            return Ok(RunReport::empty(date));
        }

        let total = picks.len();
        let batch = self.resolver.resolve_batch(date, picks).await;
        let resolved = batch.resolved.len();
        let unresolved = batch.unresolved.len();

        let mut drafts: Vec<PickResultDraft> = Vec::with_capacity(resolved);
        let mut pending = 0usize;
        let mut ungraded = 0usize;
        for (pick, score) in &batch.resolved {
            let outcome = evaluator::evaluate(pick, score);
            match outcome {
                o if o.is_recordable() => {
                    drafts.push(PickResultDraft::from_evaluation(pick, o, score))
                }
                Outcome::Pending => pending += 1,
                _ => {
                    warn!(
                        pick = %pick.pick_text,
                        score = %score.score_string(),
                        source = score.source,
                        "could not grade pick against resolved score"
                    );
                    ungraded += 1;
                }
            }
        }

        let record = self.recorder.record(date, drafts).await?;

        let date_str = date.format("%Y-%m-%d").to_string();
        let message = format!(
            "{date_str}: {total} picks, {resolved} scores resolved, {} recorded, \
             {} already recorded, {} failed, {} invalid, {unresolved} unresolved, \
             {pending} pending, {ungraded} ungraded",
            record.inserted, record.skipped_existing, record.failed, record.invalid,
        );
        info!(
            date = %date_str,
            picks = total,
            resolved,
            unresolved,
            recorded = record.inserted,
            skipped = record.skipped_existing,
            failed = record.failed,
            invalid = record.invalid,
            "reconciliation run complete"
        );

        Ok(RunReport {
            date: date_str,
            picks: total,
            resolved,
            unresolved,
            pending,
            ungraded,
            recorded: record.inserted,
            skipped_existing: record.skipped_existing,
            failed: record.failed,
            invalid: record.invalid,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::test_pool;
    use crate::error::Result as AppResult;
    use crate::providers::{FetchMode, ScoreProvider, ScoreQuery};
    use crate::types::{League, ScoreRecord};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Resolves every query with a fixed home-win final.
    struct FixedProvider;

    #[async_trait]
    impl ScoreProvider for FixedProvider {
        fn id(&self) -> &'static str {
            "fixed"
        }

        fn mode(&self) -> FetchMode {
            FetchMode::PerPick {
                delay: Duration::from_millis(0),
            }
        }

        async fn fetch_score(&self, query: &ScoreQuery) -> AppResult<Option<ScoreRecord>> {
            Ok(Some(ScoreRecord {
                home_team: query.home_team.clone(),
                away_team: query.away_team.clone(),
                home_score: 102,
                away_score: 100,
                league: query.league,
                source: "fixed",
                is_final: true,
            }))
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
    }

    async fn seed_pick(pool: &sqlx::SqlitePool, id: &str, text: &str, bet_type: &str) {
        sqlx::query(
            r#"
            INSERT INTO picks (id, game_date, league, home_team, away_team,
                               pick_text, bet_type, line, confidence, created_at)
            VALUES (?, '2026-04-01', 'NBA', 'Los Angeles Lakers', 'Boston Celtics', ?, ?, NULL, 0.7, '')
            "#,
        )
        .bind(id)
        .bind(text)
        .bind(bet_type)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn reconciler(pool: sqlx::SqlitePool) -> Reconciler {
        let store = ResultStore::new(pool);
        Reconciler::new(
            store.clone(),
            ScoreResolver::new(vec![std::sync::Arc::new(FixedProvider)]),
            ResultRecorder::new(store),
            Arc::new(RunStatus::new(false)),
        )
    }

    #[tokio::test]
    async fn full_run_records_graded_picks() {
        let pool = test_pool().await;
        seed_pick(&pool, "p1", "Lakers ML", "moneyline").await;
        seed_pick(&pool, "p2", "Over 220.5", "total").await;

        let rec = reconciler(pool.clone()).await;
        let report = rec.try_run_for_date(date()).await.unwrap();

        assert_eq!(report.picks, 2);
        assert_eq!(report.resolved, 2);
        // Lakers win 102-100; total 202 under 220.5 loses.
        assert_eq!(report.recorded, 2);
        assert_eq!(report.failed, 0);

        let outcomes: Vec<String> =
            sqlx::query_scalar("SELECT outcome FROM pick_results ORDER BY pick_text")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(outcomes, vec!["won".to_string(), "lost".to_string()]);
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let pool = test_pool().await;
        seed_pick(&pool, "p1", "Lakers ML", "moneyline").await;

        let rec = reconciler(pool.clone()).await;
        rec.try_run_for_date(date()).await.unwrap();
        let second = rec.try_run_for_date(date()).await.unwrap();

        assert_eq!(second.recorded, 0);
        assert_eq!(second.skipped_existing, 1);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pick_results")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn empty_date_reports_zero() {
        let pool = test_pool().await;
        let rec = reconciler(pool).await;
        let report = rec.try_run_for_date(date()).await.unwrap();
        assert_eq!(report.picks, 0);
        assert!(report.message.contains("no picks"));
    }
}
