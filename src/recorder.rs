//! Idempotent persistence of graded picks. Every sink call goes through the
//! retry policy; a batch that still fails after retries is counted as
//! failed and the remaining batches continue.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{error, warn};

use crate::config::RESULT_BATCH_SIZE;
use crate::error::Result;
use crate::parser;
use crate::retry::RetryPolicy;
use crate::types::PickResultDraft;

/// Persistence seam for recorded results.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Pick texts already recorded for the date (the idempotence key).
    async fn existing_pick_texts(&self, date: NaiveDate) -> Result<HashSet<String>>;

    /// Insert one batch atomically.
    async fn insert_results(&self, drafts: &[PickResultDraft]) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecordReport {
    pub inserted: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub invalid: usize,
}

pub struct ResultRecorder<S> {
    sink: S,
    policy: RetryPolicy,
    batch_size: usize,
}

impl<S: ResultSink> ResultRecorder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            policy: RetryPolicy::persistence(),
            batch_size: RESULT_BATCH_SIZE,
        }
    }

    #[cfg(test)]
    fn with_policy(sink: S, policy: RetryPolicy, batch_size: usize) -> Self {
        Self {
            sink,
            policy,
            batch_size,
        }
    }

    /// Persist the drafts for one date. Fails only when the existence check
    /// itself is unreachable after retries; insert failures degrade to
    /// counts in the report.
    pub async fn record(&self, date: NaiveDate, drafts: Vec<PickResultDraft>) -> Result<RecordReport> {
        let mut report = RecordReport::default();

        let mut valid = Vec::with_capacity(drafts.len());
        for draft in drafts {
            match validate(&draft) {
                Ok(()) => valid.push(draft),
                Err(reason) => {
                    warn!(pick = %draft.pick_text, "dropping invalid result: {reason}");
                    report.invalid += 1;
                }
            }
        }

        if valid.is_empty() {
            return Ok(report);
        }

        let mut seen = self
            .policy
            .run("existing results lookup", || {
                self.sink.existing_pick_texts(date)
            })
            .await?;

        let to_insert: Vec<PickResultDraft> = valid
            .into_iter()
            .filter(|d| {
                if seen.insert(d.pick_text.clone()) {
                    true
                } else {
                    report.skipped_existing += 1;
                    false
                }
            })
            .collect();

        for chunk in to_insert.chunks(self.batch_size) {
            match self
                .policy
                .run("result batch insert", || self.sink.insert_results(chunk))
                .await
            {
                Ok(()) => report.inserted += chunk.len(),
                Err(e) => {
                    error!(batch = chunk.len(), "result batch failed after retries: {e}");
                    report.failed += chunk.len();
                }
            }
        }

        Ok(report)
    }
}

fn validate(draft: &PickResultDraft) -> std::result::Result<(), String> {
    if !draft.outcome.is_recordable() {
        return Err(format!("outcome '{}' is not recordable", draft.outcome));
    }
    if !parser::is_valid_score_string(&draft.final_score) {
        return Err(format!("malformed score string '{}'", draft.final_score));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::types::{League, Outcome};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn draft(text: &str, outcome: Outcome, score: &str) -> PickResultDraft {
        PickResultDraft {
            pick_id: format!("id-{text}"),
            game_date: date(),
            league: League::Nba,
            pick_text: text.to_string(),
            outcome,
            final_score: score.to_string(),
            confidence: 0.6,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), 1.5)
    }

    #[derive(Default)]
    struct MockSink {
        existing: HashSet<String>,
        inserted: Mutex<Vec<String>>,
        insert_calls: AtomicUsize,
        /// Every batch containing this pick text fails with a retryable error.
        poison: Option<String>,
    }

    #[async_trait]
    impl ResultSink for MockSink {
        async fn existing_pick_texts(&self, _date: NaiveDate) -> Result<HashSet<String>> {
            Ok(self.existing.clone())
        }

        async fn insert_results(&self, drafts: &[PickResultDraft]) -> Result<()> {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(poison) = &self.poison {
                if drafts.iter().any(|d| &d.pick_text == poison) {
                    return Err(AppError::Provider {
                        provider: "mock-db",
                        message: "insert failed".to_string(),
                    });
                }
            }
            let mut inserted = self.inserted.lock().unwrap();
            inserted.extend(drafts.iter().map(|d| d.pick_text.clone()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn invalid_drafts_are_dropped_not_coerced() {
        let recorder = ResultRecorder::with_policy(MockSink::default(), fast_policy(), 10);
        let drafts = vec![
            draft("Lakers -3.5", Outcome::Won, "102-100"),
            draft("Over 220.5", Outcome::Unknown, "102-100"),
            draft("Celtics ML", Outcome::Lost, "102-100 F"),
        ];
        let report = recorder.record(date(), drafts).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.invalid, 2);
    }

    #[tokio::test]
    async fn already_recorded_picks_are_skipped() {
        let mut sink = MockSink::default();
        sink.existing.insert("Lakers -3.5".to_string());
        let recorder = ResultRecorder::with_policy(sink, fast_policy(), 10);

        let drafts = vec![
            draft("Lakers -3.5", Outcome::Won, "102-100"),
            draft("Over 220.5", Outcome::Lost, "102-100"),
        ];
        let report = recorder.record(date(), drafts).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped_existing, 1);
    }

    #[tokio::test]
    async fn failed_batch_is_counted_and_other_batches_survive() {
        let sink = MockSink {
            poison: Some("poisoned".to_string()),
            ..Default::default()
        };
        let recorder = ResultRecorder::with_policy(sink, fast_policy(), 10);

        // 25 drafts, batches of 10: the middle batch holds the poison pill.
        let mut drafts: Vec<PickResultDraft> = (0..25)
            .map(|i| draft(&format!("pick-{i}"), Outcome::Won, "100-90"))
            .collect();
        drafts[14] = draft("poisoned", Outcome::Won, "100-90");

        let report = recorder.record(date(), drafts).await.unwrap();
        assert_eq!(report.failed, 10);
        assert_eq!(report.inserted, 15);
        // 3 chunks, the poisoned one retried 3 times: 2 + 3 insert calls.
        assert_eq!(recorder.sink.insert_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn duplicates_within_one_run_collapse() {
        let recorder = ResultRecorder::with_policy(MockSink::default(), fast_policy(), 10);
        let drafts = vec![
            draft("Lakers -3.5", Outcome::Won, "102-100"),
            draft("Lakers -3.5", Outcome::Won, "102-100"),
        ];
        let report = recorder.record(date(), drafts).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped_existing, 1);
    }
}
