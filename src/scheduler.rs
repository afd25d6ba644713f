//! Daily scheduled reconciliation. Wakes once a minute; after the
//! configured local wall-clock time it settles the previous day's picks
//! (games finish overnight relative to a morning run). The toggle lives in
//! the shared RunStatus so the admin API can flip it at runtime.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveTime};
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::api::health::RunStatus;
use crate::config::SCHEDULER_TICK_SECS;
use crate::error::AppError;
use crate::reconciler::Reconciler;

pub struct DailyScheduler {
    reconciler: Arc<Reconciler>,
    status: Arc<RunStatus>,
    at: NaiveTime,
}

impl DailyScheduler {
    pub fn new(reconciler: Arc<Reconciler>, status: Arc<RunStatus>, at: NaiveTime) -> Self {
        Self {
            reconciler,
            status,
            at,
        }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(SCHEDULER_TICK_SECS));
        let mut last_fired: Option<NaiveDate> = None;

        loop {
            ticker.tick().await;

            if !self.status.schedule_enabled() {
                continue;
            }

            let now = Local::now();
            let today = now.date_naive();
            if last_fired == Some(today) || now.time() < self.at {
                continue;
            }

            let target = match today.pred_opt() {
                Some(d) => d,
                None => continue,
            };

            info!(date = %target, "scheduled result check starting");
            match self.reconciler.try_run_for_date(target).await {
                Ok(report) => {
                    info!("{}", report.message);
                    last_fired = Some(today);
                }
                Err(AppError::RunInProgress) => {
                    // A manual run is in flight; try again next tick.
                    debug!("scheduled run deferred: run in progress");
                }
                Err(e) => {
                    error!("scheduled run failed: {e}");
                    // Counted as fired so a failing provider is not retried
                    // every minute for the rest of the day.
                    last_fired = Some(today);
                }
            }
        }
    }
}
