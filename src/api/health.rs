//! Shared run state for the admin API and scheduler: the schedule toggle,
//! an in-flight flag, and the last run's report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::types::RunReport;

pub struct RunStatus {
    schedule_enabled: AtomicBool,
    running: AtomicBool,
    last_run: Mutex<Option<RunReport>>,
}

impl RunStatus {
    pub fn new(schedule_enabled: bool) -> Self {
        Self {
            schedule_enabled: AtomicBool::new(schedule_enabled),
            running: AtomicBool::new(false),
            last_run: Mutex::new(None),
        }
    }

    pub fn schedule_enabled(&self) -> bool {
        self.schedule_enabled.load(Ordering::Relaxed)
    }

    pub fn set_schedule_enabled(&self, enabled: bool) {
        self.schedule_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    pub fn set_last_run(&self, report: RunReport) {
        let mut last = self.last_run.lock().expect("run status lock poisoned");
        *last = Some(report);
    }

    pub fn last_run(&self) -> Option<RunReport> {
        self.last_run
            .lock()
            .expect("run status lock poisoned")
            .clone()
    }
}
