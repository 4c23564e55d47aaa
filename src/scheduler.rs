use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use cron::Schedule;
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{0}': {1}")]
    Invalid(String, cron::error::Error),
}

/// Parse a cron expression. The classic five-field form (minute resolution)
/// is accepted by pinning the seconds field to 0.
pub fn parse_schedule(expr: &str) -> Result<Schedule, ScheduleError> {
    let expr = expr.trim();
    let normalized = if !expr.starts_with('@') && expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    };
    Schedule::from_str(&normalized).map_err(|e| ScheduleError::Invalid(expr.to_string(), e))
}

/// Work triggered on every scheduled tick.
#[async_trait]
pub trait Job: Send {
    async fn run(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronWatcher {
    schedule: Schedule,
    next: Option<DateTime<Local>>,
}

impl CronWatcher {
    pub fn new(schedule: &Schedule) -> Self {
        let schedule = schedule.clone();
        let next = schedule.upcoming(Local).next();
        Self { schedule, next }
    }

    pub fn next(&self) -> Option<DateTime<Local>> {
        self.next
    }

    /// True once per due tick. Ticks missed while a job was running are
    /// skipped, not replayed.
    pub fn is_ready(&mut self) -> bool {
        match self.next {
            Some(next) if chrono::Local::now() >= next => {
                self.next = self.schedule.upcoming(Local).next();
                true
            }
            Some(_) | None => false,
        }
    }

    /// Run `job` on every tick, forever. The job is awaited before the
    /// schedule is checked again, so runs never overlap.
    pub async fn run(&mut self, job: &mut impl Job) {
        log::info!("Next check scheduled at {:?}", self.next());
        loop {
            if self.is_ready() {
                job.run().await;
                log::debug!("Next check scheduled at {:?}", self.next());
            }
            if self.next.is_none() {
                log::warn!("Schedule has no upcoming ticks, stopping");
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
