//! Daily job scheduling in local time.

use crate::state::SharedState;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("Invalid time of day {0:?}, expected HH:MM")]
    InvalidTime(String),
    #[error("Schedule is empty")]
    Empty,
}

/// Fixed times of day at which a job fires.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySchedule {
    times: Vec<NaiveTime>,
}

impl DailySchedule {
    /// Parse `HH:MM` entries. Duplicates are dropped.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, ScheduleError> {
        let mut times = entries
            .iter()
            .map(|entry| {
                let entry = entry.as_ref().trim();
                NaiveTime::parse_from_str(entry, "%H:%M")
                    .map_err(|_| ScheduleError::InvalidTime(entry.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if times.is_empty() {
            return Err(ScheduleError::Empty);
        }
        times.sort();
        times.dedup();
        Ok(Self { times })
    }

    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    /// First fire time strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        if let Some(time) = self.times.iter().find(|t| **t > now.time()) {
            return today.and_time(*time);
        }
        // `parse` guarantees at least one entry.
        let first = self.times[0];
        (today + ChronoDuration::days(1)).and_time(first)
    }
}

/// Run `job` at every fire time of `schedule` until the app stops.
pub async fn run_daily<F, Fut>(name: &'static str, schedule: DailySchedule, state: SharedState, job: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    info!(job = name, times = ?schedule.times(), "Scheduled job started");

    while state.is_running() {
        let now = Local::now().naive_local();
        let next = schedule.next_after(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        debug!(job = name, next = %next, "Waiting for next run");

        tokio::time::sleep(wait).await;
        if !state.is_running() {
            break;
        }

        info!(job = name, "Running scheduled job");
        job().await;
    }

    warn!(job = name, "Scheduled job stopped");
}
