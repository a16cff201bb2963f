use chrono::{DateTime, Duration, Local};
use log::debug;
use std::time::Duration as StdDuration;

pub type TaskId = u32;

/// One finished session: the day it started on and how long it lasted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub date: String,
    pub time: u32, // in seconds
}

/// A single task, saved as an entry in the task table. Its records are
/// saved in the record table.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub order: u32,
    pub created_at: DateTime<Local>,
    pub records: Vec<Record>,
    started_at: Option<DateTime<Local>>,
}

impl Task {
    pub fn new(id: TaskId, name: String, order: u32, created_at: DateTime<Local>) -> Task {
        Task {
            id,
            name,
            order,
            created_at,
            records: Vec::new(),
            started_at: None,
        }
    }

    /// Open a session at the given instant. Starting an already started
    /// task moves the session start to `at`.
    pub fn start(&mut self, at: DateTime<Local>) {
        if let Some(previous) = self.started_at {
            debug!(
                "event=task_restart task={} previous_start={}",
                self.id, previous
            );
        }
        self.started_at = Some(at);
    }

    /// Close the open session, appending its record. Stopping a task that
    /// was never started appends nothing and returns None.
    pub fn stop(&mut self, at: DateTime<Local>) -> Option<&Record> {
        let started_at = match self.started_at.take() {
            Some(started_at) => started_at,
            None => {
                debug!("event=task_stop_ignored task={} reason=not_started", self.id);
                return None;
            }
        };

        self.records.push(Record {
            date: calendar_date(&started_at),
            time: whole_seconds(at - started_at),
        });
        self.records.last()
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Sum of all recorded sessions.
    pub fn total_time(&self) -> StdDuration {
        StdDuration::from_secs(self.records.iter().map(|r| u64::from(r.time)).sum())
    }

    /// The class name identifying this task's order on the display.
    pub fn order_class(&self) -> String {
        format!("task-order-{}", self.order)
    }
}

/// The day of the given instant, as YYYY-MM-DD.
pub fn calendar_date(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Whole seconds in a duration, truncated toward zero. Negative durations
/// (a clock that went backwards) count as zero.
pub fn whole_seconds(duration: Duration) -> u32 {
    let seconds = std::cmp::max(0, duration.num_seconds());
    std::cmp::min(seconds, i64::from(u32::MAX)) as u32
}

/// Format an elapsed time as MM:SS. Minutes are not wrapped at the hour.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = whole_seconds(elapsed);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
