use std::fmt::Display;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{DateRange, DateResult, Show};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("Unknown show '{0}'")]
    UnknownShow(String),
    #[error("Invalid task range {start} to {end} (show plays {range})")]
    InvalidTaskRange {
        start: NaiveDate,
        end: NaiveDate,
        range: DateRange,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    /// At least one date returned a pricing grid.
    Done,
    /// Every date failed.
    Failed,
    /// No date succeeded and the run was cancelled before all dates were fetched.
    Cancelled,
}

impl TaskStatus {
    /// Derives the final status of a task from its per-date outcomes.
    pub fn from_results(results: &[DateResult]) -> Self {
        if results.iter().any(DateResult::is_success) {
            TaskStatus::Done
        } else if results.iter().any(DateResult::is_cancelled) {
            TaskStatus::Cancelled
        } else {
            TaskStatus::Failed
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Done => write!(f, "done"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A request to fetch pricing for one show across an inclusive date range.
///
/// The range is validated against the show once, in [`Task::new`]; the
/// orchestrator trusts it afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    id: TaskId,
    show: Arc<Show>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    pub(crate) status: TaskStatus,
    pub(crate) results: Vec<DateResult>,
}

impl Task {
    pub fn new(
        id: TaskId,
        show: Arc<Show>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, TaskError> {
        if start_date > end_date
            || !show.date_range.contains(start_date)
            || !show.date_range.contains(end_date)
        {
            return Err(TaskError::InvalidTaskRange {
                start: start_date,
                end: end_date,
                range: show.date_range,
            });
        }

        Ok(Self {
            id,
            show,
            start_date,
            end_date,
            status: TaskStatus::Pending,
            results: Vec::new(),
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn show(&self) -> &Show {
        &self.show
    }

    pub(crate) fn show_handle(&self) -> Arc<Show> {
        Arc::clone(&self.show)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Per-date outcomes in ascending date order, empty until the task has run.
    pub fn results(&self) -> &[DateResult] {
        &self.results
    }

    pub fn failed_dates(&self) -> impl Iterator<Item = &DateResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({}) [{}]",
            self.id,
            self.show.name,
            self.range(),
            self.status
        )
    }
}
