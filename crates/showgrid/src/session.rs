use std::sync::Arc;

use chrono::NaiveDate;

use crate::catalog::{CatalogError, CatalogSource};
use crate::orchestrator::Orchestrator;
use crate::task::{Task, TaskError, TaskId};
use crate::types::Show;
use crate::utils::TaskSpec;

/// Application state: the loaded show catalog and the user's tasks.
///
/// A session only exists once the catalog has loaded, so no task can be
/// created against a missing or partial show list.
#[derive(Debug)]
pub struct Session {
    shows: Vec<Arc<Show>>,
    tasks: Vec<Task>,
    next_id: u64,
}

impl Session {
    pub async fn load<C: CatalogSource + ?Sized>(catalog: &C) -> Result<Self, CatalogError> {
        Ok(Self::from_shows(catalog.load_shows().await?))
    }

    pub fn from_shows(shows: Vec<Show>) -> Self {
        Self {
            shows: shows.into_iter().map(Arc::new).collect(),
            tasks: Vec::new(),
            next_id: 1,
        }
    }

    pub fn shows(&self) -> &[Arc<Show>] {
        &self.shows
    }

    pub fn find_show(&self, id: &str) -> Option<&Arc<Show>> {
        let id = id.trim_matches('/');
        self.shows.iter().find(|s| s.id == id)
    }

    pub fn add_task(
        &mut self,
        show_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<TaskId, TaskError> {
        let show = self
            .find_show(show_id)
            .cloned()
            .ok_or_else(|| TaskError::UnknownShow(show_id.to_string()))?;

        let id = TaskId(self.next_id);
        let task = Task::new(id, show, start_date, end_date)?;
        self.next_id += 1;
        self.tasks.push(task);
        Ok(id)
    }

    pub fn add_spec(&mut self, spec: &TaskSpec) -> Result<TaskId, TaskError> {
        self.add_task(&spec.show_id, spec.start_date, spec.end_date)
    }

    pub fn remove_task(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id() != id);
        self.tasks.len() != before
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Runs every task of the session and keeps the finished tasks.
    pub async fn run(&mut self, orchestrator: &Orchestrator) -> &[Task] {
        let tasks = std::mem::take(&mut self.tasks);
        self.tasks = orchestrator.run_all(tasks).await;
        &self.tasks
    }
}
