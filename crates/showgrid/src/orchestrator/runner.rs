use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use super::config::{ConfigError, OrchestratorConfig};
use crate::pricing::{FetchError, PricingFetcher};
use crate::task::{Task, TaskId, TaskStatus};
use crate::types::{DateResult, Show};

/// Progress notification emitted while [`Orchestrator::run_all`] executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    TaskStarted {
        task: TaskId,
        dates: usize,
    },
    DateFinished {
        task: TaskId,
        date: NaiveDate,
        error: Option<FetchError>,
    },
    TaskFinished {
        task: TaskId,
        status: TaskStatus,
    },
}

/// One `fetch(show, date)` call. `task` and `slot` locate the result it owns.
struct FetchOp {
    task: usize,
    slot: usize,
    show: Arc<Show>,
    date: NaiveDate,
}

/// Runs scrape tasks against a [`PricingFetcher`] with a bounded number of
/// fetches in flight.
pub struct Orchestrator {
    fetcher: Arc<dyn PricingFetcher>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
    events: Option<UnboundedSender<RunEvent>>,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<dyn PricingFetcher>,
        config: OrchestratorConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            fetcher,
            config: config.validate()?,
            cancel: CancellationToken::new(),
            events: None,
        })
    }

    /// Sends [`RunEvent`]s to `tx` as tasks progress.
    pub fn with_events(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Cancelling this token stops new fetches from being dispatched.
    /// Fetches already in flight run to completion.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            // The receiver going away only means nobody is watching.
            let _ = tx.send(event);
        }
    }

    /// Fetches every date of every task and returns the tasks, in input order,
    /// with their status and results filled in.
    ///
    /// All dates of all tasks share one pool of `max_concurrency` fetches and
    /// complete in any order. Each fetch writes only its own slot; a task's
    /// results are assembled in ascending date order once its last date is in.
    /// Fetch failures are recorded on their date and never abort the run.
    pub async fn run_all(&self, mut tasks: Vec<Task>) -> Vec<Task> {
        let mut slots: Vec<Vec<Option<DateResult>>> = Vec::with_capacity(tasks.len());
        let mut remaining: Vec<usize> = Vec::with_capacity(tasks.len());
        let mut ops = Vec::new();

        for (task_idx, task) in tasks.iter_mut().enumerate() {
            let show = task.show_handle();
            let dates: Vec<NaiveDate> = task.range().days().collect();

            ops.extend(dates.iter().enumerate().map(|(slot, &date)| FetchOp {
                task: task_idx,
                slot,
                show: Arc::clone(&show),
                date,
            }));
            slots.push(vec![None; dates.len()]);
            remaining.push(dates.len());

            task.status = TaskStatus::Running;
            task.results.clear();
            self.emit(RunEvent::TaskStarted {
                task: task.id(),
                dates: dates.len(),
            });
        }

        log::info!(
            "Running {} task(s): {} fetch(es), at most {} at a time",
            tasks.len(),
            ops.len(),
            self.config.max_concurrency
        );

        let fetcher = &self.fetcher;
        let cancel = &self.cancel;
        let timeout = self.config.fetch_timeout;

        let mut completions = stream::iter(ops)
            .map(|op| async move {
                let result = if cancel.is_cancelled() {
                    DateResult::failure(op.date, FetchError::Cancelled)
                } else {
                    fetch_date(fetcher.as_ref(), &op.show, op.date, timeout).await
                };
                (op.task, op.slot, result)
            })
            .buffer_unordered(self.config.max_concurrency);

        while let Some((task_idx, slot, result)) = completions.next().await {
            let task = &mut tasks[task_idx];
            self.emit(RunEvent::DateFinished {
                task: task.id(),
                date: result.date,
                error: result.error.clone(),
            });

            slots[task_idx][slot] = Some(result);
            remaining[task_idx] -= 1;
            if remaining[task_idx] > 0 {
                continue;
            }

            task.results = std::mem::take(&mut slots[task_idx])
                .into_iter()
                .flatten()
                .collect();
            task.status = TaskStatus::from_results(&task.results);

            let failed = task.failed_dates().count();
            if failed > 0 {
                log::warn!(
                    "Task {} ({}) finished {}: {} of {} date(s) without pricing",
                    task.id(),
                    task.show().name,
                    task.status(),
                    failed,
                    task.results().len()
                );
            } else {
                log::info!(
                    "Task {} ({}) finished {}",
                    task.id(),
                    task.show().name,
                    task.status()
                );
            }
            self.emit(RunEvent::TaskFinished {
                task: task.id(),
                status: task.status(),
            });
        }

        tasks
    }
}

async fn fetch_date(
    fetcher: &dyn PricingFetcher,
    show: &Show,
    date: NaiveDate,
    timeout: Duration,
) -> DateResult {
    match tokio::time::timeout(timeout, fetcher.fetch(show, date)).await {
        Ok(Ok(rows)) => DateResult::success(date, rows),
        Ok(Err(e)) => {
            log::warn!("Failed to fetch {} on {}: {}", show.name, date, e);
            DateResult::failure(date, e)
        }
        Err(_) => {
            log::warn!("Fetching {} on {} timed out", show.name, date);
            DateResult::failure(date, FetchError::Timeout(timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DateRange, Price, PriceRow};
    use async_trait::async_trait;
    use chrono::Datelike;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn show(id: &str) -> Arc<Show> {
        Arc::new(Show {
            id: id.to_string(),
            name: id.to_uppercase(),
            url: format!("https://www.broadwayinbound.com/{id}"),
            date_range: DateRange::new(date(2024, 5, 1), date(2024, 5, 31)),
        })
    }

    fn task(id: u64, show_id: &str, start: u32, end: u32) -> Task {
        Task::new(
            TaskId(id),
            show(show_id),
            date(2024, 5, start),
            date(2024, 5, end),
        )
        .unwrap()
    }

    fn config(max_concurrency: usize) -> OrchestratorConfig {
        OrchestratorConfig {
            max_concurrency,
            ..Default::default()
        }
    }

    #[derive(Default)]
    struct FakeFetcher {
        fail_show: Option<String>,
        fail_on: Vec<NaiveDate>,
        delay_ms: Option<fn(NaiveDate) -> u64>,
        cancel_after_first: Option<CancellationToken>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl PricingFetcher for FakeFetcher {
        async fn fetch(&self, show: &Show, date: NaiveDate) -> Result<Vec<PriceRow>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(token) = &self.cancel_after_first {
                token.cancel();
            }
            if let Some(delay) = self.delay_ms {
                tokio::time::sleep(Duration::from_millis(delay(date))).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_show.as_deref() == Some(show.id.as_str()) || self.fail_on.contains(&date)
            {
                return Err(FetchError::Failed(format!("no grid for {date}")));
            }
            Ok(vec![
                PriceRow::new("Orchestra", Price::whole(100 + date.day() as u64)),
                PriceRow::new("Balcony", Price::whole(50)),
            ])
        }
    }

    #[tokio::test]
    async fn test_one_result_per_day_for_every_task() {
        let orchestrator = Orchestrator::new(Arc::new(FakeFetcher::default()), config(4)).unwrap();

        let tasks = orchestrator
            .run_all(vec![task(1, "wicked", 1, 7), task(2, "hamilton", 10, 10)])
            .await;

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id(), TaskId(1));
        assert_eq!(tasks[0].results().len(), 7);
        assert_eq!(tasks[1].results().len(), 1);
        assert!(tasks.iter().all(|t| t.status() == TaskStatus::Done));
        assert_eq!(tasks[1].results()[0].rows[0].price, Price::whole(110));
    }

    #[tokio::test]
    async fn test_results_ascend_despite_out_of_order_completion() {
        let fetcher = FakeFetcher {
            // Later dates finish first.
            delay_ms: Some(|d: NaiveDate| (32 - d.day() as u64) * 5),
            ..Default::default()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(Arc::new(fetcher), config(10))
            .unwrap()
            .with_events(tx);

        let tasks = orchestrator.run_all(vec![task(1, "wicked", 1, 6)]).await;

        let dates: Vec<_> = tasks[0].results().iter().map(|r| r.date).collect();
        let expected: Vec<_> = (1..=6).map(|d| date(2024, 5, d)).collect();
        assert_eq!(dates, expected);

        let mut completion_order = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let RunEvent::DateFinished { date, .. } = event {
                completion_order.push(date);
            }
        }
        assert_eq!(completion_order.len(), 6);
        assert_eq!(completion_order.first(), Some(&date(2024, 5, 6)));
        assert_ne!(completion_order, expected);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_date_and_task() {
        let fetcher = FakeFetcher {
            fail_show: Some("flop".to_string()),
            fail_on: vec![date(2024, 5, 2)],
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(Arc::new(fetcher), config(3)).unwrap();

        let tasks = orchestrator
            .run_all(vec![task(1, "flop", 1, 3), task(2, "wicked", 1, 3)])
            .await;

        let flop = &tasks[0];
        assert_eq!(flop.status(), TaskStatus::Failed);
        assert_eq!(flop.results().len(), 3);
        assert!(flop.results().iter().all(|r| r.error.is_some()));

        let wicked = &tasks[1];
        assert_eq!(wicked.status(), TaskStatus::Done);
        assert_eq!(wicked.results().len(), 3);
        let failed: Vec<_> = wicked.failed_dates().map(|r| r.date).collect();
        assert_eq!(failed, vec![date(2024, 5, 2)]);
        assert!(wicked.results()[1].rows.is_empty());
        assert!(matches!(
            wicked.results()[1].error,
            Some(FetchError::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_never_exceeds_max_concurrency() {
        let fetcher = Arc::new(FakeFetcher {
            delay_ms: Some(|_: NaiveDate| 20),
            ..Default::default()
        });
        let orchestrator = Orchestrator::new(fetcher.clone(), config(3)).unwrap();

        let tasks = orchestrator
            .run_all(vec![task(1, "wicked", 1, 6), task(2, "hamilton", 1, 6)])
            .await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 12);
        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 3);
        assert!(tasks.iter().all(|t| t.results().len() == 6));
    }

    #[tokio::test]
    async fn test_timeout_fails_only_that_date() {
        let fetcher = FakeFetcher {
            delay_ms: Some(|d: NaiveDate| if d.day() == 2 { 2_000 } else { 0 }),
            ..Default::default()
        };
        let config = OrchestratorConfig {
            max_concurrency: 3,
            fetch_timeout: Duration::from_millis(50),
        };
        let orchestrator = Orchestrator::new(Arc::new(fetcher), config).unwrap();

        let tasks = orchestrator.run_all(vec![task(1, "wicked", 1, 3)]).await;

        let results = tasks[0].results();
        assert!(results[0].is_success());
        assert_eq!(
            results[1].error,
            Some(FetchError::Timeout(Duration::from_millis(50)))
        );
        assert!(results[2].is_success());
        assert_eq!(tasks[0].status(), TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_cancelled_before_run_dispatches_nothing() {
        let fetcher = Arc::new(FakeFetcher::default());
        let orchestrator = Orchestrator::new(fetcher.clone(), config(2)).unwrap();
        orchestrator.cancellation_token().cancel();

        let tasks = orchestrator.run_all(vec![task(1, "wicked", 1, 4)]).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(tasks[0].results().len(), 4);
        assert!(tasks[0].results().iter().all(DateResult::is_cancelled));
        assert_eq!(tasks[0].status(), TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_mid_run_lets_in_flight_fetch_finish() {
        let token = CancellationToken::new();
        let fetcher = Arc::new(FakeFetcher {
            cancel_after_first: Some(token.clone()),
            delay_ms: Some(|_: NaiveDate| 10),
            ..Default::default()
        });
        let orchestrator = Orchestrator::new(fetcher.clone(), config(1))
            .unwrap()
            .with_cancellation(token);

        let tasks = orchestrator.run_all(vec![task(1, "wicked", 1, 4)]).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        let results = tasks[0].results();
        assert!(results[0].is_success());
        assert!(results[1..].iter().all(DateResult::is_cancelled));
        assert_eq!(tasks[0].status(), TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_emits_task_lifecycle_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(Arc::new(FakeFetcher::default()), config(2))
            .unwrap()
            .with_events(tx);

        orchestrator
            .run_all(vec![task(1, "wicked", 1, 2), task(2, "hamilton", 5, 7)])
            .await;
        drop(orchestrator);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(
            events[..2],
            [
                RunEvent::TaskStarted {
                    task: TaskId(1),
                    dates: 2
                },
                RunEvent::TaskStarted {
                    task: TaskId(2),
                    dates: 3
                },
            ]
        );
        let finished_dates = events
            .iter()
            .filter(|e| matches!(e, RunEvent::DateFinished { .. }))
            .count();
        assert_eq!(finished_dates, 5);
        assert!(events.contains(&RunEvent::TaskFinished {
            task: TaskId(2),
            status: TaskStatus::Done
        }));
    }

    #[tokio::test]
    async fn test_empty_run() {
        let orchestrator = Orchestrator::new(Arc::new(FakeFetcher::default()), config(2)).unwrap();
        assert!(orchestrator.run_all(Vec::new()).await.is_empty());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = Orchestrator::new(Arc::new(FakeFetcher::default()), config(0));
        assert!(matches!(result, Err(ConfigError::ZeroConcurrency)));
    }
}
