//! The delayed job scheduler.
//!
//! A time-ordered queue drained by a small worker pool. Jobs run to
//! completion and return follow-up jobs; there is no in-flight state to
//! preserve across a restart beyond what handlers keep in the store.
//!
//! Delivery is at-least-once: a handler error is caught, logged, and
//! re-enqueued with exponential backoff up to a bounded attempt count.
//! Intentional re-enqueueing (the 30-second game poll, highlight polling)
//! is the normal way long-running work perpetuates itself.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use crate::jobs::{Job, ScheduledJob};
use crate::traits::JobRunner;

/// Scheduler-level error retries per job before giving up.
const MAX_ATTEMPTS: u32 = 3;

/// Base delay for error backoff; doubles per attempt.
const RETRY_BASE_SECONDS: i64 = 10;

pub fn retry_backoff(attempt: u32) -> Duration {
    Duration::seconds(RETRY_BASE_SECONDS << attempt.min(5))
}

pub struct JobScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    queue: Mutex<BinaryHeap<QueuedEntry>>,
    notify: tokio::sync::Notify,
    seq: AtomicU64,
}

/// Heap entry ordered earliest-ready-first, FIFO among equal ready times.
struct QueuedEntry {
    scheduled: ScheduledJob,
    seq: u64,
}

impl PartialEq for QueuedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}
impl Eq for QueuedEntry {}

impl PartialOrd for QueuedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the earliest run_at pops first.
        other
            .scheduled
            .run_at
            .cmp(&self.scheduled.run_at)
            .then(other.seq.cmp(&self.seq))
    }
}

enum Next {
    Ready(ScheduledJob),
    WaitUntil(DateTime<Utc>),
    Empty,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(BinaryHeap::new()),
                notify: tokio::sync::Notify::new(),
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// Enqueue for immediate execution.
    pub fn enqueue(&self, job: Job) {
        self.inner.push(ScheduledJob::now(job));
    }

    /// Enqueue after a relative delay.
    pub fn enqueue_in(&self, job: Job, delay: Duration) {
        self.inner.push(ScheduledJob::after(job, delay));
    }

    /// Enqueue at an absolute time (e.g. first poll 15 minutes before
    /// puck drop).
    pub fn enqueue_at(&self, job: Job, run_at: DateTime<Utc>) {
        self.inner.push(ScheduledJob::at(job, run_at));
    }

    pub fn len(&self) -> usize {
        self.inner.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run a worker pool forever. Only returns if every worker task dies,
    /// which does not happen short of runtime shutdown.
    pub async fn run(&self, runner: Arc<dyn JobRunner>, workers: usize) {
        info!(workers, "Scheduler starting");
        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let inner = Arc::clone(&self.inner);
            let runner = Arc::clone(&runner);
            handles.push(tokio::spawn(async move {
                worker_loop(inner, runner, worker_id).await;
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler worker terminated");
            }
        }
    }

    /// Drain the queue in ready-time order without waiting out wall-clock
    /// delays, stopping when no jobs remain. Deterministic single-worker
    /// execution for tests and one-shot runs; production uses `run`.
    pub async fn run_until_idle(&self, runner: &dyn JobRunner) -> usize {
        let mut executed = 0;
        loop {
            let entry = self.inner.queue.lock().unwrap().pop();
            let Some(entry) = entry else {
                return executed;
            };
            executed += 1;
            self.inner.execute(runner, entry.scheduled).await;
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn push(&self, scheduled: ScheduledJob) {
        debug!(
            job = scheduled.job.variant_name(),
            run_at = %scheduled.run_at,
            attempt = scheduled.attempt,
            "Job enqueued"
        );
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.queue
            .lock()
            .unwrap()
            .push(QueuedEntry { scheduled, seq });
        self.notify.notify_waiters();
    }

    fn next(&self) -> Next {
        let mut queue = self.queue.lock().unwrap();
        match queue.peek() {
            None => Next::Empty,
            Some(entry) if entry.scheduled.run_at <= Utc::now() => {
                let entry = queue.pop().expect("peeked entry exists");
                Next::Ready(entry.scheduled)
            }
            Some(entry) => Next::WaitUntil(entry.scheduled.run_at),
        }
    }

    /// Run one job; enqueue its follow-ups, or schedule an error retry.
    async fn execute(&self, runner: &dyn JobRunner, scheduled: ScheduledJob) {
        match runner.run(&scheduled).await {
            Ok(follow_ups) => {
                for follow_up in follow_ups {
                    self.push(follow_up);
                }
            }
            Err(e) => {
                let next_attempt = scheduled.attempt + 1;
                if next_attempt < MAX_ATTEMPTS {
                    let delay = retry_backoff(scheduled.attempt);
                    warn!(
                        job = scheduled.job.variant_name(),
                        attempt = next_attempt,
                        retry_in_seconds = delay.num_seconds(),
                        error = %e,
                        "Job failed, retrying"
                    );
                    self.push(ScheduledJob {
                        run_at: Utc::now() + delay,
                        attempt: next_attempt,
                        job: scheduled.job,
                    });
                } else {
                    error!(
                        job = scheduled.job.variant_name(),
                        attempts = next_attempt,
                        error = %e,
                        "Job failed, giving up"
                    );
                }
            }
        }
    }
}

async fn worker_loop(inner: Arc<Inner>, runner: Arc<dyn JobRunner>, worker_id: usize) {
    loop {
        // Register interest before inspecting the queue so a push landing
        // between the check and the await still wakes this worker.
        let notified = inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        match inner.next() {
            Next::Ready(scheduled) => {
                debug!(
                    worker = worker_id,
                    job = scheduled.job.variant_name(),
                    "Job starting"
                );
                inner.execute(runner.as_ref(), scheduled).await;
            }
            Next::WaitUntil(run_at) => {
                let wait = (run_at - Utc::now())
                    .to_std()
                    .unwrap_or(std::time::Duration::ZERO);
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = &mut notified => {}
                }
            }
            Next::Empty => {
                notified.await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Runner that records execution order and fails on script.
    struct ScriptRunner {
        log: Mutex<Vec<String>>,
        fail_times: Mutex<HashMap<String, u32>>,
    }

    impl ScriptRunner {
        fn new() -> Self {
            Self {
                log: Mutex::new(Vec::new()),
                fail_times: Mutex::new(HashMap::new()),
            }
        }

        fn failing(name: &str, times: u32) -> Self {
            let runner = Self::new();
            runner
                .fail_times
                .lock()
                .unwrap()
                .insert(name.to_string(), times);
            runner
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobRunner for ScriptRunner {
        async fn run(&self, scheduled: &ScheduledJob) -> Result<Vec<ScheduledJob>> {
            let name = scheduled.job.variant_name().to_string();
            {
                let mut fails = self.fail_times.lock().unwrap();
                if let Some(remaining) = fails.get_mut(&name) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(anyhow!("scripted failure"));
                    }
                }
            }
            self.log.lock().unwrap().push(name);
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn drains_in_ready_time_order() {
        let scheduler = JobScheduler::new();
        let runner = ScriptRunner::new();

        scheduler.enqueue_in(Job::AnnounceFinal { game_id: 1 }, Duration::seconds(180));
        scheduler.enqueue_in(
            Job::AnnouncePenalty {
                game_id: 1,
                event_id: 2,
            },
            Duration::seconds(30),
        );
        scheduler.enqueue(Job::ScheduleScan);

        let executed = scheduler.run_until_idle(&runner).await;
        assert_eq!(executed, 3);
        assert_eq!(
            runner.log(),
            vec!["schedule_scan", "announce_penalty", "announce_final"]
        );
    }

    #[tokio::test]
    async fn equal_ready_times_run_fifo() {
        let scheduler = JobScheduler::new();
        let runner = ScriptRunner::new();
        let at = Utc::now();

        scheduler.enqueue_at(Job::ScheduleScan, at);
        scheduler.enqueue_at(Job::PollGame { game_id: 1 }, at);

        scheduler.run_until_idle(&runner).await;
        assert_eq!(runner.log(), vec!["schedule_scan", "poll_game"]);
    }

    #[tokio::test]
    async fn failed_job_retries_then_succeeds() {
        let scheduler = JobScheduler::new();
        let runner = ScriptRunner::failing("schedule_scan", 2);

        scheduler.enqueue(Job::ScheduleScan);
        let executed = scheduler.run_until_idle(&runner).await;

        // Two failures plus the success on the third attempt.
        assert_eq!(executed, 3);
        assert_eq!(runner.log(), vec!["schedule_scan"]);
    }

    #[tokio::test]
    async fn failed_job_gives_up_after_max_attempts() {
        let scheduler = JobScheduler::new();
        let runner = ScriptRunner::failing("schedule_scan", 10);

        scheduler.enqueue(Job::ScheduleScan);
        scheduler.run_until_idle(&runner).await;

        assert!(runner.log().is_empty());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(retry_backoff(0).num_seconds(), 10);
        assert_eq!(retry_backoff(1).num_seconds(), 20);
        assert_eq!(retry_backoff(2).num_seconds(), 40);
        assert_eq!(
            retry_backoff(9).num_seconds(),
            retry_backoff(5).num_seconds()
        );
    }

    #[tokio::test]
    async fn worker_pool_executes_delayed_job() {
        let scheduler = JobScheduler::new();
        let runner = Arc::new(ScriptRunner::new());

        scheduler.enqueue_in(Job::ScheduleScan, Duration::milliseconds(50));

        let worker_view = JobScheduler {
            inner: Arc::clone(&scheduler.inner),
        };
        let runner_dyn: Arc<dyn JobRunner> = runner.clone();
        let handle = tokio::spawn(async move {
            worker_view.run(runner_dyn, 2).await;
        });

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert_eq!(runner.log(), vec!["schedule_scan"]);
        handle.abort();
    }
}
