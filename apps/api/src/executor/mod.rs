//! A fixed pool of workers draining an unbounded task queue.
//!
//! `submit` never blocks the caller. Each job runs on tokio's blocking pool
//! (jobs are CPU/file bound), so a worker only ever awaits its current job.
//! A failing or panicking job fires its `on_error` callback and is logged; it
//! never takes a worker down with it. A panicking callback is caught and logged
//! the same way.
//!
//! # Lifecycle
//! `start` must be called from inside a tokio runtime. `shutdown(true)` stops
//! intake and waits for every queued task; `shutdown(false)` stops intake and
//! returns immediately, letting already-queued tasks finish in the background.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

type Job = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;
type SuccessCallback = Box<dyn FnOnce() + Send + 'static>;
type ErrorCallback = Box<dyn FnOnce(&TaskError) + Send + 'static>;

#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(String),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("executor is shut down")]
    Closed,
}

/// A unit of work plus optional completion callbacks.
pub struct Task {
    job: Job,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl Task {
    pub fn new<F>(job: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            job: Box::new(job),
            on_success: None,
            on_error: None,
        }
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&TaskError) + Send + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    async fn run(self) {
        let Task {
            job,
            on_success,
            on_error,
        } = self;

        let outcome = match tokio::task::spawn_blocking(job).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TaskError::Failed(format!("{e:#}"))),
            Err(join_error) => Err(TaskError::Panicked(join_error.to_string())),
        };

        match outcome {
            Ok(()) => {
                if let Some(callback) = on_success {
                    run_callback("on_success", callback);
                }
            }
            Err(e) => {
                error!("Background task error: {e}");
                if let Some(callback) = on_error {
                    run_callback("on_error", || callback(&e));
                }
            }
        }
    }
}

fn run_callback(which: &str, callback: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
        error!(
            "Task {which} callback panicked: {}",
            panic_message(payload.as_ref())
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

pub struct BatchExecutor {
    sender: Mutex<Option<UnboundedSender<Task>>>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    submitted: AtomicUsize,
}

impl BatchExecutor {
    /// Spawns `worker_count` workers (at least one) on the current runtime.
    pub fn start(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = mpsc::unbounded_channel::<Task>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..worker_count)
            .map(|id| tokio::spawn(worker_loop(id, Arc::clone(&receiver))))
            .collect();

        info!("Batch executor started with {worker_count} workers");

        Self {
            sender: Mutex::new(Some(sender)),
            workers: tokio::sync::Mutex::new(workers),
            worker_count,
            submitted: AtomicUsize::new(0),
        }
    }

    /// Queues one task. Fails only after `shutdown`.
    pub fn submit(&self, task: Task) -> Result<(), TaskError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = guard.as_ref().ok_or(TaskError::Closed)?;
        sender.send(task).map_err(|_| TaskError::Closed)?;
        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Queues every task and returns how many were accepted.
    pub fn submit_batch(&self, tasks: Vec<Task>) -> usize {
        let mut accepted = 0;
        for task in tasks {
            match self.submit(task) {
                Ok(()) => accepted += 1,
                Err(e) => {
                    error!("Batch submission stopped: {e}");
                    break;
                }
            }
        }
        info!("Batch submitted: {accepted} tasks queued");
        accepted
    }

    /// Stops intake. With `wait`, also blocks until every worker has exited,
    /// even when an earlier call already closed the queue.
    pub async fn shutdown(&self, wait: bool) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            drop(sender);
            info!("Batch executor stopped accepting tasks");
        }

        if wait {
            // Held across the joins so a concurrent waiter blocks until the
            // first one has seen every worker exit.
            let mut workers = self.workers.lock().await;
            for handle in workers.drain(..) {
                if let Err(e) = handle.await {
                    error!("Executor worker ended abnormally: {e}");
                }
            }
            info!("Batch executor shut down after draining its queue");
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Total tasks accepted since start.
    pub fn submitted_count(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }
}

async fn worker_loop(id: usize, receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<Task>>>) {
    loop {
        // The lock is held only while waiting for the next task.
        let next = receiver.lock().await.recv().await;
        match next {
            Some(task) => task.run().await,
            None => break,
        }
    }
    debug!("Executor worker {id} exiting");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_every_submitted_task_runs_before_shutdown_returns() {
        let executor = BatchExecutor::start(4);
        let counter = Arc::new(AtomicUsize::new(0));

        let tasks = (0..20)
            .map(|_| {
                let counter = Arc::clone(&counter);
                Task::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        assert_eq!(executor.submit_batch(tasks), 20);
        executor.shutdown(true).await;
        assert_eq!(counter.load(Ordering::SeqCst), 20);
        assert_eq!(executor.submitted_count(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failure_fires_error_callback_and_pool_survives() {
        let executor = BatchExecutor::start(1);
        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(Mutex::new(Vec::<String>::new()));

        let f = Arc::clone(&failures);
        executor
            .submit(
                Task::new(|| Err(anyhow::anyhow!("disk full")))
                    .on_error(move |e| f.lock().unwrap().push(e.to_string())),
            )
            .unwrap();

        let s = Arc::clone(&successes);
        executor
            .submit(Task::new(|| Ok(())).on_success(move || {
                s.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        executor.shutdown(true).await;
        assert_eq!(successes.load(Ordering::SeqCst), 1);
        let failures = failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("disk full"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_task_reports_panicked() {
        let executor = BatchExecutor::start(1);
        let seen = Arc::new(Mutex::new(None::<TaskError>));

        let s = Arc::clone(&seen);
        executor
            .submit(
                Task::new(|| panic!("boom")).on_error(move |e| *s.lock().unwrap() = Some(e.clone())),
            )
            .unwrap();
        let after = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&after);
        executor
            .submit(Task::new(move || {
                a.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        executor.shutdown(true).await;
        assert!(matches!(*seen.lock().unwrap(), Some(TaskError::Panicked(_))));
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_submit_returns_before_task_completes() {
        let executor = BatchExecutor::start(2);
        let done = Arc::new(AtomicUsize::new(0));

        let d = Arc::clone(&done);
        executor
            .submit(Task::new(move || {
                std::thread::sleep(Duration::from_millis(200));
                d.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        assert_eq!(done.load(Ordering::SeqCst), 0);
        executor.shutdown(true).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_submit_after_shutdown_is_rejected() {
        let executor = BatchExecutor::start(2);
        executor.shutdown(false).await;
        let err = executor.submit(Task::new(|| Ok(()))).unwrap_err();
        assert!(matches!(err, TaskError::Closed));
        assert_eq!(executor.submit_batch(vec![Task::new(|| Ok(()))]), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_callbacks_leave_the_worker_alive() {
        let executor = BatchExecutor::start(1);
        let ran = Arc::new(AtomicUsize::new(0));

        executor
            .submit(Task::new(|| Ok(())).on_success(|| panic!("success callback")))
            .unwrap();
        executor
            .submit(
                Task::new(|| Err(anyhow::anyhow!("bad input")))
                    .on_error(|_| panic!("error callback")),
            )
            .unwrap();

        // Give the single worker time to hit both callbacks.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let r = Arc::clone(&ran);
        let accepted = executor.submit(Task::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        assert!(accepted.is_ok());

        executor.shutdown(true).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_waiting_shutdown_after_non_waiting_still_drains() {
        let executor = BatchExecutor::start(1);
        let done = Arc::new(AtomicUsize::new(0));

        let d = Arc::clone(&done);
        executor
            .submit(Task::new(move || {
                std::thread::sleep(Duration::from_millis(300));
                d.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        executor.shutdown(false).await;
        executor.shutdown(true).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_worker_count_is_at_least_one() {
        let executor = BatchExecutor::start(0);
        assert_eq!(executor.worker_count(), 1);
        executor.shutdown(true).await;
    }
}
