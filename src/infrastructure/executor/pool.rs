//! Bounded task executor
//!
//! A fixed set of core workers drains a bounded queue. When the queue is full,
//! up to `max_workers - core_workers` burst tasks run the submitted work
//! directly. Beyond that the rejection policy applies.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, Notify, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::{ExecutorConfig, RejectionPolicy};
use crate::domain::DomainError;

/// A unit of deferred work
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Point-in-time executor counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    pub queued: usize,
    pub active: usize,
    pub completed: u64,
    pub rejected: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicUsize,
    active: AtomicUsize,
    completed: AtomicU64,
    rejected: AtomicU64,
    idle: Notify,
}

impl Counters {
    fn is_idle(&self) -> bool {
        self.queued.load(Ordering::SeqCst) == 0 && self.active.load(Ordering::SeqCst) == 0
    }

    fn unqueue(&self) {
        self.queued.fetch_sub(1, Ordering::SeqCst);
        if self.is_idle() {
            self.idle.notify_waiters();
        }
    }

    async fn run(&self, job: Job) {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.queued.fetch_sub(1, Ordering::SeqCst);

        // Run on its own task so a panicking job cannot take the worker down
        if let Err(e) = tokio::spawn(job).await {
            error!(error = %e, "Executor task panicked");
        }

        self.completed.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.is_idle() {
            self.idle.notify_waiters();
        }
    }
}

/// Bounded pool of async workers for fire-and-forget work
pub struct TaskExecutor {
    config: ExecutorConfig,
    sender: RwLock<Option<mpsc::Sender<Job>>>,
    burst: Arc<Semaphore>,
    counters: Arc<Counters>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl TaskExecutor {
    /// Starts the core workers; must be called inside a tokio runtime
    pub fn new(config: ExecutorConfig) -> Result<Self, DomainError> {
        config.validate()?;

        let (sender, receiver) = mpsc::channel::<Job>(config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let workers = (0..config.core_workers)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    format!("{}-{}", config.name_prefix, worker_id),
                    Arc::clone(&receiver),
                    Arc::clone(&counters),
                ))
            })
            .collect();

        info!(
            executor = %config.name_prefix,
            core_workers = config.core_workers,
            max_workers = config.max_workers,
            queue_capacity = config.queue_capacity,
            rejection_policy = ?config.rejection_policy,
            "Task executor started"
        );

        Ok(Self {
            burst: Arc::new(Semaphore::new(config.burst_workers())),
            config,
            sender: RwLock::new(Some(sender)),
            counters,
            workers: Mutex::new(workers),
        })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Submits work for later execution
    ///
    /// Returns once the work is queued or handed to a burst worker. Fails when
    /// the executor is shut down, or when it is saturated under
    /// [`RejectionPolicy::Reject`].
    pub async fn submit<F>(&self, task: F) -> Result<(), DomainError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sender = self
            .sender
            .read()
            .await
            .clone()
            .ok_or_else(|| DomainError::executor("Task executor is shut down"))?;

        let job: Job = Box::pin(task);
        self.counters.queued.fetch_add(1, Ordering::SeqCst);

        let job = match sender.try_send(job) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(_)) => {
                self.counters.unqueue();
                return Err(DomainError::executor("Task executor is shut down"));
            }
            Err(TrySendError::Full(job)) => job,
        };

        if let Ok(permit) = Arc::clone(&self.burst).try_acquire_owned() {
            let counters = Arc::clone(&self.counters);
            debug!(executor = %self.config.name_prefix, "Queue full, starting burst worker");
            tokio::spawn(async move {
                counters.run(job).await;
                drop(permit);
            });
            return Ok(());
        }

        match self.config.rejection_policy {
            RejectionPolicy::Reject => {
                self.counters.unqueue();
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    executor = %self.config.name_prefix,
                    queue_capacity = self.config.queue_capacity,
                    max_workers = self.config.max_workers,
                    "Task rejected, executor saturated"
                );
                Err(DomainError::executor("Task executor is saturated"))
            }
            RejectionPolicy::Block => sender.send(job).await.map_err(|_| {
                self.counters.unqueue();
                DomainError::executor("Task executor is shut down")
            }),
        }
    }

    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            queued: self.counters.queued.load(Ordering::SeqCst),
            active: self.counters.active.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }

    /// Waits until no task is queued or running
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.counters.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.counters.is_idle() {
                return;
            }

            notified.await;
        }
    }

    pub async fn is_shut_down(&self) -> bool {
        self.sender.read().await.is_none()
    }

    /// Stops accepting work and waits for queued and running tasks to finish
    pub async fn shutdown(&self) {
        let Some(sender) = self.sender.write().await.take() else {
            return;
        };
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock().await);
        for result in join_all(workers).await {
            if let Err(e) = result {
                error!(error = %e, "Executor worker failed");
            }
        }

        // Burst tasks hold permits until they finish
        let burst = self.config.burst_workers() as u32;
        if burst > 0 {
            if let Ok(permits) = self.burst.acquire_many(burst).await {
                permits.forget();
            }
        }
        self.burst.close();

        info!(
            executor = %self.config.name_prefix,
            completed = self.stats().completed,
            "Task executor stopped"
        );
    }
}

async fn worker_loop(
    worker: String,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    counters: Arc<Counters>,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };

        match job {
            Some(job) => counters.run(job).await,
            None => break,
        }
    }

    debug!(worker = %worker, "Executor worker exiting");
}
