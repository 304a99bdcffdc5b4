//! Data processor - cache-aside reads and deferred, serialized mutations

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, error, info, instrument, warn};

use super::mutation_lock::{LockMode, MutationLock};
use crate::domain::cache::Cache;
use crate::domain::record::{Record, RecordRepository};
use crate::domain::DomainError;
use crate::infrastructure::executor::TaskExecutor;
use crate::infrastructure::observability::{
    record_mutation_applied, record_mutation_scheduled, record_process_duration, ReadOutcome,
};

/// Returned by reads when the key is in neither the cache nor the store
pub const NOT_FOUND_MESSAGE: &str = "Data not found.";

/// Returned by reads when the cache or the store failed
pub const FETCH_ERROR_MESSAGE: &str = "Error fetching data.";

/// Configuration for the data processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Total attempts to hand a mutation to the executor
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed delay between attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Total runs of a deferred mutation body; 1 runs it exactly once
    #[serde(default = "default_deferred_attempts")]
    pub deferred_attempts: u32,
    #[serde(default)]
    pub lock_mode: LockMode,
    /// Number of stripes when `lock_mode` is striped
    #[serde(default = "default_lock_stripes")]
    pub lock_stripes: usize,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_deferred_attempts() -> u32 {
    1
}

fn default_lock_stripes() -> usize {
    64
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            deferred_attempts: default_deferred_attempts(),
            lock_mode: LockMode::default(),
            lock_stripes: default_lock_stripes(),
        }
    }
}

impl ProcessorConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_deferred_attempts(mut self, attempts: u32) -> Self {
        self.deferred_attempts = attempts;
        self
    }

    pub fn with_lock_mode(mut self, mode: LockMode) -> Self {
        self.lock_mode = mode;
        self
    }

    pub fn with_lock_stripes(mut self, stripes: usize) -> Self {
        self.lock_stripes = stripes;
        self
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_attempts == 0 {
            return Err(DomainError::configuration(
                "processor max_attempts must be at least 1",
            ));
        }

        if self.deferred_attempts == 0 {
            return Err(DomainError::configuration(
                "processor deferred_attempts must be at least 1",
            ));
        }

        if self.lock_mode == LockMode::Striped && self.lock_stripes == 0 {
            return Err(DomainError::configuration(
                "processor lock_stripes must be at least 1 in striped mode",
            ));
        }

        Ok(())
    }
}

/// A write or delete waiting to be applied
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mutation {
    Update { key: String, value: String },
    Delete { key: String },
}

impl Mutation {
    fn key(&self) -> &str {
        match self {
            Self::Update { key, .. } | Self::Delete { key } => key,
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Final state of a deferred mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    Failed(String),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Handle on a scheduled mutation
///
/// Dropping the ticket leaves the mutation running; awaiting
/// [`MutationTicket::outcome`] reports how it ended.
#[derive(Debug)]
pub struct MutationTicket {
    operation: &'static str,
    key: String,
    receiver: oneshot::Receiver<MutationOutcome>,
}

impl MutationTicket {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Waits for the deferred work to finish
    pub async fn outcome(self) -> MutationOutcome {
        self.receiver.await.unwrap_or_else(|_| {
            MutationOutcome::Failed("mutation ended without reporting an outcome".to_string())
        })
    }
}

struct ProcessorInner {
    repository: Arc<dyn RecordRepository>,
    cache: Arc<dyn Cache>,
    lock: MutationLock,
    config: ProcessorConfig,
}

impl ProcessorInner {
    async fn apply(&self, mutation: &Mutation) -> Result<(), DomainError> {
        match mutation {
            Mutation::Update { key, value } => {
                let record = match self.repository.find_by_key(key).await? {
                    Some(mut record) => {
                        record.set_value(value.as_str());
                        record
                    }
                    None => Record::new(key.as_str(), value.as_str()),
                };

                let saved = self.repository.save(record).await?;
                self.cache.set(key, value).await?;

                info!(key = %key, id = ?saved.id(), "Data updated");
            }
            Mutation::Delete { key } => {
                if let Some(record) = self.repository.find_by_key(key).await? {
                    self.repository.delete(&record).await?;
                }

                self.cache.delete(key).await?;

                info!(key = %key, "Data deleted");
            }
        }

        Ok(())
    }

    /// Runs a mutation body under the lock, up to `deferred_attempts` times
    async fn run(self: Arc<Self>, mutation: Mutation, reply: oneshot::Sender<MutationOutcome>) {
        let operation = mutation.operation();
        let attempts = self.config.deferred_attempts;
        let mut attempt = 1;

        let outcome = loop {
            let result = {
                let _guard = self.lock.acquire(mutation.key()).await;
                self.apply(&mutation).await
            };

            match result {
                Ok(()) => break MutationOutcome::Applied,
                Err(e) if attempt < attempts => {
                    warn!(
                        key = %mutation.key(),
                        operation,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Mutation failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay()).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        key = %mutation.key(),
                        operation,
                        error = %e,
                        "Failed to {} data",
                        operation
                    );
                    break MutationOutcome::Failed(e.to_string());
                }
            }
        };

        record_mutation_applied(operation, outcome.is_applied());
        let _ = reply.send(outcome);
    }
}

/// Cache-aside reads over a durable store, with fire-and-forget writes and
/// deletes applied on a task executor
#[derive(Clone)]
pub struct DataProcessor {
    inner: Arc<ProcessorInner>,
    executor: Arc<TaskExecutor>,
}

impl std::fmt::Debug for DataProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataProcessor")
            .field("config", &self.inner.config)
            .field("cache", &self.inner.cache)
            .field("executor", &self.executor)
            .finish()
    }
}

impl DataProcessor {
    pub fn new(
        repository: Arc<dyn RecordRepository>,
        cache: Arc<dyn Cache>,
        executor: Arc<TaskExecutor>,
        config: ProcessorConfig,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        let lock = MutationLock::new(config.lock_mode, config.lock_stripes);

        Ok(Self {
            inner: Arc::new(ProcessorInner {
                repository,
                cache,
                lock,
                config,
            }),
            executor,
        })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.inner.config
    }

    pub fn executor(&self) -> &Arc<TaskExecutor> {
        &self.executor
    }

    /// Reads the value for `key`, cache first
    ///
    /// Never fails: a missing key yields [`NOT_FOUND_MESSAGE`] and a failing
    /// dependency yields [`FETCH_ERROR_MESSAGE`].
    #[instrument(skip(self))]
    pub async fn process_data(&self, key: &str) -> String {
        let start = Instant::now();

        let (outcome, value) = match self.read_through(key).await {
            Ok(read) => read,
            Err(e) => {
                error!(key = %key, error = %e, "Error fetching data");
                (ReadOutcome::Error, FETCH_ERROR_MESSAGE.to_string())
            }
        };

        record_process_duration(outcome, start.elapsed());
        value
    }

    async fn read_through(&self, key: &str) -> Result<(ReadOutcome, String), DomainError> {
        if let Some(value) = self.inner.cache.get(key).await? {
            debug!(key = %key, "Cache hit");
            return Ok((ReadOutcome::Hit, value));
        }

        match self.inner.repository.find_by_key(key).await? {
            Some(record) => {
                info!(key = %key, "Cache miss, fetched from store");

                if let Err(e) = self.inner.cache.set(key, record.value()).await {
                    warn!(key = %key, error = %e, "Failed to populate cache");
                }

                Ok((ReadOutcome::Miss, record.value().to_string()))
            }
            None => {
                warn!(key = %key, "Data not found");
                Ok((ReadOutcome::NotFound, NOT_FOUND_MESSAGE.to_string()))
            }
        }
    }

    /// Schedules an upsert of `value` under `key`
    ///
    /// Returns once the work is accepted by the executor. Store and cache
    /// failures in the deferred work are logged and reported on the ticket.
    #[instrument(skip(self, value))]
    pub async fn update_data(
        &self,
        key: &str,
        value: &str,
    ) -> Result<MutationTicket, DomainError> {
        self.schedule(Mutation::Update {
            key: key.to_string(),
            value: value.to_string(),
        })
        .await
    }

    /// Schedules removal of `key` from the store and the cache
    #[instrument(skip(self))]
    pub async fn delete_data(&self, key: &str) -> Result<MutationTicket, DomainError> {
        self.schedule(Mutation::Delete {
            key: key.to_string(),
        })
        .await
    }

    async fn schedule(&self, mutation: Mutation) -> Result<MutationTicket, DomainError> {
        let start = Instant::now();
        let operation = mutation.operation();
        let max_attempts = self.inner.config.max_attempts;
        let mut attempt = 1;

        loop {
            let (reply, receiver) = oneshot::channel();
            let job = Arc::clone(&self.inner).run(mutation.clone(), reply);

            match self.executor.submit(job).await {
                Ok(()) => {
                    debug!(key = %mutation.key(), operation, attempt, "Mutation scheduled");
                    record_mutation_scheduled(operation, true, start.elapsed());

                    return Ok(MutationTicket {
                        operation,
                        key: mutation.key().to_string(),
                        receiver,
                    });
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        key = %mutation.key(),
                        operation,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Failed to schedule mutation, retrying"
                    );
                    tokio::time::sleep(self.inner.config.retry_delay()).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        key = %mutation.key(),
                        operation,
                        attempts = attempt,
                        error = %e,
                        "Failed to schedule mutation"
                    );
                    record_mutation_scheduled(operation, false, start.elapsed());
                    return Err(e);
                }
            }
        }
    }

    /// Waits until every scheduled mutation has finished
    pub async fn wait_idle(&self) {
        self.executor.wait_idle().await;
    }

    /// Stops accepting mutations and drains the ones already scheduled
    pub async fn shutdown(&self) {
        self.executor.shutdown().await;
    }
}
