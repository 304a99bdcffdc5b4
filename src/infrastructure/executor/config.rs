//! Task executor configuration

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// What to do with a task when the queue and all burst workers are busy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Fail the submission immediately
    #[default]
    Reject,
    /// Wait for queue space
    Block,
}

impl std::str::FromStr for RejectionPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" | "abort" => Ok(Self::Reject),
            "block" | "wait" => Ok(Self::Block),
            _ => Err(DomainError::configuration(format!(
                "Unknown rejection policy: {}. Valid policies: reject, block",
                s
            ))),
        }
    }
}

/// Sizing of the bounded task executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Long-lived workers draining the queue
    #[serde(default = "default_core_workers")]
    pub core_workers: usize,
    /// Upper bound on concurrently running tasks, burst workers included
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Tasks that may wait for a worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub rejection_policy: RejectionPolicy,
    /// Label attached to worker log lines
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

fn default_core_workers() -> usize {
    10
}

fn default_max_workers() -> usize {
    20
}

fn default_queue_capacity() -> usize {
    50
}

fn default_name_prefix() -> String {
    "task-executor".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            core_workers: default_core_workers(),
            max_workers: default_max_workers(),
            queue_capacity: default_queue_capacity(),
            rejection_policy: RejectionPolicy::default(),
            name_prefix: default_name_prefix(),
        }
    }
}

impl ExecutorConfig {
    pub fn new(core_workers: usize, max_workers: usize, queue_capacity: usize) -> Self {
        Self {
            core_workers,
            max_workers,
            queue_capacity,
            ..Default::default()
        }
    }

    pub fn with_rejection_policy(mut self, policy: RejectionPolicy) -> Self {
        self.rejection_policy = policy;
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Number of workers that may start only when the queue is full
    pub fn burst_workers(&self) -> usize {
        self.max_workers.saturating_sub(self.core_workers)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.core_workers == 0 {
            return Err(DomainError::configuration(
                "executor core_workers must be at least 1",
            ));
        }

        if self.max_workers < self.core_workers {
            return Err(DomainError::configuration(format!(
                "executor max_workers ({}) must not be below core_workers ({})",
                self.max_workers, self.core_workers
            )));
        }

        if self.queue_capacity == 0 {
            return Err(DomainError::configuration(
                "executor queue_capacity must be at least 1",
            ));
        }

        Ok(())
    }
}
