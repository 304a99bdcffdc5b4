//! Mutual exclusion for deferred writes and deletes

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::domain::DomainError;

/// Granularity of the mutation lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// One lock for every key
    #[default]
    Global,
    /// A fixed set of locks selected by key hash
    Striped,
}

impl std::str::FromStr for LockMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "striped" | "per_key" => Ok(Self::Striped),
            _ => Err(DomainError::configuration(format!(
                "Unknown lock mode: {}. Valid modes: global, striped",
                s
            ))),
        }
    }
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Striped => write!(f, "striped"),
        }
    }
}

/// Serializes mutation bodies
///
/// A key always maps to the same stripe, so mutations of one key never
/// interleave in either mode.
#[derive(Debug)]
pub struct MutationLock {
    stripes: Vec<Mutex<()>>,
}

impl MutationLock {
    pub fn new(mode: LockMode, stripes: usize) -> Self {
        let count = match mode {
            LockMode::Global => 1,
            LockMode::Striped => stripes.max(1),
        };

        Self {
            stripes: (0..count).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn global() -> Self {
        Self::new(LockMode::Global, 1)
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    fn stripe_index(&self, key: &str) -> usize {
        if self.stripes.len() == 1 {
            return 0;
        }

        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    /// Waits for the lock guarding `key`
    pub async fn acquire(&self, key: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_index(key)].lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_lock_mode_from_str() {
        assert_eq!("global".parse::<LockMode>().unwrap(), LockMode::Global);
        assert_eq!("Striped".parse::<LockMode>().unwrap(), LockMode::Striped);
        assert!("none".parse::<LockMode>().is_err());
    }

    #[test]
    fn test_stripe_count() {
        assert_eq!(MutationLock::global().stripe_count(), 1);
        assert_eq!(MutationLock::new(LockMode::Global, 64).stripe_count(), 1);
        assert_eq!(MutationLock::new(LockMode::Striped, 64).stripe_count(), 64);
        assert_eq!(MutationLock::new(LockMode::Striped, 0).stripe_count(), 1);
    }

    #[test]
    fn test_same_key_same_stripe() {
        let lock = MutationLock::new(LockMode::Striped, 16);

        assert_eq!(lock.stripe_index("k1"), lock.stripe_index("k1"));
        assert!(lock.stripe_index("k1") < 16);
    }

    #[tokio::test]
    async fn test_global_lock_blocks_other_keys() {
        let lock = Arc::new(MutationLock::global());
        let guard = lock.acquire("a").await;

        let other = {
            let lock = Arc::clone(&lock);
            tokio::spawn(async move {
                let _guard = lock.acquire("b").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!other.is_finished());

        drop(guard);
        other.await.unwrap();
    }

    #[tokio::test]
    async fn test_striped_lock_blocks_same_key() {
        let lock = Arc::new(MutationLock::new(LockMode::Striped, 8));
        let guard = lock.acquire("k1").await;

        let same = {
            let lock = Arc::clone(&lock);
            tokio::spawn(async move {
                let _guard = lock.acquire("k1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!same.is_finished());

        drop(guard);
        same.await.unwrap();
    }
}
