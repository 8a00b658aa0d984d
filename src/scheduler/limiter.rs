use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{RebuildError, Result};

/// Caps how many jobs run at the same time.
///
/// Each running job holds one [`JobSlot`]. Acquiring blocks the caller until a
/// slot is free; dropping the slot gives it back, whether the job succeeded,
/// failed or panicked.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    slots: Arc<Semaphore>,
    capacity: usize,
}

/// A held slot. Released on drop.
#[derive(Debug)]
pub struct JobSlot {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(RebuildError::InvalidConfig(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held by a job.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<JobSlot> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RebuildError::Interrupted)?;
        Ok(JobSlot { _permit: permit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(ConcurrencyLimiter::new(0).is_err());
    }

    #[tokio::test]
    async fn slots_are_returned_on_drop() {
        let limiter = ConcurrencyLimiter::new(2).unwrap();
        assert_eq!(limiter.capacity(), 2);

        let a = limiter.acquire().await.unwrap();
        let b = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 0);

        drop(a);
        assert_eq!(limiter.available(), 1);
        drop(b);
        assert_eq!(limiter.available(), 2);
    }

    #[tokio::test]
    async fn acquire_blocks_until_a_slot_frees_up() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();
        let held = limiter.acquire().await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(blocked.is_err(), "second acquire should wait");

        drop(held);
        let slot = tokio::time::timeout(Duration::from_secs(1), limiter.acquire())
            .await
            .expect("slot should be free")
            .unwrap();
        drop(slot);
    }
}
