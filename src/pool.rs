//! Bounded worker pool for fanning out remote calls.
//!
//! A [`BoundedPool`] caps how many units of work may hold a slot at once. It
//! is bound to one sub-task (for example "read every policy body on one
//! instance") and dropped with it. With a size of one it degenerates to
//! strictly sequential execution.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::debug;

use crate::error::{ReconcileError, Result};

/// Counting limiter over concurrently outstanding units of work.
#[derive(Debug, Clone)]
pub struct BoundedPool {
    /// Available slots.
    semaphore: Arc<Semaphore>,
    /// Configured size.
    size: u32,
}

/// A held pool slot. Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "a slot is released as soon as it is dropped"]
pub struct PoolSlot {
    _permit: OwnedSemaphorePermit,
}

impl BoundedPool {
    /// Creates a pool allowing at most `size` outstanding units.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero or does not fit the semaphore.
    pub fn new(size: usize) -> Result<Self> {
        let capped = u32::try_from(size)
            .ok()
            .filter(|s| *s > 0 && (*s as usize) <= Semaphore::MAX_PERMITS)
            .ok_or(ReconcileError::InvalidPoolSize { size })?;

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capped as usize)),
            size: capped,
        })
    }

    /// Returns how many slots are currently held.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        (self.size as usize).saturating_sub(self.semaphore.available_permits())
    }

    /// Waits until fewer than `size` units are outstanding, then takes a slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool was closed.
    pub async fn acquire(&self) -> Result<PoolSlot> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ReconcileError::PoolClosed)?;
        Ok(PoolSlot { _permit: permit })
    }

    /// Waits until every acquired slot has been released.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool was closed.
    pub async fn await_all(&self) -> Result<()> {
        let all = self
            .semaphore
            .acquire_many(self.size)
            .await
            .map_err(|_| ReconcileError::PoolClosed)?;
        drop(all);
        Ok(())
    }

    /// Runs `work` once per item, with at most `size` units in flight.
    ///
    /// A slot is taken before each unit is spawned, so launching blocks while
    /// the pool is saturated. Every unit's output is returned; a failing unit
    /// does not cancel its siblings. Output order is completion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool was closed or a unit panicked.
    pub async fn run<I, F, Fut, T>(&self, items: I, work: F) -> Result<Vec<T>>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut tasks = JoinSet::new();

        for item in items {
            let slot = self.acquire().await?;
            let unit = work(item);
            tasks.spawn(async move {
                let output = unit.await;
                slot.release();
                output
            });
        }

        debug!(units = tasks.len(), pool_size = self.size, "waiting for pool");

        let mut outputs = Vec::with_capacity(tasks.len());
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(output) => outputs.push(output),
                Err(e) if failure.is_none() => {
                    failure = Some(ReconcileError::WorkerPanicked {
                        message: e.to_string(),
                    });
                }
                Err(_) => {}
            }
        }

        self.await_all().await?;

        match failure {
            Some(err) => Err(err.into()),
            None => Ok(outputs),
        }
    }
}

impl PoolSlot {
    /// Returns the slot to the pool, letting one waiting unit proceed.
    pub fn release(self) {
        drop(self);
    }
}
