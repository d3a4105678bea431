//! Bounded worker pool.
//!
//! Limits how many units of work run at once. A submission that finds no
//! free worker waits for one; there is no queue beyond the waiting callers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// The pool has been closed and accepts no more work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("worker pool is closed")]
pub struct PoolClosed;

/// Fixed-size pool of worker slots.
///
/// Cheap to clone; clones share the same slots.
#[derive(Debug, Clone)]
pub struct WorkerPool {
  semaphore: Arc<Semaphore>,
  waiting: Arc<AtomicUsize>,
  size: usize,
}

impl WorkerPool {
  /// Create a pool with `size` workers (at least one).
  pub fn new(size: usize) -> Self {
    let size = size.max(1);
    Self {
      semaphore: Arc::new(Semaphore::new(size)),
      waiting: Arc::new(AtomicUsize::new(0)),
      size,
    }
  }

  /// Wait for a free worker.
  ///
  /// The worker is held until the returned permit is dropped. Dropping the
  /// future before it completes leaves the queue.
  pub async fn acquire(&self) -> Result<WorkerPermit, PoolClosed> {
    let _queued = Queued::enter(&self.waiting);
    let permit = Arc::clone(&self.semaphore)
      .acquire_owned()
      .await
      .map_err(|_| PoolClosed)?;
    Ok(WorkerPermit { _permit: permit })
  }

  /// Stop accepting work. Units already holding a worker finish normally;
  /// waiting and future submissions are rejected.
  pub fn close(&self) {
    self.semaphore.close();
  }

  pub fn is_closed(&self) -> bool {
    self.semaphore.is_closed()
  }

  pub fn size(&self) -> usize {
    self.size
  }

  /// Number of idle workers (approximate).
  pub fn available(&self) -> usize {
    self.semaphore.available_permits()
  }

  /// Number of submissions currently waiting for a worker.
  pub fn waiting(&self) -> usize {
    self.waiting.load(Ordering::SeqCst)
  }
}

/// Counts a submission as waiting for as long as it is alive.
struct Queued<'a>(&'a AtomicUsize);

impl<'a> Queued<'a> {
  fn enter(counter: &'a AtomicUsize) -> Self {
    counter.fetch_add(1, Ordering::SeqCst);
    Self(counter)
  }
}

impl Drop for Queued<'_> {
  fn drop(&mut self) {
    self.0.fetch_sub(1, Ordering::SeqCst);
  }
}

/// A held worker slot, released on drop.
#[derive(Debug)]
pub struct WorkerPermit {
  _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[test]
  fn test_size_is_at_least_one() {
    assert_eq!(WorkerPool::new(0).size(), 1);
    assert_eq!(WorkerPool::new(4).available(), 4);
  }

  #[tokio::test]
  async fn test_permits_are_released_on_drop() {
    let pool = WorkerPool::new(1);
    let permit = pool.acquire().await.unwrap();
    assert_eq!(pool.available(), 0);

    let waiting = tokio::time::timeout(Duration::from_millis(20), pool.acquire()).await;
    assert!(waiting.is_err());

    drop(permit);
    assert!(pool.acquire().await.is_ok());
  }

  #[tokio::test]
  async fn test_waiting_counts_queued_submissions() {
    let pool = WorkerPool::new(1);
    let permit = pool.acquire().await.unwrap();
    assert_eq!(pool.waiting(), 0);

    let queued = {
      let pool = pool.clone();
      tokio::spawn(async move { pool.acquire().await.map(drop) })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.waiting(), 1);

    // An abandoned wait leaves the queue.
    queued.abort();
    let _ = queued.await;
    assert_eq!(pool.waiting(), 0);

    drop(permit);
    assert_eq!(pool.available(), 1);
  }

  #[tokio::test]
  async fn test_closed_pool_rejects() {
    let pool = WorkerPool::new(2);
    pool.close();
    assert!(pool.is_closed());
    assert_eq!(pool.acquire().await.unwrap_err(), PoolClosed);
  }
}
