//! Bounded concurrent mappers
//!
//! A [`BoundedMapper`] applies an async function to every item of a vector
//! with at most `pool_size` calls in flight, and returns the results in
//! input order. How the calls are scheduled is up to the implementation.

use crate::error::{Result, UtilError};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

/// Capability to map a function over items with bounded concurrency
///
/// Implementations must return results positionally (result `i` belongs to
/// item `i`) and stop at the first failed call, returning that error.
#[async_trait]
pub trait BoundedMapper: Send + Sync {
    /// Maximum number of calls in flight
    fn pool_size(&self) -> usize;

    /// Apply `function` to each item
    async fn map<A, T, F, Fut>(&self, items: Vec<A>, function: F) -> Result<Vec<T>>
    where
        A: Send + 'static,
        T: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static;
}

fn check_pool_size(pool_size: usize) -> Result<usize> {
    if pool_size == 0 {
        return Err(UtilError::invalid_config("pool size must be at least 1"));
    }
    Ok(pool_size)
}

/// Cooperative mapper: every call runs on the caller's task
///
/// Calls are interleaved at await points, the way green threads would be.
/// Nothing is spawned, so CPU-bound functions do not run in parallel.
#[derive(Debug, Clone, Copy)]
pub struct StreamMapper {
    pool_size: usize,
}

impl StreamMapper {
    /// Create a mapper allowing `pool_size` calls in flight
    pub fn new(pool_size: usize) -> Result<Self> {
        Ok(Self { pool_size: check_pool_size(pool_size)? })
    }
}

#[async_trait]
impl BoundedMapper for StreamMapper {
    fn pool_size(&self) -> usize {
        self.pool_size
    }

    async fn map<A, T, F, Fut>(&self, items: Vec<A>, function: F) -> Result<Vec<T>>
    where
        A: Send + 'static,
        T: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        debug!("Mapping {} items on a cooperative pool of {}", items.len(), self.pool_size);

        // `buffered` yields in submission order; try_collect drops the rest on the first error
        stream::iter(items)
            .map(&function)
            .buffered(self.pool_size)
            .try_collect()
            .await
    }
}

/// Task mapper: every call is spawned onto the tokio runtime
///
/// A semaphore gates how many tasks exist at once. Results are written into
/// a slot per input index as tasks finish, so completion order does not
/// matter. On the first error the remaining tasks are aborted.
#[derive(Debug, Clone, Copy)]
pub struct SpawnMapper {
    pool_size: usize,
}

impl SpawnMapper {
    /// Create a mapper allowing `pool_size` spawned tasks at once
    pub fn new(pool_size: usize) -> Result<Self> {
        Ok(Self { pool_size: check_pool_size(pool_size)? })
    }
}

#[async_trait]
impl BoundedMapper for SpawnMapper {
    fn pool_size(&self) -> usize {
        self.pool_size
    }

    async fn map<A, T, F, Fut>(&self, items: Vec<A>, function: F) -> Result<Vec<T>>
    where
        A: Send + 'static,
        T: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let total = items.len();
        debug!("Spawning {} tasks with at most {} running", total, self.pool_size);

        let function = Arc::new(function);
        let semaphore = Arc::new(Semaphore::new(self.pool_size));
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();

        for (index, item) in items.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| UtilError::TaskFailed(e.to_string()))?;

            // Collect whatever already finished so a failure stops further spawning
            while let Some(joined) = tasks.try_join_next() {
                store_result(&mut slots, joined?)?;
            }

            let function = Arc::clone(&function);
            tasks.spawn(async move {
                let _permit = permit;
                (index, function(item).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(error) = store_result(&mut slots, joined?) {
                tasks.abort_all();
                return Err(error);
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| UtilError::TaskFailed(format!("no result recorded for item {index}")))
            })
            .collect()
    }
}

fn store_result<T>(slots: &mut [Option<T>], (index, result): (usize, Result<T>)) -> Result<()> {
    slots[index] = Some(result?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Runs `items` through `mapper`, recording the peak number of concurrent calls
    async fn peak_concurrency<M: BoundedMapper>(mapper: &M, items: usize) -> usize {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (active_ref, peak_ref) = (Arc::clone(&active), Arc::clone(&peak));
        let results = mapper
            .map((0..items).collect(), move |i: usize| {
                let active = Arc::clone(&active_ref);
                let peak = Arc::clone(&peak_ref);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(i)
                }
            })
            .await
            .unwrap();

        assert_eq!(results, (0..items).collect::<Vec<_>>());
        peak.load(Ordering::SeqCst)
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        assert!(StreamMapper::new(0).unwrap_err().is_config_error());
        assert!(SpawnMapper::new(0).unwrap_err().is_config_error());
    }

    #[tokio::test]
    async fn test_stream_mapper_bounds_concurrency() {
        let mapper = StreamMapper::new(3).unwrap();
        let peak = peak_concurrency(&mapper, 20).await;
        assert!(peak <= 3, "peak concurrency was {peak}");
        assert!(peak >= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_spawn_mapper_bounds_concurrency() {
        let mapper = SpawnMapper::new(4).unwrap();
        let peak = peak_concurrency(&mapper, 32).await;
        assert!(peak <= 4, "peak concurrency was {peak}");
    }

    #[tokio::test]
    async fn test_results_follow_input_order_not_completion_order() {
        let items: Vec<u64> = vec![40, 5, 30, 1, 20];
        let expected = items.clone();

        for mapper_result in [
            StreamMapper::new(5).unwrap().map(items.clone(), slow_identity).await,
            SpawnMapper::new(5).unwrap().map(items.clone(), slow_identity).await,
        ] {
            assert_eq!(mapper_result.unwrap(), expected);
        }
    }

    async fn slow_identity(delay: u64) -> Result<u64> {
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(delay)
    }

    #[tokio::test]
    async fn test_first_error_is_surfaced() {
        let failing = |i: u32| async move {
            if i == 3 {
                Err(UtilError::custom(format!("item {i} failed")))
            } else {
                Ok(i)
            }
        };

        let err = StreamMapper::new(2).unwrap().map((0..10).collect(), failing).await.unwrap_err();
        assert_eq!(err.to_string(), "item 3 failed");

        let err = SpawnMapper::new(2).unwrap().map((0..10).collect(), failing).await.unwrap_err();
        assert_eq!(err.to_string(), "item 3 failed");
    }

    #[tokio::test]
    async fn test_panicking_task_reports_task_failure() {
        let mapper = SpawnMapper::new(2).unwrap();
        let err = mapper
            .map(vec![1_u8, 2, 3], |i: u8| async move {
                assert!(i != 2, "boom");
                Ok(i)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UtilError::TaskFailed(_)));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let out: Vec<u8> = StreamMapper::new(1).unwrap().map(Vec::new(), |i: u8| async move { Ok(i) }).await.unwrap();
        assert!(out.is_empty());
        let out: Vec<u8> = SpawnMapper::new(1).unwrap().map(Vec::new(), |i: u8| async move { Ok(i) }).await.unwrap();
        assert!(out.is_empty());
    }
}
