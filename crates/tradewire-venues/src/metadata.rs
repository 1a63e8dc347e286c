//! Populate-once venue metadata

use std::future::Future;

use tokio::sync::OnceCell;
use tradewire_types::ExchangeResult;

/// Lazily fetched, never refreshed venue metadata
///
/// Concurrent first callers share one fetch. A failed fetch leaves the cache
/// empty so the next caller tries again.
#[derive(Debug)]
pub struct MetadataCache<T> {
    cell: OnceCell<T>,
}

impl<T> Default for MetadataCache<T> {
    fn default() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }
}

impl<T> MetadataCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_try_init<F, Fut>(&self, fetch: F) -> ExchangeResult<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ExchangeResult<T>>,
    {
        self.cell.get_or_try_init(fetch).await
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_populated(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tradewire_types::ExchangeError;

    #[tokio::test]
    async fn test_concurrent_first_access_fetches_once() {
        let cache = Arc::new(MetadataCache::<Vec<String>>::new());
        let fetches = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let fetches = fetches.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_try_init(|| async {
                            fetches.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            Ok(vec!["BTCUSDT".to_string()])
                        })
                        .await
                        .map(|v| v.clone())
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), vec!["BTCUSDT".to_string()]);
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried_later() {
        let cache = MetadataCache::<u32>::new();
        let err = cache
            .get_or_try_init(|| async { Err(ExchangeError::transport("down")) })
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Transport { .. }));
        assert!(!cache.is_populated());

        assert_eq!(*cache.get_or_try_init(|| async { Ok(7) }).await.unwrap(), 7);
        assert_eq!(cache.get(), Some(&7));
    }
}
