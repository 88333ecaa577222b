//! Process-lifetime model cache keyed by model identifier. Passed to the
//! pipelines explicitly instead of living in a global.
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::core::deadline::with_deadline;
use crate::error::{Error, Result};

pub struct ModelCache<M: ?Sized> {
    models: Mutex<HashMap<String, Arc<M>>>,
    load_timeout: Duration,
}

impl<M: ?Sized + Send + Sync> ModelCache<M> {
    pub fn new(load_timeout: Duration) -> Self {
        Self {
            models: Mutex::new(HashMap::new()),
            load_timeout,
        }
    }

    /// Return the cached model for `id`, loading it with `loader` on first use.
    ///
    /// The lock is held across the load so concurrent callers for the same id
    /// wait for one load instead of starting another. Failed loads are not cached.
    pub async fn get_or_load<F, Fut>(&self, id: &str, loader: F) -> Result<Arc<M>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<M>>>,
    {
        let mut models = self.models.lock().await;
        if let Some(model) = models.get(id) {
            debug!("Model cache hit: {}", id);
            return Ok(Arc::clone(model));
        }
        info!("Loading model '{}'", id);
        let model = with_deadline("model load", self.load_timeout, loader())
            .await
            .map_err(|e| match e {
                Error::ModelLoadFailed { .. } | Error::Timeout { .. } => e,
                other => Error::model_load_failed(id, other),
            })
            .inspect_err(|e| error!("{}", e))?;
        models.insert(id.to_string(), Arc::clone(&model));
        Ok(model)
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.models.lock().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.models.lock().await.len()
    }

    /// Drop a cached model; returns whether it was present
    pub async fn evict(&self, id: &str) -> bool {
        self.models.lock().await.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn loads_once_per_id() {
        let cache: ModelCache<String> = ModelCache::new(Duration::from_secs(5));
        let loads = AtomicUsize::new(0);
        for _ in 0..3 {
            let model = cache
                .get_or_load("mobilenet", || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new("weights".to_string()))
                })
                .await
                .unwrap();
            assert_eq!(model.as_str(), "weights");
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        cache
            .get_or_load("coco-ssd", || async { Ok(Arc::new("other".to_string())) })
            .await
            .unwrap();
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn failed_loads_are_reported_and_not_cached() {
        let cache: ModelCache<String> = ModelCache::new(Duration::from_secs(5));
        let err = cache
            .get_or_load("broken", || async { Err(Error::Processing("corrupt".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ModelLoadFailed { ref id, .. } if id == "broken"));
        assert!(!cache.contains("broken").await);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_load_times_out() {
        let cache: ModelCache<String> = ModelCache::new(Duration::from_millis(100));
        let err = cache
            .get_or_load("slow", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Arc::new(String::new()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn evicted_models_reload() {
        let cache: ModelCache<u32> = ModelCache::new(Duration::from_secs(5));
        cache.get_or_load("m", || async { Ok(Arc::new(1)) }).await.unwrap();
        assert!(cache.evict("m").await);
        let v = cache.get_or_load("m", || async { Ok(Arc::new(2)) }).await.unwrap();
        assert_eq!(*v, 2);
    }
}
