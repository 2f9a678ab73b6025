//! Preload Module
//!
//! Value loaders consumed by `CacheEngine::preload_data` and the report it
//! produces.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

/// Future produced by a [`ValueLoader`].
pub type LoaderFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// Zero-argument async producer of a value to cache.
pub type ValueLoader = Box<dyn FnOnce() -> LoaderFuture + Send>;

/// Wraps an async producer of any serializable type into a [`ValueLoader`].
///
/// # Example
/// ```ignore
/// let loaders = vec![
///     ("accounts".to_string(), loader(|| async { fetch_accounts().await })),
/// ];
/// engine.preload_data(loaders, CacheOptions::default()).await?;
/// ```
pub fn loader<T, F, Fut>(load: F) -> ValueLoader
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    Box::new(move || {
        async move {
            let value = load().await?;
            Ok(serde_json::to_value(value)?)
        }
        .boxed()
    })
}

// == Preload Report ==
/// Outcome of a best-effort preload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreloadReport {
    /// Keys whose loader succeeded and whose value was cached
    pub loaded: Vec<String>,
    pub failed: Vec<PreloadFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreloadFailure {
    pub key: String,
    pub reason: String,
}

impl PreloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
