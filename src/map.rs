//! Keyed promise collection with result-aggregation policies
//!
//! Same policies as [`crate::multi::MultiPromise`], parameterized over an
//! arbitrary key type instead of a sequential index; both façades drive the
//! shared fan-in and collector core. Keys are `Ord` so every aggregate the
//! map produces is ordered by key, never by scheduler accident.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use crate::context::Context;
use crate::error::{PromiseError, PromiseResult};
use crate::fan_in::{fan_in, KeyedResults};
use crate::promise::Promise;

/// Mapping from unique keys to promises sharing a value type.
#[derive(Debug)]
pub struct PromiseMap<K, T> {
    promises: HashMap<K, Promise<T>>,
}

impl<K, T> Default for PromiseMap<K, T> {
    fn default() -> Self {
        Self {
            promises: HashMap::new(),
        }
    }
}

impl<K, T> PromiseMap<K, T>
where
    K: Clone + Eq + Hash + Ord + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing promise under `key`, replacing any previous one.
    pub fn insert(&mut self, key: K, promise: Promise<T>) -> Option<Promise<T>> {
        self.promises.insert(key, promise)
    }

    /// Register a new eager promise running `f` under `key`.
    pub fn spawn<F, Fut>(&mut self, key: K, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = PromiseResult<T>> + Send + 'static,
    {
        self.promises.insert(key, Promise::new(f));
    }

    /// Number of promises in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.promises.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.promises.is_empty()
    }

    /// The promise registered under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&Promise<T>> {
        self.promises.get(key)
    }

    /// Wait for every promise.
    ///
    /// # Errors
    ///
    /// With zero failures, returns every value under its key. With any
    /// failure, returns the combined error over every failure, key order.
    pub async fn all_results(&self, ctx: &Context) -> PromiseResult<HashMap<K, T>> {
        let mut outcome = self.results(ctx).collect_all().await;
        outcome.sort_by_key();
        if let Some(err) = outcome.error() {
            return Err(err);
        }
        Ok(outcome.into_parts().0.into_iter().collect())
    }

    /// Wait concurrently, failing fast.
    ///
    /// # Errors
    ///
    /// Succeeds only if every promise succeeds; stops collecting at the first
    /// failure and returns that single error. Promises already running are
    /// not stopped.
    pub async fn all_results_or_first_error(&self, ctx: &Context) -> PromiseResult<HashMap<K, T>> {
        let mut outcome = self.results(ctx).collect_all_or_first_error().await;
        outcome.sort_by_key();
        if let Some(err) = outcome.error() {
            return Err(err);
        }
        Ok(outcome.into_parts().0.into_iter().collect())
    }

    /// The first entry to complete successfully, by completion order,
    /// reporting which key won.
    ///
    /// # Errors
    ///
    /// If no promise succeeds, returns the combined error over every failure;
    /// over an empty map, returns [`PromiseError::Empty`].
    pub async fn first_result(&self, ctx: &Context) -> PromiseResult<(K, T)> {
        let mut outcome = self.results(ctx).collect_first_result().await;
        outcome.sort_by_key();
        if let Some(err) = outcome.error() {
            return Err(err);
        }
        match outcome.into_parts().0.into_iter().next() {
            Some(found) => Ok(found),
            None => Err(PromiseError::Empty),
        }
    }

    /// Wait for every completion and split it into available values and
    /// per-key errors. Never fails.
    pub async fn partial_result(&self, ctx: &Context) -> (HashMap<K, T>, HashMap<K, PromiseError>) {
        let outcome = self.results(ctx).collect_until_cancelled(ctx).await;
        let (results, errors) = outcome.into_parts();
        (
            results.into_iter().collect(),
            errors.into_iter().collect(),
        )
    }

    fn results(&self, ctx: &Context) -> KeyedResults<K, T> {
        fan_in(
            ctx,
            self.promises
                .iter()
                .map(|(key, promise)| (key.clone(), promise.clone()))
                .collect(),
        )
    }
}

impl<K, T> FromIterator<(K, Promise<T>)> for PromiseMap<K, T>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, Promise<T>)>>(iter: I) -> Self {
        Self {
            promises: iter.into_iter().collect(),
        }
    }
}
