//! Ordered promise collection with result-aggregation policies
//!
//! Index is the implicit key. The collection owns its promises weakly:
//! dropping it neither cancels nor stops anything in flight.

use std::future::Future;

use crate::context::Context;
use crate::error::{PromiseError, PromiseResult};
use crate::fan_in::{fan_in, KeyedResults};
use crate::partial::PartialOutcome;
use crate::promise::Promise;

/// Ordered sequence of promises sharing a value type.
#[derive(Debug)]
pub struct MultiPromise<T> {
    promises: Vec<Promise<T>>,
}

impl<T> Default for MultiPromise<T> {
    fn default() -> Self {
        Self {
            promises: Vec::new(),
        }
    }
}

impl<T> MultiPromise<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an existing promise.
    pub fn push(&mut self, promise: Promise<T>) {
        self.promises.push(promise);
    }

    /// Append a new eager promise running `f`.
    pub fn spawn<F, Fut>(&mut self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = PromiseResult<T>> + Send + 'static,
    {
        self.promises.push(Promise::new(f));
    }

    /// Number of promises in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.promises.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.promises.is_empty()
    }

    /// The tracked promises, in insertion order.
    #[must_use]
    pub fn promises(&self) -> &[Promise<T>] {
        &self.promises
    }

    /// Wait for every promise.
    ///
    /// # Errors
    ///
    /// With zero failures, returns all values re-ordered to the original
    /// index order (completion order across tasks is unspecified). With any
    /// failure, returns the combined error over every failure, index order.
    pub async fn all_results(&self, ctx: &Context) -> PromiseResult<Vec<T>> {
        let mut outcome = self.results(ctx).collect_all().await;
        outcome.sort_by_key();
        if let Some(err) = outcome.error() {
            return Err(err);
        }
        Ok(values_in_key_order(outcome))
    }

    /// Wait concurrently, failing fast.
    ///
    /// # Errors
    ///
    /// Succeeds only if every promise succeeds; stops collecting at the first
    /// failure and returns that single error. Promises already running are
    /// not stopped.
    pub async fn all_results_or_first_error(&self, ctx: &Context) -> PromiseResult<Vec<T>> {
        let mut outcome = self.results(ctx).collect_all_or_first_error().await;
        outcome.sort_by_key();
        if let Some(err) = outcome.error() {
            return Err(err);
        }
        Ok(values_in_key_order(outcome))
    }

    /// The first value to complete successfully, by completion order.
    ///
    /// Slower successes and failures observed before the winner are ignored.
    ///
    /// # Errors
    ///
    /// If no promise succeeds, returns the combined error over every failure;
    /// over an empty collection, returns [`PromiseError::Empty`].
    pub async fn first_result(&self, ctx: &Context) -> PromiseResult<T> {
        let mut outcome = self.results(ctx).collect_first_result().await;
        outcome.sort_by_key();
        if let Some(err) = outcome.error() {
            return Err(err);
        }
        match outcome.into_parts().0.into_iter().next() {
            Some((_, value)) => Ok(value),
            None => Err(PromiseError::Empty),
        }
    }

    /// Wait for every completion and keep both the successes and the
    /// failures, keyed by index and re-sorted to index order. Never fails.
    pub async fn partial_result(&self, ctx: &Context) -> PartialOutcome<usize, T> {
        let mut outcome = self.results(ctx).collect_until_cancelled(ctx).await;
        outcome.sort_by_key();
        outcome
    }

    fn results(&self, ctx: &Context) -> KeyedResults<usize, T> {
        fan_in(ctx, self.promises.iter().cloned().enumerate().collect())
    }
}

fn values_in_key_order<T>(outcome: PartialOutcome<usize, T>) -> Vec<T> {
    outcome
        .into_parts()
        .0
        .into_iter()
        .map(|(_, value)| value)
        .collect()
}

impl<T> FromIterator<Promise<T>> for MultiPromise<T> {
    fn from_iter<I: IntoIterator<Item = Promise<T>>>(iter: I) -> Self {
        Self {
            promises: iter.into_iter().collect(),
        }
    }
}

impl<T> Extend<Promise<T>> for MultiPromise<T> {
    fn extend<I: IntoIterator<Item = Promise<T>>>(&mut self, iter: I) {
        self.promises.extend(iter);
    }
}
