//! Accumulation of fan-in output into keyed successes and failures

use crate::context::Context;
use crate::error::PromiseError;
use crate::fan_in::{KeyedOutcome, KeyedResults};

/// Keyed successes and keyed failures accumulated from a fan-in sequence.
///
/// Produced fresh per aggregation call; entries are in consumption order
/// unless a caller re-sorts them by key.
#[derive(Debug, Clone)]
pub struct PartialOutcome<K, T> {
    results: Vec<(K, T)>,
    errors: Vec<(K, PromiseError)>,
}

impl<K, T> Default for PartialOutcome<K, T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<K, T> PartialOutcome<K, T> {
    /// Keyed successes.
    #[must_use]
    pub fn results(&self) -> &[(K, T)] {
        &self.results
    }

    /// Keyed failures.
    #[must_use]
    pub fn errors(&self) -> &[(K, PromiseError)] {
        &self.errors
    }

    /// Split into the success and failure lists.
    #[must_use]
    pub fn into_parts(self) -> (Vec<(K, T)>, Vec<(K, PromiseError)>) {
        (self.results, self.errors)
    }

    /// The successful values, keys stripped.
    #[must_use]
    pub fn available_results(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.results.iter().map(|(_, value)| value.clone()).collect()
    }

    /// Combined error over every recorded failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<PromiseError> {
        PromiseError::aggregate(self.errors.iter().map(|(_, err)| err.clone()).collect())
    }

    pub(crate) fn sort_by_key(&mut self)
    where
        K: Ord,
    {
        self.results.sort_by(|a, b| a.0.cmp(&b.0));
        self.errors.sort_by(|a, b| a.0.cmp(&b.0));
    }

    fn record(&mut self, item: KeyedOutcome<K, T>) {
        match item.outcome {
            Ok(value) => self.results.push((item.key, value)),
            Err(err) => self.errors.push((item.key, err)),
        }
    }
}

impl<K, T> KeyedResults<K, T> {
    /// Consume every outcome, success and failure alike.
    pub async fn collect_all(mut self) -> PartialOutcome<K, T> {
        let mut acc = PartialOutcome::default();
        while let Some(item) = self.next().await {
            acc.record(item);
        }
        acc
    }

    /// Consume until the first failure.
    ///
    /// On failure the partial success list is discarded and only that one
    /// error is recorded; returning early drops the receiver, which unblocks
    /// every remaining producer.
    pub async fn collect_all_or_first_error(mut self) -> PartialOutcome<K, T> {
        let mut acc = PartialOutcome::default();
        while let Some(item) = self.next().await {
            match item.outcome {
                Ok(value) => acc.results.push((item.key, value)),
                Err(err) => {
                    acc.results.clear();
                    acc.errors.push((item.key, err));
                    return acc;
                }
            }
        }
        acc
    }

    /// Consume until the first success, discarding failures seen on the way.
    ///
    /// If every producer fails, the full failure list is retained.
    pub async fn collect_first_result(mut self) -> PartialOutcome<K, T> {
        let mut acc = PartialOutcome::default();
        while let Some(item) = self.next().await {
            match item.outcome {
                Ok(value) => {
                    acc.errors.clear();
                    acc.results.push((item.key, value));
                    return acc;
                }
                Err(err) => acc.errors.push((item.key, err)),
            }
        }
        acc
    }

    /// Cancel-aware [`KeyedResults::collect_all`]: stops consuming the
    /// instant `ctx` finishes, keeping whatever was already received.
    pub async fn collect_until_cancelled(mut self, ctx: &Context) -> PartialOutcome<K, T> {
        let mut acc = PartialOutcome::default();
        while let Some(item) = self.next_or_cancelled(ctx).await {
            acc.record(item);
        }
        acc
    }
}
