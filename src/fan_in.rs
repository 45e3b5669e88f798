//! Fan-in of many keyed promises into one consumable sequence
//!
//! One producer task is spawned per promise; each waits for its promise and
//! sends the outcome, tagged with the originating key, into a shared bounded
//! channel. The sequence ends once every producer has reported. Dropping the
//! sequence early is safe: pending sends fail immediately once the receiver
//! is gone, so no producer is ever left blocked.

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, trace};

use crate::context::Context;
use crate::error::PromiseResult;
use crate::promise::Promise;

/// One promise outcome, tagged with its originating key.
#[derive(Debug, Clone)]
pub struct KeyedOutcome<K, T> {
    /// Key the promise was registered under.
    pub key: K,
    /// What the promise produced, or the context error its producer saw.
    pub outcome: PromiseResult<T>,
}

/// Lazily-consumed sequence of keyed promise outcomes, in completion order.
///
/// Finite and not restartable: one traversal sees each outcome exactly once.
#[derive(Debug)]
pub struct KeyedResults<K, T> {
    rx: mpsc::Receiver<KeyedOutcome<K, T>>,
}

/// Launch one producer per `(key, promise)` pair and funnel their outcomes
/// into a single sequence.
///
/// Each producer waits under a clone of `ctx`, so cancelling `ctx` makes the
/// remaining outcomes surface as context errors rather than blocking forever.
pub fn fan_in<K, T>(ctx: &Context, pairs: Vec<(K, Promise<T>)>) -> KeyedResults<K, T>
where
    K: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    debug!(promises = pairs.len(), "fanning in promise outcomes");

    for (key, promise) in pairs {
        let tx = tx.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let outcome = promise.get(&ctx).await;
            if tx.send(KeyedOutcome { key, outcome }).await.is_err() {
                trace!("fan-in consumer gone, outcome dropped");
            }
        });
    }

    KeyedResults { rx }
}

impl<K, T> KeyedResults<K, T> {
    /// Next outcome, or `None` once every producer has reported.
    pub async fn next(&mut self) -> Option<KeyedOutcome<K, T>> {
        self.rx.recv().await
    }

    /// Like [`KeyedResults::next`], but also yields `None` the instant `ctx`
    /// finishes, without waiting for the remaining producers.
    pub async fn next_or_cancelled(&mut self, ctx: &Context) -> Option<KeyedOutcome<K, T>> {
        tokio::select! {
            item = self.rx.recv() => item,
            _ = ctx.done() => None,
        }
    }

    /// Adapt the sequence into a [`tokio_stream`] stream.
    #[must_use]
    pub fn into_stream(self) -> ReceiverStream<KeyedOutcome<K, T>> {
        ReceiverStream::new(self.rx)
    }
}
