//! Cancellable concurrency scope that tracks everything forked within it
//!
//! A nursery ties a group of promises to a scope: forks are recorded while
//! the governing future runs, and the scope's context is cancelled the moment
//! that future returns - a broadcast signal, not a join. The returned
//! [`NurseryResult`] snapshot stays joinable indefinitely.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use tracing::debug;

use crate::awaitable::{await_all, Awaitable};
use crate::context::Context;
use crate::error::PromiseResult;
use crate::multi::MultiPromise;
use crate::promise::Promise;

/// Handle to an open concurrency scope.
///
/// Clones share the scope; forking is safe from any number of tasks at once.
#[derive(Clone)]
pub struct Nursery {
    ctx: Context,
    tracked: Arc<Mutex<Vec<Box<dyn Awaitable>>>>,
}

/// Snapshot of everything forked in a scope, taken at scope exit.
pub struct NurseryResult {
    tracked: Vec<Box<dyn Awaitable>>,
}

/// Open a nursery under `parent`, run `f` to completion, then cancel the
/// nursery's context and return the snapshot of every forked awaitable.
///
/// Cancellation fires even if `f`'s future panics, and is only a signal:
/// this call never waits for forked work to finish - join through the
/// returned [`NurseryResult`].
pub async fn with_context<F, Fut>(parent: &Context, f: F) -> NurseryResult
where
    F: FnOnce(Nursery) -> Fut,
    Fut: Future<Output = ()>,
{
    let nursery = Nursery::open(parent);
    let guard = nursery.ctx.cancel_guard();

    f(nursery.clone()).await;

    debug!("nursery scope closed, cancelling its context");
    drop(guard);
    nursery.snapshot()
}

/// Like [`with_context`], additionally threading a typed result out of `f`.
pub async fn with_context_result<R, F, Fut>(
    parent: &Context,
    f: F,
) -> (NurseryResult, PromiseResult<R>)
where
    F: FnOnce(Nursery) -> Fut,
    Fut: Future<Output = PromiseResult<R>>,
{
    let nursery = Nursery::open(parent);
    let guard = nursery.ctx.cancel_guard();

    let result = f(nursery.clone()).await;

    debug!("nursery scope closed, cancelling its context");
    drop(guard);
    (nursery.snapshot(), result)
}

impl Nursery {
    fn open(parent: &Context) -> Self {
        Self {
            ctx: parent.child(),
            tracked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The scope's context. Cancelled once the governing future returns;
    /// forked closures capture it to observe that cancellation.
    #[must_use]
    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// Fork an eager promise into the scope and record it for joining.
    pub fn fork<T, F, Fut>(&self, f: F) -> Promise<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = PromiseResult<T>> + Send + 'static,
    {
        let promise = Promise::new(f);
        self.tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(promise.clone()));
        promise
    }

    /// Fork and append the promise to `collection` in one step.
    pub fn fork_into<T, F, Fut>(&self, collection: &mut MultiPromise<T>, f: F)
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = PromiseResult<T>> + Send + 'static,
    {
        collection.push(self.fork(f));
    }

    /// Freeze the tracked list; forks recorded after this are not joined.
    fn snapshot(&self) -> NurseryResult {
        let tracked = std::mem::take(
            &mut *self.tracked.lock().unwrap_or_else(PoisonError::into_inner),
        );
        NurseryResult { tracked }
    }
}

impl fmt::Debug for Nursery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nursery")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl NurseryResult {
    /// Join every awaitable forked in the scope, sequentially, fail-fast.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered, if any.
    pub async fn wait(&self, ctx: &Context) -> PromiseResult<()> {
        let refs: Vec<&dyn Awaitable> =
            self.tracked.iter().map(|awaitable| &**awaitable).collect();
        await_all(ctx, refs).await
    }

    /// How many awaitables were forked in the scope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    /// Whether nothing was forked in the scope.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}

impl fmt::Debug for NurseryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NurseryResult")
            .field("tracked", &self.tracked.len())
            .finish()
    }
}

impl Awaitable for NurseryResult {
    fn wait<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, PromiseResult<()>> {
        Box::pin(self.wait(ctx))
    }
}
