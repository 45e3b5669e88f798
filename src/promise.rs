//! Single-value asynchronous computation with observable completion
//!
//! A [`Promise`] owns a user-supplied task closure and runs it at most once
//! on the tokio runtime. Completion is broadcast through a watch channel:
//! the outcome is written exactly once, strictly before the completed flag is
//! set, and any number of concurrent waiters observe it without a missed
//! wakeup. Waiters that arrive after completion return immediately.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::trace;

use crate::awaitable::Awaitable;
use crate::context::Context;
use crate::error::{PromiseError, PromiseResult};

/// Boxed future produced by a promise task closure.
pub type TaskFuture<T> = Pin<Box<dyn Future<Output = PromiseResult<T>> + Send>>;

type TaskFn<T> = Box<dyn FnOnce() -> TaskFuture<T> + Send>;

/// Handle to a single-value asynchronous computation.
///
/// Clones share the same computation; dropping every handle does not stop a
/// task that is already running.
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    task: Mutex<Option<TaskFn<T>>>,
    outcome: watch::Sender<Option<PromiseResult<T>>>,
    launched: AtomicBool,
    completed: AtomicBool,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("launched", &self.inner.launched.load(Ordering::Acquire))
            .field("completed", &self.inner.completed.load(Ordering::Acquire))
            .finish()
    }
}

impl<T> Promise<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Eager promise: launches the task closure immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = PromiseResult<T>> + Send + 'static,
    {
        let promise = Self::with_task(Some(Self::box_task(f)), false);
        promise.ensure_launched();
        promise
    }

    /// Lazy promise: the task closure does not run until the first wait.
    #[must_use]
    pub fn lazy<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = PromiseResult<T>> + Send + 'static,
    {
        Self::with_task(Some(Self::box_task(f)), false)
    }

    /// Pre-completed promise holding `value`; no task is spawned.
    #[must_use]
    pub fn resolved(value: T) -> Self {
        Self::pre_completed(Ok(value))
    }

    /// Pre-completed promise holding `err`; no task is spawned.
    #[must_use]
    pub fn rejected(err: PromiseError) -> Self {
        Self::pre_completed(Err(err))
    }

    /// A promise that never completes; waiting on it only ends through the
    /// caller's context.
    #[must_use]
    pub fn never() -> Self {
        Self::with_task(None, true)
    }

    /// Whether the task closure has been handed to the runtime.
    #[must_use]
    pub fn is_launched(&self) -> bool {
        self.inner.launched.load(Ordering::Acquire)
    }

    /// Whether the outcome is available. Terminal and irrevocable.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Wait for the outcome under `ctx`.
    ///
    /// Ensures the task is launched (exactly once, however many callers race
    /// here), then blocks until the promise completes or `ctx` finishes.
    ///
    /// # Errors
    ///
    /// Returns the context's error if the wait was abandoned; the task keeps
    /// running and a later `get` with a fresh context can still observe its
    /// eventual outcome. Otherwise returns whatever the task produced.
    pub async fn get(&self, ctx: &Context) -> PromiseResult<T> {
        if self.is_completed() {
            return self.inner.stored();
        }
        self.ensure_launched();

        let mut observer = self.inner.outcome.subscribe();
        tokio::select! {
            changed = observer.wait_for(|slot| slot.is_some()) => match changed {
                Ok(_) => self.inner.stored(),
                Err(_) => unreachable!("completion channel closed while a handle is live"),
            },
            err = ctx.done() => {
                trace!("promise wait abandoned: {err}");
                Err(err)
            }
        }
    }

    /// Non-blocking read of a completed promise's outcome.
    ///
    /// # Panics
    ///
    /// Panics if the promise has not completed; check [`Promise::is_completed`]
    /// first. Reading an unset value is a contract violation, not an error.
    #[must_use]
    pub fn value(&self) -> PromiseResult<T> {
        assert!(
            self.is_completed(),
            "misuse: Promise::value called before completion"
        );
        self.inner.stored()
    }

    fn box_task<F, Fut>(f: F) -> TaskFn<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = PromiseResult<T>> + Send + 'static,
    {
        Box::new(move || Box::pin(f()) as TaskFuture<T>)
    }

    fn with_task(task: Option<TaskFn<T>>, launched: bool) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                task: Mutex::new(task),
                outcome,
                launched: AtomicBool::new(launched),
                completed: AtomicBool::new(false),
            }),
        }
    }

    fn pre_completed(outcome: PromiseResult<T>) -> Self {
        let (outcome, _) = watch::channel(Some(outcome));
        Self {
            inner: Arc::new(Inner {
                task: Mutex::new(None),
                outcome,
                launched: AtomicBool::new(true),
                completed: AtomicBool::new(true),
            }),
        }
    }

    /// Idempotent launch: exactly one caller wins the gate and spawns the
    /// stored task, however many race here.
    fn ensure_launched(&self) {
        if self
            .inner
            .launched
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(task) = task else {
            return;
        };

        let inner = Arc::clone(&self.inner);
        trace!("launching promise task");
        tokio::spawn(async move {
            let outcome = task().await;
            inner.complete(outcome);
        });
    }
}

impl<T> Inner<T>
where
    T: Clone,
{
    /// Publish the outcome, then flip the completed flag. The watch write
    /// happens-before the release store, so no observer can see
    /// `completed == true` and then read an absent outcome.
    fn complete(&self, outcome: PromiseResult<T>) {
        self.outcome.send_replace(Some(outcome));
        self.completed.store(true, Ordering::Release);
        trace!("promise completed");
    }

    fn stored(&self) -> PromiseResult<T> {
        match &*self.outcome.borrow() {
            Some(outcome) => outcome.clone(),
            None => unreachable!("completion observed without a stored outcome"),
        }
    }
}

impl<T> Awaitable for Promise<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn wait<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, PromiseResult<()>> {
        Box::pin(async move { self.get(ctx).await.map(|_| ()) })
    }
}
