//! Minimal join contract shared by promises and nursery results

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::debug;

use crate::context::Context;
use crate::error::PromiseResult;

/// Capability: "can be waited on under a context, yielding success or error".
///
/// Object-safe by returning a boxed future instead of using `async_trait`,
/// so heterogeneous collections of awaitables can be joined uniformly.
pub trait Awaitable: Send + Sync {
    /// Wait for completion under `ctx`, reporting only success or error.
    fn wait<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, PromiseResult<()>>;
}

/// Await each awaitable sequentially, in listed order.
///
/// # Errors
///
/// Stops at the first error and returns it; later awaitables are not waited
/// on (their computations keep running regardless).
pub async fn await_all<'a, I>(ctx: &Context, awaitables: I) -> PromiseResult<()>
where
    I: IntoIterator<Item = &'a dyn Awaitable>,
{
    for awaitable in awaitables {
        awaitable.wait(ctx).await?;
    }
    Ok(())
}

/// Await every awaitable concurrently, failing fast.
///
/// # Errors
///
/// As soon as any wait reports an error, a derived context is cancelled as a
/// best-effort signal to the cooperating awaitables and that error is
/// returned. Succeeds only if every awaitable succeeds. The concurrent waits
/// live inside this call, so returning early leaks nothing; the underlying
/// computations are owned by the runtime and unaffected.
pub async fn await_until_first_error<'a, I>(ctx: &Context, awaitables: I) -> PromiseResult<()>
where
    I: IntoIterator<Item = &'a dyn Awaitable>,
{
    let scope = ctx.child();
    let mut waits: FuturesUnordered<_> = awaitables
        .into_iter()
        .map(|awaitable| awaitable.wait(&scope))
        .collect();

    while let Some(outcome) = waits.next().await {
        if let Err(err) = outcome {
            debug!("first error observed, signalling remaining waits: {err}");
            scope.cancel();
            return Err(err);
        }
    }
    Ok(())
}
