//! # Promise Coordination Library
//!
//! This crate provides a single-value asynchronous computation primitive
//! ("promise"), aggregation policies over many such computations, and a
//! cancellable concurrency scope ("nursery") that tracks everything forked
//! within it. It avoids `async_trait` and blocking operations; all
//! coordination is channel-based.
//!
//! Every blocking operation takes a [`Context`] - a propagating cancellation
//! token with deadline support. Abandoning a wait never stops the underlying
//! computation: cancellation is a property of the waiting operation, and task
//! closures opt into it by observing a captured context.

pub mod awaitable;
pub mod context;
pub mod error;
pub mod fan_in;
pub mod map;
pub mod multi;
pub mod nursery;
pub mod partial;
pub mod promise;

pub use awaitable::{await_all, await_until_first_error, Awaitable};
pub use context::Context;
pub use error::{AggregateError, PromiseError, PromiseResult, TaskFailure};
pub use fan_in::{fan_in, KeyedOutcome, KeyedResults};
pub use map::PromiseMap;
pub use multi::MultiPromise;
pub use nursery::{with_context, with_context_result, Nursery, NurseryResult};
pub use partial::PartialOutcome;
pub use promise::Promise;

/// Re-export common types
pub type Result<T> = std::result::Result<T, PromiseError>;
