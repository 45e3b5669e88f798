//! Error types for promise coordination

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Result type for promise operations
pub type PromiseResult<T> = std::result::Result<T, PromiseError>;

/// Error produced by promise operations.
///
/// Context errors (`Cancelled`, `DeadlineExceeded`) report an abandoned wait
/// and are never conflated with what a task closure returned. The enum is
/// `Clone` so a single completion can be observed by any number of waiters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PromiseError {
    /// The task closure returned an error; passed through unmodified.
    #[error("promise task failed: {0}")]
    Task(TaskFailure),
    /// The wait was abandoned because the supplied context was cancelled.
    #[error("wait cancelled")]
    Cancelled,
    /// The wait was abandoned because the supplied context's deadline passed.
    #[error("wait deadline exceeded")]
    DeadlineExceeded,
    /// A first-result wait was issued over an empty promise collection.
    #[error("empty promise collection")]
    Empty,
    /// Several independent failures, each preserved for inspection.
    #[error(transparent)]
    Aggregate(AggregateError),
}

impl PromiseError {
    /// Wrap an arbitrary error as a task failure.
    pub fn task<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self::Task(TaskFailure::new(err))
    }

    /// Create a task failure from a display message.
    pub fn msg<M: fmt::Display>(message: M) -> Self {
        Self::task(message.to_string())
    }

    /// Combine independent failures into one error value.
    ///
    /// Zero errors yield `None`, a single error is returned unchanged, and
    /// two or more are wrapped in [`PromiseError::Aggregate`].
    #[must_use]
    pub fn aggregate(errors: Vec<PromiseError>) -> Option<PromiseError> {
        match errors.len() {
            0 => None,
            1 => errors.into_iter().next(),
            _ => Some(Self::Aggregate(AggregateError(errors))),
        }
    }

    /// Whether this error came from the waiting context rather than a task.
    #[must_use]
    pub fn is_context(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// The wrapped task failure, if this is a `Task` error.
    #[must_use]
    pub fn task_failure(&self) -> Option<&TaskFailure> {
        match self {
            Self::Task(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Shareable wrapper around the error a task closure returned.
///
/// The original error stays reachable through [`TaskFailure::get_ref`] and the
/// standard `source` chain; cloning shares it.
#[derive(Debug, Clone)]
pub struct TaskFailure(Arc<dyn StdError + Send + Sync>);

impl TaskFailure {
    /// Wrap an error value.
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self(Arc::from(err.into()))
    }

    /// Borrow the underlying error for inspection or downcasting.
    #[must_use]
    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for TaskFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Combined multi-error over one-or-more underlying failures.
#[derive(Debug, Clone)]
pub struct AggregateError(Vec<PromiseError>);

impl AggregateError {
    /// Every underlying error, in aggregation order.
    #[must_use]
    pub fn errors(&self) -> &[PromiseError] {
        &self.0
    }

    /// Consume the aggregate, yielding the underlying errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<PromiseError> {
        self.0
    }

    /// Number of underlying errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the aggregate holds no errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} promises failed: ", self.0.len())?;
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl StdError for AggregateError {}

impl IntoIterator for AggregateError {
    type Item = PromiseError;
    type IntoIter = std::vec::IntoIter<PromiseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
