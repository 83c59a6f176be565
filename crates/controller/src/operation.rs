//! The persistence call a controller drives

use async_trait::async_trait;
use std::fmt;
use std::future::Future;

/// The actual save, supplied by the embedding application
///
/// Receives the cancellation token for this attempt followed by the
/// arguments of the change that triggered it. Honouring the token is the
/// operation's job: the controller only signals it.
#[async_trait]
pub trait SaveOperation<K, A>: Send + Sync + 'static {
    /// Value produced by a successful save
    type Output: Clone + Send + 'static;
    /// Value produced by a failed save
    type Error: Clone + fmt::Debug + Send + 'static;

    async fn save(&self, token: K, args: A) -> Result<Self::Output, Self::Error>;
}

#[async_trait]
impl<K, A, T, E, Func, Fut> SaveOperation<K, A> for Func
where
    Func: Fn(K, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    K: Send + 'static,
    A: Send + 'static,
    T: Clone + Send + 'static,
    E: Clone + fmt::Debug + Send + 'static,
{
    type Output = T;
    type Error = E;

    async fn save(&self, token: K, args: A) -> Result<T, E> {
        (self)(token, args).await
    }
}

/// How a fired save settled
///
/// Failures are returned as values; they never propagate out of the
/// controller as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome<T, E> {
    Saved(T),
    Failed(E),
}

impl<T, E> SaveOutcome<T, E> {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SaveOutcome::Failed(_))
    }

    /// Convert into a `Result` for callers that want `?`
    pub fn into_result(self) -> Result<T, E> {
        match self {
            SaveOutcome::Saved(output) => Ok(output),
            SaveOutcome::Failed(error) => Err(error),
        }
    }
}

impl<T, E> From<Result<T, E>> for SaveOutcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(output) => SaveOutcome::Saved(output),
            Err(error) => SaveOutcome::Failed(error),
        }
    }
}
