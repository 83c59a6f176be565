//! Cancellation handles for in-flight saves
//!
//! A handle pairs a token (passed to the save operation) with a cancel
//! callback (kept by the controller). Cancellation is cooperative: firing
//! the callback only signals intent, the save operation must watch its
//! token to actually stop.

use std::fmt;
use tokio_util::sync::CancellationToken;

/// One cancellation capability, produced per save attempt
pub struct CancellationHandle<K> {
    /// Token handed to the save operation
    pub token: K,
    cancel: Box<dyn FnOnce() + Send>,
}

impl<K> CancellationHandle<K> {
    /// Build a handle from a token and the callback that cancels it
    pub fn new(token: K, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            token,
            cancel: Box::new(cancel),
        }
    }

    /// Split into the token and a one-shot cancel callback
    pub fn into_parts(self) -> (K, Box<dyn FnOnce() + Send>) {
        (self.token, self.cancel)
    }

    /// Fire the cancel callback, consuming the handle
    pub fn cancel(self) {
        (self.cancel)()
    }
}

impl CancellationHandle<CancellationToken> {
    /// Handle whose cancel callback cancels the given token
    pub fn from_token(token: CancellationToken) -> Self {
        let trigger = token.clone();
        Self::new(token, move || trigger.cancel())
    }
}

impl<K: fmt::Debug> fmt::Debug for CancellationHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationHandle")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Produces a fresh cancellation handle for every save attempt
pub trait HandleFactory: Send + Sync + 'static {
    /// Token type handed to the save operation
    type Token: Send + 'static;

    /// Create the handle for one attempt
    fn generate(&self) -> CancellationHandle<Self::Token>;
}

impl<K, F> HandleFactory for F
where
    F: Fn() -> CancellationHandle<K> + Send + Sync + 'static,
    K: Send + 'static,
{
    type Token = K;

    fn generate(&self) -> CancellationHandle<K> {
        self()
    }
}

/// Default factory backed by tokio-util's `CancellationToken`
#[derive(Debug, Clone, Copy, Default)]
pub struct CancelTokenFactory;

impl HandleFactory for CancelTokenFactory {
    type Token = CancellationToken;

    fn generate(&self) -> CancellationHandle<CancellationToken> {
        CancellationHandle::from_token(CancellationToken::new())
    }
}
