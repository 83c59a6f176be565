//! Last-call-wins debouncing of an async operation
//!
//! Repeated calls within the quiet window collapse into one execution that
//! uses the arguments of the latest call. Earlier calls are dropped, never
//! merged or queued.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

type Operation<A, R> = Arc<dyn Fn(A) -> BoxFuture<'static, R> + Send + Sync>;

/// A debounced call was replaced by a later one before it fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("debounced call superseded before it fired")]
pub struct Superseded;

/// Outstanding delayed call
struct PendingInvocation<A, R> {
    id: u64,
    args: A,
    timer: JoinHandle<()>,
    reply: oneshot::Sender<R>,
}

struct Slot<A, R> {
    pending: Option<PendingInvocation<A, R>>,
    /// Id of the most recently scheduled invocation
    last_id: u64,
}

/// Debounces an async operation
///
/// Must be used from within a tokio runtime: scheduling spawns a timer task,
/// and fired operations run on their own task so they complete even when the
/// caller drops its [`DebouncedCall`].
///
/// `op` itself is invoked synchronously whenever a call fires from `call`
/// (immediate mode) or `flush`, so whatever it does before returning its
/// future has happened by the time those methods return. Only the awaiting
/// of the future is moved onto a task.
pub struct Debouncer<A, R> {
    op: Operation<A, R>,
    delay: Option<Duration>,
    slot: Arc<Mutex<Slot<A, R>>>,
}

impl<A, R> Debouncer<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Wrap `op` with a quiet window of `delay`
    ///
    /// `None` or a zero delay means immediate mode: every call fires at once.
    pub fn new<F, Fut>(op: F, delay: Option<Duration>) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self {
            op: Arc::new(move |args| op(args).boxed()),
            delay: delay.filter(|d| !d.is_zero()),
            slot: Arc::new(Mutex::new(Slot {
                pending: None,
                last_id: 0,
            })),
        }
    }

    /// Quiet window, `None` in immediate mode
    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    /// Schedule `op(args)`, replacing any call that has not fired yet
    pub fn call(&self, args: A) -> DebouncedCall<R> {
        let (reply, rx) = oneshot::channel();

        let Some(delay) = self.delay else {
            debug!("Debounce disabled, firing immediately");
            tokio::spawn(fire((self.op)(args), vec![reply]));
            return DebouncedCall::new(rx);
        };

        let mut slot = self.slot.lock();
        if let Some(previous) = slot.pending.take() {
            previous.timer.abort();
            debug!(id = previous.id, "Superseded pending invocation");
        }

        slot.last_id += 1;
        let id = slot.last_id;
        let timer = tokio::spawn(expire(
            Arc::clone(&self.slot),
            Arc::clone(&self.op),
            id,
            delay,
        ));
        slot.pending = Some(PendingInvocation {
            id,
            args,
            timer,
            reply,
        });
        debug!(id, ?delay, "Scheduled invocation");

        DebouncedCall::new(rx)
    }

    /// Fire the pending call now instead of waiting out its window
    ///
    /// The returned call and the original caller's call both resolve with
    /// the same result. Returns `None` when nothing is pending.
    pub fn flush(&self) -> Option<DebouncedCall<R>> {
        let invocation = self.slot.lock().pending.take()?;
        invocation.timer.abort();
        debug!(id = invocation.id, "Flushing pending invocation");

        let (reply, rx) = oneshot::channel();
        let running = (self.op)(invocation.args);
        tokio::spawn(fire(running, vec![invocation.reply, reply]));
        Some(DebouncedCall::new(rx))
    }

    /// Drop the pending call without firing it
    ///
    /// Returns whether a call was pending. Its caller's future never resolves.
    pub fn cancel(&self) -> bool {
        match self.slot.lock().pending.take() {
            Some(invocation) => {
                invocation.timer.abort();
                debug!(id = invocation.id, "Cancelled pending invocation");
                true
            }
            None => false,
        }
    }

    /// Whether a call is scheduled and has not fired yet
    pub fn is_pending(&self) -> bool {
        self.slot.lock().pending.is_some()
    }
}

/// Timer task body: wait out the window, then fire if still current
async fn expire<A, R>(slot: Arc<Mutex<Slot<A, R>>>, op: Operation<A, R>, id: u64, delay: Duration)
where
    R: Clone,
{
    tokio::time::sleep(delay).await;

    let invocation = {
        let mut slot = slot.lock();
        if slot.pending.as_ref().map(|p| p.id) == Some(id) {
            slot.pending.take()
        } else {
            None
        }
    };

    if let Some(invocation) = invocation {
        debug!(id, "Quiet window elapsed, firing");
        fire(op(invocation.args), vec![invocation.reply]).await;
    }
}

async fn fire<R: Clone>(running: BoxFuture<'static, R>, waiters: Vec<oneshot::Sender<R>>) {
    let result = running.await;
    for waiter in waiters {
        // Receiver dropped means nobody is listening for this result
        let _ = waiter.send(result.clone());
    }
}

/// Result of one debounced call
///
/// Resolves with the operation's result once the call fires. A call that is
/// superseded, or cancelled, before firing stays pending forever; use
/// [`DebouncedCall::outcome`] to observe supersession instead.
#[must_use = "dropping a DebouncedCall does not cancel it; await it or let it go explicitly"]
pub struct DebouncedCall<R> {
    rx: Option<oneshot::Receiver<R>>,
}

impl<R> DebouncedCall<R> {
    fn new(rx: oneshot::Receiver<R>) -> Self {
        Self { rx: Some(rx) }
    }

    /// Wait for the call to fire, or learn that it never will
    pub async fn outcome(self) -> Result<R, Superseded> {
        match self.rx {
            Some(rx) => rx.await.map_err(|_| Superseded),
            None => Err(Superseded),
        }
    }
}

impl<R> Future for DebouncedCall<R> {
    type Output = R;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<R> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Pending;
        };

        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => {
                // Superseded: never resolves
                self.rx = None;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
