//! Save controller
//!
//! Owns the status signal, the live cancellation handle and the status
//! reset timer for one pending-save slot. Every change cancels the in-flight
//! save, clears the reset timer, marks the status `changed` and forwards the
//! change to the debouncer.
//!
//! Status transitions:
//! ```text
//! * -> changed            notify_change
//! changed -> saving       debounced save fires (or force_save)
//! saving -> success       save resolved
//! saving -> failure       save rejected
//! success|failure -> neutral   after status_ms
//! ```

use crate::operation::{SaveOperation, SaveOutcome};
use autosave_core::{AutoSaveConfig, CancelTokenFactory, CancellationToken, HandleFactory, SaveStatus};
use debounce::{DebouncedCall, Debouncer};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Outcome of a save fired by a controller whose operation is `S`
pub type Outcome<S, K, A> = SaveOutcome<<S as SaveOperation<K, A>>::Output, <S as SaveOperation<K, A>>::Error>;

/// Arguments of one change, tagged with the change that produced them
struct Attempt<A> {
    epoch: u64,
    args: A,
}

struct ResetTimer {
    id: u64,
    task: JoinHandle<()>,
}

/// The controller's resource slots. At most one of each is live.
#[derive(Default)]
struct Slots {
    cancel: Option<Box<dyn FnOnce() + Send>>,
    reset_timer: Option<ResetTimer>,
    /// Bumped by every change
    epoch: u64,
    last_reset_id: u64,
    /// Attempts started and not yet settled, stale ones included
    in_flight: usize,
}

struct Shared<S, F> {
    operation: S,
    factory: F,
    status: watch::Sender<SaveStatus>,
    slots: Mutex<Slots>,
    status_duration: Duration,
    discard_stale: bool,
}

/// Debounced, cancellable autosave for one consumer
///
/// Must be used from within a tokio runtime.
pub struct SaveController<A, S, F = CancelTokenFactory>
where
    F: HandleFactory,
    S: SaveOperation<F::Token, A>,
{
    shared: Arc<Shared<S, F>>,
    debouncer: Debouncer<Attempt<A>, Outcome<S, F::Token, A>>,
}

impl<A, S> SaveController<A, S, CancelTokenFactory>
where
    A: Send + 'static,
    S: SaveOperation<CancellationToken, A>,
{
    /// Controller whose saves receive a tokio-util `CancellationToken`
    pub fn with_cancel_tokens(operation: S, config: &AutoSaveConfig) -> Self {
        Self::new(operation, CancelTokenFactory, config)
    }
}

impl<A, S, F> SaveController<A, S, F>
where
    A: Send + 'static,
    F: HandleFactory,
    S: SaveOperation<F::Token, A>,
{
    pub fn new(operation: S, factory: F, config: &AutoSaveConfig) -> Self {
        let (status, _) = watch::channel(SaveStatus::Neutral);
        let shared = Arc::new(Shared {
            operation,
            factory,
            status,
            slots: Mutex::new(Slots::default()),
            status_duration: config.status_duration(),
            discard_stale: config.discard_stale_completions,
        });

        let trigger = Arc::clone(&shared);
        let debouncer = Debouncer::new(
            move |attempt: Attempt<A>| trigger_save(Arc::clone(&trigger), attempt),
            config.debounce(),
        );

        Self { shared, debouncer }
    }

    /// Current status
    pub fn status(&self) -> SaveStatus {
        *self.shared.status.borrow()
    }

    /// Receiver that observes every status change, for UI binding
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.shared.status.subscribe()
    }

    /// Record an edit
    ///
    /// Cancels the in-flight save and any pending status reset, marks the
    /// status `changed`, then schedules a debounced save with `args`. The
    /// returned call resolves once that save settles, or never if a later
    /// change supersedes it first.
    pub fn notify_change(&self, args: A) -> DebouncedCall<Outcome<S, F::Token, A>> {
        let (epoch, reset_timer, cancel) = {
            let mut slots = self.shared.slots.lock();
            slots.epoch += 1;
            (slots.epoch, slots.reset_timer.take(), slots.cancel.take())
        };

        if let Some(timer) = reset_timer {
            timer.task.abort();
            debug!(timer = timer.id, "Cleared pending status reset");
        }
        if let Some(cancel) = cancel {
            debug!(epoch, "Cancelling in-flight save");
            cancel();
        }

        self.shared.publish(SaveStatus::Changed);
        self.debouncer.call(Attempt { epoch, args })
    }

    /// Save now, skipping the rest of the quiet window
    ///
    /// Returns `None` when no save is pending.
    pub fn force_save(&self) -> Option<DebouncedCall<Outcome<S, F::Token, A>>> {
        let flushed = self.debouncer.flush();
        if flushed.is_none() {
            debug!("Force save requested with nothing pending");
        }
        flushed
    }

    /// Whether a debounced save is waiting for its quiet window
    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Whether any save attempt has started and not yet settled
    ///
    /// Counts superseded attempts too, so a stale settlement that publishes
    /// `success` or `failure` does not hide a newer save still running.
    pub fn has_in_flight_save(&self) -> bool {
        self.shared.slots.lock().in_flight > 0
    }

    /// Drop the pending save, cancel the in-flight one and stop the reset timer
    pub fn shutdown(&self) {
        let dropped = self.debouncer.cancel();

        let (reset_timer, cancel) = {
            let mut slots = self.shared.slots.lock();
            slots.epoch += 1;
            (slots.reset_timer.take(), slots.cancel.take())
        };
        if let Some(timer) = reset_timer {
            timer.task.abort();
        }
        let cancelled = cancel.is_some();
        if let Some(cancel) = cancel {
            cancel();
        }

        debug!(dropped, cancelled, "Save controller shut down");
    }
}

/// The step the debouncer fires
///
/// The handle is generated and installed, and `saving` published, before
/// this returns. A change arriving right after `force_save` or an immediate
/// save therefore always finds the handle to cancel. Only the operation
/// itself is awaited in the returned future.
fn trigger_save<A, S, F>(shared: Arc<Shared<S, F>>, attempt: Attempt<A>) -> BoxFuture<'static, Outcome<S, F::Token, A>>
where
    A: Send + 'static,
    F: HandleFactory,
    S: SaveOperation<F::Token, A>,
{
    let Attempt { epoch, args } = attempt;
    let (token, cancel) = shared.factory.generate().into_parts();
    shared.begin(epoch, cancel);

    // Settles on every exit path, including unwinding out of the operation
    // and the future being dropped unpolled
    let mut settle = SettleGuard {
        shared: Arc::clone(&shared),
        epoch,
        status: SaveStatus::Failure,
    };

    async move {
        match shared.operation.save(token, args).await {
            Ok(output) => {
                settle.status = SaveStatus::Success;
                SaveOutcome::Saved(output)
            }
            Err(error) => {
                warn!(epoch, ?error, "Save failed");
                SaveOutcome::Failed(error)
            }
        }
    }
    .boxed()
}

struct SettleGuard<S, F>
where
    S: Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    shared: Arc<Shared<S, F>>,
    epoch: u64,
    status: SaveStatus,
}

impl<S, F> Drop for SettleGuard<S, F>
where
    S: Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.shared.settle(self.epoch, self.status);
    }
}

impl<S, F> Shared<S, F>
where
    S: Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    fn publish(&self, status: SaveStatus) {
        let previous = self.status.send_replace(status);
        debug!(%previous, %status, "Save status changed");
    }

    fn is_stale(&self, slots: &Slots, epoch: u64) -> bool {
        self.discard_stale && slots.epoch != epoch
    }

    /// Install the attempt's cancel callback and mark the status `saving`
    ///
    /// A handle still in the slot belongs to an older attempt and is
    /// cancelled, never dropped.
    fn begin(&self, epoch: u64, cancel: Box<dyn FnOnce() + Send>) {
        let mut slots = self.slots.lock();
        slots.in_flight += 1;
        if self.is_stale(&slots, epoch) {
            drop(slots);
            debug!(epoch, "Save superseded before it started, cancelling");
            cancel();
            return;
        }

        let replaced = slots.cancel.replace(cancel);
        self.publish(SaveStatus::Saving);
        drop(slots);

        if let Some(previous) = replaced {
            debug!(epoch, "Cancelling older save still holding the handle");
            previous();
        }
    }

    /// Record the outcome, release the handle and schedule the status reset
    fn settle(self: &Arc<Self>, epoch: u64, status: SaveStatus) {
        let mut slots = self.slots.lock();
        slots.in_flight = slots.in_flight.saturating_sub(1);
        if self.is_stale(&slots, epoch) {
            debug!(epoch, %status, "Ignoring settlement of superseded save");
            return;
        }

        slots.cancel = None;
        self.publish(status);

        if let Some(previous) = slots.reset_timer.take() {
            previous.task.abort();
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                slots.last_reset_id += 1;
                let id = slots.last_reset_id;
                let task = runtime.spawn(reset_after(Arc::clone(self), id));
                slots.reset_timer = Some(ResetTimer { id, task });
            }
            Err(_) => warn!("No tokio runtime available, status reset skipped"),
        }
    }
}

async fn reset_after<S, F>(shared: Arc<Shared<S, F>>, id: u64)
where
    S: Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    tokio::time::sleep(shared.status_duration).await;

    let mut slots = shared.slots.lock();
    if slots.reset_timer.as_ref().map(|t| t.id) == Some(id) {
        slots.reset_timer = None;
        shared.publish(SaveStatus::Neutral);
    }
}
