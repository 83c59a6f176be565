//! Common utilities for controller integration tests

use controller::{AutoSaveConfig, CancellationHandle, CancellationToken, SaveController, SaveStatus};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Text that makes the harness save reject
pub const FAIL: &str = "fail";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    Rejected(String),
    Cancelled,
}

/// Observes what the controller asked the save operation to do
#[derive(Clone, Default)]
pub struct SaveLog {
    saves: Arc<Mutex<Vec<(Duration, String)>>>,
    cancels: Arc<AtomicUsize>,
}

impl SaveLog {
    /// Arguments of every save invocation, in order
    pub fn saved_args(&self) -> Vec<String> {
        self.saves.lock().iter().map(|(_, arg)| arg.clone()).collect()
    }

    /// Offset from harness start of every save invocation
    pub fn save_times(&self) -> Vec<Duration> {
        self.saves.lock().iter().map(|(at, _)| *at).collect()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

pub fn config(debounce_ms: u64, status_ms: u64) -> AutoSaveConfig {
    AutoSaveConfig {
        debounce_ms,
        status_ms,
        discard_stale_completions: false,
    }
}

pub type BoxedSave = BoxFuture<'static, Result<usize, SaveError>>;
pub type TestOperation = Box<dyn Fn(CancellationToken, String) -> BoxedSave + Send + Sync>;
pub type TestFactory = Box<dyn Fn() -> CancellationHandle<CancellationToken> + Send + Sync>;
pub type TestController = SaveController<String, TestOperation, TestFactory>;

/// Controller whose save sleeps `latency`, honours cancellation, rejects
/// [`FAIL`] and otherwise resolves with the text length
pub fn harness(config: AutoSaveConfig, latency: Duration) -> (TestController, SaveLog) {
    let log = SaveLog::default();
    let start = Instant::now();

    let saves = log.saves.clone();
    let operation: TestOperation = Box::new(move |token: CancellationToken, text: String| -> BoxedSave {
        saves.lock().push((start.elapsed(), text.clone()));
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => return Err(SaveError::Cancelled),
                    _ = tokio::time::sleep(latency) => {}
                }
            }
            if text == FAIL {
                Err(SaveError::Rejected(text))
            } else {
                Ok(text.len())
            }
        })
    });

    let cancels = log.cancels.clone();
    let factory: TestFactory = Box::new(move || {
        let cancels = cancels.clone();
        let token = CancellationToken::new();
        let trigger = token.clone();
        CancellationHandle::new(token, move || {
            cancels.fetch_add(1, Ordering::SeqCst);
            trigger.cancel();
        })
    });

    (SaveController::new(operation, factory, &config), log)
}

/// Records every status the controller publishes, with its time offset
pub struct StatusRecorder {
    history: Arc<Mutex<Vec<(Duration, SaveStatus)>>>,
}

impl StatusRecorder {
    pub fn start(controller: &TestController) -> Self {
        let mut rx = controller.subscribe();
        let history = Arc::new(Mutex::new(vec![(Duration::ZERO, *rx.borrow_and_update())]));
        let start = Instant::now();

        let sink = history.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let status = *rx.borrow_and_update();
                sink.lock().push((start.elapsed(), status));
            }
        });

        Self { history }
    }

    pub fn statuses(&self) -> Vec<SaveStatus> {
        self.history.lock().iter().map(|(_, status)| *status).collect()
    }

    /// Every observed status with its time offset
    pub fn entries(&self) -> Vec<(Duration, SaveStatus)> {
        self.history.lock().clone()
    }

    /// Time offset at which `status` was first observed
    pub fn first_time_of(&self, status: SaveStatus) -> Option<Duration> {
        self.history
            .lock()
            .iter()
            .find(|(_, s)| *s == status)
            .map(|(at, _)| *at)
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
