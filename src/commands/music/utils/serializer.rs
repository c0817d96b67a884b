//! Runs playback-mutating operations for one session strictly one at a time,
//! in the order they were submitted.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::music_manager::{MusicError, MusicResult};

/// The kinds of work the serializer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Next,
    Prev,
    Pause,
    Resume,
    Stop,
    AutoAdvance,
    PlayIndex(usize),
}

impl OperationKind {
    /// Operations that tear down the current track themselves. A track end
    /// observed while one of these is running must not trigger auto-advance.
    pub fn suppresses_auto_advance(self) -> bool {
        matches!(
            self,
            OperationKind::Next
                | OperationKind::Prev
                | OperationKind::PlayIndex(_)
                | OperationKind::Stop
        )
    }

    /// Operations that start a new track. The previous track's end can still
    /// arrive while one of these is between tracks.
    pub fn starts_playback(self) -> bool {
        matches!(
            self,
            OperationKind::Next
                | OperationKind::Prev
                | OperationKind::PlayIndex(_)
                | OperationKind::AutoAdvance
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::PlayIndex(i) => write!(f, "PlayIndex({i})"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

struct Job {
    kind: OperationKind,
    run: BoxFuture<'static, ()>,
}

/// Resolves with the operation's result once it has run.
///
/// Dropping the handle does not cancel the operation.
pub struct OperationHandle<T> {
    rx: oneshot::Receiver<MusicResult<T>>,
}

impl<T> Future for OperationHandle<T> {
    type Output = MusicResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(MusicError::SessionClosed)))
    }
}

pub struct OperationSerializer {
    queue: mpsc::UnboundedSender<Job>,
    in_flight: Arc<watch::Sender<Option<OperationKind>>>,
    pending: Arc<AtomicUsize>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl OperationSerializer {
    /// Spawn the worker task. Must be called inside a tokio runtime.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let (queue, mut jobs) = mpsc::unbounded_channel::<Job>();
        let (in_flight, _) = watch::channel(None);
        let in_flight = Arc::new(in_flight);
        let pending = Arc::new(AtomicUsize::new(0));

        let in_flight_tx = Arc::clone(&in_flight);
        let worker_pending = Arc::clone(&pending);
        let worker = tokio::spawn(async move {
            while let Some(job) = jobs.recv().await {
                debug!("[{}] running {}", label, job.kind);
                in_flight_tx.send_replace(Some(job.kind));
                job.run.await;
                in_flight_tx.send_replace(None);
                worker_pending.fetch_sub(1, Ordering::SeqCst);
                trace!("[{}] finished {}", label, job.kind);
            }
            debug!("[{}] operation queue closed", label);
        });

        Self {
            queue,
            in_flight,
            pending,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue `op` behind everything submitted before it.
    pub fn submit<F, T>(&self, kind: OperationKind, op: F) -> OperationHandle<T>
    where
        F: Future<Output = MusicResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let run = async move {
            let _ = tx.send(op.await);
        }
        .boxed();

        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.queue.send(Job { kind, run }).is_err() {
            // The worker is gone; the dropped sender resolves the handle
            // with `SessionClosed`.
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        OperationHandle { rx }
    }

    /// The operation currently executing, if any.
    pub fn in_flight(&self) -> Option<OperationKind> {
        *self.in_flight.borrow()
    }

    /// Operations submitted but not yet finished, including the running one.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Stop accepting work. The running operation is cancelled and anything
    /// still queued is dropped.
    ///
    /// Must not be awaited from inside an operation on this serializer.
    pub async fn close(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            worker.abort();
            let _ = worker.await;
        }
        self.pending.store(0, Ordering::SeqCst);
        self.in_flight.send_replace(None);
    }
}

impl Drop for OperationSerializer {
    fn drop(&mut self) {
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            worker.abort();
        }
    }
}
