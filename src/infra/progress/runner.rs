//! Background execution of one unit of portal-bound work.

use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::error::{PortalError, PortalResult};

/// Identity of one submitted task, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocates monotonically increasing task identities. One instance is
/// shared by every controller that submits work in the process.
#[derive(Debug, Default)]
pub struct TaskIdAllocator {
    next: AtomicU64,
}

impl TaskIdAllocator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn allocate(&self) -> TaskId {
        TaskId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Debug, Default)]
pub struct CancellationFlag {
    inner: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

/// Notification produced by a running task. Steps arrive in production
/// order; exactly one `Finished` terminates every task.
#[derive(Debug)]
pub enum TaskEvent<S, R> {
    Step { task: TaskId, value: S },
    Return { task: TaskId, value: R },
    Error { task: TaskId, error: PortalError },
    Finished { task: TaskId },
}

/// Handed to step-producing work; the work's only way to publish
/// intermediate values.
pub struct StepSink<S, R> {
    task: TaskId,
    flag: CancellationFlag,
    events: UnboundedSender<TaskEvent<S, R>>,
}

impl<S, R> StepSink<S, R> {
    pub fn task_id(&self) -> TaskId {
        self.task
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.is_cancelled()
    }

    /// Emits one intermediate value. Once cancellation has been requested
    /// the value is dropped and `false` is returned; the work should stop
    /// producing.
    pub fn emit(&self, value: S) -> bool {
        if self.flag.is_cancelled() {
            return false;
        }
        self.events
            .send(TaskEvent::Step {
                task: self.task,
                value,
            })
            .is_ok()
    }
}

impl<S, R> Clone for StepSink<S, R> {
    fn clone(&self) -> Self {
        Self {
            task: self.task,
            flag: self.flag.clone(),
            events: self.events.clone(),
        }
    }
}

pub type WorkFuture<R> = Pin<Box<dyn Future<Output = PortalResult<R>> + Send>>;

type StepsFn<S, R> = Box<dyn FnOnce(StepSink<S, R>) -> WorkFuture<R> + Send>;

/// One unit of background work: either a single-shot future or a
/// step-producing closure fed a [`StepSink`].
pub enum Work<S, R> {
    Single(WorkFuture<R>),
    Steps(StepsFn<S, R>),
}

impl<S, R> Work<S, R> {
    pub fn single<F>(future: F) -> Self
    where
        F: Future<Output = PortalResult<R>> + Send + 'static,
    {
        Work::Single(Box::pin(future))
    }

    pub fn steps<F, Fut>(work: F) -> Self
    where
        F: FnOnce(StepSink<S, R>) -> Fut + Send + 'static,
        Fut: Future<Output = PortalResult<R>> + Send + 'static,
    {
        Work::Steps(Box::new(move |sink| Box::pin(work(sink))))
    }
}

pub struct TaskHandle {
    id: TaskId,
    flag: CancellationFlag,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Requests cooperative termination. The worker is not aborted; it
    /// observes the request at its next emission point.
    pub fn cancel(&self) {
        debug!(task = %self.id, "task cancellation requested");
        self.flag.cancel();
    }
}

/// Runs `work` on a background tokio task. Steps are delivered in
/// production order, followed by one terminal `Return` or `Error` (unless
/// superseded by cancellation) and always exactly one `Finished`, even if
/// the work panics.
pub fn spawn_task<S, R>(
    id: TaskId,
    work: Work<S, R>,
    events: UnboundedSender<TaskEvent<S, R>>,
) -> TaskHandle
where
    S: Send + 'static,
    R: Send + 'static,
{
    let flag = CancellationFlag::default();
    let sink_flag = flag.clone();
    let sink_events = events.clone();
    let terminal_flag = flag.clone();

    tokio::spawn(async move {
        // Nested spawn isolates panics so the terminal events below are
        // sent no matter how the work ends.
        let worker = tokio::spawn(async move {
            match work {
                Work::Single(future) => future.await,
                Work::Steps(work) => {
                    let sink = StepSink {
                        task: id,
                        flag: sink_flag,
                        events: sink_events,
                    };
                    work(sink).await
                }
            }
        });

        match worker.await {
            Ok(Ok(value)) => {
                if !terminal_flag.is_cancelled() {
                    let _ = events.send(TaskEvent::Return { task: id, value });
                }
            }
            Ok(Err(error)) => {
                if !terminal_flag.is_cancelled() {
                    let _ = events.send(TaskEvent::Error { task: id, error });
                }
            }
            Err(join_error) => {
                if !terminal_flag.is_cancelled() {
                    let _ = events.send(TaskEvent::Error {
                        task: id,
                        error: PortalError::Internal(format!("task {id} aborted: {join_error}")),
                    });
                }
            }
        }
        let _ = events.send(TaskEvent::Finished { task: id });
    });

    TaskHandle { id, flag }
}
