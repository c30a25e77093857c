//! Supersede-on-resubmit progress tracking with stale-result suppression.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::error::PortalError;

use super::runner::{spawn_task, TaskEvent, TaskHandle, TaskId, TaskIdAllocator, Work};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    /// Cancellation requested; the finished notification has not arrived yet.
    Cancelling,
}

/// Tracks the single visible task of one panel. Submitting supersedes any
/// in-flight task; callbacks fire only while the producing task is still
/// the active one, so results of superseded or cancelled tasks never reach
/// the caller. Every submission settles exactly once.
///
/// Worker tasks only enqueue events; controller state changes and callback
/// invocations happen on the owner's context, inside `submit`/`cancel` and
/// the pump methods.
pub struct ProgressController<S, R> {
    ids: Arc<TaskIdAllocator>,
    events_tx: UnboundedSender<TaskEvent<S, R>>,
    events_rx: UnboundedReceiver<TaskEvent<S, R>>,
    active: Option<TaskHandle>,
    last_submitted: Option<TaskId>,
    state: LoadState,
    /// Submissions whose Finished notification has not been pumped yet.
    outstanding: usize,
    on_step: Option<Box<dyn FnMut(S) + Send>>,
    on_return: Option<Box<dyn FnMut(R) + Send>>,
    on_error: Option<Box<dyn FnMut(PortalError) + Send>>,
    on_settled: Option<Box<dyn FnMut() + Send>>,
}

impl<S, R> ProgressController<S, R>
where
    S: Send + 'static,
    R: Send + 'static,
{
    pub fn new(ids: Arc<TaskIdAllocator>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            ids,
            events_tx,
            events_rx,
            active: None,
            last_submitted: None,
            state: LoadState::Idle,
            outstanding: 0,
            on_step: None,
            on_return: None,
            on_error: None,
            on_settled: None,
        }
    }

    /// Invoked once per intermediate value, in production order.
    pub fn on_step(&mut self, callback: impl FnMut(S) + Send + 'static) {
        self.on_step = Some(Box::new(callback));
    }

    /// Invoked once with the final value of a completed task.
    pub fn on_return(&mut self, callback: impl FnMut(R) + Send + 'static) {
        self.on_return = Some(Box::new(callback));
    }

    /// Invoked when the active task's work fails. Without a registered
    /// callback the error is dropped; the submission still settles.
    pub fn on_error(&mut self, callback: impl FnMut(PortalError) + Send + 'static) {
        self.on_error = Some(Box::new(callback));
    }

    /// Invoked once per submission when it settles, whether it completed,
    /// failed, or was cancelled. Stale tasks settle too.
    pub fn on_settled(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_settled = Some(Box::new(callback));
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == LoadState::Idle
    }

    /// Identity of the task whose callbacks are currently forwarded.
    pub fn active_task(&self) -> Option<TaskId> {
        self.active.as_ref().map(TaskHandle::id)
    }

    /// Cancels any in-flight task and starts a new one.
    pub fn submit(&mut self, work: Work<S, R>) -> TaskId {
        self.cancel();
        let id = self.ids.allocate();
        debug!(task = %id, "progress: submit");
        let handle = spawn_task(id, work, self.events_tx.clone());
        self.active = Some(handle);
        self.last_submitted = Some(id);
        self.state = LoadState::Loading;
        self.outstanding += 1;
        id
    }

    /// Requests cancellation of the active task, if any. The task's
    /// identity immediately stops matching the active one, so results it
    /// produces from here on are recognized as stale and dropped.
    pub fn cancel(&mut self) {
        let Some(handle) = self.active.take() else {
            return;
        };
        debug!(task = %handle.id(), "progress: cancel");
        handle.cancel();
        self.state = LoadState::Cancelling;
    }

    /// Delivers every event already queued, without blocking. Returns the
    /// number of events dispatched.
    pub fn pump_ready(&mut self) -> usize {
        let mut dispatched = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(event);
            dispatched += 1;
        }
        dispatched
    }

    /// Pumps events until every submission so far has settled. Completes
    /// immediately when nothing is outstanding.
    pub async fn settled(&mut self) {
        while self.outstanding > 0 {
            match self.events_rx.recv().await {
                Some(event) => self.dispatch(event),
                None => break,
            }
        }
    }

    fn is_active(&self, task: TaskId) -> bool {
        self.active_task() == Some(task)
    }

    fn dispatch(&mut self, event: TaskEvent<S, R>) {
        match event {
            TaskEvent::Step { task, value } => {
                if !self.is_active(task) {
                    debug!(task = %task, "progress: dropping stale step");
                    return;
                }
                if let Some(callback) = self.on_step.as_mut() {
                    callback(value);
                }
            }
            TaskEvent::Return { task, value } => {
                if !self.is_active(task) {
                    debug!(task = %task, "progress: dropping stale result");
                    return;
                }
                if let Some(callback) = self.on_return.as_mut() {
                    callback(value);
                }
            }
            TaskEvent::Error { task, error } => {
                if !self.is_active(task) {
                    debug!(task = %task, "progress: dropping stale error");
                    return;
                }
                match self.on_error.as_mut() {
                    Some(callback) => callback(error),
                    None => debug!(task = %task, %error, "progress: unhandled task error"),
                }
            }
            TaskEvent::Finished { task } => {
                self.outstanding = self.outstanding.saturating_sub(1);
                // Only the newest submission resets the loading state; a
                // straggler from a superseded task settles silently.
                if self.last_submitted == Some(task) {
                    self.active = None;
                    self.state = LoadState::Idle;
                }
                if let Some(callback) = self.on_settled.as_mut() {
                    callback();
                }
            }
        }
    }
}
