//! # Worker Module
//!
//! Runs one long-lived producer task (streaming, paging or conversion) on a
//! dedicated thread and forwards its outcomes to listeners over channels.
//!
//! ## Notifications
//! - progress: integer percentages 0-100 on an independent channel,
//!   non-decreasing within one operation
//! - `WorkerEvent::Result`: the task's return value on success
//! - `WorkerEvent::Error`: the failure, when the task returns one
//! - `WorkerEvent::Finished`: always emitted last, success or not
//!
//! ## Cancellation
//! Cooperative only. `CancelToken` is a one-way flag the task polls at its
//! own checkpoints; nothing interrupts an in-flight I/O call or delivery.

use crate::error::SignalError;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// One-way cancellation request, polled by the running task.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; takes effect at the task's next
    /// checkpoint.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Receiver of integer percentage updates from a long-running operation.
pub trait ProgressSink {
    fn progress(&self, percent: u8);
}

/// Discards progress updates.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn progress(&self, _percent: u8) {}
}

impl ProgressSink for Sender<u8> {
    fn progress(&self, percent: u8) {
        let _ = self.send(percent);
    }
}

/// Terminal notifications from a worker task.
#[derive(Debug)]
pub enum WorkerEvent<T> {
    Result(T),
    Error(SignalError),
    Finished,
}

/// Handed to the task: its progress channel and cancellation flag.
pub struct WorkerScope {
    progress_tx: Sender<u8>,
    cancel: CancelToken,
}

impl WorkerScope {
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

impl ProgressSink for WorkerScope {
    fn progress(&self, percent: u8) {
        let _ = self.progress_tx.send(percent);
    }
}

/// A producer task running on its own thread.
///
/// Exactly one worker drives a given analyzer, pager or converter at a time.
pub struct Worker<T> {
    progress: Receiver<u8>,
    events: Receiver<WorkerEvent<T>>,
    cancel: CancelToken,
    handle: Option<thread::JoinHandle<()>>,
}

impl<T: Send + 'static> Worker<T> {
    /// Spawn `task` on a new thread. The task receives a `WorkerScope` for
    /// progress reporting and cancellation polling; its return value or error
    /// is forwarded as an event, followed by `Finished` in every case.
    pub fn spawn<F>(task: F) -> Self
    where
        F: FnOnce(&WorkerScope) -> Result<T, SignalError> + Send + 'static,
    {
        let (progress_tx, progress_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let cancel = CancelToken::new();
        let scope = WorkerScope {
            progress_tx,
            cancel: cancel.clone(),
        };

        let handle = thread::spawn(move || {
            match task(&scope) {
                Ok(value) => {
                    let _ = event_tx.send(WorkerEvent::Result(value));
                }
                Err(e) => {
                    log::error!("worker task failed: {}", e);
                    let _ = event_tx.send(WorkerEvent::Error(e));
                }
            }
            let _ = event_tx.send(WorkerEvent::Finished);
        });

        Self {
            progress: progress_rx,
            events: event_rx,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn progress(&self) -> &Receiver<u8> {
        &self.progress
    }

    pub fn events(&self) -> &Receiver<WorkerEvent<T>> {
        &self.events
    }

    /// Request cooperative cancellation of the running task.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the task thread to exit.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl<T> Drop for Worker<T> {
    fn drop(&mut self) {
        // The task observes the flag at its next checkpoint; a blocked chart
        // delivery unblocks once the consumer drops its receiver.
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
