//! Serialized edit executor.
//!
//! [`EditExecutor::spawn`] moves an [`EditSession`] and its
//! [`CommandHistory`] onto one dedicated thread. Every push, undo and redo is
//! sent over a channel and runs there to completion, one at a time, so the
//! timeline has a single mutator even when requests come from many threads.

use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use splice_common::{EditError, EditResult};

use crate::command::Command;
use crate::history::CommandHistory;
use crate::state::EditSession;

type Inspector = Box<dyn FnOnce(&EditSession, &CommandHistory) + Send>;

enum Request {
    Push(Box<dyn Command>),
    Undo(Sender<bool>),
    Redo(Sender<bool>),
    Inspect(Inspector),
    Shutdown,
}

/// Spawns the edit thread.
pub struct EditExecutor;

impl EditExecutor {
    pub fn spawn(session: EditSession, history: CommandHistory) -> EditResult<ExecutorHandle> {
        let (tx, rx) = channel::unbounded::<Request>();
        let thread = thread::Builder::new()
            .name("edit-executor".into())
            .spawn(move || run(session, history, rx))?;
        tracing::debug!("Edit executor started");
        Ok(ExecutorHandle {
            tx,
            thread: Some(thread),
        })
    }
}

fn run(mut session: EditSession, mut history: CommandHistory, rx: Receiver<Request>) -> (EditSession, CommandHistory) {
    for request in rx.iter() {
        match request {
            Request::Push(command) => history.push(&mut session, command),
            Request::Undo(reply) => {
                let _ = reply.send(history.undo(&mut session));
            }
            Request::Redo(reply) => {
                let _ = reply.send(history.redo(&mut session));
            }
            Request::Inspect(f) => f(&session, &history),
            Request::Shutdown => break,
        }
    }
    tracing::debug!(undo_depth = history.undo_count(), "Edit executor stopped");
    (session, history)
}

/// Sending side of a running executor. Dropping it stops the thread.
pub struct ExecutorHandle {
    tx: Sender<Request>,
    thread: Option<thread::JoinHandle<(EditSession, CommandHistory)>>,
}

impl ExecutorHandle {
    /// Queue a command; it is applied after everything queued before it.
    pub fn push(&self, command: Box<dyn Command>) -> EditResult<()> {
        self.send(Request::Push(command))
    }

    /// Undo the last entry. `Ok(false)` when there was nothing to undo.
    pub fn undo(&self) -> EditResult<bool> {
        let (reply, answer) = channel::bounded(1);
        self.send(Request::Undo(reply))?;
        answer.recv().map_err(|_| EditError::ExecutorStopped)
    }

    pub fn redo(&self) -> EditResult<bool> {
        let (reply, answer) = channel::bounded(1);
        self.send(Request::Redo(reply))?;
        answer.recv().map_err(|_| EditError::ExecutorStopped)
    }

    /// Run `f` on the edit thread between two commands and return its result.
    pub fn inspect<R, F>(&self, f: F) -> EditResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&EditSession, &CommandHistory) -> R + Send + 'static,
    {
        let (reply, answer) = channel::bounded(1);
        self.send(Request::Inspect(Box::new(move |session, history| {
            let _ = reply.send(f(session, history));
        })))?;
        answer.recv().map_err(|_| EditError::ExecutorStopped)
    }

    /// Stop the thread after the queued requests and hand back its state.
    pub fn shutdown(mut self) -> EditResult<(EditSession, CommandHistory)> {
        let thread = self.thread.take().ok_or(EditError::ExecutorStopped)?;
        let _ = self.tx.send(Request::Shutdown);
        thread.join().map_err(|_| {
            tracing::error!("Edit executor panicked");
            EditError::ExecutorStopped
        })
    }

    fn send(&self, request: Request) -> EditResult<()> {
        self.tx.send(request).map_err(|_| EditError::ExecutorStopped)
    }
}

impl Drop for ExecutorHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.tx.send(Request::Shutdown);
            let _ = thread.join();
        }
    }
}
