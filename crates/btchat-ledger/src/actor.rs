//! Async actor front-end
//!
//! [`LedgerActor::spawn`] moves a [`LedgerEngine`] onto a tokio task that
//! drains a command queue one message at a time. Callers hold cheap,
//! cloneable [`LedgerHandle`]s and await each outcome on a oneshot reply.

use crate::command::{CommandOutcome, LedgerCommand};
use crate::engine::LedgerEngine;
use crate::error::LedgerError;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Default depth of the command queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Errors seen by actor callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    /// The engine rejected the command.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The actor task has stopped.
    #[error("ledger actor is no longer running")]
    Closed,
}

struct Request {
    command: LedgerCommand,
    reply: oneshot::Sender<Result<CommandOutcome, LedgerError>>,
}

/// Owner of the actor task.
pub struct LedgerActor;

impl LedgerActor {
    /// Spawn the actor on the current tokio runtime.
    ///
    /// The task stops once every handle has been dropped.
    pub fn spawn(engine: Arc<LedgerEngine>) -> (LedgerHandle, JoinHandle<()>) {
        Self::spawn_with_depth(engine, DEFAULT_QUEUE_DEPTH)
    }

    /// Spawn the actor with a custom queue depth.
    pub fn spawn_with_depth(
        engine: Arc<LedgerEngine>,
        depth: usize,
    ) -> (LedgerHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Request>(depth.max(1));
        let task = tokio::spawn(async move {
            while let Some(Request { command, reply }) = rx.recv().await {
                let name = command.name();
                let result = engine.execute(command);
                // A caller that stopped waiting is not an error.
                if reply.send(result).is_err() {
                    debug!(op = name, "caller dropped before reply");
                }
            }
            debug!("ledger actor stopped");
        });
        (LedgerHandle { tx }, task)
    }
}

/// Cloneable sender of ledger commands.
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    tx: mpsc::Sender<Request>,
}

impl LedgerHandle {
    /// Submit a command and wait for its outcome.
    pub async fn execute(&self, command: LedgerCommand) -> Result<CommandOutcome, HandleError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Request { command, reply })
            .await
            .map_err(|_| HandleError::Closed)?;
        let result = response.await.map_err(|_| HandleError::Closed)?;
        Ok(result?)
    }

    /// Whether the actor task is still accepting commands.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}
