//! Timeout and failure isolation for collaborator calls.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};
use tracing::warn;

use crate::error::CollaboratorError;

/// Runs collaborator calls on a named worker thread and waits at most
/// `timeout` for the reply.
///
/// A call that times out is abandoned: its thread finishes in the
/// background and its reply is dropped.
#[derive(Debug, Clone, Copy)]
pub struct CollaboratorGuard {
    timeout: Duration,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl CollaboratorGuard {
    /// Creates a guard with the given per-call timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Calls `f` on a worker thread.
    ///
    /// # Errors
    ///
    /// `CollaboratorError::Timeout` when no reply arrives in time;
    /// `CollaboratorError::Unavailable` when the worker cannot be spawned,
    /// panics, or `f` itself fails.
    pub fn call<T, F>(&self, collaborator: &str, f: F) -> Result<T, CollaboratorError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, CollaboratorError> + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let spawned = thread::Builder::new()
            .name(format!("mathroute-{collaborator}"))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(f));
                let _ = tx.send(outcome);
            });
        if let Err(e) = spawned {
            return Err(CollaboratorError::unavailable(
                collaborator,
                format!("failed to spawn worker: {e}"),
            ));
        }

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => {
                let message = panic_message(payload.as_ref());
                warn!(collaborator, panic = %message, "collaborator panicked");
                Err(CollaboratorError::unavailable(
                    collaborator,
                    format!("panicked: {message}"),
                ))
            }
            Err(RecvTimeoutError::Timeout) => Err(CollaboratorError::Timeout {
                collaborator: collaborator.to_string(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(CollaboratorError::unavailable(
                collaborator,
                "worker exited without replying",
            )),
        }
    }
}
