//! Error types for starting and joining managed threads.

use thiserror::Error;

/// Error starting a managed thread.
#[derive(Debug, Error)]
pub enum StartError {
    /// The OS refused to create the thread.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// The instance already owns a running thread.
    #[error("thread already started")]
    AlreadyStarted,
}

/// Error waiting for a managed thread to finish.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// The thread was still running when the timeout expired.
    #[error("timed out waiting for thread to exit")]
    TimedOut,
    /// The thread body panicked.
    #[error("thread body panicked: {0}")]
    Panicked(String),
}

impl JoinError {
    /// Builds a [`JoinError::Panicked`] from a panic payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        Self::Panicked(message)
    }
}
