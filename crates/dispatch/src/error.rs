//! Error model for the bridge.

use thiserror::Error;

use jobbridge_core::{ParcelError, TransactError};

/// Why a callback entry could not be turned into a handle.
///
/// Only used for logging: the extractor collapses every variant into "no
/// callback available".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectedCallback {
    /// The entry is not a typed transport object at all.
    #[error("callback entry is a {0}, not a transport object")]
    NotAnObject(&'static str),

    /// The object declares a type other than the pending-callback type.
    #[error("callback object has unexpected type '{0}'")]
    WrongType(String),

    /// The object's payload does not contain a usable handle.
    #[error("callback payload is corrupt: {0}")]
    Corrupt(#[from] ParcelError),
}

/// Reporting a job result failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallbackError {
    /// The transaction never reached the remote party (dead endpoint or
    /// substrate failure).
    #[error(transparent)]
    Transact(#[from] TransactError),

    /// The remote party refused the transaction (e.g. interface mismatch).
    #[error("remote rejected job result (exception {code}): {message}")]
    RemoteRejected { code: i32, message: String },

    /// The acknowledgement could not be parsed.
    #[error("malformed acknowledgement: {0}")]
    MalformedReply(#[from] ParcelError),
}

/// The remainder of a job-fire message does not describe a runnable job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("job message has no '{0}' entry")]
    Missing(&'static str),

    #[error("job message has an empty '{0}' entry")]
    Empty(&'static str),

    #[error("job message entry '{key}' is a {found}, expected {expected}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// Failure while handling a job-fire event.
#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("failed to report job result: {0}")]
    Callback(#[from] CallbackError),

    #[error("failed to spawn job worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("job worker for '{0}' panicked")]
    WorkerPanicked(String),
}
