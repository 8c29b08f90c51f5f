//! In-memory endpoint for tests/dev.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::error::TransactError;
use crate::parcel::Parcel;

/// One transaction as received by a [`RecordingEndpoint`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub code: u32,
    /// Payload, rewound to the start so tests can read it positionally.
    pub data: Parcel,
    pub flags: u32,
}

/// Endpoint that records every transaction it receives.
///
/// - No IO / no threads
/// - Replies with a canned parcel (empty by default, i.e. a bare
///   acknowledgement)
/// - Can be killed to simulate a remote process that went away
#[derive(Debug, Default)]
pub struct RecordingEndpoint {
    transactions: Mutex<Vec<Transaction>>,
    reply: Mutex<Parcel>,
    dead: AtomicBool,
}

impl RecordingEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Reply to every subsequent transaction with `reply`.
    pub fn reply_with(&self, reply: Parcel) {
        if let Ok(mut slot) = self.reply.lock() {
            *slot = reply;
        }
    }

    /// Mark the endpoint dead; later transactions fail with
    /// [`TransactError::DeadObject`].
    pub fn kill(&self) {
        self.dead.store(true, Ordering::SeqCst);
    }

    /// Transactions received so far, oldest first.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }
}

impl Endpoint for RecordingEndpoint {
    fn transact(&self, code: u32, mut data: Parcel, flags: u32) -> Result<Parcel, TransactError> {
        if !self.is_alive() {
            return Err(TransactError::DeadObject);
        }

        data.rewind();
        self.transactions
            .lock()
            .map_err(|_| TransactError::failed("lock poisoned"))?
            .push(Transaction { code, data, flags });

        let reply = self
            .reply
            .lock()
            .map_err(|_| TransactError::failed("lock poisoned"))?
            .clone();
        Ok(reply)
    }

    fn is_alive(&self) -> bool {
        !self.dead.load(Ordering::SeqCst)
    }
}
