//! Remote side of the job-finished transaction.
//!
//! [`CompletionEndpoint`] parses job-finished calls exactly the way the
//! remote scheduler does: it checks the transaction code, enforces the
//! interface token, and validates the result code before accepting it. It is
//! what a scheduler embeds into the [`PendingCallback`](crate::PendingCallback)
//! it sends, and the reference decoder for the wire contract in tests.

use std::sync::mpsc;

use tracing::{debug, warn};

use jobbridge_core::{Endpoint, Parcel, ParcelError, TransactError};

use crate::protocol::{
    CALLBACK_INTERFACE_TOKEN, EX_BAD_PARCELABLE, EX_ILLEGAL_ARGUMENT, EX_SECURITY,
    JOB_FINISHED_TRANSACTION, ResultCode, write_exception, write_no_exception,
};

/// Accepts job-finished transactions and forwards their result codes.
#[derive(Debug)]
pub struct CompletionEndpoint {
    results: mpsc::Sender<ResultCode>,
}

/// A transaction the remote party refuses, as `(exception code, message)`.
struct Refusal(i32, String);

impl From<ParcelError> for Refusal {
    fn from(value: ParcelError) -> Self {
        Refusal(EX_BAD_PARCELABLE, value.to_string())
    }
}

impl CompletionEndpoint {
    pub fn new(results: mpsc::Sender<ResultCode>) -> Self {
        Self { results }
    }

    /// Endpoint plus the receiving end of its result stream.
    pub fn channel() -> (Self, mpsc::Receiver<ResultCode>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }

    fn decode_job_finished(data: &mut Parcel) -> Result<ResultCode, Refusal> {
        // Strict-mode header: read past, never interpreted.
        data.read_i32()?;

        let token = data.read_string()?;
        if token != CALLBACK_INTERFACE_TOKEN {
            return Err(Refusal(
                EX_SECURITY,
                format!(
                    "transaction for interface '{token}', expected '{CALLBACK_INTERFACE_TOKEN}'"
                ),
            ));
        }

        let raw = data.read_i32()?;
        ResultCode::try_from(raw)
            .map_err(|raw| Refusal(EX_ILLEGAL_ARGUMENT, format!("unknown result code {raw}")))
    }
}

impl Endpoint for CompletionEndpoint {
    fn transact(&self, code: u32, mut data: Parcel, _flags: u32) -> Result<Parcel, TransactError> {
        if code != JOB_FINISHED_TRANSACTION {
            return Err(TransactError::failed(format!("unknown transaction code {code}")));
        }

        let mut reply = Parcel::new();
        match Self::decode_job_finished(&mut data) {
            Ok(result) => {
                // Nobody listening means the scheduler side is gone.
                self.results
                    .send(result)
                    .map_err(|_| TransactError::DeadObject)?;
                debug!(%result, "accepted job result");
                write_no_exception(&mut reply);
            }
            Err(Refusal(exception, message)) => {
                warn!(exception, %message, "refused job-finished transaction");
                write_exception(&mut reply, exception, &message);
            }
        }
        Ok(reply)
    }
}
