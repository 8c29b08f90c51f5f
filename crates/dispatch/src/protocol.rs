//! Wire contract with the remote scheduler.
//!
//! Everything the remote party parses positionally is defined here, so a
//! change on its side is a change to this one module:
//!
//! | Field | Type | Value |
//! |---|---|---|
//! | transaction code | u32 | [`JOB_FINISHED_TRANSACTION`] |
//! | strict-mode header | i32 | [`STRICT_MODE_HEADER`] |
//! | interface token | string | [`CALLBACK_INTERFACE_TOKEN`] |
//! | result code | i32 | [`ResultCode::code`] |
//!
//! Replies start with an exception code ([`EX_NONE`] on success), followed
//! by a message string when non-zero.

use serde::{Deserialize, Serialize};

use jobbridge_core::{Handle, Parcel, TransportObject};

use crate::error::{CallbackError, RejectedCallback};

/// First transaction code available to user-defined interfaces.
pub const FIRST_CALL_TRANSACTION: u32 = 0x0000_0001;

/// Transaction code of the job-finished call: the second custom slot.
pub const JOB_FINISHED_TRANSACTION: u32 = FIRST_CALL_TRANSACTION + 1;

/// Strict-mode policy header that precedes the interface token.
///
/// Only the penalty-gather bit is set. Written for compatibility, never
/// interpreted.
pub const STRICT_MODE_HEADER: i32 = i32::MIN;

/// Interface the remote scheduler expects job-finished calls on.
pub const CALLBACK_INTERFACE_TOKEN: &str = "com.google.android.gms.gcm.INetworkTaskCallback";

/// Declared type of the object carrying the callback handle.
pub const PENDING_CALLBACK_TYPE: &str = "com.google.android.gms.gcm.PendingCallback";

/// Reserved message key holding the callback.
pub const CALLBACK_KEY: &str = "callback";

/// Message key holding the job tag.
pub const TAG_KEY: &str = "tag";

/// Message key naming the application service the job targets.
pub const SERVICE_KEY: &str = "service";

/// Message key holding application extras.
pub const EXTRAS_KEY: &str = "extras";

pub const EX_NONE: i32 = 0;
pub const EX_SECURITY: i32 = -1;
pub const EX_BAD_PARCELABLE: i32 = -2;
pub const EX_ILLEGAL_ARGUMENT: i32 = -3;

/// Outcome of a job, as understood by the remote scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    /// The job finished.
    Success,
    /// The job failed and should be rescheduled.
    FailRetry,
    /// The job failed and must not be rescheduled.
    FailNoRetry,
}

impl ResultCode {
    pub fn code(self) -> i32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::FailRetry => 1,
            ResultCode::FailNoRetry => 2,
        }
    }
}

impl TryFrom<i32> for ResultCode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResultCode::Success),
            1 => Ok(ResultCode::FailRetry),
            2 => Ok(ResultCode::FailNoRetry),
            other => Err(other),
        }
    }
}

impl core::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            ResultCode::Success => "success",
            ResultCode::FailRetry => "fail_retry",
            ResultCode::FailNoRetry => "fail_no_retry",
        };
        f.write_str(name)
    }
}

/// The object the remote scheduler places under [`CALLBACK_KEY`]: a single
/// handle wrapped in a [`PENDING_CALLBACK_TYPE`] object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCallback {
    handle: Handle,
}

impl PendingCallback {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn into_handle(self) -> Handle {
        self.handle
    }

    /// Wrap the handle the way the remote scheduler sends it.
    pub fn into_object(self) -> TransportObject {
        let mut payload = Parcel::new();
        payload.write_handle(&self.handle);
        TransportObject::new(PENDING_CALLBACK_TYPE, payload)
    }

    /// Reconstruct from a received object.
    pub fn from_object(object: &TransportObject) -> Result<Self, RejectedCallback> {
        if object.type_name() != PENDING_CALLBACK_TYPE {
            return Err(RejectedCallback::WrongType(object.type_name().to_string()));
        }
        let handle = object.open().read_handle()?;
        Ok(Self { handle })
    }
}

/// Write the success header of a reply.
pub fn write_no_exception(reply: &mut Parcel) {
    reply.write_i32(EX_NONE);
}

/// Write a failure reply.
pub fn write_exception(reply: &mut Parcel, code: i32, message: &str) {
    reply.write_i32(code);
    reply.write_string(message);
}

/// Read the header of a reply.
///
/// An empty reply is a bare acknowledgement.
pub fn read_exception(reply: &mut Parcel) -> Result<(), CallbackError> {
    if reply.is_empty() {
        return Ok(());
    }

    let code = reply.read_i32()?;
    if code == EX_NONE {
        return Ok(());
    }

    let message = reply.read_optional_string().ok().flatten().unwrap_or_default();
    Err(CallbackError::RemoteRejected { code, message })
}
