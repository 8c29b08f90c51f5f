//! Error model for payload framing and transport.

use thiserror::Error;

/// Result type used by parcel reads and the message codec.
pub type ParcelResult<T> = Result<T, ParcelError>;

/// A payload could not be read back in the layout the reader expected.
///
/// These are produced by untrusted input; callers at the process boundary
/// decide whether to surface or swallow them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParcelError {
    /// Fewer bytes remain than the next field needs.
    #[error("unexpected end of parcel: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// A length or count prefix was negative.
    #[error("invalid length prefix: {0}")]
    InvalidLength(i32),

    /// A string field did not contain UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A string field was written as absent where a value was required.
    #[error("unexpected null string")]
    NullString,

    /// An object slot referenced an index outside the object table.
    #[error("unknown object reference: {0}")]
    UnknownObject(i32),

    /// A keyed message did not start with the expected magic.
    #[error("bad message magic: {0:#x}")]
    BadMagic(i32),

    /// A keyed message value carried an unknown type tag.
    #[error("unknown value tag: {0}")]
    UnknownTag(i32),

    /// Nested messages exceeded the decoder's depth limit.
    #[error("keyed messages nested deeper than {0} levels")]
    NestingTooDeep(usize),
}

/// An outbound transaction could not be delivered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactError {
    /// The remote endpoint no longer exists (its process exited or the
    /// reference was revoked).
    #[error("remote endpoint is dead")]
    DeadObject,

    /// The substrate failed to deliver the transaction.
    #[error("transaction failed: {0}")]
    Failed(String),
}

impl TransactError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}
