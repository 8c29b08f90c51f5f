//! Remote-callable endpoints (transport abstraction).
//!
//! An [`Endpoint`] is the receiving side of a transaction: something that
//! accepts a numeric transaction code plus a framed [`Parcel`] and returns a
//! reply parcel. A [`Handle`] is a shared, transportable reference to one.
//!
//! ## Design Philosophy
//!
//! The protocol code above this layer only ever needs "build a payload,
//! dispatch it, read the acknowledgement". Everything substrate-specific
//! (sockets, shared memory, platform IPC) lives behind the trait:
//!
//! - **Transport-agnostic**: implementations decide how bytes and object
//!   references cross the boundary
//! - **Shared ownership**: both the remote party and the local process hold
//!   live references to the same endpoint; a handle is inert until invoked
//! - **Thread-safe**: handles are `Send + Sync` so they can be extracted on a
//!   delivery thread and invoked from a job thread

use std::fmt;
use std::sync::Arc;

use crate::error::TransactError;
use crate::parcel::Parcel;

/// Transaction flags: none set (synchronous call, the caller waits for the
/// substrate's acknowledgement).
pub const FLAG_NONE: u32 = 0;

/// Receiving side of a transaction.
pub trait Endpoint: Send + Sync + fmt::Debug {
    /// Deliver one transaction and return the reply payload.
    ///
    /// An empty reply is a valid acknowledgement.
    fn transact(&self, code: u32, data: Parcel, flags: u32) -> Result<Parcel, TransactError>;

    /// Whether the endpoint is still reachable.
    fn is_alive(&self) -> bool {
        true
    }
}

/// Shared reference to a remote-callable endpoint.
///
/// Cloning a handle produces another reference to the same endpoint; two
/// handles are equal when they point at the same endpoint.
#[derive(Clone)]
pub struct Handle(Arc<dyn Endpoint>);

impl Handle {
    pub fn new<E>(endpoint: E) -> Self
    where
        E: Endpoint + 'static,
    {
        Self(Arc::new(endpoint))
    }

    pub fn transact(&self, code: u32, data: Parcel, flags: u32) -> Result<Parcel, TransactError> {
        self.0.transact(code, data, flags)
    }

    pub fn is_alive(&self) -> bool {
        self.0.is_alive()
    }

    /// Whether both handles reference the same endpoint.
    pub fn same_endpoint(&self, other: &Handle) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.same_endpoint(other)
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.0).finish()
    }
}

impl<E> From<Arc<E>> for Handle
where
    E: Endpoint + 'static,
{
    fn from(value: Arc<E>) -> Self {
        Self(value)
    }
}
