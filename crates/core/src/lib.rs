//! `jobbridge-core` — payload framing and transport building blocks.
//!
//! This crate contains the **substrate-neutral** primitives the job bridge is
//! built on: framed parcels, remote-callable endpoint handles, and the keyed
//! message model with its wire codec. No protocol constants live here.

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod id;
pub mod in_memory;
pub mod message;
pub mod parcel;

pub use endpoint::{Endpoint, FLAG_NONE, Handle};
pub use error::{ParcelError, ParcelResult, TransactError};
pub use id::InvocationId;
pub use in_memory::{RecordingEndpoint, Transaction};
pub use message::{KeyedMessage, TransportObject, Value};
pub use parcel::Parcel;
