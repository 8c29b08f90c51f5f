//! Parcel encoding of keyed messages.
//!
//! Layout:
//!
//! ```text
//! magic:i32  count:i32  { key:string  tag:i32  value }*
//! ```
//!
//! Object values are written as `type:string payload:bytes objects:i32
//! handle*`, so the payload's own object table is carried along with it.
//! Decoding never interprets object payloads.

use tracing::debug;

use crate::error::{ParcelError, ParcelResult};
use crate::message::{KeyedMessage, TransportObject, Value};
use crate::parcel::Parcel;

/// "BNDL", little-endian.
pub const MESSAGE_MAGIC: i32 = 0x4C44_4E42;

/// Decoder limit on nested messages.
pub const MAX_NESTING: usize = 32;

const TAG_NULL: i32 = -1;
const TAG_STRING: i32 = 0;
const TAG_INT: i32 = 1;
const TAG_MESSAGE: i32 = 3;
const TAG_OBJECT: i32 = 4;
const TAG_LONG: i32 = 6;
const TAG_DOUBLE: i32 = 8;
const TAG_BOOL: i32 = 9;
const TAG_HANDLE: i32 = 15;

impl KeyedMessage {
    /// Append this message to `parcel`.
    pub fn write_to_parcel(&self, parcel: &mut Parcel) {
        parcel.write_i32(MESSAGE_MAGIC);
        parcel.write_len(self.len());
        for (key, value) in self {
            parcel.write_string(key);
            write_value(parcel, value);
        }
    }

    /// Read a message from the current position of `parcel`.
    ///
    /// Fails on any framing problem; object payloads are kept opaque.
    pub fn read_from_parcel(parcel: &mut Parcel) -> ParcelResult<Self> {
        let message = read_message(parcel, 0)?;
        debug!(entries = message.len(), "decoded keyed message");
        Ok(message)
    }
}

fn write_value(parcel: &mut Parcel, value: &Value) {
    match value {
        Value::Null => parcel.write_i32(TAG_NULL),
        Value::Bool(v) => {
            parcel.write_i32(TAG_BOOL);
            parcel.write_bool(*v);
        }
        Value::Int(v) => {
            parcel.write_i32(TAG_INT);
            parcel.write_i32(*v);
        }
        Value::Long(v) => {
            parcel.write_i32(TAG_LONG);
            parcel.write_i64(*v);
        }
        Value::Double(v) => {
            parcel.write_i32(TAG_DOUBLE);
            parcel.write_f64(*v);
        }
        Value::String(v) => {
            parcel.write_i32(TAG_STRING);
            parcel.write_string(v);
        }
        Value::Message(m) => {
            parcel.write_i32(TAG_MESSAGE);
            m.write_to_parcel(parcel);
        }
        Value::Object(o) => {
            parcel.write_i32(TAG_OBJECT);
            write_object(parcel, o);
        }
        Value::Handle(h) => {
            parcel.write_i32(TAG_HANDLE);
            parcel.write_handle(h);
        }
    }
}

fn write_object(parcel: &mut Parcel, object: &TransportObject) {
    let payload = object.payload();
    parcel.write_string(object.type_name());
    parcel.write_byte_array(payload.data());
    parcel.write_len(payload.objects().len());
    for handle in payload.objects() {
        parcel.write_handle(handle);
    }
}

fn read_message(parcel: &mut Parcel, depth: usize) -> ParcelResult<KeyedMessage> {
    if depth > MAX_NESTING {
        return Err(ParcelError::NestingTooDeep(MAX_NESTING));
    }

    let magic = parcel.read_i32()?;
    if magic != MESSAGE_MAGIC {
        return Err(ParcelError::BadMagic(magic));
    }

    // The count comes from the wire; entries are read one at a time so a
    // bogus count runs out of bytes instead of allocating.
    let count = parcel.read_len()?;
    let mut message = KeyedMessage::new();
    for _ in 0..count {
        let key = parcel.read_string()?;
        let value = read_value(parcel, depth)?;
        message.insert(key, value);
    }
    Ok(message)
}

fn read_value(parcel: &mut Parcel, depth: usize) -> ParcelResult<Value> {
    let tag = parcel.read_i32()?;
    let value = match tag {
        TAG_NULL => Value::Null,
        TAG_BOOL => Value::Bool(parcel.read_bool()?),
        TAG_INT => Value::Int(parcel.read_i32()?),
        TAG_LONG => Value::Long(parcel.read_i64()?),
        TAG_DOUBLE => Value::Double(parcel.read_f64()?),
        TAG_STRING => Value::String(parcel.read_string()?),
        TAG_MESSAGE => Value::Message(read_message(parcel, depth + 1)?),
        TAG_OBJECT => Value::Object(read_object(parcel)?),
        TAG_HANDLE => Value::Handle(parcel.read_handle()?),
        other => return Err(ParcelError::UnknownTag(other)),
    };
    Ok(value)
}

fn read_object(parcel: &mut Parcel) -> ParcelResult<TransportObject> {
    let type_name = parcel.read_string()?;
    let data = parcel.read_byte_array()?;
    let count = parcel.read_len()?;
    let mut objects = Vec::new();
    for _ in 0..count {
        objects.push(parcel.read_handle()?);
    }
    Ok(TransportObject::new(
        type_name,
        Parcel::from_parts(data, objects),
    ))
}
