//! Framed transaction payloads.
//!
//! A [`Parcel`] is a flat byte stream of little-endian 32-bit slots plus an
//! object table for [`Handle`]s. Writing a handle appends it to the table and
//! writes its index into the byte stream, so the handle travels next to the
//! data without any process-wide identity map.
//!
//! Reads are positional and fully checked: a reader that disagrees with the
//! writer about the layout gets a [`ParcelError`], never a panic.

use crate::endpoint::Handle;
use crate::error::{ParcelError, ParcelResult};

/// Width of one framing slot; every write is padded to a multiple of it.
const SLOT: usize = 4;

/// Length prefix marking an absent string.
const NULL_LENGTH: i32 = -1;

fn padded(len: usize) -> usize {
    (len + SLOT - 1) & !(SLOT - 1)
}

/// Framed payload of one transaction (or one reply).
#[derive(Debug, Clone, Default)]
pub struct Parcel {
    data: Vec<u8>,
    objects: Vec<Handle>,
    position: usize,
}

impl Parcel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a parcel from its byte stream and object table, positioned at
    /// the start.
    pub fn from_parts(data: Vec<u8>, objects: Vec<Handle>) -> Self {
        Self {
            data,
            objects,
            position: 0,
        }
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<Handle>) {
        (self.data, self.objects)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn objects(&self) -> &[Handle] {
        &self.objects
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Move the read cursor back to the start.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    // ---- writes -----------------------------------------------------------

    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.data.extend_from_slice(&value.to_bits().to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_i32(i32::from(value));
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) {
        self.write_len(value.len());
        self.write_padded(value.as_bytes());
    }

    /// Write the absent-string marker.
    pub fn write_null_string(&mut self) {
        self.write_i32(NULL_LENGTH);
    }

    /// Write a length-prefixed byte blob.
    pub fn write_byte_array(&mut self, bytes: &[u8]) {
        self.write_len(bytes.len());
        self.write_padded(bytes);
    }

    /// Append a handle to the object table and write its index.
    pub fn write_handle(&mut self, handle: &Handle) {
        let index = self.objects.len();
        self.objects.push(handle.clone());
        self.write_len(index);
    }

    pub(crate) fn write_len(&mut self, len: usize) {
        // Payloads above i32::MAX cannot be framed; clamp so the reader fails
        // on the length instead of misreading the stream.
        self.write_i32(i32::try_from(len).unwrap_or(i32::MAX));
    }

    fn write_padded(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.data.resize(self.data.len() + padded(bytes.len()) - bytes.len(), 0);
    }

    // ---- reads ------------------------------------------------------------

    pub fn read_i32(&mut self) -> ParcelResult<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i64(&mut self) -> ParcelResult<i64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(buf))
    }

    pub fn read_f64(&mut self) -> ParcelResult<f64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(f64::from_bits(u64::from_le_bytes(buf)))
    }

    pub fn read_bool(&mut self) -> ParcelResult<bool> {
        Ok(self.read_i32()? != 0)
    }

    /// Read a string that must be present.
    pub fn read_string(&mut self) -> ParcelResult<String> {
        self.read_optional_string()?.ok_or(ParcelError::NullString)
    }

    /// Read a string that may have been written with
    /// [`write_null_string`](Self::write_null_string).
    pub fn read_optional_string(&mut self) -> ParcelResult<Option<String>> {
        let len = self.read_i32()?;
        if len == NULL_LENGTH {
            return Ok(None);
        }
        let bytes = self.read_padded(len)?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| ParcelError::InvalidUtf8)
    }

    pub fn read_byte_array(&mut self) -> ParcelResult<Vec<u8>> {
        let len = self.read_i32()?;
        self.read_padded(len)
    }

    /// Read an object index and resolve it against the object table.
    pub fn read_handle(&mut self) -> ParcelResult<Handle> {
        let index = self.read_i32()?;
        usize::try_from(index)
            .ok()
            .and_then(|i| self.objects.get(i))
            .cloned()
            .ok_or(ParcelError::UnknownObject(index))
    }

    /// Read a non-negative length or count prefix.
    pub fn read_len(&mut self) -> ParcelResult<usize> {
        let len = self.read_i32()?;
        usize::try_from(len).map_err(|_| ParcelError::InvalidLength(len))
    }

    fn read_padded(&mut self, len: i32) -> ParcelResult<Vec<u8>> {
        let len = usize::try_from(len).map_err(|_| ParcelError::InvalidLength(len))?;
        let bytes = self.take(padded(len))?;
        Ok(bytes[..len].to_vec())
    }

    fn take(&mut self, n: usize) -> ParcelResult<&[u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(ParcelError::UnexpectedEof {
                needed: n,
                remaining,
            });
        }
        let start = self.position;
        self.position += n;
        Ok(&self.data[start..self.position])
    }
}

/// Parcels compare by content (bytes and object identities), not by read
/// position.
impl PartialEq for Parcel {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.objects == other.objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::RecordingEndpoint;

    #[test]
    fn primitives_read_back_in_write_order() {
        let mut p = Parcel::new();
        p.write_i32(-7);
        p.write_i64(1 << 40);
        p.write_f64(2.5);
        p.write_bool(true);
        p.write_i32(i32::MIN);

        assert_eq!(p.read_i32().unwrap(), -7);
        assert_eq!(p.read_i64().unwrap(), 1 << 40);
        assert_eq!(p.read_f64().unwrap(), 2.5);
        assert!(p.read_bool().unwrap());
        assert_eq!(p.read_i32().unwrap(), i32::MIN);
        assert_eq!(p.remaining(), 0);
    }

    #[test]
    fn strings_are_padded_to_slot_boundaries() {
        let mut p = Parcel::new();
        p.write_string("abc");
        p.write_i32(42);

        // 4 (length) + 4 (3 bytes padded) + 4 (int)
        assert_eq!(p.data_size(), 12);
        assert_eq!(p.read_string().unwrap(), "abc");
        assert_eq!(p.read_i32().unwrap(), 42);
    }

    #[test]
    fn empty_string_occupies_only_its_prefix() {
        let mut p = Parcel::new();
        p.write_string("");
        assert_eq!(p.data_size(), 4);
        assert_eq!(p.read_string().unwrap(), "");
    }

    #[test]
    fn null_string_is_distinct_from_empty() {
        let mut p = Parcel::new();
        p.write_null_string();
        p.write_null_string();

        assert_eq!(p.read_optional_string().unwrap(), None);
        assert_eq!(p.read_string().unwrap_err(), ParcelError::NullString);
    }

    #[test]
    fn reading_past_the_end_fails() {
        let mut p = Parcel::new();
        p.write_i32(1);
        p.read_i32().unwrap();

        assert_eq!(
            p.read_i32().unwrap_err(),
            ParcelError::UnexpectedEof {
                needed: 4,
                remaining: 0
            }
        );
    }

    #[test]
    fn string_length_beyond_payload_fails() {
        let mut p = Parcel::new();
        p.write_i32(64);
        p.write_i32(0);

        assert!(matches!(
            p.read_string(),
            Err(ParcelError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn negative_string_length_fails() {
        let mut p = Parcel::new();
        p.write_i32(-5);
        assert_eq!(p.read_string().unwrap_err(), ParcelError::InvalidLength(-5));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut p = Parcel::new();
        p.write_byte_array(&[0xff, 0xfe]);
        assert_eq!(p.read_string().unwrap_err(), ParcelError::InvalidUtf8);
    }

    #[test]
    fn handles_travel_in_the_object_table() {
        let endpoint = RecordingEndpoint::shared();
        let handle = Handle::from(endpoint);

        let mut p = Parcel::new();
        p.write_i32(9);
        p.write_handle(&handle);

        assert_eq!(p.objects().len(), 1);
        assert_eq!(p.read_i32().unwrap(), 9);
        assert_eq!(p.read_handle().unwrap(), handle);
    }

    #[test]
    fn unknown_object_index_fails() {
        let mut p = Parcel::new();
        p.write_i32(3);
        assert_eq!(p.read_handle().unwrap_err(), ParcelError::UnknownObject(3));

        let mut p = Parcel::new();
        p.write_i32(-1);
        assert_eq!(p.read_handle().unwrap_err(), ParcelError::UnknownObject(-1));
    }

    #[test]
    fn equality_ignores_read_position() {
        let mut a = Parcel::new();
        a.write_i32(1);
        let b = a.clone();
        a.read_i32().unwrap();

        assert_eq!(a, b);
        a.rewind();
        assert_eq!(a.position(), 0);
    }
}
