//! Callback extraction from job-fire messages.
//!
//! The remote scheduler delivers a keyed message when a job fires. By
//! convention it carries one entry under [`CALLBACK_KEY`] holding a
//! [`PendingCallback`] object; everything else is job parameters.
//!
//! The message crossed a process (and trust) boundary, so extraction is
//! defensive: a missing message, a missing entry, an entry of the wrong type
//! and a payload that does not reconstruct into a handle all collapse to
//! `None`. Nothing here panics or returns an error.

use tracing::{debug, warn};

use jobbridge_core::{Handle, KeyedMessage, Parcel, Value};

use crate::callback::RemoteCallback;
use crate::error::RejectedCallback;
use crate::protocol::{CALLBACK_KEY, PendingCallback};

/// A successfully extracted callback plus the rest of the message.
#[derive(Debug)]
pub struct Extraction {
    pub callback: RemoteCallback,
    /// The original message minus the callback entry; every other entry is
    /// untouched.
    pub remainder: KeyedMessage,
}

impl Extraction {
    pub fn into_parts(self) -> (RemoteCallback, KeyedMessage) {
        (self.callback, self.remainder)
    }
}

/// Detaches the completion callback from job-fire messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandleExtractor;

impl HandleExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Split `message` into its callback and the remaining entries.
    pub fn extract(&self, message: Option<KeyedMessage>) -> Option<Extraction> {
        let Some(mut message) = message else {
            debug!("no job message delivered; no callback available");
            return None;
        };

        let handle = match message.get(CALLBACK_KEY) {
            None => {
                debug!(entries = message.len(), "job message carries no callback entry");
                return None;
            }
            Some(value) => match recover_handle(value) {
                Ok(handle) => handle,
                Err(reason) => {
                    warn!(%reason, "ignoring malformed callback entry");
                    return None;
                }
            },
        };

        message.remove(CALLBACK_KEY);
        debug!(remaining = message.len(), "extracted job callback");

        Some(Extraction {
            callback: RemoteCallback::new(handle),
            remainder: message,
        })
    }

    /// Decode a job-fire message straight off the wire, then
    /// [`extract`](Self::extract) it.
    ///
    /// A message that fails to decode is treated like a missing one.
    pub fn extract_from_parcel(&self, parcel: &mut Parcel) -> Option<Extraction> {
        match KeyedMessage::read_from_parcel(parcel) {
            Ok(message) => self.extract(Some(message)),
            Err(err) => {
                warn!(error = %err, "discarding undecodable job message");
                None
            }
        }
    }
}

fn recover_handle(value: &Value) -> Result<Handle, RejectedCallback> {
    match value {
        Value::Object(object) => {
            PendingCallback::from_object(object).map(PendingCallback::into_handle)
        }
        other => Err(RejectedCallback::NotAnObject(other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobbridge_core::{RecordingEndpoint, TransportObject};
    use proptest::prelude::*;

    use crate::protocol::PENDING_CALLBACK_TYPE;

    fn valid_callback() -> (Handle, TransportObject) {
        let handle = Handle::from(RecordingEndpoint::shared());
        let object = PendingCallback::new(handle.clone()).into_object();
        (handle, object)
    }

    #[test]
    fn absent_message_yields_nothing() {
        assert!(HandleExtractor::new().extract(None).is_none());
    }

    #[test]
    fn message_without_callback_yields_nothing() {
        assert!(HandleExtractor::new().extract(Some(KeyedMessage::new())).is_none());

        let message = KeyedMessage::new().with("tag", "sync");
        assert!(HandleExtractor::new().extract(Some(message)).is_none());
    }

    #[test]
    fn object_of_another_type_yields_nothing() {
        let mut payload = Parcel::new();
        payload.write_i32(1);
        let message =
            KeyedMessage::new().with(CALLBACK_KEY, TransportObject::new("demo.BadObject", payload));

        assert!(HandleExtractor::new().extract(Some(message)).is_none());
    }

    #[test]
    fn plain_values_under_the_key_yield_nothing() {
        let handle = Handle::from(RecordingEndpoint::shared());
        for value in [
            Value::Null,
            Value::Int(1),
            Value::String("callback".to_string()),
            Value::Message(KeyedMessage::new()),
            // A bare handle has no declared type, so its capability is unknown.
            Value::Handle(handle),
        ] {
            let message = KeyedMessage::new().with(CALLBACK_KEY, value);
            assert!(HandleExtractor::new().extract(Some(message)).is_none());
        }
    }

    #[test]
    fn corrupt_callback_payload_yields_nothing() {
        let mut payload = Parcel::new();
        payload.write_i32(4); // object index with an empty object table
        let message = KeyedMessage::new().with(
            CALLBACK_KEY,
            TransportObject::new(PENDING_CALLBACK_TYPE, payload),
        );

        assert!(HandleExtractor::new().extract(Some(message)).is_none());
    }

    #[test]
    fn valid_callback_is_stripped_from_the_remainder() {
        let (handle, object) = valid_callback();
        let message = KeyedMessage::new().with(CALLBACK_KEY, object);

        let extraction = HandleExtractor::new().extract(Some(message)).unwrap();
        assert!(extraction.remainder.is_empty());
        assert_eq!(extraction.callback.handle(), &handle);
    }

    #[test]
    fn unrelated_entries_pass_through_unchanged() {
        let (_, object) = valid_callback();
        let nested = KeyedMessage::new();
        let message = KeyedMessage::new()
            .with("foo", "bar")
            .with("bar", 3)
            .with("parcelable", nested.clone())
            .with(CALLBACK_KEY, object);

        let extraction = HandleExtractor::new().extract(Some(message)).unwrap();
        let remainder = extraction.remainder;
        assert_eq!(remainder.len(), 3);
        assert!(!remainder.contains_key(CALLBACK_KEY));
        assert_eq!(remainder.get_str("foo"), Some("bar"));
        assert_eq!(remainder.get_int("bar"), Some(3));
        assert_eq!(remainder.get_message("parcelable"), Some(&nested));
    }

    #[test]
    fn extraction_from_the_wire() {
        let (handle, object) = valid_callback();
        let message = KeyedMessage::new().with("tag", "upload").with(CALLBACK_KEY, object);
        let mut parcel = Parcel::new();
        message.write_to_parcel(&mut parcel);

        let extraction = HandleExtractor::new().extract_from_parcel(&mut parcel).unwrap();
        assert_eq!(extraction.callback.handle(), &handle);
        assert_eq!(extraction.remainder.get_str("tag"), Some("upload"));
    }

    #[test]
    fn undecodable_wire_message_yields_nothing() {
        let mut parcel = Parcel::new();
        parcel.write_i32(0xdead);
        assert!(HandleExtractor::new().extract_from_parcel(&mut parcel).is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: a message with K entries including the callback yields
        /// a remainder of exactly K - 1 entries, all unchanged.
        #[test]
        fn remainder_drops_exactly_the_callback(
            params in prop::collection::btree_map("[a-z]{1,8}", any::<i32>(), 0..16)
        ) {
            prop_assume!(!params.contains_key(CALLBACK_KEY));

            let (_, object) = valid_callback();
            let mut message: KeyedMessage = params.clone().into_iter().collect();
            message.insert(CALLBACK_KEY, object);
            let total = message.len();

            let extraction = HandleExtractor::new().extract(Some(message));
            prop_assert!(extraction.is_some());
            let remainder = extraction.map(|e| e.remainder).unwrap_or_default();

            prop_assert_eq!(remainder.len(), total - 1);
            for (key, value) in &params {
                prop_assert_eq!(remainder.get_int(key), Some(*value));
            }
        }
    }
}
