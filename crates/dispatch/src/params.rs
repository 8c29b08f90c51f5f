//! Application-visible job parameters.

use chrono::{DateTime, Utc};

use jobbridge_core::{InvocationId, KeyedMessage, Value};

use crate::error::ParamsError;
use crate::protocol::{EXTRAS_KEY, SERVICE_KEY, TAG_KEY};

/// What the application sees of a fired job: the remainder of the job-fire
/// message, with the well-known entries decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct JobParameters {
    invocation_id: InvocationId,
    tag: String,
    service: Option<String>,
    extras: KeyedMessage,
    fired_at: DateTime<Utc>,
    message: KeyedMessage,
}

impl JobParameters {
    /// Decode parameters from the message left after callback extraction.
    ///
    /// `tag` is required; `service` and `extras` are optional but must have
    /// the right type when present.
    pub fn from_message(message: KeyedMessage) -> Result<Self, ParamsError> {
        let tag = match message.get(TAG_KEY) {
            None => return Err(ParamsError::Missing(TAG_KEY)),
            Some(Value::String(tag)) if tag.is_empty() => return Err(ParamsError::Empty(TAG_KEY)),
            Some(Value::String(tag)) => tag.clone(),
            Some(other) => return Err(wrong_type(TAG_KEY, "string", other)),
        };

        let service = match message.get(SERVICE_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(service)) => Some(service.clone()),
            Some(other) => return Err(wrong_type(SERVICE_KEY, "string", other)),
        };

        let extras = match message.get(EXTRAS_KEY) {
            None | Some(Value::Null) => KeyedMessage::new(),
            Some(Value::Message(extras)) => extras.clone(),
            Some(other) => return Err(wrong_type(EXTRAS_KEY, "message", other)),
        };

        Ok(Self {
            invocation_id: InvocationId::new(),
            tag,
            service,
            extras,
            fired_at: Utc::now(),
            message,
        })
    }

    pub fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub fn extras(&self) -> &KeyedMessage {
        &self.extras
    }

    pub fn fired_at(&self) -> DateTime<Utc> {
        self.fired_at
    }

    /// The full remainder, including entries this type does not decode.
    pub fn message(&self) -> &KeyedMessage {
        &self.message
    }
}

fn wrong_type(key: &'static str, expected: &'static str, found: &Value) -> ParamsError {
    ParamsError::WrongType {
        key,
        expected,
        found: found.kind(),
    }
}
