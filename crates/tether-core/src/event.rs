//! Typed taxonomy of engine event notifications.
//!
//! The engine reports events as JSON notifications of the form
//! `{"type": "<tag>", "data": {...}}`. [`Event::decode`] turns one
//! notification payload into a closed set of variants, matched exhaustively
//! so that modeling a new engine variant is a compile-checked decision.
//! Tags this crate does not model decode into [`Event::Other`] instead of
//! failing, so newer engines keep working against older bridges.
//!
//! Decoding never panics: malformed payloads come back as a
//! [`DecodeError`] carrying the raw text for diagnosis.

use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::jid::Jid;

/// Errors from decoding an event notification payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The payload was not valid JSON.
    #[error("notification is not valid JSON: {message}")]
    Syntax {
        /// Parser error text.
        message: String,
        /// The raw payload, kept for diagnosis.
        raw: String,
    },

    /// The payload carried no `type` tag.
    #[error("notification has no event tag")]
    MissingTag {
        /// The raw payload, kept for diagnosis.
        raw: String,
    },

    /// The tag was recognized but its `data` did not match the schema.
    #[error("malformed {tag} payload: {message}")]
    Payload {
        /// The event tag whose payload failed to decode.
        tag: String,
        /// Deserializer error text.
        message: String,
        /// The raw payload, kept for diagnosis.
        raw: String,
    },
}

/// Where a message came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSource {
    /// Chat the message was posted in.
    pub chat: Jid,
    /// Participant who sent it.
    pub sender: Jid,
    /// Whether the local account sent it.
    #[serde(default)]
    pub is_from_me: bool,
    /// Whether the chat is a group.
    #[serde(default)]
    pub is_group: bool,
}

/// Metadata the engine attaches to an inbound message.
///
/// The engine serializes more fields than the bridge models; unknown fields
/// are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    /// Message origin.
    pub source: MessageSource,
    /// Engine-assigned message identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Sender's display name, if the engine knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_name: Option<String>,
    /// Engine timestamp, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Discriminant for [`Event`], used as the handler-registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`Event::PairingQrCode`]
    PairingQrCode,
    /// [`Event::Message`]
    Message,
    /// [`Event::Connected`]
    Connected,
    /// [`Event::LoggedOut`]
    LoggedOut,
    /// [`Event::SerializationError`]
    SerializationError,
    /// [`Event::Other`]
    Other,
}

/// One decoded engine event.
///
/// Events are immutable once constructed and carry no identity beyond
/// arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A pairing code to present out-of-band for authenticating a session.
    PairingQrCode {
        /// Code to render as a QR image.
        code: String,
        /// How long the code stays valid.
        timeout: Duration,
    },

    /// An inbound message.
    Message {
        /// Message metadata.
        info: MessageInfo,
        /// Plain-text content, absent for non-text messages.
        text: Option<String>,
    },

    /// The engine completed its session handshake.
    Connected,

    /// The session was ended remotely.
    LoggedOut {
        /// Engine-reported reason.
        reason: String,
    },

    /// The engine failed to serialize an event on its side.
    SerializationError {
        /// Engine-reported error text.
        error: String,
    },

    /// A tag this crate does not model. Carries the raw notification.
    Other {
        /// The undecoded notification.
        raw: Value,
    },
}

#[derive(Deserialize)]
struct PairingQrCodeData {
    code: String,
    timeout: u64,
}

#[derive(Deserialize)]
struct MessageData {
    info: MessageInfo,
    #[serde(rename = "textContent", default)]
    text_content: Option<String>,
}

#[derive(Deserialize)]
struct LoggedOutData {
    reason: String,
}

#[derive(Deserialize)]
struct SerializationErrorData {
    error: String,
}

impl Event {
    /// Decode one notification payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the payload is not JSON, has no tag, or a
    /// recognized tag's data does not match its schema. Unknown tags are
    /// not an error; they decode into [`Event::Other`].
    pub fn decode(payload: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(payload).map_err(|error| DecodeError::Syntax {
            message: error.to_string(),
            raw: payload.to_owned(),
        })?;

        let Some(tag) = value.get("type").and_then(Value::as_str) else {
            return Err(DecodeError::MissingTag { raw: payload.to_owned() });
        };
        let data = value.get("data").cloned().unwrap_or(Value::Null);

        match tag {
            "PairingQrCode" => {
                let wire: PairingQrCodeData = decode_data(tag, data, payload)?;
                Ok(Self::PairingQrCode {
                    code: wire.code,
                    timeout: Duration::from_secs(wire.timeout),
                })
            },
            "Message" => {
                let wire: MessageData = decode_data(tag, data, payload)?;
                Ok(Self::Message { info: wire.info, text: wire.text_content })
            },
            "Connected" => Ok(Self::Connected),
            "LoggedOut" => {
                let wire: LoggedOutData = decode_data(tag, data, payload)?;
                Ok(Self::LoggedOut { reason: wire.reason })
            },
            "SerializationError" => {
                let wire: SerializationErrorData = decode_data(tag, data, payload)?;
                Ok(Self::SerializationError { error: wire.error })
            },
            _ => Ok(Self::Other { raw: value }),
        }
    }

    /// The discriminant used to route this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PairingQrCode { .. } => EventKind::PairingQrCode,
            Self::Message { .. } => EventKind::Message,
            Self::Connected => EventKind::Connected,
            Self::LoggedOut { .. } => EventKind::LoggedOut,
            Self::SerializationError { .. } => EventKind::SerializationError,
            Self::Other { .. } => EventKind::Other,
        }
    }
}

fn decode_data<T: DeserializeOwned>(
    tag: &str,
    data: Value,
    payload: &str,
) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|error| DecodeError::Payload {
        tag: tag.to_owned(),
        message: error.to_string(),
        raw: payload.to_owned(),
    })
}
