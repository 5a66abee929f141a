//! Messaging-network identifiers.
//!
//! A [`Jid`] names a chat or participant as `user@server`, optionally
//! device-qualified as `user:device@server` for multi-device accounts. The
//! bridge needs both forms: the canonical text form for the engine's send
//! API, and the structured form the engine embeds in message metadata.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Errors from parsing a [`Jid`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JidError {
    /// No `@server` suffix was present.
    #[error("missing @server suffix")]
    MissingServer,

    /// The part before `@` was empty.
    #[error("empty user part")]
    EmptyUser,

    /// The part after `@` was empty.
    #[error("empty server part")]
    EmptyServer,

    /// The `:device` qualifier did not parse as a device number.
    #[error("invalid device qualifier: {0:?}")]
    InvalidDevice(String),
}

/// A messaging-network identifier, canonically `user@server`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Jid {
    /// Local user part.
    pub user: String,
    /// Server part, e.g. `s.whatsapp.net`.
    pub server: String,
    /// Optional device qualifier for multi-device accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<u16>,
}

impl Jid {
    /// Create a bare `user@server` identifier.
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self { user: user.into(), server: server.into(), device: None }
    }

    /// Create a device-qualified `user:device@server` identifier.
    pub fn with_device(user: impl Into<String>, server: impl Into<String>, device: u16) -> Self {
        Self { user: user.into(), server: server.into(), device: Some(device) }
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.device {
            Some(device) => write!(f, "{}:{}@{}", self.user, device, self.server),
            None => write!(f, "{}@{}", self.user, self.server),
        }
    }
}

impl FromStr for Jid {
    type Err = JidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (local, server) = s.split_once('@').ok_or(JidError::MissingServer)?;
        if server.is_empty() {
            return Err(JidError::EmptyServer);
        }

        let (user, device) = match local.split_once(':') {
            Some((user, device)) => {
                let device =
                    device.parse::<u16>().map_err(|_| JidError::InvalidDevice(device.to_owned()))?;
                (user, Some(device))
            },
            None => (local, None),
        };
        if user.is_empty() {
            return Err(JidError::EmptyUser);
        }

        Ok(Self { user: user.to_owned(), server: server.to_owned(), device })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_jid() {
        let jid: Jid = "123@s.whatsapp.net".parse().unwrap();
        assert_eq!(jid, Jid::new("123", "s.whatsapp.net"));
        assert_eq!(jid.to_string(), "123@s.whatsapp.net");
    }

    #[test]
    fn parses_device_qualified_jid() {
        let jid: Jid = "123:2@s.whatsapp.net".parse().unwrap();
        assert_eq!(jid, Jid::with_device("123", "s.whatsapp.net", 2));
        assert_eq!(jid.to_string(), "123:2@s.whatsapp.net");
    }

    #[test]
    fn rejects_missing_server() {
        assert_eq!("just-a-user".parse::<Jid>(), Err(JidError::MissingServer));
        assert_eq!("user@".parse::<Jid>(), Err(JidError::EmptyServer));
    }

    #[test]
    fn rejects_empty_user() {
        assert_eq!("@s.whatsapp.net".parse::<Jid>(), Err(JidError::EmptyUser));
        assert_eq!(":2@s.whatsapp.net".parse::<Jid>(), Err(JidError::EmptyUser));
    }

    #[test]
    fn rejects_bad_device_qualifier() {
        assert_eq!(
            "123:x@s.whatsapp.net".parse::<Jid>(),
            Err(JidError::InvalidDevice("x".to_owned()))
        );
    }

    #[test]
    fn serde_object_form_round_trips() {
        let jid = Jid::with_device("123", "s.whatsapp.net", 7);
        let json = serde_json::to_string(&jid).unwrap();
        let back: Jid = serde_json::from_str(&json).unwrap();
        assert_eq!(jid, back);
    }

    #[test]
    fn serde_accepts_object_without_device() {
        let jid: Jid = serde_json::from_str(r#"{"user":"123","server":"s.whatsapp.net"}"#).unwrap();
        assert_eq!(jid, Jid::new("123", "s.whatsapp.net"));
    }
}
