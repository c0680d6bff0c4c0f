//! NFC tag domain: identifiers, debounce, association sessions and the
//! coordinator that ties them together.
//!
//! ```text
//!  reader thread ──▶ EventQueue ──▶ NfcCoordinator ──┬──▶ playback callbacks
//!                                    │      │         ├──▶ association callbacks
//!                  TagPresenceTracker ◀┘      └▶ AssociationSessionRegistry
//!                                                     └──▶ LedFeedback
//! ```

pub mod association;
pub mod coordinator;
pub mod presence;

use core::fmt;
use core::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;

use crate::error::MalformedEvent;

/// Maximum length of a normalized UID string.
pub const MAX_UID_CHARS: usize = 32;

/// Maximum raw UID length (ISO 14443 triple-size UID).
pub const MAX_UID_BYTES: usize = 10;

/// Raw UID bytes as delivered by a chip driver.
pub type UidBytes = heapless::Vec<u8, MAX_UID_BYTES>;

/// Playlist identifiers are owned by the (external) playlist store.
pub type PlaylistId = String;

// ---------------------------------------------------------------------------
// Tag identifier
// ---------------------------------------------------------------------------

/// Case-normalized hardware UID.  Equality is UID equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TagId(heapless::String<MAX_UID_CHARS>);

impl TagId {
    /// Trim and lower-case a UID string.
    pub fn parse(raw: &str) -> Result<Self, MalformedEvent> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MalformedEvent::EmptyUid);
        }
        if !trimmed.chars().all(|c| c.is_ascii_graphic()) {
            return Err(MalformedEvent::InvalidCharacter);
        }
        let mut uid = heapless::String::new();
        for c in trimmed.chars() {
            uid.push(c.to_ascii_lowercase())
                .map_err(|_| MalformedEvent::UidTooLong)?;
        }
        Ok(Self(uid))
    }

    /// Render raw UID bytes as lower-case hex (`04a1b2c3`).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MalformedEvent> {
        if bytes.is_empty() {
            return Err(MalformedEvent::EmptyUid);
        }
        let mut uid = heapless::String::new();
        for b in bytes {
            write!(uid, "{b:02x}").map_err(|_| MalformedEvent::UidTooLong)?;
        }
        Ok(Self(uid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Raw hardware payloads
// ---------------------------------------------------------------------------

/// A tag report exactly as a reader adapter produced it.
///
/// Normalization happens on the event loop, never on the hardware thread.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTagPayload {
    /// A UID string (`"04:A1:B2"`, `"04A1B2C3"`).
    Text(String),
    /// A JSON value: either a UID string or an object with a `uid` string.
    Json(Value),
    /// Raw UID bytes straight from the chip.
    Bytes(UidBytes),
    /// An identifier that was already normalized.
    Tag(TagId),
}

impl RawTagPayload {
    pub fn normalize(self) -> Result<TagId, MalformedEvent> {
        match self {
            Self::Tag(tag) => Ok(tag),
            Self::Text(text) => TagId::parse(&text),
            Self::Bytes(bytes) => TagId::from_bytes(&bytes),
            Self::Json(Value::String(text)) => TagId::parse(&text),
            Self::Json(Value::Object(map)) => match map.get("uid") {
                Some(Value::String(text)) => TagId::parse(text),
                _ => Err(MalformedEvent::MissingUid),
            },
            Self::Json(_) => Err(MalformedEvent::UnsupportedShape),
        }
    }
}

impl From<&str> for RawTagPayload {
    fn from(text: &str) -> Self {
        Self::Text(text.into())
    }
}

impl From<TagId> for RawTagPayload {
    fn from(tag: TagId) -> Self {
        Self::Tag(tag)
    }
}

impl From<Value> for RawTagPayload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}
