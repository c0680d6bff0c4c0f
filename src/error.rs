//! Unified error types for the TagPlayer firmware.
//!
//! Every fallible operation funnels into [`Error`], keeping the event loop's
//! error handling uniform.  All variants are `Copy` so they can be logged,
//! counted and returned from hardware callbacks without allocation.
//!
//! Propagation policy: hardware and LED failures are caught at the boundary
//! of the component that called the port and converted to a `bool`; they
//! never unwind across the coordinator's public API.

use core::fmt;

use crate::led::LedState;
use crate::nfc::association::SessionId;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A driver call failed.  The system continues degraded.
    HardwareIo(HardwareError),
    /// A tag payload could not be turned into a [`TagId`](crate::nfc::TagId).
    MalformedEvent(MalformedEvent),
    /// Stop/override on a session that has already gone.
    SessionNotFound(SessionId),
    /// `set_state` on a state that has no entry in the LED table.
    UnknownLedState(LedState),
    /// The playlist directory rejected a lookup or link.
    Directory(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardwareIo(e) => write!(f, "hardware: {e}"),
            Self::MalformedEvent(e) => write!(f, "malformed tag event: {e}"),
            Self::SessionNotFound(id) => write!(f, "association session {id} not found"),
            Self::UnknownLedState(state) => write!(f, "no LED config for {state:?}"),
            Self::Directory(msg) => write!(f, "directory: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// Peripheral initialisation failed.
    InitFailed,
    /// The driver has not been initialised yet.
    NotInitialized,
    /// A bus read (UART, SPI, I²C) failed or timed out.
    ReadFailed,
    /// A PWM / GPIO write failed.
    WriteFailed,
    /// The reader thread could not be spawned or is already running.
    Busy,
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitFailed => write!(f, "init failed"),
            Self::NotInitialized => write!(f, "not initialised"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::Busy => write!(f, "busy"),
        }
    }
}

impl std::error::Error for HardwareError {}

impl From<HardwareError> for Error {
    fn from(e: HardwareError) -> Self {
        Self::HardwareIo(e)
    }
}

// ---------------------------------------------------------------------------
// Malformed tag payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedEvent {
    /// The UID was empty after trimming.
    EmptyUid,
    /// The UID does not fit the fixed-capacity identifier.
    UidTooLong,
    /// The UID contains whitespace or non-printable characters.
    InvalidCharacter,
    /// A map payload without a string `uid` field.
    MissingUid,
    /// Any payload shape other than string, `{uid: ...}` map or raw bytes.
    UnsupportedShape,
}

impl fmt::Display for MalformedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUid => write!(f, "empty UID"),
            Self::UidTooLong => write!(f, "UID too long"),
            Self::InvalidCharacter => write!(f, "invalid character in UID"),
            Self::MissingUid => write!(f, "map payload has no string 'uid'"),
            Self::UnsupportedShape => write!(f, "unsupported payload shape"),
        }
    }
}

impl std::error::Error for MalformedEvent {}

impl From<MalformedEvent> for Error {
    fn from(e: MalformedEvent) -> Self {
        Self::MalformedEvent(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
