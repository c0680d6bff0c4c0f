//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `directory`    | PlaylistDirectory  | In-memory tag links      |
//! | `log_playback` | PlaybackPort       | Serial log output        |
//! | `time`         | Clock, timer driver| ESP32 system timer       |
//!
//! The NFC reader and LED driver adapters live in [`crate::drivers`].

pub mod directory;
pub mod log_playback;
pub mod time;
