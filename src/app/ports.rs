//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NfcCoordinator / LedPriorityStack (domain)
//! ```
//!
//! Driven adapters (NFC reader, LED driver, playlist store, playback engine)
//! implement these traits.  The domain consumes them via generics, so the
//! core never touches hardware directly.
//!
//! ## Threading notes
//!
//! - **NfcReaderPort** callbacks run on the reader's own thread.  They must
//!   only hand the payload off (see [`EventProducer`](super::events::EventProducer)).
//! - Every other port is called from the event loop only.

use crate::error::{HardwareError, Result};
use crate::led::{Animation, LedState, Rgb};
use crate::nfc::{PlaylistId, RawTagPayload, TagId};

// ───────────────────────────────────────────────────────────────
// NFC reader port (driving adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Fired on the reader thread for every "tag present" report.
pub type TagDetectedCallback = Box<dyn Fn(RawTagPayload) + Send + Sync>;

/// Fired on the reader thread when the present tag disappears.
pub type TagRemovedCallback = Box<dyn Fn() + Send + Sync>;

pub trait NfcReaderPort {
    fn set_tag_detected_callback(&mut self, callback: TagDetectedCallback);

    fn set_tag_removed_callback(&mut self, callback: TagRemovedCallback);

    /// Start scanning.  Idempotent while already running.
    fn start_detection(&mut self) -> core::result::Result<(), HardwareError>;

    /// Stop scanning and wait for the reader thread to exit.
    fn stop_detection(&mut self);

    fn is_detecting(&self) -> bool;

    fn hardware_status(&self) -> NfcHardwareStatus;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfcHardwareStatus {
    pub initialized: bool,
    pub detecting: bool,
    /// Successful scans that returned a tag.
    pub reads: u32,
    /// Failed bus transactions.
    pub read_errors: u32,
    pub last_error: Option<HardwareError>,
}

// ───────────────────────────────────────────────────────────────
// LED driver port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

pub trait LedDriverPort {
    fn initialize(&mut self) -> core::result::Result<(), HardwareError>;

    /// Show `color` with `animation` at `speed` (1.0 = nominal rate).
    fn set_animation(
        &mut self,
        color: Rgb,
        animation: Animation,
        speed: f32,
    ) -> core::result::Result<(), HardwareError>;

    fn turn_off(&mut self) -> core::result::Result<(), HardwareError>;

    /// Global brightness, 0.0–1.0.
    fn set_brightness(&mut self, level: f32) -> core::result::Result<(), HardwareError>;

    /// Release the peripheral.  The driver must be re-initialised afterwards.
    fn cleanup(&mut self);

    fn status(&self) -> LedDriverStatus;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedDriverStatus {
    pub initialized: bool,
    pub brightness: f32,
    /// `None` while the LED is off.
    pub color: Option<Rgb>,
    pub animation: Option<Animation>,
    pub write_errors: u32,
}

// ───────────────────────────────────────────────────────────────
// LED feedback port (domain → LED stack)
// ───────────────────────────────────────────────────────────────

/// Best-effort visual feedback.  Failures are logged by the implementor and
/// reported as `false`; callers never treat them as fatal.
pub trait LedFeedback {
    fn set(&self, state: LedState) -> bool;

    fn clear(&self, state: LedState) -> bool;
}

impl<T: LedFeedback + ?Sized> LedFeedback for &T {
    fn set(&self, state: LedState) -> bool {
        (**self).set(state)
    }

    fn clear(&self, state: LedState) -> bool {
        (**self).clear(state)
    }
}

impl<T: LedFeedback + ?Sized> LedFeedback for std::sync::Arc<T> {
    fn set(&self, state: LedState) -> bool {
        (**self).set(state)
    }

    fn clear(&self, state: LedState) -> bool {
        (**self).clear(state)
    }
}

// ───────────────────────────────────────────────────────────────
// Playlist directory port (domain ↔ playlist store)
// ───────────────────────────────────────────────────────────────

/// Tag → playlist links.  Owned by the playlist store; the domain only
/// reads and writes individual links.
pub trait PlaylistDirectory {
    fn playlist_for(&self, tag: &TagId) -> Result<Option<PlaylistId>>;

    /// Point `tag` at `playlist`.  Returns the previous link, if any.
    fn link(&self, tag: &TagId, playlist: &str) -> Result<Option<PlaylistId>>;
}

impl<T: PlaylistDirectory + ?Sized> PlaylistDirectory for std::rc::Rc<T> {
    fn playlist_for(&self, tag: &TagId) -> Result<Option<PlaylistId>> {
        (**self).playlist_for(tag)
    }

    fn link(&self, tag: &TagId, playlist: &str) -> Result<Option<PlaylistId>> {
        (**self).link(tag, playlist)
    }
}

impl<T: PlaylistDirectory + ?Sized> PlaylistDirectory for std::sync::Arc<T> {
    fn playlist_for(&self, tag: &TagId) -> Result<Option<PlaylistId>> {
        (**self).playlist_for(tag)
    }

    fn link(&self, tag: &TagId, playlist: &str) -> Result<Option<PlaylistId>> {
        (**self).link(tag, playlist)
    }
}

// ───────────────────────────────────────────────────────────────
// Playback port (domain → audio engine)
// ───────────────────────────────────────────────────────────────

/// Capability interface of the audio engine.
pub trait PlaybackPort {
    fn play(&mut self, playlist: &str) -> anyhow::Result<()>;

    fn pause(&mut self) -> anyhow::Result<()>;

    fn next(&mut self) -> anyhow::Result<()>;

    fn previous(&mut self) -> anyhow::Result<()>;

    /// Current volume, 0–100.
    fn volume(&self) -> u8;

    fn set_volume(&mut self, volume: u8) -> anyhow::Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.
pub trait Clock: Send + Sync {
    fn uptime_ms(&self) -> u64;
}
