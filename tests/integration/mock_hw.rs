//! Mock hardware adapters for integration tests.
//!
//! The reader mock hands out a [`ReaderHandle`] so tests can play the role
//! of the reader thread after the coordinator has taken ownership of it.
//! The LED mock records every driver call.

use std::sync::{Arc, Mutex};

use tagplayer::app::ports::{
    LedDriverPort, LedDriverStatus, NfcHardwareStatus, NfcReaderPort, PlaybackPort,
    TagDetectedCallback, TagRemovedCallback,
};
use tagplayer::error::HardwareError;
use tagplayer::led::{Animation, Rgb};
use tagplayer::nfc::RawTagPayload;

// ── MockReader ────────────────────────────────────────────────

#[derive(Default)]
struct ReaderState {
    detected: Option<TagDetectedCallback>,
    removed: Option<TagRemovedCallback>,
    detecting: bool,
    fail_start: bool,
    reads: u32,
}

#[derive(Default)]
pub struct MockReader {
    state: Arc<Mutex<ReaderState>>,
}

/// Test-side view of a [`MockReader`].
#[derive(Clone)]
pub struct ReaderHandle {
    state: Arc<Mutex<ReaderState>>,
}

#[allow(dead_code)]
impl MockReader {
    pub fn new() -> (Self, ReaderHandle) {
        let reader = Self::default();
        let handle = ReaderHandle {
            state: Arc::clone(&reader.state),
        };
        (reader, handle)
    }

    /// A reader whose `start_detection` always fails.
    pub fn broken() -> (Self, ReaderHandle) {
        let (reader, handle) = Self::new();
        reader.state.lock().unwrap().fail_start = true;
        (reader, handle)
    }
}

#[allow(dead_code)]
impl ReaderHandle {
    /// Report a tag the way the reader thread would.
    pub fn present(&self, payload: impl Into<RawTagPayload>) {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if let Some(cb) = &state.detected {
            cb(payload.into());
        }
    }

    pub fn remove(&self) {
        let state = self.state.lock().unwrap();
        if let Some(cb) = &state.removed {
            cb();
        }
    }

    pub fn is_detecting(&self) -> bool {
        self.state.lock().unwrap().detecting
    }
}

impl NfcReaderPort for MockReader {
    fn set_tag_detected_callback(&mut self, callback: TagDetectedCallback) {
        self.state.lock().unwrap().detected = Some(callback);
    }

    fn set_tag_removed_callback(&mut self, callback: TagRemovedCallback) {
        self.state.lock().unwrap().removed = Some(callback);
    }

    fn start_detection(&mut self) -> Result<(), HardwareError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_start {
            return Err(HardwareError::InitFailed);
        }
        state.detecting = true;
        Ok(())
    }

    fn stop_detection(&mut self) {
        self.state.lock().unwrap().detecting = false;
    }

    fn is_detecting(&self) -> bool {
        self.state.lock().unwrap().detecting
    }

    fn hardware_status(&self) -> NfcHardwareStatus {
        let state = self.state.lock().unwrap();
        NfcHardwareStatus {
            initialized: !state.fail_start,
            detecting: state.detecting,
            reads: state.reads,
            ..NfcHardwareStatus::default()
        }
    }
}

// ── MockLedDriver ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LedCall {
    Init,
    Show(Rgb, Animation),
    Off,
    Brightness(f32),
}

#[derive(Default)]
pub struct MockLedDriver {
    pub calls: Vec<LedCall>,
    /// Make every write fail with `WriteFailed`.
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockLedDriver {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn renders(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, LedCall::Show(..) | LedCall::Off))
            .count()
    }

    pub fn last_render(&self) -> Option<&LedCall> {
        self.calls
            .iter()
            .rev()
            .find(|c| matches!(c, LedCall::Show(..) | LedCall::Off))
    }

    fn write(&mut self, call: LedCall) -> Result<(), HardwareError> {
        self.calls.push(call);
        if self.fail_writes {
            Err(HardwareError::WriteFailed)
        } else {
            Ok(())
        }
    }
}

impl LedDriverPort for MockLedDriver {
    fn initialize(&mut self) -> Result<(), HardwareError> {
        self.write(LedCall::Init)
    }

    fn set_animation(
        &mut self,
        color: Rgb,
        animation: Animation,
        _speed: f32,
    ) -> Result<(), HardwareError> {
        self.write(LedCall::Show(color, animation))
    }

    fn turn_off(&mut self) -> Result<(), HardwareError> {
        self.write(LedCall::Off)
    }

    fn set_brightness(&mut self, level: f32) -> Result<(), HardwareError> {
        self.write(LedCall::Brightness(level))
    }

    fn cleanup(&mut self) {}

    fn status(&self) -> LedDriverStatus {
        LedDriverStatus::default()
    }
}

// ── MockPlayback ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockPlayback {
    pub played: Vec<String>,
    pub volume: u8,
}

impl PlaybackPort for MockPlayback {
    fn play(&mut self, playlist: &str) -> anyhow::Result<()> {
        self.played.push(playlist.to_owned());
        Ok(())
    }

    fn pause(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn next(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn previous(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn set_volume(&mut self, volume: u8) -> anyhow::Result<()> {
        self.volume = volume;
        Ok(())
    }
}
