//! Tag detection orchestrator.
//!
//! Runs on the event loop only.  Each tag event is routed by the current
//! mode, which is derived from the registry every time and never cached:
//!
//! | Mode        | Condition                | Tag handling                       |
//! |-------------|--------------------------|------------------------------------|
//! | Normal      | no active sessions       | debounce → playback subscribers    |
//! | Association | ≥ 1 active session       | every session → association subs   |
//!
//! Subscriber calls are isolated: an `Err` is logged, a panic is caught and
//! logged, and the remaining subscribers still run.

use core::time::Duration;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;

use super::association::{
    AssociationOutcome, AssociationSession, AssociationSessionRegistry, SessionId,
};
use super::presence::TagPresenceTracker;
use super::{PlaylistId, RawTagPayload, TagId};
use crate::app::events::{DeviceEvent, EventProducer};
use crate::app::ports::{Clock, LedFeedback, NfcHardwareStatus, NfcReaderPort, PlaylistDirectory};
use crate::error::{MalformedEvent, Result};
use crate::led::LedState;

/// Receives the UID of every tag that triggers in normal mode.
pub type PlaybackCallback = Box<dyn FnMut(&str) -> anyhow::Result<()>>;

/// Receives association results and normal-mode bookkeeping events.
pub type AssociationCallback = Box<dyn FnMut(&AssociationOutcome) -> anyhow::Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorMode {
    Normal,
    Association,
}

/// What `on_tag_detected` did with an event.
#[derive(Debug, Clone, PartialEq)]
pub enum TagEventOutcome {
    /// The payload could not be normalized; nothing changed.
    Dropped(MalformedEvent),
    /// Same tag still resting on the reader.
    Debounced,
    /// Normal-mode trigger.
    Playback {
        tag: TagId,
        playlist_id: Option<PlaylistId>,
    },
    /// Association-mode results, one per session that handled the tag.
    Association(Vec<AssociationOutcome>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorCounters {
    pub detections: u32,
    pub debounced: u32,
    pub malformed: u32,
    pub playback_triggers: u32,
    pub association_events: u32,
    pub callback_failures: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorStatus {
    pub mode: CoordinatorMode,
    pub active_sessions: Vec<AssociationSession>,
    pub detecting: bool,
    pub current_tag: Option<TagId>,
    pub last_trigger_ms: Option<u64>,
    pub reader: NfcHardwareStatus,
    pub counters: CoordinatorCounters,
}

pub struct NfcCoordinator<R, D, L>
where
    R: NfcReaderPort,
    D: PlaylistDirectory,
    L: LedFeedback,
{
    reader: R,
    directory: D,
    leds: L,
    clock: Arc<dyn Clock>,
    tracker: TagPresenceTracker,
    registry: AssociationSessionRegistry,
    playback_callbacks: Vec<PlaybackCallback>,
    association_callbacks: Vec<AssociationCallback>,
    counters: CoordinatorCounters,
}

impl<R, D, L> NfcCoordinator<R, D, L>
where
    R: NfcReaderPort,
    D: PlaylistDirectory,
    L: LedFeedback,
{
    pub fn new(reader: R, directory: D, leds: L, clock: Arc<dyn Clock>) -> Self {
        Self {
            reader,
            directory,
            leds,
            clock,
            tracker: TagPresenceTracker::new(),
            registry: AssociationSessionRegistry::new(),
            playback_callbacks: Vec::new(),
            association_callbacks: Vec::new(),
            counters: CoordinatorCounters::default(),
        }
    }

    // ── Subscribers ───────────────────────────────────────────

    pub fn register_tag_detected_callback(
        &mut self,
        callback: impl FnMut(&str) -> anyhow::Result<()> + 'static,
    ) {
        self.playback_callbacks.push(Box::new(callback));
    }

    pub fn register_association_callback(
        &mut self,
        callback: impl FnMut(&AssociationOutcome) -> anyhow::Result<()> + 'static,
    ) {
        self.association_callbacks.push(Box::new(callback));
    }

    // ── Tag events ────────────────────────────────────────────

    pub fn mode(&self) -> CoordinatorMode {
        if self.registry.has_active() {
            CoordinatorMode::Association
        } else {
            CoordinatorMode::Normal
        }
    }

    pub fn on_tag_detected(&mut self, raw: RawTagPayload) -> TagEventOutcome {
        let tag = match raw.normalize() {
            Ok(tag) => tag,
            Err(e) => {
                warn!("NFC: dropping malformed tag event: {e}");
                self.counters.malformed += 1;
                return TagEventOutcome::Dropped(e);
            }
        };
        self.counters.detections += 1;

        match self.mode() {
            CoordinatorMode::Association => self.associate(&tag),
            CoordinatorMode::Normal => self.trigger(tag),
        }
    }

    /// The tag left the field: re-arm the debounce.
    pub fn on_tag_removed(&mut self) {
        if let Some(tag) = self.tracker.current_tag() {
            debug!("NFC: tag {tag} removed");
        }
        self.tracker.reset();
    }

    fn associate(&mut self, tag: &TagId) -> TagEventOutcome {
        info!(
            "NFC: tag {tag} in association mode ({} session(s))",
            self.registry.len()
        );
        self.leds.set(LedState::NfcTagDetected);

        let outcomes = self.registry.process_tag(tag, &self.directory);
        for outcome in &outcomes {
            self.notify_association(outcome);
        }

        if outcomes.iter().any(AssociationOutcome::is_linked) {
            self.leds.set(LedState::AssociationSuccess);
        }
        if outcomes.iter().any(AssociationOutcome::is_duplicate) {
            self.leds.set(LedState::AssociationDuplicate);
        }
        TagEventOutcome::Association(outcomes)
    }

    fn trigger(&mut self, tag: TagId) -> TagEventOutcome {
        let now = self.clock.uptime_ms();
        if !self.tracker.should_trigger(&tag, now) {
            self.counters.debounced += 1;
            return TagEventOutcome::Debounced;
        }

        let playlist_id = match self.directory.playlist_for(&tag) {
            Ok(playlist) => playlist,
            Err(e) => {
                warn!("NFC: playlist lookup for {tag} failed: {e}");
                None
            }
        };
        info!("NFC: tag {tag} triggered (playlist {playlist_id:?})");

        let bookkeeping = match &playlist_id {
            Some(playlist) => AssociationOutcome::TagDetected {
                tag: tag.clone(),
                playlist_id: playlist.clone(),
            },
            None => AssociationOutcome::TagDetectedUnassociated { tag: tag.clone() },
        };
        self.notify_association(&bookkeeping);

        self.counters.playback_triggers += 1;
        for callback in &mut self.playback_callbacks {
            if !invoke("playback", || callback(tag.as_str())) {
                self.counters.callback_failures += 1;
            }
        }

        self.leds.set(if playlist_id.is_some() {
            LedState::NfcSuccess
        } else {
            LedState::NfcUnassociatedTag
        });
        TagEventOutcome::Playback { tag, playlist_id }
    }

    fn notify_association(&mut self, outcome: &AssociationOutcome) {
        self.counters.association_events += 1;
        for callback in &mut self.association_callbacks {
            if !invoke("association", || callback(outcome)) {
                self.counters.callback_failures += 1;
            }
        }
    }

    // ── Administrative surface ────────────────────────────────

    pub fn start_association(
        &mut self,
        playlist_id: &str,
        timeout: Duration,
        override_mode: bool,
    ) -> AssociationSession {
        let now = self.clock.uptime_ms();
        let session = self
            .registry
            .start(playlist_id, timeout, override_mode, now);
        self.leds.set(LedState::AssociationMode);
        session
    }

    pub fn stop_association(&mut self, id: SessionId) -> bool {
        let stopped = self.registry.stop(id);
        if stopped {
            self.leave_association_mode_if_idle();
        }
        stopped
    }

    /// Expire overdue sessions.  Called periodically by the runtime.
    pub fn sweep_expired(&mut self) -> usize {
        let expired = self.registry.sweep_expired(self.clock.uptime_ms());
        if expired > 0 {
            self.leave_association_mode_if_idle();
        }
        expired
    }

    pub fn session(&self, id: SessionId) -> Result<&AssociationSession> {
        self.registry.session(id)
    }

    pub fn active_sessions(&self) -> Vec<AssociationSession> {
        self.registry.active_sessions()
    }

    fn leave_association_mode_if_idle(&self) {
        if !self.registry.has_active() {
            info!("NFC: back to normal mode");
            self.leds.clear(LedState::AssociationMode);
        }
    }

    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            mode: self.mode(),
            active_sessions: self.registry.active_sessions(),
            detecting: self.reader.is_detecting(),
            current_tag: self.tracker.current_tag().cloned(),
            last_trigger_ms: self.tracker.last_trigger_ms(),
            reader: self.reader.hardware_status(),
            counters: self.counters,
        }
    }

    // ── Detection lifecycle ───────────────────────────────────

    /// Route reader callbacks into `producer` and start scanning.
    pub fn start_detection(&mut self, producer: &EventProducer) -> bool {
        let detected = producer.clone();
        self.reader
            .set_tag_detected_callback(Box::new(move |raw: RawTagPayload| {
                detected.push(DeviceEvent::TagDetected(raw));
            }));
        let removed = producer.clone();
        self.reader.set_tag_removed_callback(Box::new(move || {
            removed.push(DeviceEvent::TagRemoved);
        }));

        match self.reader.start_detection() {
            Ok(()) => {
                info!("NFC: detection started");
                true
            }
            Err(e) => {
                warn!("NFC: reader failed to start: {e}");
                false
            }
        }
    }

    /// Stop scanning.  The debounce is re-armed since no removal will follow.
    pub fn stop_detection(&mut self) {
        self.reader.stop_detection();
        self.tracker.reset();
        info!("NFC: detection stopped");
    }

    pub fn is_detecting(&self) -> bool {
        self.reader.is_detecting()
    }

    pub fn leds(&self) -> &L {
        &self.leds
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }
}

/// Run one subscriber; `false` if it failed or panicked.
fn invoke(kind: &str, f: impl FnOnce() -> anyhow::Result<()>) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!("NFC: {kind} callback failed: {e:#}");
            false
        }
        Err(_) => {
            error!("NFC: {kind} callback panicked");
            false
        }
    }
}
