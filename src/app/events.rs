//! Device event queue.
//!
//! Hardware threads (NFC reader, playback engine) never touch domain state.
//! They push [`DeviceEvent`]s into a bounded `embassy-sync` channel and
//! return; the dispatcher task on the event loop drains it in FIFO order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ NFC thread  │────▶│              │     │              │
//! │ Playback    │────▶│  EventQueue  │────▶│  Dispatcher  │
//! │ Tests       │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! A full queue drops the new event, logs a warning and bumps a counter.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;
use serde::Serialize;

use crate::nfc::RawTagPayload;

/// Maximum number of pending events.
pub const EVENT_QUEUE_DEPTH: usize = 32;

type EventChannel = Channel<CriticalSectionRawMutex, DeviceEvent, EVENT_QUEUE_DEPTH>;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// The reader reported a tag (fires repeatedly while it stays put).
    TagDetected(RawTagPayload),
    /// The previously present tag left the field.
    TagRemoved,
    /// The audio engine changed state.
    Playback(PlaybackStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
    Error,
}

// ── Consumer side ─────────────────────────────────────────────

/// Owning end of the queue, held by the runtime.
#[derive(Clone)]
pub struct EventQueue {
    channel: Arc<EventChannel>,
    dropped: Arc<AtomicU32>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            channel: Arc::new(Channel::new()),
            dropped: Arc::new(AtomicU32::new(0)),
        }
    }

    /// A cheap, thread-safe handle for hardware callbacks.
    pub fn producer(&self) -> EventProducer {
        EventProducer {
            channel: Arc::clone(&self.channel),
            dropped: Arc::clone(&self.dropped),
        }
    }

    /// Wait for the next event.
    pub async fn receive(&self) -> DeviceEvent {
        self.channel.receive().await
    }

    pub fn try_receive(&self) -> Option<DeviceEvent> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Events rejected because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ── Producer side ─────────────────────────────────────────────

#[derive(Clone)]
pub struct EventProducer {
    channel: Arc<EventChannel>,
    dropped: Arc<AtomicU32>,
}

impl EventProducer {
    /// Enqueue without blocking.  Returns `false` if the event was dropped.
    pub fn push(&self, event: DeviceEvent) -> bool {
        match self.channel.try_send(event) {
            Ok(()) => true,
            Err(embassy_sync::channel::TrySendError::Full(event)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("event queue full, dropped {event:?} ({total} dropped so far)");
                false
            }
        }
    }
}
