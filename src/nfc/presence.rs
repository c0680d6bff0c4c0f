//! Per-reader debounce state.
//!
//! A tag resting on the reader re-fires "present" continuously; only the
//! first report after an arrival (or a different tag) triggers.  A removal
//! re-arms the tracker so putting the same tag back triggers again.

use super::TagId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPresenceTracker {
    active_tag: Option<TagId>,
    triggered: bool,
    last_trigger_ms: Option<u64>,
}

impl TagPresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` (and records the trigger) unless `tag` is the tag that
    /// already triggered and has not been removed since.
    pub fn should_trigger(&mut self, tag: &TagId, now_ms: u64) -> bool {
        if self.triggered && self.active_tag.as_ref() == Some(tag) {
            return false;
        }
        self.active_tag = Some(tag.clone());
        self.triggered = true;
        self.last_trigger_ms = Some(now_ms);
        debug_assert!(!self.triggered || self.active_tag.is_some());
        true
    }

    pub fn reset(&mut self) {
        self.active_tag = None;
        self.triggered = false;
        self.last_trigger_ms = None;
    }

    pub fn current_tag(&self) -> Option<&TagId> {
        self.active_tag.as_ref()
    }

    pub fn last_trigger_ms(&self) -> Option<u64> {
        self.last_trigger_ms
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }
}
