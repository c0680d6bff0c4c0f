//! Priority-ordered stack of requested LED states.
//!
//! Entries are kept in descending priority; among equal priorities the
//! entry that was there first keeps precedence.  Only the top entry is
//! rendered, and the driver is touched only when the identity of the top
//! state changes.
//!
//! Three independent call sites reach the stack (coordinator feedback, the
//! timeout monitor, administrative calls), so the entry list sits behind a
//! mutex.  Driver writes happen after that guard is released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use super::{LedState, LedStateConfig, LedStateTable};
use crate::app::ports::{Clock, LedDriverPort, LedDriverStatus, LedFeedback};
use crate::error::{HardwareError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveLedEntry {
    pub config: LedStateConfig,
    pub activated_at_ms: u64,
}

impl ActiveLedEntry {
    pub fn state(&self) -> LedState {
        self.config.state
    }

    /// `false` for permanent states.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.config.timeout.is_some_and(|timeout| {
            now_ms.saturating_sub(self.activated_at_ms) >= timeout.as_millis() as u64
        })
    }
}

#[derive(Debug, Default)]
struct Entries {
    /// Descending priority.
    list: Vec<ActiveLedEntry>,
    /// State last pushed to the driver (`None` = LED off).
    rendered: Option<LedState>,
}

/// What to send to the driver once the entry guard is dropped.
enum Render {
    Show(LedStateConfig),
    Off,
}

impl Entries {
    fn top(&self) -> Option<&ActiveLedEntry> {
        self.list.first()
    }

    /// Update `rendered` and return the driver call needed, if any.
    fn take_render(&mut self) -> Option<Render> {
        let top = self.top().map(|e| e.config);
        let top_state = top.map(|c| c.state);
        if top_state == self.rendered {
            return None;
        }
        self.rendered = top_state;
        Some(match top {
            Some(config) => Render::Show(config),
            None => Render::Off,
        })
    }
}

pub struct LedPriorityStack<D: LedDriverPort> {
    table: LedStateTable,
    clock: Arc<dyn Clock>,
    entries: Mutex<Entries>,
    driver: Mutex<D>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<D: LedDriverPort> LedPriorityStack<D> {
    pub fn new(driver: D, table: LedStateTable, clock: Arc<dyn Clock>) -> Self {
        Self {
            table,
            clock,
            entries: Mutex::new(Entries::default()),
            driver: Mutex::new(driver),
        }
    }

    pub fn table(&self) -> &LedStateTable {
        &self.table
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.uptime_ms()
    }

    // ── Stack operations ──────────────────────────────────────

    /// Request `state`.  Re-requesting an active state restarts its timeout
    /// and keeps its position.
    pub fn set_state(&self, state: LedState) -> Result<()> {
        let config = *self.table.get(state)?;
        let entry = ActiveLedEntry {
            config,
            activated_at_ms: self.now_ms(),
        };
        let render = {
            let mut entries = lock(&self.entries);
            if let Some(active) = entries.list.iter_mut().find(|e| e.state() == state) {
                // Same slot, so the top cannot change.
                *active = entry;
            } else {
                let pos = entries
                    .list
                    .iter()
                    .position(|e| e.config.priority < config.priority)
                    .unwrap_or(entries.list.len());
                entries.list.insert(pos, entry);
            }
            entries.take_render()
        };
        debug!("LED set {state:?} (prio {})", config.priority);
        self.render(render);
        Ok(())
    }

    /// Withdraw `state`.  Returns `false` if it was not active.
    pub fn clear_state(&self, state: LedState) -> bool {
        let render = {
            let mut entries = lock(&self.entries);
            let Some(pos) = entries.list.iter().position(|e| e.state() == state) else {
                return false;
            };
            entries.list.remove(pos);
            entries.take_render()
        };
        debug!("LED clear {state:?}");
        self.render(render);
        true
    }

    /// Drop every entry and switch the LED off.
    pub fn clear_all(&self) {
        {
            let mut entries = lock(&self.entries);
            entries.list.clear();
            entries.rendered = None;
        }
        self.render(Some(Render::Off));
    }

    pub fn current_state(&self) -> Option<LedState> {
        lock(&self.entries).top().map(ActiveLedEntry::state)
    }

    pub fn active_entries(&self) -> Vec<ActiveLedEntry> {
        lock(&self.entries).list.clone()
    }

    pub fn contains(&self, state: LedState) -> bool {
        lock(&self.entries).list.iter().any(|e| e.state() == state)
    }

    // ── Driver passthroughs ───────────────────────────────────

    pub fn initialize(&self) -> bool {
        Self::check("initialize", lock(&self.driver).initialize())
    }

    pub fn set_brightness(&self, level: f32) -> bool {
        Self::check("set_brightness", lock(&self.driver).set_brightness(level))
    }

    pub fn driver_status(&self) -> LedDriverStatus {
        lock(&self.driver).status()
    }

    /// Clear the stack and release the driver.
    pub fn cleanup(&self) {
        self.clear_all();
        lock(&self.driver).cleanup();
    }

    /// Run `f` with exclusive access to the driver (e.g. an animation tick).
    pub fn with_driver<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut lock(&self.driver))
    }

    // ── Internal ──────────────────────────────────────────────

    fn render(&self, render: Option<Render>) {
        let Some(render) = render else { return };
        let mut driver = lock(&self.driver);
        match render {
            Render::Show(c) => {
                let result = driver.set_animation(c.color, c.animation, c.animation_speed);
                Self::check("set_animation", result);
            }
            Render::Off => {
                Self::check("turn_off", driver.turn_off());
            }
        }
    }

    fn check(op: &str, result: core::result::Result<(), HardwareError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("LED driver {op} failed: {e}");
                false
            }
        }
    }
}

impl<D: LedDriverPort> LedFeedback for LedPriorityStack<D> {
    fn set(&self, state: LedState) -> bool {
        match self.set_state(state) {
            Ok(()) => true,
            Err(e) => {
                warn!("LED feedback rejected: {e}");
                false
            }
        }
    }

    fn clear(&self, state: LedState) -> bool {
        self.clear_state(state)
    }
}
