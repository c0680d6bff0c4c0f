//! Priority-ordered LED feedback.
//!
//! Subsystems (boot, NFC, playback, errors) request [`LedState`]s; the
//! [`stack::LedPriorityStack`] renders only the highest-priority one and the
//! [`monitor::LedTimeoutMonitor`] expires the time-bounded ones.
//!
//! ## Default state table
//!
//! | State                | Colour   | Animation   | Prio | Timeout |
//! |----------------------|----------|-------------|------|---------|
//! | ErrorCritical        | red      | Solid       | 100  | —       |
//! | Shutdown             | orange   | Solid       | 99   | —       |
//! | ErrorHardware        | red      | BlinkFast   | 95   | —       |
//! | ErrorPlayback        | red      | BlinkSlow   | 90   | 5 s     |
//! | AssociationSuccess   | green    | DoubleBlink | 85   | 2 s     |
//! | AssociationDuplicate | amber    | BlinkFast   | 85   | 3 s     |
//! | Booting              | blue     | Pulse       | 80   | 30 s    |
//! | NfcSuccess           | green    | Flash       | 75   | 2 s     |
//! | NfcUnassociatedTag   | amber    | DoubleBlink | 75   | 3 s     |
//! | NfcTagDetected       | white    | Flash       | 70   | 1 s     |
//! | AssociationMode      | purple   | BlinkSlow   | 60   | —       |
//! | Playing              | green    | Solid       | 50   | —       |
//! | Paused               | yellow   | Pulse       | 40   | —       |
//! | Idle                 | teal     | Pulse       | 10   | —       |

pub mod monitor;
pub mod stack;

use core::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

pub const MAX_PRIORITY: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedState {
    Idle,
    Booting,
    Playing,
    Paused,
    NfcTagDetected,
    NfcSuccess,
    NfcUnassociatedTag,
    AssociationMode,
    AssociationSuccess,
    AssociationDuplicate,
    ErrorPlayback,
    ErrorHardware,
    ErrorCritical,
    Shutdown,
}

impl LedState {
    pub const COUNT: usize = 14;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Idle,
        Self::Booting,
        Self::Playing,
        Self::Paused,
        Self::NfcTagDetected,
        Self::NfcSuccess,
        Self::NfcUnassociatedTag,
        Self::AssociationMode,
        Self::AssociationSuccess,
        Self::AssociationDuplicate,
        Self::ErrorPlayback,
        Self::ErrorHardware,
        Self::ErrorCritical,
        Self::Shutdown,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Animation {
    Solid,
    /// Triangular fade, 1 s period at speed 1.0.
    Pulse,
    /// 1 Hz on/off.
    BlinkSlow,
    /// 4 Hz on/off.
    BlinkFast,
    /// 8 Hz on/off.
    Flash,
    /// Two short flashes, then a pause.
    DoubleBlink,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedStateConfig {
    pub state: LedState,
    pub color: Rgb,
    pub animation: Animation,
    /// 0..=100, higher wins.
    pub priority: u8,
    /// `None` = stays until cleared.
    pub timeout: Option<Duration>,
    /// Multiplier on the animation rate.
    pub animation_speed: f32,
}

impl LedStateConfig {
    pub const fn new(
        state: LedState,
        color: Rgb,
        animation: Animation,
        priority: u8,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            state,
            color,
            animation,
            priority,
            timeout,
            animation_speed: 1.0,
        }
    }

    pub const fn with_speed(mut self, animation_speed: f32) -> Self {
        self.animation_speed = animation_speed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.priority > MAX_PRIORITY {
            return Err(Error::Config("LED priority must be 0-100"));
        }
        if !(self.animation_speed.is_finite() && self.animation_speed > 0.0) {
            return Err(Error::Config("LED animation speed must be > 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// State table
// ---------------------------------------------------------------------------

/// Immutable `LedState` → config lookup.  States may be absent; requesting
/// one of those is an [`Error::UnknownLedState`].
#[derive(Debug, Clone, PartialEq)]
pub struct LedStateTable {
    entries: [Option<LedStateConfig>; LedState::COUNT],
}

impl LedStateTable {
    pub fn new<I>(configs: I) -> Result<Self>
    where
        I: IntoIterator<Item = LedStateConfig>,
    {
        let mut entries = [None; LedState::COUNT];
        for config in configs {
            config.validate()?;
            let slot = &mut entries[config.state.index()];
            if slot.is_some() {
                return Err(Error::Config("duplicate LED state in table"));
            }
            *slot = Some(config);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, state: LedState) -> Result<&LedStateConfig> {
        self.entries[state.index()]
            .as_ref()
            .ok_or(Error::UnknownLedState(state))
    }

    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LedStateTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_STATES.map(Some),
        }
    }
}

// ── Colours ─────────────────────────────────────────────────

pub const COLOUR_IDLE: Rgb = (0, 180, 148); // Teal
pub const COLOUR_BOOT: Rgb = (0, 100, 255); // Blue
pub const COLOUR_OK: Rgb = (0, 255, 50); // Green
pub const COLOUR_PAUSED: Rgb = (255, 200, 0); // Yellow
pub const COLOUR_TAG: Rgb = (255, 255, 255); // White
pub const COLOUR_WARN: Rgb = (255, 120, 0); // Amber
pub const COLOUR_ASSOCIATION: Rgb = (128, 0, 255); // Purple
pub const COLOUR_ERROR: Rgb = (255, 0, 0); // Red
pub const COLOUR_SHUTDOWN: Rgb = (255, 60, 0); // Orange

const fn secs(s: u64) -> Option<Duration> {
    Some(Duration::from_secs(s))
}

/// Indexed by `LedState as usize`.
const DEFAULT_STATES: [LedStateConfig; LedState::COUNT] = {
    use Animation::*;
    use LedState::*;
    [
        LedStateConfig::new(Idle, COLOUR_IDLE, Pulse, 10, None).with_speed(0.5),
        LedStateConfig::new(Booting, COLOUR_BOOT, Pulse, 80, secs(30)),
        LedStateConfig::new(Playing, COLOUR_OK, Solid, 50, None),
        LedStateConfig::new(Paused, COLOUR_PAUSED, Pulse, 40, None).with_speed(0.5),
        LedStateConfig::new(NfcTagDetected, COLOUR_TAG, Flash, 70, secs(1)),
        LedStateConfig::new(NfcSuccess, COLOUR_OK, Flash, 75, secs(2)),
        LedStateConfig::new(NfcUnassociatedTag, COLOUR_WARN, DoubleBlink, 75, secs(3)),
        LedStateConfig::new(AssociationMode, COLOUR_ASSOCIATION, BlinkSlow, 60, None),
        LedStateConfig::new(AssociationSuccess, COLOUR_OK, DoubleBlink, 85, secs(2)),
        LedStateConfig::new(AssociationDuplicate, COLOUR_WARN, BlinkFast, 85, secs(3)),
        LedStateConfig::new(ErrorPlayback, COLOUR_ERROR, BlinkSlow, 90, secs(5)),
        LedStateConfig::new(ErrorHardware, COLOUR_ERROR, BlinkFast, 95, None),
        LedStateConfig::new(ErrorCritical, COLOUR_ERROR, Solid, 100, None),
        LedStateConfig::new(Shutdown, COLOUR_SHUTDOWN, Solid, 99, None),
    ]
};
