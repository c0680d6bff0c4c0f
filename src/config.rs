//! System configuration parameters
//!
//! All tunable timing parameters for the TagPlayer system.
//! Values can be overridden with a JSON document (e.g. from the web UI or a
//! provisioning file); every override is validated before use.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- LED feedback ---
    /// How often the timeout monitor checks for expired LED states (milliseconds)
    pub led_poll_interval_ms: u32,
    /// Animation render tick for the PWM LED driver (milliseconds)
    pub led_render_tick_ms: u32,
    /// Global LED brightness (0.0-1.0)
    pub led_brightness: f32,

    // --- Association ---
    /// Interval of the expired-session sweep (seconds)
    pub association_sweep_interval_secs: u32,

    // --- NFC reader ---
    /// Reader scan interval (milliseconds)
    pub nfc_poll_interval_ms: u32,
    /// A tag unseen for this long is reported as removed (milliseconds)
    pub nfc_absence_timeout_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // LED
            led_poll_interval_ms: 500,
            led_render_tick_ms: 20, // 50 Hz
            led_brightness: 1.0,

            // Association
            association_sweep_interval_secs: 30,

            // NFC
            nfc_poll_interval_ms: 50,
            nfc_absence_timeout_ms: 400,
        }
    }
}

impl SystemConfig {
    /// Parse a (possibly partial) JSON override; missing fields keep defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("invalid JSON document"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or spin the background loops.
    pub fn validate(&self) -> Result<()> {
        if !(10..=10_000).contains(&self.led_poll_interval_ms) {
            return Err(Error::Config("led_poll_interval_ms must be 10-10000"));
        }
        if !(5..=1_000).contains(&self.led_render_tick_ms) {
            return Err(Error::Config("led_render_tick_ms must be 5-1000"));
        }
        if !(0.0..=1.0).contains(&self.led_brightness) {
            return Err(Error::Config("led_brightness must be 0.0-1.0"));
        }
        if self.association_sweep_interval_secs == 0 {
            return Err(Error::Config("association_sweep_interval_secs must be > 0"));
        }
        if self.nfc_poll_interval_ms == 0 {
            return Err(Error::Config("nfc_poll_interval_ms must be > 0"));
        }
        if self.nfc_absence_timeout_ms <= self.nfc_poll_interval_ms {
            return Err(Error::Config(
                "nfc_absence_timeout_ms must exceed nfc_poll_interval_ms",
            ));
        }
        Ok(())
    }

    pub fn led_poll_interval(&self) -> Duration {
        Duration::from_millis(self.led_poll_interval_ms as u64)
    }

    pub fn association_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.association_sweep_interval_secs as u64)
    }
}
