//! LED animation engine.
//!
//! Generates time-varying RGB values for the status LED.  The render task
//! calls `tick()` every few milliseconds and feeds the result to the PWM
//! channels.  Which animation runs is decided by the LED priority stack;
//! the engine only animates the one it was given.
//!
//! ## Animations (at speed 1.0)
//!
//! | Animation    | Description                      | Rate   |
//! |--------------|----------------------------------|--------|
//! | Solid        | Constant colour                  | —      |
//! | Pulse        | Triangular brightness fade       | 1 Hz   |
//! | BlinkSlow    | On/off square wave               | 1 Hz   |
//! | BlinkFast    | On/off square wave               | 4 Hz   |
//! | Flash        | Very fast on/off                 | 8 Hz   |
//! | DoubleBlink  | Two quick flashes, then pause    | 1 Hz   |
//!
//! `speed` divides every period: 2.0 runs twice as fast.

use crate::led::{Animation, Rgb};

const OFF: Rgb = (0, 0, 0);

/// An animation request with colour and rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternRequest {
    pub colour: Rgb,
    pub animation: Animation,
    pub speed: f32,
}

/// LED animation engine. Stack-allocated, no heap.
#[derive(Debug, Default)]
pub struct LedPatternEngine {
    phase_ms: u32,
    active: Option<PatternRequest>,
}

impl LedPatternEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch animation.  The phase restarts only if the request changed.
    pub fn set_pattern(&mut self, colour: Rgb, animation: Animation, speed: f32) {
        let request = PatternRequest {
            colour,
            animation,
            speed,
        };
        if self.active != Some(request) {
            self.phase_ms = 0;
        }
        self.active = Some(request);
    }

    /// Clear the animation; the LED goes dark.
    pub fn clear(&mut self) {
        self.active = None;
        self.phase_ms = 0;
    }

    pub fn active(&self) -> Option<PatternRequest> {
        self.active
    }

    /// Advance the phase by `delta_ms` and return the current RGB output.
    pub fn tick(&mut self, delta_ms: u32) -> Rgb {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);
        match self.active {
            Some(req) => self.generate(req),
            None => OFF,
        }
    }

    fn generate(&self, req: PatternRequest) -> Rgb {
        let colour = req.colour;
        let period = |base_ms: u32| ((base_ms as f32 / req.speed) as u32).max(2);
        let square = |period_ms: u32| {
            if self.phase_ms % period_ms < period_ms / 2 {
                colour
            } else {
                OFF
            }
        };
        match req.animation {
            Animation::Solid => colour,
            Animation::Pulse => {
                let brightness = Self::triangle_brightness(self.phase_ms, period(1000));
                Self::scale(colour, brightness)
            }
            Animation::BlinkSlow => square(period(1000)),
            Animation::BlinkFast => square(period(250)),
            Animation::Flash => square(period(125)),
            Animation::DoubleBlink => {
                let p = period(1000);
                let cycle = self.phase_ms % p;
                let on = cycle < p / 10 || (p * 2 / 10..p * 3 / 10).contains(&cycle);
                if on { colour } else { OFF }
            }
        }
    }

    /// Triangular approximation of a sine fade without libm:
    /// ramps 0→255→0 over `period_ms`.
    fn triangle_brightness(phase_ms: u32, period_ms: u32) -> u8 {
        let pos = (phase_ms % period_ms) as u64;
        let half = period_ms as u64 / 2;
        if pos < half {
            ((pos * 255) / half) as u8
        } else {
            (((period_ms as u64 - pos) * 255) / half) as u8
        }
    }

    /// Scale each channel by `brightness` / 255.
    pub fn scale((r, g, b): Rgb, brightness: u8) -> Rgb {
        let br = brightness as u16;
        (
            ((r as u16 * br) / 255) as u8,
            ((g as u16 * br) / 255) as u8,
            ((b as u16 * br) / 255) as u8,
        )
    }
}
