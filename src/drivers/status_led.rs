//! RGB status LED driver.
//!
//! Three PWM channels drive discrete R/G/B LEDs (or a common-cathode RGB
//! LED).  Any `embedded_hal::pwm::SetDutyCycle` implementation works: LEDC
//! channels on the ESP32, a recording fake on the host.
//!
//! The driver owns the [`LedPatternEngine`]; `set_animation` only selects
//! the animation, and the render task calls [`PwmRgbLed::tick`] to push
//! the next frame to the channels.

use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use super::led_patterns::LedPatternEngine;
use crate::app::ports::{LedDriverPort, LedDriverStatus};
use crate::error::HardwareError;
use crate::led::{Animation, Rgb};

pub struct PwmRgbLed<R, G, B> {
    red: R,
    green: G,
    blue: B,
    engine: LedPatternEngine,
    brightness: f32,
    initialized: bool,
    write_errors: u32,
    /// The previous render frame failed to write.
    render_failing: bool,
    /// Last frame written (after brightness scaling).
    output: Rgb,
}

impl<R, G, B> PwmRgbLed<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle,
    B: SetDutyCycle,
{
    pub fn new(red: R, green: G, blue: B) -> Self {
        Self {
            red,
            green,
            blue,
            engine: LedPatternEngine::new(),
            brightness: 1.0,
            initialized: false,
            write_errors: 0,
            render_failing: false,
            output: (0, 0, 0),
        }
    }

    /// Advance the animation by `delta_ms` and write the frame.
    pub fn tick(&mut self, delta_ms: u32) -> Result<(), HardwareError> {
        if !self.initialized {
            return Ok(());
        }
        let frame = self.engine.tick(delta_ms);
        self.write(frame)
    }

    /// [`tick`](Self::tick) for the render task.  Failures are counted in
    /// `write_errors`; only the first of a consecutive run is logged.
    pub fn render_frame(&mut self, delta_ms: u32) {
        match self.tick(delta_ms) {
            Ok(()) => {
                if self.render_failing {
                    warn!("LED render recovered ({} write errors)", self.write_errors);
                }
                self.render_failing = false;
            }
            Err(e) => {
                if !self.render_failing {
                    warn!("LED render failed: {e}");
                }
                self.render_failing = true;
            }
        }
    }

    /// Last frame written to the channels.
    pub fn output(&self) -> Rgb {
        self.output
    }

    fn write(&mut self, (r, g, b): Rgb) -> Result<(), HardwareError> {
        let level = (self.brightness * 255.0) as u8;
        let (r, g, b) = LedPatternEngine::scale((r, g, b), level);
        let ok = self.red.set_duty_cycle_fraction(r as u16, 255).is_ok()
            & self.green.set_duty_cycle_fraction(g as u16, 255).is_ok()
            & self.blue.set_duty_cycle_fraction(b as u16, 255).is_ok();
        if ok {
            self.output = (r, g, b);
            Ok(())
        } else {
            self.write_errors += 1;
            Err(HardwareError::WriteFailed)
        }
    }
}

impl<R, G, B> LedDriverPort for PwmRgbLed<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle,
    B: SetDutyCycle,
{
    fn initialize(&mut self) -> Result<(), HardwareError> {
        self.initialized = true;
        self.engine.clear();
        self.write((0, 0, 0)).inspect_err(|_| self.initialized = false)
    }

    fn set_animation(
        &mut self,
        color: Rgb,
        animation: Animation,
        speed: f32,
    ) -> Result<(), HardwareError> {
        if !self.initialized {
            return Err(HardwareError::NotInitialized);
        }
        self.engine.set_pattern(color, animation, speed);
        let frame = self.engine.tick(0);
        self.write(frame)
    }

    fn turn_off(&mut self) -> Result<(), HardwareError> {
        if !self.initialized {
            return Err(HardwareError::NotInitialized);
        }
        self.engine.clear();
        self.write((0, 0, 0))
    }

    fn set_brightness(&mut self, level: f32) -> Result<(), HardwareError> {
        let clamped = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        if clamped != level {
            warn!("LED brightness {level} clamped to {clamped}");
        }
        self.brightness = clamped;
        if !self.initialized {
            return Ok(());
        }
        let frame = self.engine.tick(0);
        self.write(frame)
    }

    fn cleanup(&mut self) {
        if self.initialized && self.turn_off().is_err() {
            warn!("LED cleanup: could not switch off");
        }
        self.initialized = false;
    }

    fn status(&self) -> LedDriverStatus {
        let active = self.engine.active();
        LedDriverStatus {
            initialized: self.initialized,
            brightness: self.brightness,
            color: active.map(|p| p.colour),
            animation: active.map(|p| p.animation),
            write_errors: self.write_errors,
        }
    }
}
