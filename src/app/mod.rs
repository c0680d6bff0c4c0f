//! Application layer: ports, the event queue and the event-loop runtime.
//!
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping the domain ([`crate::nfc`], [`crate::led`]) fully
//! testable without real peripherals.

pub mod events;
pub mod playback;
pub mod ports;
pub mod runtime;
pub mod task;
