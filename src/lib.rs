//! TagPlayer firmware library.
//!
//! Exposes the pure-logic modules for integration testing and simulation.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod led;
pub mod nfc;
pub mod pins;
