//! Peripheral drivers: status LED, NFC reader, and thread helpers.

pub mod led_patterns;
pub mod nfc_reader;
pub mod status_led;
pub mod task_pin;
#[cfg(target_os = "espidf")]
pub mod uart_scanner;
pub mod uid_frame;
