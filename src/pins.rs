//! GPIO / peripheral pin assignments for the TagPlayer main board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Status LED (discrete RGB, common cathode)
// ---------------------------------------------------------------------------

pub const LED_R_GPIO: i32 = 11;
pub const LED_G_GPIO: i32 = 12;
pub const LED_B_GPIO: i32 = 13;

/// LEDC frequency for the RGB status LED (1 kHz).
pub const LED_PWM_FREQ_HZ: u32 = 1_000;

// ---------------------------------------------------------------------------
// NFC reader module (UART, auto-read mode)
// ---------------------------------------------------------------------------

/// UART TX towards the reader (unused by auto-read modules, still wired).
pub const NFC_UART_TX_GPIO: i32 = 17;
/// UART RX from the reader.
pub const NFC_UART_RX_GPIO: i32 = 18;
pub const NFC_UART_BAUD: u32 = 9_600;
