//! UID frame codec for auto-read UART reader modules.
//!
//! Wire format:
//! ```text
//! ┌──────┬──────────────────────────┬──────┐
//! │ STX  │ UID as ASCII hex (2–20)  │ ETX  │
//! │ 0x02 │ e.g. "04A1B2C3"          │ 0x03 │
//! └──────┴──────────────────────────┴──────┘
//! ```
//!
//! The decoder is fed byte slices as the UART delivers them, so it handles
//! partial reads and several frames concatenated.  Noise between frames is
//! skipped; a malformed frame is dropped and the decoder resynchronises on
//! the next STX.

use crate::nfc::{MAX_UID_BYTES, UidBytes};

pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;

/// Longest hex body accepted (one byte = two digits).
const MAX_HEX_DIGITS: usize = MAX_UID_BYTES * 2;

enum DecoderState {
    /// Skipping bytes until STX.
    Hunting,
    /// Between STX and ETX.
    Reading,
}

/// Streaming UID frame decoder.
pub struct UidFrameDecoder {
    state: DecoderState,
    digits: heapless::Vec<u8, MAX_HEX_DIGITS>,
    rejected: u32,
}

impl Default for UidFrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl UidFrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Hunting,
            digits: heapless::Vec::new(),
            rejected: 0,
        }
    }

    /// Feed one byte.  Returns the UID when it completes a valid frame.
    pub fn push(&mut self, byte: u8) -> Option<UidBytes> {
        match self.state {
            DecoderState::Hunting => {
                if byte == STX {
                    self.start();
                }
                None
            }
            DecoderState::Reading => match byte {
                STX => {
                    // Truncated frame followed by a fresh one.
                    self.rejected += 1;
                    self.start();
                    None
                }
                ETX => {
                    self.state = DecoderState::Hunting;
                    let uid = decode_hex(&self.digits);
                    if uid.is_none() {
                        self.rejected += 1;
                    }
                    uid
                }
                b if b.is_ascii_hexdigit() => {
                    if self.digits.push(b).is_err() {
                        self.reject();
                    }
                    None
                }
                _ => {
                    self.reject();
                    None
                }
            },
        }
    }

    /// Feed a chunk and yield every UID it completes.
    pub fn decode<'a>(&'a mut self, data: &'a [u8]) -> impl Iterator<Item = UidBytes> + 'a {
        data.iter().filter_map(move |&b| self.push(b))
    }

    /// Frames dropped as malformed since construction.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Drop any partial frame (e.g. after a UART overflow).
    pub fn reset(&mut self) {
        self.state = DecoderState::Hunting;
        self.digits.clear();
    }

    fn start(&mut self) {
        self.state = DecoderState::Reading;
        self.digits.clear();
    }

    fn reject(&mut self) {
        self.rejected += 1;
        self.reset();
    }
}

fn decode_hex(digits: &[u8]) -> Option<UidBytes> {
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }
    let mut uid = UidBytes::new();
    for pair in digits.chunks_exact(2) {
        let hi = hex_value(pair[0])?;
        let lo = hex_value(pair[1])?;
        uid.push((hi << 4) | lo).ok()?;
    }
    Some(uid)
}

fn hex_value(digit: u8) -> Option<u8> {
    (digit as char).to_digit(16).map(|v| v as u8)
}

/// Encode `uid` as `STX <upper-case hex> ETX` into `out_buf`.
///
/// Returns the number of bytes written.
pub fn encode_frame(uid: &[u8], out_buf: &mut [u8]) -> Option<usize> {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    if uid.is_empty() || uid.len() > MAX_UID_BYTES {
        return None;
    }
    let total = uid.len() * 2 + 2;
    if total > out_buf.len() {
        return None;
    }
    out_buf[0] = STX;
    for (i, b) in uid.iter().enumerate() {
        out_buf[1 + i * 2] = HEX[(b >> 4) as usize];
        out_buf[2 + i * 2] = HEX[(b & 0x0f) as usize];
    }
    out_buf[total - 1] = ETX;
    Some(total)
}
