//! UART scanner for auto-read reader modules.
//!
//! Modules in auto-read mode stream a [`uid_frame`](super::uid_frame) for
//! as long as a tag is in the field.  Each scan drains the UART without
//! blocking and reports the most recent complete frame.

use esp_idf_hal::delay::NON_BLOCK;
use esp_idf_hal::uart::UartDriver;

use super::nfc_reader::TagScanner;
use super::uid_frame::UidFrameDecoder;
use crate::error::HardwareError;
use crate::nfc::UidBytes;

pub struct UartScanner {
    uart: UartDriver<'static>,
    decoder: UidFrameDecoder,
}

impl UartScanner {
    pub fn new(uart: UartDriver<'static>) -> Self {
        Self {
            uart,
            decoder: UidFrameDecoder::new(),
        }
    }
}

impl TagScanner for UartScanner {
    fn init(&mut self) -> Result<(), HardwareError> {
        self.decoder.reset();
        self.uart
            .clear_rx()
            .map_err(|_| HardwareError::InitFailed)
    }

    fn scan(&mut self) -> Result<Option<UidBytes>, HardwareError> {
        let mut buf = [0u8; 64];
        let mut latest = None;
        loop {
            let n = self
                .uart
                .read(&mut buf, NON_BLOCK)
                .map_err(|_| HardwareError::ReadFailed)?;
            if n == 0 {
                break;
            }
            if let Some(uid) = self.decoder.decode(&buf[..n]).last() {
                latest = Some(uid);
            }
        }
        Ok(latest)
    }
}
