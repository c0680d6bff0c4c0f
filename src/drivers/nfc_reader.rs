//! Polling NFC reader.
//!
//! Turns a chip-level [`TagScanner`] into an [`NfcReaderPort`].  A dedicated
//! thread (pinned to the PRO core on the ESP32) scans at a fixed interval:
//!
//! - every scan that sees a tag fires "detected" (the coordinator debounces);
//! - a tag not seen for the absence timeout fires "removed" once;
//! - a different UID replacing the present one fires "removed" first.
//!
//! The callbacks only hand the payload off; they run on the reader thread.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use core::time::Duration;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

use log::{info, warn};

use super::task_pin::{Core, ThreadSpec};
use crate::app::ports::{NfcHardwareStatus, NfcReaderPort, TagDetectedCallback, TagRemovedCallback};
use crate::error::HardwareError;
use crate::nfc::{RawTagPayload, UidBytes};

const READER_THREAD: ThreadSpec = ThreadSpec {
    name: "nfc\0",
    core: Core::Pro,
    priority: 5,
    stack_kb: 8,
};

/// One chip transaction: "which tag is in the field right now?"
pub trait TagScanner: Send + 'static {
    /// Bring up the chip.  Called on every start.
    fn init(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }

    fn scan(&mut self) -> Result<Option<UidBytes>, HardwareError>;
}

#[derive(Default)]
struct Callbacks {
    detected: Option<TagDetectedCallback>,
    removed: Option<TagRemovedCallback>,
}

#[derive(Default)]
struct Shared {
    running: AtomicBool,
    reads: AtomicU32,
    read_errors: AtomicU32,
    last_error: Mutex<Option<HardwareError>>,
    callbacks: Mutex<Callbacks>,
}

impl Shared {
    fn fire_detected(&self, uid: UidBytes) {
        let callbacks = self.callbacks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cb) = &callbacks.detected {
            cb(RawTagPayload::Bytes(uid));
        }
    }

    fn fire_removed(&self) {
        let callbacks = self.callbacks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cb) = &callbacks.removed {
            cb();
        }
    }

    fn record_error(&self, e: HardwareError) {
        let n = self.read_errors.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e);
        // First failure and then every 100th, to keep the console usable.
        if n == 1 || n % 100 == 0 {
            warn!("NFC reader: scan failed ({e}), {n} errors so far");
        }
    }
}

pub struct PollingNfcReader<S: TagScanner> {
    /// `None` while the worker thread owns it.
    scanner: Option<S>,
    worker: Option<JoinHandle<S>>,
    shared: Arc<Shared>,
    initialized: bool,
    poll_interval: Duration,
    absence_timeout: Duration,
}

impl<S: TagScanner> PollingNfcReader<S> {
    pub fn new(scanner: S, poll_interval: Duration, absence_timeout: Duration) -> Self {
        Self {
            scanner: Some(scanner),
            worker: None,
            shared: Arc::new(Shared::default()),
            initialized: false,
            poll_interval,
            absence_timeout,
        }
    }

    fn callbacks(&self) -> std::sync::MutexGuard<'_, Callbacks> {
        self.shared
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: TagScanner> NfcReaderPort for PollingNfcReader<S> {
    fn set_tag_detected_callback(&mut self, callback: TagDetectedCallback) {
        self.callbacks().detected = Some(callback);
    }

    fn set_tag_removed_callback(&mut self, callback: TagRemovedCallback) {
        self.callbacks().removed = Some(callback);
    }

    fn start_detection(&mut self) -> Result<(), HardwareError> {
        if self.is_detecting() {
            return Ok(());
        }
        let mut scanner = self.scanner.take().ok_or(HardwareError::Busy)?;
        if let Err(e) = scanner.init() {
            self.scanner = Some(scanner);
            self.shared.record_error(e);
            return Err(HardwareError::InitFailed);
        }
        self.initialized = true;

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let (poll, absence) = (self.poll_interval, self.absence_timeout);
        match READER_THREAD.spawn(move || scan_loop(scanner, &shared, poll, absence)) {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                // The closure (and the scanner in it) is gone with the failed spawn.
                self.shared.running.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    fn stop_detection(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(scanner) => self.scanner = Some(scanner),
                Err(_) => warn!("NFC reader thread panicked; scanner lost"),
            }
            info!("NFC reader stopped");
        }
    }

    fn is_detecting(&self) -> bool {
        self.worker.is_some() && self.shared.running.load(Ordering::Acquire)
    }

    fn hardware_status(&self) -> NfcHardwareStatus {
        NfcHardwareStatus {
            initialized: self.initialized,
            detecting: self.is_detecting(),
            reads: self.shared.reads.load(Ordering::Relaxed),
            read_errors: self.shared.read_errors.load(Ordering::Relaxed),
            last_error: *self
                .shared
                .last_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }
}

impl<S: TagScanner> Drop for PollingNfcReader<S> {
    fn drop(&mut self) {
        self.stop_detection();
    }
}

fn scan_loop<S: TagScanner>(
    mut scanner: S,
    shared: &Shared,
    poll_interval: Duration,
    absence_timeout: Duration,
) -> S {
    info!("NFC reader running (poll {poll_interval:?}, absence {absence_timeout:?})");
    let mut present: Option<(UidBytes, Instant)> = None;

    while shared.running.load(Ordering::Acquire) {
        match scanner.scan() {
            Ok(Some(uid)) => {
                shared.reads.fetch_add(1, Ordering::Relaxed);
                let replaced = present.as_ref().is_some_and(|(prev, _)| *prev != uid);
                if replaced {
                    shared.fire_removed();
                }
                present = Some((uid.clone(), Instant::now()));
                shared.fire_detected(uid);
            }
            Ok(None) => {}
            Err(e) => shared.record_error(e),
        }

        let gone = present
            .as_ref()
            .is_some_and(|(_, seen)| seen.elapsed() >= absence_timeout);
        if gone {
            present = None;
            shared.fire_removed();
        }

        std::thread::sleep(poll_interval);
    }
    scanner
}
