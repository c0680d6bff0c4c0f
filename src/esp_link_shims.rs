//! `critical-section` provider for the ESP-IDF std target.
//!
//! `embassy-sync` channels and signals lock through `critical-section`.
//! The event queue is filled by the NFC reader thread and drained by the
//! event loop, so the section has to exclude other threads as well as
//! interrupts.  It is one process-wide mutex, re-entrant per thread.
//!
//! The `embassy-time` driver lives in the library (`adapters::time`) so
//! host tests link it too.

use core::cell::RefCell;
use std::sync::{Mutex, MutexGuard, PoisonError};

static SECTION: Mutex<()> = Mutex::new(());

#[derive(Default)]
struct Held {
    depth: u8,
    guard: Option<MutexGuard<'static, ()>>,
}

thread_local! {
    static HELD: RefCell<Held> = RefCell::new(Held::default());
}

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    HELD.with_borrow_mut(|held| {
        if held.depth == 0 {
            held.guard = Some(SECTION.lock().unwrap_or_else(PoisonError::into_inner));
        }
        held.depth = held.depth.saturating_add(1);
        held.depth
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    HELD.with_borrow_mut(|held| match held.depth {
        0 => {}
        1 => {
            held.depth = 0;
            held.guard = None;
        }
        _ => held.depth -= 1,
    });
}
