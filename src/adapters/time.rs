//! Monotonic clock adapters.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.
//!
//! [`ManualClock`] only moves when told to; simulations and tests use it to
//! step through timeouts deterministically.
//!
//! The module also provides the `embassy-time` driver that backs every
//! `async_io_mini::Timer`: a microsecond tick and one wake thread that
//! fires registered wakers when their deadline passes.

use core::sync::atomic::{AtomicU64, Ordering};
use core::task::Waker;
use core::time::Duration;
use std::sync::{Condvar, Mutex, MutexGuard, Once, PoisonError};

use log::error;

use crate::app::ports::Clock;
use crate::drivers::task_pin::{Core, ThreadSpec};

/// Time since boot from the platform timer.
pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Clock for SystemClock {
    fn uptime_ms(&self) -> u64 {
        self.uptime_us() / 1_000
    }
}

/// Hand-advanced clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_ms(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn uptime_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// ── embassy-time driver ───────────────────────────────────────

const WAKE_THREAD: ThreadSpec = ThreadSpec {
    name: "timer-wake\0",
    core: Core::App,
    priority: 6,
    stack_kb: 4,
};

struct Deadline {
    at: u64,
    waker: Waker,
}

static DEADLINES: Mutex<Vec<Deadline>> = Mutex::new(Vec::new());
static DEADLINE_ADDED: Condvar = Condvar::new();
static WAKE_THREAD_STARTED: Once = Once::new();

fn deadlines() -> MutexGuard<'static, Vec<Deadline>> {
    DEADLINES.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(target_os = "espidf")]
fn driver_now_us() -> u64 {
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
}

#[cfg(not(target_os = "espidf"))]
fn driver_now_us() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_micros() as u64
}

/// Wake every waker whose deadline has passed, then sleep until the next.
fn wake_loop() {
    let mut pending = deadlines();
    loop {
        let now = driver_now_us();
        let mut due = Vec::new();
        pending.retain(|d| {
            if d.at <= now {
                due.push(d.waker.clone());
                false
            } else {
                true
            }
        });
        if !due.is_empty() {
            drop(pending);
            due.into_iter().for_each(Waker::wake);
            pending = deadlines();
            continue;
        }
        pending = match pending.iter().map(|d| d.at).min() {
            Some(next) => {
                let wait = Duration::from_micros(next.saturating_sub(now));
                DEADLINE_ADDED
                    .wait_timeout(pending, wait)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            None => DEADLINE_ADDED
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner),
        };
    }
}

// Rust ABI, as `embassy-time-driver` declares these two symbols.
#[allow(clippy::no_mangle_with_rust_abi)]
#[unsafe(no_mangle)]
fn _embassy_time_now() -> u64 {
    driver_now_us()
}

#[allow(clippy::no_mangle_with_rust_abi)]
#[unsafe(no_mangle)]
fn _embassy_time_schedule_wake(at: u64, waker: &Waker) {
    WAKE_THREAD_STARTED.call_once(|| {
        if let Err(e) = WAKE_THREAD.spawn(wake_loop) {
            error!("timer wake thread failed to start: {e}");
        }
    });
    {
        let mut pending = deadlines();
        match pending.iter_mut().find(|d| d.waker.will_wake(waker)) {
            Some(existing) => existing.at = existing.at.min(at),
            None => pending.push(Deadline {
                at,
                waker: waker.clone(),
            }),
        }
    }
    DEADLINE_ADDED.notify_one();
}
