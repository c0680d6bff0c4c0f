//! Event-loop runtime: the single consumer of every device event.
//!
//! Runs on one thread under `edge-executor`, with `async-io-mini` timers
//! for the periodic loops (no busy-spinning).  Three cooperative tasks:
//!
//! 1. **Dispatcher**: truly async, wakes when a hardware thread pushes a
//!    [`DeviceEvent`] and hands it to the coordinator
//! 2. **Sweeper**: expires association sessions every 30 s
//! 3. **LED monitor**: expires time-bounded LED states every 500 ms
//!
//! ```text
//!  ┌────────────────────────────────────────────────────────────┐
//!  │  Event-loop thread                                         │
//!  │  ┌──────────────────────────────────────────────────────┐  │
//!  │  │  futures_lite::block_on                              │  │
//!  │  │  ┌──────────────────────────────────────────────────┐│  │
//!  │  │  │  edge_executor::LocalExecutor                    ││  │
//!  │  │  │                                                  ││  │
//!  │  │  │  ┌────────────┐  ┌──────────┐  ┌─────────────┐  ││  │
//!  │  │  │  │ Dispatcher │  │ Sweeper  │  │ LED monitor │  ││  │
//!  │  │  │  │ wake-on-rx │  │ 30s ⏱    │  │ 500ms ⏱     │  ││  │
//!  │  │  │  └────────────┘  └──────────┘  └─────────────┘  ││  │
//!  │  │  └──────────────────────────────────────────────────┘│  │
//!  │  └──────────────────────────────────────────────────────┘  │
//!  └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The coordinator is shared as `Rc<RefCell<_>>`; a borrow is never held
//! across an `.await`.

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use log::{debug, info};

use super::events::{DeviceEvent, EventQueue};
use super::playback::apply_feedback;
use super::ports::{LedDriverPort, LedFeedback, NfcReaderPort, PlaylistDirectory};
use super::task::{BackgroundTask, StopSignal, run_every};
use crate::config::SystemConfig;
use crate::led::LedState;
use crate::led::monitor::LedTimeoutMonitor;
use crate::nfc::coordinator::NfcCoordinator;

pub type SharedCoordinator<R, D, L> = Rc<RefCell<NfcCoordinator<R, D, L>>>;

/// Running background tasks.
pub struct RuntimeHandle<'a> {
    tasks: Vec<BackgroundTask>,
    halt_reader: Box<dyn FnOnce() + 'a>,
}

impl RuntimeHandle<'_> {
    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(BackgroundTask::name).collect()
    }

    /// Stop the reader thread, then every task, waiting for each to finish.
    pub async fn stop(self) {
        (self.halt_reader)();
        for task in self.tasks {
            task.stop().await;
        }
        info!("runtime stopped");
    }
}

/// Show boot feedback and start the reader.  Returns whether detection runs.
pub fn boot<R, D, L>(coordinator: &mut NfcCoordinator<R, D, L>, queue: &EventQueue) -> bool
where
    R: NfcReaderPort,
    D: PlaylistDirectory,
    L: LedFeedback,
{
    coordinator.leds().set(LedState::Booting);
    let detecting = coordinator.start_detection(&queue.producer());
    let leds = coordinator.leds();
    leds.clear(LedState::Booting);
    leds.set(if detecting {
        LedState::Idle
    } else {
        LedState::ErrorHardware
    });
    detecting
}

/// Route one event to its handler.
pub fn dispatch<R, D, L>(coordinator: &mut NfcCoordinator<R, D, L>, event: DeviceEvent)
where
    R: NfcReaderPort,
    D: PlaylistDirectory,
    L: LedFeedback,
{
    match event {
        DeviceEvent::TagDetected(raw) => {
            let outcome = coordinator.on_tag_detected(raw);
            debug!("tag event: {outcome:?}");
        }
        DeviceEvent::TagRemoved => coordinator.on_tag_removed(),
        DeviceEvent::Playback(status) => apply_feedback(coordinator.leds(), status),
    }
}

async fn dispatch_loop<R, D, L>(
    coordinator: SharedCoordinator<R, D, L>,
    queue: EventQueue,
    stop: &StopSignal,
) where
    R: NfcReaderPort,
    D: PlaylistDirectory,
    L: LedFeedback,
{
    loop {
        let next = futures_lite::future::or(async { Some(queue.receive().await) }, async {
            stop.wait().await;
            None
        })
        .await;
        let Some(event) = next else { break };
        dispatch(&mut coordinator.borrow_mut(), event);
    }
}

/// Spawn the dispatcher, sweeper and LED monitor on `executor`.
pub fn start<'a, const C: usize, R, D, L, Drv>(
    executor: &edge_executor::LocalExecutor<'a, C>,
    coordinator: SharedCoordinator<R, D, L>,
    queue: EventQueue,
    monitor: LedTimeoutMonitor<Drv>,
    config: &SystemConfig,
) -> RuntimeHandle<'a>
where
    R: NfcReaderPort + 'a,
    D: PlaylistDirectory + 'a,
    L: LedFeedback + 'a,
    Drv: LedDriverPort + 'a,
{
    let dispatcher = {
        let coordinator = Rc::clone(&coordinator);
        BackgroundTask::spawn(executor, "dispatcher", move |stop| async move {
            dispatch_loop(coordinator, queue, &stop).await;
        })
    };

    let halt_reader: Box<dyn FnOnce() + 'a> = {
        let coordinator = Rc::clone(&coordinator);
        Box::new(move || coordinator.borrow_mut().stop_detection())
    };

    let sweep_interval: Duration = config.association_sweep_interval();
    let sweeper = BackgroundTask::spawn(executor, "session-sweeper", move |stop| async move {
        run_every(sweep_interval, &stop, || {
            let expired = coordinator.borrow_mut().sweep_expired();
            if expired > 0 {
                info!("swept {expired} expired association session(s)");
            }
        })
        .await;
    });

    let led_poll = monitor.poll_interval();
    let monitor = monitor.spawn(executor);

    info!("runtime started (sweep every {sweep_interval:?}, LED poll every {led_poll:?})");
    RuntimeHandle {
        tasks: vec![dispatcher, sweeper, monitor],
        halt_reader,
    }
}
