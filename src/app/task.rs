//! Cancellable background tasks on the local executor.
//!
//! Every task gets its own stop [`Signal`]; `Signal` wakes a single waiter,
//! so tasks never share one.

use core::future::Future;
use core::time::Duration;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::info;

pub type StopSignal = Signal<CriticalSectionRawMutex, ()>;

/// Handle to a spawned loop.  Dropping it cancels the task at its next
/// suspension point; [`stop`](Self::stop) lets it finish cleanly.
pub struct BackgroundTask {
    name: &'static str,
    stop: Arc<StopSignal>,
    task: edge_executor::Task<()>,
}

impl BackgroundTask {
    pub fn spawn<'a, const C: usize, F, Fut>(
        executor: &edge_executor::LocalExecutor<'a, C>,
        name: &'static str,
        body: F,
    ) -> Self
    where
        F: FnOnce(Arc<StopSignal>) -> Fut,
        Fut: Future<Output = ()> + 'a,
    {
        let stop = Arc::new(StopSignal::new());
        let task = executor.spawn(body(Arc::clone(&stop)));
        info!("{name} task started");
        Self { name, stop, task }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal cancellation and wait for the loop to return.
    pub async fn stop(self) {
        self.stop.signal(());
        self.task.await;
        info!("{} task stopped", self.name);
    }
}

/// Call `tick` every `period` until `stop` is signalled.
pub async fn run_every(period: Duration, stop: &StopSignal, mut tick: impl FnMut()) {
    loop {
        let stopped = futures_lite::future::or(
            async {
                stop.wait().await;
                true
            },
            async {
                async_io_mini::Timer::after(period).await;
                false
            },
        )
        .await;
        if stopped {
            break;
        }
        tick();
    }
}
