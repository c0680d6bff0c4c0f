//! Expires time-bounded LED states.
//!
//! The monitor has no private access to the stack: it reads an entry
//! snapshot and calls [`LedPriorityStack::clear_state`] like any caller.

use core::time::Duration;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use log::{debug, error};

use super::LedState;
use super::stack::LedPriorityStack;
use crate::app::ports::LedDriverPort;
use crate::app::task::{BackgroundTask, StopSignal, run_every};

pub struct LedTimeoutMonitor<D: LedDriverPort> {
    stack: Arc<LedPriorityStack<D>>,
    poll_interval: Duration,
}

impl<D: LedDriverPort> LedTimeoutMonitor<D> {
    pub fn new(stack: Arc<LedPriorityStack<D>>, poll_interval: Duration) -> Self {
        Self {
            stack,
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Clear every expired entry.  Returns how many were removed.
    pub fn check_expired(&self) -> usize {
        match catch_unwind(AssertUnwindSafe(|| self.clear_expired())) {
            Ok(cleared) => cleared,
            Err(_) => {
                error!("LED timeout check panicked; continuing");
                0
            }
        }
    }

    fn clear_expired(&self) -> usize {
        let now = self.stack.now_ms();
        let expired: Vec<LedState> = self
            .stack
            .active_entries()
            .iter()
            .filter(|e| e.is_expired(now))
            .map(|e| e.state())
            .collect();
        expired
            .into_iter()
            .filter(|state| {
                debug!("LED {state:?} timed out");
                self.stack.clear_state(*state)
            })
            .count()
    }

    /// Poll until `stop` is signalled.
    pub async fn run(&self, stop: &StopSignal) {
        run_every(self.poll_interval, stop, || {
            self.check_expired();
        })
        .await;
    }

    pub fn spawn<'a, const C: usize>(
        self,
        executor: &edge_executor::LocalExecutor<'a, C>,
    ) -> BackgroundTask
    where
        D: 'a,
    {
        BackgroundTask::spawn(executor, "led-monitor", move |stop| async move {
            self.run(&stop).await;
        })
    }
}
