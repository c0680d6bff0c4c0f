//! Core-pinned worker threads.
//!
//! On the ESP32-S3 a [`ThreadSpec`] becomes a FreeRTOS task with a fixed
//! core, priority and stack via `esp_pthread_set_cfg()`.  That call only
//! affects the *next* `pthread_create()` from the calling thread, so the
//! config and the spawn always happen back to back in [`ThreadSpec::spawn`].
//! Host builds ignore affinity and priority.

use std::thread::JoinHandle;

use log::info;

use crate::error::HardwareError;

/// ESP32-S3 CPU cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// PRO_CPU: peripheral polling.
    Pro = 0,
    /// APP_CPU: the event loop.
    App = 1,
}

#[derive(Debug, Clone, Copy)]
pub struct ThreadSpec {
    /// NUL-terminated, e.g. `"nfc\0"`.
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

impl ThreadSpec {
    fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }

    pub fn spawn<T: Send + 'static>(
        &self,
        f: impl FnOnce() -> T + Send + 'static,
    ) -> Result<JoinHandle<T>, HardwareError> {
        self.configure()?;
        info!(
            "spawning '{}' on {:?} (prio {}, {} KB stack)",
            self.display_name(),
            self.core,
            self.priority,
            self.stack_kb
        );
        std::thread::Builder::new()
            .name(self.display_name().into())
            .stack_size(self.stack_kb * 1024)
            .spawn(f)
            .map_err(|_| HardwareError::Busy)
    }

    #[cfg(target_os = "espidf")]
    fn configure(&self) -> Result<(), HardwareError> {
        use esp_idf_svc::sys;

        debug_assert!(self.name.ends_with('\0'));
        // SAFETY: `cfg` outlives the call and `name` is a static C string.
        let ret = unsafe {
            let mut cfg = sys::esp_create_default_pthread_config();
            cfg.pin_to_core = self.core as i32;
            cfg.prio = i32::from(self.priority);
            cfg.stack_size = (self.stack_kb * 1024) as i32;
            cfg.thread_name = self.name.as_ptr().cast();
            sys::esp_pthread_set_cfg(&cfg)
        };
        if ret == sys::ESP_OK as i32 {
            Ok(())
        } else {
            log::error!("esp_pthread_set_cfg for '{}' failed: {ret}", self.display_name());
            Err(HardwareError::InitFailed)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    #[allow(clippy::unnecessary_wraps)]
    fn configure(&self) -> Result<(), HardwareError> {
        Ok(())
    }
}
