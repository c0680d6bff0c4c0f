//! TagPlayer firmware entry point.
//!
//! Hexagonal architecture with a single event-loop consumer.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  PollingNfcReader  PwmRgbLed      MemoryDirectory  SystemClock │
//! │  (NfcReaderPort)   (LedDriverPort)(Directory)      (Clock)     │
//! │  LogPlayback                                                   │
//! │  (PlaybackPort)                                                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  NfcCoordinator · LedPriorityStack (pure logic)        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Runtime: dispatcher · session sweeper · LED monitor · render  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

mod esp_link_shims;

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;
use log::{info, warn};

use tagplayer::adapters::directory::MemoryDirectory;
use tagplayer::adapters::log_playback::LogPlayback;
use tagplayer::adapters::time::SystemClock;
use tagplayer::app::events::EventQueue;
use tagplayer::app::playback::TagPlayback;
use tagplayer::app::ports::Clock;
use tagplayer::app::runtime;
use tagplayer::app::task::{BackgroundTask, run_every};
use tagplayer::config::SystemConfig;
use tagplayer::drivers::nfc_reader::PollingNfcReader;
use tagplayer::drivers::status_led::PwmRgbLed;
use tagplayer::drivers::uart_scanner::UartScanner;
use tagplayer::led::LedStateTable;
use tagplayer::led::monitor::LedTimeoutMonitor;
use tagplayer::led::stack::LedPriorityStack;
use tagplayer::nfc::coordinator::NfcCoordinator;
use tagplayer::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  TagPlayer v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::default();
    config.validate()?;
    let peripherals = Peripherals::take()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    // ── 2. Status LED (LEDC, 8-bit) ───────────────────────────
    let led_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new()
            .frequency(Hertz(pins::LED_PWM_FREQ_HZ))
            .resolution(Resolution::Bits8),
    )?;
    // SAFETY: each GPIO number in `pins` is claimed exactly once.
    let (red_pin, green_pin, blue_pin) = unsafe {
        (
            AnyOutputPin::new(pins::LED_R_GPIO),
            AnyOutputPin::new(pins::LED_G_GPIO),
            AnyOutputPin::new(pins::LED_B_GPIO),
        )
    };
    let led = PwmRgbLed::new(
        LedcDriver::new(peripherals.ledc.channel0, &led_timer, red_pin)?,
        LedcDriver::new(peripherals.ledc.channel1, &led_timer, green_pin)?,
        LedcDriver::new(peripherals.ledc.channel2, &led_timer, blue_pin)?,
    );
    let leds = Arc::new(LedPriorityStack::new(
        led,
        LedStateTable::default(),
        Arc::clone(&clock),
    ));
    if !leds.initialize() {
        warn!("Status LED init failed, continuing without visual feedback");
    }
    leds.set_brightness(config.led_brightness);

    // ── 3. NFC reader (UART auto-read module) ─────────────────
    let (nfc_tx, nfc_rx) = unsafe {
        (
            AnyIOPin::new(pins::NFC_UART_TX_GPIO),
            AnyIOPin::new(pins::NFC_UART_RX_GPIO),
        )
    };
    let uart = UartDriver::new(
        peripherals.uart1,
        nfc_tx,
        nfc_rx,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::new().baudrate(Hertz(pins::NFC_UART_BAUD)),
    )?;
    let reader = PollingNfcReader::new(
        UartScanner::new(uart),
        Duration::from_millis(config.nfc_poll_interval_ms as u64),
        Duration::from_millis(config.nfc_absence_timeout_ms as u64),
    );

    // ── 4. Coordinator + subscribers ──────────────────────────
    let directory = Rc::new(MemoryDirectory::new());
    let mut coordinator = NfcCoordinator::new(
        reader,
        Rc::clone(&directory),
        Arc::clone(&leds),
        Arc::clone(&clock),
    );
    coordinator.register_tag_detected_callback(
        TagPlayback::new(LogPlayback::new(), Rc::clone(&directory)).into_callback(),
    );
    coordinator.register_association_callback(|outcome| match serde_json::to_string(outcome) {
        Ok(json) => {
            info!("ASSOC | {json}");
            Ok(())
        }
        Err(e) => anyhow::bail!("could not encode outcome: {e}"),
    });

    // ── 5. Event loop ─────────────────────────────────────────
    let queue = EventQueue::new();
    if !runtime::boot(&mut coordinator, &queue) {
        warn!("NFC reader unavailable, LED shows hardware error");
    }

    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();
    let monitor = LedTimeoutMonitor::new(Arc::clone(&leds), config.led_poll_interval());
    let _runtime = runtime::start(
        &executor,
        Rc::new(RefCell::new(coordinator)),
        queue,
        monitor,
        &config,
    );

    let render_tick = config.led_render_tick_ms;
    let _render = BackgroundTask::spawn(&executor, "led-render", move |stop| async move {
        run_every(Duration::from_millis(render_tick as u64), &stop, || {
            leds.with_driver(|led| led.render_frame(render_tick));
        })
        .await;
    });

    info!("System ready. Entering event loop.");
    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
    Ok(())
}
