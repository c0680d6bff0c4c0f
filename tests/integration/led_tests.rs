//! Integration tests for the LED priority stack and timeout monitor.

use core::time::Duration;
use std::sync::Arc;

use crate::mock_hw::{LedCall, MockLedDriver};

use tagplayer::adapters::time::ManualClock;
use tagplayer::app::ports::Clock;
use tagplayer::error::Error;
use tagplayer::led::monitor::LedTimeoutMonitor;
use tagplayer::led::stack::LedPriorityStack;
use tagplayer::led::{LedState, LedStateConfig, LedStateTable};

struct Rig {
    stack: Arc<LedPriorityStack<MockLedDriver>>,
    monitor: LedTimeoutMonitor<MockLedDriver>,
    clock: Arc<ManualClock>,
}

fn rig(table: LedStateTable) -> Rig {
    let clock = Arc::new(ManualClock::new(0));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let stack = Arc::new(LedPriorityStack::new(
        MockLedDriver::default(),
        table,
        dyn_clock,
    ));
    let monitor = LedTimeoutMonitor::new(Arc::clone(&stack), Duration::from_millis(500));
    Rig {
        stack,
        monitor,
        clock,
    }
}

/// The default table with `state`'s timeout replaced.
fn table_with_timeout(state: LedState, timeout: Duration) -> LedStateTable {
    let defaults = LedStateTable::default();
    LedStateTable::new(LedState::ALL.iter().map(|s| {
        let mut config = *defaults.get(*s).unwrap();
        if *s == state {
            config.timeout = Some(timeout);
        }
        config
    }))
    .unwrap()
}

fn shown(table: &LedStateTable, state: LedState) -> LedCall {
    let config = table.get(state).unwrap();
    LedCall::Show(config.color, config.animation)
}

impl Rig {
    fn last_render(&self) -> Option<LedCall> {
        self.stack.with_driver(|d| d.last_render().cloned())
    }

    fn renders(&self) -> usize {
        self.stack.with_driver(|d| d.renders())
    }
}

// ── Priority ordering ─────────────────────────────────────────

#[test]
fn highest_priority_renders_in_any_insertion_order() {
    // Idle = 10, Playing = 50, ErrorPlayback = 90.
    let orders = [
        [LedState::Idle, LedState::Playing, LedState::ErrorPlayback],
        [LedState::Idle, LedState::ErrorPlayback, LedState::Playing],
        [LedState::Playing, LedState::Idle, LedState::ErrorPlayback],
        [LedState::Playing, LedState::ErrorPlayback, LedState::Idle],
        [LedState::ErrorPlayback, LedState::Idle, LedState::Playing],
        [LedState::ErrorPlayback, LedState::Playing, LedState::Idle],
    ];
    for order in orders {
        let rig = rig(LedStateTable::default());
        for state in order {
            rig.stack.set_state(state).unwrap();
        }
        let table = rig.stack.table();
        assert_eq!(rig.stack.current_state(), Some(LedState::ErrorPlayback));
        assert_eq!(
            rig.last_render(),
            Some(shown(table, LedState::ErrorPlayback)),
            "order {order:?}"
        );

        assert!(rig.stack.clear_state(LedState::ErrorPlayback));
        assert_eq!(rig.stack.current_state(), Some(LedState::Playing));
        assert_eq!(rig.last_render(), Some(shown(table, LedState::Playing)));
    }
}

#[test]
fn hidden_state_changes_do_not_rerender() {
    let rig = rig(LedStateTable::default());
    rig.stack.set_state(LedState::ErrorCritical).unwrap();
    let before = rig.renders();
    rig.stack.set_state(LedState::Playing).unwrap();
    rig.stack.set_state(LedState::Paused).unwrap();
    assert!(rig.stack.clear_state(LedState::Playing));
    assert_eq!(rig.renders(), before);
}

#[test]
fn rerequesting_top_state_does_not_rerender() {
    let solo = rig(LedStateTable::default());
    solo.stack.set_state(LedState::Playing).unwrap();
    let calls = solo.stack.with_driver(|d| d.calls.len());
    solo.stack.set_state(LedState::Playing).unwrap();
    assert_eq!(solo.stack.with_driver(|d| d.calls.len()), calls);

    // AssociationSuccess and AssociationDuplicate share priority 85.
    let pair = rig(LedStateTable::default());
    let table = pair.stack.table();
    pair.stack.set_state(LedState::AssociationSuccess).unwrap();
    pair.stack.set_state(LedState::AssociationDuplicate).unwrap();
    let calls = pair.stack.with_driver(|d| d.calls.len());
    pair.clock.advance(Duration::from_millis(500));
    pair.stack.set_state(LedState::AssociationSuccess).unwrap();
    assert_eq!(pair.stack.current_state(), Some(LedState::AssociationSuccess));
    assert_eq!(pair.stack.with_driver(|d| d.calls.len()), calls);
    assert_eq!(
        pair.last_render(),
        Some(shown(table, LedState::AssociationSuccess))
    );

    // The refresh restarted the 2 s timeout.
    pair.clock.advance(Duration::from_millis(1_600));
    assert_eq!(pair.monitor.check_expired(), 0);
    pair.clock.advance(Duration::from_millis(400));
    assert_eq!(pair.monitor.check_expired(), 1);
    assert_eq!(
        pair.stack.current_state(),
        Some(LedState::AssociationDuplicate)
    );
}

#[test]
fn critical_error_overrides_playing_and_hands_back() {
    let rig = rig(LedStateTable::default());
    let table = rig.stack.table();
    rig.stack.set_state(LedState::Playing).unwrap();
    rig.stack.set_state(LedState::ErrorCritical).unwrap();
    assert_eq!(rig.last_render(), Some(shown(table, LedState::ErrorCritical)));

    assert!(rig.stack.clear_state(LedState::ErrorCritical));
    assert_eq!(rig.last_render(), Some(shown(table, LedState::Playing)));
}

#[test]
fn unknown_state_is_rejected_without_mutation() {
    let table = LedStateTable::new([LedStateConfig::new(
        LedState::Idle,
        (1, 2, 3),
        tagplayer::led::Animation::Solid,
        10,
        None,
    )])
    .unwrap();
    let rig = rig(table);
    rig.stack.set_state(LedState::Idle).unwrap();
    let renders = rig.renders();

    assert_eq!(
        rig.stack.set_state(LedState::Playing),
        Err(Error::UnknownLedState(LedState::Playing))
    );
    assert_eq!(rig.stack.active_entries().len(), 1);
    assert_eq!(rig.renders(), renders);
}

#[test]
fn clearing_last_state_turns_led_off() {
    let rig = rig(LedStateTable::default());
    rig.stack.set_state(LedState::Paused).unwrap();
    assert!(rig.stack.clear_state(LedState::Paused));
    assert!(!rig.stack.clear_state(LedState::Paused));
    assert_eq!(rig.stack.current_state(), None);
    assert_eq!(rig.last_render(), Some(LedCall::Off));
}

// ── Timeouts ──────────────────────────────────────────────────

#[test]
fn timed_state_expires_and_rerenders() {
    let rig = rig(table_with_timeout(
        LedState::NfcSuccess,
        Duration::from_millis(200),
    ));
    let table = rig.stack.table();
    rig.stack.set_state(LedState::Idle).unwrap();
    rig.stack.set_state(LedState::NfcSuccess).unwrap();
    let renders = rig.renders();

    rig.clock.advance(Duration::from_millis(199));
    assert_eq!(rig.monitor.check_expired(), 0);
    assert!(rig.stack.contains(LedState::NfcSuccess));

    rig.clock.advance(Duration::from_millis(1));
    assert_eq!(rig.monitor.check_expired(), 1);
    assert!(!rig.stack.contains(LedState::NfcSuccess));
    assert_eq!(rig.renders(), renders + 1);
    assert_eq!(rig.last_render(), Some(shown(table, LedState::Idle)));
}

#[test]
fn permanent_states_never_expire() {
    let rig = rig(LedStateTable::default());
    rig.stack.set_state(LedState::ErrorHardware).unwrap();
    rig.stack.set_state(LedState::Idle).unwrap();
    rig.clock.advance(Duration::from_secs(24 * 60 * 60));
    assert_eq!(rig.monitor.check_expired(), 0);
    assert_eq!(rig.stack.active_entries().len(), 2);
}

#[test]
fn driver_failures_leave_stack_consistent() {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
    let stack = LedPriorityStack::new(MockLedDriver::failing(), LedStateTable::default(), clock);
    assert!(!stack.initialize());
    assert!(stack.set_state(LedState::Playing).is_ok());
    assert_eq!(stack.current_state(), Some(LedState::Playing));
    assert!(!stack.set_brightness(0.5));
}
