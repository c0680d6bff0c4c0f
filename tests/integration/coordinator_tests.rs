//! Integration tests for the reader → queue → coordinator → subscribers chain.
//!
//! Events enter through the mock reader's callbacks, exactly as the reader
//! thread would deliver them, and are drained by the runtime's `dispatch`.

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;
use std::sync::Arc;

use crate::mock_hw::{MockLedDriver, MockPlayback, MockReader, ReaderHandle};

use tagplayer::adapters::directory::MemoryDirectory;
use tagplayer::adapters::time::ManualClock;
use tagplayer::app::events::EventQueue;
use tagplayer::app::playback::TagPlayback;
use tagplayer::app::ports::{Clock, PlaylistDirectory};
use tagplayer::app::runtime;
use tagplayer::error::Error;
use tagplayer::led::stack::LedPriorityStack;
use tagplayer::led::{LedState, LedStateTable};
use tagplayer::nfc::TagId;
use tagplayer::nfc::association::{AssociationOutcome, SessionId};
use tagplayer::nfc::coordinator::{CoordinatorMode, NfcCoordinator};

const MINUTE: Duration = Duration::from_secs(60);

type Leds = Arc<LedPriorityStack<MockLedDriver>>;
type Coordinator = NfcCoordinator<MockReader, Rc<MemoryDirectory>, Leds>;

struct Rig {
    coordinator: Coordinator,
    reader: ReaderHandle,
    queue: EventQueue,
    clock: Arc<ManualClock>,
    directory: Rc<MemoryDirectory>,
    plays: Rc<RefCell<Vec<String>>>,
    outcomes: Rc<RefCell<Vec<AssociationOutcome>>>,
}

impl Rig {
    fn new(links: &[(&str, &str)]) -> Self {
        Self::with_parts(MockReader::new(), MockLedDriver::default(), links)
    }

    fn with_parts(
        (reader, handle): (MockReader, ReaderHandle),
        driver: MockLedDriver,
        links: &[(&str, &str)],
    ) -> Self {
        let clock = Arc::new(ManualClock::new(1_000));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let directory = Rc::new(MemoryDirectory::with_links(links.iter().copied()));
        let leds = Arc::new(LedPriorityStack::new(
            driver,
            LedStateTable::default(),
            Arc::clone(&dyn_clock),
        ));
        let mut coordinator = NfcCoordinator::new(reader, Rc::clone(&directory), leds, dyn_clock);

        let plays = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&plays);
        coordinator.register_tag_detected_callback(move |uid| {
            sink.borrow_mut().push(uid.to_owned());
            Ok(())
        });
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&outcomes);
        coordinator.register_association_callback(move |outcome| {
            sink.borrow_mut().push(outcome.clone());
            Ok(())
        });

        let queue = EventQueue::new();
        runtime::boot(&mut coordinator, &queue);
        Self {
            coordinator,
            reader: handle,
            queue,
            clock,
            directory,
            plays,
            outcomes,
        }
    }

    /// Drain the queue into the coordinator.
    fn pump(&mut self) {
        while let Some(event) = self.queue.try_receive() {
            runtime::dispatch(&mut self.coordinator, event);
        }
    }

    fn present(&mut self, uid: &str) {
        self.reader.present(uid);
        self.pump();
    }

    fn remove(&mut self) {
        self.reader.remove();
        self.pump();
    }

    fn plays(&self) -> Vec<String> {
        self.plays.borrow().clone()
    }

    fn leds(&self) -> &Leds {
        self.coordinator.leds()
    }

    fn take_outcomes(&self) -> Vec<AssociationOutcome> {
        self.outcomes.borrow_mut().drain(..).collect()
    }
}

fn tag(uid: &str) -> TagId {
    TagId::parse(uid).unwrap()
}

// ── Debounce ──────────────────────────────────────────────────

#[test]
fn tag_resting_on_reader_triggers_playback_once() {
    let mut rig = Rig::new(&[("04a1", "p1")]);
    for _ in 0..10 {
        rig.present("04A1");
        rig.clock.advance(Duration::from_millis(50));
    }
    assert_eq!(rig.plays(), vec!["04a1"]);
    let counters = rig.coordinator.status().counters;
    assert_eq!(counters.playback_triggers, 1);
    assert_eq!(counters.debounced, 9);
}

#[test]
fn removal_rearms_the_same_tag() {
    let mut rig = Rig::new(&[]);
    rig.present("04a1");
    rig.remove();
    rig.present("04a1");
    assert_eq!(rig.plays(), vec!["04a1", "04a1"]);
}

#[test]
fn different_tag_triggers_without_removal() {
    let mut rig = Rig::new(&[]);
    rig.present("04a1");
    rig.present("04b2");
    rig.present("04b2");
    assert_eq!(rig.plays(), vec!["04a1", "04b2"]);
    assert_eq!(rig.coordinator.status().current_tag, Some(tag("04b2")));
}

#[test]
fn malformed_reports_are_dropped_without_side_effects() {
    let mut rig = Rig::new(&[]);
    rig.present("   ");
    rig.reader.present(serde_json::json!({ "id": 5 }));
    rig.pump();
    assert!(rig.plays().is_empty());
    assert!(rig.take_outcomes().is_empty());
    let status = rig.coordinator.status();
    assert_eq!(status.counters.malformed, 2);
    assert_eq!(status.current_tag, None);
}

#[test]
fn structured_payloads_are_normalized() {
    let mut rig = Rig::new(&[]);
    rig.reader.present(serde_json::json!({ "uid": " 04:A1 " }));
    rig.pump();
    rig.present("04:a1");
    assert_eq!(rig.plays(), vec!["04:a1"]);
}

// ── Normal-mode feedback ──────────────────────────────────────

#[test]
fn linked_tag_reports_bookkeeping_then_success_led() {
    let mut rig = Rig::new(&[("04a1", "p1")]);
    rig.present("04a1");
    assert_eq!(
        rig.take_outcomes(),
        vec![AssociationOutcome::TagDetected {
            tag: tag("04a1"),
            playlist_id: "p1".into(),
        }]
    );
    assert_eq!(rig.leds().current_state(), Some(LedState::NfcSuccess));
}

#[test]
fn unlinked_tag_shows_unassociated_led() {
    let mut rig = Rig::new(&[]);
    rig.present("04ff");
    assert_eq!(
        rig.take_outcomes(),
        vec![AssociationOutcome::TagDetectedUnassociated { tag: tag("04ff") }]
    );
    assert_eq!(rig.leds().current_state(), Some(LedState::NfcUnassociatedTag));
    // Feedback expires back to idle.
    rig.clock.advance(Duration::from_secs(3));
    let monitor = tagplayer::led::monitor::LedTimeoutMonitor::new(
        Arc::clone(rig.leds()),
        Duration::from_millis(500),
    );
    assert_eq!(monitor.check_expired(), 1);
    assert_eq!(rig.leds().current_state(), Some(LedState::Idle));
}

#[test]
fn led_hardware_failure_never_blocks_playback() {
    let mut rig = Rig::with_parts(MockReader::new(), MockLedDriver::failing(), &[("04a1", "p1")]);
    rig.present("04a1");
    assert_eq!(rig.plays(), vec!["04a1"]);
    assert!(rig.leds().with_driver(|d| d.renders()) > 0);
}

#[test]
fn tag_playback_subscriber_starts_linked_playlist() {
    let mut rig = Rig::new(&[("04a1", "bedtime")]);
    let playback = Rc::new(RefCell::new(TagPlayback::new(
        MockPlayback::default(),
        Rc::clone(&rig.directory),
    )));
    let subscriber = Rc::clone(&playback);
    rig.coordinator
        .register_tag_detected_callback(move |uid| subscriber.borrow_mut().on_tag(uid));

    rig.present("04a1");
    rig.remove();
    rig.present("0499");

    let playback = playback.borrow();
    assert_eq!(playback.player().played, vec!["bedtime"]);
    assert_eq!(playback.started(), 1);
}

// ── Association mode ──────────────────────────────────────────

#[test]
fn association_mode_never_fires_playback() {
    let mut rig = Rig::new(&[]);
    rig.coordinator.start_association("p1", MINUTE, false);
    for uid in ["04a1", "04a1", "04b2", "04a1"] {
        rig.present(uid);
        rig.remove();
    }
    assert!(rig.plays().is_empty());
    assert_eq!(rig.take_outcomes().len(), 4);
    assert_eq!(rig.coordinator.status().counters.playback_triggers, 0);
}

#[test]
fn association_leaves_debounce_untouched() {
    let mut rig = Rig::new(&[]);
    rig.present("04a1");
    let session = rig.coordinator.start_association("p1", MINUTE, false);
    rig.present("04a1");
    assert!(rig.coordinator.stop_association(session.id));

    // Still resting on the reader: no second trigger.
    rig.present("04a1");
    assert_eq!(rig.plays(), vec!["04a1"]);
}

#[test]
fn first_session_claims_unlinked_tag() {
    let mut rig = Rig::new(&[]);
    let session = rig.coordinator.start_association("p1", MINUTE, false);
    rig.present("04a1");

    assert_eq!(
        rig.take_outcomes(),
        vec![AssociationOutcome::Associated {
            tag: tag("04a1"),
            playlist_id: "p1".into(),
            session_id: session.id,
        }]
    );
    assert_eq!(
        rig.directory.playlist_for(&tag("04a1")).unwrap(),
        Some("p1".into())
    );
    assert_eq!(rig.leds().current_state(), Some(LedState::AssociationSuccess));
}

#[test]
fn duplicate_then_override_relinks_tag() {
    let mut rig = Rig::new(&[("t1", "p2")]);

    let first = rig.coordinator.start_association("p1", MINUTE, false);
    rig.present("T1");
    assert_eq!(
        rig.take_outcomes(),
        vec![AssociationOutcome::AlreadyAssociatedDuplicate {
            tag: tag("t1"),
            existing_playlist_id: "p2".into(),
            requested_playlist_id: "p1".into(),
            session_id: first.id,
        }]
    );
    assert!(rig.plays().is_empty());
    assert_eq!(rig.leds().current_state(), Some(LedState::AssociationDuplicate));

    assert!(rig.coordinator.stop_association(first.id));
    let second = rig.coordinator.start_association("p1", MINUTE, true);
    rig.remove();
    rig.present("T1");
    assert_eq!(
        rig.take_outcomes(),
        vec![AssociationOutcome::AlreadyAssociatedUpdated {
            tag: tag("t1"),
            playlist_id: "p1".into(),
            previous_playlist_id: "p2".into(),
            session_id: second.id,
        }]
    );
    assert!(rig.plays().is_empty());
    assert_eq!(
        rig.directory.playlist_for(&tag("t1")).unwrap(),
        Some("p1".into())
    );
}

#[test]
fn concurrent_sessions_process_in_creation_order() {
    let mut rig = Rig::new(&[]);
    let a = rig.coordinator.start_association("p1", MINUTE, false);
    let b = rig.coordinator.start_association("p2", MINUTE, false);
    rig.present("04a1");

    let outcomes = rig.take_outcomes();
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(
        &outcomes[0],
        AssociationOutcome::Associated { session_id, .. } if *session_id == a.id
    ));
    assert!(matches!(
        &outcomes[1],
        AssociationOutcome::AlreadyAssociatedDuplicate { session_id, .. } if *session_id == b.id
    ));
    // Both success and duplicate feedback fired; the duplicate was last.
    let leds = rig.leds();
    assert!(leds.contains(LedState::AssociationSuccess));
    assert!(leds.contains(LedState::AssociationDuplicate));
}

#[test]
fn expired_sessions_return_to_normal_mode() {
    let mut rig = Rig::new(&[]);
    let session = rig.coordinator.start_association("p1", MINUTE, false);
    assert_eq!(rig.coordinator.mode(), CoordinatorMode::Association);
    assert_eq!(rig.leds().current_state(), Some(LedState::AssociationMode));

    rig.clock.advance(Duration::from_secs(59));
    assert_eq!(rig.coordinator.sweep_expired(), 0);
    rig.clock.advance(Duration::from_secs(1));
    assert_eq!(rig.coordinator.sweep_expired(), 1);

    assert_eq!(rig.coordinator.mode(), CoordinatorMode::Normal);
    assert!(!rig.leds().contains(LedState::AssociationMode));
    assert!(!rig.coordinator.stop_association(session.id));

    rig.present("04a1");
    assert_eq!(rig.plays(), vec!["04a1"]);
}

#[test]
fn vanished_session_is_not_found() {
    let mut rig = Rig::new(&[]);
    assert!(!rig.coordinator.stop_association(SessionId(42)));
    assert_eq!(
        rig.coordinator.session(SessionId(42)),
        Err(Error::SessionNotFound(SessionId(42)))
    );
    let session = rig.coordinator.start_association("p1", MINUTE, false);
    assert!(rig.coordinator.session(session.id).is_ok());
    assert_eq!(rig.coordinator.status().active_sessions, vec![session]);
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_starts_reader_and_settles_on_idle() {
    let rig = Rig::new(&[]);
    assert!(rig.reader.is_detecting());
    assert!(rig.coordinator.status().detecting);
    assert_eq!(rig.leds().current_state(), Some(LedState::Idle));
    assert!(!rig.leds().contains(LedState::Booting));
}

#[test]
fn boot_with_dead_reader_shows_hardware_error() {
    let rig = Rig::with_parts(MockReader::broken(), MockLedDriver::default(), &[]);
    assert!(!rig.coordinator.is_detecting());
    assert_eq!(rig.leds().current_state(), Some(LedState::ErrorHardware));
}

#[test]
fn stop_detection_rearms_debounce() {
    let mut rig = Rig::new(&[]);
    rig.present("04a1");
    rig.coordinator.stop_detection();
    assert!(!rig.reader.is_detecting());
    assert!(rig.coordinator.start_detection(&rig.queue.producer()));
    rig.present("04a1");
    assert_eq!(rig.plays(), vec!["04a1", "04a1"]);
}
