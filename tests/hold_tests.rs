use seat_inventory::domain::{ConflictReason, Errors, SeatConflict, SeatStatus};
use seat_inventory::persistence::EventStore;
use seat_inventory::services::{ExpirySweeper, HoldError, LockOutcome};
use std::sync::{Arc, Barrier};
use std::thread;
#[path="utils/mod.rs"] mod utils;
use utils::*;

#[test]
fn probe_reports_availability_without_locking() {
    let store = store_with(vec![sample_event()], vec![]);
    let holds = hold_manager(&store);

    assert!(holds.hold_seat(&EVENT_ID.to_string(), "A1").unwrap());
    assert!(!holds.hold_seat(&EVENT_ID.to_string(), "Z9").unwrap());
    assert_eq!(seat_status(&store, EVENT_ID, "A1"), SeatStatus::Available);
}

#[test]
fn lock_sets_hold_until_from_hold_duration() {
    let store = store_with(vec![sample_event()], vec![]);
    let holds = hold_manager(&store);

    let outcome = holds.lock_seats(&EVENT_ID.to_string(), &seat_ids(&["A1", "A2"]), t0()).unwrap();
    assert_eq!(outcome, LockOutcome::Locked { hold_until: Some(at(300)) });

    let event = EventStore::load(&store, EVENT_ID).unwrap().value;
    for id in ["A1", "A2"] {
        let seat = event.seat(id).unwrap();
        assert_eq!(seat.status, SeatStatus::BookingInProgress);
        assert_eq!(seat.hold_until, Some(at(300)));
    }
    assert_eq!(event.seat("A3").unwrap().hold_until, None);
}

#[test]
fn second_lock_on_held_seat_conflicts() {
    let store = store_with(vec![sample_event()], vec![]);
    let holds = hold_manager(&store);
    let event_id = EVENT_ID.to_string();

    assert!(holds.lock_seats(&event_id, &seat_ids(&["A1"]), t0()).unwrap().is_locked());

    let second = holds.lock_seats(&event_id, &seat_ids(&["A1", "A2"]), at(10)).unwrap();
    assert_eq!(
        second,
        LockOutcome::Conflicts(vec![SeatConflict::new("A1", ConflictReason::BookingInProgress)])
    );
    // All-or-nothing: A2 was free but stays untouched.
    assert_eq!(seat_status(&store, EVENT_ID, "A2"), SeatStatus::Available);
}

#[test]
fn lock_reports_unknown_and_unsellable_seats() {
    let mut event = sample_event();
    event.seats[2].status = SeatStatus::Unavailable;
    event.seats[3].status = SeatStatus::Held;
    let store = store_with(vec![event], vec![]);
    let holds = hold_manager(&store);

    let outcome = holds
        .lock_seats(&EVENT_ID.to_string(), &seat_ids(&["A1", "A3", "A4", "B7"]), t0())
        .unwrap();
    assert_eq!(
        outcome,
        LockOutcome::Conflicts(vec![
            SeatConflict::new("A3", ConflictReason::Unavailable),
            SeatConflict::new("A4", ConflictReason::Held),
            SeatConflict::new("B7", ConflictReason::NotFound),
        ])
    );
    assert_eq!(seat_status(&store, EVENT_ID, "A1"), SeatStatus::Available);
}

#[test]
fn concurrent_locks_on_one_seat_yield_exactly_one_winner() {
    const SHOPPERS: usize = 16;
    let store = store_with(vec![sample_event()], vec![]);
    let holds = hold_manager(&store);
    let barrier = Arc::new(Barrier::new(SHOPPERS));

    let handles: Vec<_> = (0..SHOPPERS)
        .map(|_| {
            let holds = holds.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                holds.lock_seats(&EVENT_ID.to_string(), &seat_ids(&["A1"]), t0()).unwrap()
            })
        })
        .collect();

    let outcomes: Vec<LockOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = outcomes.iter().filter(|o| o.is_locked()).count();
    assert_eq!(winners, 1);
    for outcome in outcomes.iter().filter(|o| !o.is_locked()) {
        match outcome {
            LockOutcome::Conflicts(conflicts) => assert_eq!(conflicts[0].seat_id, "A1"),
            other => panic!("Expected conflicts, got {:?}", other),
        }
    }
}

#[test]
fn release_is_idempotent_and_ignores_other_states() {
    let mut event = sample_event();
    event.seats[1].status = SeatStatus::Sold;
    let store = store_with(vec![event], vec![]);
    let holds = hold_manager(&store);
    let event_id = EVENT_ID.to_string();

    holds.lock_seats(&event_id, &seat_ids(&["A1"]), t0()).unwrap();

    assert_eq!(holds.release_seats(&event_id, &seat_ids(&["A1", "A2", "nope"])).unwrap(), 1);
    assert_eq!(holds.release_seats(&event_id, &seat_ids(&["A1"])).unwrap(), 0);

    let event = EventStore::load(&store, EVENT_ID).unwrap().value;
    assert_eq!(event.seat("A1").unwrap().status, SeatStatus::Available);
    assert_eq!(event.seat("A1").unwrap().hold_until, None);
    assert_eq!(event.seat("A2").unwrap().status, SeatStatus::Sold);
}

#[test]
fn release_without_changes_does_not_bump_the_version() {
    let store = store_with(vec![sample_event()], vec![]);
    let holds = hold_manager(&store);

    let before = EventStore::load(&store, EVENT_ID).unwrap().version;
    holds.release_seats(&EVENT_ID.to_string(), &seat_ids(&["A1"])).unwrap();
    assert_eq!(EventStore::load(&store, EVENT_ID).unwrap().version, before);
}

#[test]
fn sweep_reclaims_only_after_hold_until() {
    let store = store_with(vec![sample_event()], vec![]);
    let holds = hold_manager(&store);
    let sweeper = ExpirySweeper::new(holds.clone(), Arc::new(store.clone()), std::time::Duration::from_secs(60));

    holds.lock_seats(&EVENT_ID.to_string(), &seat_ids(&["A1", "A2"]), t0()).unwrap();

    assert_eq!(sweeper.run_once(at(299)).seats, 0);
    assert_eq!(seat_status(&store, EVENT_ID, "A1"), SeatStatus::BookingInProgress);

    let report = sweeper.run_once(at(301));
    assert_eq!(report.seats, 2);
    assert_eq!(report.events, 1);
    assert_eq!(seat_status(&store, EVENT_ID, "A1"), SeatStatus::Available);

    // A late explicit release after the sweep is a no-op.
    assert_eq!(holds.release_seats(&EVENT_ID.to_string(), &seat_ids(&["A1"])).unwrap(), 0);
    assert_eq!(sweeper.run_once(at(400)).seats, 0);
}

#[test]
fn expired_hold_can_be_relocked_after_sweep() {
    let store = store_with(vec![sample_event()], vec![]);
    let holds = hold_manager(&store);
    let sweeper = ExpirySweeper::new(holds.clone(), Arc::new(store.clone()), std::time::Duration::from_secs(60));
    let event_id = EVENT_ID.to_string();

    holds.lock_seats(&event_id, &seat_ids(&["A1"]), t0()).unwrap();
    sweeper.run_once(at(301));

    let outcome = holds.lock_seats(&event_id, &seat_ids(&["A1"]), at(302)).unwrap();
    assert_eq!(outcome, LockOutcome::Locked { hold_until: Some(at(602)) });
}

#[test]
fn general_admission_lock_always_succeeds() {
    let store = store_with(vec![ga_event(10)], vec![]);
    let holds = hold_manager(&store);

    let outcome = holds.lock_seats(&GA_EVENT_ID.to_string(), &seat_ids(&["anything"]), t0()).unwrap();
    assert_eq!(outcome, LockOutcome::Locked { hold_until: None });
    assert!(holds.hold_seat(&GA_EVENT_ID.to_string(), "anything").unwrap());
}

#[test]
fn unknown_and_deleted_events_are_errors() {
    let mut deleted = reserved_event("gone");
    deleted.deleted = true;
    let store = store_with(vec![deleted], vec![]);
    let holds = hold_manager(&store);

    assert_eq!(
        holds.lock_seats(&"missing".to_string(), &seat_ids(&["A1"]), t0()),
        Err(HoldError::Domain(Errors::UnknownEvent("missing".to_string())))
    );
    assert_eq!(
        holds.lock_seats(&"gone".to_string(), &seat_ids(&["A1"]), t0()),
        Err(HoldError::Domain(Errors::EventDeleted("gone".to_string())))
    );
}

#[test]
fn admin_override_skips_sold_seats() {
    let mut event = sample_event();
    event.seats[0].status = SeatStatus::Sold;
    let store = store_with(vec![event], vec![]);
    let holds = hold_manager(&store);
    let event_id = EVENT_ID.to_string();

    holds.lock_seats(&event_id, &seat_ids(&["A2"]), t0()).unwrap();
    let outcome = holds
        .set_status(&event_id, &seat_ids(&["A1", "A2", "A3"]), SeatStatus::Unavailable)
        .unwrap();

    assert_eq!(outcome.skipped, vec![SeatConflict::new("A1", ConflictReason::Sold)]);
    assert_eq!(outcome.updated, 2);
    let event = EventStore::load(&store, EVENT_ID).unwrap().value;
    assert_eq!(event.seat("A1").unwrap().status, SeatStatus::Sold);
    assert_eq!(event.seat("A2").unwrap().status, SeatStatus::Unavailable);
    assert_eq!(event.seat("A2").unwrap().hold_until, None);
    assert_eq!(event.seat("A3").unwrap().status, SeatStatus::Unavailable);
}

#[test]
fn admin_override_counts_repeated_ids_once() {
    let store = store_with(vec![sample_event()], vec![]);
    let holds = hold_manager(&store);

    let outcome = holds
        .set_status(&EVENT_ID.to_string(), &seat_ids(&["A1", "A1", "A2", "A9", "A9"]), SeatStatus::Held)
        .unwrap();

    assert_eq!(outcome.updated, 2);
    assert_eq!(outcome.skipped, vec![SeatConflict::new("A9", ConflictReason::NotFound)]);
    assert_eq!(seat_status(&store, EVENT_ID, "A1"), SeatStatus::Held);
}

#[test]
fn admin_override_cannot_sell_or_hold_for_checkout() {
    let store = store_with(vec![sample_event()], vec![]);
    let holds = hold_manager(&store);

    assert_eq!(
        holds.set_status(&EVENT_ID.to_string(), &seat_ids(&["A1"]), SeatStatus::Sold),
        Err(HoldError::Domain(Errors::InvalidStatusOverride("SOLD".to_string())))
    );
}
