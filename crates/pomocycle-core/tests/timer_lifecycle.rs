//! End-to-end timer lifecycle over real stores.
//!
//! Drives a controller through whole work/break cycles on an on-disk SQLite
//! database (optionally behind the write-behind queue) and checks what a
//! restarted host would see.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Local, TimeZone};
use pomocycle_core::storage::keys;
use pomocycle_core::{
    Clock, Database, Event, KvStore, ManualClock, MemoryStore, Phase, Remaining, SessionStore,
    TimerConfiguration, TimerController, WriteBehindStore,
};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Local.with_ymd_and_hms(2024, 5, 6, 8, 30, 0).unwrap(),
    ))
}

fn one_minute_phases(cycles_before_long_break: i64) -> TimerConfiguration {
    TimerConfiguration {
        work_duration_minutes: 1,
        break_duration_minutes: 1,
        long_break_duration_minutes: 3,
        cycles_before_long_break,
        ..TimerConfiguration::default()
    }
}

/// Tick until the current phase reports completion.
fn finish_phase(controller: &mut TimerController) {
    controller.start();
    for _ in 0..100_000 {
        if controller.tick().is_finished() {
            return;
        }
    }
    panic!("phase did not finish");
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn full_cadence_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pomocycle.db");
    let clock = clock();

    let mut controller = TimerController::with_clock(
        one_minute_phases(3),
        SessionStore::new(Database::open_at(&path).unwrap()),
        clock.clone(),
    );

    let mut breaks = Vec::new();
    for _ in 0..6 {
        finish_phase(&mut controller);
        breaks.push(controller.switch_phase(false));
        finish_phase(&mut controller);
        assert_eq!(controller.switch_phase(false), Phase::Work);
    }

    assert_eq!(
        breaks,
        vec![
            Phase::Break,
            Phase::Break,
            Phase::LongBreak,
            Phase::Break,
            Phase::Break,
            Phase::LongBreak,
        ]
    );

    let today = controller.today_statistics();
    assert_eq!(today.completed_work_cycles, 6);
    assert_eq!(today.total_work_minutes, 6);
    assert_eq!(today.total_break_minutes, 4 + 2 * 3);
    controller.dispose();
    drop(controller);

    let reopened = TimerController::with_clock(
        one_minute_phases(3),
        SessionStore::new(Database::open_at(&path).unwrap()),
        clock,
    );
    let snapshot = reopened.snapshot();
    assert_eq!(snapshot.cycle_count, 6);
    assert_eq!(snapshot.phase, Phase::Work);
    assert_eq!(snapshot.today.completed_work_cycles, 6);
}

#[test]
fn write_behind_store_persists_progress() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pomocycle.db");
    let clock = clock();

    {
        let store = WriteBehindStore::spawn(Database::open_at(&path).unwrap()).unwrap();
        let mut controller = TimerController::with_clock(
            TimerConfiguration::default(),
            SessionStore::new(store),
            clock.clone(),
        );
        controller.start();
        for _ in 0..90 {
            controller.tick();
        }
        controller.dispose();
    }

    let db = Database::open_at(&path).unwrap();
    assert_eq!(db.get(keys::CURRENT_MINUTES).unwrap().as_deref(), Some("23"));
    assert_eq!(db.get(keys::CURRENT_SECONDS).unwrap().as_deref(), Some("30"));
    assert_eq!(db.get(keys::IS_PAUSED).unwrap().as_deref(), Some("false"));

    let session = SessionStore::new(db).load_session();
    assert_eq!(session.remaining, Remaining::new(0, 23, 30));
    assert!(session.running);
}

#[test]
fn events_follow_documented_order() {
    let memory = MemoryStore::new();
    let mut controller = TimerController::with_clock(
        one_minute_phases(4),
        SessionStore::new(memory),
        clock(),
    );
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    controller.subscribe(move |event| {
        let name = serde_json::to_value(event).unwrap()["type"]
            .as_str()
            .unwrap()
            .to_string();
        sink.lock().unwrap().push(name);
    });

    finish_phase(&mut controller);
    let events = seen.lock().unwrap().clone();
    let tail: Vec<&str> = events[events.len() - 4..].iter().map(String::as_str).collect();
    assert_eq!(tail, vec!["tick", "state_changed", "phase_completed", "state_changed"]);
}

#[test]
fn week_of_use_keeps_seven_days() {
    let memory = MemoryStore::new();
    let clock = clock();
    let mut controller = TimerController::with_clock(
        one_minute_phases(4),
        SessionStore::new(memory.clone()),
        clock.clone(),
    );

    for _ in 0..10 {
        finish_phase(&mut controller);
        controller.switch_phase(false);
        clock.advance(Duration::days(1));
    }

    let weekly = controller.weekly_statistics();
    assert_eq!(weekly.len(), 7);
    let today = clock.today();
    assert_eq!(weekly.entries().last().unwrap().date, today);
    assert_eq!(weekly.entries().first().unwrap().date, today - Duration::days(6));

    let summary = controller.weekly_summary();
    assert_eq!(summary.days_tracked, 7);
    assert_eq!(summary.completed_work_cycles, 6);

    controller.dispose();
    let stored = SessionStore::new(memory).load_weekly();
    assert!(stored.len() <= 7);
}

#[test]
fn persistence_warning_event_is_serializable() {
    let event = Event::PersistenceWarning {
        message: "Failed to write 'phase': disk full".into(),
    };
    let json = serde_json::to_string(&event).unwrap();
    assert_eq!(
        json,
        r#"{"type":"persistence_warning","message":"Failed to write 'phase': disk full"}"#
    );
}
