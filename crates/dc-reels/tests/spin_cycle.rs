//! Spin Cycle Test Suite
//!
//! End-to-end runs of the coordinator on paused tokio time:
//! - Settling and evaluation
//! - Event ordering
//! - Forced stops
//! - Configuration while idle or busy

use std::time::Duration;

use approx::assert_relative_eq;
use dc_core::{ConfigError, ScriptedRandomSource, SeededRandomSource, WinVerdict};
use dc_reels::{
    CoordinatorError, GameSettings, GameState, ReelState, SpinCoordinator, SpinPlan, SpinTiming,
    SymbolPool,
};
use dc_stage::{SpinEvent, SpinStage};
use tokio::sync::broadcast::Receiver;

// ═══════════════════════════════════════════════════════════════════════════════
// TEST FIXTURES
// ═══════════════════════════════════════════════════════════════════════════════

fn settings(columns: u32) -> GameSettings {
    GameSettings {
        columns,
        simulation_seconds: 1.0,
        ..GameSettings::default()
    }
}

fn pool(size: u32) -> SymbolPool {
    SymbolPool::bundled().restricted(size)
}

fn scripted(columns: u32, pool_size: u32, script: Vec<usize>) -> SpinCoordinator {
    SpinCoordinator::new(
        settings(columns),
        pool(pool_size),
        Box::new(ScriptedRandomSource::new(script)),
    )
    .unwrap()
}

fn drain(rx: &mut Receiver<SpinEvent>) -> Vec<SpinEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn position(events: &[SpinEvent], name: &str) -> Option<usize> {
    events.iter().position(|e| e.type_name() == name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETTLING
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_three_equal_tops_win() {
    let coord = scripted(3, 4, vec![1]);
    assert_relative_eq!(coord.probability(), 0.0625);

    let outcome = coord.start_spin().unwrap().wait().await.unwrap();

    assert_eq!(outcome.tops, vec![1, 1, 1]);
    assert_eq!(outcome.verdict, WinVerdict::Win);
    assert_eq!(outcome.message, "Win!");
    assert_eq!(outcome.symbols.len(), 3);
    assert!(outcome.symbols.iter().all(|s| s.name == "lemon"));
    assert_eq!(coord.state(), GameState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_distinct_tops_lose() {
    // both initial windows are [0, 1, 0, 1, 0, 1]
    let coord = scripted(2, 4, vec![0, 1]);
    // reel 0 steps 4 times, reel 1 (starting at 125 ms) 3 times
    let plan = SpinPlan::new(2, 6, SpinTiming::new(300.0, 1000.0));

    let outcome = coord.start_spin_with(plan).unwrap().wait().await.unwrap();
    assert_eq!(outcome.tops, vec![0, 1]);
    assert_eq!(outcome.win(), Some(false));
    assert_eq!(outcome.message, "Try again!");
}

#[tokio::test(start_paused = true)]
async fn test_five_columns_single_row_probability() {
    let coord = scripted(5, 6, vec![0]);
    let snapshot = coord.snapshot();
    assert_eq!(snapshot.layout.row_count(), 1);
    assert_relative_eq!(snapshot.probability, (1.0f64 / 6.0).powi(4), max_relative = 1e-12);
    assert_eq!(snapshot.probability_text, "0.0772%");
}

#[tokio::test(start_paused = true)]
async fn test_steps_in_flight_at_cutoff_land_before_evaluation() {
    let coord = scripted(3, 4, vec![0, 1, 2, 3]);
    let plan = SpinPlan::new(3, 6, SpinTiming::new(300.0, 1000.0));
    let mut rx = coord.subscribe();

    let outcome = coord.start_spin_with(plan).unwrap().wait().await.unwrap();
    let events = drain(&mut rx);

    // reel 0 steps at 0, 300, 600 and 900 ms; the last lands after cutoff
    let reel0_steps = events
        .iter()
        .filter(|e| matches!(e.stage, SpinStage::StepCompleted { reel_index: 0, .. }))
        .count();
    assert_eq!(reel0_steps, 4);
    assert!(outcome.elapsed_ms >= 1200.0);
    assert_eq!(coord.in_flight(), 0);

    let snapshot = coord.snapshot();
    assert!(!snapshot.spinning);
    assert!(snapshot.reels.iter().all(|r| r.state == ReelState::Idle));
    assert_eq!(snapshot.last_outcome, Some(outcome));
}

#[tokio::test(start_paused = true)]
async fn test_seeded_spins_are_reproducible() {
    let run = |seed| async move {
        let coord = SpinCoordinator::new(
            settings(4),
            pool(8),
            Box::new(SeededRandomSource::new(seed)),
        )
        .unwrap();
        coord.start_spin().unwrap().wait().await.unwrap().tops
    };
    assert_eq!(run(42).await, run(42).await);
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT ORDERING
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_event_order() {
    let coord = scripted(3, 4, vec![2, 0, 3, 1]);
    let mut rx = coord.subscribe();

    let outcome = coord.start_spin().unwrap().wait().await.unwrap();
    let events = drain(&mut rx);

    assert_eq!(events.first().map(SpinEvent::type_name), Some("spin_start"));
    assert_eq!(events.last().map(SpinEvent::type_name), Some("result_ready"));
    assert!(events.iter().all(|e| e.spin_id == outcome.spin_id));

    let reel_starts = events
        .iter()
        .filter(|e| matches!(e.stage, SpinStage::ReelStart { .. }))
        .count();
    assert_eq!(reel_starts, 3);

    let cutoff = position(&events, "cutoff").unwrap();
    let quiesced = position(&events, "quiesced").unwrap();
    let last_step = events
        .iter()
        .rposition(|e| e.type_name() == "step_completed")
        .unwrap();
    assert!(cutoff < quiesced);
    assert!(last_step < quiesced);

    match &events.last().unwrap().stage {
        SpinStage::ResultReady { tops, message, .. } => {
            assert_eq!(tops, &outcome.tops);
            assert_eq!(message, &outcome.message);
        }
        other => panic!("unexpected final stage {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FORCED STOP
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_stop_all_discards_spin() {
    let coord = scripted(3, 6, vec![5, 4, 3, 2, 1, 0]);
    let mut rx = coord.subscribe();
    let handle = coord.start_spin().unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(coord.is_spinning());

    coord.stop_all();
    assert_eq!(coord.state(), GameState::Idle);
    assert_eq!(coord.in_flight(), 0);
    assert!(handle.wait().await.is_none());

    let events = drain(&mut rx);
    assert_eq!(events.last().map(SpinEvent::type_name), Some("aborted"));
    assert!(position(&events, "result_ready").is_none());
    assert!(coord.last_outcome().is_none());

    let snapshot = coord.snapshot();
    assert!(snapshot.reels.iter().all(|r| r.state == ReelState::Idle && r.progress == 0.0));
}

#[tokio::test(start_paused = true)]
async fn test_new_spin_after_stop() {
    let coord = scripted(2, 4, vec![3]);
    coord.start_spin().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    coord.stop_all();

    let outcome = coord.start_spin().unwrap().wait().await.unwrap();
    assert_eq!(outcome.spin_id, 2);
    assert_eq!(outcome.tops, vec![3, 3]);
    assert_eq!(coord.in_flight(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_empty_pool_start_is_noop() {
    let coord = SpinCoordinator::new(
        settings(3),
        SymbolPool::empty(),
        Box::new(ScriptedRandomSource::constant(0)),
    )
    .unwrap();
    let mut rx = coord.subscribe();

    assert!(coord.start_spin().is_none());
    assert_eq!(coord.state(), GameState::Idle);
    assert!(drain(&mut rx).is_empty());

    coord.set_symbols(pool(3)).unwrap();
    assert!(coord.can_start());
    let events = drain(&mut rx);
    assert!(matches!(events[0].stage, SpinStage::SymbolsChanged { count: 3 }));
}

#[tokio::test(start_paused = true)]
async fn test_apply_settings_busy_and_invalid() {
    let coord = scripted(3, 4, vec![0]);
    let handle = coord.start_spin().unwrap();
    assert_eq!(
        coord.apply_settings(settings(6)),
        Err(CoordinatorError::Busy)
    );
    handle.wait().await.unwrap();

    let mut bad = settings(3);
    bad.spin_intensity = 0.0;
    assert_eq!(
        coord.apply_settings(bad),
        Err(CoordinatorError::Config(ConfigError::SpinIntensity(0.0)))
    );

    let mut rx = coord.subscribe();
    coord.apply_settings(settings(6)).unwrap();
    let events = drain(&mut rx);
    assert!(matches!(
        events[0].stage,
        SpinStage::GridConfigured { columns: 6, rows: 2 }
    ));
    assert_eq!(coord.snapshot().layout.rows[0].len(), 3);
    assert_relative_eq!(coord.probability(), 1.0 - (1.0f64 - 1.0 / 1024.0).powi(2));
}
