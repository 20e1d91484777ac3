//! Spin coordinator: runs one spin cycle across every reel
//!
//! ```text
//! start_spin ──► reel tasks (staggered) ──► step loop ─┐
//!      │                                               │ guards
//!      └──► driver: sleep(total) ─► Cutoff ─► join reels ─► counter == 0
//!                                                  ─► evaluate ─► ResultReady
//! ```
//!
//! All tasks run on the caller's tokio runtime. Shared state sits in a
//! `GameSession`; locks are taken in the order
//! `state → spin → grid → rng` and never held across an `.await`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dc_core::{
    ConfigError, DefaultProbabilityModel, ProbabilityModel, RandomSource, StepFailure,
    WinEvaluator, WinVerdict, format_probability,
};
use dc_stage::{SpinEvent, SpinStage};
use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;

use crate::activity::{ActivityCounter, ActivityGuard};
use crate::config::{GameSettings, GridLayout};
use crate::error::CoordinatorError;
use crate::grid::{ReelGrid, ReelView};
use crate::reel::{ReelStrip, StepOutcome, StepTicket};
use crate::symbols::{SymbolHandle, SymbolPool};
use crate::timing::{QUIESCENCE_POLL_MS, SpinTiming};

/// Buffered events per subscriber before it starts lagging
const EVENT_CAPACITY: usize = 1024;

/// Overall game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    Idle,
    Spinning,
}

/// Progress of the spin in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpinPhase {
    /// Reels may begin new steps
    Stepping,
    /// Cutoff passed; waiting for in-flight steps to land
    Settling,
}

/// Parameters of one spin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpinPlan {
    /// Reels to spin; must match the grid
    pub columns: usize,
    /// Window length; the grid is rebuilt when it differs
    pub items_per_column: usize,
    pub timing: SpinTiming,
}

impl SpinPlan {
    pub fn new(columns: usize, items_per_column: usize, timing: SpinTiming) -> Self {
        Self {
            columns,
            items_per_column,
            timing,
        }
    }

    pub fn from_settings(settings: &GameSettings) -> Self {
        Self::new(
            settings.columns as usize,
            settings.items_per_column as usize,
            SpinTiming::from_settings(settings),
        )
    }
}

/// Published result of a settled spin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub spin_id: u64,
    pub verdict: WinVerdict,
    /// Text for the result label
    pub message: String,
    /// Top index of every reel
    pub tops: Vec<usize>,
    /// Symbols behind `tops`
    pub symbols: Vec<SymbolHandle>,
    /// Win probability of the configuration that produced this spin
    pub probability: f64,
    /// Time from start command to evaluation (ms)
    pub elapsed_ms: f64,
}

impl SpinOutcome {
    /// `Some(win)` for two or more reels
    pub fn win(&self) -> Option<bool> {
        match self.verdict {
            WinVerdict::Win => Some(true),
            WinVerdict::Lose => Some(false),
            WinVerdict::NotApplicable => None,
        }
    }
}

/// Everything a presentation layer needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub reels: Vec<ReelView>,
    pub layout: GridLayout,
    /// Start control is disabled while this is set
    pub spinning: bool,
    pub phase: Option<SpinPhase>,
    pub probability: f64,
    pub probability_text: String,
    pub last_outcome: Option<SpinOutcome>,
}

/// Transient per-spin state, discarded once the result is published
struct SpinSession {
    id: u64,
    started: Instant,
    phase: SpinPhase,
    /// Start delay of every reel
    delays: Vec<Duration>,
    /// Reel tasks and the driver, for forced aborts
    tasks: Vec<AbortHandle>,
}

impl SpinSession {
    fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

/// Shared state of a running game
struct GameSession {
    settings: Mutex<GameSettings>,
    state: Mutex<GameState>,
    spin: Mutex<Option<SpinSession>>,
    grid: Mutex<ReelGrid>,
    rng: Mutex<Box<dyn RandomSource>>,
    activity: ActivityCounter,
    events: broadcast::Sender<SpinEvent>,
    last_outcome: Mutex<Option<SpinOutcome>>,
    model: Box<dyn ProbabilityModel>,
    evaluator: WinEvaluator,
    spin_counter: AtomicU64,
}

impl GameSession {
    fn send(&self, spin_id: u64, elapsed_ms: f64, stage: SpinStage) {
        // No subscribers is fine
        let _ = self.events.send(SpinEvent::new(stage, spin_id, elapsed_ms));
    }

    fn announce(&self, stage: SpinStage) {
        let _ = self.events.send(SpinEvent::configuration(stage));
    }

    fn emit(&self, spin_id: u64, stage: SpinStage) {
        let elapsed = self
            .spin
            .lock()
            .as_ref()
            .filter(|s| s.id == spin_id)
            .map(SpinSession::elapsed_ms)
            .unwrap_or(0.0);
        self.send(spin_id, elapsed, stage);
    }

    /// Run `f` on a reel only while `spin_id` is still stepping.
    ///
    /// Holding the spin lock keeps a concurrent `stop_all` from slipping in
    /// between the phase check and the reel update.
    fn with_stepping_reel<T>(
        &self,
        spin_id: u64,
        reel_index: usize,
        f: impl FnOnce(&mut ReelStrip, &mut dyn RandomSource) -> Option<T>,
    ) -> Option<T> {
        let spin = self.spin.lock();
        let stepping = spin
            .as_ref()
            .is_some_and(|s| s.id == spin_id && s.phase == SpinPhase::Stepping);
        if !stepping {
            return None;
        }
        let mut grid = self.grid.lock();
        let mut rng = self.rng.lock();
        let reel = grid.reel_mut(reel_index)?;
        f(reel, &mut **rng)
    }

    fn enter_settling(&self, spin_id: u64) -> bool {
        match self.spin.lock().as_mut() {
            Some(spin) if spin.id == spin_id => {
                spin.phase = SpinPhase::Settling;
                true
            }
            _ => false,
        }
    }

    async fn wait_quiescent(&self) {
        let poll = Duration::from_millis(QUIESCENCE_POLL_MS);
        while tokio::time::timeout(poll, self.activity.wait_idle())
            .await
            .is_err()
        {
            log::trace!("Waiting for {} steps to land", self.activity.in_flight());
        }
    }

    /// Evaluate the settled grid and return to idle
    fn publish(&self, spin_id: u64) -> Option<SpinOutcome> {
        let mut state = self.state.lock();
        let mut spin = self.spin.lock();
        if spin.as_ref().map(|s| s.id) != Some(spin_id) {
            return None;
        }

        let (tops, symbols, probability) = {
            let grid = self.grid.lock();
            let tops = grid.tops();
            let symbols = tops
                .iter()
                .filter_map(|&i| grid.active_pool().get(i).cloned())
                .collect::<Vec<_>>();
            (tops, symbols, grid.probability(self.model.as_ref()))
        };

        let verdict = self.evaluator.verdict(&tops);
        let elapsed_ms = spin.as_ref().map(SpinSession::elapsed_ms).unwrap_or(0.0);
        let outcome = SpinOutcome {
            spin_id,
            verdict,
            message: verdict.message().to_string(),
            tops: tops.clone(),
            symbols,
            probability,
            elapsed_ms,
        };

        *spin = None;
        *state = GameState::Idle;
        *self.last_outcome.lock() = Some(outcome.clone());
        drop(spin);
        drop(state);

        log::info!(
            "Spin {} settled after {:.0} ms: tops {:?} -> {:?}",
            spin_id,
            elapsed_ms,
            tops,
            verdict
        );
        self.send(
            spin_id,
            elapsed_ms,
            SpinStage::ResultReady {
                win: outcome.win(),
                message: outcome.message.clone(),
                tops,
            },
        );
        Some(outcome)
    }
}

/// Handle to a started spin
pub struct SpinHandle {
    id: u64,
    join: JoinHandle<Option<SpinOutcome>>,
}

impl SpinHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Resolve with the outcome, or `None` if the spin was aborted
    pub async fn wait(self) -> Option<SpinOutcome> {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_panic() {
                    log::error!("Spin {} driver panicked: {}", self.id, e);
                }
                None
            }
        }
    }
}

/// Orchestrates spins over a reel grid
pub struct SpinCoordinator {
    session: Arc<GameSession>,
}

impl SpinCoordinator {
    /// Create with the default probability model
    pub fn new(
        settings: GameSettings,
        pool: SymbolPool,
        rng: Box<dyn RandomSource>,
    ) -> Result<Self, ConfigError> {
        Self::with_model(settings, pool, rng, Box::new(DefaultProbabilityModel))
    }

    pub fn with_model(
        settings: GameSettings,
        pool: SymbolPool,
        mut rng: Box<dyn RandomSource>,
        model: Box<dyn ProbabilityModel>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let grid = ReelGrid::new(settings.grid_config()?, pool, &mut *rng);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            session: Arc::new(GameSession {
                settings: Mutex::new(settings),
                state: Mutex::new(GameState::Idle),
                spin: Mutex::new(None),
                grid: Mutex::new(grid),
                rng: Mutex::new(rng),
                activity: ActivityCounter::new(),
                events,
                last_outcome: Mutex::new(None),
                model,
                evaluator: WinEvaluator::new(),
                spin_counter: AtomicU64::new(0),
            }),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Validate and apply settings, rebuilding the grid.
    ///
    /// Rejected settings leave everything unchanged.
    pub fn apply_settings(&self, settings: GameSettings) -> Result<(), CoordinatorError> {
        settings.validate()?;
        let config = settings.grid_config()?;

        let state = self.session.state.lock();
        if *state != GameState::Idle {
            return Err(CoordinatorError::Busy);
        }
        {
            let mut grid = self.session.grid.lock();
            let mut rng = self.session.rng.lock();
            grid.configure(config, &mut **rng);
        }
        *self.session.settings.lock() = settings;
        drop(state);

        log::info!(
            "Grid configured: {} columns, {} rows",
            config.columns(),
            config.rows()
        );
        self.session.announce(SpinStage::GridConfigured {
            columns: config.columns(),
            rows: config.rows(),
        });
        Ok(())
    }

    /// Replace the symbol pool. An empty pool disables starting.
    pub fn set_symbols(&self, pool: SymbolPool) -> Result<(), CoordinatorError> {
        let state = self.session.state.lock();
        if *state != GameState::Idle {
            return Err(CoordinatorError::Busy);
        }
        let count = {
            let mut grid = self.session.grid.lock();
            let mut rng = self.session.rng.lock();
            grid.set_symbols(pool, &mut **rng);
            grid.symbol_count()
        };
        drop(state);

        self.session.announce(SpinStage::SymbolsChanged { count });
        Ok(())
    }

    pub fn settings(&self) -> GameSettings {
        self.session.settings.lock().clone()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn state(&self) -> GameState {
        *self.session.state.lock()
    }

    pub fn is_spinning(&self) -> bool {
        self.state() == GameState::Spinning
    }

    /// Idle with at least one symbol
    pub fn can_start(&self) -> bool {
        let state = self.session.state.lock();
        *state == GameState::Idle && self.session.grid.lock().symbol_count() > 0
    }

    pub fn phase(&self) -> Option<SpinPhase> {
        self.session.spin.lock().as_ref().map(|s| s.phase)
    }

    /// Start delays of the spin in flight
    pub fn stagger_delays(&self) -> Vec<Duration> {
        self.session
            .spin
            .lock()
            .as_ref()
            .map(|s| s.delays.clone())
            .unwrap_or_default()
    }

    pub fn probability(&self) -> f64 {
        self.session
            .grid
            .lock()
            .probability(self.session.model.as_ref())
    }

    /// Steps in flight across all reels
    pub fn in_flight(&self) -> usize {
        self.session.activity.in_flight()
    }

    /// Top index of every reel
    pub fn tops(&self) -> Vec<usize> {
        self.session.grid.lock().tops()
    }

    pub fn last_outcome(&self) -> Option<SpinOutcome> {
        self.session.last_outcome.lock().clone()
    }

    pub fn snapshot(&self) -> GridSnapshot {
        let state = self.state();
        let phase = self.phase();
        let (reels, layout, probability) = {
            let grid = self.session.grid.lock();
            (
                grid.views(),
                grid.layout(),
                grid.probability(self.session.model.as_ref()),
            )
        };
        GridSnapshot {
            reels,
            layout,
            spinning: state == GameState::Spinning,
            phase,
            probability,
            probability_text: format_probability(probability),
            last_outcome: self.last_outcome(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpinEvent> {
        self.session.events.subscribe()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SPIN CONTROL
    // ═══════════════════════════════════════════════════════════════════════════

    /// Start a spin with the current settings.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_spin(&self) -> Option<SpinHandle> {
        let plan = SpinPlan::from_settings(&self.settings());
        self.start_spin_with(plan)
    }

    /// Start a spin. Returns `None` (and changes nothing) unless idle with
    /// a non-empty symbol pool and the plan covers every reel of the grid
    /// with finite, positive timing.
    pub fn start_spin_with(&self, plan: SpinPlan) -> Option<SpinHandle> {
        let session = &self.session;
        let mut state = session.state.lock();
        if *state != GameState::Idle {
            log::debug!("Start ignored: spin in progress");
            return None;
        }

        let delays = {
            let mut grid = session.grid.lock();
            if grid.symbol_count() == 0 {
                log::debug!("Start ignored: no symbols loaded");
                return None;
            }
            if plan.columns == 0 || plan.columns != grid.len() {
                log::warn!(
                    "Spin plan rejected: {} columns on a {}-column grid",
                    plan.columns,
                    grid.len()
                );
                return None;
            }
            if !plan.timing.is_valid() {
                log::warn!("Spin plan rejected: invalid timing {:?}", plan.timing);
                return None;
            }
            let items = plan.items_per_column as u32;
            if items != grid.config().items_per_column() {
                match grid.config().with_items_per_column(items) {
                    Ok(config) => {
                        let mut rng = session.rng.lock();
                        grid.configure(config, &mut **rng);
                    }
                    Err(e) => {
                        log::warn!("Spin plan rejected: {e}");
                        return None;
                    }
                }
            }
            plan.timing.stagger_delays(plan.columns)
        };

        let spin_id = session.spin_counter.fetch_add(1, Ordering::Relaxed) + 1;
        *state = GameState::Spinning;
        session.activity.reset();
        // Registered before spawning so reel tasks see a stepping session
        *session.spin.lock() = Some(SpinSession {
            id: spin_id,
            started: Instant::now(),
            phase: SpinPhase::Stepping,
            delays: delays.clone(),
            tasks: Vec::with_capacity(delays.len() + 1),
        });

        let reel_tasks: Vec<JoinHandle<()>> = delays
            .iter()
            .enumerate()
            .map(|(reel_index, &delay)| {
                tokio::spawn(run_reel(
                    Arc::clone(session),
                    spin_id,
                    reel_index,
                    delay,
                    plan.timing,
                ))
            })
            .collect();
        let mut tasks: Vec<AbortHandle> = reel_tasks.iter().map(JoinHandle::abort_handle).collect();

        let driver = tokio::spawn(run_spin(Arc::clone(session), spin_id, plan.timing, reel_tasks));
        tasks.push(driver.abort_handle());
        if let Some(spin) = session.spin.lock().as_mut() {
            spin.tasks = tasks;
        }
        drop(state);

        log::info!(
            "Spin {} started: {} reels, step {:.0} ms, cutoff {:.0} ms",
            spin_id,
            delays.len(),
            plan.timing.step_duration_ms,
            plan.timing.total_duration_ms
        );
        session.emit(
            spin_id,
            SpinStage::SpinStart {
                columns: delays.len() as u32,
                total_duration_ms: plan.timing.total_duration_ms as u64,
            },
        );

        Some(SpinHandle {
            id: spin_id,
            join: driver,
        })
    }

    /// Halt every reel immediately without evaluating anything.
    ///
    /// Safe at any time; leaves the game idle with no step counted.
    pub fn stop_all(&self) {
        let session = &self.session;
        let mut state = session.state.lock();
        let aborted = session.spin.lock().take();
        if let Some(spin) = &aborted {
            for task in &spin.tasks {
                task.abort();
            }
        }
        session.grid.lock().stop_all();
        session.activity.reset();
        *state = GameState::Idle;
        drop(state);

        if let Some(spin) = aborted {
            log::info!("Spin {} aborted", spin.id);
            session.send(spin.id, spin.elapsed_ms(), SpinStage::Aborted);
        }
    }
}

impl Drop for SpinCoordinator {
    fn drop(&mut self) {
        if let Some(spin) = self.session.spin.lock().take() {
            for task in &spin.tasks {
                task.abort();
            }
        }
    }
}

/// Drive one spin: cutoff, join, quiescence, evaluation
async fn run_spin(
    session: Arc<GameSession>,
    spin_id: u64,
    timing: SpinTiming,
    reel_tasks: Vec<JoinHandle<()>>,
) -> Option<SpinOutcome> {
    tokio::time::sleep(timing.total_duration()).await;

    if !session.enter_settling(spin_id) {
        return None;
    }
    session.emit(spin_id, SpinStage::Cutoff);

    for result in join_all(reel_tasks).await {
        if let Err(e) = result {
            if e.is_panic() {
                log::error!("Reel task of spin {} panicked: {}", spin_id, e);
            }
        }
    }

    session.wait_quiescent().await;
    session.emit(spin_id, SpinStage::Quiesced);

    session.publish(spin_id)
}

/// One reel's step loop
async fn run_reel(
    session: Arc<GameSession>,
    spin_id: u64,
    reel_index: usize,
    delay: Duration,
    timing: SpinTiming,
) {
    tokio::time::sleep(delay).await;

    let started = session
        .with_stepping_reel(spin_id, reel_index, |reel, _| Some(reel.start()))
        .unwrap_or(false);
    if !started {
        return;
    }
    session.emit(spin_id, SpinStage::ReelStart { reel_index });

    while let Some(step) = begin_step(&session, spin_id, reel_index, &timing) {
        let half = step.duration / 2;
        tokio::time::sleep(half).await;
        {
            let mut grid = session.grid.lock();
            if let Some(reel) = grid.reel_mut(reel_index) {
                reel.set_progress(0.5);
            }
        }
        tokio::time::sleep(step.duration - half).await;

        let result = {
            let mut grid = session.grid.lock();
            match grid.reel_mut(reel_index) {
                Some(reel) => reel.complete_step(step.ticket),
                None => Err(StepFailure::UnknownReel(reel_index)),
            }
        };

        let discarded = match result {
            Ok(Some(outcome)) => {
                on_step_completed(&session, spin_id, outcome);
                false
            }
            Ok(None) => true,
            Err(failure) => {
                log::warn!("Reel {} step failed: {}", reel_index, failure);
                session.emit(
                    spin_id,
                    SpinStage::StepFailed {
                        reel_index,
                        reason: failure.to_string(),
                    },
                );
                false
            }
        };

        // Step fully landed (or was discarded): release its count
        drop(step);
        if discarded {
            return;
        }
    }

    let mut grid = session.grid.lock();
    if let Some(reel) = grid.reel_mut(reel_index) {
        reel.finish();
    }
}

/// A step in flight, counted on both the reel and the global counter
struct InFlightStep {
    ticket: StepTicket,
    duration: Duration,
    _reel_guard: ActivityGuard,
    _global_guard: ActivityGuard,
}

fn begin_step(
    session: &GameSession,
    spin_id: u64,
    reel_index: usize,
    timing: &SpinTiming,
) -> Option<InFlightStep> {
    session.with_stepping_reel(spin_id, reel_index, |reel, rng| {
        let global = session.activity.begin();
        let (ticket, reel_guard) = reel.begin_step(rng)?;
        Some(InFlightStep {
            ticket,
            duration: timing.step_duration(rng),
            _reel_guard: reel_guard,
            _global_guard: global,
        })
    })
}

fn on_step_completed(session: &GameSession, spin_id: u64, outcome: StepOutcome) {
    log::debug!(
        "Reel {} stepped: new index {}, top {}",
        outcome.reel_index,
        outcome.incoming,
        outcome.top
    );
    session.emit(
        spin_id,
        SpinStage::StepCompleted {
            reel_index: outcome.reel_index,
            top: outcome.top,
            incoming: outcome.incoming,
        },
    );
}
