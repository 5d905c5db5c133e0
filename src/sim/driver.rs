//! Simulation driver
//!
//! Injects balls on a fixed cadence, logs and removes balls that cross the
//! exit boundary, and persists the log exactly once when every ball has been
//! dropped and removed.

use std::collections::HashSet;

use glam::DVec3;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::error::Result;
use crate::persistence::{ArtifactStore, SnapshotRecorder};
use crate::settings::ExperimentConfig;

use super::board::Board;
use super::engine::{DriverTask, Engine, LockedAxes, Scheduler, SpawnRequest};
use super::state::{DeletionEvent, EventLog, ParticleId, RngState, SimParams};

/// Driver state owned by the tick-callback context
#[derive(Debug)]
pub struct SimulationDriver<S> {
    config: ExperimentConfig,
    board: Board,
    rng: Pcg32,
    injected_count: u32,
    log: EventLog,
    /// Particles already written to the log; a failed removal must not log twice
    logged: HashSet<ParticleId>,
    terminated: bool,
    store: S,
    snapshots: Option<SnapshotRecorder>,
}

impl<S: ArtifactStore> SimulationDriver<S> {
    pub fn new(config: ExperimentConfig, board: Board, store: S) -> Result<Self> {
        config.validate()?;
        let rng = RngState::new(config.seed).to_rng();
        Ok(Self {
            config,
            board,
            rng,
            injected_count: 0,
            log: EventLog::new(),
            logged: HashSet::new(),
            terminated: false,
            store,
            snapshots: None,
        })
    }

    /// Record active particle positions every sample period
    pub fn with_snapshots(mut self, recorder: SnapshotRecorder) -> Self {
        self.snapshots = Some(recorder);
        self
    }

    /// Register the periodic tasks with the host
    pub fn install(&self, scheduler: &mut impl Scheduler) {
        scheduler.register_periodic(self.config.injection_period, DriverTask::InjectParticle);
        scheduler.register_periodic(self.config.sample_period, DriverTask::ScanExitBoundary);
        if self.snapshots.is_some() {
            scheduler.register_periodic(self.config.sample_period, DriverTask::RecordSnapshot);
        }
    }

    /// Dispatch a scheduled task
    pub fn run_task<E: Engine>(&mut self, task: DriverTask, engine: &mut E) -> Result<()> {
        match task {
            DriverTask::InjectParticle => self.inject_particle(engine),
            DriverTask::ScanExitBoundary => self.scan_exit_boundary(engine),
            DriverTask::RecordSnapshot => {
                if let Some(recorder) = &mut self.snapshots {
                    recorder.record(engine.tick(), &engine.particles());
                }
                Ok(())
            }
        }
    }

    /// Drop one ball through the aperture, or re-check termination once all
    /// balls are in play.
    pub fn inject_particle<E: Engine>(&mut self, engine: &mut E) -> Result<()> {
        if self.injected_count >= self.config.total_balls {
            self.check_termination(engine)?;
            return Ok(());
        }

        let half = self.board.aperture_half_width();
        let mid = self.board.mid_x();
        let x = self.rng.random_range(mid - half..mid + half);
        let request = SpawnRequest {
            position: DVec3::new(x, self.board.drop_height(), 0.0),
            locked: LockedAxes::DROP_PLANE,
        };

        match engine.spawn(request) {
            Ok(id) => {
                self.injected_count += 1;
                log::debug!(
                    "tick {}: injected particle {} at x={:.4} ({}/{})",
                    engine.tick(),
                    id,
                    x,
                    self.injected_count,
                    self.config.total_balls
                );
            }
            Err(e) => log::warn!("tick {}: {}; injection skipped", engine.tick(), e),
        }
        Ok(())
    }

    /// Log and remove every particle below the exit threshold
    pub fn scan_exit_boundary<E: Engine>(&mut self, engine: &mut E) -> Result<()> {
        let tick = engine.tick();
        let threshold = self.board.exit_threshold();

        for (id, position) in engine.particles() {
            if position.y >= threshold {
                continue;
            }
            if self.logged.insert(id) {
                self.log.push(DeletionEvent::new(tick, position, Some(id)));
                log::debug!("tick {tick}: particle {id} exited at x={:.4}", position.x);
            }
            if let Err(e) = engine.remove(id) {
                log::warn!("tick {tick}: {e}; will retry on next scan");
            }
        }

        self.check_termination(engine)?;
        Ok(())
    }

    /// Pause the clock and persist once every ball is accounted for.
    ///
    /// Returns `true` on the call that terminated the run.
    pub fn check_termination<E: Engine>(&mut self, engine: &mut E) -> Result<bool> {
        let total = self.config.total_balls as usize;
        if self.terminated || self.log.len() != self.injected_count as usize || self.log.len() != total {
            return Ok(false);
        }

        self.terminated = true;
        engine.pause_clock();
        let params = SimParams::new(&self.config, &self.board, engine.tick());
        log::info!(
            "All {} particles exited by tick {}; persisting event log",
            total,
            params.final_tick
        );
        self.store.persist(&self.log, &params)?;
        Ok(true)
    }

    pub fn injected_count(&self) -> u32 {
        self.injected_count
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineOp, Error};
    use crate::persistence::MemoryStore;

    /// Engine that moves every particle straight to a scripted height
    #[derive(Default)]
    struct ScriptedEngine {
        particles: Vec<(ParticleId, DVec3)>,
        next_id: ParticleId,
        tick: u64,
        paused: bool,
        pause_calls: u32,
        fail_spawns: u32,
        fail_removals: u32,
    }

    impl ScriptedEngine {
        fn drop_all_below(&mut self, y: f64) {
            for (_, pos) in &mut self.particles {
                pos.y = y;
            }
        }
    }

    impl Engine for ScriptedEngine {
        fn spawn(&mut self, request: SpawnRequest) -> Result<ParticleId> {
            if self.fail_spawns > 0 {
                self.fail_spawns -= 1;
                return Err(Error::EngineUnavailable {
                    operation: EngineOp::Spawn,
                    particle: None,
                });
            }
            self.next_id += 1;
            self.particles.push((self.next_id, request.position));
            Ok(self.next_id)
        }

        fn particles(&self) -> Vec<(ParticleId, DVec3)> {
            self.particles.clone()
        }

        fn remove(&mut self, id: ParticleId) -> Result<()> {
            if self.fail_removals > 0 {
                self.fail_removals -= 1;
                return Err(Error::EngineUnavailable {
                    operation: EngineOp::Remove,
                    particle: Some(id),
                });
            }
            self.particles.retain(|(pid, _)| *pid != id);
            Ok(())
        }

        fn pause_clock(&mut self) {
            self.paused = true;
            self.pause_calls += 1;
        }

        fn is_paused(&self) -> bool {
            self.paused
        }

        fn tick(&self) -> u64 {
            self.tick
        }

        fn step(&mut self) {
            self.tick += 1;
        }
    }

    fn config(total_balls: u32) -> ExperimentConfig {
        ExperimentConfig {
            total_balls,
            ..Default::default()
        }
    }

    fn driver(total_balls: u32) -> SimulationDriver<MemoryStore> {
        let config = config(total_balls);
        let board = Board::new(&config);
        SimulationDriver::new(config, board, MemoryStore::default()).unwrap()
    }

    #[test]
    fn test_injection_stops_at_cap() {
        let mut driver = driver(5);
        let mut engine = ScriptedEngine::default();
        for _ in 0..12 {
            driver.inject_particle(&mut engine).unwrap();
        }
        assert_eq!(driver.injected_count(), 5);
        assert_eq!(engine.particles.len(), 5);
        assert!(!driver.is_terminated());
    }

    #[test]
    fn test_spawns_inside_aperture_on_drop_plane() {
        let mut driver = driver(50);
        let mut engine = ScriptedEngine::default();
        for _ in 0..50 {
            driver.inject_particle(&mut engine).unwrap();
        }
        let board = driver.board();
        for (_, pos) in &engine.particles {
            assert!((pos.x - board.mid_x()).abs() <= board.aperture_half_width());
            assert_eq!(pos.y, board.drop_height());
            assert_eq!(pos.z, 0.0);
        }
    }

    #[test]
    fn test_terminates_exactly_once_after_all_exit() {
        let mut driver = driver(5);
        let mut engine = ScriptedEngine::default();
        for _ in 0..5 {
            driver.inject_particle(&mut engine).unwrap();
        }
        engine.tick = 40_000;
        engine.drop_all_below(-20.0);
        driver.scan_exit_boundary(&mut engine).unwrap();

        assert!(driver.is_terminated());
        assert_eq!(driver.event_log().len(), 5);
        assert_eq!(driver.store().persist_calls(), 1);
        assert_eq!(engine.pause_calls, 1);

        // Further callbacks never persist again
        driver.inject_particle(&mut engine).unwrap();
        driver.scan_exit_boundary(&mut engine).unwrap();
        assert_eq!(driver.store().persist_calls(), 1);

        let (log, params) = driver.store().last().unwrap();
        assert_eq!(log.len(), 5);
        assert_eq!(params.final_tick, 40_000);
        assert_eq!(params.total_balls, 5);
    }

    #[test]
    fn test_no_termination_before_all_injected() {
        let mut driver = driver(3);
        let mut engine = ScriptedEngine::default();
        driver.inject_particle(&mut engine).unwrap();
        driver.inject_particle(&mut engine).unwrap();
        engine.drop_all_below(-20.0);
        driver.scan_exit_boundary(&mut engine).unwrap();

        assert_eq!(driver.event_log().len(), 2);
        assert!(!driver.is_terminated());
        assert_eq!(driver.store().persist_calls(), 0);
        assert!(!engine.paused);
    }

    #[test]
    fn test_same_scan_events_share_tick() {
        let mut driver = driver(3);
        let mut engine = ScriptedEngine::default();
        for _ in 0..3 {
            driver.inject_particle(&mut engine).unwrap();
        }
        engine.tick = 10_000;
        engine.drop_all_below(-10.0);
        driver.scan_exit_boundary(&mut engine).unwrap();

        let ticks: Vec<u64> = driver.event_log().iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![10_000; 3]);
    }

    #[test]
    fn test_particles_above_threshold_are_kept() {
        let mut driver = driver(2);
        let mut engine = ScriptedEngine::default();
        driver.inject_particle(&mut engine).unwrap();
        // Exactly on the threshold is not below it
        engine.drop_all_below(driver.board().exit_threshold());
        driver.scan_exit_boundary(&mut engine).unwrap();
        assert!(driver.event_log().is_empty());
        assert_eq!(engine.particles.len(), 1);
    }

    #[test]
    fn test_failed_spawn_is_absorbed_and_not_counted() {
        let mut driver = driver(2);
        let mut engine = ScriptedEngine {
            fail_spawns: 1,
            ..Default::default()
        };
        driver.inject_particle(&mut engine).unwrap();
        assert_eq!(driver.injected_count(), 0);
        driver.inject_particle(&mut engine).unwrap();
        assert_eq!(driver.injected_count(), 1);
    }

    #[test]
    fn test_failed_removal_is_not_logged_twice() {
        let mut driver = driver(1);
        let mut engine = ScriptedEngine {
            fail_removals: 1,
            ..Default::default()
        };
        driver.inject_particle(&mut engine).unwrap();
        engine.drop_all_below(-20.0);

        engine.tick = 10_000;
        driver.scan_exit_boundary(&mut engine).unwrap();
        assert_eq!(engine.particles.len(), 1);
        assert_eq!(driver.event_log().len(), 1);

        engine.tick = 20_000;
        driver.scan_exit_boundary(&mut engine).unwrap();
        assert!(engine.particles.is_empty());
        assert_eq!(driver.event_log().len(), 1);
        assert_eq!(driver.event_log().events()[0].tick, 10_000);
        assert_eq!(driver.store().persist_calls(), 1);
    }

    #[test]
    fn test_persistence_failure_is_fatal() {
        let config = config(1);
        let board = Board::new(&config);
        let store = MemoryStore::failing();
        let mut driver = SimulationDriver::new(config, board, store).unwrap();
        let mut engine = ScriptedEngine::default();
        driver.inject_particle(&mut engine).unwrap();
        engine.drop_all_below(-20.0);

        let err = driver.scan_exit_boundary(&mut engine).unwrap_err();
        assert!(matches!(err, Error::PersistenceFailure { .. }));
        assert!(engine.paused);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = config(0);
        let board = Board::new(&config);
        assert!(matches!(
            SimulationDriver::new(config, board, MemoryStore::default()),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_injection_is_deterministic_per_seed() {
        let run = || {
            let mut driver = driver(10);
            let mut engine = ScriptedEngine::default();
            for _ in 0..10 {
                driver.inject_particle(&mut engine).unwrap();
            }
            engine.particles
        };
        assert_eq!(run(), run());
    }
}
