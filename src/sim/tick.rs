//! Host tick loop
//!
//! Steps the engine one tick at a time and fires every registered periodic
//! task whose interval divides the new tick. Tasks run to completion between
//! physics steps, in registration order.

use crate::error::{Error, Result};
use crate::persistence::ArtifactStore;

use super::driver::SimulationDriver;
use super::engine::{DriverTask, Engine, Scheduler};

/// A task registered with [`Scheduler::register_periodic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicTask {
    pub interval: u64,
    pub task: DriverTask,
}

/// Summary of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub final_tick: u64,
    pub injected: u32,
    pub exited: usize,
}

/// Single-threaded deterministic host loop around an engine
#[derive(Debug)]
pub struct TickLoop<E> {
    engine: E,
    tasks: Vec<PeriodicTask>,
    tick_limit: Option<u64>,
}

impl<E: Engine> TickLoop<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            tasks: Vec::new(),
            tick_limit: None,
        }
    }

    /// Fail with [`Error::TickLimitExceeded`] if the clock is still running
    /// after `limit` ticks
    pub fn with_tick_limit(mut self, limit: u64) -> Self {
        self.tick_limit = Some(limit);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn tasks(&self) -> &[PeriodicTask] {
        &self.tasks
    }

    /// Advance one tick and run the tasks due on it
    pub fn tick<S: ArtifactStore>(&mut self, driver: &mut SimulationDriver<S>) -> Result<()> {
        self.engine.step();
        let now = self.engine.tick();
        for i in 0..self.tasks.len() {
            let PeriodicTask { interval, task } = self.tasks[i];
            if now % interval == 0 {
                driver.run_task(task, &mut self.engine)?;
            }
        }
        Ok(())
    }

    /// Run until the driver pauses the clock
    pub fn run<S: ArtifactStore>(&mut self, driver: &mut SimulationDriver<S>) -> Result<RunSummary> {
        log::info!(
            "Starting tick loop with {} periodic tasks",
            self.tasks.len()
        );
        while !self.engine.is_paused() {
            if let Some(limit) = self.tick_limit
                && self.engine.tick() >= limit
            {
                return Err(Error::TickLimitExceeded { limit });
            }
            self.tick(driver)?;
        }

        let summary = RunSummary {
            final_tick: self.engine.tick(),
            injected: driver.injected_count(),
            exited: driver.event_log().len(),
        };
        log::info!(
            "Simulation finished at tick {} ({} injected, {} exited)",
            summary.final_tick,
            summary.injected,
            summary.exited
        );
        Ok(summary)
    }

    pub fn into_engine(self) -> E {
        self.engine
    }
}

impl<E> Scheduler for TickLoop<E> {
    fn register_periodic(&mut self, interval_ticks: u64, task: DriverTask) {
        debug_assert!(interval_ticks > 0, "periodic interval must be positive");
        self.tasks.push(PeriodicTask {
            interval: interval_ticks.max(1),
            task,
        });
    }
}
