//! Deterministic simulation module
//!
//! The driver logic lives here together with the engine interface it depends
//! on and a built-in engine to run it against:
//! - Fixed tick cadence for injection and exit scans
//! - Seeded RNG only
//! - Engine iteration order is the only ordering between particles
//! - No rendering or platform dependencies

pub mod board;
pub mod driver;
pub mod engine;
pub mod physics;
pub mod sdf;
pub mod state;
pub mod tick;

pub use board::Board;
pub use driver::SimulationDriver;
pub use engine::{DriverTask, Engine, LockedAxes, Scheduler, SpawnRequest};
pub use physics::PegBoardEngine;
pub use state::{DeletionEvent, EventLog, ParticleId, RngState, SIM_PARAMS_LEN, SimParams};
pub use tick::{PeriodicTask, RunSummary, TickLoop};
