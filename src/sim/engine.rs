//! Host engine interface
//!
//! The driver never owns particle state. It reaches the physics engine only
//! through [`Engine`] and is wired into the tick loop through [`Scheduler`].

use glam::DVec3;

use crate::error::Result;

use super::state::ParticleId;

/// Degrees of freedom held fixed for a spawned particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockedAxes {
    pub translate_x: bool,
    pub translate_y: bool,
    pub translate_z: bool,
    pub rotate_x: bool,
    pub rotate_y: bool,
    pub rotate_z: bool,
}

impl LockedAxes {
    /// Motion confined to the board plane: no z translation, no rotation
    /// about the in-plane axes.
    pub const DROP_PLANE: Self = Self {
        translate_x: false,
        translate_y: false,
        translate_z: true,
        rotate_x: true,
        rotate_y: true,
        rotate_z: false,
    };
}

/// Request to place one particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    pub position: DVec3,
    pub locked: LockedAxes,
}

/// Physics engine collaboration surface
pub trait Engine {
    /// Place a particle and return its handle
    fn spawn(&mut self, request: SpawnRequest) -> Result<ParticleId>;

    /// Handles and positions of all active particles, in engine order
    fn particles(&self) -> Vec<(ParticleId, DVec3)>;

    /// Remove a particle by handle
    fn remove(&mut self, id: ParticleId) -> Result<()>;

    /// Halt the clock; no further steps are taken
    fn pause_clock(&mut self);

    fn is_paused(&self) -> bool;

    /// Current tick
    fn tick(&self) -> u64;

    /// Advance physics by one timestep and the clock by one tick
    fn step(&mut self);
}

/// Periodic work the driver asks the host to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverTask {
    InjectParticle,
    ScanExitBoundary,
    RecordSnapshot,
}

/// Capability to run a task every `interval_ticks` ticks
pub trait Scheduler {
    fn register_periodic(&mut self, interval_ticks: u64, task: DriverTask);
}
