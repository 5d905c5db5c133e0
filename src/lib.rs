//! Galton board - particle-drop experiment and cumulative histogram animation
//!
//! Core modules:
//! - `sim`: Deterministic simulation driver (injection, exit detection, termination)
//! - `persistence`: Persisted event log and parameter record
//! - `series`: Offline reconstruction of a uniform cumulative frame sequence
//! - `renderer`: Histogram frames and video encoding
//! - `settings`: Experiment and animation configuration

pub mod error;
pub mod persistence;
pub mod renderer;
pub mod series;
pub mod settings;
pub mod sim;

pub use error::{EngineOp, Error, Result};
pub use settings::{AnimationSettings, ExperimentConfig, ResolutionPreset};

/// Experiment configuration defaults
pub mod consts {
    /// Total number of balls dropped through the board
    pub const TOTAL_BALLS: u32 = 1000;
    /// Peg columns (also the number of histogram bins)
    pub const X_RANGE: u32 = 15;
    /// Peg rows
    pub const Y_RANGE: u32 = 10;
    /// Distance between neighbouring pegs
    pub const SPACING: f64 = 1.0;
    /// Radius of the fixed pegs
    pub const R_OBSTACLE: f64 = 0.25;
    /// Radius of the falling balls
    pub const R_BALLS: f64 = 0.1;

    /// Ticks between exit-boundary scans (and snapshots)
    pub const SAMPLE_PERIOD: u64 = 10_000;
    /// Ticks between ball injections
    pub const INJECTION_PERIOD: u64 = 50_000;

    /// Engine timestep (seconds per tick)
    pub const DT: f64 = 1e-5;
    /// Gravitational acceleration along y
    pub const GRAVITY: f64 = -9.81;
    /// Fraction of normal velocity lost on contact
    pub const DAMPING: f64 = 0.3;

    /// Default RNG seed
    pub const SEED: u64 = 0x6a17_0b0a;

    /// Root directory for simulation output
    pub const DATA_DIR: &str = "SIM_DATA";
}

