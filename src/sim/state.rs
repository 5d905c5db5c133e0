//! Event log and parameter record
//!
//! Everything the driver persists at termination lives here.

use glam::{DVec2, DVec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::error::{Error, Result};
use crate::settings::ExperimentConfig;

use super::board::Board;

/// Engine-assigned particle handle
pub type ParticleId = u64;

/// A particle crossed the exit boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeletionEvent {
    /// Tick at which the exit scan saw the particle
    pub tick: u64,
    pub position: DVec3,
    /// Originating particle, absent in logs persisted without ids
    pub particle: Option<ParticleId>,
}

impl DeletionEvent {
    pub fn new(tick: u64, position: DVec3, particle: Option<ParticleId>) -> Self {
        Self {
            tick,
            position,
            particle,
        }
    }

    /// Position projected onto the board plane
    #[inline]
    pub fn planar(&self) -> DVec2 {
        self.position.truncate()
    }
}

/// Append-only record of exit events in detection order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<DeletionEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Build a log from already-ordered events, rejecting decreasing ticks.
    pub fn from_events(events: Vec<DeletionEvent>) -> Result<Self> {
        if let Some(i) = events.windows(2).position(|w| w[1].tick < w[0].tick) {
            return Err(Error::CorruptEventLog(format!(
                "tick decreases at row {}: {} after {}",
                i + 1,
                events[i + 1].tick,
                events[i].tick
            )));
        }
        Ok(Self { events })
    }

    pub fn push(&mut self, event: DeletionEvent) {
        debug_assert!(
            self.events.last().is_none_or(|last| last.tick <= event.tick),
            "event ticks must be non-decreasing"
        );
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[DeletionEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeletionEvent> {
        self.events.iter()
    }

    pub fn last_tick(&self) -> Option<u64> {
        self.events.last().map(|e| e.tick)
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a DeletionEvent;
    type IntoIter = std::slice::Iter<'a, DeletionEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Number of scalars in the persisted parameter vector
pub const SIM_PARAMS_LEN: usize = 10;

/// Parameter record written once at termination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub x_range: u32,
    pub y_range: u32,
    pub spacing: f64,
    pub r_obstacle: f64,
    pub r_balls: f64,
    pub total_balls: u32,
    pub x_max: f64,
    pub x_min: f64,
    pub sample_period: u64,
    pub final_tick: u64,
}

impl SimParams {
    /// Record for a run of `config` on `board` that ended at `final_tick`
    pub fn new(config: &ExperimentConfig, board: &Board, final_tick: u64) -> Self {
        Self {
            x_range: config.x_range,
            y_range: config.y_range,
            spacing: config.spacing,
            r_obstacle: config.r_obstacle,
            r_balls: config.r_balls,
            total_balls: config.total_balls,
            x_max: board.x_max(),
            x_min: board.x_min(),
            sample_period: config.sample_period,
            final_tick,
        }
    }

    /// Fixed-order scalar vector
    pub fn to_array(&self) -> [f64; SIM_PARAMS_LEN] {
        [
            self.x_range as f64,
            self.y_range as f64,
            self.spacing,
            self.r_obstacle,
            self.r_balls,
            self.total_balls as f64,
            self.x_max,
            self.x_min,
            self.sample_period as f64,
            self.final_tick as f64,
        ]
    }

    /// Parse the fixed-order scalar vector
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() != SIM_PARAMS_LEN {
            return Err(Error::CorruptEventLog(format!(
                "sim parameters have {} values, expected {SIM_PARAMS_LEN}",
                values.len()
            )));
        }
        let params = Self {
            x_range: as_u32(values[0], "X_RANGE")?,
            y_range: as_u32(values[1], "Y_RANGE")?,
            spacing: values[2],
            r_obstacle: values[3],
            r_balls: values[4],
            total_balls: as_u32(values[5], "TOTAL_BALLS")?,
            x_max: values[6],
            x_min: values[7],
            sample_period: as_count(values[8], "SAMPLE_PERIOD")?,
            final_tick: as_count(values[9], "final_tick")?,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check the values the reconstruction depends on
    pub fn validate(&self) -> Result<()> {
        if self.sample_period == 0 {
            return Err(Error::CorruptEventLog(
                "SAMPLE_PERIOD must be positive".to_string(),
            ));
        }
        if self.x_range == 0 {
            return Err(Error::CorruptEventLog("X_RANGE must be positive".to_string()));
        }
        if !(self.x_min.is_finite() && self.x_max.is_finite() && self.x_min < self.x_max) {
            return Err(Error::CorruptEventLog(format!(
                "invalid horizontal extent [{}, {}]",
                self.x_min, self.x_max
            )));
        }
        Ok(())
    }

    /// Number of uniformly spaced frames from tick 0 through `final_tick`
    pub fn frame_count(&self) -> usize {
        (self.final_tick / self.sample_period) as usize + 1
    }
}

/// Non-negative integral value stored as a float
pub(crate) fn as_count(value: f64, name: &str) -> Result<u64> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Ok(value as u64)
    } else {
        Err(Error::CorruptEventLog(format!(
            "{name} must be a non-negative integer, got {value}"
        )))
    }
}

fn as_u32(value: f64, name: &str) -> Result<u32> {
    u32::try_from(as_count(value, name)?).map_err(|_| {
        Error::CorruptEventLog(format!("{name} does not fit in 32 bits, got {value}"))
    })
}

/// Seed from which the injection RNG is rebuilt
#[derive(Debug, Clone)]
pub struct RngState {
    pub seed: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed)
    }
}
