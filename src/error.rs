//! Error types for the experiment driver and the offline pipeline.
//!
//! Engine errors are absorbed inside the driver; everything else is fatal to
//! the pass that raised it.

use std::path::PathBuf;

use crate::sim::ParticleId;

/// Engine operation that could not be satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOp {
    Spawn,
    Remove,
}

impl std::fmt::Display for EngineOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineOp::Spawn => f.write_str("spawn"),
            EngineOp::Remove => f.write_str("remove"),
        }
    }
}

/// Errors raised by the simulation driver, the artifact store and the
/// animation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value is out of range. Fatal at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The engine could not satisfy a spawn or remove request.
    #[error("engine could not {operation} particle {particle:?}")]
    EngineUnavailable {
        operation: EngineOp,
        particle: Option<ParticleId>,
    },

    /// The termination write failed. The experiment has concluded, so there
    /// is no retry.
    #[error("failed to persist {path}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted arrays are malformed.
    #[error("corrupt event log: {0}")]
    CorruptEventLog(String),

    /// Drawing a histogram frame failed.
    #[error("render failed: {0}")]
    Render(String),

    /// The video encoder rejected a frame or exited unsuccessfully.
    #[error("encoder failed: {0}")]
    Encoder(String),

    /// The host loop ran past its tick limit without the clock pausing.
    #[error("simulation did not terminate within {limit} ticks")]
    TickLimitExceeded { limit: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
