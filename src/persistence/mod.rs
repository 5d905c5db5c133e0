//! Persisted experiment artifacts
//!
//! Features:
//! - Event log and parameter vector written once at termination
//! - Atomic writes (tmp → final name)
//! - Corruption detection on load, before any frame is built
//! - Optional per-period particle snapshots

pub mod artifact;
pub mod snapshot;

pub use artifact::ArtifactDir;
pub use snapshot::SnapshotRecorder;

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::sim::{EventLog, SimParams};

/// Durable destination for the sealed event log
pub trait ArtifactStore {
    fn persist(&mut self, log: &EventLog, params: &SimParams) -> Result<()>;
}

/// In-memory store that keeps every persisted record
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    persisted: Vec<(EventLog, SimParams)>,
    fail: bool,
}

impl MemoryStore {
    /// Store whose writes always fail
    pub fn failing() -> Self {
        Self {
            persisted: Vec::new(),
            fail: true,
        }
    }

    pub fn persist_calls(&self) -> usize {
        self.persisted.len()
    }

    pub fn last(&self) -> Option<&(EventLog, SimParams)> {
        self.persisted.last()
    }
}

impl ArtifactStore for MemoryStore {
    fn persist(&mut self, log: &EventLog, params: &SimParams) -> Result<()> {
        if self.fail {
            return Err(Error::PersistenceFailure {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::other("store configured to fail"),
            });
        }
        self.persisted.push((log.clone(), *params));
        Ok(())
    }
}
