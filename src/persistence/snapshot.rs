//! Periodic particle snapshots
//!
//! Diagnostic output only: a failed write is logged and the run continues.

use std::path::PathBuf;

use glam::DVec3;

use crate::sim::ParticleId;

use super::artifact::write_atomic;

/// Writes `galton_<tick>.json` with `[id, x, y, z]` rows of active particles
#[derive(Debug, Clone)]
pub struct SnapshotRecorder {
    dir: PathBuf,
    written: usize,
}

impl SnapshotRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: 0,
        }
    }

    pub fn snapshot_path(&self, tick: u64) -> PathBuf {
        self.dir.join(format!("galton_{tick}.json"))
    }

    /// Number of snapshots written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn record(&mut self, tick: u64, particles: &[(ParticleId, DVec3)]) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            log::warn!("Cannot create snapshot dir {}: {}", self.dir.display(), e);
            return;
        }
        let rows: Vec<[f64; 4]> = particles
            .iter()
            .map(|(id, p)| [*id as f64, p.x, p.y, p.z])
            .collect();
        match write_atomic(&self.snapshot_path(tick), &rows) {
            Ok(()) => self.written += 1,
            Err(e) => log::warn!("Snapshot at tick {tick} skipped: {e}"),
        }
    }
}
