//! Event log artifact directory
//!
//! Three JSON arrays under one directory:
//! - `deleted_particle_coords.json`: rows of `[tick, x, y, z]` in detection order
//! - `deleted_particle_ids.json`: particle id per row (optional on load)
//! - `sim_parameters.json`: the fixed-order parameter vector

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glam::DVec3;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::sim::state::as_count;
use crate::sim::{DeletionEvent, EventLog, ParticleId, SimParams};

use super::ArtifactStore;

pub const COORDS_FILE: &str = "deleted_particle_coords.json";
pub const IDS_FILE: &str = "deleted_particle_ids.json";
pub const PARAMS_FILE: &str = "sim_parameters.json";

/// Columns per coordinate row
const COORD_COLUMNS: usize = 4;

/// Directory holding one run's persisted arrays
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    dir: PathBuf,
}

impl ArtifactDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn coords_path(&self) -> PathBuf {
        self.dir.join(COORDS_FILE)
    }

    pub fn ids_path(&self) -> PathBuf {
        self.dir.join(IDS_FILE)
    }

    pub fn params_path(&self) -> PathBuf {
        self.dir.join(PARAMS_FILE)
    }

    /// Write all three arrays
    pub fn save(&self, log: &EventLog, params: &SimParams) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| Error::PersistenceFailure {
            path: self.dir.clone(),
            source,
        })?;

        let rows: Vec<[f64; COORD_COLUMNS]> = log
            .iter()
            .map(|e| [e.tick as f64, e.position.x, e.position.y, e.position.z])
            .collect();
        write_atomic(&self.coords_path(), &rows)?;

        // Ids are all-or-nothing; a log reloaded without them stays without them
        let ids: Option<Vec<ParticleId>> = log.iter().map(|e| e.particle).collect();
        match ids {
            Some(ids) => write_atomic(&self.ids_path(), &ids)?,
            None => remove_stale(&self.ids_path())?,
        }

        write_atomic(&self.params_path(), &params.to_array())?;

        log::info!(
            "Persisted {} deletion events to {}",
            log.len(),
            self.dir.display()
        );
        Ok(())
    }

    /// Read and validate the arrays
    pub fn load(&self) -> Result<(EventLog, SimParams)> {
        let values: Vec<f64> = read_json(&self.params_path())?;
        let params = SimParams::from_slice(&values)?;

        let rows: Vec<Vec<f64>> = read_json(&self.coords_path())?;
        let ids: Option<Vec<ParticleId>> = if self.ids_path().exists() {
            Some(read_json(&self.ids_path())?)
        } else {
            None
        };
        if let Some(ids) = &ids
            && ids.len() != rows.len()
        {
            return Err(Error::CorruptEventLog(format!(
                "{} particle ids for {} coordinate rows",
                ids.len(),
                rows.len()
            )));
        }

        let mut events = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != COORD_COLUMNS {
                return Err(Error::CorruptEventLog(format!(
                    "row {i} has {} columns, expected {COORD_COLUMNS}",
                    row.len()
                )));
            }
            let tick = as_count(row[0], "tick")?;
            if tick > params.final_tick {
                return Err(Error::CorruptEventLog(format!(
                    "row {i} tick {tick} is past final tick {}",
                    params.final_tick
                )));
            }
            let position = DVec3::new(row[1], row[2], row[3]);
            if !position.is_finite() {
                return Err(Error::CorruptEventLog(format!(
                    "row {i} has a non-finite position"
                )));
            }
            let particle = ids.as_ref().map(|ids| ids[i]);
            events.push(DeletionEvent::new(tick, position, particle));
        }

        let log = EventLog::from_events(events)?;
        log::info!(
            "Loaded {} deletion events from {} (final tick {})",
            log.len(),
            self.dir.display(),
            params.final_tick
        );
        Ok((log, params))
    }
}

impl ArtifactStore for ArtifactDir {
    fn persist(&mut self, log: &EventLog, params: &SimParams) -> Result<()> {
        self.save(log, params)
    }
}

/// Serialize to `<path>.tmp`, then rename over `path`
pub(crate) fn write_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let fail = |source: io::Error| Error::PersistenceFailure {
        path: path.to_path_buf(),
        source,
    };
    let bytes = serde_json::to_vec(value).map_err(|e| fail(io::Error::other(e)))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(fail)?;
    fs::rename(&tmp, path).map_err(fail)
}

fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(Error::PersistenceFailure {
            path: path.to_path_buf(),
            source: e,
        }),
        _ => Ok(()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::CorruptEventLog(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| Error::CorruptEventLog(format!("cannot parse {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ExperimentConfig;
    use crate::sim::Board;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn params(final_tick: u64) -> SimParams {
        let config = ExperimentConfig::default();
        SimParams::new(&config, &Board::new(&config), final_tick)
    }

    fn sample_log() -> EventLog {
        EventLog::from_events(vec![
            DeletionEvent::new(10_000, DVec3::new(7.125, -9.61, 0.0), Some(3)),
            DeletionEvent::new(10_000, DVec3::new(6.5, -9.72, 0.0), Some(1)),
            DeletionEvent::new(30_000, DVec3::new(0.1 + 0.2, -9.55, 0.0), Some(2)),
        ])
        .unwrap()
    }

    #[test]
    fn test_round_trip_preserves_rows() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = ArtifactDir::new(temp_dir.path().join("SIM_PARAMS"));
        let log = sample_log();
        store.persist(&log, &params(50_000)).unwrap();

        let (loaded, loaded_params) = store.load().unwrap();
        assert_eq!(loaded, log);
        assert_eq!(loaded_params, params(50_000));
        assert!(!store.coords_path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_without_ids_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactDir::new(temp_dir.path());
        store.save(&sample_log(), &params(50_000)).unwrap();
        fs::remove_file(store.ids_path()).unwrap();

        let (loaded, _) = store.load().unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(loaded.iter().all(|e| e.particle.is_none()));
    }

    #[test]
    fn test_empty_log_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactDir::new(temp_dir.path());
        store.save(&EventLog::new(), &params(20_000)).unwrap();
        let (loaded, loaded_params) = store.load().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded_params.final_tick, 20_000);
    }

    fn write_raw(store: &ArtifactDir, coords: &str) {
        fs::create_dir_all(store.path()).unwrap();
        fs::write(store.coords_path(), coords).unwrap();
        write_atomic(&store.params_path(), &params(50_000).to_array()).unwrap();
    }

    #[test]
    fn test_rejects_wrong_column_count() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactDir::new(temp_dir.path());
        write_raw(&store, "[[0.0, 1.0, 2.0]]");
        assert!(matches!(store.load(), Err(Error::CorruptEventLog(_))));
    }

    #[test]
    fn test_rejects_decreasing_ticks() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactDir::new(temp_dir.path());
        write_raw(&store, "[[20000, 1, 2, 0], [10000, 3, 4, 0]]");
        assert!(matches!(store.load(), Err(Error::CorruptEventLog(_))));
    }

    #[test]
    fn test_rejects_fractional_tick_and_late_rows() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactDir::new(temp_dir.path());
        write_raw(&store, "[[0.5, 1, 2, 0]]");
        assert!(store.load().is_err());
        write_raw(&store, "[[60000, 1, 2, 0]]");
        assert!(store.load().is_err());
    }

    #[test]
    fn test_rejects_mismatched_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactDir::new(temp_dir.path());
        write_raw(&store, "[[0, 1, 2, 0], [0, 3, 4, 0]]");
        fs::write(store.ids_path(), "[1]").unwrap();
        assert!(matches!(store.load(), Err(Error::CorruptEventLog(_))));
    }

    #[test]
    fn test_missing_directory_is_corrupt_not_panic() {
        let store = ArtifactDir::new("/nonexistent/galton/SIM_PARAMS");
        assert!(matches!(store.load(), Err(Error::CorruptEventLog(_))));
    }

    proptest! {
        #[test]
        fn prop_round_trip_exact(
            rows in prop::collection::vec((0u64..5, -1.0e3f64..1.0e3, -1.0e3f64..1.0e3), 0..40)
        ) {
            let mut tick = 0;
            let events: Vec<_> = rows
                .iter()
                .enumerate()
                .map(|(i, &(step, x, y))| {
                    tick += step * 10_000;
                    DeletionEvent::new(tick, DVec3::new(x, y, 0.0), Some(i as u64))
                })
                .collect();
            let log = EventLog::from_events(events).unwrap();

            let temp_dir = TempDir::new().unwrap();
            let store = ArtifactDir::new(temp_dir.path());
            store.save(&log, &params(tick)).unwrap();
            let (loaded, _) = store.load().unwrap();
            prop_assert_eq!(loaded, log);
        }
    }
}
