//! Experiment and animation settings
//!
//! Both are plain serde structs with defaults matching the reference board.
//! They can be loaded from a JSON file and are validated before use.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::consts;
use crate::error::{Error, Result};

/// Output resolution presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum ResolutionPreset {
    #[serde(rename = "720p")]
    Hd720,
    #[default]
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "2160p")]
    Uhd2160,
}

impl ResolutionPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionPreset::Hd720 => "720p",
            ResolutionPreset::Hd1080 => "1080p",
            ResolutionPreset::Uhd2160 => "2160p",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "720p" | "720" | "hd" => Some(ResolutionPreset::Hd720),
            "1080p" | "1080" | "fullhd" => Some(ResolutionPreset::Hd1080),
            "2160p" | "2160" | "4k" | "uhd" => Some(ResolutionPreset::Uhd2160),
            _ => None,
        }
    }

    /// Frame size in pixels (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ResolutionPreset::Hd720 => (1280, 720),
            ResolutionPreset::Hd1080 => (1920, 1080),
            ResolutionPreset::Uhd2160 => (3840, 2160),
        }
    }
}

/// Board geometry and simulation cadence
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Balls to drop before the run may terminate
    pub total_balls: u32,
    /// Peg columns
    pub x_range: u32,
    /// Peg rows
    pub y_range: u32,
    /// Distance between neighbouring pegs
    pub spacing: f64,
    /// Peg radius
    pub r_obstacle: f64,
    /// Ball radius
    pub r_balls: f64,
    /// Ticks between exit scans
    pub sample_period: u64,
    /// Ticks between injections
    pub injection_period: u64,
    /// Engine timestep in seconds
    pub dt: f64,
    pub gravity: f64,
    pub damping: f64,
    /// Seed for the injection offset RNG
    pub seed: u64,
    /// Write active particle positions every sample period
    pub record_snapshots: bool,
    /// Root directory for persisted artifacts
    pub data_dir: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            total_balls: consts::TOTAL_BALLS,
            x_range: consts::X_RANGE,
            y_range: consts::Y_RANGE,
            spacing: consts::SPACING,
            r_obstacle: consts::R_OBSTACLE,
            r_balls: consts::R_BALLS,
            sample_period: consts::SAMPLE_PERIOD,
            injection_period: consts::INJECTION_PERIOD,
            dt: consts::DT,
            gravity: consts::GRAVITY,
            damping: consts::DAMPING,
            seed: consts::SEED,
            record_snapshots: false,
            data_dir: PathBuf::from(consts::DATA_DIR),
        }
    }
}

impl ExperimentConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfiguration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            Error::InvalidConfiguration(format!("cannot parse {}: {e}", path.display()))
        })?;
        log::info!("Loaded experiment config from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Reject non-positive counts, dimensions and periods.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: &str) -> Result<()> {
            Err(Error::InvalidConfiguration(msg.to_string()))
        }

        if self.total_balls == 0 {
            return invalid("total_balls must be positive");
        }
        if self.x_range == 0 || self.y_range == 0 {
            return invalid("grid dimensions must be positive");
        }
        if self.sample_period == 0 || self.injection_period == 0 {
            return invalid("sampling and injection periods must be positive");
        }
        if !(self.spacing > 0.0) {
            return invalid("spacing must be positive");
        }
        if !(self.r_obstacle > 0.0) || !(self.r_balls > 0.0) {
            return invalid("radii must be positive");
        }
        if !(self.dt > 0.0) {
            return invalid("dt must be positive");
        }
        if !(0.0..1.0).contains(&self.damping) {
            return invalid("damping must lie in [0, 1)");
        }
        Ok(())
    }

    /// Directory holding the persisted event log and parameter vector
    pub fn params_dir(&self) -> PathBuf {
        self.data_dir.join("SIM_PARAMS")
    }

    /// Directory holding per-period particle snapshots
    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("SNAPSHOTS")
    }
}

/// Parameters for the offline animation pass
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Playback rate of the encoded video
    pub frame_rate: u32,
    /// Stroke widths are scaled by `dots_per_inch / 100`
    pub dots_per_inch: u32,
    pub output_path: PathBuf,
    pub resolution: ResolutionPreset,
    /// Encoder bitrate in kbit/s
    pub bitrate_kbps: u32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            dots_per_inch: 100,
            output_path: PathBuf::from("down_video.mp4"),
            resolution: ResolutionPreset::Hd1080,
            bitrate_kbps: 15_350,
        }
    }
}

impl AnimationSettings {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfiguration(format!("cannot read {}: {e}", path.display()))
        })?;
        let settings: Self = serde_json::from_str(&text).map_err(|e| {
            Error::InvalidConfiguration(format!("cannot parse {}: {e}", path.display()))
        })?;
        log::info!("Loaded animation settings from {}", path.display());
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            return Err(Error::InvalidConfiguration(
                "frame_rate must be positive".to_string(),
            ));
        }
        if self.dots_per_inch == 0 {
            return Err(Error::InvalidConfiguration(
                "dots_per_inch must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Stroke width in pixels for a nominal width at 100 dpi
    pub fn stroke(&self, nominal: u32) -> u32 {
        (nominal * self.dots_per_inch / 100).max(1)
    }
}
