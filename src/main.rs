//! Galton board entry point
//!
//! `galton simulate` runs the experiment and persists its artifacts.
//! `galton animate` turns those artifacts into a histogram video.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};

use galton_board::consts;
use galton_board::persistence::{ArtifactDir, SnapshotRecorder};
use galton_board::renderer::{BinEdges, FfmpegEncoder, HistogramAnimator};
use galton_board::series::SeriesReconstructor;
use galton_board::sim::{Board, PegBoardEngine, SimulationDriver, TickLoop};
use galton_board::{AnimationSettings, ExperimentConfig, ResolutionPreset};

#[derive(Parser, Debug)]
#[command(name = "galton")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drop balls through the board and persist the exit log
    Simulate {
        /// JSON experiment config; missing fields take their defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output root (overrides the config)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// RNG seed for injection offsets
        #[arg(short, long)]
        seed: Option<u64>,

        /// Number of balls to drop
        #[arg(short = 'n', long)]
        total_balls: Option<u32>,

        /// Write active particle positions every sample period
        #[arg(long)]
        snapshots: bool,

        /// Abort if the run has not finished by this tick
        #[arg(long)]
        tick_limit: Option<u64>,
    },

    /// Render the persisted log as a cumulative histogram video
    Animate {
        /// Root holding SIM_PARAMS/
        #[arg(short, long, default_value = consts::DATA_DIR)]
        data_dir: PathBuf,

        /// JSON animation settings; flags below override it
        #[arg(long)]
        settings: Option<PathBuf>,

        #[arg(long)]
        fps: Option<u32>,

        /// Stroke widths and label size scale with dpi / 100
        #[arg(long)]
        dpi: Option<u32>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 720p, 1080p or 2160p
        #[arg(short, long)]
        resolution: Option<String>,

        /// Encoder bitrate in kbit/s
        #[arg(long)]
        bitrate: Option<u32>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Simulate {
            config,
            data_dir,
            seed,
            total_balls,
            snapshots,
            tick_limit,
        } => {
            let mut config = match config {
                Some(path) => ExperimentConfig::load(&path)?,
                None => ExperimentConfig::default(),
            };
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(n) = total_balls {
                config.total_balls = n;
            }
            config.record_snapshots |= snapshots;
            simulate(config, tick_limit)
        }
        Command::Animate {
            data_dir,
            settings,
            fps,
            dpi,
            output,
            resolution,
            bitrate,
        } => {
            let mut settings = match settings {
                Some(path) => AnimationSettings::load(&path)?,
                None => AnimationSettings::default(),
            };
            if let Some(fps) = fps {
                settings.frame_rate = fps;
            }
            if let Some(dpi) = dpi {
                settings.dots_per_inch = dpi;
            }
            if let Some(output) = output {
                settings.output_path = output;
            }
            if let Some(resolution) = resolution {
                settings.resolution = ResolutionPreset::from_str(&resolution)
                    .ok_or_else(|| anyhow!("unknown resolution '{resolution}'"))?;
            }
            if let Some(bitrate) = bitrate {
                settings.bitrate_kbps = bitrate;
            }
            animate(&data_dir, settings)
        }
    }
}

fn simulate(config: ExperimentConfig, tick_limit: Option<u64>) -> Result<()> {
    config.validate()?;
    let board = Board::new(&config);
    log::info!(
        "Board: {} pegs, x in [{:.3}, {:.3}], exit below y = {:.3}",
        board.pegs().len(),
        board.x_min(),
        board.x_max(),
        board.exit_threshold()
    );

    let store = ArtifactDir::new(config.params_dir());
    let engine = PegBoardEngine::new(&config, board.clone());
    let mut driver = SimulationDriver::new(config.clone(), board, store)?;
    if config.record_snapshots {
        driver = driver.with_snapshots(SnapshotRecorder::new(config.snapshot_dir()));
    }

    let mut tick_loop = TickLoop::new(engine);
    if let Some(limit) = tick_limit {
        tick_loop = tick_loop.with_tick_limit(limit);
    }
    driver.install(&mut tick_loop);

    let summary = tick_loop.run(&mut driver).context("simulation failed")?;
    println!(
        "Finished at tick {}: {} balls injected, {} exited; artifacts in {}",
        summary.final_tick,
        summary.injected,
        summary.exited,
        config.params_dir().display()
    );
    Ok(())
}

fn animate(data_dir: &std::path::Path, settings: AnimationSettings) -> Result<()> {
    let artifacts = ArtifactDir::new(data_dir.join("SIM_PARAMS"));
    let (log, params) = artifacts
        .load()
        .with_context(|| format!("cannot load artifacts from {}", artifacts.path().display()))?;
    log::info!(
        "Loaded {} exit events, final tick {}",
        log.len(),
        params.final_tick
    );

    let series = SeriesReconstructor::new(&params).reconstruct(&log);
    let edges = BinEdges::for_board(&params)?;
    let output = settings.output_path.clone();
    let (frame_rate, bitrate) = (settings.frame_rate, settings.bitrate_kbps);
    let animator = HistogramAnimator::new(edges, settings, &series)?;

    let mut encoder = FfmpegEncoder::spawn(&output, animator.frame_size(), frame_rate, bitrate)?;
    let frames = animator
        .animate(&series, &mut encoder)
        .context("animation failed")?;
    println!("Wrote {} frames to {}", frames, output.display());
    Ok(())
}
