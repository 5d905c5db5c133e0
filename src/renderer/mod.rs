//! Histogram rendering module
//!
//! Draws cumulative histograms with plotters into RGB frames and streams
//! them to a video encoder.

pub mod animator;
pub mod bins;
pub mod encoder;

pub use animator::HistogramAnimator;
pub use bins::BinEdges;
pub use encoder::{FfmpegEncoder, FrameSink};
