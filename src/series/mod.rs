//! Offline time-series reconstruction
//!
//! Turns the persisted deletion log into a dense, uniformly spaced sequence
//! of cumulative frames for frame-accurate animation.

pub mod reconstruct;

pub use reconstruct::{
    Frame, FrameRef, FrameSeries, SeriesReconstructor, TickGroup, accumulate, group_by_tick,
    placeholder_for,
};
