//! Fixed histogram bins over the board width
//!
//! One bin per peg column. Bins are half-open `[lo, hi)` except the last,
//! which also includes the right edge.

use crate::error::{Error, Result};
use crate::series::FrameSeries;
use crate::sim::SimParams;

/// Uniform partition of `[x_min, x_max]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinEdges {
    x_min: f64,
    x_max: f64,
    bins: usize,
}

impl BinEdges {
    pub fn new(x_min: f64, x_max: f64, bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(Error::InvalidConfiguration(
                "histogram needs at least one bin".to_string(),
            ));
        }
        if !(x_min.is_finite() && x_max.is_finite() && x_min < x_max) {
            return Err(Error::InvalidConfiguration(format!(
                "invalid bin range [{x_min}, {x_max}]"
            )));
        }
        Ok(Self { x_min, x_max, bins })
    }

    /// One bin per peg column across the board
    pub fn for_board(params: &SimParams) -> Result<Self> {
        Self::new(params.x_min, params.x_max, params.x_range as usize)
    }

    pub fn len(&self) -> usize {
        self.bins
    }

    pub fn is_empty(&self) -> bool {
        self.bins == 0
    }

    pub fn range(&self) -> (f64, f64) {
        (self.x_min, self.x_max)
    }

    pub fn width(&self) -> f64 {
        (self.x_max - self.x_min) / self.bins as f64
    }

    /// Edge `i` of `len() + 1`
    pub fn edge(&self, i: usize) -> f64 {
        if i >= self.bins {
            self.x_max
        } else {
            self.x_min + self.width() * i as f64
        }
    }

    /// Bin holding `x`, or `None` outside the range
    pub fn bin_of(&self, x: f64) -> Option<usize> {
        if !x.is_finite() || x < self.x_min || x > self.x_max {
            return None;
        }
        let i = ((x - self.x_min) / self.width()) as usize;
        // Rounding can land exactly-on-edge values one bin too far
        let i = i.min(self.bins - 1);
        if i + 1 < self.bins && x >= self.edge(i + 1) {
            Some(i + 1)
        } else if x < self.edge(i) {
            Some(i.saturating_sub(1))
        } else {
            Some(i)
        }
    }

    /// Count of `xs` per bin; out-of-range values are dropped
    pub fn histogram(&self, xs: impl IntoIterator<Item = f64>) -> Vec<u32> {
        let mut counts = vec![0; self.bins];
        for x in xs {
            if let Some(i) = self.bin_of(x) {
                counts[i] += 1;
            }
        }
        counts
    }

    /// Largest per-bin count across every frame, at least 1
    pub fn global_max(&self, series: &FrameSeries) -> u32 {
        series
            .iter()
            .filter(|f| !f.is_placeholder)
            .map(|f| self.histogram(f.xs()).into_iter().max().unwrap_or(0))
            .max()
            .unwrap_or(0)
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesReconstructor;
    use crate::settings::ExperimentConfig;
    use crate::sim::{Board, DeletionEvent, EventLog};
    use glam::DVec3;
    use proptest::prelude::*;

    #[test]
    fn test_edges_are_uniform() {
        let edges = BinEdges::new(-0.25, 14.25, 15).unwrap();
        assert_eq!(edges.len(), 15);
        assert!((edges.width() - 14.5 / 15.0).abs() < 1e-12);
        assert_eq!(edges.edge(0), -0.25);
        assert_eq!(edges.edge(15), 14.25);
    }

    #[test]
    fn test_bin_boundaries() {
        let edges = BinEdges::new(0.0, 10.0, 5).unwrap();
        assert_eq!(edges.bin_of(0.0), Some(0));
        assert_eq!(edges.bin_of(1.999), Some(0));
        assert_eq!(edges.bin_of(2.0), Some(1));
        assert_eq!(edges.bin_of(10.0), Some(4));
        assert_eq!(edges.bin_of(-0.001), None);
        assert_eq!(edges.bin_of(10.001), None);
        assert_eq!(edges.bin_of(f64::NAN), None);
    }

    #[test]
    fn test_rejects_bad_ranges() {
        assert!(BinEdges::new(0.0, 1.0, 0).is_err());
        assert!(BinEdges::new(1.0, 1.0, 3).is_err());
        assert!(BinEdges::new(f64::NEG_INFINITY, 1.0, 3).is_err());
    }

    #[test]
    fn test_global_max_ignores_placeholders() {
        let config = ExperimentConfig::default();
        let board = Board::new(&config);
        let params = SimParams::new(&config, &board, 40_000);
        let log = EventLog::from_events(vec![
            DeletionEvent::new(20_000, DVec3::new(7.0, -9.6, 0.0), Some(1)),
            DeletionEvent::new(20_000, DVec3::new(7.1, -9.6, 0.0), Some(2)),
            DeletionEvent::new(30_000, DVec3::new(3.0, -9.6, 0.0), Some(3)),
        ])
        .unwrap();
        let series = SeriesReconstructor::new(&params).reconstruct(&log);
        let edges = BinEdges::for_board(&params).unwrap();
        assert_eq!(edges.global_max(&series), 2);

        let empty = SeriesReconstructor::new(&params).reconstruct(&EventLog::new());
        assert_eq!(edges.global_max(&empty), 1);
    }

    proptest! {
        #[test]
        fn prop_counts_sum_to_in_range_size(xs in prop::collection::vec(-0.25f64..=14.25, 0..200)) {
            let edges = BinEdges::new(-0.25, 14.25, 15).unwrap();
            let counts = edges.histogram(xs.iter().copied());
            prop_assert_eq!(counts.iter().sum::<u32>() as usize, xs.len());
        }

        #[test]
        fn prop_bin_contains_value(x in -0.25f64..=14.25) {
            let edges = BinEdges::new(-0.25, 14.25, 15).unwrap();
            let i = edges.bin_of(x).unwrap();
            prop_assert!(x >= edges.edge(i));
            prop_assert!(x < edges.edge(i + 1) || i == 14);
        }
    }
}
