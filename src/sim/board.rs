//! Hexagonal peg grid
//!
//! Odd rows are shifted by half a spacing and hold one peg fewer, so the
//! board is a staggered lattice between two vertical walls.

use glam::DVec2;

use crate::settings::ExperimentConfig;

/// Peg layout and the derived boundaries of the board
#[derive(Debug, Clone)]
pub struct Board {
    pegs: Vec<DVec2>,
    peg_radius: f64,
    spacing: f64,
    x_min: f64,
    x_max: f64,
    exit_threshold: f64,
}

impl Board {
    pub fn new(config: &ExperimentConfig) -> Self {
        let spacing = config.spacing;
        let mut pegs = Vec::new();
        for row in 0..config.y_range {
            let odd = row % 2;
            let offset = (spacing / 2.0) * odd as f64;
            for col in 0..config.x_range.saturating_sub(odd) {
                pegs.push(DVec2::new(
                    col as f64 * spacing + offset,
                    -(row as f64) * spacing,
                ));
            }
        }

        // Walls sit on the horizontal extrema of the peg bounding box
        let (lo, hi) = pegs
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.x), hi.max(p.x))
            });
        let (x_min, x_max) = if pegs.is_empty() {
            (-config.r_obstacle, config.r_obstacle)
        } else {
            (lo - config.r_obstacle, hi + config.r_obstacle)
        };

        Self {
            pegs,
            peg_radius: config.r_obstacle,
            spacing,
            x_min,
            x_max,
            exit_threshold: -(config.y_range as f64) * spacing + spacing / 2.0,
        }
    }

    pub fn pegs(&self) -> &[DVec2] {
        &self.pegs
    }

    pub fn peg_radius(&self) -> f64 {
        self.peg_radius
    }

    /// Left wall
    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    /// Right wall
    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    /// Horizontal midpoint between the walls
    pub fn mid_x(&self) -> f64 {
        (self.x_max + self.x_min) / 2.0
    }

    /// Particles below this y are logged and removed
    pub fn exit_threshold(&self) -> f64 {
        self.exit_threshold
    }

    /// Height at which new particles are released
    pub fn drop_height(&self) -> f64 {
        self.spacing
    }

    /// Half-width of the injection aperture around `mid_x`
    pub fn aperture_half_width(&self) -> f64 {
        self.spacing / 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_board_layout() {
        let board = Board::new(&ExperimentConfig::default());
        // 5 even rows of 15 plus 5 odd rows of 14
        assert_eq!(board.pegs().len(), 5 * 15 + 5 * 14);
        assert_eq!(board.x_min(), -0.25);
        assert_eq!(board.x_max(), 14.25);
        assert_eq!(board.mid_x(), 7.0);
        assert_eq!(board.exit_threshold(), -9.5);
        assert_eq!(board.drop_height(), 1.0);
    }

    #[test]
    fn test_odd_rows_are_staggered() {
        let config = ExperimentConfig {
            x_range: 3,
            y_range: 2,
            spacing: 2.0,
            ..Default::default()
        };
        let board = Board::new(&config);
        let second_row: Vec<_> = board.pegs().iter().filter(|p| p.y == -2.0).collect();
        assert_eq!(second_row.len(), 2);
        assert_eq!(second_row[0].x, 1.0);
        assert_eq!(second_row[1].x, 3.0);
    }
}
