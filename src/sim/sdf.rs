//! SDF-based contact detection
//!
//! Pegs are circles and walls are half-planes in the board plane; both are
//! expressed as signed distance functions.

use glam::DVec2;

/// Signed distance to a circle
#[inline]
pub fn sd_circle(p: DVec2, center: DVec2, radius: f64) -> f64 {
    (p - center).length() - radius
}

/// Signed distance to a vertical wall at `x`; positive on the `inward` side
#[inline]
pub fn sd_wall(p: DVec2, x: f64, inward: f64) -> f64 {
    (p.x - x) * inward.signum()
}

/// Result of an SDF contact check
#[derive(Debug, Clone)]
pub struct SdfContact {
    pub hit: bool,
    /// Unit normal pointing from the surface toward the ball
    pub normal: DVec2,
    pub penetration: f64,
}

impl SdfContact {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: DVec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Contact between a ball and a circular peg
pub fn ball_peg_contact(ball_pos: DVec2, ball_radius: f64, peg: DVec2, peg_radius: f64) -> SdfContact {
    let dist = sd_circle(ball_pos, peg, peg_radius);
    if dist < ball_radius {
        // Dead-centre overlap has no defined normal; push straight up
        let normal = (ball_pos - peg).try_normalize().unwrap_or(DVec2::Y);
        SdfContact {
            hit: true,
            normal,
            penetration: ball_radius - dist,
        }
    } else {
        SdfContact::miss()
    }
}

/// Contact between a ball and a vertical wall
pub fn ball_wall_contact(ball_pos: DVec2, ball_radius: f64, wall_x: f64, inward: f64) -> SdfContact {
    let dist = sd_wall(ball_pos, wall_x, inward);
    if dist < ball_radius {
        SdfContact {
            hit: true,
            normal: DVec2::new(inward.signum(), 0.0),
            penetration: ball_radius - dist,
        }
    } else {
        SdfContact::miss()
    }
}

/// Reflect velocity off a surface with given normal
#[inline]
pub fn reflect(vel: DVec2, normal: DVec2) -> DVec2 {
    vel - 2.0 * vel.dot(normal) * normal
}
