//! Built-in peg board engine
//!
//! A small 2D integrator so the driver can run without an external physics
//! package. Balls feel gravity, bounce off pegs and walls, and lose a fixed
//! fraction of their normal speed on every contact. Ball-ball contacts are
//! not modelled.

use glam::{DVec2, DVec3};

use crate::error::{EngineOp, Error, Result};
use crate::settings::ExperimentConfig;

use super::board::Board;
use super::engine::{Engine, LockedAxes, SpawnRequest};
use super::sdf::{ball_peg_contact, ball_wall_contact, reflect};
use super::state::ParticleId;

/// A dynamic ball owned by the engine
#[derive(Debug, Clone)]
struct Ball {
    id: ParticleId,
    pos: DVec3,
    vel: DVec3,
    locked: LockedAxes,
}

impl Ball {
    fn integrate(&mut self, accel: DVec3, dt: f64) {
        self.vel += accel * dt;
        if self.locked.translate_x {
            self.vel.x = 0.0;
        }
        if self.locked.translate_y {
            self.vel.y = 0.0;
        }
        if self.locked.translate_z {
            self.vel.z = 0.0;
        }
        self.pos += self.vel * dt;
    }

    /// Push the ball out of a contact and reflect its in-plane velocity
    fn resolve(&mut self, normal: DVec2, penetration: f64, restitution: f64) {
        let planar = self.pos.truncate() + normal * penetration;
        self.pos.x = planar.x;
        self.pos.y = planar.y;

        let vel = self.vel.truncate();
        if vel.dot(normal) < 0.0 {
            // Only the normal component is damped
            let reflected = reflect(vel, normal);
            let normal_part = reflected.dot(normal) * normal;
            let tangential = reflected - normal_part;
            let out = tangential + normal_part * restitution;
            self.vel.x = out.x;
            self.vel.y = out.y;
        }
    }
}

/// Gravity-driven Galton board integrator
#[derive(Debug, Clone)]
pub struct PegBoardEngine {
    board: Board,
    ball_radius: f64,
    gravity: DVec3,
    restitution: f64,
    dt: f64,
    balls: Vec<Ball>,
    next_id: ParticleId,
    tick: u64,
    paused: bool,
}

impl PegBoardEngine {
    pub fn new(config: &ExperimentConfig, board: Board) -> Self {
        Self {
            board,
            ball_radius: config.r_balls,
            gravity: DVec3::new(0.0, config.gravity, 0.0),
            restitution: 1.0 - config.damping,
            dt: config.dt,
            balls: Vec::new(),
            next_id: 1,
            tick: 0,
            paused: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    fn collide(&self, ball: &mut Ball) {
        let r = self.ball_radius;
        let peg_r = self.board.peg_radius();
        let reach = r + peg_r;

        for &peg in self.board.pegs() {
            let planar = ball.pos.truncate();
            if (planar.y - peg.y).abs() > reach || (planar.x - peg.x).abs() > reach {
                continue;
            }
            let contact = ball_peg_contact(planar, r, peg, peg_r);
            if contact.hit {
                ball.resolve(contact.normal, contact.penetration, self.restitution);
            }
        }

        for (wall_x, inward) in [(self.board.x_min(), 1.0), (self.board.x_max(), -1.0)] {
            let contact = ball_wall_contact(ball.pos.truncate(), r, wall_x, inward);
            if contact.hit {
                ball.resolve(contact.normal, contact.penetration, self.restitution);
            }
        }
    }
}

impl Engine for PegBoardEngine {
    fn spawn(&mut self, request: SpawnRequest) -> Result<ParticleId> {
        if !request.position.is_finite() {
            return Err(Error::EngineUnavailable {
                operation: EngineOp::Spawn,
                particle: None,
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.balls.push(Ball {
            id,
            pos: request.position,
            vel: DVec3::ZERO,
            locked: request.locked,
        });
        Ok(id)
    }

    fn particles(&self) -> Vec<(ParticleId, DVec3)> {
        self.balls.iter().map(|b| (b.id, b.pos)).collect()
    }

    fn remove(&mut self, id: ParticleId) -> Result<()> {
        match self.balls.iter().position(|b| b.id == id) {
            Some(index) => {
                self.balls.remove(index);
                Ok(())
            }
            None => Err(Error::EngineUnavailable {
                operation: EngineOp::Remove,
                particle: Some(id),
            }),
        }
    }

    fn pause_clock(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn tick(&self) -> u64 {
        self.tick
    }

    fn step(&mut self) {
        if self.paused {
            return;
        }
        let mut balls = std::mem::take(&mut self.balls);
        for ball in &mut balls {
            ball.integrate(self.gravity, self.dt);
            self.collide(ball);
        }
        self.balls = balls;
        self.tick += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(config: &ExperimentConfig) -> PegBoardEngine {
        PegBoardEngine::new(config, Board::new(config))
    }

    fn spawn_at(engine: &mut PegBoardEngine, x: f64, y: f64) -> ParticleId {
        engine
            .spawn(SpawnRequest {
                position: DVec3::new(x, y, 0.0),
                locked: LockedAxes::DROP_PLANE,
            })
            .unwrap()
    }

    #[test]
    fn test_free_fall_follows_gravity() {
        let config = ExperimentConfig {
            dt: 1e-3,
            ..Default::default()
        };
        let mut engine = engine(&config);
        // Between the walls, above the first row
        let id = spawn_at(&mut engine, 7.0, 5.0);
        for _ in 0..100 {
            engine.step();
        }
        let (got, pos) = engine.particles()[0];
        assert_eq!(got, id);
        // 0.1 s of free fall: ~0.049 units
        assert!(pos.y < 5.0 && pos.y > 4.9);
        assert_eq!(pos.x, 7.0);
        assert_eq!(engine.tick(), 100);
    }

    #[test]
    fn test_ball_never_sinks_into_peg() {
        let config = ExperimentConfig {
            dt: 1e-3,
            ..Default::default()
        };
        let mut engine = engine(&config);
        spawn_at(&mut engine, 7.05, 1.0);
        let min_gap = config.r_balls + config.r_obstacle - 1e-3;
        for _ in 0..3000 {
            engine.step();
            let pos = engine.particles()[0].1.truncate();
            for &peg in engine.board().pegs() {
                assert!((pos - peg).length() >= min_gap - 0.02);
            }
        }
    }

    #[test]
    fn test_locked_z_axis_stays_fixed() {
        let config = ExperimentConfig {
            dt: 1e-3,
            ..Default::default()
        };
        let mut engine = engine(&config);
        spawn_at(&mut engine, 7.1, 1.0);
        for _ in 0..2000 {
            engine.step();
        }
        assert_eq!(engine.particles()[0].1.z, 0.0);
    }

    #[test]
    fn test_remove_unknown_handle_fails() {
        let config = ExperimentConfig::default();
        let mut engine = engine(&config);
        let id = spawn_at(&mut engine, 7.0, 1.0);
        assert!(engine.remove(id).is_ok());
        assert!(matches!(
            engine.remove(id),
            Err(Error::EngineUnavailable {
                operation: EngineOp::Remove,
                particle: Some(_)
            })
        ));
    }

    #[test]
    fn test_paused_clock_does_not_advance() {
        let config = ExperimentConfig::default();
        let mut engine = engine(&config);
        engine.step();
        engine.pause_clock();
        engine.step();
        assert!(engine.is_paused());
        assert_eq!(engine.tick(), 1);
    }
}
