//! Particle system with force accumulation and energy bookkeeping.
//!
//! Each step sums all forces into an acceleration, then integrates with
//! semi-implicit Euler: velocities first, positions with the new velocity.

use cgmath::{InnerSpace, Vector3, Zero};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::math::Aabb;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub acceleration: Vector3<f32>,
    pub mass: f32,
}

impl Particle {
    pub fn new(position: Vector3<f32>, velocity: Vector3<f32>, mass: f32) -> Self {
        Self {
            position,
            velocity,
            acceleration: Vector3::zero(),
            mass,
        }
    }

    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.mass * self.velocity.magnitude2()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Force {
    /// Constant acceleration applied to every particle.
    Gravity(Vector3<f32>),
    /// Linear drag `-k v`.
    Drag(f32),
    /// Pairwise push apart, falling linearly from `strength` at contact to zero at `radius`.
    Repulsion { strength: f32, radius: f32 },
    /// Spring pulling every particle towards `point`.
    Attractor { point: Vector3<f32>, strength: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleConfig {
    /// Magnitude of the gravity added by [`ParticleSystem::new`], pointing down -y.
    pub gravity: f32,
    /// Height of a ground plane particles bounce off, if any.
    pub ground: Option<f32>,
    /// Fraction of the normal velocity kept after a bounce.
    pub restitution: f32,
    pub dt: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            ground: None,
            restitution: 0.5,
            dt: 1.0 / 60.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParticleSystem {
    pub particles: Vec<Particle>,
    pub forces: Vec<Force>,
    pub config: ParticleConfig,
}

impl ParticleSystem {
    pub fn new(particles: Vec<Particle>, config: ParticleConfig) -> Self {
        let mut forces = Vec::new();
        if config.gravity != 0.0 {
            forces.push(Force::Gravity(Vector3::new(0.0, -config.gravity, 0.0)));
        }
        Self {
            particles,
            forces,
            config,
        }
    }

    /// `n` unit-mass particles spread uniformly over `bounds` with velocities in [-5, 5).
    pub fn random(n: usize, seed: u64, bounds: Aabb, config: ParticleConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut coord = |lo: f32, hi: f32| {
            if hi > lo { rng.random_range(lo..hi) } else { lo }
        };
        let particles = (0..n)
            .map(|_| {
                let position = Vector3::new(
                    coord(bounds.min.x, bounds.max.x),
                    coord(bounds.min.y, bounds.max.y),
                    coord(bounds.min.z, bounds.max.z),
                );
                let velocity = Vector3::new(coord(-5.0, 5.0), coord(-5.0, 5.0), coord(-5.0, 5.0));
                Particle::new(position, velocity, 1.0)
            })
            .collect();
        Self::new(particles, config)
    }

    pub fn add_force(&mut self, force: Force) -> &mut Self {
        self.forces.push(force);
        self
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    fn accumulate_forces(&self) -> Vec<Vector3<f32>> {
        let mut totals = vec![Vector3::zero(); self.particles.len()];
        for force in &self.forces {
            match *force {
                Force::Gravity(g) => {
                    for (total, p) in totals.iter_mut().zip(&self.particles) {
                        *total += g * p.mass;
                    }
                }
                Force::Drag(k) => {
                    for (total, p) in totals.iter_mut().zip(&self.particles) {
                        *total -= p.velocity * k;
                    }
                }
                Force::Attractor { point, strength } => {
                    for (total, p) in totals.iter_mut().zip(&self.particles) {
                        *total += (point - p.position) * strength;
                    }
                }
                Force::Repulsion { strength, radius } => {
                    for i in 0..self.particles.len() {
                        for j in (i + 1)..self.particles.len() {
                            let delta = self.particles[i].position - self.particles[j].position;
                            let d = delta.magnitude();
                            if d >= radius || d <= f32::EPSILON {
                                continue;
                            }
                            let push = delta / d * strength * (1.0 - d / radius);
                            totals[i] += push;
                            totals[j] -= push;
                        }
                    }
                }
            }
        }
        totals
    }

    pub fn step(&mut self, dt: f32) {
        let forces = self.accumulate_forces();
        for (p, force) in self.particles.iter_mut().zip(forces) {
            if p.mass <= 0.0 {
                continue;
            }
            p.acceleration = force / p.mass;
            p.velocity += p.acceleration * dt;
            p.position += p.velocity * dt;
            if let Some(ground) = self.config.ground {
                if p.position.y < ground {
                    p.position.y = ground;
                    if p.velocity.y < 0.0 {
                        p.velocity.y = -p.velocity.y * self.config.restitution;
                    }
                }
            }
        }
    }

    /// Advance by `steps` steps of the configured `dt`.
    pub fn run(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step(self.config.dt);
        }
    }

    pub fn kinetic_energy(&self) -> f32 {
        self.particles.iter().map(Particle::kinetic_energy).sum()
    }

    /// Potential energy of the conservative forces; gravity is measured from y = 0.
    pub fn potential_energy(&self) -> f32 {
        let mut energy = 0.0;
        for force in &self.forces {
            match *force {
                Force::Gravity(g) => {
                    energy -= self
                        .particles
                        .iter()
                        .map(|p| p.mass * g.dot(p.position))
                        .sum::<f32>();
                }
                Force::Drag(_) => {}
                Force::Attractor { point, strength } => {
                    energy += self
                        .particles
                        .iter()
                        .map(|p| 0.5 * strength * (p.position - point).magnitude2())
                        .sum::<f32>();
                }
                Force::Repulsion { strength, radius } => {
                    for i in 0..self.particles.len() {
                        for j in (i + 1)..self.particles.len() {
                            let d = (self.particles[i].position - self.particles[j].position)
                                .magnitude();
                            if d < radius {
                                energy += strength * (radius - d).powi(2) / (2.0 * radius);
                            }
                        }
                    }
                }
            }
        }
        energy
    }

    pub fn total_energy(&self) -> f32 {
        self.kinetic_energy() + self.potential_energy()
    }

    pub fn center_of_mass(&self) -> Vector3<f32> {
        let mass: f32 = self.particles.iter().map(|p| p.mass).sum();
        if mass <= 0.0 {
            return Vector3::zero();
        }
        self.particles
            .iter()
            .fold(Vector3::zero(), |acc, p| acc + p.position * p.mass)
            / mass
    }
}
