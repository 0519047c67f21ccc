//! The drifting particle field.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ParticleConfig;
use crate::easing::clamp;
use crate::morph::participates;

/// Squared distances at or below this are treated as coincident.
const MIN_DISTANCE_SQUARED: f32 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
}

/// Pull toward the active morph's targets; target `i` belongs to particle `i`.
#[derive(Debug, Clone, Copy)]
pub struct MorphPull<'a> {
    pub weight: f32,
    pub strength: f32,
    pub seed: u32,
    pub participation: f32,
    pub targets: &'a [Vec2],
}

/// Per-tick inputs that are not owned by the field.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepContext<'a> {
    pub morph: Option<MorphPull<'a>>,
    pub pointer: Option<Vec2>,
}

#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
    bounds: Vec2,
    reduced_motion: bool,
    config: ParticleConfig,
}

impl ParticleField {
    /// `floor(clamp(area / area_per_particle, min, max) * scale)`, capped under reduced motion.
    pub fn particle_count(width: f32, height: f32, reduced_motion: bool, config: &ParticleConfig) -> usize {
        let raw = clamp(
            width * height / config.area_per_particle,
            config.min_count as f32,
            config.max_count as f32,
        );
        let count = (raw * config.count_scale).floor().max(0.0) as usize;
        if reduced_motion {
            count.min(config.reduced_motion_cap)
        } else {
            count
        }
    }

    pub fn initialize<R: Rng + ?Sized>(
        width: f32,
        height: f32,
        reduced_motion: bool,
        config: &ParticleConfig,
        rng: &mut R,
    ) -> Self {
        let count = Self::particle_count(width, height, reduced_motion, config);
        let particles = (0..count)
            .map(|_| Particle {
                pos: Vec2::new(rng.random::<f32>() * width, rng.random::<f32>() * height),
                vel: Vec2::new(
                    (rng.random::<f32>() - 0.5) * config.initial_speed,
                    (rng.random::<f32>() - 0.5) * config.initial_speed,
                ),
                radius: config.radius_min + rng.random::<f32>() * (config.radius_max - config.radius_min),
            })
            .collect();
        debug!("particle field {width}x{height}: {count} particles");
        Self::from_particles(particles, width, height, reduced_motion, config)
    }

    pub fn from_particles(
        particles: Vec<Particle>,
        width: f32,
        height: f32,
        reduced_motion: bool,
        config: &ParticleConfig,
    ) -> Self {
        Self {
            particles,
            bounds: Vec2::new(width, height),
            reduced_motion,
            config: config.clone(),
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    /// Advance every particle by one tick. No-op under reduced motion.
    pub fn step(&mut self, ctx: &StepContext) {
        if self.reduced_motion {
            return;
        }
        let cfg = &self.config;
        let morph = ctx.morph.filter(|m| m.weight > 0.001 && !m.targets.is_empty());
        let pointer_radius_sq = cfg.pointer_radius * cfg.pointer_radius;
        let max_speed_sq = cfg.max_speed * cfg.max_speed;
        let margin = cfg.wrap_margin;
        let Vec2 { x: w, y: h } = self.bounds;

        for (i, p) in self.particles.iter_mut().enumerate() {
            if let Some(pull) = morph {
                if let Some(target) = pull.targets.get(i) {
                    if participates(i, pull.seed, pull.participation) {
                        p.vel += (*target - p.pos) * (pull.strength * pull.weight);
                    }
                }
            }

            if let Some(pointer) = ctx.pointer {
                let offset = p.pos - pointer;
                let d2 = offset.length_squared();
                if d2 < pointer_radius_sq && d2 > MIN_DISTANCE_SQUARED {
                    let d = d2.sqrt();
                    let push = (1.0 - d / cfg.pointer_radius) * cfg.pointer_strength;
                    p.vel += offset / d * push;
                }
            }

            p.pos += p.vel;

            let v2 = p.vel.length_squared();
            if v2 > max_speed_sq {
                p.vel *= cfg.max_speed / v2.sqrt();
            }
            p.vel *= cfg.damping;

            if p.pos.x < -margin {
                p.pos.x = w + margin;
            }
            if p.pos.x > w + margin {
                p.pos.x = -margin;
            }
            if p.pos.y < -margin {
                p.pos.y = h + margin;
            }
            if p.pos.y > h + margin {
                p.pos.y = -margin;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn still(pos: Vec2) -> Particle {
        Particle {
            pos,
            vel: Vec2::ZERO,
            radius: 1.5,
        }
    }

    fn field(particles: Vec<Particle>) -> ParticleField {
        ParticleField::from_particles(particles, 800.0, 600.0, false, &ParticleConfig::default())
    }

    #[test]
    fn count_follows_area_with_caps() {
        let cfg = ParticleConfig::default();
        assert_eq!(ParticleField::particle_count(800.0, 600.0, false, &cfg), 26);
        assert_eq!(ParticleField::particle_count(1200.0, 900.0, false, &cfg), 60);
        assert_eq!(ParticleField::particle_count(4000.0, 4000.0, false, &cfg), 90);
        assert_eq!(ParticleField::particle_count(100.0, 100.0, false, &cfg), 26);
        assert_eq!(ParticleField::particle_count(1200.0, 900.0, true, &cfg), 24);
    }

    #[test]
    fn initialized_particles_respect_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let f = ParticleField::initialize(1200.0, 900.0, false, &ParticleConfig::default(), &mut rng);
        assert_eq!(f.len(), 60);
        for p in f.particles() {
            assert!((1.0..=2.6).contains(&p.radius));
            assert!(p.vel.x.abs() <= 0.175 && p.vel.y.abs() <= 0.175);
            assert!((0.0..1200.0).contains(&p.pos.x));
            assert!((0.0..900.0).contains(&p.pos.y));
        }
    }

    #[test]
    fn stationary_field_stays_put() {
        let start: Vec<_> = (0..50)
            .map(|i| still(Vec2::new(10.0 + i as f32 * 15.0, 20.0 + i as f32 * 11.0)))
            .collect();
        let mut f = field(start.clone());
        for _ in 0..100 {
            f.step(&StepContext::default());
        }
        assert_eq!(f.particles(), start.as_slice());
    }

    #[test]
    fn speed_never_exceeds_maximum() {
        let velocities = [
            Vec2::new(50.0, 0.0),
            Vec2::new(-3.0, 4.0),
            Vec2::new(1.0e6, -1.0e6),
            Vec2::new(0.9, 0.9),
            Vec2::new(0.1, 0.0),
        ];
        let particles = velocities
            .iter()
            .map(|v| Particle {
                pos: Vec2::new(400.0, 300.0),
                vel: *v,
                radius: 1.0,
            })
            .collect();
        let mut f = field(particles);
        f.step(&StepContext {
            morph: None,
            pointer: Some(Vec2::new(401.0, 300.0)),
        });
        for p in f.particles() {
            assert!(p.vel.length() <= 1.25, "{:?}", p.vel);
        }
    }

    #[test]
    fn pointer_pushes_nearby_particles_away() {
        let mut f = field(vec![still(Vec2::new(100.0, 100.0)), still(Vec2::new(500.0, 500.0))]);
        f.step(&StepContext {
            morph: None,
            pointer: Some(Vec2::new(90.0, 100.0)),
        });
        assert!(f.particles()[0].vel.x > 0.0);
        assert_eq!(f.particles()[0].vel.y, 0.0);
        assert_eq!(f.particles()[1].vel, Vec2::ZERO);
    }

    #[test]
    fn coincident_pointer_is_ignored() {
        let mut f = field(vec![still(Vec2::new(100.0, 100.0))]);
        f.step(&StepContext {
            morph: None,
            pointer: Some(Vec2::new(100.0, 100.0)),
        });
        let p = f.particles()[0];
        assert!(p.vel.is_finite() && p.pos.is_finite());
        assert_eq!(p.vel, Vec2::ZERO);
    }

    #[test]
    fn morph_pulls_only_participants_with_targets() {
        let particles: Vec<_> = (0..40).map(|_| still(Vec2::new(100.0, 100.0))).collect();
        let targets: Vec<_> = (0..30).map(|_| Vec2::new(300.0, 100.0)).collect();
        let mut f = field(particles);
        let seed = 1234;
        f.step(&StepContext {
            morph: Some(MorphPull {
                weight: 1.0,
                strength: 0.002,
                seed,
                participation: 0.38,
                targets: &targets,
            }),
            pointer: None,
        });
        for (i, p) in f.particles().iter().enumerate() {
            let pulled = i < targets.len() && participates(i, seed, 0.38);
            assert_eq!(p.vel.x > 0.0, pulled, "particle {i}");
        }
    }

    #[test]
    fn negligible_morph_weight_applies_no_force() {
        let targets = vec![Vec2::new(300.0, 100.0)];
        let mut f = field(vec![still(Vec2::new(100.0, 100.0))]);
        f.step(&StepContext {
            morph: Some(MorphPull {
                weight: 0.0005,
                strength: 1.0,
                seed: 0,
                participation: 1.0,
                targets: &targets,
            }),
            pointer: None,
        });
        assert_eq!(f.particles()[0].vel, Vec2::ZERO);
    }

    #[test]
    fn wrapping_reappears_on_the_opposite_edge() {
        let mut f = field(vec![
            Particle {
                pos: Vec2::new(-40.5, 300.0),
                vel: Vec2::new(-0.5, 0.0),
                radius: 1.0,
            },
            Particle {
                pos: Vec2::new(400.0, 640.5),
                vel: Vec2::new(0.0, 0.5),
                radius: 1.0,
            },
        ]);
        f.step(&StepContext::default());
        assert_eq!(f.particles()[0].pos.x, 840.0);
        assert_eq!(f.particles()[1].pos.y, -40.0);
    }

    #[test]
    fn reduced_motion_step_is_a_no_op() {
        let start = vec![Particle {
            pos: Vec2::new(10.0, 10.0),
            vel: Vec2::new(1.0, 1.0),
            radius: 2.0,
        }];
        let mut f =
            ParticleField::from_particles(start.clone(), 800.0, 600.0, true, &ParticleConfig::default());
        for _ in 0..50 {
            f.step(&StepContext {
                morph: None,
                pointer: Some(Vec2::new(12.0, 12.0)),
            });
        }
        assert_eq!(f.particles(), start.as_slice());
    }
}
