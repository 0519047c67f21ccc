//! Read-only geometry handed to the renderer once per frame.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::Serialize;

use crate::error::Result;
use crate::mesh::{MeshPoseScheduler, Pose};
use crate::particles::Particle;
use crate::shapes::{Crease, ShapeName};

/// Meshes fainter than this are not drawn at all.
pub const MIN_MESH_OPACITY: f32 = 0.01;

/// Base hue of the background glow at time `t` (ms).
pub fn aurora_hue(t: f64) -> f32 {
    170.0 + 95.0 * (t * 0.000_35).sin() as f32
}

/// GPU-ready particle instance.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize)]
pub struct ParticleSprite {
    pub position: [f32; 2],
    pub radius: f32,
    pub hue: f32,
}

/// Proximity line between two particles, `strength` in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Link {
    pub a: u32,
    pub b: u32,
    pub strength: f32,
    pub hue_shift: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshFrame {
    pub shape: ShapeName,
    pub pose: Pose,
    pub glow_radius: f32,
    pub points: Vec<Vec2>,
    pub triangles: Vec<[u32; 3]>,
    pub outline: Vec<Vec2>,
    pub creases: Vec<Crease>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub time: f64,
    pub viewport: Vec2,
    pub hue: f32,
    pub particles: Vec<ParticleSprite>,
    pub links: Vec<Link>,
    pub mesh: Option<MeshFrame>,
}

impl Frame {
    pub fn capture(
        time: f64,
        viewport: Vec2,
        particles: &[Particle],
        link_distance: f32,
        mesh: &MeshPoseScheduler,
    ) -> Self {
        let hue = aurora_hue(time);
        let sprites = particles
            .iter()
            .enumerate()
            .map(|(i, p)| ParticleSprite {
                position: p.pos.to_array(),
                radius: p.radius,
                hue: hue + 10.0 * ((time * 0.0006) as f32 + i as f32).sin(),
            })
            .collect();
        Self {
            time,
            viewport,
            hue,
            particles: sprites,
            links: links(particles, link_distance),
            mesh: mesh_frame(mesh, viewport),
        }
    }

    /// Particle instances as raw bytes for a vertex buffer upload.
    pub fn sprite_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.particles)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Every pair closer than `max_dist`, fading quadratically with distance.
pub fn links(particles: &[Particle], max_dist: f32) -> Vec<Link> {
    let max_dist_sq = max_dist * max_dist;
    let mut out = Vec::new();
    for (i, a) in particles.iter().enumerate() {
        for (j, b) in particles.iter().enumerate().skip(i + 1) {
            let d2 = a.pos.distance_squared(b.pos);
            if d2 > max_dist_sq {
                continue;
            }
            let t = 1.0 - d2.sqrt() / max_dist;
            out.push(Link {
                a: i as u32,
                b: j as u32,
                strength: t * t,
                hue_shift: if j % 3 == 0 { 70.0 } else { 0.0 },
            });
        }
    }
    out
}

fn mesh_frame(mesh: &MeshPoseScheduler, viewport: Vec2) -> Option<MeshFrame> {
    let pose = mesh.pose();
    let grid = mesh.grid();
    let shape = mesh.shape();
    if pose.opacity <= MIN_MESH_OPACITY || grid.points.is_empty() || shape.outline.len() < 3 {
        return None;
    }
    let placement = pose.placement();
    Some(MeshFrame {
        shape: shape.name,
        pose,
        glow_radius: viewport.x.max(viewport.y) * 0.16,
        points: grid.points.iter().map(|p| p.pos).collect(),
        triangles: grid.triangles(),
        outline: shape.outline.iter().map(|p| placement.apply(*p)).collect(),
        creases: shape
            .creases
            .iter()
            .map(|[a, b]| [placement.apply(*a), placement.apply(*b)])
            .collect(),
    })
}

/// Consumer of computed frames; painting pixels is entirely its business.
pub trait Renderer {
    fn render(&mut self, frame: &Frame);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn particle(x: f32, y: f32) -> Particle {
        Particle {
            pos: Vec2::new(x, y),
            vel: Vec2::ZERO,
            radius: 2.0,
        }
    }

    #[test]
    fn links_fade_with_distance() {
        let ps = [particle(0.0, 0.0), particle(75.0, 0.0), particle(400.0, 0.0)];
        let ls = links(&ps, 150.0);
        assert_eq!(ls.len(), 1);
        assert_eq!((ls[0].a, ls[0].b), (0, 1));
        assert!((ls[0].strength - 0.25).abs() < 1e-6);
    }

    #[test]
    fn hidden_mesh_is_omitted() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let viewport = Vec2::new(800.0, 600.0);
        let mesh = MeshPoseScheduler::new(viewport, false, &MeshConfig::default(), 0.0, &mut rng);
        let frame = Frame::capture(0.0, viewport, &[particle(1.0, 1.0)], 150.0, &mesh);
        assert!(frame.mesh.is_none());
        assert_eq!(frame.particles.len(), 1);
        assert_eq!(frame.sprite_bytes().len(), 16);
    }

    #[test]
    fn visible_mesh_carries_world_space_geometry() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let viewport = Vec2::new(800.0, 600.0);
        let mesh = MeshPoseScheduler::new(viewport, true, &MeshConfig::default(), 0.0, &mut rng);
        let frame = Frame::capture(0.0, viewport, &[], 150.0, &mesh);
        let m = frame.mesh.as_ref().expect("reduced-motion mesh is visible");
        assert_eq!(m.pose.opacity, 0.55);
        assert_eq!(m.points.len(), 42);
        assert_eq!(m.outline.len(), mesh.shape().outline.len());
        assert_eq!(m.outline[0], mesh.pose().placement().apply(mesh.shape().outline[0]));
        assert!(frame.to_json().unwrap().contains("\"crane\""));
    }
}
