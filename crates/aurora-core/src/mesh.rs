//! The origami mesh overlay: a jittered point grid under one rigid pose that
//! drifts between anchors, fading in and out once per cycle.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{GridConfig, MeshConfig};
use crate::easing::{clamp, ease_in_out_cubic, lerp, progress};
use crate::shapes::{self, ShapeDefinition};

/// Position and rotation without opacity; the endpoints of a motion segment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub position: Vec2,
    pub rotation: f32,
}

impl Placement {
    /// `from` at `u == 0`, `to` at `u == 1`, bit for bit.
    pub fn interpolate(from: Placement, to: Placement, u: f32) -> Placement {
        Placement {
            position: Vec2::new(
                lerp(from.position.x, to.position.x, u),
                lerp(from.position.y, to.position.y, u),
            ),
            rotation: lerp(from.rotation, to.rotation, u),
        }
    }

    /// Rotate a mesh-local point by this placement and move it into the viewport.
    #[inline]
    pub fn apply(&self, local: Vec2) -> Vec2 {
        let (sin, cos) = self.rotation.sin_cos();
        self.position + Vec2::new(local.x * cos - local.y * sin, local.x * sin + local.y * cos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec2,
    pub rotation: f32,
    pub opacity: f32,
}

impl Pose {
    pub fn placement(&self) -> Placement {
        Placement {
            position: self.position,
            rotation: self.rotation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshPhase {
    FadeIn,
    Hold,
    FadeOut,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSegment {
    pub from: Placement,
    pub to: Placement,
    pub start: f64,
    pub fade_in_ms: f64,
    pub hold_ms: f64,
    pub fade_out_ms: f64,
    pub hidden_ms: f64,
}

impl MotionSegment {
    /// The span the placement travels over.
    pub fn move_ms(&self) -> f64 {
        self.fade_in_ms + self.hold_ms + self.fade_out_ms
    }

    pub fn total_ms(&self) -> f64 {
        self.move_ms() + self.hidden_ms
    }

    pub fn is_complete(&self, elapsed: f64) -> bool {
        elapsed > self.total_ms()
    }

    pub fn phase(&self, elapsed: f64) -> MeshPhase {
        if elapsed < self.fade_in_ms {
            MeshPhase::FadeIn
        } else if elapsed < self.fade_in_ms + self.hold_ms {
            MeshPhase::Hold
        } else if elapsed < self.move_ms() {
            MeshPhase::FadeOut
        } else {
            MeshPhase::Hidden
        }
    }

    pub fn opacity(&self, elapsed: f64) -> f32 {
        match self.phase(elapsed) {
            MeshPhase::FadeIn => ease_in_out_cubic(progress(elapsed, self.fade_in_ms)),
            MeshPhase::Hold => 1.0,
            MeshPhase::FadeOut => {
                let out = elapsed - self.fade_in_ms - self.hold_ms;
                1.0 - ease_in_out_cubic(progress(out, self.fade_out_ms))
            }
            MeshPhase::Hidden => 0.0,
        }
    }

    /// Placement eased over the whole move span, independent of the fade curve.
    pub fn placement_at(&self, elapsed: f64) -> Placement {
        let u = ease_in_out_cubic(progress(elapsed, self.move_ms()));
        Placement::interpolate(self.from, self.to, u)
    }

    pub fn pose_at(&self, elapsed: f64) -> Pose {
        let placement = self.placement_at(elapsed);
        Pose {
            position: placement.position,
            rotation: placement.rotation,
            opacity: self.opacity(elapsed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshPoint {
    /// Mesh-local rest offset.
    pub base: Vec2,
    /// Live viewport position.
    pub pos: Vec2,
    pub amplitude: Vec2,
    pub phase: f32,
}

impl MeshPoint {
    /// Mesh-local offset including the oscillation at time `t`.
    pub fn local_at(&self, t: f64, speed: f64) -> Vec2 {
        let a = (t * speed) as f32 + self.phase;
        let b = (t * speed * 0.9) as f32 + self.phase;
        Vec2::new(
            self.base.x + a.sin() * self.amplitude.x,
            self.base.y + b.cos() * self.amplitude.y,
        )
    }
}

/// Row-major `cols x rows` lattice of points centred on the pose origin.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGrid {
    pub cols: usize,
    pub rows: usize,
    pub size: Vec2,
    pub points: Vec<MeshPoint>,
}

impl MeshGrid {
    pub fn dimensions(viewport: Vec2, grid: &GridConfig) -> (usize, usize, Vec2) {
        let cols = clamp(viewport.x / grid.col_spacing, grid.min_cols, grid.max_cols).floor() as usize;
        let rows = clamp(viewport.y / grid.row_spacing, grid.min_rows, grid.max_rows).floor() as usize;
        let width = clamp(viewport.x.min(viewport.y) * grid.size_factor, grid.min_width, grid.max_width);
        (cols, rows, Vec2::new(width, width * grid.aspect))
    }

    pub fn generate<R: Rng + ?Sized>(viewport: Vec2, grid: &GridConfig, rng: &mut R) -> Self {
        let (cols, rows, size) = Self::dimensions(viewport, grid);
        let fraction = |i: usize, n: usize| if n <= 1 { 0.5 } else { i as f32 / (n - 1) as f32 };
        let mut points = Vec::with_capacity(cols * rows);
        for y in 0..rows {
            for x in 0..cols {
                let base = Vec2::new(
                    (fraction(x, cols) - 0.5) * size.x + (rng.random::<f32>() - 0.5) * grid.point_jitter,
                    (fraction(y, rows) - 0.5) * size.y + (rng.random::<f32>() - 0.5) * grid.point_jitter,
                );
                points.push(MeshPoint {
                    base,
                    pos: Vec2::ZERO,
                    amplitude: Vec2::new(
                        grid.amplitude.sample(rng) as f32,
                        grid.amplitude.sample(rng) as f32,
                    ),
                    phase: rng.random::<f32>() * TAU,
                });
            }
        }
        Self {
            cols,
            rows,
            size,
            points,
        }
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.cols + x
    }

    /// Two triangles per cell, as point indices.
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        let mut out = Vec::with_capacity(self.cols.saturating_sub(1) * self.rows.saturating_sub(1) * 2);
        for y in 0..self.rows.saturating_sub(1) {
            for x in 0..self.cols.saturating_sub(1) {
                let p00 = self.index(x, y) as u32;
                let p10 = self.index(x + 1, y) as u32;
                let p01 = self.index(x, y + 1) as u32;
                let p11 = self.index(x + 1, y + 1) as u32;
                out.push([p00, p10, p01]);
                out.push([p10, p11, p01]);
            }
        }
        out
    }
}

/// Drives the mesh pose through fadeIn → hold → fadeOut → hidden, then starts
/// a new segment with the next shape in the rotation.
#[derive(Debug, Clone)]
pub struct MeshPoseScheduler {
    config: MeshConfig,
    viewport: Vec2,
    reduced_motion: bool,
    segment: MotionSegment,
    pose: Pose,
    shape: ShapeDefinition,
    grid: MeshGrid,
    cycles: u64,
}

impl MeshPoseScheduler {
    pub fn new<R: Rng + ?Sized>(
        viewport: Vec2,
        reduced_motion: bool,
        config: &MeshConfig,
        now: f64,
        rng: &mut R,
    ) -> Self {
        let initial = random_placement(viewport, config, rng);
        let next = random_placement(viewport, config, rng);
        let segment = draw_segment(initial, next, now, config, rng);
        let grid = MeshGrid::generate(viewport, &config.grid, rng);
        let shape = shapes::generate(config.initial_shape, grid.size.x, grid.size.y);
        let opacity = if reduced_motion {
            config.reduced_motion_opacity
        } else {
            0.0
        };
        let mut scheduler = Self {
            config: config.clone(),
            viewport,
            reduced_motion,
            segment,
            pose: Pose {
                position: initial.position,
                rotation: initial.rotation,
                opacity,
            },
            shape,
            grid,
            cycles: 0,
        };
        if reduced_motion {
            scheduler.place_at_rest();
        }
        debug!(
            "mesh {}x{} ({:.0}x{:.0}), shape {}",
            scheduler.grid.cols,
            scheduler.grid.rows,
            scheduler.grid.size.x,
            scheduler.grid.size.y,
            scheduler.shape.name
        );
        scheduler
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn segment(&self) -> &MotionSegment {
        &self.segment
    }

    pub fn shape(&self) -> &ShapeDefinition {
        &self.shape
    }

    pub fn grid(&self) -> &MeshGrid {
        &self.grid
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn phase(&self, now: f64) -> MeshPhase {
        self.segment.phase(now - self.segment.start)
    }

    /// Rebuild grid and shape for a new viewport. Segment timing carries on;
    /// its endpoints are rescaled so the mesh stays where it was, proportionally.
    pub fn resize<R: Rng + ?Sized>(&mut self, viewport: Vec2, rng: &mut R) {
        let scale = if self.viewport.x > 0.0 && self.viewport.y > 0.0 {
            viewport / self.viewport
        } else {
            Vec2::ONE
        };
        self.segment.from.position *= scale;
        self.segment.to.position *= scale;
        self.pose.position *= scale;
        self.viewport = viewport;
        self.grid = MeshGrid::generate(viewport, &self.config.grid, rng);
        self.shape = shapes::generate(self.shape.name, self.grid.size.x, self.grid.size.y);
        if self.reduced_motion {
            self.place_at_rest();
        }
        debug!("mesh resized to {}x{}", self.grid.cols, self.grid.rows);
    }

    /// Advance pose and point kinematics to `now`. Frozen under reduced motion.
    pub fn update<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) {
        if self.reduced_motion {
            return;
        }
        if self.segment.is_complete(now - self.segment.start) {
            self.begin_cycle(now, rng);
        }
        self.pose = self.segment.pose_at(now - self.segment.start);

        let placement = self.pose.placement();
        let speed = self.config.oscillation_speed;
        for point in &mut self.grid.points {
            point.pos = placement.apply(point.local_at(now, speed));
        }
    }

    fn begin_cycle<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) {
        let shape = shapes::next_in_rotation(&self.config.shape_rotation, self.shape.name);
        self.shape = shapes::generate(shape, self.grid.size.x, self.grid.size.y);
        let next = random_placement(self.viewport, &self.config, rng);
        self.segment = draw_segment(self.segment.to, next, now, &self.config, rng);
        self.cycles += 1;
        info!(
            "mesh cycle {}: shape {shape}, hold {:.0}ms, hidden {:.0}ms",
            self.cycles, self.segment.hold_ms, self.segment.hidden_ms
        );
    }

    fn place_at_rest(&mut self) {
        let placement = self.pose.placement();
        for point in &mut self.grid.points {
            point.pos = placement.apply(point.base);
        }
    }
}

/// A jittered anchor with a random tilt.
pub fn random_placement<R: Rng + ?Sized>(viewport: Vec2, config: &MeshConfig, rng: &mut R) -> Placement {
    let anchor = if config.anchors.is_empty() {
        [0.5, 0.5]
    } else {
        config.anchors[rng.random_range(0..config.anchors.len())]
    };
    let jitter = config.anchor_jitter;
    let x = viewport.x * (anchor[0] + (rng.random::<f32>() - 0.5) * jitter);
    let y = viewport.y * (anchor[1] + (rng.random::<f32>() - 0.5) * jitter);
    let rotation = (rng.random::<f32>() - 0.5) * 2.0 * config.max_rotation;
    Placement {
        position: Vec2::new(x, y),
        rotation,
    }
}

fn draw_segment<R: Rng + ?Sized>(
    from: Placement,
    to: Placement,
    now: f64,
    config: &MeshConfig,
    rng: &mut R,
) -> MotionSegment {
    MotionSegment {
        from,
        to,
        start: now,
        fade_in_ms: config.fade_in_ms,
        hold_ms: config.hold_ms.sample(rng),
        fade_out_ms: config.fade_out_ms,
        hidden_ms: config.hidden_ms.sample(rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::ShapeName;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn segment() -> MotionSegment {
        MotionSegment {
            from: Placement {
                position: Vec2::new(120.5, 80.25),
                rotation: -0.4,
            },
            to: Placement {
                position: Vec2::new(640.75, 512.125),
                rotation: 0.63,
            },
            start: 1000.0,
            fade_in_ms: 1200.0,
            hold_ms: 6000.0,
            fade_out_ms: 1400.0,
            hidden_ms: 2000.0,
        }
    }

    #[test]
    fn interpolation_is_exact_at_endpoints() {
        let s = segment();
        assert_eq!(Placement::interpolate(s.from, s.to, 0.0), s.from);
        assert_eq!(Placement::interpolate(s.from, s.to, 1.0), s.to);
        assert_eq!(s.placement_at(0.0), s.from);
        assert_eq!(s.placement_at(s.move_ms()), s.to);
        assert_eq!(s.placement_at(s.total_ms()), s.to);
    }

    #[test]
    fn phases_follow_the_cycle() {
        let s = segment();
        assert_eq!(s.phase(0.0), MeshPhase::FadeIn);
        assert_eq!(s.phase(1199.0), MeshPhase::FadeIn);
        assert_eq!(s.phase(1200.0), MeshPhase::Hold);
        assert_eq!(s.phase(7200.0), MeshPhase::FadeOut);
        assert_eq!(s.phase(8600.0), MeshPhase::Hidden);
        assert!(!s.is_complete(10_600.0));
        assert!(s.is_complete(10_600.5));
    }

    #[test]
    fn opacity_fades_in_holds_and_fades_out() {
        let s = segment();
        assert_eq!(s.opacity(0.0), 0.0);
        assert!(s.opacity(600.0) > 0.0 && s.opacity(600.0) < 1.0);
        assert_eq!(s.opacity(1200.0), 1.0);
        assert_eq!(s.opacity(5000.0), 1.0);
        assert!(s.opacity(7900.0) > 0.0 && s.opacity(7900.0) < 1.0);
        assert_eq!(s.opacity(8600.0), 0.0);
        assert_eq!(s.opacity(9000.0), 0.0);
    }

    #[test]
    fn grid_size_follows_viewport() {
        let grid = GridConfig::default();
        let (cols, rows, size) = MeshGrid::dimensions(Vec2::new(800.0, 600.0), &grid);
        assert_eq!((cols, rows), (7, 6));
        assert!((size.x - 432.0).abs() < 1e-3);
        assert!((size.y - 432.0 * 0.62).abs() < 1e-3);
        let (cols, rows, size) = MeshGrid::dimensions(Vec2::new(1200.0, 900.0), &grid);
        assert_eq!((cols, rows), (9, 6));
        assert_eq!(size.x, 560.0);
        let (cols, rows, _) = MeshGrid::dimensions(Vec2::new(3000.0, 3000.0), &grid);
        assert_eq!((cols, rows), (11, 10));
    }

    #[test]
    fn grid_points_are_row_major_with_triangles_per_cell() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let grid = MeshGrid::generate(Vec2::new(800.0, 600.0), &GridConfig::default(), &mut rng);
        assert_eq!(grid.points.len(), 42);
        assert_eq!(grid.triangles().len(), 6 * 5 * 2);
        assert!(grid.points[0].base.x < grid.points[1].base.x);
        assert!(grid.points[0].base.y < grid.points[grid.cols].base.y);
        for p in &grid.points {
            assert!((10.0..24.0).contains(&p.amplitude.x));
            assert!((0.0..TAU).contains(&p.phase));
        }
    }

    #[test]
    fn placements_stay_near_anchors() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let config = MeshConfig::default();
        let viewport = Vec2::new(1000.0, 1000.0);
        for _ in 0..200 {
            let p = random_placement(viewport, &config, &mut rng);
            assert!(p.rotation.abs() <= 0.7);
            let near = config.anchors.iter().any(|a| {
                (p.position.x - a[0] * 1000.0).abs() <= 25.0 && (p.position.y - a[1] * 1000.0).abs() <= 25.0
            });
            assert!(near, "{p:?}");
        }
    }

    #[test]
    fn cycle_advances_shape_and_chains_placements() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let viewport = Vec2::new(1200.0, 900.0);
        let mut mesh = MeshPoseScheduler::new(viewport, false, &MeshConfig::default(), 0.0, &mut rng);
        let first = *mesh.segment();
        assert_eq!(mesh.shape().name, ShapeName::Crane);

        let after = first.total_ms() + 1.0;
        mesh.update(after, &mut rng);
        assert_eq!(mesh.cycles(), 1);
        assert_eq!(mesh.shape().name, ShapeName::Iceland);
        let second = *mesh.segment();
        assert_eq!(second.from, first.to);
        assert_eq!(second.start, after);
        assert!(MeshConfig::default().hold_ms.contains(second.hold_ms));
        assert!(MeshConfig::default().hidden_ms.contains(second.hidden_ms));
        // fresh cycle starts at its origin, fully transparent
        assert_eq!(mesh.pose().placement(), first.to);
        assert_eq!(mesh.pose().opacity, 0.0);

        mesh.update(after + second.total_ms() + 1.0, &mut rng);
        assert_eq!(mesh.shape().name, ShapeName::Crane);
    }

    #[test]
    fn points_follow_pose_with_bounded_oscillation() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut mesh =
            MeshPoseScheduler::new(Vec2::new(800.0, 600.0), false, &MeshConfig::default(), 0.0, &mut rng);
        mesh.update(4000.0, &mut rng);
        let placement = mesh.pose().placement();
        for p in &mesh.grid().points {
            let rest = placement.apply(p.base);
            assert!((p.pos - rest).length() <= p.amplitude.length() + 1e-3);
        }
    }

    #[test]
    fn resize_rebuilds_geometry_but_keeps_timing() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut mesh =
            MeshPoseScheduler::new(Vec2::new(800.0, 600.0), false, &MeshConfig::default(), 0.0, &mut rng);
        mesh.update(3000.0, &mut rng);
        let before = *mesh.segment();
        mesh.resize(Vec2::new(1200.0, 900.0), &mut rng);
        assert_eq!(mesh.segment().start, before.start);
        assert_eq!(mesh.segment().hold_ms, before.hold_ms);
        assert_eq!((mesh.grid().cols, mesh.grid().rows), (9, 6));
        assert_eq!(mesh.grid().points.len(), 54);
        assert_eq!(mesh.shape().outline, shapes::generate(ShapeName::Crane, 560.0, 560.0 * 0.62).outline);
        assert!((mesh.segment().to.position - before.to.position * 1.5).length() < 1e-3);
    }

    #[test]
    fn reduced_motion_freezes_pose_and_points() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut mesh =
            MeshPoseScheduler::new(Vec2::new(800.0, 600.0), true, &MeshConfig::default(), 0.0, &mut rng);
        let pose = mesh.pose();
        let points = mesh.grid().points.clone();
        assert_eq!(pose.opacity, 0.55);
        for p in &points {
            assert_eq!(p.pos, pose.placement().apply(p.base));
        }
        for i in 0..500 {
            mesh.update(i as f64 * 97.0, &mut rng);
        }
        assert_eq!(mesh.pose(), pose);
        assert_eq!(mesh.grid().points, points);
        assert_eq!(mesh.cycles(), 0);
    }
}
