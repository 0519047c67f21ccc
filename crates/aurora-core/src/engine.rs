//! The engine context: owns every piece of animation state and advances it
//! once per host frame.

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::frame::{Frame, Renderer};
use crate::mesh::MeshPoseScheduler;
use crate::morph::{MorphMode, MorphScheduler, MorphTiming};
use crate::particles::{MorphPull, ParticleField, StepContext};
use crate::raster::{RasterProvider, SoftwareRaster};
use crate::sampler::TargetSampler;
use crate::targets::TargetSets;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    fn validate(&self) -> Result<()> {
        let ok = |v: f32| v.is_finite() && v >= 0.0;
        if ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(EngineError::InvalidViewport {
                width: self.width,
                height: self.height,
            })
        }
    }
}

pub struct Engine<R: Renderer> {
    config: EngineConfig,
    rng: ChaCha8Rng,
    viewport: Viewport,
    reduced_motion: bool,
    field: ParticleField,
    mesh: MeshPoseScheduler,
    morph: MorphScheduler,
    targets: TargetSets,
    sampler: TargetSampler,
    raster: Box<dyn RasterProvider>,
    renderer: R,
    pointer: Option<Vec2>,
    running: bool,
    needs_redraw: bool,
    time: f64,
    frames_rendered: u64,
}

impl<R: Renderer> Engine<R> {
    /// Bring the engine up with the in-memory rasterizer for target sampling.
    ///
    /// `surface` is `None` when the host could not provide anything to draw on,
    /// in which case the animation stays disabled.
    pub fn initialize(
        config: EngineConfig,
        viewport: Viewport,
        reduced_motion: bool,
        now: f64,
        surface: Option<R>,
    ) -> Result<Self> {
        Self::initialize_with_raster(
            config,
            viewport,
            reduced_motion,
            now,
            surface,
            Box::new(SoftwareRaster),
        )
    }

    pub fn initialize_with_raster(
        config: EngineConfig,
        viewport: Viewport,
        reduced_motion: bool,
        now: f64,
        surface: Option<R>,
        mut raster: Box<dyn RasterProvider>,
    ) -> Result<Self> {
        let renderer = surface.ok_or(EngineError::SurfaceUnavailable)?;
        viewport.validate()?;
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::seed_from_u64(rand::random()),
        };
        let size = viewport.size();
        let field = ParticleField::initialize(size.x, size.y, reduced_motion, &config.particles, &mut rng);
        let mesh = MeshPoseScheduler::new(size, reduced_motion, &config.mesh, now, &mut rng);
        let sampler = TargetSampler::new(&config.sampler);
        let targets = TargetSets::build(&sampler, raster.as_mut(), field.len(), &mut rng);
        let morph = MorphScheduler::new(&config.morph, now);

        info!(
            "aurora engine up: {}x{}, {} particles, mesh {}x{}, reduced motion {}",
            viewport.width,
            viewport.height,
            field.len(),
            mesh.grid().cols,
            mesh.grid().rows,
            reduced_motion
        );

        let mut engine = Self {
            config,
            rng,
            viewport,
            reduced_motion,
            field,
            mesh,
            morph,
            targets,
            sampler,
            raster,
            renderer,
            pointer: None,
            running: false,
            needs_redraw: true,
            time: now,
            frames_rendered: 0,
        };
        if reduced_motion {
            // one static frame, then nothing until a redraw is requested
            engine.render();
        } else {
            engine.start();
        }
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn mesh(&self) -> &MeshPoseScheduler {
        &self.mesh
    }

    pub fn morph(&self) -> &MorphScheduler {
        &self.morph
    }

    pub fn targets(&self) -> &TargetSets {
        &self.targets
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        debug!("engine started");
    }

    pub fn stop(&mut self) {
        if self.running {
            debug!("engine stopped");
        }
        self.running = false;
    }

    /// Mark the next frame dirty; under reduced motion, paint it right away.
    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
        if self.reduced_motion {
            self.render();
        }
    }

    /// Hidden documents stop the simulation; becoming visible repaints and resumes.
    pub fn set_visible(&mut self, visible: bool) {
        if visible {
            self.request_redraw();
            self.start();
        } else {
            self.stop();
        }
    }

    pub fn set_pointer(&mut self, position: Vec2) {
        self.pointer = Some(position);
    }

    pub fn clear_pointer(&mut self) {
        self.pointer = None;
    }

    /// Rebuild particles, mesh geometry and target sets for a new viewport.
    pub fn resize(&mut self, viewport: Viewport) -> Result<()> {
        viewport.validate()?;
        self.viewport = viewport;
        let size = viewport.size();
        self.field = ParticleField::initialize(
            size.x,
            size.y,
            self.reduced_motion,
            &self.config.particles,
            &mut self.rng,
        );
        self.mesh.resize(size, &mut self.rng);
        self.targets = TargetSets::build(
            &self.sampler,
            self.raster.as_mut(),
            self.field.len(),
            &mut self.rng,
        );
        if let Some(mode) = self.morph.mode() {
            self.targets.retarget(mode, size, &self.config.morph, &mut self.rng);
        }
        self.needs_redraw = true;
        info!(
            "resized to {}x{}: {} particles, mesh {}x{}",
            viewport.width,
            viewport.height,
            self.field.len(),
            self.mesh.grid().cols,
            self.mesh.grid().rows
        );
        Ok(())
    }

    /// Begin `mode` now, regardless of its trigger clock.
    pub fn start_morph(&mut self, mode: MorphMode, now: f64) {
        let timing = MorphTiming::from(self.config.morph.mode(mode));
        self.morph.start_morph(mode, now, timing, &mut self.rng);
        self.retarget(mode);
    }

    /// One host frame. Returns whether a frame was rendered.
    pub fn tick(&mut self, now: f64) -> bool {
        if !self.running {
            return false;
        }
        self.time = now;
        if !self.reduced_motion {
            if let Some(mode) = self.morph.poll(now, &mut self.rng) {
                self.retarget(mode);
            }
            self.simulate(now);
        }
        self.render()
    }

    /// Advance mesh and particles to `now` without rendering.
    pub fn simulate(&mut self, now: f64) {
        if self.reduced_motion {
            return;
        }
        self.time = now;
        self.mesh.update(now, &mut self.rng);

        let weight = self.morph.weight(now);
        let pull = self.morph.active().map(|event| MorphPull {
            weight,
            strength: event.timing.strength,
            seed: event.seed,
            participation: event.participation,
            targets: self.targets.current(),
        });
        self.field.step(&StepContext {
            morph: pull,
            pointer: self.pointer,
        });
    }

    pub fn frame(&self) -> Frame {
        Frame::capture(
            self.time,
            self.viewport.size(),
            self.field.particles(),
            self.config.particles.link_distance,
            &self.mesh,
        )
    }

    /// Release the engine, handing the renderer back to the host.
    pub fn dispose(mut self) -> R {
        self.stop();
        info!("engine disposed after {} frames", self.frames_rendered);
        self.renderer
    }

    fn retarget(&mut self, mode: MorphMode) {
        self.targets
            .retarget(mode, self.viewport.size(), &self.config.morph, &mut self.rng);
        self.needs_redraw = true;
    }

    fn render(&mut self) -> bool {
        if self.reduced_motion && !self.needs_redraw {
            return false;
        }
        self.needs_redraw = false;
        let frame = self.frame();
        self.renderer.render(&frame);
        self.frames_rendered += 1;
        true
    }
}
