//! Per-mode target point sets and the viewport boxes they are anchored into.

use glam::Vec2;
use rand::Rng;
use tracing::{debug, info};

use crate::config::{MorphConfig, TargetLayout};
use crate::morph::MorphMode;
use crate::raster::RasterProvider;
use crate::sampler::{map_to_viewport, TargetBox, TargetSampler, TargetSource};
use crate::shapes::ICELAND_OUTLINE;

impl MorphMode {
    /// Offscreen silhouette each mode is sampled from.
    pub fn source(self) -> TargetSource {
        match self {
            MorphMode::Fyi => TargetSource::Text {
                text: "FYI".into(),
                width: 420,
                height: 180,
                center: Vec2::new(210.0, 96.0),
                font_px: 120.0,
            },
            MorphMode::Iceland => TargetSource::Silhouette {
                outline: ICELAND_OUTLINE.iter().map(|p| Vec2::from(*p)).collect(),
                width: 360,
                height: 240,
            },
        }
    }
}

/// Pick an anchor from `layout` and size the box relative to `viewport`.
pub fn random_box<R: Rng + ?Sized>(layout: &TargetLayout, viewport: Vec2, rng: &mut R) -> TargetBox {
    let anchor = if layout.anchors.is_empty() {
        [0.5, 0.5]
    } else {
        layout.anchors[rng.random_range(0..layout.anchors.len())]
    };
    let jitter = |rng: &mut R| (rng.random::<f32>() - 0.5) * layout.jitter;
    let center = Vec2::new(
        viewport.x * (anchor[0] + jitter(&mut *rng)),
        viewport.y * (anchor[1] + jitter(&mut *rng)),
    );
    let size = Vec2::new(
        viewport.x * layout.width.sample(rng) as f32,
        viewport.y * layout.height.sample(rng) as f32,
    );
    TargetBox { center, size }
}

/// Normalized clouds for every mode plus the viewport-space set of the current morph.
#[derive(Debug, Clone, Default)]
pub struct TargetSets {
    iceland: Vec<Vec2>,
    fyi: Vec<Vec2>,
    current: Vec<Vec2>,
    current_box: Option<TargetBox>,
}

impl TargetSets {
    /// Sample one point per particle for every mode.
    pub fn build<R: Rng + ?Sized>(
        sampler: &TargetSampler,
        raster: &mut dyn RasterProvider,
        count: usize,
        rng: &mut R,
    ) -> Self {
        let mut sets = Self::default();
        if count == 0 {
            return sets;
        }
        for mode in MorphMode::ALL {
            let points = sampler.sample(raster, &mode.source(), count, rng);
            debug!("{mode} target set: {} points", points.len());
            match mode {
                MorphMode::Iceland => sets.iceland = points,
                MorphMode::Fyi => sets.fyi = points,
            }
        }
        sets
    }

    pub fn normalized(&self, mode: MorphMode) -> &[Vec2] {
        match mode {
            MorphMode::Iceland => &self.iceland,
            MorphMode::Fyi => &self.fyi,
        }
    }

    pub fn current(&self) -> &[Vec2] {
        &self.current
    }

    pub fn current_box(&self) -> Option<TargetBox> {
        self.current_box
    }

    /// Re-anchor `mode`'s cloud into a freshly picked box. Empty clouds leave nothing to chase.
    pub fn retarget<R: Rng + ?Sized>(
        &mut self,
        mode: MorphMode,
        viewport: Vec2,
        config: &MorphConfig,
        rng: &mut R,
    ) {
        let norm = self.normalized(mode);
        if norm.is_empty() {
            self.current.clear();
            self.current_box = None;
            return;
        }
        let target = random_box(&config.mode(mode).layout, viewport, rng);
        let mapped = map_to_viewport(norm, &target);
        self.current = mapped;
        self.current_box = Some(target);
        info!(
            "{mode} targets anchored at ({:.0}, {:.0}) size {:.0}x{:.0}",
            target.center.x, target.center.y, target.size.x, target.size.y
        );
    }
}
