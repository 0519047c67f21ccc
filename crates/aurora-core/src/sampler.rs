//! Turns silhouettes into normalized point clouds.
//!
//! A source is painted into an offscreen [`AlphaCanvas`], scanned on a coarse
//! stride, and the opaque pixels become candidates. The result is either
//! exactly the requested number of points or nothing at all.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SamplerConfig;
use crate::error::Result;
use crate::raster::{target_font, AlphaCanvas, RasterProvider};

#[derive(Debug, Clone, PartialEq)]
pub enum TargetSource {
    /// Bold text centred on `center`, in raster pixels, at an em size of `font_px`.
    Text {
        text: String,
        width: u32,
        height: u32,
        center: Vec2,
        font_px: f32,
    },
    /// Closed outline in normalized [0, 1]² raster coordinates.
    Silhouette {
        outline: Vec<Vec2>,
        width: u32,
        height: u32,
    },
}

impl TargetSource {
    pub fn size(&self) -> (u32, u32) {
        match self {
            TargetSource::Text { width, height, .. }
            | TargetSource::Silhouette { width, height, .. } => (*width, *height),
        }
    }

    fn paint(&self, canvas: &mut AlphaCanvas) -> Result<()> {
        canvas.clear();
        match self {
            TargetSource::Text {
                text,
                center,
                font_px,
                ..
            } => canvas.fill_text(&target_font()?, text, *center, *font_px),
            TargetSource::Silhouette {
                outline,
                width,
                height,
            } => {
                let scale = Vec2::new(*width as f32, *height as f32);
                let points: Vec<Vec2> = outline.iter().map(|p| *p * scale).collect();
                canvas.fill_polygon(&points);
            }
        }
        Ok(())
    }
}

/// Viewport rectangle a normalized cloud is stretched into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetBox {
    pub center: Vec2,
    pub size: Vec2,
}

#[derive(Debug, Clone, Copy)]
pub struct TargetSampler {
    stride: u32,
    alpha_threshold: u8,
}

impl TargetSampler {
    pub fn new(config: &SamplerConfig) -> Self {
        Self {
            stride: config.stride.max(1),
            alpha_threshold: config.alpha_threshold,
        }
    }

    /// Render `source` offscreen and sample `count` normalized points from it.
    ///
    /// Empty when no canvas is available or nothing opaque was painted.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        raster: &mut dyn RasterProvider,
        source: &TargetSource,
        count: usize,
        rng: &mut R,
    ) -> Vec<Vec2> {
        let (width, height) = source.size();
        let Some(mut canvas) = raster.offscreen(width, height) else {
            warn!("no offscreen context for {width}x{height} target; morph disabled");
            return Vec::new();
        };
        if let Err(e) = source.paint(&mut canvas) {
            warn!("could not paint {width}x{height} target: {e}; morph disabled");
            return Vec::new();
        }
        self.sample_canvas(&canvas, count, rng)
    }

    /// Sample `count` points from an already painted canvas.
    pub fn sample_canvas<R: Rng + ?Sized>(
        &self,
        canvas: &AlphaCanvas,
        count: usize,
        rng: &mut R,
    ) -> Vec<Vec2> {
        let (w, h) = (canvas.width(), canvas.height());
        let mut candidates = Vec::new();
        for y in (0..h).step_by(self.stride as usize) {
            for x in (0..w).step_by(self.stride as usize) {
                if canvas.alpha(x, y) > self.alpha_threshold {
                    candidates.push(Vec2::new(
                        (x as f32 + rng.random::<f32>()) / w as f32,
                        (y as f32 + rng.random::<f32>()) / h as f32,
                    ));
                }
            }
        }
        if candidates.is_empty() {
            warn!("target raster {w}x{h} has no opaque pixels; morph disabled");
            return Vec::new();
        }
        debug!("sampled {} candidates from {w}x{h} raster", candidates.len());
        candidates.iter().cycle().take(count).copied().collect()
    }
}

/// Re-anchor normalized points into `target` in viewport space.
pub fn map_to_viewport(points: &[Vec2], target: &TargetBox) -> Vec<Vec2> {
    points
        .iter()
        .map(|p| target.center + (*p - Vec2::splat(0.5)) * target.size)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::SoftwareRaster;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct NoContext;

    impl RasterProvider for NoContext {
        fn offscreen(&mut self, _width: u32, _height: u32) -> Option<AlphaCanvas> {
            None
        }
    }

    fn sampler() -> TargetSampler {
        TargetSampler::new(&SamplerConfig::default())
    }

    fn square() -> TargetSource {
        TargetSource::Silhouette {
            outline: vec![
                Vec2::new(0.25, 0.25),
                Vec2::new(0.75, 0.25),
                Vec2::new(0.75, 0.75),
                Vec2::new(0.25, 0.75),
            ],
            width: 40,
            height: 40,
        }
    }

    #[test]
    fn returns_exactly_count_points_by_cycling() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        // 20x20 opaque square on stride 2 gives 100 candidates
        for count in [0, 1, 37, 100, 250] {
            let points = sampler().sample(&mut SoftwareRaster, &square(), count, &mut rng);
            assert_eq!(points.len(), count);
        }
    }

    #[test]
    fn points_are_normalized_inside_the_silhouette() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let points = sampler().sample(&mut SoftwareRaster, &square(), 80, &mut rng);
        for p in points {
            assert!((0.25..0.76).contains(&p.x), "{p:?}");
            assert!((0.25..0.76).contains(&p.y), "{p:?}");
        }
    }

    #[test]
    fn blank_or_missing_raster_gives_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let blank = TargetSource::Text {
            text: "   ".into(),
            width: 64,
            height: 32,
            center: Vec2::new(32.0, 16.0),
            font_px: 20.0,
        };
        assert!(sampler().sample(&mut SoftwareRaster, &blank, 50, &mut rng).is_empty());
        assert!(sampler().sample(&mut NoContext, &square(), 50, &mut rng).is_empty());
    }

    #[test]
    fn text_source_produces_points() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let fyi = TargetSource::Text {
            text: "FYI".into(),
            width: 420,
            height: 180,
            center: Vec2::new(210.0, 96.0),
            font_px: 120.0,
        };
        assert_eq!(sampler().sample(&mut SoftwareRaster, &fyi, 90, &mut rng).len(), 90);
    }

    #[test]
    fn mapping_stretches_around_box_centre() {
        let target = TargetBox {
            center: Vec2::new(400.0, 300.0),
            size: Vec2::new(200.0, 100.0),
        };
        let mapped = map_to_viewport(&[Vec2::ZERO, Vec2::splat(0.5), Vec2::ONE], &target);
        assert_eq!(mapped[0], Vec2::new(300.0, 250.0));
        assert_eq!(mapped[1], Vec2::new(400.0, 300.0));
        assert_eq!(mapped[2], Vec2::new(500.0, 350.0));
    }
}
