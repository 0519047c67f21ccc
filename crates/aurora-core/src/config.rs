//! Engine tuning knobs. Every section has serde defaults, so a partial TOML
//! file only overrides what it names.

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::morph::MorphMode;
use crate::shapes::ShapeName;

/// Half-open `[min, max)` range drawn uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomRange {
    pub min: f64,
    pub max: f64,
}

impl RandomRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.min + rng.random::<f64>() * (self.max - self.min)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value < self.max
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub particles: ParticleConfig,
    pub mesh: MeshConfig,
    pub morph: MorphConfig,
    pub sampler: SamplerConfig,
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading engine config from {}", path.display());
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.particles;
        if p.min_count > p.max_count {
            return Err(invalid("particles.min_count exceeds particles.max_count"));
        }
        if !(0.0..=1.0).contains(&p.damping) {
            return Err(invalid("particles.damping must lie in [0, 1]"));
        }
        if p.max_speed <= 0.0 {
            return Err(invalid("particles.max_speed must be positive"));
        }
        if self.mesh.anchors.is_empty() {
            return Err(invalid("mesh.anchors must not be empty"));
        }
        if self.mesh.shape_rotation.is_empty() {
            return Err(invalid("mesh.shape_rotation must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.morph.participation) {
            return Err(invalid("morph.participation must lie in [0, 1]"));
        }
        for mode in MorphMode::ALL {
            if self.morph.mode(mode).layout.anchors.is_empty() {
                return Err(invalid(&format!("morph.{mode}.layout.anchors must not be empty")));
            }
        }
        if self.sampler.stride == 0 {
            return Err(invalid("sampler.stride must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> EngineError {
    EngineError::InvalidConfig(message.to_owned())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// Viewport area that earns one particle.
    pub area_per_particle: f32,
    pub min_count: usize,
    pub max_count: usize,
    pub reduced_motion_cap: usize,
    pub count_scale: f32,
    pub radius_min: f32,
    pub radius_max: f32,
    /// Initial velocity components are drawn from ±initial_speed/2.
    pub initial_speed: f32,
    pub max_speed: f32,
    pub damping: f32,
    pub wrap_margin: f32,
    pub pointer_radius: f32,
    pub pointer_strength: f32,
    /// Particles closer than this are joined by a link in the frame.
    pub link_distance: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            area_per_particle: 18_000.0,
            min_count: 26,
            max_count: 90,
            reduced_motion_cap: 24,
            count_scale: 1.0,
            radius_min: 1.0,
            radius_max: 2.6,
            initial_speed: 0.35,
            max_speed: 1.25,
            damping: 0.985,
            wrap_margin: 40.0,
            pointer_radius: 150.0,
            pointer_strength: 0.018,
            link_distance: 150.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub col_spacing: f32,
    pub min_cols: f32,
    pub max_cols: f32,
    pub row_spacing: f32,
    pub min_rows: f32,
    pub max_rows: f32,
    /// Mesh width as a fraction of the shorter viewport side.
    pub size_factor: f32,
    pub min_width: f32,
    pub max_width: f32,
    pub aspect: f32,
    /// Base offsets are jittered by ±point_jitter/2.
    pub point_jitter: f32,
    pub amplitude: RandomRange,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            col_spacing: 130.0,
            min_cols: 7.0,
            max_cols: 11.0,
            row_spacing: 160.0,
            min_rows: 6.0,
            max_rows: 10.0,
            size_factor: 0.72,
            min_width: 240.0,
            max_width: 560.0,
            aspect: 0.62,
            point_jitter: 18.0,
            amplitude: RandomRange::new(10.0, 24.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub fade_in_ms: f64,
    pub fade_out_ms: f64,
    pub hold_ms: RandomRange,
    pub hidden_ms: RandomRange,
    /// Normalized viewport positions the mesh travels between.
    pub anchors: Vec<[f32; 2]>,
    /// Anchors are jittered by ±anchor_jitter/2 of the viewport.
    pub anchor_jitter: f32,
    pub max_rotation: f32,
    pub oscillation_speed: f64,
    pub shape_rotation: Vec<ShapeName>,
    pub initial_shape: ShapeName,
    pub reduced_motion_opacity: f32,
    pub grid: GridConfig,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            fade_in_ms: 1200.0,
            fade_out_ms: 1400.0,
            hold_ms: RandomRange::new(5200.0, 10_400.0),
            hidden_ms: RandomRange::new(1200.0, 3600.0),
            anchors: vec![
                [0.28, 0.26],
                [0.72, 0.26],
                [0.22, 0.52],
                [0.78, 0.52],
                [0.34, 0.78],
                [0.66, 0.78],
            ],
            anchor_jitter: 0.05,
            max_rotation: 0.7,
            oscillation_speed: 0.000_35,
            shape_rotation: vec![ShapeName::Crane, ShapeName::Iceland],
            initial_shape: ShapeName::Crane,
            reduced_motion_opacity: 0.55,
            grid: GridConfig::default(),
        }
    }
}

/// Where a morph target lands in the viewport: one of `anchors`, jittered,
/// with its extent drawn from `width`/`height` (fractions of the viewport).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetLayout {
    pub anchors: Vec<[f32; 2]>,
    pub jitter: f32,
    pub width: RandomRange,
    pub height: RandomRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MorphModeConfig {
    /// Delay from engine start until the first trigger.
    pub first_delay_ms: f64,
    pub base_delay_ms: f64,
    pub jitter_ms: f64,
    pub in_ms: f64,
    pub hold_ms: f64,
    pub out_ms: f64,
    pub strength: f32,
    pub layout: TargetLayout,
}

impl MorphModeConfig {
    pub fn iceland() -> Self {
        Self {
            first_delay_ms: 30_000.0,
            base_delay_ms: 55_000.0,
            jitter_ms: 35_000.0,
            in_ms: 4200.0,
            hold_ms: 2400.0,
            out_ms: 6200.0,
            strength: 0.0021,
            layout: TargetLayout {
                anchors: vec![
                    [0.48, 0.62],
                    [0.56, 0.58],
                    [0.42, 0.66],
                    [0.62, 0.70],
                    [0.38, 0.72],
                ],
                jitter: 0.06,
                width: RandomRange::new(0.58, 0.68),
                height: RandomRange::new(0.40, 0.48),
            },
        }
    }

    pub fn fyi() -> Self {
        Self {
            first_delay_ms: 12_000.0,
            base_delay_ms: 70_000.0,
            jitter_ms: 50_000.0,
            in_ms: 3800.0,
            hold_ms: 1900.0,
            out_ms: 5600.0,
            strength: 0.0023,
            layout: TargetLayout {
                anchors: vec![
                    [0.35, 0.28],
                    [0.50, 0.30],
                    [0.65, 0.26],
                    [0.40, 0.40],
                    [0.62, 0.42],
                ],
                jitter: 0.06,
                width: RandomRange::new(0.52, 0.62),
                height: RandomRange::new(0.22, 0.28),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphConfig {
    pub participation: f32,
    /// Checked front to back when several triggers are due on the same tick.
    pub priority: Vec<MorphMode>,
    #[serde(deserialize_with = "iceland_section")]
    pub iceland: MorphModeConfig,
    #[serde(deserialize_with = "fyi_section")]
    pub fyi: MorphModeConfig,
}

fn iceland_section<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<MorphModeConfig, D::Error> {
    Ok(ModeOverrides::deserialize(d)?.over(MorphModeConfig::iceland()))
}

fn fyi_section<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<MorphModeConfig, D::Error> {
    Ok(ModeOverrides::deserialize(d)?.over(MorphModeConfig::fyi()))
}

/// A `[morph.<mode>]` table as written; unnamed fields keep that mode's defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ModeOverrides {
    first_delay_ms: Option<f64>,
    base_delay_ms: Option<f64>,
    jitter_ms: Option<f64>,
    in_ms: Option<f64>,
    hold_ms: Option<f64>,
    out_ms: Option<f64>,
    strength: Option<f32>,
    layout: LayoutOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LayoutOverrides {
    anchors: Option<Vec<[f32; 2]>>,
    jitter: Option<f32>,
    width: Option<RandomRange>,
    height: Option<RandomRange>,
}

impl ModeOverrides {
    fn over(self, base: MorphModeConfig) -> MorphModeConfig {
        let layout = base.layout;
        MorphModeConfig {
            first_delay_ms: self.first_delay_ms.unwrap_or(base.first_delay_ms),
            base_delay_ms: self.base_delay_ms.unwrap_or(base.base_delay_ms),
            jitter_ms: self.jitter_ms.unwrap_or(base.jitter_ms),
            in_ms: self.in_ms.unwrap_or(base.in_ms),
            hold_ms: self.hold_ms.unwrap_or(base.hold_ms),
            out_ms: self.out_ms.unwrap_or(base.out_ms),
            strength: self.strength.unwrap_or(base.strength),
            layout: TargetLayout {
                anchors: self.layout.anchors.unwrap_or(layout.anchors),
                jitter: self.layout.jitter.unwrap_or(layout.jitter),
                width: self.layout.width.unwrap_or(layout.width),
                height: self.layout.height.unwrap_or(layout.height),
            },
        }
    }
}

impl MorphConfig {
    pub fn mode(&self, mode: MorphMode) -> &MorphModeConfig {
        match mode {
            MorphMode::Iceland => &self.iceland,
            MorphMode::Fyi => &self.fyi,
        }
    }
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            participation: 0.38,
            priority: vec![MorphMode::Iceland, MorphMode::Fyi],
            iceland: MorphModeConfig::iceland(),
            fyi: MorphModeConfig::fyi(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Pixel step of the scan in both directions.
    pub stride: u32,
    /// Pixels must exceed this alpha to become candidates.
    pub alpha_threshold: u8,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            stride: 2,
            alpha_threshold: 40,
        }
    }
}
