//! Aurora core engine: platform-agnostic particle field, origami mesh and morph scheduling.
//!
//! The host owns the frame clock and the drawing surface; everything here is
//! driven by explicit timestamps and hands back plain geometry.

pub mod config;
pub mod easing;
pub mod engine;
pub mod error;
pub mod frame;
pub mod mesh;
pub mod morph;
pub mod particles;
pub mod raster;
pub mod sampler;
pub mod shapes;
pub mod targets;

pub use config::EngineConfig;
pub use engine::{Engine, Viewport};
pub use error::{EngineError, Result};
pub use frame::{Frame, Renderer};
pub use mesh::{MeshPhase, MeshPoseScheduler, MotionSegment, Placement, Pose};
pub use morph::{MorphEvent, MorphMode, MorphPhase, MorphScheduler};
pub use particles::{Particle, ParticleField, StepContext};
pub use raster::{AlphaCanvas, RasterProvider, SoftwareRaster};
pub use sampler::{TargetBox, TargetSampler, TargetSource};
pub use shapes::{ShapeDefinition, ShapeName};
pub use targets::TargetSets;
