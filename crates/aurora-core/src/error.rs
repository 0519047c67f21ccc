use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures that keep the engine from coming up at all.
///
/// Everything past initialization degrades silently instead: a morph whose
/// target could not be sampled just never pulls on the particles.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no drawable surface available; animation disabled")]
    SurfaceUnavailable,
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: f32, height: f32 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to load target font: {0}")]
    Font(#[from] ab_glyph::InvalidFont),
    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("failed to encode frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
