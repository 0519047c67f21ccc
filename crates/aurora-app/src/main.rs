use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use aurora_core::{Engine, EngineConfig, EngineError, Viewport};
use aurora_platform::{FrameLoop, HeadlessRenderer, Timeline};

/// Drive the aurora background engine headlessly.
#[derive(Debug, Parser)]
#[command(name = "aurora", version)]
struct Args {
    #[arg(long, default_value_t = 1280.0)]
    width: f32,
    #[arg(long, default_value_t = 800.0)]
    height: f32,
    /// Number of frame callbacks to run.
    #[arg(long, default_value_t = 3600)]
    frames: u64,
    #[arg(long, default_value_t = 1000.0 / 60.0)]
    interval_ms: f64,
    #[arg(long)]
    reduced_motion: bool,
    /// Engine config (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Timed host events (TOML, `[[events]]` tables).
    #[arg(long)]
    script: Option<PathBuf>,
    /// Write the last rendered frame here as JSON.
    #[arg(long)]
    dump_frame: Option<PathBuf>,
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() {
    let args = Args::parse();

    // Init logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log)))
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    info!("Aurora starting");
    if let Err(e) = run(&args) {
        eprintln!("Aurora error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> aurora_core::Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mut timeline = match &args.script {
        Some(path) => {
            let source = std::fs::read_to_string(path)?;
            toml::from_str::<Timeline>(&source)?
        }
        None => Timeline::default(),
    };

    let viewport = Viewport::new(args.width, args.height);
    let mut engine = match Engine::initialize(
        config,
        viewport,
        args.reduced_motion,
        0.0,
        Some(HeadlessRenderer::new()),
    ) {
        Ok(engine) => engine,
        Err(EngineError::SurfaceUnavailable) => {
            warn!("no surface; background animation disabled");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let mut frames = FrameLoop::new(0.0, args.interval_ms);
    let stats = frames.run(&mut engine, &mut timeline, args.frames)?;

    let renderer = engine.renderer();
    info!(
        "{} frames painted ({} with mesh), peak {} links, {} mesh cycles",
        renderer.frames,
        renderer.mesh_frames,
        renderer.peak_links,
        engine.mesh().cycles()
    );
    if stats.scheduled > 0 && stats.rendered == 0 && !args.reduced_motion {
        warn!("frame loop never rendered; was the document hidden the whole time?");
    }

    if let Some(path) = &args.dump_frame {
        match engine.renderer().last_frame() {
            Some(frame) => {
                std::fs::write(path, frame.to_json()?)?;
                info!("last frame written to {}", path.display());
            }
            None => warn!("no frame rendered; nothing to write"),
        }
    }

    engine.dispose();
    Ok(())
}
