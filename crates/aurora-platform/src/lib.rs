//! Host plumbing so `aurora-core` stays free of any windowing or event system.
//!
//! [`FrameLoop`] stands in for the host's animation-frame facility, feeding
//! [`HostEvent`]s to the engine between frames.

use aurora_core::{Engine, Frame, Renderer, Viewport};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub type Result<T> = aurora_core::Result<T>;

mod timeline;

pub use timeline::{TimedEvent, Timeline};

/// Inputs the host delivers between frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    Resize { width: f32, height: f32 },
    PointerMove { x: f32, y: f32 },
    PointerLeave,
    VisibilityChange { visible: bool },
    RedrawRequested,
}

impl HostEvent {
    pub fn apply<R: Renderer>(&self, engine: &mut Engine<R>) -> Result<()> {
        match *self {
            HostEvent::Resize { width, height } => engine.resize(Viewport::new(width, height))?,
            HostEvent::PointerMove { x, y } => engine.set_pointer(Vec2::new(x, y)),
            HostEvent::PointerLeave => engine.clear_pointer(),
            HostEvent::VisibilityChange { visible } => engine.set_visible(visible),
            HostEvent::RedrawRequested => engine.request_redraw(),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    /// Frame callbacks the loop asked for.
    pub scheduled: u64,
    /// Callbacks in which the engine actually rendered.
    pub rendered: u64,
    pub events: u64,
}

/// Fixed-interval frame driver.
///
/// Scheduling never pauses while the loop is alive; whether a callback does
/// any work is up to the engine's running flag.
#[derive(Debug, Clone)]
pub struct FrameLoop {
    now: f64,
    interval_ms: f64,
    alive: bool,
    stats: LoopStats,
}

impl FrameLoop {
    pub fn new(start: f64, interval_ms: f64) -> Self {
        Self {
            now: start,
            interval_ms: interval_ms.max(f64::EPSILON),
            alive: true,
            stats: LoopStats::default(),
        }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Stop requesting frames altogether.
    pub fn cancel(&mut self) {
        self.alive = false;
    }

    /// Deliver due events, then run one frame callback. Returns whether it rendered.
    pub fn run_frame<R: Renderer>(&mut self, engine: &mut Engine<R>, timeline: &mut Timeline) -> Result<bool> {
        if !self.alive {
            return Ok(false);
        }
        self.now += self.interval_ms;
        for event in timeline.drain_due(self.now) {
            debug!("t={:.0} event {:?}", self.now, event);
            event.apply(engine)?;
            self.stats.events += 1;
        }
        self.stats.scheduled += 1;
        let rendered = engine.tick(self.now);
        if rendered {
            self.stats.rendered += 1;
        }
        Ok(rendered)
    }

    pub fn run<R: Renderer>(
        &mut self,
        engine: &mut Engine<R>,
        timeline: &mut Timeline,
        frames: u64,
    ) -> Result<LoopStats> {
        for _ in 0..frames {
            if !self.alive {
                break;
            }
            self.run_frame(engine, timeline)?;
        }
        info!(
            "frame loop: {} scheduled, {} rendered, {} events",
            self.stats.scheduled, self.stats.rendered, self.stats.events
        );
        Ok(self.stats)
    }
}

/// Renderer that keeps statistics instead of painting pixels.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    pub frames: u64,
    pub mesh_frames: u64,
    pub peak_links: usize,
    last: Option<Frame>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last.as_ref()
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, frame: &Frame) {
        self.frames += 1;
        if frame.mesh.is_some() {
            self.mesh_frames += 1;
        }
        self.peak_links = self.peak_links.max(frame.links.len());
        self.last = Some(frame.clone());
    }
}
