//! Morph events: timed windows during which part of the particle field is
//! pulled toward a sampled silhouette.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{MorphConfig, MorphModeConfig};
use crate::easing::{ease_in_out_cubic, progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MorphMode {
    Iceland,
    Fyi,
}

impl MorphMode {
    pub const ALL: [MorphMode; 2] = [MorphMode::Iceland, MorphMode::Fyi];

    pub fn as_str(self) -> &'static str {
        match self {
            MorphMode::Iceland => "iceland",
            MorphMode::Fyi => "fyi",
        }
    }
}

impl std::fmt::Display for MorphMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphPhase {
    Pending,
    In,
    Hold,
    Out,
    Finished,
}

/// Envelope timing plus pull strength for one morph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphTiming {
    pub in_ms: f64,
    pub hold_ms: f64,
    pub out_ms: f64,
    pub strength: f32,
}

impl From<&MorphModeConfig> for MorphTiming {
    fn from(config: &MorphModeConfig) -> Self {
        Self {
            in_ms: config.in_ms,
            hold_ms: config.hold_ms,
            out_ms: config.out_ms,
            strength: config.strength,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphEvent {
    pub mode: MorphMode,
    pub phase_start: f64,
    pub timing: MorphTiming,
    /// Mixed with the particle index to decide who participates.
    pub seed: u32,
    pub participation: f32,
}

impl MorphEvent {
    pub fn total_ms(&self) -> f64 {
        self.timing.in_ms + self.timing.hold_ms + self.timing.out_ms
    }

    pub fn phase(&self, now: f64) -> MorphPhase {
        let t = now - self.phase_start;
        let MorphTiming {
            in_ms,
            hold_ms,
            out_ms,
            ..
        } = self.timing;
        if t < 0.0 {
            MorphPhase::Pending
        } else if t <= in_ms {
            MorphPhase::In
        } else if t <= in_ms + hold_ms {
            MorphPhase::Hold
        } else if t <= in_ms + hold_ms + out_ms {
            MorphPhase::Out
        } else {
            MorphPhase::Finished
        }
    }

    /// Envelope value at `now`; pure, never mutates the event.
    pub fn weight_at(&self, now: f64) -> f32 {
        let t = now - self.phase_start;
        let MorphTiming { in_ms, hold_ms, .. } = self.timing;
        match self.phase(now) {
            MorphPhase::Pending | MorphPhase::Finished => 0.0,
            MorphPhase::In => ease_in_out_cubic(progress(t, in_ms)),
            MorphPhase::Hold => 1.0,
            MorphPhase::Out => {
                1.0 - ease_in_out_cubic(progress(t - in_ms - hold_ms, self.timing.out_ms))
            }
        }
    }
}

/// `true` when particle `index` follows the morph with the given seed.
///
/// Pure in `(index, seed)` so the same particles stay engaged for the whole
/// event instead of flickering from tick to tick.
pub fn participates(index: usize, seed: u32, fraction: f32) -> bool {
    let hash = (index as u32).wrapping_mul(9301).wrapping_add(seed);
    let pick = (hash % 10_000) as f32 / 10_000.0;
    pick < fraction
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Trigger {
    mode: MorphMode,
    next_at: f64,
}

/// Holds at most one active [`MorphEvent`] and the per-mode trigger clocks.
#[derive(Debug, Clone)]
pub struct MorphScheduler {
    config: MorphConfig,
    triggers: Vec<Trigger>,
    active: Option<MorphEvent>,
}

impl MorphScheduler {
    /// First triggers fire `first_delay_ms` after `now`.
    pub fn new(config: &MorphConfig, now: f64) -> Self {
        let mut order: Vec<MorphMode> = Vec::with_capacity(MorphMode::ALL.len());
        for mode in config.priority.iter().chain(MorphMode::ALL.iter()) {
            if !order.contains(mode) {
                order.push(*mode);
            }
        }
        let triggers = order
            .into_iter()
            .map(|mode| Trigger {
                mode,
                next_at: now + config.mode(mode).first_delay_ms,
            })
            .collect();
        Self {
            config: config.clone(),
            triggers,
            active: None,
        }
    }

    pub fn mode(&self) -> Option<MorphMode> {
        self.active.map(|event| event.mode)
    }

    pub fn active(&self) -> Option<&MorphEvent> {
        self.active.as_ref()
    }

    pub fn next_trigger(&self, mode: MorphMode) -> Option<f64> {
        self.triggers
            .iter()
            .find(|t| t.mode == mode)
            .map(|t| t.next_at)
    }

    /// Start the first due morph in priority order, unless one is already running.
    ///
    /// Returns the started mode so the caller can re-anchor its targets.
    pub fn poll<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Option<MorphMode> {
        if self.active.is_some() {
            return None;
        }
        let index = self.triggers.iter().position(|t| now > t.next_at)?;
        let mode = self.triggers[index].mode;
        let mode_config = self.config.mode(mode);
        let timing = MorphTiming::from(mode_config);
        let next_at = now + mode_config.base_delay_ms + rng.random::<f64>() * mode_config.jitter_ms;
        self.start_morph(mode, now, timing, rng);
        self.triggers[index].next_at = next_at;
        debug!("next {mode} morph scheduled at {next_at:.0}");
        Some(mode)
    }

    /// Begin `mode` immediately with a fresh seed, replacing any active event.
    pub fn start_morph<R: Rng + ?Sized>(
        &mut self,
        mode: MorphMode,
        now: f64,
        timing: MorphTiming,
        rng: &mut R,
    ) {
        let seed = rng.random_range(0..1_000_000u32);
        info!(
            "morph {mode} started (seed {seed}, {:.0}ms)",
            timing.in_ms + timing.hold_ms + timing.out_ms
        );
        self.active = Some(MorphEvent {
            mode,
            phase_start: now,
            timing,
            seed,
            participation: self.config.participation,
        });
    }

    /// Envelope of the active morph; clears it once the envelope has run out.
    pub fn weight(&mut self, now: f64) -> f32 {
        let Some(event) = self.active else {
            return 0.0;
        };
        if event.phase(now) == MorphPhase::Finished {
            info!("morph {} finished", event.mode);
            self.active = None;
            return 0.0;
        }
        event.weight_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn timing() -> MorphTiming {
        MorphTiming {
            in_ms: 1000.0,
            hold_ms: 500.0,
            out_ms: 2000.0,
            strength: 0.002,
        }
    }

    fn started(at: f64) -> MorphScheduler {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut scheduler = MorphScheduler::new(&MorphConfig::default(), 0.0);
        scheduler.start_morph(MorphMode::Fyi, at, timing(), &mut rng);
        scheduler
    }

    #[test]
    fn weight_is_zero_before_the_phase_starts() {
        let scheduler = started(5000.0);
        let event = scheduler.active().unwrap();
        for t in [0.0, 1000.0, 4999.0, 4999.999] {
            assert_eq!(event.weight_at(t), 0.0);
        }
    }

    #[test]
    fn envelope_rises_holds_and_falls() {
        let scheduler = started(0.0);
        let event = *scheduler.active().unwrap();

        let mut last = 0.0;
        for i in 0..=100 {
            let w = event.weight_at(i as f64 * 10.0);
            assert!(w >= last, "rise not monotonic at step {i}");
            last = w;
        }
        assert_eq!(event.weight_at(1000.0), 1.0);
        for t in [1000.5, 1200.0, 1500.0] {
            assert_eq!(event.weight_at(t), 1.0);
        }
        let mut last = 1.0;
        for i in 0..=200 {
            let w = event.weight_at(1500.0 + i as f64 * 10.0);
            assert!(w <= last, "fall not monotonic at step {i}");
            last = w;
        }
        assert_eq!(event.weight_at(3500.0), 0.0);
    }

    #[test]
    fn mode_clears_once_elapsed_exceeds_envelope() {
        let mut scheduler = started(0.0);
        assert_eq!(scheduler.weight(3500.0), 0.0);
        assert_eq!(scheduler.mode(), Some(MorphMode::Fyi));
        assert_eq!(scheduler.weight(3500.001), 0.0);
        assert_eq!(scheduler.mode(), None);
    }

    #[test]
    fn participation_is_a_pure_function_of_index_and_seed() {
        for i in 0..200 {
            assert_eq!(participates(i, 4242, 0.38), participates(i, 4242, 0.38));
        }
        assert!((0..200).all(|i| !participates(i, 17, 0.0)));
        assert!((0..200).all(|i| participates(i, 17, 1.0)));
        // (3 * 9301 + 100) % 10000 = 8003
        assert!(participates(3, 100, 0.81));
        assert!(!participates(3, 100, 0.80));
    }

    #[test]
    fn due_triggers_respect_priority() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut scheduler = MorphScheduler::new(&MorphConfig::default(), 0.0);
        assert_eq!(scheduler.poll(11_000.0, &mut rng), None);
        // both due: iceland wins
        assert_eq!(scheduler.poll(31_000.0, &mut rng), Some(MorphMode::Iceland));
        let next = scheduler.next_trigger(MorphMode::Iceland).unwrap();
        assert!((31_000.0 + 55_000.0..31_000.0 + 90_000.0).contains(&next));
        // fyi is still due but suppressed while iceland runs
        assert_eq!(scheduler.poll(31_001.0, &mut rng), None);
        assert_eq!(scheduler.next_trigger(MorphMode::Fyi), Some(12_000.0));
    }

    #[test]
    fn suppressed_trigger_fires_after_active_morph_ends() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut scheduler = MorphScheduler::new(&MorphConfig::default(), 0.0);
        assert_eq!(scheduler.poll(31_000.0, &mut rng), Some(MorphMode::Iceland));
        let end = 31_000.0 + 4200.0 + 2400.0 + 6200.0;
        assert!(scheduler.weight(end - 1000.0) > 0.0);
        assert_eq!(scheduler.weight(end + 1.0), 0.0);
        assert_eq!(scheduler.poll(end + 2.0, &mut rng), Some(MorphMode::Fyi));
    }

    #[test]
    fn custom_priority_is_honoured() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let config = MorphConfig {
            priority: vec![MorphMode::Fyi],
            ..MorphConfig::default()
        };
        let mut scheduler = MorphScheduler::new(&config, 0.0);
        assert_eq!(scheduler.poll(40_000.0, &mut rng), Some(MorphMode::Fyi));
    }
}
