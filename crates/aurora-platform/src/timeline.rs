//! Host events scheduled against the frame clock.

use serde::{Deserialize, Serialize};

use crate::HostEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub at: f64,
    #[serde(flatten)]
    pub event: HostEvent,
}

/// Host events ordered by the time they should be delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TimelineFile")]
pub struct Timeline {
    events: Vec<TimedEvent>,
}

#[derive(Deserialize)]
struct TimelineFile {
    #[serde(default)]
    events: Vec<TimedEvent>,
}

impl From<TimelineFile> for Timeline {
    fn from(file: TimelineFile) -> Self {
        Timeline::new(file.events)
    }
}

impl Timeline {
    pub fn new(mut events: Vec<TimedEvent>) -> Self {
        events.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { events }
    }

    pub fn push(&mut self, at: f64, event: HostEvent) {
        let index = self.events.partition_point(|e| e.at <= at);
        self.events.insert(index, TimedEvent { at, event });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove and return every event scheduled at or before `now`, in order.
    pub fn drain_due(&mut self, now: f64) -> Vec<HostEvent> {
        let due = self.events.partition_point(|e| e.at <= now);
        self.events.drain(..due).map(|e| e.event).collect()
    }
}
