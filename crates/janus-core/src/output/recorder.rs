// Janus In-Memory Output
// Records emitted events with the time they were sent

use super::{OutputError, OutputEvent, OutputSink};
use crate::clock::{Clock, ManualClock, Timestamp};

/// Output sink that keeps everything it is sent.
///
/// Timestamps come from the attached clock, or are zero without one.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    clock: Option<ManualClock>,
    timeline: Vec<(Timestamp, OutputEvent)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp each event with the given clock's time
    pub fn timed(clock: ManualClock) -> Self {
        Self {
            clock: Some(clock),
            timeline: Vec::new(),
        }
    }

    pub fn events(&self) -> Vec<OutputEvent> {
        self.timeline.iter().map(|(_, e)| *e).collect()
    }

    pub fn timeline(&self) -> &[(Timestamp, OutputEvent)] {
        &self.timeline
    }

    /// Events sent at exactly `at`
    pub fn events_at(&self, at: Timestamp) -> Vec<OutputEvent> {
        self.timeline
            .iter()
            .filter(|(t, _)| *t == at)
            .map(|(_, e)| *e)
            .collect()
    }
}

impl OutputSink for RecordingSink {
    fn send(&mut self, event: OutputEvent) -> Result<(), OutputError> {
        let at = self.clock.as_ref().map(Clock::now).unwrap_or_default();
        self.timeline.push((at, event));
        Ok(())
    }
}
