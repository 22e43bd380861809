// Janus Tap/Hold State Machine
// Transitions of a single dual-function key
//
// Idle --down--> PendingDecision --up before deadline--> Idle (tap)
//                PendingDecision --deadline / other key down--> HoldCommitted
//                HoldCommitted --up--> Idle (release secondary)

use std::time::Duration;

use crate::clock::Timestamp;
use crate::state::{KeyRuntimeState, Phase};
use crate::Key;

/// Outcome of a physical release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Released before the deadline with nothing else pressed: click the primary
    Tap(Key),
    /// Released after committing to hold: lift the secondary
    Hold(Key),
    /// Released at or past the deadline before the timeout was processed:
    /// assert and lift the secondary, never click the primary
    LateHold(Key),
    /// The key was not down
    Ignored,
}

impl KeyRuntimeState {
    /// Down-edge. Returns false when the key is already down
    /// (a repeated down without an up in between is not a new press).
    pub fn press(&mut self, now: Timestamp, hold_threshold: Duration) -> bool {
        if !self.phase.is_idle() {
            return false;
        }
        self.pressed_at = Some(now);
        self.phase = Phase::PendingDecision {
            deadline: now.add(hold_threshold),
        };
        true
    }

    /// Commit to hold, from timeout or rollover.
    ///
    /// Returns the secondary function when its down must be emitted now;
    /// `None` if it is already asserted or the key is up.
    pub fn commit_hold(&mut self) -> Option<Key> {
        match self.phase {
            Phase::Idle => None,
            Phase::PendingDecision { .. } | Phase::HoldCommitted => {
                self.phase = Phase::HoldCommitted;
                if self.secondary_asserted {
                    None
                } else {
                    self.secondary_asserted = true;
                    Some(self.secondary)
                }
            }
        }
    }

    /// Commit to hold only if the deadline has been reached
    pub fn expire(&mut self, now: Timestamp) -> Option<Key> {
        match self.phase.deadline() {
            Some(deadline) if now >= deadline => self.commit_hold(),
            _ => None,
        }
    }

    /// Up-edge
    pub fn release(&mut self, now: Timestamp) -> Release {
        let outcome = match self.phase {
            Phase::Idle => return Release::Ignored,
            Phase::PendingDecision { deadline } if now < deadline => Release::Tap(self.primary),
            Phase::PendingDecision { .. } => Release::LateHold(self.secondary),
            Phase::HoldCommitted => Release::Hold(self.secondary),
        };
        self.reset();
        outcome
    }

    /// Back to Idle without emitting anything
    pub(crate) fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.secondary_asserted = false;
    }
}
