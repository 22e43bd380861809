// Janus Key Runtime State
// Live tap/hold disambiguation data for one dual-function key

use std::fmt;
use strum_macros::{EnumIter, IntoStaticStr};

use crate::clock::Timestamp;
use crate::mapping::KeyMappingEntry;
use crate::Key;

/// Where a Janus key is in its tap/hold decision.
///
/// The deadline only exists while the decision is pending, so leaving that
/// phase drops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
pub enum Phase {
    /// Physically up
    Idle,
    /// Down, neither tap nor hold yet
    PendingDecision { deadline: Timestamp },
    /// Down and resolved to the secondary function
    HoldCommitted,
}

impl Phase {
    pub fn is_idle(self) -> bool {
        matches!(self, Phase::Idle)
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Phase::PendingDecision { .. })
    }

    pub fn deadline(self) -> Option<Timestamp> {
        match self {
            Phase::PendingDecision { deadline } => Some(deadline),
            _ => None,
        }
    }
}

/// Runtime state of one Janus key, alive for the whole process.
#[derive(Debug, Clone)]
pub struct KeyRuntimeState {
    pub(crate) physical: Key,
    pub(crate) primary: Key,
    pub(crate) secondary: Key,
    pub(crate) phase: Phase,
    /// Most recent down-edge
    pub(crate) pressed_at: Option<Timestamp>,
    /// Secondary "down" has been emitted and not yet released
    pub(crate) secondary_asserted: bool,
}

impl KeyRuntimeState {
    /// Build the state for a mapping entry; `None` unless the entry is Janus
    pub fn for_entry(entry: &KeyMappingEntry) -> Option<Self> {
        let secondary = entry.secondary?;
        Some(Self {
            physical: entry.physical,
            primary: entry.primary_function(),
            secondary,
            phase: Phase::Idle,
            pressed_at: None,
            secondary_asserted: false,
        })
    }

    pub fn physical(&self) -> Key {
        self.physical
    }

    pub fn primary(&self) -> Key {
        self.primary
    }

    pub fn secondary(&self) -> Key {
        self.secondary
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pressed_at(&self) -> Option<Timestamp> {
        self.pressed_at
    }

    pub fn secondary_asserted(&self) -> bool {
        self.secondary_asserted
    }

    /// Physically down as far as the engine knows
    pub fn is_down(&self) -> bool {
        !self.phase.is_idle()
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        self.phase.deadline()
    }
}

impl fmt::Display for KeyRuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase: &'static str = self.phase.into();
        write!(
            f,
            "{}(tap={}, hold={}, phase={}, asserted={})",
            self.physical, self.primary, self.secondary, phase, self.secondary_asserted
        )
    }
}
