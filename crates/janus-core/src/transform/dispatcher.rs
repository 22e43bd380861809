// Janus Event Dispatcher
// Routes physical key events to the tap/hold machine or to plain remapping,
// and keeps held Janus modifiers asserted ahead of any primary output.

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::time::Duration;

use super::machine::Release;
use crate::clock::{Clock, MonotonicClock, Timestamp};
use crate::mapping::KeyMappingTable;
use crate::output::OutputEvent;
use crate::state::{KeyRuntimeState, PressedKeyState};
use crate::{Edge, Key};

/// Output edges produced by one dispatcher call, in emission order
pub type Emitted = SmallVec<[OutputEvent; 4]>;

/// Owns all per-key state and turns physical edges into output edges.
///
/// The dispatcher never performs I/O; callers forward `Emitted` to an
/// output sink in order.
#[derive(Debug)]
pub struct Dispatcher<C: Clock = MonotonicClock> {
    table: KeyMappingTable,
    hold_threshold: Duration,
    janus: IndexMap<Key, KeyRuntimeState>,
    /// Physical non-Janus keys whose primary down was forwarded
    forwarded: PressedKeyState,
    clock: C,
}

impl Dispatcher<MonotonicClock> {
    pub fn new(table: KeyMappingTable, hold_threshold: Duration) -> Self {
        Self::with_clock(table, hold_threshold, MonotonicClock::new())
    }
}

impl<C: Clock> Dispatcher<C> {
    pub fn with_clock(table: KeyMappingTable, hold_threshold: Duration, clock: C) -> Self {
        let janus = table
            .janus_entries()
            .filter_map(|entry| KeyRuntimeState::for_entry(entry).map(|s| (entry.physical, s)))
            .collect();
        Self {
            table,
            hold_threshold,
            janus,
            forwarded: PressedKeyState::new(),
            clock,
        }
    }

    pub fn table(&self) -> &KeyMappingTable {
        &self.table
    }

    pub fn hold_threshold(&self) -> Duration {
        self.hold_threshold
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Runtime state of a Janus key
    pub fn janus_state(&self, key: Key) -> Option<&KeyRuntimeState> {
        self.janus.get(&key)
    }

    pub fn janus_states(&self) -> impl Iterator<Item = &KeyRuntimeState> + '_ {
        self.janus.values()
    }

    /// Handle one physical key edge
    pub fn handle_key_event(&mut self, key: Key, edge: Edge) -> Emitted {
        let mut out = Emitted::new();
        if self.janus.contains_key(&key) {
            self.handle_janus(key, edge, &mut out);
        } else {
            self.handle_plain(key, edge, &mut out);
        }
        out
    }

    fn handle_janus(&mut self, key: Key, edge: Edge, out: &mut Emitted) {
        let now = self.clock.now();
        match edge {
            Edge::Down => {
                if self.janus.get(&key).is_some_and(KeyRuntimeState::is_down) {
                    log::debug!("{} down while already down, ignored", key);
                    return;
                }
                // Another key going down commits every held Janus key to hold.
                self.assert_held_janus(Some(key), out);
                let threshold = self.hold_threshold;
                if let Some(state) = self.janus.get_mut(&key) {
                    state.press(now, threshold);
                    log::debug!("{} pending until {}", key, now.add(threshold));
                }
            }
            Edge::Repeat => {}
            Edge::Up => {
                let Some(outcome) = self.janus.get_mut(&key).map(|s| s.release(now)) else {
                    return;
                };
                match outcome {
                    Release::Tap(primary) => {
                        log::debug!("{} tap -> {}", key, primary);
                        self.assert_held_janus(Some(key), out);
                        out.push(OutputEvent::new(primary, Edge::Down));
                        out.push(OutputEvent::new(primary, Edge::Up));
                    }
                    Release::Hold(secondary) => {
                        log::debug!("{} hold released -> {} up", key, secondary);
                        out.push(OutputEvent::new(secondary, Edge::Up));
                    }
                    Release::LateHold(secondary) => {
                        log::debug!("{} released past its deadline -> {} click", key, secondary);
                        out.push(OutputEvent::new(secondary, Edge::Down));
                        out.push(OutputEvent::new(secondary, Edge::Up));
                    }
                    Release::Ignored => {
                        log::debug!("{} up without a tracked down, ignored", key);
                    }
                }
            }
        }
    }

    fn handle_plain(&mut self, key: Key, edge: Edge, out: &mut Emitted) {
        let primary = self.table.primary_of(key);
        match edge {
            Edge::Down => {
                if !self.forwarded.add(key) {
                    log::debug!("{} down while already down, ignored", key);
                    return;
                }
                self.assert_held_janus(None, out);
                out.push(OutputEvent::new(primary, Edge::Down));
            }
            Edge::Up => {
                if self.forwarded.remove(key) {
                    out.push(OutputEvent::new(primary, Edge::Up));
                } else {
                    log::debug!("{} up without a forwarded down, suppressed", key);
                }
            }
            // The virtual device autorepeats from its own held state.
            Edge::Repeat => {}
        }
    }

    /// Ordering guarantee: every physically held Janus key other than `except`
    /// gets its secondary asserted before whatever the caller emits next.
    fn assert_held_janus(&mut self, except: Option<Key>, out: &mut Emitted) {
        for state in self.janus.values_mut() {
            if Some(state.physical) == except {
                continue;
            }
            if let Some(secondary) = state.commit_hold() {
                log::debug!("{} committed to hold by rollover -> {} down", state.physical, secondary);
                out.push(OutputEvent::new(secondary, Edge::Down));
            }
        }
    }

    /// Promote every pending Janus key whose deadline has passed
    pub fn handle_deadline_tick(&mut self) -> Emitted {
        let now = self.clock.now();
        let mut due: SmallVec<[(Timestamp, Key); 4]> = self
            .janus
            .values()
            .filter_map(|s| s.deadline().filter(|d| *d <= now).map(|d| (d, s.physical)))
            .collect();
        due.sort();

        let mut out = Emitted::new();
        for (_, key) in due {
            if let Some(secondary) = self.janus.get_mut(&key).and_then(|s| s.expire(now)) {
                log::debug!("{} held past threshold -> {} down", key, secondary);
                out.push(OutputEvent::new(secondary, Edge::Down));
            }
        }
        out
    }

    /// Earliest deadline among pending Janus keys
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.janus.values().filter_map(KeyRuntimeState::deadline).min()
    }

    /// Reconcile with an authoritative snapshot of the keys currently down,
    /// after the input source dropped events.
    pub fn resync(&mut self, snapshot: &[Key]) -> Emitted {
        let mut out = Emitted::new();

        for state in self.janus.values_mut() {
            if !state.is_down() || snapshot.contains(&state.physical) {
                continue;
            }
            if state.secondary_asserted {
                out.push(OutputEvent::new(state.secondary, Edge::Up));
            }
            log::debug!("{} released during resync gap", state.physical);
            state.reset();
        }

        for key in self.forwarded.get_all() {
            if !snapshot.contains(&key) {
                self.forwarded.remove(key);
                out.push(OutputEvent::new(self.table.primary_of(key), Edge::Up));
            }
        }

        for &key in snapshot {
            let already_down = match self.janus.get(&key) {
                Some(state) => state.is_down(),
                None => self.forwarded.is_pressed(key),
            };
            if !already_down {
                out.extend(self.handle_key_event(key, Edge::Down));
            }
        }

        out
    }

    /// Release every asserted output and return all keys to Idle
    pub fn release_all(&mut self) -> Emitted {
        let mut out = Emitted::new();
        for state in self.janus.values_mut() {
            if state.secondary_asserted {
                out.push(OutputEvent::new(state.secondary, Edge::Up));
            }
            state.reset();
        }
        for key in self.forwarded.drain() {
            out.push(OutputEvent::new(self.table.primary_of(key), Edge::Up));
        }
        out
    }
}
