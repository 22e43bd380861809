// Janus Scripted Input
// Replays timestamped messages against a manual clock

use std::collections::VecDeque;
use std::time::Duration;

use super::{InputError, InputMessage, InputSource, Wake};
use crate::clock::{Clock, ManualClock, Timestamp};
use crate::{Edge, Key};

/// Input source driven by a script instead of a device.
///
/// Waiting moves the shared clock forward: to the next scripted message if it
/// arrives within the timeout, otherwise by the full timeout. Once the script
/// is empty an unbounded wait reports `Exhausted`.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    clock: ManualClock,
    script: VecDeque<(Timestamp, InputMessage)>,
}

impl ScriptedSource {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            script: VecDeque::new(),
        }
    }

    /// Queue a message at `at_ms`; times must not decrease
    pub fn push(&mut self, at_ms: u64, message: InputMessage) -> &mut Self {
        let at = Timestamp::from_millis(at_ms);
        debug_assert!(self.script.back().map_or(true, |(last, _)| *last <= at));
        self.script.push_back((at, message));
        self
    }

    pub fn key(&mut self, at_ms: u64, key: Key, edge: Edge) -> &mut Self {
        self.push(at_ms, InputMessage::key(key, edge))
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl InputSource for ScriptedSource {
    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Wake, InputError> {
        let now = self.clock.now();
        let Some(&(at, _)) = self.script.front() else {
            return Ok(match timeout {
                Some(t) => {
                    self.clock.advance(t);
                    Wake::Timeout
                }
                None => Wake::Exhausted,
            });
        };

        let arrives = match timeout {
            None => true,
            Some(t) => at <= now.add(t),
        };
        if !arrives {
            self.clock.advance(timeout.unwrap_or_default());
            return Ok(Wake::Timeout);
        }

        if at > now {
            self.clock.set(at);
        }
        Ok(self
            .script
            .pop_front()
            .map(|(_, message)| Wake::Input(message))
            .unwrap_or(Wake::Exhausted))
    }
}
