// Janus Event Loop
// Deadline-driven scheduler between the input source and the output sink

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clock::{Clock, MonotonicClock};
use crate::input::{InputError, InputMessage, InputSource, Wake};
use crate::output::{OutputError, OutputSink};
use crate::transform::Dispatcher;
use crate::{Edge, Key};

/// Result type for event loop operations
pub type EventLoopResult<T> = Result<T, EventLoopError>;

/// Errors that end the event loop
#[derive(Debug, thiserror::Error)]
pub enum EventLoopError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// Outcome of a single scheduling iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Finished,
}

/// Single-threaded scheduler.
///
/// Each iteration waits until the earliest pending hold deadline (forever
/// when nothing is pending) or the next input, dispatches at most one input
/// message, then always runs the deadline tick. A promotion is therefore
/// never more than one iteration late.
pub struct EventLoop<I, O, C: Clock = MonotonicClock> {
    input: I,
    output: O,
    dispatcher: Dispatcher<C>,
    /// Set by signal handlers or the eject key
    stop: Arc<AtomicBool>,
    eject_key: Option<Key>,
}

impl<I: InputSource, O: OutputSink, C: Clock> EventLoop<I, O, C> {
    pub fn new(input: I, output: O, dispatcher: Dispatcher<C>) -> Self {
        Self {
            input,
            output,
            dispatcher,
            stop: Arc::new(AtomicBool::new(false)),
            eject_key: None,
        }
    }

    /// Pressing `key` stops the loop; the key itself is never forwarded
    pub fn with_eject_key(mut self, key: Option<Key>) -> Self {
        self.eject_key = key;
        self
    }

    /// Share the stop flag with a signal handler
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::SeqCst)
    }

    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn into_parts(self) -> (I, O, Dispatcher<C>) {
        (self.input, self.output, self.dispatcher)
    }

    pub fn step(&mut self) -> EventLoopResult<Step> {
        let timeout = self
            .dispatcher
            .next_deadline()
            .map(|deadline| deadline.saturating_since(self.dispatcher.now()));

        let mut step = Step::Continue;
        match self.input.next_event(timeout)? {
            Wake::Input(InputMessage::Key { key, edge }) => {
                if edge == Edge::Down && self.eject_key == Some(key) {
                    log::warn!("Emergency eject key {} pressed, stopping", key);
                    self.stop.store(true, Ordering::SeqCst);
                    return Ok(Step::Finished);
                }
                let emitted = self.dispatcher.handle_key_event(key, edge);
                self.output.send_all(&emitted)?;
            }
            Wake::Input(InputMessage::Resync(snapshot)) => {
                log::warn!("Input resync, {} key(s) reported down", snapshot.len());
                let emitted = self.dispatcher.resync(&snapshot);
                self.output.send_all(&emitted)?;
            }
            Wake::Timeout | Wake::Interrupted => {}
            Wake::Exhausted => step = Step::Finished,
        }

        let promoted = self.dispatcher.handle_deadline_tick();
        self.output.send_all(&promoted)?;
        Ok(step)
    }

    /// Iterate until the input is exhausted or a stop is requested
    pub fn run(&mut self) -> EventLoopResult<()> {
        log::info!(
            "Event loop started (hold threshold {} ms, {} mapped key(s))",
            self.dispatcher.hold_threshold().as_millis(),
            self.dispatcher.table().len()
        );
        while self.is_running() {
            if self.step()? == Step::Finished {
                break;
            }
        }
        log::info!("Event loop stopped");
        Ok(())
    }

    /// Release every output the dispatcher still holds down
    pub fn shutdown(&mut self) -> EventLoopResult<()> {
        let released = self.dispatcher.release_all();
        if !released.is_empty() {
            log::debug!("Releasing {} held output key(s)", released.len());
        }
        self.output.send_all(&released)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, Timestamp};
    use crate::input::ScriptedSource;
    use crate::mapping::{KeyMappingEntry, KeyMappingTable};
    use crate::output::{OutputEvent, RecordingSink};
    use std::time::Duration;

    const SPACE: Key = Key(57);
    const LEFTCTRL: Key = Key(29);
    const A: Key = Key(30);
    const PAUSE: Key = Key(119);

    fn build(clock: &ManualClock, source: ScriptedSource) -> EventLoop<ScriptedSource, RecordingSink, ManualClock> {
        let table = KeyMappingTable::new([KeyMappingEntry::janus(SPACE, LEFTCTRL)]).unwrap();
        let dispatcher = Dispatcher::with_clock(table, Duration::from_millis(200), clock.clone());
        EventLoop::new(source, RecordingSink::timed(clock.clone()), dispatcher)
    }

    fn ev(key: Key, edge: Edge) -> OutputEvent {
        OutputEvent::new(key, edge)
    }

    #[test]
    fn test_step_waits_for_deadline_then_promotes() {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::new(clock.clone());
        source.key(0, SPACE, Edge::Down).key(500, SPACE, Edge::Up);
        let mut event_loop = build(&clock, source);

        assert_eq!(event_loop.step().unwrap(), Step::Continue);
        assert!(event_loop.output().events().is_empty());

        assert_eq!(event_loop.step().unwrap(), Step::Continue);
        assert_eq!(clock.now(), Timestamp::from_millis(200));
        assert_eq!(event_loop.output().events(), vec![ev(LEFTCTRL, Edge::Down)]);

        assert_eq!(event_loop.step().unwrap(), Step::Continue);
        assert_eq!(
            event_loop.output().events_at(Timestamp::from_millis(500)),
            vec![ev(LEFTCTRL, Edge::Up)]
        );
        assert_eq!(event_loop.step().unwrap(), Step::Finished);
    }

    #[test]
    fn test_run_stops_when_script_is_exhausted() {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::new(clock.clone());
        source.key(0, SPACE, Edge::Down).key(50, SPACE, Edge::Up);
        let mut event_loop = build(&clock, source);

        event_loop.run().unwrap();
        assert_eq!(
            event_loop.output().events(),
            vec![ev(SPACE, Edge::Down), ev(SPACE, Edge::Up)]
        );
        assert_eq!(event_loop.input().remaining(), 0);
    }

    #[test]
    fn test_stop_flag_prevents_iteration() {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::new(clock.clone());
        source.key(0, A, Edge::Down);
        let mut event_loop = build(&clock, source);

        event_loop.stop_handle().store(true, Ordering::SeqCst);
        event_loop.run().unwrap();
        assert!(event_loop.output().events().is_empty());
        assert_eq!(event_loop.input().remaining(), 1);
    }

    #[test]
    fn test_eject_key_stops_without_forwarding() {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::new(clock.clone());
        source
            .key(0, A, Edge::Down)
            .key(10, PAUSE, Edge::Down)
            .key(20, A, Edge::Up);
        let mut event_loop = build(&clock, source).with_eject_key(Some(PAUSE));

        event_loop.run().unwrap();
        assert!(!event_loop.is_running());
        assert_eq!(event_loop.output().events(), vec![ev(A, Edge::Down)]);
        assert_eq!(event_loop.input().remaining(), 1);

        event_loop.shutdown().unwrap();
        assert_eq!(
            event_loop.output().events(),
            vec![ev(A, Edge::Down), ev(A, Edge::Up)]
        );
    }

    #[test]
    fn test_resync_message_is_dispatched() {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::new(clock.clone());
        source
            .key(0, SPACE, Edge::Down)
            .key(10, A, Edge::Down)
            .push(30, InputMessage::Resync(vec![A]));
        let mut event_loop = build(&clock, source);

        event_loop.run().unwrap();
        assert_eq!(
            event_loop.output().events(),
            vec![ev(LEFTCTRL, Edge::Down), ev(A, Edge::Down), ev(LEFTCTRL, Edge::Up)]
        );
    }

    #[test]
    fn test_shutdown_releases_held_modifier() {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::new(clock.clone());
        source.key(0, SPACE, Edge::Down).key(50, A, Edge::Down);
        let mut event_loop = build(&clock, source);

        event_loop.run().unwrap();
        event_loop.shutdown().unwrap();

        let (_, output, dispatcher) = event_loop.into_parts();
        assert_eq!(
            output.events(),
            vec![
                ev(LEFTCTRL, Edge::Down),
                ev(A, Edge::Down),
                ev(LEFTCTRL, Edge::Up),
                ev(A, Edge::Up),
            ]
        );
        assert!(dispatcher.janus_states().all(|s| s.phase().is_idle()));
    }
}
