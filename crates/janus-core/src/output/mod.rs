// Janus Output Layer
// Sink for the corrected event stream

mod recorder;

#[cfg(feature = "evdev-io")]
mod uinput;

use std::fmt;

use crate::{Edge, Key};

pub use recorder::RecordingSink;

#[cfg(feature = "evdev-io")]
pub use uinput::VirtualDevice;

/// One key edge written to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputEvent {
    pub key: Key,
    pub edge: Edge,
}

impl OutputEvent {
    pub fn new(key: Key, edge: Edge) -> Self {
        Self { key, edge }
    }
}

impl fmt::Display for OutputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.key, self.edge)
    }
}

/// Error types for output operations
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Failed to write event {event}: {source}")]
    Write {
        event: OutputEvent,
        #[source]
        source: std::io::Error,
    },
}

/// Destination of output key edges.
///
/// Each `send` is a complete logical event: implementations flush
/// (SYN_REPORT) before returning. Failures are fatal to the caller.
pub trait OutputSink {
    fn send(&mut self, event: OutputEvent) -> Result<(), OutputError>;

    fn send_all(&mut self, events: &[OutputEvent]) -> Result<(), OutputError> {
        for event in events {
            self.send(*event)?;
        }
        Ok(())
    }
}
