// Janus Input Layer
// Physical key events and the blocking wait that feeds the scheduler

mod device;
mod scripted;

#[cfg(feature = "evdev-io")]
mod evdev_source;

use std::time::Duration;

use crate::{Edge, Key};

pub use device::{is_keyboard, is_virtual_device, DeviceCapabilities};
pub use scripted::ScriptedSource;

#[cfg(feature = "evdev-io")]
pub use device::{find_keyboard, list_keyboards, DeviceInfo};
#[cfg(feature = "evdev-io")]
pub use evdev_source::EvdevSource;

/// Something the input source reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMessage {
    /// A physical key edge
    Key { key: Key, edge: Edge },
    /// Events were dropped; these keys are down right now
    Resync(Vec<Key>),
}

impl InputMessage {
    pub fn key(key: Key, edge: Edge) -> Self {
        InputMessage::Key { key, edge }
    }
}

/// Why `next_event` returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wake {
    Input(InputMessage),
    /// The timeout elapsed with nothing to read
    Timeout,
    /// A signal or wake-up request interrupted the wait
    Interrupted,
    /// The source has nothing more to deliver, ever
    Exhausted,
}

/// Errors that can occur while reading input
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to grab device: {0}")]
    Grab(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Blocking source of physical key events.
pub trait InputSource {
    /// Wait at most `timeout` (forever when `None`) for the next message.
    ///
    /// A message already buffered is returned without waiting.
    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Wake, InputError>;
}
