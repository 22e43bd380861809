// Janus Core Library
// Dual-function keys: tap for one key, hold for another

pub mod clock;
pub mod config;
pub mod edge;
pub mod event;
pub mod input;
pub mod key;
pub mod mapping;
pub mod output;
pub mod state;
pub mod transform;

pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use config::{default_config_content, Config, ConfigError};
pub use edge::Edge;
pub use event::{EventLoop, EventLoopError, EventLoopResult, Step};
pub use input::{InputError, InputMessage, InputSource, ScriptedSource, Wake};
pub use key::Key;
pub use mapping::{KeyMappingEntry, KeyMappingTable, MappingError};
pub use output::{OutputError, OutputEvent, OutputSink, RecordingSink};
pub use state::{KeyRuntimeState, Phase, PressedKeyState};
pub use transform::{Dispatcher, Emitted, Release};

#[cfg(feature = "evdev-io")]
pub use input::{find_keyboard, list_keyboards, DeviceInfo, EvdevSource};
#[cfg(feature = "evdev-io")]
pub use output::VirtualDevice;
