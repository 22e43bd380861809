// Janus State
// Per-key runtime state owned by the dispatcher

mod janus;
mod pressed;

pub use janus::{KeyRuntimeState, Phase};
pub use pressed::PressedKeyState;
