// Janus Transform Layer
// Tap/hold resolution and event dispatch

pub mod dispatcher;
pub mod machine;

pub use dispatcher::{Dispatcher, Emitted};
pub use machine::Release;
