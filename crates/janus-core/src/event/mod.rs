// Janus Event Handling
// Scheduler loop driving the dispatcher

pub mod r#loop;

pub use r#loop::{EventLoop, EventLoopError, EventLoopResult, Step};
