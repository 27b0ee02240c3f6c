//! Core engine module - session state, scheduling and the streaming loop

mod engine;
mod event_bus;
mod scheduler;
mod session;
mod streaming;

pub use engine::Console;
pub use event_bus::{ConsoleEvent, Event, EventBus, EventType};
pub use scheduler::TaskScheduler;
pub use session::{Frame, Session};
pub use streaming::{CycleReport, StreamState, StreamingScheduler, TickOutcome, STREAM_TASK};
