//! Session event system
//!
//! Pub/sub event bus, the event vocabulary, and the JSONL persistence
//! logger. Components publish to the bus; live channel bridges and the
//! logger subscribe.

mod bus;
mod logger;
mod types;

pub use bus::{create_event_bus, EventBus, EventEmitter, DEFAULT_CHANNEL_CAPACITY};
pub use logger::{read_session_events, spawn_event_logger, EventLogger};
pub use types::{EventData, SessionEvent};
