//! Session lifecycle: store actor, processing slots, and the state machine

mod machine;
mod messages;
mod slots;
mod store;

pub use machine::{SessionStateMachine, SessionStatusReport};
pub use messages::{SessionError, SessionResponse};
pub use slots::{ProcessingSlots, SlotDecision};
pub use store::SessionStore;
