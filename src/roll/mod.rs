//! Roll requests
//!
//! Connects typed notation to the animation bus and the roll log:
//! - Animation payloads with a single-shot completion signal
//! - The coordinator that publishes and waits for completion
//! - The append-only roll log

mod coordinator;
mod log;
mod payload;

pub use coordinator::{RollCoordinator, RollError, RollState, RollTicket};
pub use log::{RollLog, RollLogEntry};
pub use payload::{AnimatedDie, AnimationPayload, CompletionSignal, Signalled};
