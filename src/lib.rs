//! dicetray - dice notation roller for virtual tabletops
//!
//! Parses notation such as "3D20" or "2xD6+1", rolls it, hands the result
//! to an animation executor over an event bus, and records the roll once
//! the animation reports that it finished.

pub mod animator;
pub mod bus;
pub mod config;
pub mod dice;
pub mod roll;

pub use animator::TimedAnimator;
pub use bus::{EventBus, PublishReport, Subscription};
pub use config::{Config, ConfigError, StallPolicy};
pub use dice::{parse_notation, Aggregate, DiceNotation, DieKind, RollOutcome};
pub use roll::{
    AnimationPayload, CompletionSignal, RollCoordinator, RollError, RollLog, RollLogEntry,
    RollState, RollTicket, Signalled,
};
