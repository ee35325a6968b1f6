//! Dice module
//!
//! - Notation parsing (e.g., "3D20", "2xD6+1")
//! - Rolling with an injectable random source
//! - Summed and per-die aggregates

mod notation;
mod roller;

pub use notation::{parse_notation, DiceNotation, DieKind, NotationError};
pub use roller::{
    face_from_unit, roll, roll_with, Aggregate, DieOutcome, FixedSequence, RandomSource,
    RollOutcome,
};
