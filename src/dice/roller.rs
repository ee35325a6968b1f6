//! Dice rolling
//!
//! Turns a [`DiceNotation`] into individual die results and an aggregate.
//! The modifier only takes part in separate-values mode; a summed roll is
//! the plain total of the raw results.

use std::fmt;

use rand::rngs::{StdRng, ThreadRng};
use rand::Rng;
use serde::Serialize;

use super::notation::{DiceNotation, DieKind};

/// Source of uniform values in `[0, 1)`
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl RandomSource for ThreadRng {
    fn next_unit(&mut self) -> f64 {
        self.random()
    }
}

impl RandomSource for StdRng {
    fn next_unit(&mut self) -> f64 {
        self.random()
    }
}

/// Replays a fixed list of unit values, wrapping around at the end
#[derive(Debug, Clone)]
pub struct FixedSequence {
    values: Vec<f64>,
    next: usize,
}

impl FixedSequence {
    /// Create a sequence; an empty list always yields 0.0
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            next: 0,
        }
    }
}

impl RandomSource for FixedSequence {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.next % self.values.len()];
        self.next = (self.next + 1) % self.values.len();
        value
    }
}

/// Result of a single die
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DieOutcome {
    pub kind: DieKind,
    /// Face that came up, in `[1, sides]`
    pub raw: u32,
    /// `raw + modifier` in separate mode, otherwise `raw`
    pub adjusted: i64,
}

/// Combined result of a roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum Aggregate {
    /// Sum of the raw results
    Summed(i64),
    /// One adjusted value per die, in roll order
    PerDie(Vec<i64>),
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Summed(total) => write!(f, "{}", total),
            Aggregate::PerDie(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

/// Everything a roll produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollOutcome {
    pub dice: Vec<DieOutcome>,
    pub aggregate: Aggregate,
}

impl RollOutcome {
    /// Raw face values in roll order
    pub fn raw_results(&self) -> Vec<u32> {
        self.dice.iter().map(|d| d.raw).collect()
    }
}

/// Map a unit value onto `[1, sides]`
///
/// Scripted sources may hand out values outside `[0, 1)`; those are clamped.
pub fn face_from_unit(unit: f64, sides: u32) -> u32 {
    let face = (unit * sides as f64).floor() as i64 + 1;
    face.clamp(1, sides as i64) as u32
}

/// Roll with the thread-local generator
pub fn roll(notation: &DiceNotation) -> RollOutcome {
    let mut rng = rand::rng();
    roll_with(notation, &mut rng)
}

/// Roll with an injected random source
pub fn roll_with(notation: &DiceNotation, source: &mut dyn RandomSource) -> RollOutcome {
    let sides = notation.sides();
    let per_die_modifier = if notation.separate {
        notation.modifier as i64
    } else {
        0
    };

    let mut dice = Vec::with_capacity(notation.count as usize);
    for _ in 0..notation.count {
        let raw = face_from_unit(source.next_unit(), sides);
        dice.push(DieOutcome {
            kind: notation.kind,
            raw,
            adjusted: raw as i64 + per_die_modifier,
        });
    }

    let aggregate = if notation.separate {
        Aggregate::PerDie(dice.iter().map(|d| d.adjusted).collect())
    } else {
        Aggregate::Summed(dice.iter().map(|d| d.raw as i64).sum())
    };

    RollOutcome { dice, aggregate }
}
