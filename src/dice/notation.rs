//! Dice notation parsing
//!
//! Recognizes expressions like "3D20", "2xD6+1", "W8-2" and "D6".
//! Input that does not contain a valid expression is `NotRecognized`,
//! which callers treat as "do nothing" rather than as a failure.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Count, separator, die marker with size, optional signed modifier.
///
/// The die-size alternation is ordered so that "10" and "12" win over any
/// shorter prefix. The sign class keeps a literal `|`; such modifiers fail
/// integer parsing and fall back to 0.
static NOTATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]*)(x)*[WD](4|6|8|10|12|20)([+|\-][0-9]*)?").unwrap()
});

/// The fixed set of dice that can be rolled and animated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieKind {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
}

impl DieKind {
    /// All kinds, smallest first
    pub const ALL: [DieKind; 6] = [
        DieKind::D4,
        DieKind::D6,
        DieKind::D8,
        DieKind::D10,
        DieKind::D12,
        DieKind::D20,
    ];

    /// Number of faces
    pub fn sides(self) -> u32 {
        match self {
            DieKind::D4 => 4,
            DieKind::D6 => 6,
            DieKind::D8 => 8,
            DieKind::D10 => 10,
            DieKind::D12 => 12,
            DieKind::D20 => 20,
        }
    }

    /// Look up a kind by its face count
    pub fn from_sides(sides: u32) -> Option<DieKind> {
        Self::ALL.into_iter().find(|kind| kind.sides() == sides)
    }
}

impl fmt::Display for DieKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.sides())
    }
}

/// Parse failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    #[error("not a dice expression: {0:?}")]
    NotRecognized(String),

    #[error("dice count {0} is out of range")]
    CountOverflow(String),
}

/// A parsed roll request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceNotation {
    /// Number of dice to roll (at least 1)
    pub count: u32,
    /// Report each die on its own instead of summing
    pub separate: bool,
    /// Which die to roll
    pub kind: DieKind,
    /// Signed modifier; only applied per die in separate mode
    pub modifier: i32,
}

impl DiceNotation {
    /// Create a new notation
    pub fn new(count: u32, separate: bool, kind: DieKind, modifier: i32) -> Self {
        Self {
            count,
            separate,
            kind,
            modifier,
        }
    }

    /// Faces on each die
    pub fn sides(&self) -> u32 {
        self.kind.sides()
    }
}

impl FromStr for DiceNotation {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_notation(s)
    }
}

impl fmt::Display for DiceNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count)?;
        if self.separate {
            write!(f, "x")?;
        }
        write!(f, "{}", self.kind)?;
        if self.modifier > 0 {
            write!(f, "+{}", self.modifier)?;
        } else if self.modifier < 0 {
            write!(f, "{}", self.modifier)?;
        }
        Ok(())
    }
}

/// Parse the first dice expression found in `input`
///
/// The search is unanchored, so "roll 2D6 please" parses as 2D6. A die size
/// that continues with another digit ("D100") rejects the whole expression.
pub fn parse_notation(input: &str) -> Result<DiceNotation, NotationError> {
    let not_recognized = || NotationError::NotRecognized(input.to_string());

    let caps = NOTATION_REGEX.captures(input).ok_or_else(not_recognized)?;
    let whole = caps.get(0).ok_or_else(not_recognized)?;
    let sides = caps.get(3).ok_or_else(not_recognized)?;

    // A longer number after the die marker is not one of the legal sizes
    let trailing = input[sides.end()..].chars().next();
    if trailing.is_some_and(|c| c.is_ascii_digit()) {
        return Err(not_recognized());
    }

    let kind = sides
        .as_str()
        .parse()
        .ok()
        .and_then(DieKind::from_sides)
        .ok_or_else(not_recognized)?;

    let raw_count = caps.get(1).map_or("", |m| m.as_str());
    let count = match raw_count {
        "" => 1,
        digits => match digits.parse::<u32>() {
            Ok(0) => 1,
            Ok(n) => n,
            Err(_) => return Err(NotationError::CountOverflow(digits.to_string())),
        },
    };

    let separate = caps.get(2).is_some();
    let modifier = parse_modifier(caps.get(4).map(|m| m.as_str()));

    tracing::trace!(matched = whole.as_str(), count, separate, %kind, modifier, "parsed dice notation");

    Ok(DiceNotation {
        count,
        separate,
        kind,
        modifier,
    })
}

/// Missing or unparsable modifiers are 0
fn parse_modifier(raw: Option<&str>) -> i32 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let n = parse_notation("3D20").unwrap();
        assert_eq!(n, DiceNotation::new(3, false, DieKind::D20, 0));
    }

    #[test]
    fn test_parse_separate_with_plus() {
        let n = parse_notation("2xD6+1").unwrap();
        assert_eq!(n, DiceNotation::new(2, true, DieKind::D6, 1));
    }

    #[test]
    fn test_parse_implicit_one() {
        let n = parse_notation("D6").unwrap();
        assert_eq!(n, DiceNotation::new(1, false, DieKind::D6, 0));
    }

    #[test]
    fn test_parse_with_minus() {
        let n = parse_notation("1D6-3").unwrap();
        assert_eq!(n.count, 1);
        assert!(!n.separate);
        assert_eq!(n.modifier, -3);
    }

    #[test]
    fn test_parse_w_marker() {
        let n = parse_notation("4W8").unwrap();
        assert_eq!(n, DiceNotation::new(4, false, DieKind::D8, 0));
    }

    #[test]
    fn test_parse_prefers_two_digit_sizes() {
        assert_eq!(parse_notation("D10").unwrap().kind, DieKind::D10);
        assert_eq!(parse_notation("2D12").unwrap().kind, DieKind::D12);
        assert_eq!(parse_notation("D20+2").unwrap().kind, DieKind::D20);
    }

    #[test]
    fn test_parse_illegal_sizes() {
        for input in ["D3", "D1", "2D7", "D100", "D41", "D0"] {
            assert!(
                matches!(parse_notation(input), Err(NotationError::NotRecognized(_))),
                "{} should not be recognized",
                input
            );
        }
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_notation("hello").is_err());
        assert!(parse_notation("").is_err());
        assert!(parse_notation("2d6").is_err()); // markers are case-sensitive
        assert!(parse_notation("20").is_err());
    }

    #[test]
    fn test_parse_zero_count_defaults_to_one() {
        assert_eq!(parse_notation("0D6").unwrap().count, 1);
    }

    #[test]
    fn test_parse_count_overflow() {
        assert!(matches!(
            parse_notation("99999999999D6"),
            Err(NotationError::CountOverflow(_))
        ));
    }

    #[test]
    fn test_parse_malformed_modifier() {
        assert_eq!(parse_notation("D6+").unwrap().modifier, 0);
        assert_eq!(parse_notation("D6-").unwrap().modifier, 0);
        assert_eq!(parse_notation("D6|3").unwrap().modifier, 0);
        assert_eq!(parse_notation("D6+99999999999").unwrap().modifier, 0);
    }

    #[test]
    fn test_parse_embedded_in_text() {
        let n = parse_notation("roll 2D6+3 please").unwrap();
        assert_eq!(n, DiceNotation::new(2, false, DieKind::D6, 3));
    }

    #[test]
    fn test_parse_repeated_separator() {
        assert!(parse_notation("3xxD4").unwrap().separate);
    }

    #[test]
    fn test_parse_is_pure() {
        assert_eq!(parse_notation("2xD10-1"), parse_notation("2xD10-1"));
    }

    #[test]
    fn test_from_str() {
        let n: DiceNotation = "2xD8".parse().unwrap();
        assert_eq!(n.sides(), 8);
    }

    #[test]
    fn test_display() {
        assert_eq!(DiceNotation::new(3, false, DieKind::D20, 0).to_string(), "3D20");
        assert_eq!(DiceNotation::new(2, true, DieKind::D6, 1).to_string(), "2xD6+1");
        assert_eq!(DiceNotation::new(1, false, DieKind::D6, -3).to_string(), "1D6-3");
    }

    #[test]
    fn test_die_kind_lookup() {
        assert_eq!(DieKind::from_sides(12), Some(DieKind::D12));
        assert_eq!(DieKind::from_sides(3), None);
        assert_eq!(DieKind::D4.to_string(), "D4");
    }
}
