//! Cardinality rules for attached values.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// How many values of one type a node may carry.
///
/// Ruleset files use the short codes `1m`, `1o`, `+` and `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "snake_case"))]
pub enum Cardinality {
    /// Exactly one value (`1m`).
    ExactlyOne,
    /// Zero or one value (`1o`).
    #[default]
    AtMostOne,
    /// At least one value (`+`).
    OneOrMore,
    /// Any number of values (`*`).
    ZeroOrMore,
}

impl Cardinality {
    /// Parse a ruleset code. Returns `None` for anything unrecognized.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1m" => Some(Cardinality::ExactlyOne),
            "1o" => Some(Cardinality::AtMostOne),
            "+" => Some(Cardinality::OneOrMore),
            "*" => Some(Cardinality::ZeroOrMore),
            _ => None,
        }
    }

    /// The ruleset code for this cardinality.
    pub fn code(self) -> &'static str {
        match self {
            Cardinality::ExactlyOne => "1m",
            Cardinality::AtMostOne => "1o",
            Cardinality::OneOrMore => "+",
            Cardinality::ZeroOrMore => "*",
        }
    }

    /// At least one value is required.
    pub fn is_mandatory(self) -> bool {
        matches!(self, Cardinality::ExactlyOne | Cardinality::OneOrMore)
    }

    /// At most one value is permitted.
    pub fn is_single(self) -> bool {
        matches!(self, Cardinality::ExactlyOne | Cardinality::AtMostOne)
    }

    /// Whether a node already holding `current` values may take one more.
    pub fn admits_another(self, current: usize) -> bool {
        !(self.is_single() && current >= 1)
    }

    /// Whether one of `current` values may be removed without dropping
    /// below the minimum.
    pub fn permits_removal(self, current: usize) -> bool {
        !(self.is_mandatory() && current <= 1)
    }

    /// Whether `count` values satisfy this rule.
    pub fn is_satisfied_by(self, count: usize) -> bool {
        match self {
            Cardinality::ExactlyOne => count == 1,
            Cardinality::AtMostOne => count <= 1,
            Cardinality::OneOrMore => count >= 1,
            Cardinality::ZeroOrMore => true,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Cardinality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cardinality::from_code(s)
            .ok_or_else(|| Error::Preferences(format!("unknown cardinality code '{s}'")))
    }
}
