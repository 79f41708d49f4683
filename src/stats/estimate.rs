use std::fmt;

use serde::{Serialize, Serializer};

/// A quantity that may be unbounded for degenerate inputs (near-zero probabilities).
///
/// Serialises as a plain number, or the string `"unbounded"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Estimate<T> {
    Finite(T),
    Unbounded,
}

impl<T: Copy> Estimate<T> {
    pub fn finite(&self) -> Option<T> {
        match self {
            Self::Finite(value) => Some(*value),
            Self::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl<T: Serialize> Serialize for Estimate<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Finite(value) => value.serialize(serializer),
            Self::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

impl fmt::Display for Estimate<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(value) => write!(f, "{}", value.round()),
            Self::Unbounded => write!(f, "∞"),
        }
    }
}

impl fmt::Display for Estimate<u64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(value) => write!(f, "{value}"),
            Self::Unbounded => write!(f, "∞"),
        }
    }
}
