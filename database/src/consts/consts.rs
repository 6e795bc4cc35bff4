use std::fmt;

use serde::{Deserialize, Serialize};

// New Type Pattern -- https://doc.rust-lang.org/rust-by-example/generics/new_types.html
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct PersonId(pub i64);

impl PersonId {
    pub fn to_number(self) -> i64 {
        self.0
    }

    pub fn increment(&self) -> PersonId {
        PersonId(self.0 + 1)
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq)]
pub enum PersonIdError {
    NegativeOrZero(i64),
}

impl TryFrom<i64> for PersonId {
    type Error = PersonIdError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(PersonIdError::NegativeOrZero(value));
        }

        Ok(PersonId(value))
    }
}

/// Reason codes attached to a rejected mutation, serialized as SCREAMING_SNAKE_CASE
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    DuplicateName,
}

/// Largest integer a JSON client can represent exactly (2^53 - 1)
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;
