use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical reference to a legal source unit ("article").
///
/// Always an ASCII digit string without leading zeros (`"0"` stays `"0"`). Ordering is numeric,
/// computed on the digit string so arbitrarily long numerals never overflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

/// A raw mention that could not be turned into an [`Identifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotANumber {
    pub raw: String,
}

impl fmt::Display for NotANumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a number: {:?}", self.raw)
    }
}

impl std::error::Error for NotANumber {}

/// Characters tolerated around the digits of a mention, e.g. `"81."`, `"(81)"`, `"№81"`.
/// Signs are not among them: `"-81"` is not article 81.
fn is_surrounding_noise(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | ',' | '(' | ')' | '[' | ']' | '№')
}

/// Normalize one textual mention into an [`Identifier`].
///
/// Idempotent: normalizing an already-normalized identifier yields the same value.
pub fn normalize_identifier(raw: &str) -> Result<Identifier, NotANumber> {
    let trimmed = raw.trim_matches(is_surrounding_noise);
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NotANumber {
            raw: raw.to_string(),
        });
    }
    let significant = trimmed.trim_start_matches('0');
    let digits = if significant.is_empty() { "0" } else { significant };
    Ok(Identifier(digits.to_string()))
}

impl Identifier {
    pub fn parse(raw: &str) -> Result<Self, NotANumber> {
        normalize_identifier(raw)
    }

    pub fn from_u64(n: u64) -> Self {
        Identifier(n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        normalize_identifier(&raw).map_err(serde::de::Error::custom)
    }
}
