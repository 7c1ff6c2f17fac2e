//! Identifier generation strategies

use sheetdb_core::Error;
use std::fmt;
use std::str::FromStr;

/// Shape of a generated identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// Canonical hyphenated UUID v4, 36 characters
    #[default]
    Uuid,
    /// 16 lowercase alphanumeric characters
    Short,
    /// `<epoch-millis>_<random-suffix>`, lexicographically sortable by
    /// creation time
    TimestampOrdered,
    /// `<prefix>-<year>-<month>-<day>-<random-suffix>`, human-scannable
    Readable,
}

impl IdStrategy {
    /// Wire name of the strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            IdStrategy::Uuid => "uuid",
            IdStrategy::Short => "short",
            IdStrategy::TimestampOrdered => "timestamp",
            IdStrategy::Readable => "readable",
        }
    }
}

impl FromStr for IdStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uuid" => Ok(IdStrategy::Uuid),
            "short" => Ok(IdStrategy::Short),
            "timestamp" => Ok(IdStrategy::TimestampOrdered),
            "readable" => Ok(IdStrategy::Readable),
            other => Err(Error::validation(format!("unknown id strategy: {other}"))),
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
