//! Sortable calendar-date keys (`YYYY-MM-DD`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Calendar date serialized as a lexicographically sortable string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(String);

impl DateKey {
    /// Parses a strict `YYYY-MM-DD` value.
    pub fn parse(value: &str) -> Result<Self, DateKeyError> {
        let trimmed = value.trim();
        // chrono accepts unpadded fields; keys must stay fixed-width to sort.
        if trimmed.len() != 10 {
            return Err(DateKeyError(trimmed.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, DATE_KEY_FORMAT)
            .map(Self::from)
            .map_err(|_| DateKeyError(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<NaiveDate> for DateKey {
    fn from(value: NaiveDate) -> Self {
        Self(value.format(DATE_KEY_FORMAT).to_string())
    }
}

impl TryFrom<String> for DateKey {
    type Error = DateKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DateKey> for String {
    fn from(value: DateKey) -> Self {
        value.0
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for DateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rejected date-key input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateKeyError(pub String);

impl Display for DateKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid date key `{}`; expected YYYY-MM-DD", self.0)
    }
}

impl Error for DateKeyError {}

#[cfg(test)]
mod tests {
    use super::DateKey;

    #[test]
    fn parses_padded_dates_only() {
        assert_eq!(
            DateKey::parse("2024-01-01").expect("valid key").as_str(),
            "2024-01-01"
        );
        assert!(DateKey::parse("2024-1-1").is_err());
        assert!(DateKey::parse("2024-02-30").is_err());
        assert!(DateKey::parse("today").is_err());
    }

    #[test]
    fn keys_sort_chronologically() {
        let mut keys = vec![
            DateKey::parse("2024-10-01").expect("key"),
            DateKey::parse("2023-12-31").expect("key"),
            DateKey::parse("2024-02-15").expect("key"),
        ];
        keys.sort();
        let ordered: Vec<&str> = keys.iter().map(DateKey::as_str).collect();
        assert_eq!(ordered, vec!["2023-12-31", "2024-02-15", "2024-10-01"]);
    }
}
