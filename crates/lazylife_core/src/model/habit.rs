//! Habit entity.
//!
//! # Invariants
//! - `completed_dates` is a set of calendar-date keys; order is irrelevant.
//! - Toggling a date is symmetric (present -> absent, absent -> present).
//! - Period habits declare at least one weekday in `frequency.days`; `once`
//!   habits ignore `days`.
//! - `archived` is a soft delete: archived habits keep their history but are
//!   excluded from active views.

use crate::model::date_key::DateKey;
use crate::model::entity::Entity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Recurrence kind for a habit.
///
/// Kinds this build does not know are kept by name so they survive a save.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FrequencyKind {
    #[default]
    Daily,
    Weekly,
    Custom,
    Once,
    Other(String),
}

impl From<String> for FrequencyKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "custom" => Self::Custom,
            "once" => Self::Once,
            _ => Self::Other(value),
        }
    }
}

impl From<FrequencyKind> for String {
    fn from(value: FrequencyKind) -> Self {
        match value {
            FrequencyKind::Daily => "daily".to_string(),
            FrequencyKind::Weekly => "weekly".to_string(),
            FrequencyKind::Custom => "custom".to_string(),
            FrequencyKind::Once => "once".to_string(),
            FrequencyKind::Other(name) => name,
        }
    }
}

/// Weekday schedule; `days` uses `0 = Sunday .. 6 = Saturday`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitFrequency {
    #[serde(rename = "type", default)]
    pub kind: FrequencyKind,
    #[serde(default)]
    pub days: BTreeSet<u8>,
}

impl Default for HabitFrequency {
    fn default() -> Self {
        Self {
            kind: FrequencyKind::Daily,
            days: (0..=6).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Stored as plain strings so a malformed historic entry never makes the
    /// whole list unreadable.
    #[serde(default)]
    pub completed_dates: BTreeSet<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub frequency: HabitFrequency,
    #[serde(default)]
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Habit {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Habit {
    /// Flips completion for `date`; returns whether the date is now completed.
    pub fn toggle_date(&mut self, date: &DateKey) -> bool {
        if self.completed_dates.remove(date.as_str()) {
            false
        } else {
            self.completed_dates.insert(date.as_str().to_string());
            true
        }
    }

    pub fn is_completed_on(&self, date: &DateKey) -> bool {
        self.completed_dates.contains(date.as_str())
    }

    pub fn is_active(&self) -> bool {
        !self.archived
    }

    /// Validates schedule invariants.
    pub fn validate(&self) -> Result<(), HabitValidationError> {
        if self.name.trim().is_empty() {
            return Err(HabitValidationError::EmptyName);
        }
        if let Some(day) = self.frequency.days.iter().find(|day| **day > 6) {
            return Err(HabitValidationError::InvalidWeekday(*day));
        }
        if self.frequency.kind != FrequencyKind::Once && self.frequency.days.is_empty() {
            return Err(HabitValidationError::NoScheduledDays);
        }
        Ok(())
    }
}

/// Caller-supplied fields for a new habit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewHabit {
    pub name: String,
    pub category: Option<String>,
    /// Defaults to daily on every weekday.
    pub frequency: Option<HabitFrequency>,
    pub extra: Map<String, Value>,
}

impl NewHabit {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HabitValidationError {
    EmptyName,
    InvalidWeekday(u8),
    NoScheduledDays,
}

impl Display for HabitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "habit name cannot be empty"),
            Self::InvalidWeekday(day) => write!(f, "weekday {day} is outside 0..=6"),
            Self::NoScheduledDays => {
                write!(f, "recurring habits need at least one scheduled weekday")
            }
        }
    }
}

impl Error for HabitValidationError {}
