//! Goal entity and its derived status state machine.
//!
//! # Invariants
//! - `current_value` is clamped to `[0, target_value]`.
//! - `status` is derived from progress: `not-started -> in-progress ->
//!   completed`. `cancelled` is only entered by an explicit user action and
//!   is never left by recomputation.
//! - The transition into `completed` fires once; re-meeting the completion
//!   condition while already completed keeps `completed_at` unchanged.

use crate::model::entity::Entity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    /// Progress is `current_value / target_value`.
    #[default]
    Numeric,
    /// Progress is the share of completed milestones.
    Milestone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: GoalKind,
    #[serde(default)]
    pub target_value: f64,
    #[serde(default)]
    pub current_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Goal {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Result of one status recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: GoalStatus,
    pub to: GoalStatus,
    /// True only on the transition into `completed`.
    pub newly_completed: bool,
}

impl Goal {
    /// Sets progress, clamped to `[0, target_value]`.
    pub fn set_progress(&mut self, value: f64) {
        self.current_value = clamp_progress(value, self.target_value);
    }

    pub fn is_goal_met(&self) -> bool {
        match self.kind {
            GoalKind::Numeric => self.target_value > 0.0 && self.current_value >= self.target_value,
            GoalKind::Milestone => {
                !self.milestones.is_empty() && self.milestones.iter().all(|m| m.completed)
            }
        }
    }

    pub fn has_progress(&self) -> bool {
        match self.kind {
            GoalKind::Numeric => self.current_value > 0.0,
            GoalKind::Milestone => self.milestones.iter().any(|m| m.completed),
        }
    }

    /// Progress ratio in `[0, 1]`.
    pub fn progress_ratio(&self) -> f64 {
        match self.kind {
            GoalKind::Numeric if self.target_value > 0.0 => {
                (self.current_value / self.target_value).clamp(0.0, 1.0)
            }
            GoalKind::Numeric => 0.0,
            GoalKind::Milestone if self.milestones.is_empty() => 0.0,
            GoalKind::Milestone => {
                let done = self.milestones.iter().filter(|m| m.completed).count();
                done as f64 / self.milestones.len() as f64
            }
        }
    }

    /// Re-derives `status` from progress.
    pub fn recompute_status(&mut self, now_iso: &str) -> StatusChange {
        let from = self.status;
        if from == GoalStatus::Cancelled {
            return StatusChange {
                from,
                to: from,
                newly_completed: false,
            };
        }

        let to = if self.is_goal_met() {
            GoalStatus::Completed
        } else if self.has_progress() {
            GoalStatus::InProgress
        } else if from == GoalStatus::NotStarted {
            GoalStatus::NotStarted
        } else {
            GoalStatus::InProgress
        };

        let newly_completed = to == GoalStatus::Completed && from != GoalStatus::Completed;
        if newly_completed {
            self.completed_at = Some(now_iso.to_string());
        } else if to != GoalStatus::Completed {
            self.completed_at = None;
        }
        self.status = to;

        StatusChange {
            from,
            to,
            newly_completed,
        }
    }
}

fn clamp_progress(value: f64, target: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, target.max(0.0))
}

/// Caller-supplied fields for a new goal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewGoal {
    pub title: String,
    pub kind: GoalKind,
    pub target_value: f64,
    pub unit: Option<String>,
    /// Milestone titles, kept in order.
    pub milestones: Vec<String>,
    pub extra: Map<String, Value>,
}
