//! Task entity with ordered subtasks.
//!
//! # Invariants
//! - `completed_at` is set exactly when `completed` becomes true and cleared
//!   when it becomes false.
//! - Subtask order is caller order; each subtask tracks its own completion.

use crate::model::entity::Entity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
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
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Task {
    /// Sets completion and keeps `completed_at` consistent with it.
    ///
    /// Re-asserting the current state keeps the original timestamp.
    pub fn set_completed(&mut self, completed: bool, now_iso: &str) {
        if completed == self.completed {
            return;
        }
        self.completed = completed;
        self.completed_at = completed.then(|| now_iso.to_string());
    }

    /// Returns `(done, total)` subtask counts.
    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|sub| sub.completed).count();
        (done, self.subtasks.len())
    }
}

pub(crate) fn default_priority() -> String {
    "medium".to_string()
}

/// Caller-supplied fields for a new task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    /// Falls back to the settings' default task priority.
    pub priority: Option<String>,
    pub due_date: Option<String>,
    /// Subtask titles, kept in order.
    pub subtasks: Vec<String>,
    pub extra: Map<String, Value>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Task;
    use serde_json::json;

    #[test]
    fn completed_at_tracks_completion_transitions() {
        let mut task: Task = serde_json::from_value(json!({ "id": "t1", "title": "x" }))
            .expect("task should deserialize");
        assert_eq!(task.priority, "medium");

        task.set_completed(true, "2024-01-01T00:00:00.000Z");
        assert_eq!(task.completed_at.as_deref(), Some("2024-01-01T00:00:00.000Z"));

        task.set_completed(true, "2024-02-01T00:00:00.000Z");
        assert_eq!(task.completed_at.as_deref(), Some("2024-01-01T00:00:00.000Z"));

        task.set_completed(false, "2024-03-01T00:00:00.000Z");
        assert!(task.completed_at.is_none());
    }
}
