//! Task domain store (`tasks_v2`).

use crate::domain::store::{DomainState, ListStore, StoreContext};
use crate::logging::log_safe;
use crate::model::entity::{apply_patch, new_entity_id};
use crate::model::task::{NewTask, Subtask, Task};
use crate::storage::keys;
use log::warn;
use serde_json::{Map, Value};

pub struct TaskStore {
    tasks: ListStore<Task>,
}

impl TaskStore {
    pub fn open(ctx: StoreContext) -> Self {
        Self {
            tasks: ListStore::open(keys::TASKS, ctx),
        }
    }

    pub fn all(&self) -> &[Task] {
        self.tasks.items()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Creates a task; priority falls back to the settings default.
    pub fn add(&mut self, draft: NewTask) -> Task {
        let ctx = self.tasks.context();
        let now_ms = ctx.clock.now_ms();
        let priority = draft
            .priority
            .unwrap_or_else(|| ctx.settings.get().preferences.default_task_priority);
        let subtasks = draft
            .subtasks
            .into_iter()
            .map(|title| new_subtask(now_ms, title))
            .collect();
        let task = Task {
            id: new_entity_id(now_ms),
            title: draft.title.trim().to_string(),
            completed: false,
            completed_at: None,
            subtasks,
            priority,
            due_date: draft.due_date,
            created_at: ctx.now_iso(),
            extra: draft.extra,
        };
        self.tasks.insert(task)
    }

    /// Shallow-merges `patch`. A `completed` change through a patch keeps
    /// `completedAt` consistent.
    pub fn update(&mut self, id: &str, patch: &Map<String, Value>) -> bool {
        let Some(current) = self.tasks.get(id) else {
            return false;
        };
        let mut next = match apply_patch(current, patch) {
            Ok(next) => next,
            Err(err) => {
                warn!(
                    "event=task_update module=domain status=rejected id={} error={}",
                    id,
                    log_safe(&err)
                );
                return false;
            }
        };
        let now_completed = next.completed;
        next.completed = current.completed;
        next.set_completed(now_completed, &self.tasks.context().now_iso());
        self.tasks.update_with(id, |task| *task = next).is_some()
    }

    pub fn delete(&mut self, id: &str) -> bool {
        self.tasks.delete(id)
    }

    /// Flips completion; returns the new state or `None` for an unknown task.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let now_iso = self.tasks.context().now_iso();
        self.tasks.update_with(id, |task| {
            let next = !task.completed;
            task.set_completed(next, &now_iso);
            next
        })
    }

    pub fn add_subtask(&mut self, task_id: &str, title: &str) -> Option<Subtask> {
        let subtask = new_subtask(self.tasks.context().clock.now_ms(), title.to_string());
        self.tasks.update_with(task_id, |task| {
            task.subtasks.push(subtask.clone());
            subtask
        })
    }

    /// Flips one subtask; `None` when the task or subtask is unknown.
    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> Option<bool> {
        let known = self
            .tasks
            .get(task_id)?
            .subtasks
            .iter()
            .any(|sub| sub.id == subtask_id);
        if !known {
            return None;
        }
        self.tasks.update_with(task_id, |task| {
            let sub = task.subtasks.iter_mut().find(|sub| sub.id == subtask_id)?;
            sub.completed = !sub.completed;
            Some(sub.completed)
        })?
    }

    pub fn remove_subtask(&mut self, task_id: &str, subtask_id: &str) -> bool {
        let known = self
            .tasks
            .get(task_id)
            .is_some_and(|task| task.subtasks.iter().any(|sub| sub.id == subtask_id));
        if !known {
            return false;
        }
        self.tasks
            .update_with(task_id, |task| task.subtasks.retain(|sub| sub.id != subtask_id))
            .is_some()
    }

    pub(crate) fn domain(&self) -> &dyn DomainState {
        &self.tasks
    }

    pub(crate) fn domain_mut(&mut self) -> &mut dyn DomainState {
        &mut self.tasks
    }
}

fn new_subtask(now_ms: i64, title: String) -> Subtask {
    Subtask {
        id: new_entity_id(now_ms),
        title: title.trim().to_string(),
        completed: false,
        extra: Map::new(),
    }
}
