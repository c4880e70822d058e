//! Goal domain store (`goals_v1`).
//!
//! # Invariants
//! - Every progress or milestone mutation recomputes `status` before the
//!   list is persisted, so a stored goal never disagrees with its progress.
//! - Completion listeners run once per transition into `completed`.

use crate::domain::store::{DomainState, ListStore, StoreContext};
use crate::domain::DomainError;
use crate::model::entity::{apply_patch, new_entity_id};
use crate::model::goal::{Goal, GoalKind, GoalStatus, Milestone, NewGoal, StatusChange};
use crate::storage::keys;
use log::info;
use serde_json::{Map, Value};

type CompletionListener = Box<dyn FnMut(&Goal) + Send>;

/// Outcome of a progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalProgress {
    pub status: GoalStatus,
    pub newly_completed: bool,
}

impl From<StatusChange> for GoalProgress {
    fn from(change: StatusChange) -> Self {
        Self {
            status: change.to,
            newly_completed: change.newly_completed,
        }
    }
}

pub struct GoalStore {
    goals: ListStore<Goal>,
    listeners: Vec<CompletionListener>,
}

impl GoalStore {
    pub fn open(ctx: StoreContext) -> Self {
        Self {
            goals: ListStore::open(keys::GOALS, ctx),
            listeners: Vec::new(),
        }
    }

    /// Registers a side effect for the first completion of a goal.
    pub fn on_completed(&mut self, listener: impl FnMut(&Goal) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn all(&self) -> &[Goal] {
        self.goals.items()
    }

    pub fn get(&self, id: &str) -> Option<&Goal> {
        self.goals.get(id)
    }

    /// Creates a goal in `not-started`.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidGoal` for a numeric goal without a
    /// positive target or a milestone goal without milestones.
    pub fn add(&mut self, draft: NewGoal) -> Result<Goal, DomainError> {
        match draft.kind {
            GoalKind::Numeric if draft.target_value.is_nan() || draft.target_value <= 0.0 => {
                return Err(DomainError::InvalidGoal("target value must be positive"));
            }
            GoalKind::Milestone if draft.milestones.is_empty() => {
                return Err(DomainError::InvalidGoal("milestone goal needs milestones"));
            }
            _ => {}
        }

        let ctx = self.goals.context();
        let now_ms = ctx.clock.now_ms();
        let goal = Goal {
            id: new_entity_id(now_ms),
            title: draft.title.trim().to_string(),
            kind: draft.kind,
            target_value: draft.target_value.max(0.0),
            current_value: 0.0,
            unit: draft.unit,
            milestones: draft
                .milestones
                .into_iter()
                .map(|title| new_milestone(now_ms, title))
                .collect(),
            status: GoalStatus::NotStarted,
            completed_at: None,
            created_at: ctx.now_iso(),
            extra: draft.extra,
        };
        Ok(self.goals.insert(goal))
    }

    /// Shallow-merges `patch`, then re-clamps progress and recomputes status.
    ///
    /// A patch cannot set `status` or `completedAt` directly.
    pub fn update(&mut self, id: &str, patch: &Map<String, Value>) -> Option<GoalProgress> {
        let current = self.goals.get(id)?;
        let mut next = apply_patch(current, patch).ok()?;
        next.status = current.status;
        next.completed_at = current.completed_at.clone();
        let value = next.current_value;
        next.set_progress(value);
        self.mutate(id, move |goal| *goal = next)
    }

    /// Sets numeric progress; the value is clamped to `[0, target]`.
    pub fn update_progress(&mut self, id: &str, value: f64) -> Option<GoalProgress> {
        self.mutate(id, |goal| goal.set_progress(value))
    }

    pub fn toggle_milestone(&mut self, goal_id: &str, milestone_id: &str) -> Option<GoalProgress> {
        let known = self
            .goals
            .get(goal_id)?
            .milestones
            .iter()
            .any(|m| m.id == milestone_id);
        if !known {
            return None;
        }
        self.mutate(goal_id, |goal| {
            if let Some(milestone) = goal.milestones.iter_mut().find(|m| m.id == milestone_id) {
                milestone.completed = !milestone.completed;
            }
        })
    }

    pub fn add_milestone(&mut self, goal_id: &str, title: &str) -> Option<GoalProgress> {
        let milestone = new_milestone(self.goals.context().clock.now_ms(), title.to_string());
        self.mutate(goal_id, move |goal| goal.milestones.push(milestone))
    }

    /// Moves a goal into the terminal `cancelled` state.
    pub fn cancel(&mut self, id: &str) -> bool {
        self.goals
            .update_with(id, |goal| {
                goal.status = GoalStatus::Cancelled;
                goal.completed_at = None;
            })
            .is_some()
    }

    pub fn delete(&mut self, id: &str) -> bool {
        self.goals.delete(id)
    }

    fn mutate(&mut self, id: &str, apply: impl FnOnce(&mut Goal)) -> Option<GoalProgress> {
        let now_iso = self.goals.context().now_iso();
        let (change, snapshot) = self.goals.update_with(id, |goal| {
            apply(goal);
            let change = goal.recompute_status(&now_iso);
            (change, change.newly_completed.then(|| goal.clone()))
        })?;

        if let Some(goal) = snapshot {
            info!("event=goal_completed module=domain status=ok id={}", goal.id);
            for listener in &mut self.listeners {
                listener(&goal);
            }
        }
        Some(change.into())
    }

    pub(crate) fn domain(&self) -> &dyn DomainState {
        &self.goals
    }

    pub(crate) fn domain_mut(&mut self) -> &mut dyn DomainState {
        &mut self.goals
    }
}

fn new_milestone(now_ms: i64, title: String) -> Milestone {
    Milestone {
        id: new_entity_id(now_ms),
        title: title.trim().to_string(),
        completed: false,
        extra: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::GoalStore;
    use crate::clock::ManualClock;
    use crate::domain::store::StoreContext;
    use crate::domain::DomainError;
    use crate::model::goal::{GoalKind, GoalStatus, NewGoal};
    use crate::storage::KeyValueStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn store(clock: Arc<ManualClock>) -> GoalStore {
        let kv = KeyValueStore::open_in_memory().expect("open kv");
        GoalStore::open(StoreContext::new(kv, clock))
    }

    fn numeric(title: &str, target: f64) -> NewGoal {
        NewGoal {
            title: title.to_string(),
            kind: GoalKind::Numeric,
            target_value: target,
            ..NewGoal::default()
        }
    }

    #[test]
    fn add_rejects_goals_that_can_never_complete() {
        let mut goals = store(Arc::new(ManualClock::new(0)));
        assert!(matches!(
            goals.add(numeric("Run", 0.0)),
            Err(DomainError::InvalidGoal(_))
        ));
        let milestone = NewGoal {
            title: "Launch".to_string(),
            kind: GoalKind::Milestone,
            ..NewGoal::default()
        };
        assert!(matches!(goals.add(milestone), Err(DomainError::InvalidGoal(_))));
    }

    #[test]
    fn completion_fires_once_and_keeps_completed_at() {
        let clock = Arc::new(ManualClock::new(1_704_067_200_000));
        let mut goals = store(clock.clone());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        goals.on_completed(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let id = goals.add(numeric("Read books", 10.0)).expect("add").id;
        let progress = goals.update_progress(&id, 4.0).expect("progress");
        assert_eq!(progress.status, GoalStatus::InProgress);

        let progress = goals.update_progress(&id, 12.0).expect("progress");
        assert!(progress.newly_completed);
        assert_eq!(goals.get(&id).expect("goal").current_value, 10.0);
        let completed_at = goals.get(&id).expect("goal").completed_at.clone();

        clock.advance(60_000);
        let again = goals.update_progress(&id, 15.0).expect("progress");
        assert!(!again.newly_completed);
        assert_eq!(again.status, GoalStatus::Completed);
        assert_eq!(goals.get(&id).expect("goal").completed_at, completed_at);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_below_target_reverts_to_in_progress() {
        let mut goals = store(Arc::new(ManualClock::new(0)));
        let id = goals.add(numeric("Save", 100.0)).expect("add").id;
        goals.update_progress(&id, 100.0);
        let progress = goals.update_progress(&id, 40.0).expect("progress");
        assert_eq!(progress.status, GoalStatus::InProgress);
        assert!(goals.get(&id).expect("goal").completed_at.is_none());
    }

    #[test]
    fn milestones_drive_completion() {
        let mut goals = store(Arc::new(ManualClock::new(0)));
        let goal = goals
            .add(NewGoal {
                title: "Ship".to_string(),
                kind: GoalKind::Milestone,
                milestones: vec!["design".to_string(), "build".to_string()],
                ..NewGoal::default()
            })
            .expect("add");
        let first = goal.milestones[0].id.clone();
        let second = goal.milestones[1].id.clone();

        assert_eq!(
            goals.toggle_milestone(&goal.id, &first).map(|p| p.status),
            Some(GoalStatus::InProgress)
        );
        let done = goals.toggle_milestone(&goal.id, &second).expect("toggle");
        assert!(done.newly_completed);
        assert!(goals.toggle_milestone(&goal.id, "missing").is_none());
    }

    #[test]
    fn patch_cannot_force_status_and_cancel_is_terminal() {
        let mut goals = store(Arc::new(ManualClock::new(0)));
        let id = goals.add(numeric("Run", 5.0)).expect("add").id;
        let patch = json!({ "status": "completed", "currentValue": 2 });
        let progress = goals
            .update(&id, patch.as_object().expect("object"))
            .expect("update");
        assert_eq!(progress.status, GoalStatus::InProgress);

        assert!(goals.cancel(&id));
        let after = goals.update_progress(&id, 5.0).expect("progress");
        assert_eq!(after.status, GoalStatus::Cancelled);
        assert!(!after.newly_completed);
    }
}
