//! Habit domain store: `habits_v2` plus `habit_categories_v1`.

use crate::domain::store::{DomainState, ListStore, ObjectStore, StoreContext};
use crate::domain::DomainError;
use crate::model::date_key::DateKey;
use crate::model::entity::{apply_patch, new_entity_id};
use crate::model::habit::{Habit, NewHabit};
use crate::storage::keys;
use serde_json::{Map, Value};

fn default_categories() -> Vec<String> {
    ["Health", "Productivity", "Mindfulness", "Learning"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

pub struct HabitStore {
    habits: ListStore<Habit>,
    categories: ObjectStore<Vec<String>>,
}

impl HabitStore {
    pub fn open(ctx: StoreContext) -> Self {
        Self {
            habits: ListStore::open(keys::HABITS, ctx.clone()),
            categories: ObjectStore::open(keys::HABIT_CATEGORIES, ctx, default_categories),
        }
    }

    pub fn all(&self) -> &[Habit] {
        self.habits.items()
    }

    /// Non-archived habits.
    pub fn active(&self) -> Vec<&Habit> {
        self.habits.items().iter().filter(|h| h.is_active()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Habit> {
        self.habits.get(id)
    }

    /// Creates a habit with a fresh id and `createdAt`.
    ///
    /// # Errors
    /// Returns `DomainError::Habit` when the schedule is invalid.
    pub fn add(&mut self, draft: NewHabit) -> Result<Habit, DomainError> {
        let ctx = self.habits.context();
        let habit = Habit {
            id: new_entity_id(ctx.clock.now_ms()),
            name: draft.name.trim().to_string(),
            category: draft.category,
            completed_dates: Default::default(),
            archived: false,
            frequency: draft.frequency.unwrap_or_default(),
            created_at: ctx.now_iso(),
            extra: draft.extra,
        };
        habit.validate().map_err(DomainError::Habit)?;
        Ok(self.habits.insert(habit))
    }

    /// Shallow-merges `patch`; schedule-breaking patches are rejected.
    pub fn update(&mut self, id: &str, patch: &Map<String, Value>) -> bool {
        let Some(current) = self.habits.get(id) else {
            return false;
        };
        match apply_patch(current, patch) {
            Ok(next) if next.validate().is_ok() => self.habits.patch(id, patch),
            _ => false,
        }
    }

    pub fn delete(&mut self, id: &str) -> bool {
        self.habits.delete(id)
    }

    /// Toggles completion for `date` (today when `None`).
    ///
    /// Returns the new completion state, or `None` for an unknown habit.
    pub fn toggle(&mut self, id: &str, date: Option<DateKey>) -> Option<bool> {
        let date = date.unwrap_or_else(|| self.habits.context().clock.today());
        self.habits.update_with(id, |habit| habit.toggle_date(&date))
    }

    /// Same as [`HabitStore::toggle`] for a raw `YYYY-MM-DD` input.
    pub fn toggle_on(&mut self, id: &str, date: &str) -> Result<Option<bool>, DomainError> {
        let date = DateKey::parse(date).map_err(DomainError::InvalidDate)?;
        Ok(self.toggle(id, Some(date)))
    }

    pub fn set_archived(&mut self, id: &str, archived: bool) -> bool {
        self.habits
            .update_with(id, |habit| habit.archived = archived)
            .is_some()
    }

    pub fn categories(&self) -> &[String] {
        self.categories.get()
    }

    /// Adds a category name; duplicates (case-insensitive) are ignored.
    pub fn add_category(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty()
            || self
                .categories
                .get()
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(name))
        {
            return false;
        }
        self.categories.update_with(|list| list.push(name.to_string()));
        true
    }

    pub fn remove_category(&mut self, name: &str) -> bool {
        if !self.categories.get().iter().any(|existing| existing == name) {
            return false;
        }
        self.categories
            .update_with(|list| list.retain(|existing| existing != name));
        true
    }

    pub(crate) fn domains(&self) -> [&dyn DomainState; 2] {
        [&self.habits, &self.categories]
    }

    pub(crate) fn domains_mut(&mut self) -> [&mut dyn DomainState; 2] {
        [&mut self.habits, &mut self.categories]
    }
}
