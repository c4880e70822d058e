//! Per-domain state stores.
//!
//! # Responsibility
//! - Own every persisted domain key through one store each.
//! - Expose the whole set as `DomainStores`, the unit snapshot assembly and
//!   post-restore reloads operate on.
//!
//! # Invariants
//! - Each key is owned by exactly one store; stores never write each
//!   other's keys.
//! - Settings are opened first so every later store sees them through the
//!   shared `SettingsHandle`.

use crate::clock::Clock;
use crate::model::date_key::DateKeyError;
use crate::model::habit::HabitValidationError;
use crate::storage::{keys, KeyValueStore};
use log::info;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod changes;
mod decode;
pub mod goal_store;
pub mod habit_store;
pub mod records;
pub mod settings_store;
pub mod store;
pub mod task_store;

pub use changes::ChangeFeed;
pub use goal_store::{GoalProgress, GoalStore};
pub use habit_store::HabitStore;
pub use records::{FinanceStores, IslamicStores, MealStores, RecordStore, SleepStores, ThemeStores};
pub use settings_store::SettingsStore;
pub use store::{DomainState, ListStore, ObjectStore, SettingsHandle, StoreContext};
pub use task_store::TaskStore;

/// Validation error raised by domain operations.
#[derive(Debug)]
pub enum DomainError {
    Habit(HabitValidationError),
    InvalidDate(DateKeyError),
    InvalidGoal(&'static str),
    InvalidSettings(serde_json::Error),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Habit(err) => write!(f, "invalid habit: {err}"),
            Self::InvalidDate(err) => write!(f, "{err}"),
            Self::InvalidGoal(details) => write!(f, "invalid goal: {details}"),
            Self::InvalidSettings(err) => write!(f, "invalid settings patch: {err}"),
        }
    }
}

impl Error for DomainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Habit(err) => Some(err),
            Self::InvalidDate(err) => Some(err),
            Self::InvalidGoal(_) => None,
            Self::InvalidSettings(err) => Some(err),
        }
    }
}

/// Every domain store of one local profile.
pub struct DomainStores {
    ctx: StoreContext,
    pub settings: SettingsStore,
    pub habits: HabitStore,
    pub tasks: TaskStore,
    pub goals: GoalStore,
    pub journal: RecordStore,
    pub finance: FinanceStores,
    pub meals: MealStores,
    pub sleep: SleepStores,
    pub time_blocks: RecordStore,
    pub islamic: IslamicStores,
    pub vision_board: RecordStore,
    pub reports: RecordStore,
    pub themes: ThemeStores,
}

impl DomainStores {
    /// Opens and loads every domain store over `kv`.
    pub fn open(kv: KeyValueStore, clock: Arc<dyn Clock>) -> Self {
        let ctx = StoreContext::new(kv, clock);
        let settings = SettingsStore::open(ctx.clone());
        let stores = Self {
            settings,
            habits: HabitStore::open(ctx.clone()),
            tasks: TaskStore::open(ctx.clone()),
            goals: GoalStore::open(ctx.clone()),
            journal: ListStore::open(keys::JOURNAL, ctx.clone()),
            finance: FinanceStores::open(&ctx),
            meals: MealStores::open(&ctx),
            sleep: SleepStores::open(&ctx),
            time_blocks: ListStore::open(keys::TIME_BLOCKS, ctx.clone()),
            islamic: IslamicStores::open(&ctx),
            vision_board: ListStore::open(keys::VISION_BOARD, ctx.clone()),
            reports: ListStore::open(keys::WEEKLY_REPORTS, ctx.clone()),
            themes: ThemeStores::open(&ctx),
            ctx,
        };
        info!(
            "event=stores_open module=domain status=ok domains={}",
            stores.domains().len()
        );
        stores
    }

    pub fn context(&self) -> &StoreContext {
        &self.ctx
    }

    pub fn kv(&self) -> &KeyValueStore {
        &self.ctx.kv
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.ctx.clock
    }

    pub fn changes(&self) -> &ChangeFeed {
        &self.ctx.changes
    }

    /// Every owned key, in registration order.
    pub fn domains(&self) -> Vec<&dyn DomainState> {
        let mut all: Vec<&dyn DomainState> = Vec::new();
        all.push(&self.settings);
        all.extend(self.habits.domains());
        all.push(self.tasks.domain());
        all.push(self.goals.domain());
        all.push(&self.journal);
        all.extend(self.finance.domains());
        all.extend(self.meals.domains());
        all.extend(self.sleep.domains());
        all.push(&self.time_blocks);
        all.extend(self.islamic.domains());
        all.push(&self.vision_board);
        all.push(&self.reports);
        all.extend(self.themes.domains());
        all
    }

    pub fn domains_mut(&mut self) -> Vec<&mut dyn DomainState> {
        let mut all: Vec<&mut dyn DomainState> = Vec::new();
        all.push(&mut self.settings);
        all.extend(self.habits.domains_mut());
        all.push(self.tasks.domain_mut());
        all.push(self.goals.domain_mut());
        all.push(&mut self.journal);
        all.extend(self.finance.domains_mut());
        all.extend(self.meals.domains_mut());
        all.extend(self.sleep.domains_mut());
        all.push(&mut self.time_blocks);
        all.extend(self.islamic.domains_mut());
        all.push(&mut self.vision_board);
        all.push(&mut self.reports);
        all.extend(self.themes.domains_mut());
        all
    }

    /// In-memory value of the store owning `key`.
    pub fn value_for(&self, key: &str) -> Option<Value> {
        self.domains()
            .into_iter()
            .find(|domain| domain.storage_key() == key)
            .map(|domain| domain.export_value())
    }

    /// Re-reads every key from storage. Reloads never mark the change feed.
    pub fn reload_all(&mut self) -> usize {
        let mut reloaded = 0;
        for domain in self.domains_mut() {
            domain.reload();
            reloaded += 1;
        }
        info!("event=stores_reload module=domain status=ok domains={reloaded}");
        reloaded
    }
}
