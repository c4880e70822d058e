//! Record-backed domains: stores whose entities carry no engine-enforced
//! invariants beyond identity.

use crate::domain::store::{DomainState, ListStore, ObjectStore, StoreContext};
use crate::model::entity::{new_entity_id, IMMUTABLE_FIELDS};
use crate::model::record::Record;
use crate::storage::keys;
use serde_json::{json, Map, Value};

/// List store over verbatim JSON records.
pub type RecordStore = ListStore<Record>;

impl ListStore<Record> {
    /// Appends a record built from `fields` with a fresh id and `createdAt`.
    ///
    /// Caller-supplied `id` / `createdAt` values are ignored.
    pub fn add(&mut self, fields: Map<String, Value>) -> Record {
        let ctx = self.context();
        let mut record = Map::new();
        record.insert("id".to_string(), json!(new_entity_id(ctx.clock.now_ms())));
        for (key, value) in fields {
            if !IMMUTABLE_FIELDS.contains(&key.as_str()) {
                record.insert(key, value);
            }
        }
        record.insert("createdAt".to_string(), json!(ctx.now_iso()));
        self.insert(Record(record))
    }
}

fn json_null() -> Value {
    Value::Null
}

fn json_empty_object() -> Value {
    Value::Object(Map::new())
}

fn default_currency() -> Value {
    json!("USD")
}

fn default_sleep_settings() -> Value {
    json!({ "targetHours": 8, "bedtime": "23:00", "wakeTime": "07:00" })
}

pub struct FinanceStores {
    pub accounts: RecordStore,
    pub transactions: RecordStore,
    pub budgets: RecordStore,
    pub savings_goals: RecordStore,
    pub currency: ObjectStore<Value>,
}

impl FinanceStores {
    pub fn open(ctx: &StoreContext) -> Self {
        Self {
            accounts: ListStore::open(keys::FINANCE_ACCOUNTS, ctx.clone()),
            transactions: ListStore::open(keys::FINANCE_TRANSACTIONS, ctx.clone()),
            budgets: ListStore::open(keys::FINANCE_BUDGETS, ctx.clone()),
            savings_goals: ListStore::open(keys::FINANCE_GOALS, ctx.clone()),
            currency: ObjectStore::open(keys::FINANCE_CURRENCY, ctx.clone(), default_currency),
        }
    }

    pub(crate) fn domains(&self) -> [&dyn DomainState; 5] {
        [
            &self.accounts,
            &self.transactions,
            &self.budgets,
            &self.savings_goals,
            &self.currency,
        ]
    }

    pub(crate) fn domains_mut(&mut self) -> [&mut dyn DomainState; 5] {
        [
            &mut self.accounts,
            &mut self.transactions,
            &mut self.budgets,
            &mut self.savings_goals,
            &mut self.currency,
        ]
    }
}

pub struct MealStores {
    pub recipes: RecordStore,
    pub foods: RecordStore,
    pub meal_plans: RecordStore,
    pub shopping_list: RecordStore,
}

impl MealStores {
    pub fn open(ctx: &StoreContext) -> Self {
        Self {
            recipes: ListStore::open(keys::RECIPES, ctx.clone()),
            foods: ListStore::open(keys::FOODS, ctx.clone()),
            meal_plans: ListStore::open(keys::MEAL_PLANS, ctx.clone()),
            shopping_list: ListStore::open(keys::SHOPPING_LIST, ctx.clone()),
        }
    }

    pub(crate) fn domains(&self) -> [&dyn DomainState; 4] {
        [&self.recipes, &self.foods, &self.meal_plans, &self.shopping_list]
    }

    pub(crate) fn domains_mut(&mut self) -> [&mut dyn DomainState; 4] {
        [
            &mut self.recipes,
            &mut self.foods,
            &mut self.meal_plans,
            &mut self.shopping_list,
        ]
    }
}

pub struct SleepStores {
    pub logs: RecordStore,
    pub settings: ObjectStore<Value>,
}

impl SleepStores {
    pub fn open(ctx: &StoreContext) -> Self {
        Self {
            logs: ListStore::open(keys::SLEEP_LOGS, ctx.clone()),
            settings: ObjectStore::open(keys::SLEEP_SETTINGS, ctx.clone(), default_sleep_settings),
        }
    }

    pub(crate) fn domains(&self) -> [&dyn DomainState; 2] {
        [&self.logs, &self.settings]
    }

    pub(crate) fn domains_mut(&mut self) -> [&mut dyn DomainState; 2] {
        [&mut self.logs, &mut self.settings]
    }
}

/// Prayer, Quran and adhkar tracking. Their inner shapes belong to the
/// calculation modules, so they are stored as opaque documents.
pub struct IslamicStores {
    pub prayers: ObjectStore<Value>,
    pub quran: ObjectStore<Value>,
    pub adhkar: ObjectStore<Value>,
    pub settings: ObjectStore<Value>,
}

impl IslamicStores {
    pub fn open(ctx: &StoreContext) -> Self {
        Self {
            prayers: ObjectStore::open(keys::ISLAMIC_DATA, ctx.clone(), json_empty_object),
            quran: ObjectStore::open(keys::QURAN, ctx.clone(), json_empty_object),
            adhkar: ObjectStore::open(keys::ADHKAR, ctx.clone(), json_empty_object),
            settings: ObjectStore::open(keys::ISLAMIC_SETTINGS, ctx.clone(), json_empty_object),
        }
    }

    pub(crate) fn domains(&self) -> [&dyn DomainState; 4] {
        [&self.prayers, &self.quran, &self.adhkar, &self.settings]
    }

    pub(crate) fn domains_mut(&mut self) -> [&mut dyn DomainState; 4] {
        [
            &mut self.prayers,
            &mut self.quran,
            &mut self.adhkar,
            &mut self.settings,
        ]
    }
}

pub struct ThemeStores {
    pub custom: RecordStore,
    /// `null` means the built-in theme is active.
    pub active: ObjectStore<Value>,
}

impl ThemeStores {
    pub fn open(ctx: &StoreContext) -> Self {
        Self {
            custom: ListStore::open(keys::CUSTOM_THEMES, ctx.clone()),
            active: ObjectStore::open(keys::ACTIVE_THEME, ctx.clone(), json_null),
        }
    }

    pub(crate) fn domains(&self) -> [&dyn DomainState; 2] {
        [&self.custom, &self.active]
    }

    pub(crate) fn domains_mut(&mut self) -> [&mut dyn DomainState; 2] {
        [&mut self.custom, &mut self.active]
    }
}
