//! Declarative domain table driving assembly, validation and restore.
//!
//! Adding a domain means adding one row here; assembly, validation, replace
//! and merge all iterate this table and never name domains themselves.

use crate::storage::keys;

/// Coarse JSON shape a snapshot field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    List,
    Object,
    /// Opaque document; any JSON value is accepted.
    Any,
}

/// How Merge treats a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// Add entities whose `id` is not present yet.
    ById,
    /// Add string items not present yet.
    Union,
    /// Singleton; only Replace touches it.
    Skip,
}

/// One snapshot field and the storage key it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainSpec {
    /// Field path inside the snapshot, e.g. `["finance", "accounts"]`.
    pub path: &'static [&'static str],
    pub key: &'static str,
    pub shape: Shape,
    pub merge: MergeRule,
    /// Core domains must be present for a snapshot to validate.
    pub required: bool,
}

impl DomainSpec {
    const fn new(
        path: &'static [&'static str],
        key: &'static str,
        shape: Shape,
        merge: MergeRule,
    ) -> Self {
        Self {
            path,
            key,
            shape,
            merge,
            required: false,
        }
    }

    const fn core(mut self) -> Self {
        self.required = true;
        self
    }

    /// Dotted field name for logs and reports, e.g. `finance.accounts`.
    pub fn name(&self) -> String {
        self.path.join(".")
    }
}

use MergeRule::{ById, Skip, Union};
use Shape::{Any, List, Object};

pub const DOMAIN_TABLE: &[DomainSpec] = &[
    DomainSpec::new(&["settings"], keys::SETTINGS, Object, Skip).core(),
    DomainSpec::new(&["habits"], keys::HABITS, List, ById).core(),
    DomainSpec::new(&["tasks"], keys::TASKS, List, ById).core(),
    DomainSpec::new(&["habitCategories"], keys::HABIT_CATEGORIES, List, Union),
    DomainSpec::new(&["goals"], keys::GOALS, List, ById),
    DomainSpec::new(&["journal"], keys::JOURNAL, List, ById),
    DomainSpec::new(&["finance", "accounts"], keys::FINANCE_ACCOUNTS, List, ById),
    DomainSpec::new(&["finance", "transactions"], keys::FINANCE_TRANSACTIONS, List, ById),
    DomainSpec::new(&["finance", "budgets"], keys::FINANCE_BUDGETS, List, ById),
    DomainSpec::new(&["finance", "savingsGoals"], keys::FINANCE_GOALS, List, ById),
    DomainSpec::new(&["finance", "currency"], keys::FINANCE_CURRENCY, Any, Skip),
    DomainSpec::new(&["meals", "recipes"], keys::RECIPES, List, ById),
    DomainSpec::new(&["meals", "foods"], keys::FOODS, List, ById),
    DomainSpec::new(&["meals", "mealPlans"], keys::MEAL_PLANS, List, ById),
    DomainSpec::new(&["meals", "shoppingList"], keys::SHOPPING_LIST, List, ById),
    DomainSpec::new(&["sleepLogs"], keys::SLEEP_LOGS, List, ById),
    DomainSpec::new(&["sleepSettings"], keys::SLEEP_SETTINGS, Object, Skip),
    DomainSpec::new(&["timeBlocks"], keys::TIME_BLOCKS, List, ById),
    DomainSpec::new(&["prayers"], keys::ISLAMIC_DATA, Any, Skip),
    DomainSpec::new(&["quran"], keys::QURAN, Any, Skip),
    DomainSpec::new(&["adhkar"], keys::ADHKAR, Any, Skip),
    DomainSpec::new(&["islamicSettings"], keys::ISLAMIC_SETTINGS, Object, Skip),
    DomainSpec::new(&["customThemes"], keys::CUSTOM_THEMES, List, ById),
    DomainSpec::new(&["activeTheme"], keys::ACTIVE_THEME, Any, Skip),
    DomainSpec::new(&["visionBoard"], keys::VISION_BOARD, List, ById),
    DomainSpec::new(&["reports"], keys::WEEKLY_REPORTS, List, ById),
];

pub fn spec_for_key(key: &str) -> Option<&'static DomainSpec> {
    DOMAIN_TABLE.iter().find(|spec| spec.key == key)
}

#[cfg(test)]
mod tests {
    use super::{MergeRule, Shape, DOMAIN_TABLE};
    use std::collections::HashSet;

    #[test]
    fn keys_and_paths_are_unique() {
        let keys: HashSet<&str> = DOMAIN_TABLE.iter().map(|spec| spec.key).collect();
        let paths: HashSet<String> = DOMAIN_TABLE.iter().map(|spec| spec.name()).collect();
        assert_eq!(keys.len(), DOMAIN_TABLE.len());
        assert_eq!(paths.len(), DOMAIN_TABLE.len());
    }

    #[test]
    fn core_domains_are_settings_habits_tasks() {
        let core: Vec<String> = DOMAIN_TABLE
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| spec.name())
            .collect();
        assert_eq!(core, ["settings", "habits", "tasks"]);
    }

    #[test]
    fn singletons_are_never_merged() {
        for spec in DOMAIN_TABLE.iter().filter(|spec| spec.shape != Shape::List) {
            assert_eq!(spec.merge, MergeRule::Skip, "{}", spec.name());
        }
    }
}
