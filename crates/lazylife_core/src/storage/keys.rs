//! Persisted key namespace.
//!
//! Each key carries its own shape-version suffix. A future incompatible shape
//! gets a new suffix and leaves the old key orphaned instead of migrating it.

pub const SETTINGS: &str = "settings_v1";
pub const HABITS: &str = "habits_v2";
pub const HABIT_CATEGORIES: &str = "habit_categories_v1";
pub const TASKS: &str = "tasks_v2";
pub const GOALS: &str = "goals_v1";
pub const JOURNAL: &str = "journal_v1";

pub const FINANCE_ACCOUNTS: &str = "finance_accounts_v1";
pub const FINANCE_TRANSACTIONS: &str = "finance_transactions_v1";
pub const FINANCE_BUDGETS: &str = "finance_budgets_v1";
pub const FINANCE_GOALS: &str = "finance_goals_v1";
pub const FINANCE_CURRENCY: &str = "finance_currency_v1";

pub const RECIPES: &str = "recipes_v1";
pub const FOODS: &str = "foods_v1";
pub const MEAL_PLANS: &str = "meal_plans_v1";
pub const SHOPPING_LIST: &str = "shopping_list_v1";

pub const SLEEP_LOGS: &str = "sleep_logs_v1";
pub const SLEEP_SETTINGS: &str = "sleep_settings_v1";

pub const TIME_BLOCKS: &str = "time_blocks_v1";

pub const ISLAMIC_DATA: &str = "islamic_data_v2";
pub const QURAN: &str = "quran_v2";
pub const ADHKAR: &str = "adhkar_v1";
pub const ISLAMIC_SETTINGS: &str = "islamic_settings_v1";

pub const VISION_BOARD: &str = "vision_board_v1";
pub const WEEKLY_REPORTS: &str = "weekly_reports_v1";

pub const CUSTOM_THEMES: &str = "custom_themes";
pub const ACTIVE_THEME: &str = "active_theme_object";

pub const GOOGLE_LINKED: &str = "google_linked";
pub const LAST_AUTO_BACKUP: &str = "last_auto_backup";
pub const AUTO_BACKUPS: &str = "auto_backups";
pub const SYNC_DEVICE_ID: &str = "sync_device_id_v1";
