mod files;
mod repository;

pub use files::*;
pub use repository::*;

/// SQL migration for accounts, payees and transactions
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for scheduled transactions
pub const MIGRATION_002_SCHEDULED: &str = include_str!("migrations/002_scheduled_transactions.sql");

/// SQL migration for budgets
pub const MIGRATION_003_BUDGETS: &str = include_str!("migrations/003_budgets.sql");
