use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::domain::{
    non_blank, parse_cents, splits_from_user_info, validate_splits, Account, AccountError,
    AccountId, AccountType, Budget, BudgetId, BudgetReport, Categories, Cents, Ledger, Payee,
    ScheduledTransaction, Split, Transaction, TransactionId,
};
use crate::storage::Repository;

use super::AppError;

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, tests, ...).
pub struct LedgerService {
    repo: Repository,
}

/// Balance entry for an account
pub struct BalanceEntry {
    pub account: Account,
    pub balance: Cents,
}

/// Changes to apply to a stored account. `None` leaves a field alone.
#[derive(Debug, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    /// An empty string clears the number.
    pub number: Option<String>,
    /// An empty string clears the parent.
    pub parent: Option<String>,
}

/// Register-style entry for one account: a deposit or withdrawal plus the
/// accounts on the other side, either one category or explicit splits.
#[derive(Debug, Default, Clone)]
pub struct EntryInput {
    pub account: String,
    pub deposit: String,
    pub withdrawal: String,
    pub category: Option<String>,
    /// (account name, amount) pairs for the other side.
    pub splits: Vec<(String, String)>,
}

/// Budget with the comparison against actual activity
pub struct BudgetStatus {
    pub budget: Budget,
    pub accounts: HashMap<AccountId, Account>,
    pub report: BudgetReport,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database, bringing its schema up to date.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        repo.migrate().await?;
        Ok(Self::new(repo))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // Account operations
    // ========================

    /// Create a new account.
    pub async fn create_account(
        &self,
        account_type: AccountType,
        name: &str,
        number: Option<String>,
        parent: Option<&str>,
    ) -> Result<Account, AppError> {
        let mut account = Account::new(account_type, name)?;
        if self.repo.get_account_by_name(&account.name).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(account.name));
        }

        if let Some(number) = number {
            account = account.with_number(number);
        }
        if let Some(parent_name) = parent {
            let parent = self.get_account(parent_name).await?;
            account = account.with_parent(parent.id)?;
        }

        self.repo.save_account(&account).await?;
        Ok(account)
    }

    /// Store changes to an account that already exists.
    pub async fn update_account(&self, account: &Account) -> Result<(), AppError> {
        if let Some(other) = self.repo.get_account_by_name(&account.name).await? {
            if other.id != account.id {
                return Err(AppError::AccountAlreadyExists(account.name.clone()));
            }
        }
        if account.parent == Some(account.id) {
            return Err(AccountError::SelfParent.into());
        }
        self.check_parent_chain(account).await?;
        if !self.repo.update_account(account).await? {
            return Err(AppError::AccountNotFound(account.id.to_string()));
        }
        Ok(())
    }

    /// Walk up from the new parent; reaching `account` again means a cycle.
    async fn check_parent_chain(&self, account: &Account) -> Result<(), AppError> {
        let mut seen = HashSet::from([account.id]);
        let mut current = account.parent;
        while let Some(id) = current {
            if !seen.insert(id) {
                return Err(AccountError::ParentCycle.into());
            }
            current = self.get_account_by_id(id).await?.parent;
        }
        Ok(())
    }

    /// Apply an [`AccountUpdate`] to the named account.
    pub async fn edit_account(&self, name: &str, changes: AccountUpdate) -> Result<Account, AppError> {
        let mut account = self.get_account(name).await?;

        if let Some(new_name) = changes.name {
            account.rename(new_name)?;
        }
        if let Some(account_type) = changes.account_type {
            account.account_type = account_type;
        }
        if let Some(number) = changes.number {
            account.number = non_blank(number);
        }
        if let Some(parent_name) = changes.parent {
            account.parent = if parent_name.trim().is_empty() {
                None
            } else {
                Some(self.get_account(&parent_name).await?.id)
            };
        }

        self.update_account(&account).await?;
        Ok(account)
    }

    /// Get an account by name.
    pub async fn get_account(&self, name: &str) -> Result<Account, AppError> {
        self.repo
            .get_account_by_name(name.trim())
            .await?
            .ok_or_else(|| AppError::AccountNotFound(name.to_string()))
    }

    /// Get an account by ID.
    pub async fn get_account_by_id(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// List accounts in creation order, optionally only those of one type.
    pub async fn list_accounts(
        &self,
        account_type: Option<AccountType>,
    ) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts(account_type).await?)
    }

    /// Account names keyed by ID, for rendering splits.
    pub async fn account_names(&self) -> Result<HashMap<AccountId, String>, AppError> {
        Ok(self
            .repo
            .list_accounts(None)
            .await?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect())
    }

    /// Get balance for a single account.
    pub async fn get_balance(&self, name: &str) -> Result<BalanceEntry, AppError> {
        let account = self.get_account(name).await?;
        let balances = self.repo.account_balances().await?;
        let balance = balances.get(&account.id).copied().unwrap_or(0);
        Ok(BalanceEntry { account, balance })
    }

    /// Get balances for all accounts.
    pub async fn get_all_balances(&self) -> Result<Vec<BalanceEntry>, AppError> {
        let accounts = self.repo.list_accounts(None).await?;
        let balances = self.repo.account_balances().await?;

        Ok(accounts
            .into_iter()
            .map(|account| {
                let balance = balances.get(&account.id).copied().unwrap_or(0);
                BalanceEntry { account, balance }
            })
            .collect())
    }

    // ========================
    // Payee operations
    // ========================

    /// List all payees, sorted by name.
    pub async fn list_payees(&self) -> Result<Vec<Payee>, AppError> {
        Ok(self.repo.list_payees().await?)
    }

    // ========================
    // Transaction operations
    // ========================

    /// Resolve a register-style entry into balanced splits.
    pub async fn build_splits(&self, entry: &EntryInput) -> Result<Vec<Split>, AppError> {
        let account = self.get_account(&entry.account).await?;

        let categories = match (&entry.category, entry.splits.is_empty()) {
            (Some(_), false) => {
                return Err(AppError::InvalidInput(
                    "use either a category or splits, not both".to_string(),
                ));
            }
            (Some(category), true) => Categories::Single(self.get_account(category).await?.id),
            (None, false) => {
                let mut others = Vec::with_capacity(entry.splits.len());
                for (name, amount) in &entry.splits {
                    let other = self.get_account(name).await?;
                    others.push(Split::new(other.id, parse_cents(amount)?));
                }
                Categories::Multiple(others)
            }
            (None, true) => {
                return Err(AppError::InvalidInput(
                    "a category or splits are required".to_string(),
                ));
            }
        };

        let splits = splits_from_user_info(account.id, &entry.deposit, &entry.withdrawal, categories)?;
        validate_splits(&splits)?;
        Ok(splits)
    }

    /// Record a new transaction. Payees are matched by name and created on
    /// first use.
    pub async fn record_transaction(&self, mut txn: Transaction) -> Result<Transaction, AppError> {
        validate_splits(&txn.splits)?;
        self.check_split_accounts(&txn.splits).await?;
        self.attach_stored_payee(&mut txn.payee).await?;

        self.repo.save_transaction(&txn).await?;
        info!(txn = %txn.id, date = %txn.txn_date, "recorded transaction");
        Ok(txn)
    }

    /// Store changes to a recorded transaction.
    pub async fn update_transaction(&self, txn: &Transaction) -> Result<(), AppError> {
        validate_splits(&txn.splits)?;
        self.check_split_accounts(&txn.splits).await?;
        if !self.repo.update_transaction(txn).await? {
            return Err(AppError::TransactionNotFound(txn.id.to_string()));
        }
        debug!(txn = %txn.id, "updated transaction");
        Ok(())
    }

    pub async fn delete_transaction(&self, id: TransactionId) -> Result<(), AppError> {
        if !self.repo.delete_transaction(id).await? {
            return Err(AppError::TransactionNotFound(id.to_string()));
        }
        debug!(txn = %id, "deleted transaction");
        Ok(())
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))
    }

    pub async fn list_all_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_transactions().await?)
    }

    async fn check_split_accounts(&self, splits: &[Split]) -> Result<(), AppError> {
        for split in splits {
            if self.repo.get_account(split.account).await?.is_none() {
                return Err(AppError::AccountNotFound(split.account.to_string()));
            }
        }
        Ok(())
    }

    /// Reuse the stored payee with the same name so the returned value
    /// carries the ID that was actually saved.
    async fn attach_stored_payee(&self, payee: &mut Option<Payee>) -> Result<(), AppError> {
        if let Some(p) = payee {
            if let Some(stored) = self.repo.get_payee_by_name(&p.name).await? {
                *p = stored;
            }
        }
        Ok(())
    }

    // ========================
    // Ledger operations
    // ========================

    /// The register of one account: its transactions and the schedules
    /// that touch it.
    pub async fn get_ledger(&self, account_name: &str) -> Result<Ledger, AppError> {
        let account = self.get_account(account_name).await?;
        let mut ledger = Ledger::new(account.id);
        for txn in self.repo.list_transactions_for_account(account.id).await? {
            ledger.add_transaction(txn);
        }
        for scheduled in self.repo.list_scheduled(Some(account.id)).await? {
            ledger.add_scheduled_transaction(scheduled);
        }
        Ok(ledger)
    }

    // ========================
    // Scheduled transaction operations
    // ========================

    /// Create a new scheduled transaction. Names are unique.
    pub async fn create_scheduled(
        &self,
        mut scheduled: ScheduledTransaction,
    ) -> Result<ScheduledTransaction, AppError> {
        if self.repo.get_scheduled_by_name(&scheduled.name).await?.is_some() {
            return Err(AppError::ScheduledTransactionAlreadyExists(scheduled.name));
        }
        validate_splits(&scheduled.splits)?;
        self.check_split_accounts(&scheduled.splits).await?;
        self.attach_stored_payee(&mut scheduled.payee).await?;

        self.repo.save_scheduled(&scheduled).await?;
        debug!(name = %scheduled.name, next_due = %scheduled.next_due_date, "created schedule");
        Ok(scheduled)
    }

    /// Get a scheduled transaction by name.
    pub async fn get_scheduled(&self, name: &str) -> Result<ScheduledTransaction, AppError> {
        self.repo
            .get_scheduled_by_name(name.trim())
            .await?
            .ok_or_else(|| AppError::ScheduledTransactionNotFound(name.to_string()))
    }

    /// List schedules by next due date, optionally only those touching an account.
    pub async fn list_scheduled(
        &self,
        account_name: Option<&str>,
    ) -> Result<Vec<ScheduledTransaction>, AppError> {
        let account_id = match account_name {
            Some(name) => Some(self.get_account(name).await?.id),
            None => None,
        };
        Ok(self.repo.list_scheduled(account_id).await?)
    }

    /// Schedules whose next occurrence is on or before `today`.
    pub async fn list_due_scheduled(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<ScheduledTransaction>, AppError> {
        Ok(self
            .repo
            .list_scheduled(None)
            .await?
            .into_iter()
            .filter(|s| s.is_due(today))
            .collect())
    }

    /// Record the next occurrence of a schedule and advance it, atomically.
    pub async fn enter_scheduled(&self, name: &str) -> Result<Transaction, AppError> {
        let scheduled = self.get_scheduled(name).await?;
        self.enter_occurrence(scheduled).await.map(|(txn, _)| txn)
    }

    async fn enter_occurrence(
        &self,
        scheduled: ScheduledTransaction,
    ) -> Result<(Transaction, ScheduledTransaction), AppError> {
        let txn = scheduled.to_transaction()?;
        let mut advanced = scheduled;
        advanced.advance();

        if !self.repo.enter_scheduled(&txn, &advanced).await? {
            return Err(AppError::ScheduledTransactionNotFound(advanced.name));
        }
        info!(
            name = %advanced.name,
            date = %txn.txn_date,
            next_due = %advanced.next_due_date,
            "entered scheduled transaction"
        );
        Ok((txn, advanced))
    }

    /// Advance a schedule without recording a transaction.
    pub async fn skip_scheduled(&self, name: &str) -> Result<ScheduledTransaction, AppError> {
        let mut scheduled = self.get_scheduled(name).await?;
        let skipped = scheduled.next_due_date;
        scheduled.advance();

        if !self.repo.update_scheduled(&scheduled).await? {
            return Err(AppError::ScheduledTransactionNotFound(scheduled.name));
        }
        warn!(name = %scheduled.name, skipped = %skipped, "skipped scheduled transaction");
        Ok(scheduled)
    }

    /// Enter every occurrence that is due on or before `today`, catching up
    /// schedules that have fallen more than one period behind.
    pub async fn enter_all_due(&self, today: NaiveDate) -> Result<Vec<Transaction>, AppError> {
        let mut entered = Vec::new();
        for mut scheduled in self.list_due_scheduled(today).await? {
            while scheduled.is_due(today) {
                let (txn, advanced) = self.enter_occurrence(scheduled).await?;
                entered.push(txn);
                scheduled = advanced;
            }
        }
        Ok(entered)
    }

    pub async fn delete_scheduled(&self, name: &str) -> Result<(), AppError> {
        let scheduled = self.get_scheduled(name).await?;
        if !self.repo.delete_scheduled(scheduled.id).await? {
            return Err(AppError::ScheduledTransactionNotFound(name.to_string()));
        }
        Ok(())
    }

    // ========================
    // Budget operations
    // ========================

    /// Create a new budget.
    pub async fn create_budget(&self, budget: Budget) -> Result<Budget, AppError> {
        for account_id in budget.account_info.keys() {
            self.get_account_by_id(*account_id).await?;
        }
        self.repo.save_budget(&budget).await?;
        debug!(budget = %budget.label(), "created budget");
        Ok(budget)
    }

    /// Store changes to a budget; its per-account values are replaced.
    pub async fn update_budget(&self, budget: &Budget) -> Result<(), AppError> {
        for account_id in budget.account_info.keys() {
            self.get_account_by_id(*account_id).await?;
        }
        if !self.repo.update_budget(budget).await? {
            return Err(AppError::BudgetNotFound(budget.id.to_string()));
        }
        Ok(())
    }

    pub async fn get_budget(&self, id: BudgetId) -> Result<Budget, AppError> {
        self.repo
            .get_budget(id)
            .await?
            .ok_or_else(|| AppError::BudgetNotFound(id.to_string()))
    }

    /// List budgets, newest start date first.
    pub async fn list_budgets(&self) -> Result<Vec<Budget>, AppError> {
        Ok(self.repo.list_budgets().await?)
    }

    pub async fn delete_budget(&self, id: BudgetId) -> Result<(), AppError> {
        if !self.repo.delete_budget(id).await? {
            return Err(AppError::BudgetNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Compare a budget with the transactions dated inside its period.
    pub async fn get_budget_report(&self, id: BudgetId) -> Result<BudgetStatus, AppError> {
        let budget = self.get_budget(id).await?;
        let accounts = self.repo.list_accounts(None).await?;
        let activity = self
            .repo
            .income_spending(budget.start_date, budget.end_date)
            .await?;

        let report = budget.report(&accounts, &activity);
        Ok(BudgetStatus {
            budget,
            accounts: accounts.into_iter().map(|a| (a.id, a)).collect(),
            report,
        })
    }
}
