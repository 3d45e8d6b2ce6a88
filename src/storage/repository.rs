use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, AccountType, Budget, BudgetId, BudgetInfo, Cents, Frequency,
    IncomeSpending, Payee, PayeeId, ScheduledTransaction, ScheduledTransactionId, Split,
    Transaction, TransactionId, TxnStatus,
};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_SCHEDULED, MIGRATION_003_BUDGETS};

const DATE_FORMAT: &str = "%Y-%m-%d";

const TXN_COLUMNS: &str = "t.id, t.txn_type, t.txn_date, t.description, t.status, \
     t.payee_id, p.name AS payee_name";

const SCHEDULED_COLUMNS: &str = "s.id, s.name, s.frequency, s.next_due_date, s.txn_type, \
     s.description, s.payee_id, p.name AS payee_name";

/// Repository for persisting and querying the ledger.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    /// Foreign keys are enforced on every connection.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Every migration is idempotent.
    pub async fn migrate(&self) -> Result<()> {
        for (name, sql) in [
            ("001", MIGRATION_001_INITIAL),
            ("002", MIGRATION_002_SCHEDULED),
            ("003", MIGRATION_003_BUDGETS),
        ] {
            sqlx::raw_sql(sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to run migration {}", name))?;
        }
        debug!("database schema is up to date");
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Current schema version, as recorded in the `misc` table.
    pub async fn schema_version(&self) -> Result<i64> {
        let row = sqlx::query("SELECT CAST(value AS INTEGER) AS version FROM misc WHERE key = 'schema_version'")
            .fetch_one(&self.pool)
            .await
            .context("Failed to read schema version")?;
        Ok(row.get("version"))
    }

    /// Names of the tables in the database, sorted.
    pub async fn table_names(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tables")?;
        Ok(rows.iter().map(|r| r.get("name")).collect())
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, type, number, name, parent_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(account.account_type.as_str())
        .bind(&account.number)
        .bind(&account.name)
        .bind(account.parent.map(|id| id.to_string()))
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        debug!(account = %account.name, "saved account");
        Ok(())
    }

    /// Update an existing account. Returns false if no such account is stored.
    pub async fn update_account(&self, account: &Account) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET type = ?, number = ?, name = ?, parent_id = ?
            WHERE id = ?
            "#,
        )
        .bind(account.account_type.as_str())
        .bind(&account.number)
        .bind(&account.name)
        .bind(account.parent.map(|id| id.to_string()))
        .bind(account.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update account")?;
        Ok(result.rows_affected() == 1)
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, type, number, name, parent_id, created_at FROM accounts WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Get an account by name.
    pub async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, type, number, name, parent_id, created_at FROM accounts WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by name")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// List accounts in creation order, optionally restricted to one type.
    pub async fn list_accounts(&self, account_type: Option<AccountType>) -> Result<Vec<Account>> {
        let rows = match account_type {
            Some(t) => {
                sqlx::query(
                    "SELECT id, type, number, name, parent_id, created_at FROM accounts WHERE type = ? ORDER BY rowid",
                )
                .bind(t.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT id, type, number, name, parent_id, created_at FROM accounts ORDER BY rowid",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Balance of every account that has at least one split.
    pub async fn account_balances(&self) -> Result<HashMap<AccountId, Cents>> {
        let rows = sqlx::query(
            "SELECT account_id, SUM(amount_cents) AS balance FROM txn_splits GROUP BY account_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to compute account balances")?;

        let mut balances = HashMap::new();
        for row in rows {
            let id = parse_uuid(row.get("account_id"), "account ID")?;
            balances.insert(id, row.get::<Cents, _>("balance"));
        }
        Ok(balances)
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let type_str: String = row.get("type");
        let created_at_str: String = row.get("created_at");
        let parent: Option<String> = row.get("parent_id");

        Ok(Account {
            id: parse_uuid(row.get("id"), "account ID")?,
            account_type: AccountType::from_str(&type_str)?,
            number: row.get("number"),
            name: row.get("name"),
            parent: parent.map(|p| parse_uuid(p, "parent ID")).transpose()?,
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Payee operations
    // ========================

    /// Save a new payee. Names are unique.
    pub async fn save_payee(&self, payee: &Payee) -> Result<()> {
        sqlx::query("INSERT INTO payees (id, name) VALUES (?, ?)")
            .bind(payee.id.to_string())
            .bind(&payee.name)
            .execute(&self.pool)
            .await
            .context("Failed to save payee")?;
        Ok(())
    }

    pub async fn get_payee_by_name(&self, name: &str) -> Result<Option<Payee>> {
        let row = sqlx::query("SELECT id, name FROM payees WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch payee")?;

        row.map(|r| -> Result<Payee> {
            Ok(Payee {
                id: parse_uuid(r.get("id"), "payee ID")?,
                name: r.get("name"),
            })
        })
        .transpose()
    }

    /// List all payees, sorted by name.
    pub async fn list_payees(&self) -> Result<Vec<Payee>> {
        let rows = sqlx::query("SELECT id, name FROM payees ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list payees")?;

        rows.iter()
            .map(|r| {
                Ok(Payee {
                    id: parse_uuid(r.get("id"), "payee ID")?,
                    name: r.get("name"),
                })
            })
            .collect()
    }

    /// Resolve a payee by name inside an open SQL transaction, creating it on
    /// first use. Returns the stored payee ID.
    async fn ensure_payee(conn: &mut SqliteConnection, payee: &Payee) -> Result<PayeeId> {
        let existing = sqlx::query("SELECT id FROM payees WHERE name = ?")
            .bind(&payee.name)
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to look up payee")?;

        if let Some(row) = existing {
            return parse_uuid(row.get("id"), "payee ID");
        }

        sqlx::query("INSERT INTO payees (id, name) VALUES (?, ?)")
            .bind(payee.id.to_string())
            .bind(&payee.name)
            .execute(&mut *conn)
            .await
            .context("Failed to save payee")?;
        debug!(payee = %payee.name, "created payee");
        Ok(payee.id)
    }

    async fn payee_id(conn: &mut SqliteConnection, payee: Option<&Payee>) -> Result<Option<String>> {
        match payee {
            Some(p) => Ok(Some(Self::ensure_payee(conn, p).await?.to_string())),
            None => Ok(None),
        }
    }

    // ========================
    // Transaction operations
    // ========================

    /// Save a new transaction and its splits atomically.
    pub async fn save_transaction(&self, txn: &Transaction) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        Self::insert_transaction(&mut tx, txn).await?;
        tx.commit().await.context("Failed to commit transaction")?;
        debug!(txn = %txn.id, splits = txn.splits.len(), "saved transaction");
        Ok(())
    }

    async fn insert_transaction(conn: &mut SqliteConnection, txn: &Transaction) -> Result<()> {
        let payee_id = Self::payee_id(conn, txn.payee.as_ref()).await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, txn_type, txn_date, payee_id, description, status, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(txn.id.to_string())
        .bind(&txn.txn_type)
        .bind(txn.txn_date.format(DATE_FORMAT).to_string())
        .bind(payee_id)
        .bind(&txn.description)
        .bind(txn.status.map(|s| s.as_str()))
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to save transaction")?;

        Self::insert_txn_splits(conn, txn.id, &txn.splits).await
    }

    async fn insert_txn_splits(
        conn: &mut SqliteConnection,
        txn_id: TransactionId,
        splits: &[Split],
    ) -> Result<()> {
        for split in splits {
            sqlx::query("INSERT INTO txn_splits (txn_id, account_id, amount_cents) VALUES (?, ?, ?)")
                .bind(txn_id.to_string())
                .bind(split.account.to_string())
                .bind(split.amount)
                .execute(&mut *conn)
                .await
                .context("Failed to save transaction split")?;
        }
        Ok(())
    }

    /// Update a stored transaction, replacing its splits.
    /// Returns false (and writes nothing) if the transaction isn't stored.
    pub async fn update_transaction(&self, txn: &Transaction) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let payee_id = Self::payee_id(&mut tx, txn.payee.as_ref()).await?;

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET txn_type = ?, txn_date = ?, payee_id = ?, description = ?, status = ?
            WHERE id = ?
            "#,
        )
        .bind(&txn.txn_type)
        .bind(txn.txn_date.format(DATE_FORMAT).to_string())
        .bind(payee_id)
        .bind(&txn.description)
        .bind(txn.status.map(|s| s.as_str()))
        .bind(txn.id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to update transaction")?;

        if result.rows_affected() != 1 {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM txn_splits WHERE txn_id = ?")
            .bind(txn.id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete old splits")?;
        Self::insert_txn_splits(&mut tx, txn.id, &txn.splits).await?;

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(true)
    }

    /// Delete a transaction and its splits. Returns false if it wasn't stored.
    pub async fn delete_transaction(&self, id: TransactionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete transaction")?;
        Ok(result.rows_affected() == 1)
    }

    /// Get a transaction by ID.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TXN_COLUMNS} FROM transactions t LEFT JOIN payees p ON p.id = t.payee_id WHERE t.id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        match row {
            Some(row) => Ok(Some(self.row_to_transaction(&row).await?)),
            None => Ok(None),
        }
    }

    /// List the transactions that touch an account, by date then entry order.
    pub async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TXN_COLUMNS}
            FROM transactions t LEFT JOIN payees p ON p.id = t.payee_id
            WHERE t.id IN (SELECT txn_id FROM txn_splits WHERE account_id = ?)
            ORDER BY t.txn_date, t.rowid
            "#
        ))
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for account")?;

        let mut txns = Vec::with_capacity(rows.len());
        for row in &rows {
            txns.push(self.row_to_transaction(row).await?);
        }
        Ok(txns)
    }

    /// List all transactions, by date then entry order.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TXN_COLUMNS} FROM transactions t LEFT JOIN payees p ON p.id = t.payee_id ORDER BY t.txn_date, t.rowid"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        let mut txns = Vec::with_capacity(rows.len());
        for row in &rows {
            txns.push(self.row_to_transaction(row).await?);
        }
        Ok(txns)
    }

    async fn load_splits(&self, table: &str, owner_column: &str, owner: Uuid) -> Result<Vec<Split>> {
        let rows = sqlx::query(&format!(
            "SELECT account_id, amount_cents FROM {table} WHERE {owner_column} = ? ORDER BY id"
        ))
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to load splits from {}", table))?;

        rows.iter()
            .map(|r| {
                Ok(Split {
                    account: parse_uuid(r.get("account_id"), "split account ID")?,
                    amount: r.get("amount_cents"),
                })
            })
            .collect()
    }

    async fn row_to_transaction(&self, row: &SqliteRow) -> Result<Transaction> {
        let id = parse_uuid(row.get("id"), "transaction ID")?;
        let status: Option<String> = row.get("status");
        let date_str: String = row.get("txn_date");

        Ok(Transaction {
            id,
            splits: self.load_splits("txn_splits", "txn_id", id).await?,
            txn_date: parse_stored_date(&date_str)?,
            txn_type: row.get("txn_type"),
            payee: row_to_payee(row)?,
            description: row.get("description"),
            status: match status {
                Some(s) => TxnStatus::parse(&s)?,
                None => None,
            },
        })
    }

    // ========================
    // Scheduled transaction operations
    // ========================

    /// Save a new scheduled transaction and its splits atomically.
    pub async fn save_scheduled(&self, scheduled: &ScheduledTransaction) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let payee_id = Self::payee_id(&mut tx, scheduled.payee.as_ref()).await?;

        sqlx::query(
            r#"
            INSERT INTO scheduled_transactions (id, name, frequency, next_due_date, txn_type, payee_id, description)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(scheduled.id.to_string())
        .bind(&scheduled.name)
        .bind(scheduled.frequency.as_str())
        .bind(scheduled.next_due_date.format(DATE_FORMAT).to_string())
        .bind(&scheduled.txn_type)
        .bind(payee_id)
        .bind(&scheduled.description)
        .execute(&mut *tx)
        .await
        .context("Failed to save scheduled transaction")?;

        Self::insert_scheduled_splits(&mut tx, scheduled.id, &scheduled.splits).await?;
        tx.commit().await.context("Failed to commit scheduled transaction")?;
        debug!(name = %scheduled.name, "saved scheduled transaction");
        Ok(())
    }

    async fn insert_scheduled_splits(
        conn: &mut SqliteConnection,
        scheduled_id: ScheduledTransactionId,
        splits: &[Split],
    ) -> Result<()> {
        for split in splits {
            sqlx::query(
                "INSERT INTO scheduled_txn_splits (scheduled_txn_id, account_id, amount_cents) VALUES (?, ?, ?)",
            )
            .bind(scheduled_id.to_string())
            .bind(split.account.to_string())
            .bind(split.amount)
            .execute(&mut *conn)
            .await
            .context("Failed to save scheduled split")?;
        }
        Ok(())
    }

    async fn write_scheduled_update(
        conn: &mut SqliteConnection,
        scheduled: &ScheduledTransaction,
    ) -> Result<bool> {
        let payee_id = Self::payee_id(conn, scheduled.payee.as_ref()).await?;
        let result = sqlx::query(
            r#"
            UPDATE scheduled_transactions
            SET name = ?, frequency = ?, next_due_date = ?, txn_type = ?, payee_id = ?, description = ?
            WHERE id = ?
            "#,
        )
        .bind(&scheduled.name)
        .bind(scheduled.frequency.as_str())
        .bind(scheduled.next_due_date.format(DATE_FORMAT).to_string())
        .bind(&scheduled.txn_type)
        .bind(payee_id)
        .bind(&scheduled.description)
        .bind(scheduled.id.to_string())
        .execute(&mut *conn)
        .await
        .context("Failed to update scheduled transaction")?;

        if result.rows_affected() != 1 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM scheduled_txn_splits WHERE scheduled_txn_id = ?")
            .bind(scheduled.id.to_string())
            .execute(&mut *conn)
            .await
            .context("Failed to delete old scheduled splits")?;
        Self::insert_scheduled_splits(conn, scheduled.id, &scheduled.splits).await?;
        Ok(true)
    }

    /// Update a stored schedule, replacing its splits.
    /// Returns false (and writes nothing) if the schedule isn't stored.
    pub async fn update_scheduled(&self, scheduled: &ScheduledTransaction) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        if !Self::write_scheduled_update(&mut tx, scheduled).await? {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(false);
        }
        tx.commit().await.context("Failed to commit scheduled transaction")?;
        Ok(true)
    }

    /// Record an occurrence of a schedule and store the advanced schedule in
    /// one SQL transaction.
    pub async fn enter_scheduled(
        &self,
        txn: &Transaction,
        advanced: &ScheduledTransaction,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        Self::insert_transaction(&mut tx, txn).await?;
        if !Self::write_scheduled_update(&mut tx, advanced).await? {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(false);
        }
        tx.commit().await.context("Failed to commit scheduled entry")?;
        Ok(true)
    }

    pub async fn delete_scheduled(&self, id: ScheduledTransactionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM scheduled_transactions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete scheduled transaction")?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn get_scheduled(
        &self,
        id: ScheduledTransactionId,
    ) -> Result<Option<ScheduledTransaction>> {
        let row = sqlx::query(&format!(
            "SELECT {SCHEDULED_COLUMNS} FROM scheduled_transactions s LEFT JOIN payees p ON p.id = s.payee_id WHERE s.id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch scheduled transaction")?;

        match row {
            Some(row) => Ok(Some(self.row_to_scheduled(&row).await?)),
            None => Ok(None),
        }
    }

    pub async fn get_scheduled_by_name(&self, name: &str) -> Result<Option<ScheduledTransaction>> {
        let row = sqlx::query(&format!(
            "SELECT {SCHEDULED_COLUMNS} FROM scheduled_transactions s LEFT JOIN payees p ON p.id = s.payee_id WHERE s.name = ?"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch scheduled transaction by name")?;

        match row {
            Some(row) => Ok(Some(self.row_to_scheduled(&row).await?)),
            None => Ok(None),
        }
    }

    /// List schedules by next due date, optionally only those touching an account.
    pub async fn list_scheduled(
        &self,
        account_id: Option<AccountId>,
    ) -> Result<Vec<ScheduledTransaction>> {
        let base = format!(
            "SELECT {SCHEDULED_COLUMNS} FROM scheduled_transactions s LEFT JOIN payees p ON p.id = s.payee_id"
        );
        let rows = match account_id {
            Some(id) => {
                sqlx::query(&format!(
                    "{base} WHERE s.id IN (SELECT scheduled_txn_id FROM scheduled_txn_splits WHERE account_id = ?) ORDER BY s.next_due_date, s.name"
                ))
                .bind(id.to_string())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!("{base} ORDER BY s.next_due_date, s.name"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("Failed to list scheduled transactions")?;

        let mut scheduled = Vec::with_capacity(rows.len());
        for row in &rows {
            scheduled.push(self.row_to_scheduled(row).await?);
        }
        Ok(scheduled)
    }

    async fn row_to_scheduled(&self, row: &SqliteRow) -> Result<ScheduledTransaction> {
        let id = parse_uuid(row.get("id"), "scheduled transaction ID")?;
        let frequency: String = row.get("frequency");
        let next_due: String = row.get("next_due_date");

        Ok(ScheduledTransaction {
            id,
            name: row.get("name"),
            frequency: Frequency::from_str(&frequency)?,
            next_due_date: parse_stored_date(&next_due)?,
            splits: self
                .load_splits("scheduled_txn_splits", "scheduled_txn_id", id)
                .await?,
            txn_type: row.get("txn_type"),
            payee: row_to_payee(row)?,
            description: row.get("description"),
        })
    }

    // ========================
    // Budget operations
    // ========================

    /// Save a new budget and its values atomically.
    pub async fn save_budget(&self, budget: &Budget) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query("INSERT INTO budgets (id, name, start_date, end_date) VALUES (?, ?, ?, ?)")
            .bind(budget.id.to_string())
            .bind(&budget.name)
            .bind(budget.start_date.format(DATE_FORMAT).to_string())
            .bind(budget.end_date.format(DATE_FORMAT).to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to save budget")?;
        Self::insert_budget_values(&mut tx, budget).await?;
        tx.commit().await.context("Failed to commit budget")?;
        Ok(())
    }

    /// Update a stored budget; its values are replaced wholesale.
    /// Returns false (and writes nothing) if the budget isn't stored.
    pub async fn update_budget(&self, budget: &Budget) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let result = sqlx::query("UPDATE budgets SET name = ?, start_date = ?, end_date = ? WHERE id = ?")
            .bind(&budget.name)
            .bind(budget.start_date.format(DATE_FORMAT).to_string())
            .bind(budget.end_date.format(DATE_FORMAT).to_string())
            .bind(budget.id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to update budget")?;

        if result.rows_affected() != 1 {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM budget_values WHERE budget_id = ?")
            .bind(budget.id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete old budget values")?;
        Self::insert_budget_values(&mut tx, budget).await?;
        tx.commit().await.context("Failed to commit budget")?;
        Ok(true)
    }

    async fn insert_budget_values(conn: &mut SqliteConnection, budget: &Budget) -> Result<()> {
        for (account_id, info) in &budget.account_info {
            sqlx::query(
                r#"
                INSERT INTO budget_values (budget_id, account_id, amount_cents, carryover_cents, notes)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(budget.id.to_string())
            .bind(account_id.to_string())
            .bind(info.amount)
            .bind(info.carryover)
            .bind(&info.notes)
            .execute(&mut *conn)
            .await
            .context("Failed to save budget value")?;
        }
        Ok(())
    }

    pub async fn get_budget(&self, id: BudgetId) -> Result<Option<Budget>> {
        let row = sqlx::query("SELECT id, name, start_date, end_date FROM budgets WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch budget")?;

        match row {
            Some(row) => Ok(Some(self.row_to_budget(&row).await?)),
            None => Ok(None),
        }
    }

    /// List budgets, newest start date first.
    pub async fn list_budgets(&self) -> Result<Vec<Budget>> {
        let rows = sqlx::query(
            "SELECT id, name, start_date, end_date FROM budgets ORDER BY start_date DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list budgets")?;

        let mut budgets = Vec::with_capacity(rows.len());
        for row in &rows {
            budgets.push(self.row_to_budget(row).await?);
        }
        Ok(budgets)
    }

    pub async fn delete_budget(&self, id: BudgetId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM budgets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete budget")?;
        Ok(result.rows_affected() == 1)
    }

    async fn row_to_budget(&self, row: &SqliteRow) -> Result<Budget> {
        let id = parse_uuid(row.get("id"), "budget ID")?;
        let start: String = row.get("start_date");
        let end: String = row.get("end_date");

        let value_rows = sqlx::query(
            "SELECT account_id, amount_cents, carryover_cents, notes FROM budget_values WHERE budget_id = ? ORDER BY id",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to load budget values")?;

        let mut budget = Budget::new(parse_stored_date(&start)?, parse_stored_date(&end)?)?;
        budget.id = id;
        budget.name = row.get("name");
        for value in &value_rows {
            budget.set_info(
                parse_uuid(value.get("account_id"), "budget account ID")?,
                BudgetInfo {
                    amount: value.get("amount_cents"),
                    carryover: value.get("carryover_cents"),
                    notes: value.get("notes"),
                },
            );
        }
        Ok(budget)
    }

    /// Per-account income and spending for transactions dated within
    /// `start..=end`.
    pub async fn income_spending(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<AccountId, IncomeSpending>> {
        let rows = sqlx::query(
            r#"
            SELECT
                s.account_id,
                COALESCE(SUM(CASE WHEN s.amount_cents > 0 THEN s.amount_cents ELSE 0 END), 0) AS spent,
                COALESCE(SUM(CASE WHEN s.amount_cents < 0 THEN -s.amount_cents ELSE 0 END), 0) AS income
            FROM txn_splits s
            JOIN transactions t ON t.id = s.txn_id
            WHERE t.txn_date >= ? AND t.txn_date <= ?
            GROUP BY s.account_id
            "#,
        )
        .bind(start.format(DATE_FORMAT).to_string())
        .bind(end.format(DATE_FORMAT).to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to sum income and spending")?;

        let mut activity = HashMap::new();
        for row in rows {
            activity.insert(
                parse_uuid(row.get("account_id"), "account ID")?,
                IncomeSpending {
                    income: row.get("income"),
                    spent: row.get("spent"),
                },
            );
        }
        Ok(activity)
    }
}

fn parse_uuid(value: String, what: &str) -> Result<Uuid> {
    Uuid::parse_str(&value).with_context(|| format!("Invalid {}: {}", what, value))
}

fn parse_stored_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .with_context(|| format!("Invalid stored date: {}", value))
}

fn row_to_payee(row: &SqliteRow) -> Result<Option<Payee>> {
    let payee_id: Option<String> = row.get("payee_id");
    let payee_name: Option<String> = row.get("payee_name");
    match (payee_id, payee_name) {
        (Some(id), Some(name)) => Ok(Some(Payee {
            id: parse_uuid(id, "payee ID")?,
            name,
        })),
        _ => Ok(None),
    }
}
