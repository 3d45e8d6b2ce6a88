// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use bricbooks::application::LedgerService;
use bricbooks::domain::{Account, AccountType, Cents, Split, Transaction};
use chrono::NaiveDate;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.sqlite3");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to build a date
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Test fixture: standard chart of accounts
pub struct StandardAccounts {
    pub checking: Account,
    pub savings: Account,
    pub wages: Account,
    pub housing: Account,
    pub food: Account,
    pub transportation: Account,
}

impl StandardAccounts {
    pub async fn create(service: &LedgerService) -> Result<Self> {
        Ok(Self {
            checking: service
                .create_account(AccountType::Asset, "Checking", None, None)
                .await?,
            savings: service
                .create_account(AccountType::Asset, "Savings", None, None)
                .await?,
            wages: service
                .create_account(AccountType::Income, "Wages", None, None)
                .await?,
            housing: service
                .create_account(AccountType::Expense, "Housing", None, None)
                .await?,
            food: service
                .create_account(AccountType::Expense, "Food", None, None)
                .await?,
            transportation: service
                .create_account(AccountType::Expense, "Transportation", None, None)
                .await?,
        })
    }
}

/// Record a two-split transaction moving `amount` from one account into another.
pub async fn record(
    service: &LedgerService,
    from: &Account,
    to: &Account,
    amount: Cents,
    txn_date: NaiveDate,
) -> Result<Transaction> {
    let txn = Transaction::new(
        vec![Split::new(from.id, -amount), Split::new(to.id, amount)],
        txn_date,
    )?;
    Ok(service.record_transaction(txn).await?)
}
