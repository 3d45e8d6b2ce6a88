use thiserror::Error;

use crate::domain::{
    AccountError, BudgetError, InvalidDate, ParseCentsError, ScheduleError, TransactionError,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Scheduled transaction not found: {0}")]
    ScheduledTransactionNotFound(String),

    #[error("Scheduled transaction already exists: {0}")]
    ScheduledTransactionAlreadyExists(String),

    #[error("Budget not found: {0}")]
    BudgetNotFound(String),

    #[error("Database already holds {0} account(s); sample data needs an empty ledger")]
    DatabaseNotEmpty(usize),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error(transparent)]
    Amount(#[from] ParseCentsError),

    #[error(transparent)]
    Date(#[from] InvalidDate),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
