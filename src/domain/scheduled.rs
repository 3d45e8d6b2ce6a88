use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{
    add_months, increment_month, increment_quarter, non_blank, validate_splits, AccountId, Payee,
    Split, Transaction, TransactionError,
};

pub type ScheduledTransactionId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid frequency \"{0}\"")]
    InvalidFrequency(String),

    #[error("scheduled transaction must have a name")]
    MissingName,

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// How often a scheduled transaction recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Annually => "annually",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, ScheduleError> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "annually" | "yearly" => Ok(Frequency::Annually),
            _ => Err(ScheduleError::InvalidFrequency(s.to_string())),
        }
    }

    /// The date one period after `date`.
    pub fn next_date(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Weekly => date + Duration::days(7),
            Frequency::Monthly => increment_month(date),
            Frequency::Quarterly => increment_quarter(date),
            Frequency::Annually => add_months(date, 12),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction template that recurs on a fixed frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTransaction {
    pub id: ScheduledTransactionId,
    pub name: String,
    pub frequency: Frequency,
    pub next_due_date: NaiveDate,
    pub splits: Vec<Split>,
    pub txn_type: Option<String>,
    pub payee: Option<Payee>,
    pub description: Option<String>,
}

impl ScheduledTransaction {
    pub fn new(
        name: impl Into<String>,
        frequency: Frequency,
        next_due_date: NaiveDate,
        splits: Vec<Split>,
    ) -> Result<Self, ScheduleError> {
        let name = non_blank(name.into()).ok_or(ScheduleError::MissingName)?;
        validate_splits(&splits)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            frequency,
            next_due_date,
            splits,
            txn_type: None,
            payee: None,
            description: None,
        })
    }

    pub fn with_txn_type(mut self, txn_type: impl Into<String>) -> Self {
        self.txn_type = non_blank(txn_type.into());
        self
    }

    pub fn with_payee(mut self, payee: Payee) -> Self {
        self.payee = if payee.name.is_empty() { None } else { Some(payee) };
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = non_blank(description.into());
        self
    }

    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_due_date <= today
    }

    pub fn touches(&self, account: AccountId) -> bool {
        self.splits.iter().any(|s| s.account == account)
    }

    /// Move the schedule to its next occurrence.
    pub fn advance(&mut self) {
        self.next_due_date = self.frequency.next_date(self.next_due_date);
    }

    /// Materialize the current occurrence as a regular transaction.
    pub fn to_transaction(&self) -> Result<Transaction, TransactionError> {
        let mut txn = Transaction::new(self.splits.clone(), self.next_due_date)?;
        txn.txn_type = self.txn_type.clone();
        txn.payee = self.payee.clone();
        txn.description = self.description.clone();
        Ok(txn)
    }
}
