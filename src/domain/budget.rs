use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{Account, AccountId, AccountType, Cents};

pub type BudgetId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BudgetError {
    #[error("invalid budget year {0}")]
    InvalidYear(i32),

    #[error("budget end date {end} is before start date {start}")]
    InvertedDates { start: NaiveDate, end: NaiveDate },
}

/// Budgeted values for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetInfo {
    pub amount: Cents,
    pub carryover: Option<Cents>,
    pub notes: Option<String>,
}

/// Money that actually moved through an account during a budget period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncomeSpending {
    pub income: Cents,
    pub spent: Cents,
}

impl IncomeSpending {
    /// Positive split amounts are spending, negative ones are income.
    pub fn record(&mut self, amount: Cents) {
        if amount >= 0 {
            self.spent = self.spent.saturating_add(amount);
        } else {
            self.income = self.income.saturating_sub(amount);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub account_info: BTreeMap<AccountId, BudgetInfo>,
}

impl Budget {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, BudgetError> {
        if end_date < start_date {
            return Err(BudgetError::InvertedDates {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: None,
            start_date,
            end_date,
            account_info: BTreeMap::new(),
        })
    }

    /// A budget covering one calendar year.
    pub fn for_year(year: i32) -> Result<Self, BudgetError> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(BudgetError::InvalidYear(year))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(BudgetError::InvalidYear(year))?;
        Self::new(start, end)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = super::non_blank(name.into());
        self
    }

    pub fn set_info(&mut self, account: AccountId, info: BudgetInfo) {
        self.account_info.insert(account, info);
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({} - {})", name, self.start_date, self.end_date),
            None => format!("{} - {}", self.start_date, self.end_date),
        }
    }

    /// Compare the budget with actual activity. Every income and expense
    /// account in `accounts` gets a row; rows are `None` when the account
    /// has no budget info, whatever its activity.
    pub fn report(
        &self,
        accounts: &[Account],
        activity: &HashMap<AccountId, IncomeSpending>,
    ) -> BudgetReport {
        let mut report = BudgetReport::default();

        for account in accounts {
            let Some(info) = self.account_info.get(&account.id).cloned() else {
                match account.account_type {
                    AccountType::Expense => report.expense.push((account.id, None)),
                    AccountType::Income => report.income.push((account.id, None)),
                    _ => {}
                }
                continue;
            };
            let moved = activity.get(&account.id).copied().unwrap_or_default();

            match account.account_type {
                AccountType::Expense => {
                    let carryover = info.carryover.unwrap_or(0);
                    let total_budget = info
                        .amount
                        .saturating_add(carryover)
                        .saturating_add(moved.income);
                    let remaining = total_budget.saturating_sub(moved.spent);
                    let percent_available = (total_budget != 0).then(|| {
                        round_percent_available(i128::from(remaining) * 100, total_budget.into())
                    });
                    report.expense.push((
                        account.id,
                        Some(ExpenseLine {
                            amount: info.amount,
                            carryover,
                            income: moved.income,
                            total_budget,
                            spent: moved.spent,
                            remaining,
                            percent_available,
                            notes: info.notes,
                        }),
                    ));
                }
                AccountType::Income => {
                    let remaining = info.amount.saturating_sub(moved.income);
                    // 100 - remaining/amount, i.e. the share of the amount received
                    let remaining_percent = (info.amount != 0).then(|| {
                        round_percent_available(i128::from(moved.income) * 100, info.amount.into())
                    });
                    report.income.push((
                        account.id,
                        Some(IncomeLine {
                            amount: info.amount,
                            income: moved.income,
                            remaining,
                            remaining_percent,
                            notes: info.notes,
                        }),
                    ));
                }
                _ => {}
            }
        }

        report
    }
}

/// Divide and round half away from zero: 1.5 -> 2, 2.5 -> 3, -1.5 -> -2.
/// Results beyond the `i64` range saturate.
pub fn round_percent_available(numerator: i128, denominator: i128) -> i64 {
    if denominator == 0 {
        return 0;
    }
    let negative = (numerator < 0) != (denominator < 0);
    let (n, d) = (numerator.unsigned_abs(), denominator.unsigned_abs());
    let rounded = n / d + u128::from(n % d >= d - d / 2);
    let rounded = i64::try_from(rounded).unwrap_or(i64::MAX);
    if negative { -rounded } else { rounded }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseLine {
    pub amount: Cents,
    pub carryover: Cents,
    pub income: Cents,
    pub total_budget: Cents,
    pub spent: Cents,
    pub remaining: Cents,
    pub percent_available: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomeLine {
    pub amount: Cents,
    pub income: Cents,
    pub remaining: Cents,
    pub remaining_percent: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BudgetReport {
    pub expense: Vec<(AccountId, Option<ExpenseLine>)>,
    pub income: Vec<(AccountId, Option<IncomeLine>)>,
}

impl BudgetReport {
    pub fn expense_line(&self, account: AccountId) -> Option<&ExpenseLine> {
        self.expense
            .iter()
            .find(|(id, _)| *id == account)
            .and_then(|(_, line)| line.as_ref())
    }

    pub fn income_line(&self, account: AccountId) -> Option<&IncomeLine> {
        self.income
            .iter()
            .find(|(id, _)| *id == account)
            .and_then(|(_, line)| line.as_ref())
    }
}
