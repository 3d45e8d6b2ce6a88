use chrono::{Duration, NaiveDate};
use rand::Rng;
use tracing::info;

use crate::domain::{
    Account, AccountType, Budget, BudgetInfo, Cents, Frequency, Payee, ScheduledTransaction,
    Split, Transaction,
};

use super::{AppError, LedgerService};

/// What [`LedgerService::load_sample_data`] created.
#[derive(Debug, Default)]
pub struct SampleSummary {
    pub accounts: usize,
    pub transactions: usize,
    pub scheduled: usize,
    pub budgets: usize,
}

/// (account type, number, name, parent name)
const SAMPLE_ACCOUNTS: &[(AccountType, &str, &str, Option<&str>)] = &[
    (AccountType::Equity, "", "Opening Balances", None),
    (AccountType::Asset, "", "Checking", None),
    (AccountType::Asset, "", "Saving", None),
    (AccountType::Liability, "", "Mortgage", None),
    (AccountType::Liability, "", "Credit Card", None),
    (AccountType::Expense, "300", "Food", None),
    (AccountType::Expense, "310", "Restaurants", Some("Food")),
    (AccountType::Expense, "400", "Transportation", None),
    (AccountType::Expense, "410", "Gas Stations", Some("Transportation")),
    (AccountType::Expense, "420", "Car Insurance", Some("Transportation")),
    (AccountType::Expense, "500", "Housing", None),
    (AccountType::Expense, "510", "Rent", Some("Housing")),
    (AccountType::Expense, "520", "Mortgage Interest", Some("Housing")),
    (AccountType::Expense, "600", "Medical", None),
    (AccountType::Expense, "700", "Taxes", None),
];

const BURGERS: &str = "Joe's Burgers";

/// Number of random restaurant transactions added by `many_txns`.
pub const MANY_TXNS: usize = 1000;

/// (date, [(account, amount)]); amounts are cents.
const SAMPLE_TRANSACTIONS: &[(&str, &[(&str, Cents)])] = &[
    ("2018-01-01", &[("Opening Balances", -100000), ("Checking", 100000)]),
    ("2018-01-01", &[("Opening Balances", -100000), ("Saving", 100000)]),
    ("2018-01-01", &[("Checking", -1000), ("Restaurants", 1000)]),
    ("2018-01-02", &[("Checking", -2000), ("Restaurants", 2000)]),
    ("2018-01-04", &[("Checking", -3000), ("Restaurants", 3000)]),
    ("2018-01-06", &[("Checking", -4000), ("Restaurants", 4000)]),
    ("2018-01-07", &[("Checking", -5000), ("Restaurants", 5000)]),
    ("2018-01-08", &[("Checking", -6000), ("Restaurants", 6000)]),
    ("2018-01-09", &[("Checking", 10000), ("Saving", -10000)]),
    ("2018-01-10", &[("Checking", -7000), ("Restaurants", 7000)]),
    ("2018-01-11", &[("Checking", -8000), ("Restaurants", 8000)]),
    ("2018-02-11", &[("Checking", -9000), ("Restaurants", 9000)]),
    ("2018-02-12", &[("Checking", -18000), ("Housing", 18000)]),
    ("2018-02-13", &[("Checking", 8013), ("Saving", -8013)]),
    ("2018-02-14", &[("Checking", -5000), ("Gas Stations", 5000)]),
    (
        "2018-02-15",
        &[("Checking", -7000), ("Gas Stations", 4000), ("Restaurants", 3000)],
    ),
    ("2018-02-16", &[("Checking", -1000), ("Gas Stations", 1000)]),
    ("2018-02-17", &[("Checking", -2000), ("Gas Stations", 2000)]),
    ("2018-02-18", &[("Checking", -4000), ("Gas Stations", 4000)]),
    ("2018-02-19", &[("Checking", -3000), ("Gas Stations", 3000)]),
    ("2018-02-21", &[("Checking", -5000), ("Gas Stations", 5000)]),
    ("2018-02-23", &[("Checking", -7000), ("Gas Stations", 7000)]),
    ("2018-02-24", &[("Checking", -9000), ("Gas Stations", 9000)]),
    ("2018-02-25", &[("Checking", 4000), ("Saving", -4000)]),
];

/// (account, amount, carryover) for the 2018 budget.
const SAMPLE_BUDGET: &[(&str, Cents, Cents)] = &[
    ("Restaurants", 50000, 0),
    ("Gas Stations", 45000, 1000),
    ("Housing", 20000, 0),
];

impl LedgerService {
    /// Fill an empty ledger with a small demo data set: a chart of accounts,
    /// early-2018 transactions, a rent and a taxes schedule around `today`
    /// and a 2018 budget. `many_txns` adds [`MANY_TXNS`] random restaurant
    /// meals in April 2018.
    pub async fn load_sample_data(
        &self,
        today: NaiveDate,
        many_txns: bool,
    ) -> Result<SampleSummary, AppError> {
        let existing = self.list_accounts(None).await?.len();
        if existing > 0 {
            return Err(AppError::DatabaseNotEmpty(existing));
        }
        let mut summary = SampleSummary::default();

        for (account_type, number, name, parent) in SAMPLE_ACCOUNTS {
            self.create_account(*account_type, name, Some(number.to_string()), *parent)
                .await?;
            summary.accounts += 1;
        }

        for (i, (date, splits)) in SAMPLE_TRANSACTIONS.iter().enumerate() {
            let txn_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| AppError::InvalidInput(e.to_string()))?;
            let mut txn = Transaction::new(self.sample_splits(splits).await?, txn_date)?;
            if i == 2 {
                txn = txn.with_txn_type("123").with_payee(Payee::new(BURGERS));
            }
            self.record_transaction(txn).await?;
            summary.transactions += 1;
        }

        if many_txns {
            summary.transactions += self.load_many_transactions().await?;
        }

        let rent = ScheduledTransaction::new(
            "rent",
            Frequency::Monthly,
            today - Duration::days(1),
            self.sample_splits(&[("Checking", -10000), ("Housing", 10000)])
                .await?,
        )?;
        let taxes = ScheduledTransaction::new(
            "taxes",
            Frequency::Annually,
            today + Duration::days(1),
            self.sample_splits(&[("Checking", -2500), ("Taxes", 2500)])
                .await?,
        )?;
        for scheduled in [rent, taxes] {
            self.create_scheduled(scheduled).await?;
            summary.scheduled += 1;
        }

        let mut budget = Budget::for_year(2018)?;
        for (name, amount, carryover) in SAMPLE_BUDGET {
            let account: Account = self.get_account(name).await?;
            budget.set_info(
                account.id,
                BudgetInfo {
                    amount: *amount,
                    carryover: Some(*carryover),
                    notes: None,
                },
            );
        }
        self.create_budget(budget).await?;
        summary.budgets += 1;

        info!(?summary, "loaded sample data");
        Ok(summary)
    }

    async fn load_many_transactions(&self) -> Result<usize, AppError> {
        let meals: Vec<(Cents, u32)> = {
            let mut rng = rand::rng();
            (0..MANY_TXNS)
                .map(|_| (rng.random_range(1..=500) * 100, rng.random_range(1..=30)))
                .collect()
        };

        for (amount, day) in &meals {
            let txn_date = NaiveDate::from_ymd_opt(2018, 4, *day)
                .ok_or_else(|| AppError::InvalidInput(format!("invalid day {}", day)))?;
            let splits = self
                .sample_splits(&[("Checking", -amount), ("Restaurants", *amount)])
                .await?;
            self.record_transaction(Transaction::new(splits, txn_date)?)
                .await?;
        }
        info!(count = meals.len(), "added random restaurant transactions");
        Ok(meals.len())
    }

    async fn sample_splits(&self, splits: &[(&str, Cents)]) -> Result<Vec<Split>, AppError> {
        let mut resolved = Vec::with_capacity(splits.len());
        for (name, amount) in splits {
            resolved.push(Split::new(self.get_account(name).await?.id, *amount));
        }
        Ok(resolved)
    }
}
