use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{non_blank, parse_cents, AccountId, Cents, ParseCentsError, Payee};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("transaction must have at least 2 splits")]
    TooFewSplits,

    #[error("splits don't balance")]
    Unbalanced,

    #[error("duplicate account in splits")]
    DuplicateAccount,

    #[error("invalid split: {0}")]
    InvalidAmount(#[from] ParseCentsError),

    #[error("invalid status \"{0}\"")]
    InvalidStatus(String),

    #[error("transaction must have a deposit or a withdrawal")]
    MissingAmount,
}

/// Reconciliation state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnStatus {
    Cleared,
    Reconciled,
}

impl TxnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnStatus::Cleared => "C",
            TxnStatus::Reconciled => "R",
        }
    }

    /// Parse a status flag. Blank input means "no status".
    pub fn parse(s: &str) -> Result<Option<Self>, TransactionError> {
        match s.trim().to_uppercase().as_str() {
            "" => Ok(None),
            "C" => Ok(Some(TxnStatus::Cleared)),
            "R" => Ok(Some(TxnStatus::Reconciled)),
            _ => Err(TransactionError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One leg of a transaction: the amount moving into (positive) or out of
/// (negative) an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub account: AccountId,
    pub amount: Cents,
}

impl Split {
    pub fn new(account: AccountId, amount: Cents) -> Self {
        Self { account, amount }
    }
}

/// Check the double-entry invariants shared by transactions and schedules.
pub fn validate_splits(splits: &[Split]) -> Result<(), TransactionError> {
    if splits.len() < 2 {
        return Err(TransactionError::TooFewSplits);
    }
    let mut seen = HashSet::new();
    if !splits.iter().all(|s| seen.insert(s.account)) {
        return Err(TransactionError::DuplicateAccount);
    }
    // i128 so large amounts can't wrap around to zero
    if splits.iter().map(|s| i128::from(s.amount)).sum::<i128>() != 0 {
        return Err(TransactionError::Unbalanced);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub splits: Vec<Split>,
    pub txn_date: NaiveDate,
    /// Check number, "ACH", "BP", ...
    pub txn_type: Option<String>,
    pub payee: Option<Payee>,
    pub description: Option<String>,
    pub status: Option<TxnStatus>,
}

impl Transaction {
    pub fn new(splits: Vec<Split>, txn_date: NaiveDate) -> Result<Self, TransactionError> {
        validate_splits(&splits)?;
        Ok(Self {
            id: Uuid::new_v4(),
            splits,
            txn_date,
            txn_type: None,
            payee: None,
            description: None,
            status: None,
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

    pub fn with_status(mut self, status: Option<TxnStatus>) -> Self {
        self.status = status;
        self
    }

    /// Replace the splits, keeping the old ones if the new set is invalid.
    pub fn set_splits(&mut self, splits: Vec<Split>) -> Result<(), TransactionError> {
        validate_splits(&splits)?;
        self.splits = splits;
        Ok(())
    }

    /// Amount this transaction moves into `account` (0 if it doesn't touch it).
    pub fn amount_for(&self, account: AccountId) -> Cents {
        self.splits
            .iter()
            .filter(|s| s.account == account)
            .map(|s| s.amount)
            .sum()
    }

    pub fn touches(&self, account: AccountId) -> bool {
        self.splits.iter().any(|s| s.account == account)
    }
}

/// The other side of a transaction as entered in an account register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Categories {
    /// One counter account takes the whole (negated) amount.
    Single(AccountId),
    /// Explicit counter splits.
    Multiple(Vec<Split>),
}

/// Build splits from register-style input: a deposit or withdrawal on the
/// main account plus the accounts on the other side.
pub fn splits_from_user_info(
    account: AccountId,
    deposit: &str,
    withdrawal: &str,
    categories: Categories,
) -> Result<Vec<Split>, TransactionError> {
    let main_amount = match (deposit.trim(), withdrawal.trim()) {
        (d, "") if !d.is_empty() => parse_cents(d)?,
        ("", w) if !w.is_empty() => -parse_cents(w)?,
        _ => return Err(TransactionError::MissingAmount),
    };

    let mut splits = vec![Split::new(account, main_amount)];
    match categories {
        Categories::Single(other) => splits.push(Split::new(other, -main_amount)),
        Categories::Multiple(others) => splits.extend(others),
    }
    Ok(splits)
}

/// Column strings for one row of an account's register.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerDisplay {
    pub txn_type: String,
    pub txn_date: String,
    pub payee: String,
    pub description: String,
    pub status: String,
    pub deposit: String,
    pub withdrawal: String,
    pub categories: String,
}

/// Render a transaction as seen from `account`.
pub fn display_strings_for_ledger(
    account: AccountId,
    txn: &Transaction,
    account_names: &HashMap<AccountId, String>,
) -> LedgerDisplay {
    let amount = txn.amount_for(account);
    let (deposit, withdrawal) = if amount >= 0 {
        (super::format_cents(amount), String::new())
    } else {
        (String::new(), super::format_cents(-amount))
    };

    LedgerDisplay {
        txn_type: txn.txn_type.clone().unwrap_or_default(),
        txn_date: txn.txn_date.format("%Y-%m-%d").to_string(),
        payee: txn.payee.as_ref().map(|p| p.name.clone()).unwrap_or_default(),
        description: txn.description.clone().unwrap_or_default(),
        status: txn.status.map(|s| s.as_str().to_string()).unwrap_or_default(),
        deposit,
        withdrawal,
        categories: categories_display(&txn.splits, account, account_names),
    }
}

pub fn categories_display(
    splits: &[Split],
    main_account: AccountId,
    account_names: &HashMap<AccountId, String>,
) -> String {
    let others: Vec<&Split> = splits.iter().filter(|s| s.account != main_account).collect();
    match others.as_slice() {
        [only] => account_names
            .get(&only.account)
            .cloned()
            .unwrap_or_else(|| only.account.to_string()),
        [] => String::new(),
        _ => "multiple".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn two_accounts() -> (AccountId, AccountId) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_splits_required() {
        let (checking, _) = two_accounts();
        let err = Transaction::new(vec![], date(2018, 1, 1)).unwrap_err();
        assert_eq!(err.to_string(), "transaction must have at least 2 splits");
        let err = Transaction::new(vec![Split::new(checking, 0)], date(2018, 1, 1)).unwrap_err();
        assert_eq!(err, TransactionError::TooFewSplits);
    }

    #[test]
    fn test_splits_must_balance() {
        let (checking, savings) = two_accounts();
        let err = Transaction::new(
            vec![Split::new(checking, -10000), Split::new(savings, 9000)],
            date(2018, 1, 1),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "splits don't balance");
    }

    #[test]
    fn test_huge_amounts_do_not_overflow() {
        let amount = parse_cents("46116860184273879.04").unwrap();
        let accounts: Vec<AccountId> = (0..4).map(|_| Uuid::new_v4()).collect();

        let all_positive: Vec<Split> = accounts.iter().map(|a| Split::new(*a, amount)).collect();
        assert_eq!(validate_splits(&all_positive), Err(TransactionError::Unbalanced));

        let balanced = vec![
            Split::new(accounts[0], amount),
            Split::new(accounts[1], amount),
            Split::new(accounts[2], -amount),
            Split::new(accounts[3], -amount),
        ];
        assert_eq!(validate_splits(&balanced), Ok(()));
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let (checking, _) = two_accounts();
        let err = Transaction::new(
            vec![Split::new(checking, -100), Split::new(checking, 100)],
            date(2018, 1, 1),
        )
        .unwrap_err();
        assert_eq!(err, TransactionError::DuplicateAccount);
    }

    #[test]
    fn test_sparse_init() {
        let (checking, savings) = two_accounts();
        let t = Transaction::new(
            vec![Split::new(checking, 10000), Split::new(savings, -10000)],
            date(2018, 1, 1),
        )
        .unwrap()
        .with_txn_type("")
        .with_description("   ")
        .with_payee(Payee::new(""));
        assert_eq!(t.txn_type, None);
        assert_eq!(t.description, None);
        assert_eq!(t.payee, None);
        assert_eq!(t.status, None);
        assert_eq!(t.amount_for(checking), 10000);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(TxnStatus::parse("c"), Ok(Some(TxnStatus::Cleared)));
        assert_eq!(TxnStatus::parse("R"), Ok(Some(TxnStatus::Reconciled)));
        assert_eq!(TxnStatus::parse(""), Ok(None));
        assert_eq!(
            TxnStatus::parse("d").unwrap_err().to_string(),
            "invalid status \"d\""
        );
    }

    #[test]
    fn test_set_splits_keeps_old_on_error() {
        let (checking, savings) = two_accounts();
        let mut t = Transaction::new(
            vec![Split::new(checking, 100), Split::new(savings, -100)],
            date(2018, 1, 1),
        )
        .unwrap();
        assert!(t.set_splits(vec![Split::new(checking, 5)]).is_err());
        assert_eq!(t.amount_for(checking), 100);
    }

    #[test]
    fn test_splits_from_user_info_single_category() {
        let (checking, savings) = two_accounts();
        let splits =
            splits_from_user_info(checking, "101", "", Categories::Single(savings)).unwrap();
        assert_eq!(
            splits,
            vec![Split::new(checking, 10100), Split::new(savings, -10100)]
        );
    }

    #[test]
    fn test_splits_from_user_info_multiple_categories() {
        let (checking, savings) = two_accounts();
        let house = Uuid::new_v4();
        let splits = splits_from_user_info(
            checking,
            "",
            "100",
            Categories::Multiple(vec![Split::new(savings, 4500), Split::new(house, 5500)]),
        )
        .unwrap();
        assert_eq!(splits[0], Split::new(checking, -10000));
        assert!(validate_splits(&splits).is_ok());
    }

    #[test]
    fn test_splits_from_user_info_requires_one_amount() {
        let (checking, savings) = two_accounts();
        assert_eq!(
            splits_from_user_info(checking, "", "", Categories::Single(savings)),
            Err(TransactionError::MissingAmount)
        );
        assert_eq!(
            splits_from_user_info(checking, "1", "2", Categories::Single(savings)),
            Err(TransactionError::MissingAmount)
        );
    }

    #[test]
    fn test_display_strings() {
        let (checking, savings) = two_accounts();
        let names = HashMap::from([
            (checking, "Checking".to_string()),
            (savings, "Savings".to_string()),
        ]);
        let t = Transaction::new(
            vec![Split::new(checking, 10000), Split::new(savings, -10000)],
            date(2018, 3, 18),
        )
        .unwrap()
        .with_txn_type("1234")
        .with_payee(Payee::new("McDonalds"))
        .with_description("something")
        .with_status(Some(TxnStatus::Cleared));

        let from_checking = display_strings_for_ledger(checking, &t, &names);
        assert_eq!(from_checking.deposit, "100.00");
        assert_eq!(from_checking.withdrawal, "");
        assert_eq!(from_checking.categories, "Savings");
        assert_eq!(from_checking.txn_date, "2018-03-18");
        assert_eq!(from_checking.status, "C");

        let from_savings = display_strings_for_ledger(savings, &t, &names);
        assert_eq!(from_savings.deposit, "");
        assert_eq!(from_savings.withdrawal, "100.00");
        assert_eq!(from_savings.categories, "Checking");
    }

    #[test]
    fn test_categories_display_multiple() {
        let (a, b) = two_accounts();
        let c = Uuid::new_v4();
        let splits = vec![Split::new(a, -100), Split::new(b, 65), Split::new(c, 35)];
        assert_eq!(categories_display(&splits, a, &HashMap::new()), "multiple");
    }
}
