use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type AccountId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("Account must have a name")]
    MissingName,

    #[error("Invalid account type \"{0}\"")]
    InvalidType(String),

    #[error("Account can't be its own parent")]
    SelfParent,

    #[error("Account can't be a descendant of itself")]
    ParentCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Bank accounts, cash, investments
    Asset,
    /// Credit cards, loans, mortgages
    Liability,
    /// Opening balances
    Equity,
    /// Wages, interest
    Income,
    /// Housing, food, transportation
    Expense,
}

impl AccountType {
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Income,
        AccountType::Expense,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Income => "income",
            AccountType::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, AccountError> {
        match s.trim().to_lowercase().as_str() {
            "asset" => Ok(AccountType::Asset),
            "liability" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "income" => Ok(AccountType::Income),
            "expense" => Ok(AccountType::Expense),
            _ => Err(AccountError::InvalidType(s.to_string())),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub account_type: AccountType,
    /// User-facing account number, e.g. "4010"
    pub number: Option<String>,
    pub name: String,
    pub parent: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(account_type: AccountType, name: impl Into<String>) -> Result<Self, AccountError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(AccountError::MissingName);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            account_type,
            number: None,
            name,
            parent: None,
            created_at: Utc::now(),
        })
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = non_blank(number.into());
        self
    }

    pub fn with_parent(mut self, parent: AccountId) -> Result<Self, AccountError> {
        if parent == self.id {
            return Err(AccountError::SelfParent);
        }
        self.parent = Some(parent);
        Ok(self)
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), AccountError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(AccountError::MissingName);
        }
        self.name = name;
        Ok(())
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.number {
            Some(number) => write!(f, "{} - {}", number, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Trim a string and map empty input to `None`.
pub(crate) fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_roundtrip() {
        for at in AccountType::ALL {
            assert_eq!(AccountType::from_str(at.as_str()).unwrap(), at);
        }
        assert_eq!(AccountType::from_str("EXPENSE").unwrap(), AccountType::Expense);
    }

    #[test]
    fn test_invalid_account_type() {
        let err = AccountType::from_str("asdf").unwrap_err();
        assert_eq!(err.to_string(), "Invalid account type \"asdf\"");
    }

    #[test]
    fn test_display_with_number() {
        let a = Account::new(AccountType::Asset, "Checking")
            .unwrap()
            .with_number("400");
        assert_eq!(a.to_string(), "400 - Checking");
        assert_eq!(a.number.as_deref(), Some("400"));
    }

    #[test]
    fn test_empty_number_is_none() {
        let a = Account::new(AccountType::Expense, "Test").unwrap().with_number("");
        assert_eq!(a.number, None);
        assert_eq!(a.to_string(), "Test");
    }

    #[test]
    fn test_name_required() {
        assert_eq!(
            Account::new(AccountType::Asset, "  ").unwrap_err(),
            AccountError::MissingName
        );
    }

    #[test]
    fn test_parent() {
        let housing = Account::new(AccountType::Expense, "Housing").unwrap();
        let rent = Account::new(AccountType::Expense, "Rent")
            .unwrap()
            .with_parent(housing.id)
            .unwrap();
        assert_eq!(rent.parent, Some(housing.id));
        assert_eq!(
            housing.clone().with_parent(housing.id).unwrap_err(),
            AccountError::SelfParent
        );
    }
}
