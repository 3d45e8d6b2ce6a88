use chrono::NaiveDate;

use super::{
    AccountId, Cents, Payee, ScheduledTransaction, ScheduledTransactionId, Transaction,
    TransactionId,
};

/// Compute the balance of an account from a list of transactions.
pub fn compute_balance(account: AccountId, txns: &[Transaction]) -> Cents {
    txns.iter()
        .fold(0, |balance: Cents, t| balance.saturating_add(t.amount_for(account)))
}

/// A register row: the transaction plus the account balance after it.
#[derive(Debug, Clone)]
pub struct LedgerRecord {
    pub txn: Transaction,
    pub balance: Cents,
}

/// The register of a single account: every transaction that touches it and
/// the schedules that will.
#[derive(Debug, Clone)]
pub struct Ledger {
    account: AccountId,
    txns: Vec<Transaction>,
    scheduled: Vec<ScheduledTransaction>,
}

impl Ledger {
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            txns: Vec::new(),
            scheduled: Vec::new(),
        }
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Add a transaction, replacing any existing one with the same id.
    pub fn add_transaction(&mut self, txn: Transaction) {
        match self.txns.iter_mut().find(|t| t.id == txn.id) {
            Some(existing) => *existing = txn,
            None => self.txns.push(txn),
        }
    }

    pub fn add_scheduled_transaction(&mut self, scheduled: ScheduledTransaction) {
        match self.scheduled.iter_mut().find(|s| s.id == scheduled.id) {
            Some(existing) => *existing = scheduled,
            None => self.scheduled.push(scheduled),
        }
    }

    pub fn remove_transaction(&mut self, id: TransactionId) -> Option<Transaction> {
        let pos = self.txns.iter().position(|t| t.id == id)?;
        Some(self.txns.remove(pos))
    }

    pub fn get_txn(&self, id: TransactionId) -> Option<&Transaction> {
        self.txns.iter().find(|t| t.id == id)
    }

    pub fn get_scheduled(&self, id: ScheduledTransactionId) -> Option<&ScheduledTransaction> {
        self.scheduled.iter().find(|s| s.id == id)
    }

    pub fn clear_txns(&mut self) {
        self.txns.clear();
    }

    /// Transactions in date order; insertion order breaks ties.
    fn sorted_txns(&self) -> Vec<&Transaction> {
        let mut sorted: Vec<&Transaction> = self.txns.iter().collect();
        sorted.sort_by_key(|t| t.txn_date);
        sorted
    }

    /// Transactions in date order with the running balance of this account.
    pub fn sorted_with_balance(&self) -> Vec<LedgerRecord> {
        let mut balance: Cents = 0;
        self.sorted_txns()
            .into_iter()
            .map(|t| {
                balance = balance.saturating_add(t.amount_for(self.account));
                LedgerRecord {
                    txn: t.clone(),
                    balance,
                }
            })
            .collect()
    }

    pub fn balance(&self) -> Cents {
        compute_balance(self.account, &self.txns)
    }

    /// Case-insensitive search over payee names and descriptions.
    pub fn search(&self, term: &str) -> Vec<&Transaction> {
        let needle = term.to_lowercase();
        self.sorted_txns()
            .into_iter()
            .filter(|t| {
                let payee_hit = t
                    .payee
                    .as_ref()
                    .is_some_and(|p| p.name.to_lowercase().contains(&needle));
                let description_hit = t
                    .description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle));
                payee_hit || description_hit
            })
            .collect()
    }

    /// Distinct payees used in this ledger, sorted by name.
    pub fn payees(&self) -> Vec<Payee> {
        let mut payees: Vec<Payee> = Vec::new();
        for payee in self.txns.iter().filter_map(|t| t.payee.as_ref()) {
            if !payees.iter().any(|p| p.id == payee.id) {
                payees.push(payee.clone());
            }
        }
        payees.sort_by(|a, b| a.name.cmp(&b.name));
        payees
    }

    pub fn scheduled(&self) -> &[ScheduledTransaction] {
        &self.scheduled
    }

    /// Schedules whose next occurrence is on or before `today`, earliest first.
    pub fn scheduled_due(&self, today: NaiveDate) -> Vec<&ScheduledTransaction> {
        let mut due: Vec<&ScheduledTransaction> =
            self.scheduled.iter().filter(|s| s.is_due(today)).collect();
        due.sort_by_key(|s| s.next_due_date);
        due
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::{Frequency, Split};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn txn(checking: AccountId, savings: AccountId, amount: Cents, on: NaiveDate) -> Transaction {
        Transaction::new(
            vec![Split::new(checking, amount), Split::new(savings, -amount)],
            on,
        )
        .unwrap()
    }

    #[test]
    fn test_sorted_with_running_balance() {
        let (checking, savings) = (Uuid::new_v4(), Uuid::new_v4());
        let mut ledger = Ledger::new(checking);
        ledger.add_transaction(txn(checking, savings, 3245, date(2017, 8, 5)));
        ledger.add_transaction(txn(checking, savings, -1200, date(2017, 6, 5)));
        ledger.add_transaction(txn(checking, savings, 100, date(2017, 7, 30)));
        ledger.add_transaction(txn(checking, savings, 1000, date(2017, 4, 25)));

        let records = ledger.sorted_with_balance();
        let dates: Vec<NaiveDate> = records.iter().map(|r| r.txn.txn_date).collect();
        let balances: Vec<Cents> = records.iter().map(|r| r.balance).collect();
        assert_eq!(
            dates,
            vec![
                date(2017, 4, 25),
                date(2017, 6, 5),
                date(2017, 7, 30),
                date(2017, 8, 5)
            ]
        );
        assert_eq!(balances, vec![1000, -200, -100, 3145]);
        assert_eq!(ledger.balance(), 3145);
    }

    #[test]
    fn test_add_replaces_same_id() {
        let (checking, savings) = (Uuid::new_v4(), Uuid::new_v4());
        let mut ledger = Ledger::new(checking);
        let mut t = txn(checking, savings, 100, date(2017, 1, 1));
        ledger.add_transaction(t.clone());
        t.set_splits(vec![Split::new(checking, 500), Split::new(savings, -500)])
            .unwrap();
        ledger.add_transaction(t.clone());
        assert_eq!(ledger.sorted_with_balance().len(), 1);
        assert_eq!(ledger.get_txn(t.id).unwrap().amount_for(checking), 500);
    }

    #[test]
    fn test_search() {
        let (checking, savings) = (Uuid::new_v4(), Uuid::new_v4());
        let mut ledger = Ledger::new(checking);
        ledger.add_transaction(
            txn(checking, savings, 3245, date(2017, 8, 5)).with_payee(Payee::new("someone")),
        );
        ledger.add_transaction(txn(checking, savings, -1200, date(2017, 6, 5)));
        ledger.add_transaction(
            txn(checking, savings, 100, date(2017, 7, 30)).with_description("Some description"),
        );
        let results = ledger.search("SOME");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].description.as_deref(), Some("Some description"));
    }

    #[test]
    fn test_clear_txns() {
        let (checking, savings) = (Uuid::new_v4(), Uuid::new_v4());
        let mut ledger = Ledger::new(checking);
        ledger.add_transaction(txn(checking, savings, 100, date(2017, 8, 5)));
        ledger.clear_txns();
        assert!(ledger.sorted_with_balance().is_empty());
    }

    #[test]
    fn test_payees_distinct_and_sorted() {
        let (checking, savings) = (Uuid::new_v4(), Uuid::new_v4());
        let mut ledger = Ledger::new(checking);
        let burger_king = Payee::new("Burger King");
        let mcdonalds = Payee::new("McDonalds");
        ledger.add_transaction(
            txn(checking, savings, 1234, date(2017, 8, 5)).with_payee(mcdonalds.clone()),
        );
        ledger.add_transaction(
            txn(checking, savings, 1234, date(2017, 8, 5)).with_payee(burger_king.clone()),
        );
        ledger.add_transaction(
            txn(checking, savings, 1234, date(2017, 8, 5)).with_payee(burger_king.clone()),
        );
        assert_eq!(ledger.payees(), vec![burger_king, mcdonalds]);
    }

    #[test]
    fn test_scheduled_due() {
        let (checking, savings) = (Uuid::new_v4(), Uuid::new_v4());
        let splits = vec![Split::new(checking, 100), Split::new(savings, -100)];
        let today = date(2019, 1, 10);
        let not_due = ScheduledTransaction::new(
            "not due",
            Frequency::Weekly,
            date(2019, 1, 11),
            splits.clone(),
        )
        .unwrap();
        let due = ScheduledTransaction::new("due", Frequency::Monthly, today, splits).unwrap();

        let mut ledger = Ledger::new(checking);
        ledger.add_scheduled_transaction(not_due);
        ledger.add_scheduled_transaction(due.clone());

        let due_now = ledger.scheduled_due(today);
        assert_eq!(due_now.len(), 1);
        assert_eq!(due_now[0].id, due.id);
    }
}
