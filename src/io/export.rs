use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{
    display_strings_for_ledger, format_cents, Account, Budget, Payee, ScheduledTransaction,
    Transaction,
};

/// Database snapshot for a full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub payees: Vec<Payee>,
    pub transactions: Vec<Transaction>,
    pub scheduled_transactions: Vec<ScheduledTransaction>,
    pub budgets: Vec<Budget>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export one account's register to CSV, with the running balance.
    pub async fn export_ledger_csv<W: Write>(&self, account_name: &str, writer: W) -> Result<usize> {
        let ledger = self.service.get_ledger(account_name).await?;
        let account_names = self.service.account_names().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "type",
            "payee",
            "description",
            "status",
            "deposit",
            "withdrawal",
            "categories",
            "balance",
        ])?;

        let mut count = 0;
        for record in ledger.sorted_with_balance() {
            let display = display_strings_for_ledger(ledger.account(), &record.txn, &account_names);
            csv_writer.write_record([
                record.txn.id.to_string(),
                display.txn_date,
                display.txn_type,
                display.payee,
                display.description,
                display.status,
                display.deposit,
                display.withdrawal,
                display.categories,
                format_cents(record.balance),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full database as a JSON snapshot
    pub async fn export_snapshot_json<W: Write>(&self, mut writer: W) -> Result<DatabaseSnapshot> {
        let snapshot = DatabaseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts: self.service.list_accounts(None).await?,
            payees: self.service.list_payees().await?,
            transactions: self.service.list_all_transactions().await?,
            scheduled_transactions: self.service.list_scheduled(None).await?,
            budgets: self.service.list_budgets().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
