use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use uuid::Uuid;

use crate::application::{AccountUpdate, EntryInput, LedgerService};
use crate::domain::{
    display_strings_for_ledger, format_cents, parse_cents, parse_date, AccountType, Budget,
    BudgetInfo, Frequency, Payee, ScheduledTransaction, Transaction, TxnStatus,
};
use crate::storage::{find_data_files, DEFAULT_DATA_FILE};

/// bricbooks - double-entry personal finance ledger
#[derive(Parser)]
#[command(name = "bricbooks")]
#[command(about = "A local-first, double-entry personal finance ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "BRICBOOKS_DATABASE", default_value = DEFAULT_DATA_FILE)]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// List payees
    Payees,

    /// Transaction commands
    #[command(subcommand)]
    Txn(TxnCommands),

    /// Show the register of an account
    Ledger {
        /// Account name
        account: String,

        /// Only show transactions whose payee or description matches
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Scheduled transaction commands
    #[command(subcommand)]
    Scheduled(ScheduledCommands),

    /// Budget management commands
    #[command(subcommand)]
    Budget(BudgetCommands),

    /// Export data to CSV or JSON
    #[command(subcommand)]
    Export(ExportCommands),

    /// List data files in a directory
    Files {
        /// Directory to search (defaults to the current directory)
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Load demo data into an empty database
    Seed {
        /// Also add 1000 random restaurant transactions (April 2018)
        #[arg(long)]
        many: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// Account name (must be unique)
        name: String,

        /// Account type: asset, liability, equity, income, expense
        #[arg(short = 't', long = "type")]
        account_type: String,

        /// Account number
        #[arg(short, long)]
        number: Option<String>,

        /// Parent account name
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// List accounts with their balances
    List {
        /// Only show accounts of this type
        #[arg(short = 't', long = "type")]
        account_type: Option<String>,
    },

    /// Change an account
    Edit {
        /// Current account name
        name: String,

        /// New name
        #[arg(long)]
        rename: Option<String>,

        /// New type
        #[arg(short = 't', long = "type")]
        account_type: Option<String>,

        /// New number ("" clears it)
        #[arg(short, long)]
        number: Option<String>,

        /// New parent account name ("" clears it)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Show account details
    Show {
        /// Account name
        name: String,
    },
}

/// Amount and counter accounts of a register entry.
#[derive(Args, Clone)]
pub struct EntryArgs {
    /// Account the entry is made in
    #[arg(short, long)]
    pub account: String,

    /// Amount coming into the account
    #[arg(long, default_value = "")]
    pub deposit: String,

    /// Amount leaving the account
    #[arg(long, default_value = "")]
    pub withdrawal: String,

    /// The single account on the other side
    #[arg(short, long)]
    pub category: Option<String>,

    /// Explicit counter split, ACCOUNT=AMOUNT (repeatable)
    #[arg(long = "split", value_name = "ACCOUNT=AMOUNT")]
    pub splits: Vec<String>,
}

/// Descriptive fields shared by transactions and schedules.
#[derive(Args, Clone, Default)]
pub struct DetailArgs {
    /// Transaction type (check number, ACH, ...)
    #[arg(long = "type")]
    pub txn_type: Option<String>,

    /// Payee name (created on first use)
    #[arg(long)]
    pub payee: Option<String>,

    /// Description
    #[arg(short, long)]
    pub description: Option<String>,
}

#[derive(Subcommand)]
pub enum TxnCommands {
    /// Record a transaction
    Add {
        #[command(flatten)]
        entry: EntryArgs,

        #[command(flatten)]
        details: DetailArgs,

        /// Transaction date (YYYY-MM-DD or M/D/YYYY, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Status: C (cleared) or R (reconciled)
        #[arg(long)]
        status: Option<String>,
    },

    /// Change a recorded transaction
    Edit {
        /// Transaction ID
        id: String,

        /// Account to re-enter the amounts in (replaces all splits)
        #[arg(short, long)]
        account: Option<String>,

        #[arg(long, requires = "account")]
        deposit: Option<String>,

        #[arg(long, requires = "account")]
        withdrawal: Option<String>,

        #[arg(short, long, requires = "account")]
        category: Option<String>,

        #[arg(long = "split", value_name = "ACCOUNT=AMOUNT", requires = "account")]
        splits: Vec<String>,

        #[command(flatten)]
        details: DetailArgs,

        /// New date
        #[arg(long)]
        date: Option<String>,

        /// New status ("" clears it)
        #[arg(long)]
        status: Option<String>,
    },

    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: String,
    },

    /// Show a transaction with all of its splits
    Show {
        /// Transaction ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ScheduledCommands {
    /// Create a scheduled transaction
    Create {
        /// Name (must be unique)
        name: String,

        /// Frequency: weekly, monthly, quarterly, annually
        #[arg(short, long)]
        frequency: String,

        /// First due date (YYYY-MM-DD or M/D/YYYY)
        #[arg(long)]
        next_due: String,

        #[command(flatten)]
        entry: EntryArgs,

        #[command(flatten)]
        details: DetailArgs,
    },

    /// List scheduled transactions
    List {
        /// Only show schedules touching this account
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Record the next occurrence of a schedule
    Enter {
        /// Scheduled transaction name
        name: String,
    },

    /// Skip the next occurrence of a schedule
    Skip {
        /// Scheduled transaction name
        name: String,
    },

    /// Show (and optionally enter) the schedules that are due
    Due {
        /// Reference date (defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Enter every due occurrence
        #[arg(long)]
        enter: bool,
    },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Create a budget
    Create {
        /// Calendar year the budget covers
        #[arg(short, long, conflicts_with_all = ["start", "end"])]
        year: Option<i32>,

        /// Start date for a custom period
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// End date for a custom period
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Budget name
        #[arg(short, long)]
        name: Option<String>,

        /// Budgeted amount, ACCOUNT=AMOUNT (repeatable)
        #[arg(long = "amount", value_name = "ACCOUNT=AMOUNT")]
        amounts: Vec<String>,

        /// Carryover, ACCOUNT=AMOUNT (repeatable)
        #[arg(long = "carryover", value_name = "ACCOUNT=AMOUNT")]
        carryovers: Vec<String>,
    },

    /// List budgets
    List,

    /// Compare a budget with actual income and spending
    Report {
        /// Budget ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export an account register as CSV
    Ledger {
        /// Account name
        account: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Export the whole database as JSON
    Snapshot {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Account(account_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Payees => {
                let service = LedgerService::connect(&self.database).await?;
                let payees = service.list_payees().await?;
                if payees.is_empty() {
                    println!("No payees found.");
                }
                for payee in payees {
                    println!("{}", payee.name);
                }
            }

            Commands::Txn(txn_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_txn_command(&service, txn_cmd).await?;
            }

            Commands::Ledger { account, search } => {
                let service = LedgerService::connect(&self.database).await?;
                run_ledger_command(&service, &account, search.as_deref()).await?;
            }

            Commands::Scheduled(scheduled_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_scheduled_command(&service, scheduled_cmd).await?;
            }

            Commands::Budget(budget_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_budget_command(&service, budget_cmd).await?;
            }

            Commands::Export(export_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_export_command(&service, export_cmd).await?;
            }

            Commands::Files { dir } => {
                let files = find_data_files(&dir)?;
                if files.is_empty() {
                    println!("No data files found in {}", dir.display());
                }
                for file in files {
                    println!("{}", file.display());
                }
            }

            Commands::Seed { many } => {
                let service = LedgerService::init(&self.database).await?;
                let summary = service.load_sample_data(today(), many).await?;
                println!(
                    "Loaded sample data: {} accounts, {} transactions, {} scheduled, {} budgets",
                    summary.accounts, summary.transactions, summary.scheduled, summary.budgets
                );
            }
        }

        Ok(())
    }
}

async fn run_account_command(service: &LedgerService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            name,
            account_type,
            number,
            parent,
        } => {
            let at = AccountType::from_str(&account_type)?;
            let account = service
                .create_account(at, &name, number, parent.as_deref())
                .await?;
            println!("Created account: {} ({})", account, account.account_type);
        }

        AccountCommands::List { account_type } => {
            let filter = account_type
                .as_deref()
                .map(AccountType::from_str)
                .transpose()?;
            let entries = service.get_all_balances().await?;
            let entries: Vec<_> = entries
                .into_iter()
                .filter(|e| filter.is_none_or(|t| e.account.account_type == t))
                .collect();

            if entries.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<8} {:<24} {:<10} {:>14}", "NUMBER", "NAME", "TYPE", "BALANCE");
                println!("{}", "-".repeat(59));
                for entry in entries {
                    println!(
                        "{:<8} {:<24} {:<10} {:>14}",
                        entry.account.number.as_deref().unwrap_or(""),
                        truncate(&entry.account.name, 24),
                        entry.account.account_type,
                        format_cents(entry.balance)
                    );
                }
            }
        }

        AccountCommands::Edit {
            name,
            rename,
            account_type,
            number,
            parent,
        } => {
            let changes = AccountUpdate {
                name: rename,
                account_type: account_type
                    .as_deref()
                    .map(AccountType::from_str)
                    .transpose()?,
                number,
                parent,
            };
            let account = service.edit_account(&name, changes).await?;
            println!("Updated account: {}", account);
        }

        AccountCommands::Show { name } => {
            let entry = service.get_balance(&name).await?;
            let account = &entry.account;

            println!("Account: {}", account.name);
            println!("  ID:       {}", account.id);
            println!("  Type:     {}", account.account_type);
            if let Some(number) = &account.number {
                println!("  Number:   {}", number);
            }
            if let Some(parent_id) = account.parent {
                let parent = service.get_account_by_id(parent_id).await?;
                println!("  Parent:   {}", parent);
            }
            println!("  Created:  {}", account.created_at.format("%Y-%m-%d %H:%M:%S"));
            println!("  Balance:  {}", format_cents(entry.balance));
        }
    }

    Ok(())
}

async fn run_txn_command(service: &LedgerService, cmd: TxnCommands) -> Result<()> {
    match cmd {
        TxnCommands::Add {
            entry,
            details,
            date,
            status,
        } => {
            let splits = service.build_splits(&entry_input(&entry)?).await?;
            let txn_date = match date {
                Some(d) => parse_date(&d)?,
                None => today(),
            };

            let txn = Transaction::new(splits, txn_date)?
                .with_status(TxnStatus::parse(status.as_deref().unwrap_or(""))?);
            let txn = service.record_transaction(apply_details(txn, details)).await?;
            println!("Recorded transaction {} on {}", txn.id, txn.txn_date);
        }

        TxnCommands::Edit {
            id,
            account,
            deposit,
            withdrawal,
            category,
            splits,
            details,
            date,
            status,
        } => {
            let mut txn = service.get_transaction(parse_id(&id, "transaction")?).await?;

            if let Some(account) = account {
                let entry = EntryArgs {
                    account,
                    deposit: deposit.unwrap_or_default(),
                    withdrawal: withdrawal.unwrap_or_default(),
                    category,
                    splits,
                };
                txn.set_splits(service.build_splits(&entry_input(&entry)?).await?)?;
            }
            if let Some(d) = date {
                txn.txn_date = parse_date(&d)?;
            }
            if let Some(s) = status {
                txn.status = TxnStatus::parse(&s)?;
            }
            let txn = apply_details(txn, details);

            service.update_transaction(&txn).await?;
            println!("Updated transaction {}", txn.id);
        }

        TxnCommands::Delete { id } => {
            let txn_id = parse_id(&id, "transaction")?;
            service.delete_transaction(txn_id).await?;
            println!("Deleted transaction {}", txn_id);
        }

        TxnCommands::Show { id } => {
            let txn = service.get_transaction(parse_id(&id, "transaction")?).await?;
            let names = service.account_names().await?;

            println!("Transaction: {}", txn.id);
            println!("  Date:        {}", txn.txn_date);
            if let Some(t) = &txn.txn_type {
                println!("  Type:        {}", t);
            }
            if let Some(p) = &txn.payee {
                println!("  Payee:       {}", p);
            }
            if let Some(d) = &txn.description {
                println!("  Description: {}", d);
            }
            if let Some(s) = txn.status {
                println!("  Status:      {}", s);
            }
            println!();
            println!("  {:<24} {:>14}", "ACCOUNT", "AMOUNT");
            for split in &txn.splits {
                let name = names
                    .get(&split.account)
                    .cloned()
                    .unwrap_or_else(|| split.account.to_string());
                println!("  {:<24} {:>14}", truncate(&name, 24), format_cents(split.amount));
            }
        }
    }

    Ok(())
}

async fn run_ledger_command(
    service: &LedgerService,
    account_name: &str,
    search: Option<&str>,
) -> Result<()> {
    let ledger = service.get_ledger(account_name).await?;
    let names = service.account_names().await?;

    let matching: Option<HashSet<Uuid>> =
        search.map(|term| ledger.search(term).into_iter().map(|t| t.id).collect());
    let records: Vec<_> = ledger
        .sorted_with_balance()
        .into_iter()
        .filter(|r| matching.as_ref().is_none_or(|ids| ids.contains(&r.txn.id)))
        .collect();

    if records.is_empty() {
        println!("No transactions found.");
    } else {
        println!(
            "{:<10} {:<6} {:<18} {:<20} {:<2} {:>11} {:>11} {:<16} {:>12}",
            "DATE", "TYPE", "PAYEE", "DESCRIPTION", "ST", "DEPOSIT", "WITHDRAWAL", "CATEGORIES", "BALANCE"
        );
        println!("{}", "-".repeat(114));
        for record in &records {
            let d = display_strings_for_ledger(ledger.account(), &record.txn, &names);
            println!(
                "{:<10} {:<6} {:<18} {:<20} {:<2} {:>11} {:>11} {:<16} {:>12}",
                d.txn_date,
                truncate(&d.txn_type, 6),
                truncate(&d.payee, 18),
                truncate(&d.description, 20),
                d.status,
                d.deposit,
                d.withdrawal,
                truncate(&d.categories, 16),
                format_cents(record.balance)
            );
        }
    }

    if search.is_none() && !ledger.scheduled().is_empty() {
        println!();
        println!("Scheduled:");
        let due: HashSet<Uuid> = ledger.scheduled_due(today()).iter().map(|s| s.id).collect();
        for scheduled in ledger.scheduled() {
            let amount = scheduled
                .splits
                .iter()
                .filter(|s| s.account == ledger.account())
                .map(|s| s.amount)
                .sum();
            println!(
                "  {:<20} {:<10} {:<10} {:>12}{}",
                truncate(&scheduled.name, 20),
                scheduled.frequency,
                scheduled.next_due_date,
                format_cents(amount),
                if due.contains(&scheduled.id) { "  (due)" } else { "" }
            );
        }
    }

    Ok(())
}

async fn run_scheduled_command(service: &LedgerService, cmd: ScheduledCommands) -> Result<()> {
    match cmd {
        ScheduledCommands::Create {
            name,
            frequency,
            next_due,
            entry,
            details,
        } => {
            let splits = service.build_splits(&entry_input(&entry)?).await?;
            let mut scheduled = ScheduledTransaction::new(
                name,
                Frequency::from_str(&frequency)?,
                parse_date(&next_due)?,
                splits,
            )?;
            if let Some(t) = details.txn_type {
                scheduled = scheduled.with_txn_type(t);
            }
            if let Some(p) = details.payee {
                scheduled = scheduled.with_payee(Payee::new(p));
            }
            if let Some(d) = details.description {
                scheduled = scheduled.with_description(d);
            }

            let scheduled = service.create_scheduled(scheduled).await?;
            println!(
                "Created scheduled transaction: {} ({}, next due {})",
                scheduled.name, scheduled.frequency, scheduled.next_due_date
            );
        }

        ScheduledCommands::List { account } => {
            let scheduled = service.list_scheduled(account.as_deref()).await?;
            if scheduled.is_empty() {
                println!("No scheduled transactions found.");
            } else {
                let names = service.account_names().await?;
                println!("{:<20} {:<10} {:<10} {:<30}", "NAME", "FREQUENCY", "NEXT DUE", "SPLITS");
                println!("{}", "-".repeat(73));
                for st in scheduled {
                    let splits: Vec<String> = st
                        .splits
                        .iter()
                        .map(|s| {
                            let name = names.get(&s.account).map(String::as_str).unwrap_or("?");
                            format!("{} {}", name, format_cents(s.amount))
                        })
                        .collect();
                    println!(
                        "{:<20} {:<10} {:<10} {}",
                        truncate(&st.name, 20),
                        st.frequency,
                        st.next_due_date,
                        splits.join(", ")
                    );
                }
            }
        }

        ScheduledCommands::Enter { name } => {
            let txn = service.enter_scheduled(&name).await?;
            let scheduled = service.get_scheduled(&name).await?;
            println!(
                "Entered {} on {} ({}); next due {}",
                scheduled.name, txn.txn_date, txn.id, scheduled.next_due_date
            );
        }

        ScheduledCommands::Skip { name } => {
            let scheduled = service.skip_scheduled(&name).await?;
            println!(
                "Skipped {}; next due {}",
                scheduled.name, scheduled.next_due_date
            );
        }

        ScheduledCommands::Due { date, enter } => {
            let date = match date {
                Some(d) => parse_date(&d)?,
                None => today(),
            };

            if enter {
                let entered = service.enter_all_due(date).await?;
                println!("Entered {} scheduled transaction(s)", entered.len());
                for txn in entered {
                    println!("  {} {}", txn.txn_date, txn.id);
                }
            } else {
                let due = service.list_due_scheduled(date).await?;
                if due.is_empty() {
                    println!("Nothing due on {}.", date);
                }
                for st in due {
                    println!("{:<20} {:<10} {}", truncate(&st.name, 20), st.frequency, st.next_due_date);
                }
            }
        }
    }

    Ok(())
}

async fn run_budget_command(service: &LedgerService, cmd: BudgetCommands) -> Result<()> {
    match cmd {
        BudgetCommands::Create {
            year,
            start,
            end,
            name,
            amounts,
            carryovers,
        } => {
            let mut budget = match (year, start, end) {
                (Some(year), _, _) => Budget::for_year(year)?,
                (None, Some(start), Some(end)) => Budget::new(parse_date(&start)?, parse_date(&end)?)?,
                _ => anyhow::bail!("Give either --year or --start and --end"),
            };
            if let Some(name) = name {
                budget = budget.with_name(name);
            }

            for pair in &amounts {
                let (account_name, amount) = parse_pair(pair)?;
                let account = service.get_account(&account_name).await?;
                let mut info = budget.account_info.get(&account.id).cloned().unwrap_or_default();
                info.amount = parse_cents(&amount)?;
                budget.set_info(account.id, info);
            }
            for pair in &carryovers {
                let (account_name, amount) = parse_pair(pair)?;
                let account = service.get_account(&account_name).await?;
                let mut info: BudgetInfo =
                    budget.account_info.get(&account.id).cloned().unwrap_or_default();
                info.carryover = Some(parse_cents(&amount)?);
                budget.set_info(account.id, info);
            }

            let budget = service.create_budget(budget).await?;
            println!("Created budget: {} ({})", budget.label(), budget.id);
        }

        BudgetCommands::List => {
            let budgets = service.list_budgets().await?;
            if budgets.is_empty() {
                println!("No budgets found.");
            } else {
                println!("{:<36} {:<20} {:<10} {:<10}", "ID", "NAME", "START", "END");
                println!("{}", "-".repeat(79));
                for budget in budgets {
                    println!(
                        "{:<36} {:<20} {:<10} {:<10}",
                        budget.id,
                        truncate(budget.name.as_deref().unwrap_or(""), 20),
                        budget.start_date,
                        budget.end_date
                    );
                }
            }
        }

        BudgetCommands::Report { id } => {
            let status = service
                .get_budget_report(parse_id(&id, "budget")?)
                .await?;
            let name_of = |account_id: Uuid| {
                status
                    .accounts
                    .get(&account_id)
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "?".to_string())
            };
            let percent = |p: Option<i64>| p.map(|p| format!("{}%", p)).unwrap_or_default();

            println!("Budget: {}", status.budget.label());
            println!();
            println!(
                "{:<24} {:>10} {:>10} {:>10} {:>12} {:>10} {:>10} {:>6}",
                "EXPENSE", "AMOUNT", "CARRYOVER", "INCOME", "TOTAL", "SPENT", "REMAINING", "AVAIL"
            );
            println!("{}", "-".repeat(101));
            for (account_id, line) in &status.report.expense {
                match line {
                    Some(l) => println!(
                        "{:<24} {:>10} {:>10} {:>10} {:>12} {:>10} {:>10} {:>6}",
                        truncate(&name_of(*account_id), 24),
                        format_cents(l.amount),
                        format_cents(l.carryover),
                        format_cents(l.income),
                        format_cents(l.total_budget),
                        format_cents(l.spent),
                        format_cents(l.remaining),
                        percent(l.percent_available)
                    ),
                    None => println!("{:<24}", truncate(&name_of(*account_id), 24)),
                }
            }

            println!();
            println!(
                "{:<24} {:>10} {:>10} {:>10} {:>6}",
                "INCOME", "AMOUNT", "INCOME", "REMAINING", "PCT"
            );
            println!("{}", "-".repeat(64));
            for (account_id, line) in &status.report.income {
                match line {
                    Some(l) => println!(
                        "{:<24} {:>10} {:>10} {:>10} {:>6}",
                        truncate(&name_of(*account_id), 24),
                        format_cents(l.amount),
                        format_cents(l.income),
                        format_cents(l.remaining),
                        percent(l.remaining_percent)
                    ),
                    None => println!("{:<24}", truncate(&name_of(*account_id), 24)),
                }
            }
        }
    }

    Ok(())
}

async fn run_export_command(service: &LedgerService, cmd: ExportCommands) -> Result<()> {
    use crate::io::Exporter;

    let exporter = Exporter::new(service);

    match cmd {
        ExportCommands::Ledger { account, output } => {
            let count = exporter
                .export_ledger_csv(&account, open_output(output.as_deref())?)
                .await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        ExportCommands::Snapshot { output } => {
            let snapshot = exporter
                .export_snapshot_json(open_output(output.as_deref())?)
                .await?;
            if output.is_some() {
                eprintln!(
                    "Exported snapshot: {} accounts, {} transactions, {} scheduled, {} budgets",
                    snapshot.accounts.len(),
                    snapshot.transactions.len(),
                    snapshot.scheduled_transactions.len(),
                    snapshot.budgets.len()
                );
            }
        }
    }

    Ok(())
}

fn open_output(output: Option<&str>) -> Result<Box<dyn std::io::Write>> {
    let writer: Box<dyn std::io::Write> = match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(std::io::stdout()),
    };
    Ok(writer)
}

fn entry_input(entry: &EntryArgs) -> Result<EntryInput> {
    let splits = entry
        .splits
        .iter()
        .map(|s| parse_pair(s))
        .collect::<Result<Vec<_>>>()?;
    Ok(EntryInput {
        account: entry.account.clone(),
        deposit: entry.deposit.clone(),
        withdrawal: entry.withdrawal.clone(),
        category: entry.category.clone(),
        splits,
    })
}

fn apply_details(mut txn: Transaction, details: DetailArgs) -> Transaction {
    if let Some(t) = details.txn_type {
        txn = txn.with_txn_type(t);
    }
    if let Some(p) = details.payee {
        txn = txn.with_payee(Payee::new(p));
    }
    if let Some(d) = details.description {
        txn = txn.with_description(d);
    }
    txn
}

/// Split `NAME=VALUE` at the last `=`, so account names may contain one.
fn parse_pair(s: &str) -> Result<(String, String)> {
    let (name, value) = s
        .rsplit_once('=')
        .with_context(|| format!("Expected ACCOUNT=AMOUNT, got '{}'", s))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_id(s: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).with_context(|| format!("Invalid {} ID format (expected UUID)", what))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXN_ID: &str = "6f1c1f0e-8a4e-4d7a-9a51-3b2f7c7d9e10";

    #[test]
    fn test_txn_edit_amounts_need_account() {
        for flag in ["--deposit", "--withdrawal", "--category", "--split"] {
            let value = if flag == "--split" { "Food=5" } else { "5" };
            let result = Cli::try_parse_from(["bricbooks", "txn", "edit", TXN_ID, flag, value]);
            assert!(result.is_err(), "{flag} accepted without --account");
        }

        let cli = Cli::try_parse_from([
            "bricbooks", "txn", "edit", TXN_ID, "--account", "Checking", "--deposit", "5",
            "--category", "Wages",
        ])
        .unwrap();
        match cli.command {
            Commands::Txn(TxnCommands::Edit {
                account, deposit, ..
            }) => {
                assert_eq!(account.as_deref(), Some("Checking"));
                assert_eq!(deposit.as_deref(), Some("5"));
            }
            _ => panic!("expected txn edit"),
        }

        // Details alone don't touch the splits
        assert!(Cli::try_parse_from(["bricbooks", "txn", "edit", TXN_ID, "-d", "lunch"]).is_ok());
    }

    #[test]
    fn test_seed_many_flag() {
        let cli = Cli::try_parse_from(["bricbooks", "seed", "--many"]).unwrap();
        assert!(matches!(cli.command, Commands::Seed { many: true }));
        let cli = Cli::try_parse_from(["bricbooks", "seed"]).unwrap();
        assert!(matches!(cli.command, Commands::Seed { many: false }));
    }
}
