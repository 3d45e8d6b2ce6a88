mod common;

use anyhow::Result;
use bricbooks::application::{AppError, EntryInput};
use bricbooks::domain::{
    display_strings_for_ledger, Payee, Split, Transaction, TransactionError, TxnStatus,
};
use common::{date, record, test_service, StandardAccounts};
use uuid::Uuid;

#[tokio::test]
async fn test_record_and_get_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;

    let txn = Transaction::new(
        vec![Split::new(a.checking.id, -10100), Split::new(a.housing.id, 10100)],
        date(2018, 1, 25),
    )?
    .with_txn_type("1234")
    .with_payee(Payee::new("Landlord"))
    .with_description("January rent")
    .with_status(Some(TxnStatus::Cleared));
    let recorded = service.record_transaction(txn).await?;

    let stored = service.get_transaction(recorded.id).await?;
    assert_eq!(stored.txn_date, date(2018, 1, 25));
    assert_eq!(stored.splits, recorded.splits);
    assert_eq!(stored.txn_type.as_deref(), Some("1234"));
    assert_eq!(stored.description.as_deref(), Some("January rent"));
    assert_eq!(stored.status, Some(TxnStatus::Cleared));
    assert_eq!(stored.payee.as_ref().map(|p| p.name.as_str()), Some("Landlord"));
    assert_eq!(stored.payee, recorded.payee);

    Ok(())
}

#[tokio::test]
async fn test_payee_is_reused_by_name() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;

    for amount in [1000, 2000] {
        let txn = Transaction::new(
            vec![Split::new(a.checking.id, -amount), Split::new(a.food.id, amount)],
            date(2018, 1, 1),
        )?
        .with_payee(Payee::new("Joe's Burgers"));
        service.record_transaction(txn).await?;
    }

    let payees = service.list_payees().await?;
    assert_eq!(payees.len(), 1);
    assert_eq!(payees[0].name, "Joe's Burgers");

    let ledger = service.get_ledger("Checking").await?;
    assert_eq!(ledger.payees(), payees);

    Ok(())
}

#[tokio::test]
async fn test_invalid_transactions_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;

    let mut txn = Transaction::new(
        vec![Split::new(a.checking.id, -100), Split::new(a.food.id, 100)],
        date(2018, 1, 1),
    )?;
    txn.splits[1].amount = 90;
    let result = service.record_transaction(txn).await;
    assert!(matches!(
        result,
        Err(AppError::Transaction(TransactionError::Unbalanced))
    ));

    let unknown = Transaction::new(
        vec![Split::new(a.checking.id, -100), Split::new(Uuid::new_v4(), 100)],
        date(2018, 1, 1),
    )?;
    let result = service.record_transaction(unknown).await;
    assert!(matches!(result, Err(AppError::AccountNotFound(_))));

    assert!(service.list_all_transactions().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_update_transaction_replaces_splits() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;

    let mut txn = record(&service, &a.checking, &a.food, 5000, date(2018, 1, 5)).await?;
    txn.set_splits(vec![
        Split::new(a.checking.id, -5000),
        Split::new(a.food.id, 3000),
        Split::new(a.transportation.id, 2000),
    ])?;
    txn.txn_date = date(2018, 1, 6);
    txn.status = Some(TxnStatus::Reconciled);
    service.update_transaction(&txn).await?;

    let stored = service.get_transaction(txn.id).await?;
    assert_eq!(stored.splits.len(), 3);
    assert_eq!(stored.txn_date, date(2018, 1, 6));
    assert_eq!(stored.status, Some(TxnStatus::Reconciled));
    assert_eq!(service.get_balance("Food").await?.balance, 3000);
    assert_eq!(service.get_balance("Transportation").await?.balance, 2000);

    Ok(())
}

#[tokio::test]
async fn test_update_unknown_transaction_writes_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;

    let txn = Transaction::new(
        vec![Split::new(a.checking.id, -100), Split::new(a.food.id, 100)],
        date(2018, 1, 1),
    )?
    .with_payee(Payee::new("Nobody"));
    let result = service.update_transaction(&txn).await;
    assert!(matches!(result, Err(AppError::TransactionNotFound(_))));

    assert!(service.list_all_transactions().await?.is_empty());
    assert!(service.list_payees().await?.is_empty());
    assert_eq!(service.get_balance("Food").await?.balance, 0);

    Ok(())
}

#[tokio::test]
async fn test_delete_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;

    let keep = record(&service, &a.checking, &a.food, 100, date(2018, 1, 1)).await?;
    let gone = record(&service, &a.checking, &a.food, 200, date(2018, 1, 2)).await?;

    service.delete_transaction(gone.id).await?;
    assert!(matches!(
        service.get_transaction(gone.id).await,
        Err(AppError::TransactionNotFound(_))
    ));
    assert!(matches!(
        service.delete_transaction(gone.id).await,
        Err(AppError::TransactionNotFound(_))
    ));

    let remaining = service.list_all_transactions().await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep.id);
    assert_eq!(service.get_balance("Food").await?.balance, 100);

    Ok(())
}

#[tokio::test]
async fn test_build_splits_from_register_entry() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;

    let splits = service
        .build_splits(&EntryInput {
            account: "Checking".into(),
            withdrawal: "101".into(),
            category: Some("Housing".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(
        splits,
        vec![Split::new(a.checking.id, -10100), Split::new(a.housing.id, 10100)]
    );

    let splits = service
        .build_splits(&EntryInput {
            account: "Checking".into(),
            withdrawal: "50".into(),
            splits: vec![("Food".into(), "30".into()), ("Transportation".into(), "20".into())],
            ..Default::default()
        })
        .await?;
    assert_eq!(splits.len(), 3);
    assert_eq!(splits[2], Split::new(a.transportation.id, 2000));

    let unbalanced = service
        .build_splits(&EntryInput {
            account: "Checking".into(),
            withdrawal: "50".into(),
            splits: vec![("Food".into(), "30".into())],
            ..Default::default()
        })
        .await;
    assert!(matches!(
        unbalanced,
        Err(AppError::Transaction(TransactionError::Unbalanced))
    ));

    let no_category = service
        .build_splits(&EntryInput {
            account: "Checking".into(),
            deposit: "5".into(),
            ..Default::default()
        })
        .await;
    assert!(matches!(no_category, Err(AppError::InvalidInput(_))));

    Ok(())
}

#[tokio::test]
async fn test_ledger_running_balance_and_search() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;

    // Entered out of date order
    record(&service, &a.checking, &a.food, 3223, date(2017, 6, 5)).await?;
    record(&service, &a.wages, &a.checking, 10000, date(2017, 1, 1)).await?;
    let burger = Transaction::new(
        vec![Split::new(a.checking.id, -1000), Split::new(a.food.id, 1000)],
        date(2017, 7, 1),
    )?
    .with_payee(Payee::new("Burger Barn"))
    .with_description("lunch");
    service.record_transaction(burger).await?;
    record(&service, &a.savings, &a.transportation, 500, date(2017, 7, 2)).await?;

    let ledger = service.get_ledger("Checking").await?;
    let records = ledger.sorted_with_balance();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].txn.txn_date, date(2017, 1, 1));
    let balances: Vec<i64> = records.iter().map(|r| r.balance).collect();
    assert_eq!(balances, vec![10000, 6777, 5777]);
    assert_eq!(ledger.balance(), 5777);

    let names = service.account_names().await?;
    let display = display_strings_for_ledger(ledger.account(), &records[1].txn, &names);
    assert_eq!(display.withdrawal, "32.23");
    assert_eq!(display.deposit, "");
    assert_eq!(display.categories, "Food");

    let hits = ledger.search("BURGER");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].description.as_deref(), Some("lunch"));
    assert_eq!(ledger.search("LUNCH").len(), 1);
    assert!(ledger.search("nothing").is_empty());

    Ok(())
}
