mod common;

use anyhow::Result;
use bricbooks::application::{AppError, LedgerService};
use bricbooks::domain::{Frequency, Payee, ScheduledTransaction, Split};
use common::{date, test_service, StandardAccounts};

async fn create_rent(
    service: &LedgerService,
    accounts: &StandardAccounts,
    frequency: Frequency,
) -> Result<ScheduledTransaction> {
    let scheduled = ScheduledTransaction::new(
        "rent",
        frequency,
        date(2019, 1, 31),
        vec![
            Split::new(accounts.checking.id, -10100),
            Split::new(accounts.housing.id, 10100),
        ],
    )?
    .with_payee(Payee::new("Landlord"))
    .with_description("monthly rent");
    Ok(service.create_scheduled(scheduled).await?)
}

#[tokio::test]
async fn test_create_and_get_scheduled() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;

    let created = create_rent(&service, &a, Frequency::Monthly).await?;
    let stored = service.get_scheduled("rent").await?;
    assert_eq!(stored.id, created.id);
    assert_eq!(stored.frequency, Frequency::Monthly);
    assert_eq!(stored.next_due_date, date(2019, 1, 31));
    assert_eq!(stored.splits, created.splits);
    assert_eq!(stored.payee.map(|p| p.name), Some("Landlord".to_string()));
    assert_eq!(stored.description.as_deref(), Some("monthly rent"));

    let duplicate = create_rent(&service, &a, Frequency::Weekly).await;
    assert!(duplicate.is_err());
    assert_eq!(service.list_scheduled(None).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_enter_records_transaction_and_advances() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;
    create_rent(&service, &a, Frequency::Monthly).await?;

    let txn = service.enter_scheduled("rent").await?;
    assert_eq!(txn.txn_date, date(2019, 1, 31));
    assert_eq!(txn.description.as_deref(), Some("monthly rent"));

    let stored = service.get_transaction(txn.id).await?;
    assert_eq!(stored.payee.map(|p| p.name), Some("Landlord".to_string()));
    assert_eq!(service.get_balance("Housing").await?.balance, 10100);

    // Month increments clamp to the end of the month
    let advanced = service.get_scheduled("rent").await?;
    assert_eq!(advanced.next_due_date, date(2019, 2, 28));
    assert_eq!(service.list_payees().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_skip_only_advances() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;
    create_rent(&service, &a, Frequency::Quarterly).await?;

    let skipped = service.skip_scheduled("rent").await?;
    assert_eq!(skipped.next_due_date, date(2019, 4, 30));
    assert_eq!(
        service.get_scheduled("rent").await?.next_due_date,
        date(2019, 4, 30)
    );
    assert!(service.list_all_transactions().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_due_and_enter_all_due() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;
    create_rent(&service, &a, Frequency::Weekly).await?;
    let later = ScheduledTransaction::new(
        "insurance",
        Frequency::Annually,
        date(2019, 6, 1),
        vec![
            Split::new(a.checking.id, -50000),
            Split::new(a.transportation.id, 50000),
        ],
    )?;
    service.create_scheduled(later).await?;

    let due = service.list_due_scheduled(date(2019, 2, 14)).await?;
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].name, "rent");

    let ledger = service.get_ledger("Checking").await?;
    assert_eq!(ledger.scheduled().len(), 2);
    assert_eq!(ledger.scheduled_due(date(2019, 2, 14)).len(), 1);

    // Jan 31, Feb 7 and Feb 14 are all due
    let entered = service.enter_all_due(date(2019, 2, 14)).await?;
    let dates: Vec<_> = entered.iter().map(|t| t.txn_date).collect();
    assert_eq!(dates, vec![date(2019, 1, 31), date(2019, 2, 7), date(2019, 2, 14)]);
    assert_eq!(
        service.get_scheduled("rent").await?.next_due_date,
        date(2019, 2, 21)
    );
    assert_eq!(
        service.get_scheduled("insurance").await?.next_due_date,
        date(2019, 6, 1)
    );
    assert!(service.list_due_scheduled(date(2019, 2, 14)).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_list_scheduled_for_account() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;
    create_rent(&service, &a, Frequency::Monthly).await?;

    assert_eq!(service.list_scheduled(Some("Housing")).await?.len(), 1);
    assert!(service.list_scheduled(Some("Food")).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unknown_schedule() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(matches!(
        service.enter_scheduled("nope").await,
        Err(AppError::ScheduledTransactionNotFound(_))
    ));
    assert!(matches!(
        service.skip_scheduled("nope").await,
        Err(AppError::ScheduledTransactionNotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_delete_scheduled() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = StandardAccounts::create(&service).await?;
    create_rent(&service, &a, Frequency::Monthly).await?;

    service.delete_scheduled("rent").await?;
    assert!(service.list_scheduled(None).await?.is_empty());

    Ok(())
}
