//! End-to-end bill lifecycle over a real embedded database: number and
//! hash allocation, the trash round trip, purge and the legacy migration.

mod common;

use bill_server::billing::BillNumberAllocator;
use bill_server::billing::resolver::LookupKey;
use bill_server::db::repository::CounterRepository;
use bill_server::utils::AppError;
use shared::models::{Bill, BillUpdate, PaymentMode};
use shared::util::now_millis;

use common::{midday_millis, sample_create, saree_items, test_state};

#[tokio::test]
async fn create_allocates_sequential_date_prefixed_ids() {
    let (_dir, state) = test_state().await;

    let first = state
        .manager
        .create(sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();
    let second = state
        .manager
        .create(sample_create("2025-04-01", "9876543211"))
        .await
        .unwrap();
    let other_day = state
        .manager
        .create(sample_create("2025-04-02", "9876543212"))
        .await
        .unwrap();

    assert_eq!(first.id.as_deref(), Some("25040101"));
    assert_eq!(second.id.as_deref(), Some("25040102"));
    assert_eq!(other_day.id.as_deref(), Some("25040201"));
}

#[tokio::test]
async fn create_allocates_a_lookup_hash() {
    let (_dir, state) = test_state().await;

    let bill = state
        .manager
        .create(sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();

    assert_eq!(bill.url_hash.len(), 8);
    assert!(
        bill.url_hash
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    );
    assert!(!bill.url_hash.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn create_rejects_a_mismatched_total() {
    let (_dir, state) = test_state().await;

    let mut payload = sample_create("2025-04-01", "9876543210");
    payload.total_amount = 2500.0;

    let err = state.manager.create(payload).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn update_preserves_id_hash_and_created_at() {
    let (_dir, state) = test_state().await;

    let bill = state
        .manager
        .create(sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();
    let id = bill.id.clone().unwrap();

    let updated = state
        .manager
        .update(
            &id,
            BillUpdate {
                date: midday_millis("2025-04-03"),
                customer_name: "Meena".to_string(),
                customer_phone: "9876543210".to_string(),
                items: saree_items(),
                total_amount: 3000.0,
                payment_mode: PaymentMode::Upi,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, bill.id);
    assert_eq!(updated.url_hash, bill.url_hash);
    assert_eq!(updated.created_at, bill.created_at);
    assert_eq!(updated.customer_name, "Meena");
    assert_eq!(updated.payment_mode, PaymentMode::Upi);
}

#[tokio::test]
async fn trash_and_restore_round_trip() {
    let (_dir, state) = test_state().await;

    let bill = state
        .manager
        .create(sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();
    let id = bill.id.clone().unwrap();

    let trashed = state.manager.trash(&id).await.unwrap();
    assert_eq!(trashed.id.as_deref(), Some(id.as_str()));
    assert_eq!(trashed.original_collection, "bill");
    assert!(trashed.deleted_at > 0);

    // Gone from the active table, present in the trash
    assert!(state.bills.find_by_id(&id).await.unwrap().is_none());
    assert_eq!(state.trash.find_all().await.unwrap().len(), 1);

    let restored = state.manager.restore(&id).await.unwrap();
    assert_eq!(restored.id.as_deref(), Some(id.as_str()));
    assert_eq!(restored.url_hash, bill.url_hash);

    // Back in the active table, trash empty again
    assert!(state.bills.find_by_id(&id).await.unwrap().is_some());
    assert!(state.trash.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn purge_is_permanent() {
    let (_dir, state) = test_state().await;

    let bill = state
        .manager
        .create(sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();
    let id = bill.id.clone().unwrap();

    state.manager.trash(&id).await.unwrap();
    state.manager.purge(&id).await.unwrap();

    assert!(state.bills.find_by_id(&id).await.unwrap().is_none());
    assert!(state.trash.find_all().await.unwrap().is_empty());
    assert!(state.manager.restore(&id).await.is_err());
}

#[tokio::test]
async fn trashing_an_unknown_bill_is_not_found() {
    let (_dir, state) = test_state().await;

    let err = state.manager.trash("25040199").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn number_sequence_skips_trashed_bills() {
    let (_dir, state) = test_state().await;

    let first = state
        .manager
        .create(sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();
    state.manager.trash(&first.id.unwrap()).await.unwrap();

    // The day counter never rewinds
    let second = state
        .manager
        .create(sample_create("2025-04-01", "9876543211"))
        .await
        .unwrap();
    assert_eq!(second.id.as_deref(), Some("25040102"));
}

#[tokio::test]
async fn allocator_refuses_the_hundredth_bill_of_a_day() {
    let (_dir, state) = test_state().await;

    let allocator =
        BillNumberAllocator::new(CounterRepository::new(state.db.clone()), state.config.timezone);
    let date = midday_millis("2025-04-01");

    for n in 1..=99 {
        let id = allocator.allocate(date).await.unwrap();
        assert_eq!(id, format!("250401{n:02}"));
    }

    let err = allocator.allocate(date).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));
}

#[tokio::test]
async fn migration_backfills_hashes_and_the_legacy_table() {
    let (_dir, state) = test_state().await;

    // Two pre-hash-era bills and one modern bill
    for (id, phone) in [("19042501", "9876543210"), ("19042502", "9876543211")] {
        state
            .bills
            .create(Bill {
                id: Some(id.to_string()),
                url_hash: String::new(),
                date: midday_millis("2019-04-25"),
                customer_name: "Asha".to_string(),
                customer_phone: phone.to_string(),
                items: saree_items(),
                total_amount: 3000.0,
                payment_mode: PaymentMode::Cash,
                created_at: now_millis(),
            })
            .await
            .unwrap();
    }
    state
        .manager
        .create(sample_create("2025-04-01", "9876543212"))
        .await
        .unwrap();

    let migrated = state.manager.migrate_legacy().await.unwrap();
    assert_eq!(migrated, 2);

    // Every active bill now carries a hash
    for bill in state.bills.find_all().await.unwrap() {
        assert_eq!(bill.url_hash.len(), 8);
    }

    // A second run has nothing left to do
    assert_eq!(state.manager.migrate_legacy().await.unwrap(), 0);
}

#[tokio::test]
async fn migrated_id_links_survive_trashing_the_active_bill() {
    let (_dir, state) = test_state().await;
    state.shop.get_or_create().await.unwrap();

    state
        .bills
        .create(Bill {
            id: Some("19042501".to_string()),
            url_hash: String::new(),
            date: midday_millis("2019-04-25"),
            customer_name: "Asha".to_string(),
            customer_phone: "9876543210".to_string(),
            items: saree_items(),
            total_amount: 3000.0,
            payment_mode: PaymentMode::Cash,
            created_at: now_millis(),
        })
        .await
        .unwrap();
    state.manager.migrate_legacy().await.unwrap();

    state.manager.trash("19042501").await.unwrap();

    // The id-based link falls through to the legacy table
    let resolved = state
        .resolver
        .resolve(&LookupKey::OldId("19042501".to_string()))
        .await
        .unwrap();
    assert_eq!(resolved.bill.id.as_deref(), Some("19042501"));
}

#[tokio::test]
async fn customer_directory_follows_bill_creation() {
    let (_dir, state) = test_state().await;

    state
        .manager
        .create(sample_create("2025-04-01", "9876543210"))
        .await
        .unwrap();

    let customers = state.customers.find_all().await.unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].name, "Asha");
    assert_eq!(customers[0].phone, "9876543210");

    let history = state.bills.find_by_customer("9876543210").await.unwrap();
    assert_eq!(history.len(), 1);
}
