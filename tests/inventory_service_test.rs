//! Inventory create/update/retire flows and the audit entries each one
//! emits.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;

use labstock_api::errors::ServiceError;
use labstock_api::models::{InventoryPatch, NewInventoryItem};
use labstock_api::store::collections;

use common::{
    admin_actor, audit_rows, client, seed_item, services, services_over, ContendedStore,
    DECREMENT_MAX_RETRIES,
};

fn new_gloves(quantity: i64) -> NewInventoryItem {
    NewInventoryItem {
        item_name: "Nitrile Gloves".to_string(),
        category: "PPE".to_string(),
        quantity,
        unit: "Units".to_string(),
        storage_location: "Main Store".to_string(),
        supplier: "Standard Supplier".to_string(),
        expiry_date: None,
        reorder_level: None,
        notes: String::new(),
    }
}

#[tokio::test]
async fn add_generates_id_and_one_audit_entry() {
    let (store, services) = services();
    let actor = admin_actor();

    let item = services
        .inventory
        .add(new_gloves(100), Some(&actor), &client())
        .await
        .unwrap();

    assert_eq!(item.item_id, "BIO-PPE-0001");
    assert_eq!(item.quantity, 100);
    assert_eq!(item.reorder_level, 50);
    assert!(item.is_active());

    let audits = audit_rows(&store, collections::INVENTORY, "BIO-PPE-0001").await;
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0]["action_type"], json!("ADD"));
    assert_eq!(audits[0]["user_id"], json!("boss"));
    assert_eq!(audits[0]["ip_address"], json!("10.0.0.5"));
}

#[tokio::test]
async fn sequential_ids_per_insert() {
    let (_, services) = services();

    let first = services
        .inventory
        .add(new_gloves(10), None, &client())
        .await
        .unwrap();
    let mut tubes = new_gloves(20);
    tubes.item_name = "Falcon Tubes".to_string();
    tubes.category = "Labware".to_string();
    let second = services.inventory.add(tubes, None, &client()).await.unwrap();

    assert_eq!(first.item_id, "BIO-PPE-0001");
    assert_eq!(second.item_id, "BIO-LAB-0002");
}

#[tokio::test]
async fn update_audits_each_changed_field() {
    let (store, services) = services();
    seed_item(&store, "BIO-PPE-0001", "Nitrile Gloves", 100);

    let changes = services
        .inventory
        .update(
            "BIO-PPE-0001",
            InventoryPatch {
                quantity: Some(80),
                notes: Some("restocked".to_string()),
                ..Default::default()
            },
            Some(&admin_actor()),
            &client(),
        )
        .await
        .unwrap();
    assert_eq!(changes.len(), 2);

    let audits = audit_rows(&store, collections::INVENTORY, "BIO-PPE-0001").await;
    assert_eq!(audits.len(), 2);
    let fields: Vec<&str> = audits
        .iter()
        .map(|row| row["field_name"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"quantity"));
    assert!(fields.contains(&"notes"));
    for row in &audits {
        assert_eq!(row["action_type"], json!("UPDATE"));
    }
}

#[tokio::test]
async fn noop_update_writes_nothing() {
    let (store, services) = services();
    seed_item(&store, "BIO-PPE-0001", "Nitrile Gloves", 100);

    let patch = InventoryPatch {
        quantity: Some(100),
        ..Default::default()
    };
    let changes = services
        .inventory
        .update("BIO-PPE-0001", patch.clone(), None, &client())
        .await
        .unwrap();
    assert!(changes.is_empty());

    // Submitting the same no-op twice still audits nothing.
    services
        .inventory
        .update("BIO-PPE-0001", patch, None, &client())
        .await
        .unwrap();
    assert!(store.is_empty(collections::AUDIT_LOGS));
}

#[tokio::test]
async fn negative_quantity_update_rejected() {
    let (store, services) = services();
    seed_item(&store, "BIO-PPE-0001", "Nitrile Gloves", 100);

    let err = services
        .inventory
        .update(
            "BIO-PPE-0001",
            InventoryPatch {
                quantity: Some(-5),
                ..Default::default()
            },
            None,
            &client(),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn update_of_unknown_item_is_not_found() {
    let (_, services) = services();
    let err = services
        .inventory
        .update(
            "BIO-XXX-9999",
            InventoryPatch {
                quantity: Some(1),
                ..Default::default()
            },
            None,
            &client(),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn delete_flips_status_and_hides_from_default_listing() {
    let (store, services) = services();
    seed_item(&store, "BIO-PPE-0001", "Nitrile Gloves", 100);
    seed_item(&store, "BIO-PPE-0002", "Face Shields", 40);

    services
        .inventory
        .delete("BIO-PPE-0001", Some(&admin_actor()), &client())
        .await
        .unwrap();

    let active = services.inventory.list(false).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].item_id, "BIO-PPE-0002");

    let all = services.inventory.list(true).await.unwrap();
    assert_eq!(all.len(), 2);

    let audits = audit_rows(&store, collections::INVENTORY, "BIO-PPE-0001").await;
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0]["action_type"], json!("DELETE"));
    assert_eq!(audits[0]["field_name"], json!("status"));
    assert_eq!(audits[0]["old_value"], json!("Active"));
    assert_eq!(audits[0]["new_value"], json!("Deleted"));
}

#[tokio::test]
async fn decrement_below_zero_clamps() {
    let (store, services) = services();
    seed_item(&store, "BIO-PPE-0001", "Nitrile Gloves", 10);

    let (old, new) = services
        .inventory
        .decrement("BIO-PPE-0001", 25, None, &client(), None)
        .await
        .unwrap();
    assert_eq!((old, new), (10, 0));

    let item = services
        .inventory
        .get("BIO-PPE-0001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.quantity, 0);

    let audits = audit_rows(&store, collections::INVENTORY, "BIO-PPE-0001").await;
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0]["action_type"], json!("INVENTORY_USAGE"));
}

#[tokio::test]
async fn decrement_retries_after_losing_a_conditional_write() {
    let store = Arc::new(ContendedStore::losing_updates(1));
    seed_item(store.inner(), "BIO-PPE-0001", "Nitrile Gloves", 100);
    let services = services_over(store.clone());

    let (old, new) = services
        .inventory
        .decrement("BIO-PPE-0001", 30, None, &client(), None)
        .await
        .unwrap();
    assert_eq!((old, new), (100, 70));
    assert_eq!(store.update_attempts(), 2);

    let item = services
        .inventory
        .get("BIO-PPE-0001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.quantity, 70);

    // The lost round must not double up the audit trail.
    let audits = audit_rows(store.inner(), collections::INVENTORY, "BIO-PPE-0001").await;
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0]["action_type"], json!("INVENTORY_USAGE"));
}

#[tokio::test]
async fn decrement_gives_up_as_conflict_when_every_write_loses() {
    let store = Arc::new(ContendedStore::losing_updates(u32::MAX));
    seed_item(store.inner(), "BIO-PPE-0001", "Nitrile Gloves", 100);
    let services = services_over(store.clone());

    let err = services
        .inventory
        .decrement("BIO-PPE-0001", 30, None, &client(), None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
    assert_eq!(store.update_attempts(), DECREMENT_MAX_RETRIES);

    let item = services
        .inventory
        .get("BIO-PPE-0001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.quantity, 100);
    assert!(store.inner().is_empty(collections::AUDIT_LOGS));
}

#[rstest::rstest]
#[case(0)]
#[case(-3)]
#[tokio::test]
async fn decrement_rejects_non_positive_amounts(#[case] amount: i64) {
    let (store, services) = services();
    seed_item(&store, "BIO-PPE-0001", "Nitrile Gloves", 10);

    let err = services
        .inventory
        .decrement("BIO-PPE-0001", amount, None, &client(), None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    assert!(store.is_empty(collections::AUDIT_LOGS));
}
