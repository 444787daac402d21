use familyapp_core::{Budget, BudgetCategory};
use familyapp_store::{
    select_as, ChangeKind, JsonFileStore, MemoryStore, Query, RowStore, StoreError, Table,
};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn rows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        store
            .insert(
                Table::Budgets,
                json!({
                    "owner_id": "o1", "title": "Food", "amount": 500, "spent": 320,
                    "category": "groceries", "period": "monthly"
                }),
            )
            .await
            .unwrap();
    }

    let store = JsonFileStore::open(dir.path()).await.unwrap();
    let budgets: Vec<Budget> = select_as(&store, Table::Budgets, &Query::new().eq("owner_id", "o1"))
        .await
        .unwrap();
    assert_eq!(budgets.len(), 1);
    assert_eq!(budgets[0].category, BudgetCategory::Groceries);
    assert_eq!(budgets[0].spent, 320.0);
    assert!(dir.path().join("budgets.json").exists());
}

#[tokio::test]
async fn unknown_category_in_file_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).await.unwrap();
    store
        .insert(
            Table::Budgets,
            json!({
                "owner_id": "o1", "title": "Boat", "amount": 5, "spent": 0,
                "category": "boats", "period": "monthly"
            }),
        )
        .await
        .unwrap();

    let r: Result<Vec<Budget>, _> = select_as(&store, Table::Budgets, &Query::new()).await;
    assert!(matches!(r, Err(StoreError::Decode { table: Table::Budgets, .. })));
}

#[tokio::test]
async fn delete_then_select_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).await.unwrap();
    let row = store.insert(Table::Tasks, json!({"owner_id": "o1"})).await.unwrap();
    store.delete(Table::Tasks, row["id"].as_str().unwrap()).await.unwrap();
    assert!(store.select(Table::Tasks, &Query::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn subscription_sees_only_its_owner_and_table() {
    let store = MemoryStore::new();
    let mut sub = store.subscribe(Table::Notifications, "o1");

    store
        .insert(Table::Notifications, json!({"owner_id": "o2", "message": "not mine"}))
        .await
        .unwrap();
    store.insert(Table::Tasks, json!({"owner_id": "o1", "title": "wrong table"})).await.unwrap();
    let mine = store
        .insert(Table::Notifications, json!({"owner_id": "o1", "message": "hello"}))
        .await
        .unwrap();
    store
        .update(Table::Notifications, mine["id"].as_str().unwrap(), json!({"read": true}))
        .await
        .unwrap();

    let first = tokio::time::timeout(Duration::from_secs(1), sub.next()).await.unwrap().unwrap();
    assert_eq!(first.kind, ChangeKind::Insert);
    assert_eq!(first.row["message"], json!("hello"));

    let second = tokio::time::timeout(Duration::from_secs(1), sub.next()).await.unwrap().unwrap();
    assert_eq!(second.kind, ChangeKind::Update);
    assert_eq!(second.row["read"], json!(true));
}
