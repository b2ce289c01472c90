use chrono::NaiveDate;
use tempfile::tempdir;

use stores_ledger::core::{
    Item, ItemCatalog, ItemCategory, ReconTarget, ReturnKind, StoreLedger,
};
use stores_ledger::storage::{CsvFileStore, StorageError, TabularStore};

fn catalog() -> ItemCatalog {
    ItemCatalog::from_items([
        Item::new("A001", ItemCategory::ProductionItem).with_rates(10.0, 20.0),
    ])
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

#[test]
fn reload_from_disk_reproduces_derived_stock() {
    let dir = tempdir().unwrap();
    let ledger =
        StoreLedger::new(CsvFileStore::new(dir.path()), catalog(), "stores123").unwrap();
    ledger
        .reconcile("A001", ReconTarget::Opening, 100.0, day(), "")
        .unwrap();
    ledger
        .record_issue(day(), "A001", 40.0, "Issued to Production - CNC", "ops", "")
        .unwrap();
    ledger
        .record_return(day(), "A001", 30.0, ReturnKind::FinishedGoods, "ops", "")
        .unwrap();
    let expected = ledger.stock("A001").unwrap();
    let (_, table) = ledger.into_parts();

    let reloaded = StoreLedger::from_table(
        CsvFileStore::new(dir.path()),
        &table,
        catalog(),
        "stores123",
    )
    .unwrap();
    assert_eq!(reloaded.stock("A001").unwrap(), expected);
}

#[test]
fn removal_is_persisted_by_the_rewrite() {
    let dir = tempdir().unwrap();
    let ledger =
        StoreLedger::new(CsvFileStore::new(dir.path()), catalog(), "stores123").unwrap();
    ledger
        .reconcile("A001", ReconTarget::Opening, 10.0, day(), "")
        .unwrap();
    let m = ledger
        .record_issue(day(), "A001", 4.0, "Issued to Production - CNC", "ops", "")
        .unwrap();
    ledger.remove(&m.timestamp_key(), "stores123").unwrap();
    let (_, table) = ledger.into_parts();

    let reloaded = StoreLedger::from_table(
        CsvFileStore::new(dir.path()),
        &table,
        catalog(),
        "stores123",
    )
    .unwrap();
    assert_eq!(reloaded.movements().len(), 1);
    assert_eq!(reloaded.stock("A001").unwrap().rm, 10.0);
}

#[test]
fn rows_survive_a_failed_replace() {
    let dir = tempdir().unwrap();
    let mut store = CsvFileStore::new(dir.path());
    let id = store.create_table("ledger").unwrap();
    store
        .append_row(&id, vec!["a".into(), "b".into()])
        .unwrap();
    // replacing a table that was never created must not touch the original
    let err = store.replace_rows("missing", vec![]).unwrap_err();
    assert_eq!(err, StorageError::TableNotFound);
    assert_eq!(store.list_rows(&id).unwrap().len(), 1);
}

#[test]
fn append_to_a_missing_table_fails() {
    let dir = tempdir().unwrap();
    let mut store = CsvFileStore::new(dir.path());
    let err = store.append_row("missing", vec!["a".into()]).unwrap_err();
    assert_eq!(err, StorageError::TableNotFound);
}

#[test]
fn quoted_cells_round_trip() {
    let dir = tempdir().unwrap();
    let mut store = CsvFileStore::new(dir.path());
    let id = store.create_table("ledger").unwrap();
    let row = vec![
        "2025-06-02".to_string(),
        "A001".to_string(),
        "note, with comma and \"quotes\"".to_string(),
    ];
    store.append_row(&id, row.clone()).unwrap();
    assert_eq!(store.list_rows(&id).unwrap(), vec![row]);
}
