use chrono::NaiveDate;

use stores_ledger::core::{
    Item, ItemCatalog, ItemCategory, Query, ReconTarget, StoreLedger,
};
use stores_ledger::storage::MemoryStore;

fn service() -> StoreLedger<MemoryStore> {
    let catalog = ItemCatalog::from_items([
        Item::new("A001", ItemCategory::ProductionItem).with_rates(10.0, 20.0),
        Item::new("B002", ItemCategory::Consumables).with_rates(5.0, 0.0),
    ]);
    StoreLedger::new(MemoryStore::new(), catalog, "stores123").unwrap()
}

fn on(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
}

#[test]
fn list_filters_by_item_type_and_window() {
    let ledger = service();
    ledger
        .reconcile("A001", ReconTarget::Opening, 50.0, on(1), "")
        .unwrap();
    ledger
        .record_issue(on(3), "A001", 10.0, "Issued to Production - CNC", "ops", "")
        .unwrap();
    ledger
        .record_issue(on(12), "A001", 5.0, "Issued to Production - VMC", "ops", "")
        .unwrap();
    ledger
        .record_inward(on(3), "B002", 7.0, "Acme", "INV-1", "ops", "")
        .unwrap();

    let q: Query = "item:A001 type:issue".parse().unwrap();
    assert_eq!(ledger.query(&q).len(), 2);

    let q: Query = "item:A001 type:issue date:2025-06-01..2025-06-05".parse().unwrap();
    let hits = ledger.query(&q);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].qty, 10.0);

    let q: Query = "start:2025-06-10".parse().unwrap();
    assert_eq!(ledger.query(&q).len(), 1);
}

#[test]
fn empty_query_matches_everything() {
    let ledger = service();
    ledger
        .record_inward(on(3), "B002", 7.0, "Acme", "INV-1", "ops", "")
        .unwrap();
    let q: Query = "".parse().unwrap();
    assert_eq!(ledger.query(&q).len(), ledger.movements().len());
}
