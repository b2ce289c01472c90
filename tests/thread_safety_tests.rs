use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;

use stores_ledger::core::{
    Item, ItemCatalog, ItemCategory, LedgerError, ReconTarget, StoreLedger,
};
use stores_ledger::storage::MemoryStore;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

#[test]
fn concurrent_issues_never_overdraw_the_bucket() {
    let catalog = ItemCatalog::from_items([
        Item::new("A001", ItemCategory::ProductionItem).with_rates(10.0, 20.0),
    ]);
    let ledger = StoreLedger::new(MemoryStore::new(), catalog, "stores123").unwrap();
    ledger
        .reconcile("A001", ReconTarget::Opening, 50.0, day(), "")
        .unwrap();

    let ledger = Arc::new(ledger);
    let mut handles = Vec::new();
    for _ in 0..10 {
        let ledger = Arc::clone(&ledger);
        handles.push(thread::spawn(move || {
            ledger.record_issue(day(), "A001", 10.0, "Issued to Production - CNC", "ops", "")
        }));
    }

    let mut ok = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => ok += 1,
            Err(LedgerError::InsufficientStock { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // 50 available, 10 per issue: exactly five pass the guard
    assert_eq!(ok, 5);
    assert_eq!(rejected, 5);
    let stock = ledger.stock("A001").unwrap();
    assert_eq!(stock.rm, 0.0);
    assert_eq!(stock.wip, 50.0);
}

#[test]
fn concurrent_appends_keep_unique_timestamps() {
    let catalog = ItemCatalog::from_items([
        Item::new("A001", ItemCategory::ProductionItem).with_rates(10.0, 20.0),
    ]);
    let ledger = StoreLedger::new(MemoryStore::new(), catalog, "stores123").unwrap();

    let ledger = Arc::new(ledger);
    let mut handles = Vec::new();
    for i in 0..20 {
        let ledger = Arc::clone(&ledger);
        handles.push(thread::spawn(move || {
            ledger
                .record_inward(day(), "A001", 1.0, "Acme", &format!("INV-{i}"), "ops", "")
                .unwrap()
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let mut keys: Vec<_> = ledger
        .movements()
        .iter()
        .map(|m| m.timestamp_key())
        .collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 20);
}
