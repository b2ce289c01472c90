use std::io::Write;

use chrono::NaiveDate;
use tempfile::tempdir;

use stores_ledger::core::{
    Item, ItemCatalog, ItemCategory, LedgerError, MovementType, StoreLedger,
};
use stores_ledger::import::SheetImporter;
use stores_ledger::import::csv::{ItemMasterImporter, StockCountImporter};
use stores_ledger::storage::MemoryStore;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn stock_count_sheet_feeds_bulk_adjustment() {
    let dir = tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "count.csv",
        "Item Code,RM Stock,WIP Stock,FG Stock,Reject Stock,Opening Stock,Remarks\n\
         A001,5,2,0,0,0,june count\n\
         B002,0,0,3,0,10,\n",
    );
    let rows = StockCountImporter::parse(&path).unwrap();

    let catalog = ItemCatalog::from_items([
        Item::new("A001", ItemCategory::ProductionItem).with_rates(10.0, 20.0),
        Item::new("B002", ItemCategory::Consumables).with_rates(5.0, 0.0),
    ]);
    let ledger = StoreLedger::new(MemoryStore::new(), catalog, "stores123").unwrap();
    let appended = ledger.bulk_adjust(&rows, day()).unwrap();

    // one movement per non-zero column
    let types: Vec<_> = appended.iter().map(|m| m.movement_type).collect();
    assert_eq!(
        types,
        vec![
            MovementType::AdjRm,
            MovementType::AdjWip,
            MovementType::AdjFg,
            MovementType::Opening,
        ]
    );

    // the sheet is trusted as-is, no diffing
    let a = ledger.stock("A001").unwrap();
    assert_eq!(a.rm, 5.0);
    assert_eq!(a.wip, 2.0);
    let b = ledger.stock("B002").unwrap();
    assert_eq!(b.fg, 3.0);
    assert_eq!(b.rm, 10.0);

    // batch rows carry unique timestamp keys
    let mut keys: Vec<_> = appended.iter().map(|m| m.timestamp_key()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 4);
}

#[test]
fn bulk_adjust_rejects_unknown_items_before_any_write() {
    let dir = tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "count.csv",
        "Item Code,RM Stock,WIP Stock,FG Stock,Reject Stock,Opening Stock,Remarks\n\
         ZZZ,5,0,0,0,0,\n",
    );
    let rows = StockCountImporter::parse(&path).unwrap();
    let catalog = ItemCatalog::from_items([
        Item::new("A001", ItemCategory::ProductionItem).with_rates(10.0, 20.0),
    ]);
    let ledger = StoreLedger::new(MemoryStore::new(), catalog, "stores123").unwrap();
    let err = ledger.bulk_adjust(&rows, day()).unwrap_err();
    assert_eq!(err, LedgerError::ItemNotFound("ZZZ".into()));
    assert!(ledger.movements().is_empty());
}

#[test]
fn item_master_sheet_replaces_the_catalog() {
    let dir = tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "items.csv",
        "Item Code,Category,Unit,RM Item Name,FG Item Name,Min Stock,RM Rate,FG Rate\n\
         A001,Production Item,Nos,Casting 40mm,Gear 40mm,50,10,20\n\
         C003,Cutting Tools,Nos,Insert CNMG,,5,120,0\n",
    );
    let items = ItemMasterImporter::parse(&path).unwrap();
    let ledger = StoreLedger::new(MemoryStore::new(), ItemCatalog::new(), "stores123").unwrap();
    ledger.replace_catalog(ItemCatalog::from_items(items));

    let gear = ledger.item("A001").unwrap();
    assert_eq!(gear.fg_name, "Gear 40mm");
    assert_eq!(gear.min_stock, 50.0);
    let insert = ledger.item("C003").unwrap();
    assert_eq!(insert.category, ItemCategory::CuttingTools);
    // FG rate falls back to the RM rate
    assert_eq!(insert.effective_fg_rate(), 120.0);
}
