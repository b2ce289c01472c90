//! CSV importers for the stock-count and item-master sheets.

use std::path::Path;

use csv::Reader;
use serde::Deserialize;

use super::{ImportError, SheetImporter};
use crate::core::{Item, ItemCategory, StockCountRow};

#[derive(Deserialize)]
struct CountRow {
    #[serde(rename = "Item Code")]
    item: String,
    #[serde(rename = "RM Stock", default)]
    rm: f64,
    #[serde(rename = "WIP Stock", default)]
    wip: f64,
    #[serde(rename = "FG Stock", default)]
    fg: f64,
    #[serde(rename = "Reject Stock", default)]
    reject: f64,
    #[serde(rename = "Opening Stock", default)]
    opening: f64,
    #[serde(rename = "Remarks", default)]
    remarks: String,
}

/// Parses a stock-count sheet into [`StockCountRow`]s for
/// [`StoreLedger::bulk_adjust`](crate::core::StoreLedger::bulk_adjust).
///
/// Rows with a blank item code are skipped; missing numeric columns read as
/// zero.
pub struct StockCountImporter;

impl SheetImporter for StockCountImporter {
    type Row = StockCountRow;

    fn parse(path: &Path) -> Result<Vec<StockCountRow>, ImportError> {
        let mut rdr = Reader::from_path(path).map_err(|e| ImportError::Parse(e.to_string()))?;
        let mut rows = Vec::new();
        for result in rdr.deserialize() {
            let row: CountRow = result.map_err(|e| ImportError::Parse(e.to_string()))?;
            if row.item.trim().is_empty() {
                continue;
            }
            rows.push(StockCountRow {
                item: row.item.trim().to_string(),
                rm: row.rm,
                wip: row.wip,
                fg: row.fg,
                reject: row.reject,
                opening: row.opening,
                remarks: row.remarks,
            });
        }
        Ok(rows)
    }
}

#[derive(Deserialize)]
struct MasterRow {
    #[serde(rename = "Item Code")]
    code: String,
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Unit", default)]
    unit: String,
    #[serde(rename = "RM Item Name", default)]
    rm_name: String,
    #[serde(rename = "FG Item Name", default)]
    fg_name: String,
    #[serde(rename = "Min Stock", default)]
    min_stock: f64,
    #[serde(rename = "RM Rate", default)]
    rm_rate: f64,
    #[serde(rename = "FG Rate", default)]
    fg_rate: f64,
}

/// Parses an item-master sheet into catalog [`Item`]s.
pub struct ItemMasterImporter;

impl SheetImporter for ItemMasterImporter {
    type Row = Item;

    fn parse(path: &Path) -> Result<Vec<Item>, ImportError> {
        let mut rdr = Reader::from_path(path).map_err(|e| ImportError::Parse(e.to_string()))?;
        let mut items = Vec::new();
        for result in rdr.deserialize() {
            let row: MasterRow = result.map_err(|e| ImportError::Parse(e.to_string()))?;
            if row.code.trim().is_empty() {
                continue;
            }
            let category: ItemCategory =
                row.category.parse().map_err(ImportError::Parse)?;
            let mut item = Item::new(row.code.trim(), category)
                .with_names(row.rm_name.trim(), row.fg_name.trim())
                .with_rates(row.rm_rate, row.fg_rate)
                .with_min_stock(row.min_stock);
            if !row.unit.trim().is_empty() {
                item.unit = row.unit.trim().to_string();
            }
            items.push(item);
        }
        Ok(items)
    }
}
