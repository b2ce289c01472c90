//! Stores dashboard figures, all recomputed from the ledger on every call.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use super::{
    Bucket, ItemCatalog, ItemCategory, Ledger, MovementType, StockLevels, StockValue, stock,
    valuation,
};

/// Days without any movement before an item counts as dead stock; also the
/// window for flagging slow-moving WIP.
pub const STALE_STOCK_DAYS: i64 = 15;

/// Row limit of the high-value and high-rejection rankings.
pub const RANKING_LIMIT: usize = 15;

/// Row limit of the top-consumption ranking.
pub const TOP_CONSUMED_LIMIT: usize = 10;

/// One line of the live inventory screen.
#[derive(Debug, Clone, Serialize)]
pub struct ItemSummary {
    pub item: String,
    pub category: ItemCategory,
    pub unit: String,
    pub stock: StockLevels,
    pub value: StockValue,
    pub min_stock: f64,
    pub low_stock: bool,
    /// Business date of the item's latest movement.
    pub last_movement: Option<NaiveDate>,
}

/// An item ranked by monetary value.
#[derive(Debug, Clone, Serialize)]
pub struct RankedValue {
    pub item: String,
    pub value: f64,
}

/// Month-to-date rejection figure for one item, valued at the RM rate.
#[derive(Debug, Clone, Serialize)]
pub struct RejectionSummary {
    pub item: String,
    pub qty: f64,
    pub value: f64,
}

/// The stores dashboard KPI block.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoresKpis {
    pub inventory_value: f64,
    pub rm_value: f64,
    pub wip_value: f64,
    pub fg_value: f64,
    pub reject_value: f64,
    /// Value of all issues since the first of the month.
    pub month_consumption: f64,
    pub low_stock_count: usize,
    /// Total value of items with no movement in [`STALE_STOCK_DAYS`].
    pub dead_stock_value: f64,
    /// Value of all rejection returns since the first of the month.
    pub month_rejection_value: f64,
    pub category_value: Vec<(ItemCategory, f64)>,
    pub top_consumed: Vec<RankedValue>,
    pub high_value: Vec<RankedValue>,
    /// Items holding WIP with no finished-goods return inside the window.
    pub slow_wip: Vec<String>,
    pub high_rejection: Vec<RejectionSummary>,
    pub dead_stock: Vec<String>,
}

/// Derives one summary line per catalog item, in item-code order.
pub fn item_summaries(catalog: &ItemCatalog, ledger: &Ledger, _today: NaiveDate) -> Vec<ItemSummary> {
    catalog
        .iter()
        .map(|item| {
            let levels = stock::derive(ledger.for_item(&item.code)).clamped();
            let value = valuation::value_of(item, &levels);
            let last_movement = ledger.for_item(&item.code).map(|m| m.date).max();
            ItemSummary {
                item: item.code.clone(),
                category: item.category,
                unit: item.unit.clone(),
                stock: levels,
                value,
                min_stock: item.min_stock,
                low_stock: item.min_stock > 0.0 && levels.rm <= item.min_stock,
                last_movement,
            }
        })
        .collect()
}

/// Computes the dashboard KPI block for the given day.
pub fn kpis(catalog: &ItemCatalog, ledger: &Ledger, today: NaiveDate) -> StoresKpis {
    let summaries = item_summaries(catalog, ledger, today);
    let month_start = today.with_day(1).unwrap_or(today);
    let stale_cutoff = today - Duration::days(STALE_STOCK_DAYS);

    let mut kpis = StoresKpis::default();
    let mut by_category: BTreeMap<&'static str, (ItemCategory, f64)> = BTreeMap::new();
    for summary in &summaries {
        kpis.rm_value += summary.value.rm;
        kpis.wip_value += summary.value.wip;
        kpis.fg_value += summary.value.fg;
        kpis.reject_value += summary.value.reject;
        if summary.low_stock {
            kpis.low_stock_count += 1;
        }
        if let Some(last) = summary.last_movement
            && last < stale_cutoff
        {
            kpis.dead_stock_value += summary.value.total();
            kpis.dead_stock.push(summary.item.clone());
        }
        let entry = by_category
            .entry(summary.category.as_str())
            .or_insert((summary.category, 0.0));
        entry.1 += summary.value.total();
    }
    kpis.inventory_value = kpis.rm_value + kpis.wip_value + kpis.fg_value + kpis.reject_value;
    kpis.category_value = by_category.into_values().collect();
    sort_desc_by(&mut kpis.category_value, |(_, v)| *v);

    // month-to-date consumption, grouped per item for the ranking
    let mut consumed: BTreeMap<String, f64> = BTreeMap::new();
    for m in ledger.movements() {
        if m.movement_type == MovementType::Issue && m.date >= month_start {
            kpis.month_consumption += m.value;
            *consumed.entry(m.item.clone()).or_default() += m.value;
        }
    }
    kpis.top_consumed = consumed
        .into_iter()
        .map(|(item, value)| RankedValue { item, value })
        .collect();
    sort_desc_by(&mut kpis.top_consumed, |r| r.value);
    kpis.top_consumed.truncate(TOP_CONSUMED_LIMIT);

    kpis.high_value = summaries
        .iter()
        .map(|s| RankedValue {
            item: s.item.clone(),
            value: s.value.total(),
        })
        .collect();
    sort_desc_by(&mut kpis.high_value, |r| r.value);
    kpis.high_value.truncate(RANKING_LIMIT);

    // WIP that is not coming back as finished goods
    for summary in &summaries {
        if summary.stock.get(Bucket::Wip) <= 0.0 {
            continue;
        }
        let last_fg = ledger
            .for_item(&summary.item)
            .filter(|m| m.movement_type == MovementType::ReturnFg)
            .map(|m| m.date)
            .max();
        if last_fg.is_none_or(|d| d < stale_cutoff) {
            kpis.slow_wip.push(summary.item.clone());
        }
    }

    // month-to-date rejections at the RM rate
    let mut rejected: BTreeMap<String, f64> = BTreeMap::new();
    for m in ledger.movements() {
        if m.movement_type == MovementType::ReturnReject && m.date >= month_start {
            *rejected.entry(m.item.clone()).or_default() += m.qty;
        }
    }
    kpis.high_rejection = rejected
        .into_iter()
        .map(|(item, qty)| {
            let rate = catalog.get(&item).map(|i| i.rm_rate).unwrap_or(0.0);
            RejectionSummary {
                item,
                qty,
                value: qty * rate,
            }
        })
        .collect();
    kpis.month_rejection_value = kpis.high_rejection.iter().map(|r| r.value).sum();
    sort_desc_by(&mut kpis.high_rejection, |r| r.value);
    kpis.high_rejection.truncate(RANKING_LIMIT);

    kpis
}

fn sort_desc_by<T>(items: &mut [T], key: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| {
        key(b)
            .partial_cmp(&key(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
