//! Stock valuation from catalog rates.

use serde::{Deserialize, Serialize};

use super::{Item, StockLevels};

/// Markdown applied to the FG rate when valuing work in progress, reflecting
/// partial completion.
pub const WIP_VALUE_FACTOR: f64 = 0.75;

/// Monetary value of each bucket plus the total.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockValue {
    pub rm: f64,
    pub wip: f64,
    pub fg: f64,
    pub reject: f64,
}

impl StockValue {
    pub fn total(&self) -> f64 {
        self.rm + self.wip + self.fg + self.reject
    }
}

/// Values derived stock with the item's catalog rates: RM and Reject at the
/// RM rate, FG at the FG rate, WIP at the discounted FG rate.
pub fn value_of(item: &Item, stock: &StockLevels) -> StockValue {
    let fg_rate = item.effective_fg_rate();
    StockValue {
        rm: stock.rm * item.rm_rate,
        wip: stock.wip * fg_rate * WIP_VALUE_FACTOR,
        fg: stock.fg * fg_rate,
        reject: stock.reject * item.rm_rate,
    }
}
