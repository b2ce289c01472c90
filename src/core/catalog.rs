//! Item master reference data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stores item categories, as maintained on the item master screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    #[serde(rename = "Production Item")]
    ProductionItem,
    #[serde(rename = "Bought Out Items")]
    BoughtOut,
    #[serde(rename = "Packing Material")]
    PackingMaterial,
    #[serde(rename = "Consumables")]
    Consumables,
    #[serde(rename = "Cutting Tools")]
    CuttingTools,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 5] = [
        ItemCategory::ProductionItem,
        ItemCategory::BoughtOut,
        ItemCategory::PackingMaterial,
        ItemCategory::Consumables,
        ItemCategory::CuttingTools,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::ProductionItem => "Production Item",
            ItemCategory::BoughtOut => "Bought Out Items",
            ItemCategory::PackingMaterial => "Packing Material",
            ItemCategory::Consumables => "Consumables",
            ItemCategory::CuttingTools => "Cutting Tools",
        }
    }
}

impl std::fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        ItemCategory::ALL
            .into_iter()
            .find(|c| c.as_str().to_ascii_lowercase() == norm)
            .ok_or_else(|| format!("unknown item category: {s}"))
    }
}

/// One item master entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item code.
    pub code: String,
    pub category: ItemCategory,
    /// Unit of measure (Nos, Kg, ...).
    pub unit: String,
    /// Raw-material side description.
    pub rm_name: String,
    /// Finished-goods side description.
    pub fg_name: String,
    /// Minimum stock threshold; zero disables the low-stock flag.
    pub min_stock: f64,
    /// Raw-material unit rate.
    pub rm_rate: f64,
    /// Finished-goods unit rate; zero means "use the RM rate".
    pub fg_rate: f64,
}

impl Item {
    pub fn new(code: impl Into<String>, category: ItemCategory) -> Self {
        Self {
            code: code.into(),
            category,
            unit: "Nos".into(),
            rm_name: String::new(),
            fg_name: String::new(),
            min_stock: 0.0,
            rm_rate: 0.0,
            fg_rate: 0.0,
        }
    }

    pub fn with_rates(mut self, rm_rate: f64, fg_rate: f64) -> Self {
        self.rm_rate = rm_rate;
        self.fg_rate = fg_rate;
        self
    }

    pub fn with_min_stock(mut self, min_stock: f64) -> Self {
        self.min_stock = min_stock;
        self
    }

    pub fn with_names(
        mut self,
        rm_name: impl Into<String>,
        fg_name: impl Into<String>,
    ) -> Self {
        self.rm_name = rm_name.into();
        self.fg_name = fg_name.into();
        self
    }

    /// FG rate with the fallback to the RM rate when unset.
    pub fn effective_fg_rate(&self) -> f64 {
        if self.fg_rate > 0.0 {
            self.fg_rate
        } else {
            self.rm_rate
        }
    }

    /// Dropdown label, `CODE — NAME`.
    pub fn label(&self) -> String {
        if self.rm_name.is_empty() {
            format!("{} — {}", self.code, self.category)
        } else {
            format!("{} — {}", self.code, self.rm_name)
        }
    }
}

/// Errors raised by catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No item carries the given code.
    ItemNotFound(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::ItemNotFound(code) => write!(f, "item not found: {code}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// The item master, keyed by item code.
#[derive(Debug, Default, Clone)]
pub struct ItemCatalog {
    items: BTreeMap<String, Item>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a list of items; later duplicates win.
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut catalog = Self::default();
        for item in items {
            catalog.upsert(item);
        }
        catalog
    }

    /// Looks up an item, failing when the code is unknown.
    pub fn get(&self, code: &str) -> Result<&Item, CatalogError> {
        self.items
            .get(code.trim())
            .ok_or_else(|| CatalogError::ItemNotFound(code.trim().to_string()))
    }

    /// Inserts or replaces an item; returns the previous entry, if any.
    pub fn upsert(&mut self, item: Item) -> Option<Item> {
        self.items.insert(item.code.trim().to_string(), item)
    }

    /// Removes an item by code.
    pub fn remove(&mut self, code: &str) -> Option<Item> {
        self.items.remove(code.trim())
    }

    /// All items in item-code order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// All item codes in order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(|s| s.as_str())
    }

    /// Items offered on the inward screen. Every category may be received.
    pub fn inward_items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Items offered on the issue screen: production items only.
    pub fn issue_items(&self) -> impl Iterator<Item = &Item> {
        self.items
            .values()
            .filter(|i| i.category == ItemCategory::ProductionItem)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_round_trip() {
        for c in ItemCategory::ALL {
            assert_eq!(c.as_str().parse::<ItemCategory>().unwrap(), c);
        }
        assert!("Raw Stuff".parse::<ItemCategory>().is_err());
    }

    #[test]
    fn fg_rate_falls_back_to_rm_rate() {
        let item = Item::new("A001", ItemCategory::ProductionItem).with_rates(12.5, 0.0);
        assert_eq!(item.effective_fg_rate(), 12.5);
        let item = Item::new("A001", ItemCategory::ProductionItem).with_rates(12.5, 30.0);
        assert_eq!(item.effective_fg_rate(), 30.0);
    }

    #[test]
    fn lookup_fails_for_unknown_code() {
        let catalog = ItemCatalog::from_items([Item::new("A001", ItemCategory::ProductionItem)]);
        assert!(catalog.get("A001").is_ok());
        assert_eq!(
            catalog.get("B002").unwrap_err(),
            CatalogError::ItemNotFound("B002".into())
        );
    }

    #[test]
    fn issue_listing_is_production_items_only() {
        let catalog = ItemCatalog::from_items([
            Item::new("A001", ItemCategory::ProductionItem),
            Item::new("C003", ItemCategory::CuttingTools),
        ]);
        let issue: Vec<_> = catalog.issue_items().map(|i| i.code.as_str()).collect();
        assert_eq!(issue, vec!["A001"]);
        assert_eq!(catalog.inward_items().count(), 2);
    }

    #[test]
    fn codes_come_back_sorted() {
        let catalog = ItemCatalog::from_items([
            Item::new("B002", ItemCategory::Consumables),
            Item::new("A001", ItemCategory::ProductionItem),
        ]);
        let codes: Vec<_> = catalog.codes().collect();
        assert_eq!(codes, vec!["A001", "B002"]);
    }
}
