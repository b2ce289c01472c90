//! Core logic for the append-only stores ledger.

pub mod catalog;
pub mod query;
pub mod reconcile;
pub mod report;
pub mod service;
pub mod stock;
pub mod utils;
pub mod valuation;
pub mod verification;

pub use catalog::{CatalogError, Item, ItemCatalog, ItemCategory};
pub use query::Query;
pub use reconcile::{ReconTarget, StockCountRow};
pub use report::{ItemSummary, StoresKpis};
pub use service::{OutwardKind, ReturnKind, StoreLedger};
pub use stock::{RawStock, StockLevels};
pub use valuation::{StockValue, WIP_VALUE_FACTOR};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::StorageError;

/// Column layout of the persisted ledger table, in stored order. Rows written
/// by the engine carry a trailing integrity hash as a twelfth column.
pub const LEDGER_COLUMNS: [&str; 11] = [
    "Date",
    "Item",
    "Inward_Type",
    "Qty",
    "Rate",
    "Value",
    "Supplier",
    "Ref_No",
    "Remarks",
    "User",
    "Timestamp",
];

/// Wire format of the row timestamp. Microsecond precision keeps keys unique
/// when a batch operation generates several rows back to back.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Wire format of the business date column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Tolerance used when comparing derived quantities.
pub const QTY_EPSILON: f64 = 1e-9;

/// One of the four derived stock buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bucket {
    Rm,
    Wip,
    Fg,
    Reject,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [Bucket::Rm, Bucket::Wip, Bucket::Fg, Bucket::Reject];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Rm => "RM",
            Bucket::Wip => "WIP",
            Bucket::Fg => "FG",
            Bucket::Reject => "REJECT",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Bucket {
    type Err = MovementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RM" => Ok(Bucket::Rm),
            "WIP" => Ok(Bucket::Wip),
            "FG" => Ok(Bucket::Fg),
            "REJECT" => Ok(Bucket::Reject),
            other => Err(MovementError::InvalidRow(format!("unknown bucket: {other}"))),
        }
    }
}

/// The closed set of ledger movement types.
///
/// Every variant contributes to the stock buckets through [`MovementType::effects`],
/// the single transition table all derivation is driven by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Inward,
    Issue,
    ReturnRm,
    ReturnFg,
    ReturnReject,
    OutwardRm,
    OutwardWip,
    OutwardFg,
    OutwardReject,
    AdjRm,
    AdjWip,
    AdjFg,
    AdjReject,
    Opening,
}

impl MovementType {
    pub const ALL: [MovementType; 14] = [
        MovementType::Inward,
        MovementType::Issue,
        MovementType::ReturnRm,
        MovementType::ReturnFg,
        MovementType::ReturnReject,
        MovementType::OutwardRm,
        MovementType::OutwardWip,
        MovementType::OutwardFg,
        MovementType::OutwardReject,
        MovementType::AdjRm,
        MovementType::AdjWip,
        MovementType::AdjFg,
        MovementType::AdjReject,
        MovementType::Opening,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Inward => "INWARD",
            MovementType::Issue => "ISSUE",
            MovementType::ReturnRm => "RETURN_RM",
            MovementType::ReturnFg => "RETURN_FG",
            MovementType::ReturnReject => "RETURN_REJECT",
            MovementType::OutwardRm => "OUTWARD_RM",
            MovementType::OutwardWip => "OUTWARD_WIP",
            MovementType::OutwardFg => "OUTWARD_FG",
            MovementType::OutwardReject => "OUTWARD_REJECT",
            MovementType::AdjRm => "ADJ_RM",
            MovementType::AdjWip => "ADJ_WIP",
            MovementType::AdjFg => "ADJ_FG",
            MovementType::AdjReject => "ADJ_REJECT",
            MovementType::Opening => "OPENING",
        }
    }

    /// Signed bucket contributions of one unit of this movement.
    ///
    /// ISSUE is the only two-sided transition: it moves material from RM into
    /// WIP in a single row. Returns drain WIP into FG or Reject, OUTWARD_*
    /// drains a bucket to the outside world, and ADJ_*/OPENING correct a
    /// bucket directly without a paired transition.
    pub fn effects(&self) -> &'static [(Bucket, f64)] {
        match self {
            MovementType::Inward
            | MovementType::ReturnRm
            | MovementType::AdjRm
            | MovementType::Opening => &[(Bucket::Rm, 1.0)],
            MovementType::Issue => &[(Bucket::Rm, -1.0), (Bucket::Wip, 1.0)],
            MovementType::OutwardRm => &[(Bucket::Rm, -1.0)],
            MovementType::ReturnFg => &[(Bucket::Wip, -1.0), (Bucket::Fg, 1.0)],
            MovementType::ReturnReject => &[(Bucket::Wip, -1.0), (Bucket::Reject, 1.0)],
            MovementType::OutwardWip => &[(Bucket::Wip, -1.0)],
            MovementType::AdjWip => &[(Bucket::Wip, 1.0)],
            MovementType::OutwardFg => &[(Bucket::Fg, -1.0)],
            MovementType::AdjFg => &[(Bucket::Fg, 1.0)],
            MovementType::OutwardReject => &[(Bucket::Reject, -1.0)],
            MovementType::AdjReject => &[(Bucket::Reject, 1.0)],
        }
    }

    /// The bucket this movement draws down, if any.
    pub fn drains(&self) -> Option<Bucket> {
        self.effects()
            .iter()
            .find(|(_, sign)| *sign < 0.0)
            .map(|(bucket, _)| *bucket)
    }

    /// Whether appends of this type must pass the stock availability guard.
    ///
    /// Only issues and outward movements are guarded; returns may precede the
    /// matching issue in the data-entry order and are accepted as-is.
    pub fn is_guarded(&self) -> bool {
        matches!(
            self,
            MovementType::Issue
                | MovementType::OutwardRm
                | MovementType::OutwardWip
                | MovementType::OutwardFg
                | MovementType::OutwardReject
        )
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MovementType {
    type Err = MovementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_uppercase();
        MovementType::ALL
            .into_iter()
            .find(|t| t.as_str() == norm)
            .ok_or_else(|| MovementError::InvalidRow(format!("unknown movement type: {s}")))
    }
}

/// Errors raised while constructing or parsing a [`Movement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovementError {
    /// The item code is missing.
    MissingItem,
    /// The quantity is zero or negative.
    NonPositiveQty,
    /// A persisted row could not be parsed back into a movement.
    InvalidRow(String),
}

impl std::fmt::Display for MovementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementError::MissingItem => write!(f, "item code is required"),
            MovementError::NonPositiveQty => write!(f, "quantity must be positive"),
            MovementError::InvalidRow(msg) => write!(f, "invalid ledger row: {msg}"),
        }
    }
}

impl std::error::Error for MovementError {}

/// A movement as submitted by an entry screen, before the service fills in
/// the rate, value and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementDraft {
    pub date: NaiveDate,
    pub item: String,
    pub movement_type: MovementType,
    pub qty: f64,
    pub rate: Option<f64>,
    pub supplier: String,
    pub ref_no: String,
    pub remarks: String,
    pub user: String,
}

impl MovementDraft {
    pub fn new(
        date: NaiveDate,
        item: impl Into<String>,
        movement_type: MovementType,
        qty: f64,
    ) -> Self {
        Self {
            date,
            item: item.into(),
            movement_type,
            qty,
            rate: None,
            supplier: String::new(),
            ref_no: String::new(),
            remarks: String::new(),
            user: "system".into(),
        }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = supplier.into();
        self
    }

    pub fn with_ref_no(mut self, ref_no: impl Into<String>) -> Self {
        self.ref_no = ref_no.into();
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Checks the required fields are present before any write happens.
    pub fn validate(&self) -> Result<(), MovementError> {
        if self.item.trim().is_empty() {
            return Err(MovementError::MissingItem);
        }
        if self.qty <= 0.0 {
            return Err(MovementError::NonPositiveQty);
        }
        Ok(())
    }
}

/// One immutable row of the stores ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Business date of the movement.
    pub date: NaiveDate,
    /// Item code the movement applies to.
    pub item: String,
    /// Typed direction of the movement.
    pub movement_type: MovementType,
    /// Magnitude, always stored positive; direction is implied by the type.
    pub qty: f64,
    /// Unit rate applied when the row was written.
    pub rate: f64,
    /// Monetary value, `qty * rate`.
    pub value: f64,
    /// Supplier or party, where applicable.
    pub supplier: String,
    /// Invoice / outward / reconciliation reference.
    pub ref_no: String,
    /// Free-text remarks.
    pub remarks: String,
    /// Actor recorded on the row.
    pub user: String,
    /// Creation instant; unique per row and used as the row's identity key.
    pub timestamp: DateTime<Utc>,
}

impl Movement {
    /// The wire form of the row's identity key.
    pub fn timestamp_key(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Serializes the movement to its stored row, in [`LEDGER_COLUMNS`] order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.format(DATE_FORMAT).to_string(),
            self.item.clone(),
            self.movement_type.as_str().to_string(),
            self.qty.to_string(),
            self.rate.to_string(),
            self.value.to_string(),
            self.supplier.clone(),
            self.ref_no.clone(),
            self.remarks.clone(),
            self.user.clone(),
            self.timestamp_key(),
        ]
    }

    /// Parses a stored row back into a movement. Trailing columns (such as
    /// the integrity hash) are ignored.
    pub fn from_row(row: &[String]) -> Result<Self, MovementError> {
        if row.len() < 11 {
            return Err(MovementError::InvalidRow(format!(
                "expected {} columns, got {}",
                LEDGER_COLUMNS.len(),
                row.len()
            )));
        }
        let date = NaiveDate::parse_from_str(&row[0], DATE_FORMAT)
            .map_err(|e| MovementError::InvalidRow(format!("bad date {:?}: {e}", row[0])))?;
        let movement_type: MovementType = row[2].parse()?;
        let qty: f64 = row[3]
            .parse()
            .map_err(|e| MovementError::InvalidRow(format!("bad qty {:?}: {e}", row[3])))?;
        let rate: f64 = row[4]
            .parse()
            .map_err(|e| MovementError::InvalidRow(format!("bad rate {:?}: {e}", row[4])))?;
        let value: f64 = row[5]
            .parse()
            .map_err(|e| MovementError::InvalidRow(format!("bad value {:?}: {e}", row[5])))?;
        let timestamp = NaiveDateTime::parse_from_str(&row[10], TIMESTAMP_FORMAT)
            .map_err(|e| MovementError::InvalidRow(format!("bad timestamp {:?}: {e}", row[10])))?
            .and_utc();
        Ok(Self {
            date,
            item: row[1].clone(),
            movement_type,
            qty,
            rate,
            value,
            supplier: row[6].clone(),
            ref_no: row[7].clone(),
            remarks: row[8].clone(),
            user: row[9].clone(),
            timestamp,
        })
    }

    /// Serializes the movement to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a movement from a JSON string.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

/// Errors surfaced by the ledger service.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// A required field was missing or invalid; nothing was written.
    Validation(MovementError),
    /// The movement references an item code absent from the catalog.
    ItemNotFound(String),
    /// An issue or outward exceeds the available bucket quantity.
    InsufficientStock {
        bucket: Bucket,
        requested: f64,
        available: f64,
    },
    /// A reconciliation would drive a bucket below zero.
    NegativeStock {
        bucket: Bucket,
        physical: f64,
        system: f64,
    },
    /// The admin code did not match.
    Unauthorized,
    /// No row carries the given timestamp key.
    NotFound(String),
    /// The storage backend failed; prior durable state is unchanged.
    Storage(StorageError),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::Validation(e) => write!(f, "validation failed: {e}"),
            LedgerError::ItemNotFound(code) => write!(f, "item not found: {code}"),
            LedgerError::InsufficientStock {
                bucket,
                requested,
                available,
            } => write!(
                f,
                "insufficient {bucket} stock: requested {requested}, available {available}"
            ),
            LedgerError::NegativeStock {
                bucket,
                physical,
                system,
            } => write!(
                f,
                "cannot reconcile {bucket}: physical {physical} against system {system} would go negative"
            ),
            LedgerError::Unauthorized => write!(f, "admin code mismatch"),
            LedgerError::NotFound(key) => write!(f, "no ledger row with timestamp {key}"),
            LedgerError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerError::Validation(e) => Some(e),
            LedgerError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MovementError> for LedgerError {
    fn from(e: MovementError) -> Self {
        LedgerError::Validation(e)
    }
}

impl From<StorageError> for LedgerError {
    fn from(e: StorageError) -> Self {
        LedgerError::Storage(e)
    }
}

impl From<CatalogError> for LedgerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::ItemNotFound(code) => LedgerError::ItemNotFound(code),
        }
    }
}

/// In-memory append-only collection of movements, mirroring the durable table.
#[derive(Default)]
pub struct Ledger {
    movements: Vec<Movement>,
}

impl Ledger {
    /// Appends a movement to the ledger.
    pub fn append(&mut self, movement: Movement) {
        self.movements.push(movement);
    }

    /// Returns an iterator over all movements in append order.
    pub fn movements(&self) -> impl Iterator<Item = &Movement> {
        self.movements.iter()
    }

    /// Returns an iterator over the movements of one item.
    pub fn for_item<'a>(&'a self, item: &'a str) -> impl Iterator<Item = &'a Movement> {
        self.movements.iter().filter(move |m| m.item == item)
    }

    /// Number of movements held.
    pub fn len(&self) -> usize {
        self.movements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    /// Index of the movement carrying the given timestamp key.
    pub fn position_of(&self, timestamp_key: &str) -> Option<usize> {
        self.movements
            .iter()
            .position(|m| m.timestamp_key() == timestamp_key)
    }

    /// Removes and returns the movement at `index`.
    pub fn remove_at(&mut self, index: usize) -> Movement {
        self.movements.remove(index)
    }
}
