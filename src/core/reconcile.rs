//! Reconciliation mapping: which movement corrects which bucket.

use serde::{Deserialize, Serialize};

use super::{Bucket, Item, MovementError, MovementType};

/// Reference put on rows created by single-item reconciliation.
pub const RECON_REF: &str = "RECON";
/// Reference put on the opening-stock reconciliation row.
pub const RECON_OPENING_REF: &str = "RECON_OPENING";

/// What a physical count is reconciled against.
///
/// `Opening` is the special case: it books the whole counted quantity as
/// incoming stock instead of diffing against the derived figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconTarget {
    Rm,
    Wip,
    Fg,
    Reject,
    Opening,
}

impl ReconTarget {
    /// The bucket a diffed reconciliation corrects; `None` for `Opening`.
    pub fn bucket(&self) -> Option<Bucket> {
        match self {
            ReconTarget::Rm => Some(Bucket::Rm),
            ReconTarget::Wip => Some(Bucket::Wip),
            ReconTarget::Fg => Some(Bucket::Fg),
            ReconTarget::Reject => Some(Bucket::Reject),
            ReconTarget::Opening => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconTarget::Rm => "RM",
            ReconTarget::Wip => "WIP",
            ReconTarget::Fg => "FG",
            ReconTarget::Reject => "REJECT",
            ReconTarget::Opening => "OPENING",
        }
    }
}

impl std::fmt::Display for ReconTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReconTarget {
    type Err = MovementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RM" => Ok(ReconTarget::Rm),
            "WIP" => Ok(ReconTarget::Wip),
            "FG" => Ok(ReconTarget::Fg),
            "REJECT" => Ok(ReconTarget::Reject),
            "OPENING" => Ok(ReconTarget::Opening),
            other => Err(MovementError::InvalidRow(format!(
                "unknown reconciliation target: {other}"
            ))),
        }
    }
}

/// Movement booked when the physical count exceeds the system figure.
///
/// A WIP surplus is booked as an ISSUE, which also debits RM; the physical
/// count outranks the derived figure, so the RM side may go raw-negative and
/// is surfaced through the audit view rather than blocked.
pub fn surplus_type(bucket: Bucket) -> MovementType {
    match bucket {
        Bucket::Rm => MovementType::ReturnRm,
        Bucket::Wip => MovementType::Issue,
        Bucket::Fg => MovementType::ReturnFg,
        Bucket::Reject => MovementType::ReturnReject,
    }
}

/// Movement booked when the physical count falls short of the system figure.
pub fn deficit_type(bucket: Bucket) -> MovementType {
    match bucket {
        Bucket::Rm => MovementType::OutwardRm,
        Bucket::Wip => MovementType::OutwardWip,
        Bucket::Fg => MovementType::OutwardFg,
        Bucket::Reject => MovementType::OutwardReject,
    }
}

/// Rate applied to a reconciliation row for the given bucket.
pub fn recon_rate(bucket: Bucket, item: &Item) -> f64 {
    match bucket {
        Bucket::Rm | Bucket::Wip | Bucket::Reject => item.rm_rate,
        Bucket::Fg => item.effective_fg_rate(),
    }
}

/// One row of a bulk stock-count sheet: additive adjustments per bucket,
/// trusted as-is rather than diffed against the derived stock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockCountRow {
    pub item: String,
    pub rm: f64,
    pub wip: f64,
    pub fg: f64,
    pub reject: f64,
    pub opening: f64,
    pub remarks: String,
}

impl StockCountRow {
    /// The (type, quantity, reference, remark-prefix) entries this row
    /// produces, one per non-zero column.
    pub fn adjustments(&self) -> Vec<(MovementType, f64, &'static str, &'static str)> {
        let mut out = Vec::new();
        if self.rm != 0.0 {
            out.push((MovementType::AdjRm, self.rm, "EXCEL_RM", "Sheet Upload RM"));
        }
        if self.wip != 0.0 {
            out.push((MovementType::AdjWip, self.wip, "EXCEL_WIP", "Sheet Upload WIP"));
        }
        if self.fg != 0.0 {
            out.push((MovementType::AdjFg, self.fg, "EXCEL_FG", "Sheet Upload FG"));
        }
        if self.reject != 0.0 {
            out.push((
                MovementType::AdjReject,
                self.reject,
                "EXCEL_REJ",
                "Sheet Upload Reject",
            ));
        }
        if self.opening != 0.0 {
            out.push((
                MovementType::Opening,
                self.opening,
                "EXCEL_OPEN",
                "Sheet Opening",
            ));
        }
        out
    }
}
