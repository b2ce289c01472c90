//! Stock derivation: buckets are recomputed from the full movement history on
//! every read, never carried as a running balance.

use serde::{Deserialize, Serialize};

use super::{Bucket, Movement};

/// Unclamped signed bucket sums, the audit view.
///
/// A negative bucket here means the recorded history is inconsistent, usually
/// out-of-order data entry or a missing opening balance. The display view
/// clamps it away; this one keeps it visible.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawStock {
    pub rm: f64,
    pub wip: f64,
    pub fg: f64,
    pub reject: f64,
}

impl RawStock {
    pub fn get(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::Rm => self.rm,
            Bucket::Wip => self.wip,
            Bucket::Fg => self.fg,
            Bucket::Reject => self.reject,
        }
    }

    fn add(&mut self, bucket: Bucket, qty: f64) {
        match bucket {
            Bucket::Rm => self.rm += qty,
            Bucket::Wip => self.wip += qty,
            Bucket::Fg => self.fg += qty,
            Bucket::Reject => self.reject += qty,
        }
    }

    /// Whether any bucket went below zero before clamping.
    pub fn has_negative(&self) -> bool {
        Bucket::ALL.into_iter().any(|b| self.get(b) < 0.0)
    }

    /// The display view: every bucket clamped to zero.
    pub fn clamped(&self) -> StockLevels {
        StockLevels {
            rm: self.rm.max(0.0),
            wip: self.wip.max(0.0),
            fg: self.fg.max(0.0),
            reject: self.reject.max(0.0),
        }
    }
}

/// Clamped, non-negative bucket quantities as shown on the screens.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockLevels {
    pub rm: f64,
    pub wip: f64,
    pub fg: f64,
    pub reject: f64,
}

impl StockLevels {
    pub fn get(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::Rm => self.rm,
            Bucket::Wip => self.wip,
            Bucket::Fg => self.fg,
            Bucket::Reject => self.reject,
        }
    }

    /// Total stock across all four buckets.
    pub fn total(&self) -> f64 {
        self.rm + self.wip + self.fg + self.reject
    }
}

/// Folds the bucket-transition table over a set of movements.
///
/// Pure and order-independent: the result depends only on the multiset of
/// movements, so re-running it against an unchanged ledger always yields the
/// same buckets.
pub fn derive<'a>(movements: impl IntoIterator<Item = &'a Movement>) -> RawStock {
    let mut stock = RawStock::default();
    for movement in movements {
        for &(bucket, sign) in movement.movement_type.effects() {
            stock.add(bucket, sign * movement.qty);
        }
    }
    stock
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MovementType, TIMESTAMP_FORMAT};
    use chrono::NaiveDate;

    fn movement(movement_type: MovementType, qty: f64) -> Movement {
        Movement {
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            item: "A001".into(),
            movement_type,
            qty,
            rate: 0.0,
            value: 0.0,
            supplier: String::new(),
            ref_no: String::new(),
            remarks: String::new(),
            user: "system".into(),
            timestamp: chrono::NaiveDateTime::parse_from_str(
                "2025-06-01 08:00:00.000000",
                TIMESTAMP_FORMAT,
            )
            .unwrap()
            .and_utc(),
        }
    }

    #[test]
    fn issue_shifts_rm_into_wip() {
        let history = vec![
            movement(MovementType::Opening, 100.0),
            movement(MovementType::Issue, 40.0),
        ];
        let stock = derive(&history).clamped();
        assert_eq!(stock.rm, 60.0);
        assert_eq!(stock.wip, 40.0);
        assert_eq!(stock.total(), 100.0);
    }

    #[test]
    fn returns_drain_wip() {
        let history = vec![
            movement(MovementType::Issue, 50.0),
            movement(MovementType::ReturnFg, 30.0),
            movement(MovementType::ReturnReject, 5.0),
        ];
        let raw = derive(&history);
        assert_eq!(raw.wip, 15.0);
        assert_eq!(raw.fg, 30.0);
        assert_eq!(raw.reject, 5.0);
        assert_eq!(raw.rm, -50.0);
    }

    #[test]
    fn negative_bucket_is_clamped_but_kept_raw() {
        let history = vec![movement(MovementType::OutwardFg, 10.0)];
        let raw = derive(&history);
        assert_eq!(raw.fg, -10.0);
        assert!(raw.has_negative());
        assert_eq!(raw.clamped().fg, 0.0);
    }

    #[test]
    fn adjustments_touch_one_bucket_only() {
        let history = vec![
            movement(MovementType::AdjWip, 7.0),
            movement(MovementType::AdjReject, 2.0),
        ];
        let raw = derive(&history);
        assert_eq!(raw, RawStock { rm: 0.0, wip: 7.0, fg: 0.0, reject: 2.0 });
    }

    #[test]
    fn derivation_ignores_order() {
        let mut history = vec![
            movement(MovementType::Opening, 20.0),
            movement(MovementType::Issue, 15.0),
            movement(MovementType::ReturnFg, 10.0),
            movement(MovementType::OutwardFg, 5.0),
        ];
        let forward = derive(&history);
        history.reverse();
        assert_eq!(derive(&history), forward);
    }
}
