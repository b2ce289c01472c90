use tracing::{debug, info};

use crate::core::LEDGER_COLUMNS;
use crate::core::utils::hash_row;
use crate::storage::{StorageError, TabularStore};

/// Recomputes hashes for all ledger rows and returns the zero-based indices
/// of rows whose stored hash does not match the computed value.
///
/// Rows without a trailing hash column (hand-added, or written before hashing
/// was enabled) are reported as mismatched; a hand-added header row is
/// skipped.
pub fn verify_table<S: TabularStore>(
    store: &S,
    table_id: &str,
    signature: &str,
) -> Result<Vec<usize>, StorageError> {
    let rows = store.list_rows(table_id)?;
    info!(table_id, row_count = rows.len(), "Verifying ledger table");
    let mut mismatched = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        if row.first().map(|c| c.as_str()) == Some("Date") {
            continue;
        }
        if row.len() <= LEDGER_COLUMNS.len() {
            debug!(index = idx, "Row carries no hash column");
            mismatched.push(idx);
            continue;
        }
        if let Some(stored_hash) = row.last() {
            let computed = hash_row(&row[..row.len() - 1], signature);
            if &computed != stored_hash {
                debug!(index = idx, "Row hash mismatch");
                mismatched.push(idx);
            }
        }
    }
    info!(mismatched = mismatched.len(), "Verification complete");
    Ok(mismatched)
}
