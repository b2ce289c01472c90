//! Storage backends for the ledger's flat tables.

pub mod file;
pub mod retry;

pub use file::CsvFileStore;
pub use retry::RetryingStore;

use std::collections::HashMap;

/// Represents errors that can occur when interacting with a tabular store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The requested table does not exist.
    TableNotFound,
    /// The requested row does not exist.
    RowNotFound,
    /// A temporary failure; the operation may succeed if retried.
    Transient(String),
    /// A permanent failure; retrying will not help.
    Permanent(String),
}

impl StorageError {
    /// Returns `true` when the error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::TableNotFound => write!(f, "table not found"),
            StorageError::RowNotFound => write!(f, "row not found"),
            StorageError::Transient(msg) => write!(f, "transient storage error: {msg}"),
            StorageError::Permanent(msg) => write!(f, "permanent storage error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Abstraction over ordered flat tables of string rows.
///
/// The ledger engine only ever appends rows, scans a whole table, or
/// atomically replaces a table's contents; backends must guarantee that a
/// failed `replace_rows` leaves the previous contents intact.
pub trait TabularStore {
    /// Creates a new empty table and returns its identifier.
    fn create_table(&mut self, title: &str) -> Result<String, StorageError>;
    /// Appends a single row to the given table.
    fn append_row(&mut self, table_id: &str, values: Vec<String>) -> Result<(), StorageError>;
    /// Appends several rows in one operation.
    fn append_rows(
        &mut self,
        table_id: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), StorageError> {
        for row in rows {
            self.append_row(table_id, row)?;
        }
        Ok(())
    }
    /// Lists all rows of the table in stored order.
    fn list_rows(&self, table_id: &str) -> Result<Vec<Vec<String>>, StorageError>;
    /// Replaces the table's contents wholesale. Must be all-or-nothing.
    fn replace_rows(
        &mut self,
        table_id: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), StorageError>;
}

/// In-memory store used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    tables: HashMap<String, Vec<Vec<String>>>,
    next_id: usize,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            next_id: 1,
        }
    }
}

impl TabularStore for MemoryStore {
    fn create_table(&mut self, _title: &str) -> Result<String, StorageError> {
        let id = format!("table{}", self.next_id);
        self.next_id += 1;
        self.tables.insert(id.clone(), Vec::new());
        Ok(id)
    }

    fn append_row(&mut self, table_id: &str, values: Vec<String>) -> Result<(), StorageError> {
        match self.tables.get_mut(table_id) {
            Some(rows) => {
                rows.push(values);
                Ok(())
            }
            None => Err(StorageError::TableNotFound),
        }
    }

    fn list_rows(&self, table_id: &str) -> Result<Vec<Vec<String>>, StorageError> {
        match self.tables.get(table_id) {
            Some(rows) => Ok(rows.clone()),
            None => Err(StorageError::TableNotFound),
        }
    }

    fn replace_rows(
        &mut self,
        table_id: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), StorageError> {
        match self.tables.get_mut(table_id) {
            Some(existing) => {
                *existing = rows;
                Ok(())
            }
            None => Err(StorageError::TableNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_list() {
        let mut store = MemoryStore::new();
        let id = store.create_table("ledger").unwrap();
        store.append_row(&id, vec!["a".into()]).unwrap();
        store.append_row(&id, vec!["b".into()]).unwrap();
        let rows = store.list_rows(&id).unwrap();
        assert_eq!(rows, vec![vec!["a".to_string()], vec!["b".to_string()]]);
    }

    #[test]
    fn replace_swaps_contents() {
        let mut store = MemoryStore::new();
        let id = store.create_table("ledger").unwrap();
        store.append_row(&id, vec!["a".into()]).unwrap();
        store.replace_rows(&id, vec![vec!["b".into()]]).unwrap();
        assert_eq!(store.list_rows(&id).unwrap(), vec![vec!["b".to_string()]]);
    }

    #[test]
    fn missing_table_is_reported() {
        let store = MemoryStore::new();
        assert_eq!(
            store.list_rows("nope").unwrap_err(),
            StorageError::TableNotFound
        );
    }
}
