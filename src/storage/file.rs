use std::path::PathBuf;

use csv::{ReaderBuilder, WriterBuilder};

use super::{StorageError, TabularStore};

/// Store that keeps each table in a local CSV file.
///
/// `replace_rows` writes a sibling temp file and renames it over the
/// original, so an interrupted rewrite never corrupts the previous contents.
pub struct CsvFileStore {
    base_dir: PathBuf,
}

impl CsvFileStore {
    /// Create a new store rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn table_path(&self, id: &str) -> PathBuf {
        self.base_dir.join(format!("{id}.csv"))
    }

    fn table_id(title: &str) -> String {
        title
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    fn write_all(&self, path: &PathBuf, rows: &[Vec<String>]) -> Result<(), StorageError> {
        let file =
            std::fs::File::create(path).map_err(|e| StorageError::Transient(e.to_string()))?;
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
        for row in rows {
            wtr.write_record(row)
                .map_err(|e| StorageError::Transient(e.to_string()))?;
        }
        wtr.flush()
            .map_err(|e| StorageError::Transient(e.to_string()))
    }
}

impl TabularStore for CsvFileStore {
    fn create_table(&mut self, title: &str) -> Result<String, StorageError> {
        let id = Self::table_id(title);
        if let Some(parent) = self.table_path(&id).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Permanent(e.to_string()))?;
        }
        std::fs::File::create(self.table_path(&id))
            .map_err(|e| StorageError::Permanent(e.to_string()))?;
        Ok(id)
    }

    fn append_row(&mut self, table_id: &str, values: Vec<String>) -> Result<(), StorageError> {
        self.append_rows(table_id, vec![values])
    }

    fn append_rows(
        &mut self,
        table_id: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), StorageError> {
        let path = self.table_path(table_id);
        if !path.exists() {
            return Err(StorageError::TableNotFound);
        }
        let file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::Transient(e.to_string()))?;
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
        for row in rows {
            wtr.write_record(row)
                .map_err(|e| StorageError::Transient(e.to_string()))?;
        }
        wtr.flush()
            .map_err(|e| StorageError::Transient(e.to_string()))
    }

    fn list_rows(&self, table_id: &str) -> Result<Vec<Vec<String>>, StorageError> {
        let path = self.table_path(table_id);
        if !path.exists() {
            return Err(StorageError::TableNotFound);
        }
        let file =
            std::fs::File::open(&path).map_err(|e| StorageError::Transient(e.to_string()))?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);
        let mut rows = Vec::new();
        for record in rdr.records() {
            let rec = record.map_err(|e| StorageError::Transient(e.to_string()))?;
            rows.push(rec.iter().map(|s| s.to_string()).collect());
        }
        Ok(rows)
    }

    fn replace_rows(
        &mut self,
        table_id: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), StorageError> {
        let path = self.table_path(table_id);
        if !path.exists() {
            return Err(StorageError::TableNotFound);
        }
        let tmp = self.base_dir.join(format!("{table_id}.csv.tmp"));
        if let Err(e) = self.write_all(&tmp, &rows) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            StorageError::Transient(e.to_string())
        })
    }
}
