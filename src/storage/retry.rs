use std::cell::RefCell;
use std::thread::sleep;
use std::time::Duration;

use super::{StorageError, TabularStore};

/// Wrapper that adds retry logic with exponential backoff to a store.
///
/// Transient errors are retried with exponential backoff until `max_retries`
/// is reached. The delay starts at `base_delay` and doubles after each failed
/// attempt.
pub struct RetryingStore<S> {
    inner: RefCell<S>,
    max_retries: u32,
    base_delay: Duration,
}

impl<S> RetryingStore<S> {
    /// Create a new `RetryingStore` wrapping `inner`.
    pub fn new(inner: S, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner: RefCell::new(inner),
            max_retries,
            base_delay,
        }
    }

    fn with_retry<T, F>(&self, mut op: F) -> Result<T, StorageError>
    where
        F: FnMut(&mut S) -> Result<T, StorageError>,
    {
        let mut attempt = 0;
        loop {
            let result = op(&mut self.inner.borrow_mut());
            match result {
                Ok(val) => return Ok(val),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let factor = 2f64.powi(attempt as i32);
                    let delay = self.base_delay.mul_f64(factor);
                    sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<S: TabularStore> TabularStore for RetryingStore<S> {
    fn create_table(&mut self, title: &str) -> Result<String, StorageError> {
        self.with_retry(|inner| inner.create_table(title))
    }

    fn append_row(&mut self, table_id: &str, values: Vec<String>) -> Result<(), StorageError> {
        self.with_retry(|inner| inner.append_row(table_id, values.clone()))
    }

    fn append_rows(
        &mut self,
        table_id: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), StorageError> {
        self.with_retry(|inner| inner.append_rows(table_id, rows.clone()))
    }

    fn list_rows(&self, table_id: &str) -> Result<Vec<Vec<String>>, StorageError> {
        self.with_retry(|inner| inner.list_rows(table_id))
    }

    fn replace_rows(
        &mut self,
        table_id: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), StorageError> {
        self.with_retry(|inner| inner.replace_rows(table_id, rows.clone()))
    }
}
