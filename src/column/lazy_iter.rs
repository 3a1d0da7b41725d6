//! Lazy value iterator
//!
//! Walks the index and resolves a value-log record only when `value()` is
//! called, at most once per position.

use std::sync::Arc;

use crate::error::{Result, VlogError};
use crate::index::IndexIterator;
use crate::vlog::{Pointer, ValueLog};

/// Iterator over a column's `(key, value)` pairs
///
/// Every positioning call drops the cached value and any resolution error
/// of the previous position.
pub struct LazyValueIterator<I> {
    inner: I,
    vlog: Arc<ValueLog>,
    /// Value resolved at the current position
    cached: Option<Vec<u8>>,
    /// Resolution failure at the current position
    error: Option<VlogError>,
}

impl<I: IndexIterator> LazyValueIterator<I> {
    pub fn new(inner: I, vlog: Arc<ValueLog>) -> Self {
        Self {
            inner,
            vlog,
            cached: None,
            error: None,
        }
    }

    pub fn valid(&self) -> bool {
        self.inner.valid()
    }

    pub fn seek_to_first(&mut self) {
        self.invalidate();
        self.inner.seek_to_first();
    }

    pub fn seek_to_last(&mut self) {
        self.invalidate();
        self.inner.seek_to_last();
    }

    pub fn seek(&mut self, target: &[u8]) {
        self.invalidate();
        self.inner.seek(target);
    }

    pub fn next(&mut self) {
        self.invalidate();
        self.inner.next();
    }

    pub fn prev(&mut self) {
        self.invalidate();
        self.inner.prev();
    }

    pub fn key(&self) -> &[u8] {
        self.inner.key()
    }

    /// Value at the current position, read from the log on first call
    pub fn value(&mut self) -> Result<&[u8]> {
        if !self.inner.valid() {
            return Err(VlogError::InvalidState(
                "iterator is not positioned".to_string(),
            ));
        }

        let value = match self.cached.take() {
            Some(value) => value,
            None => match self.resolve() {
                Ok(value) => value,
                Err(e) => {
                    self.error = Some(e.clone());
                    return Err(e);
                }
            },
        };
        Ok(self.cached.insert(value).as_slice())
    }

    /// Underlying iterator status, then any failure resolving the current value
    pub fn status(&self) -> Result<()> {
        self.inner.status()?;
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Whether the current position's value has been read already
    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    fn resolve(&self) -> Result<Vec<u8>> {
        let pointer = Pointer::from_bytes(self.inner.value())
            .map_err(|e| e.in_column(self.vlog.column()))?;
        let (key, value) = self.vlog.read(pointer)?;
        if key != self.inner.key() {
            return Err(VlogError::Corruption(format!(
                "record at {} belongs to another key",
                pointer
            ))
            .in_column(self.vlog.column()));
        }
        Ok(value)
    }

    fn invalidate(&mut self) {
        self.cached = None;
        self.error = None;
    }
}
