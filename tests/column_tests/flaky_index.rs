//! LsmIndex wrapper whose bulk insert can be made to fail

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use vlogkv::index::{BaseEngine, LsmIndex, RecoveryEdit, SnapshotIterator};
use vlogkv::{Config, Result, VlogError};

pub struct FlakyIndex {
    inner: LsmIndex,
    fail_bulk_insert: AtomicBool,
}

impl FlakyIndex {
    pub fn fail_bulk_insert(&self, yes: bool) {
        self.fail_bulk_insert.store(yes, Ordering::SeqCst);
    }
}

impl BaseEngine for FlakyIndex {
    type Iter = SnapshotIterator;
    type Edit = RecoveryEdit;

    fn open(dir: &Path, config: &Config) -> Result<Self> {
        Ok(Self {
            inner: LsmIndex::open(dir, config)?,
            fail_bulk_insert: AtomicBool::new(false),
        })
    }

    fn recover(&self) -> Result<RecoveryEdit> {
        self.inner.recover()
    }

    fn apply(&self, edit: RecoveryEdit) -> Result<()> {
        self.inner.apply(edit)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn bulk_insert<I>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    {
        if self.fail_bulk_insert.load(Ordering::SeqCst) {
            return Err(VlogError::Storage("injected bulk insert failure".to_string()));
        }
        self.inner.bulk_insert(pairs)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.inner.delete(key)
    }

    fn new_internal_iterator(&self) -> Result<SnapshotIterator> {
        self.inner.new_internal_iterator()
    }

    fn close(self) -> Result<()> {
        self.inner.close()
    }
}
