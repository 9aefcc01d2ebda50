// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use serdao::storage::{KeyValueStore, MemoryStore, SqliteStore};
use tempfile::TempDir;

pub const GB_IBAN: &str = "GB29 NWBK 6016 1331 9268 19";
pub const DE_IBAN: &str = "DE89370400440532013000";
pub const FR_IBAN: &str = "FR1420041010050500013M02606";

/// Helper to create a SQLite-backed store in a temporary directory
pub async fn test_store() -> Result<(SqliteStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let store = SqliteStore::open(db_path.to_str().unwrap()).await?;
    Ok((store, temp_dir))
}

/// Reopen the database created by `test_store`
pub async fn reopen(temp_dir: &TempDir) -> Result<SqliteStore> {
    let db_path = temp_dir.path().join("test.db");
    SqliteStore::open(db_path.to_str().unwrap()).await
}

/// Memory store whose reads or writes can be switched off mid-test
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("storage unavailable");
        }
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("storage full");
        }
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.inner.remove_item(key).await
    }
}
