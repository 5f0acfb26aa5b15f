//! In-memory result store for testing and development.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::stores::ResultStore;
use crate::types::verification::VerificationResult;

/// In-memory single-slot store.
///
/// Not suitable for the CLI since data is lost on exit.
#[derive(Default)]
pub struct MemoryResultStore {
    latest: RwLock<Option<VerificationResult>>,
    writes: AtomicUsize,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn clear(&self) {
        *self.latest.write().await = None;
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn get(&self) -> StoreResult<Option<VerificationResult>> {
        Ok(self.latest.read().await.clone())
    }

    async fn set(&self, result: &VerificationResult) -> StoreResult<()> {
        *self.latest.write().await = Some(result.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
