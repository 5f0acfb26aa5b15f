//! Single-slot storage for the latest verification result.
//!
//! There is no history: every `set` replaces the previous record, and
//! concurrent writers race with last-write-wins semantics.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::verification::VerificationResult;

pub use file::FileResultStore;
pub use memory::MemoryResultStore;

/// Holds the most recent [`VerificationResult`].
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// The latest result, if one has been written.
    async fn get(&self) -> StoreResult<Option<VerificationResult>>;

    /// Replace the stored result.
    async fn set(&self, result: &VerificationResult) -> StoreResult<()>;
}
