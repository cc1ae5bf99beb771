// src/store/value_store.rs

use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::common::{Format, Hash};
use crate::error::Result;
use crate::sequence::Sequence;

/// Access to the content-addressed chunks behind sequences. Meta sequences
/// hydrate their children through this trait; implementations decide how
/// chunks are kept.
///
/// Implementations are not required to cache or to deduplicate repeated
/// hashes; callers may pass duplicates and expect duplicated results back
/// in the same positions.
#[async_trait]
pub trait ValueReadWriter: fmt::Debug + Send + Sync + 'static {
    fn format(&self) -> Format;

    /// Reads a single chunk and re-wraps it as a sequence. `Ok(None)` when
    /// the chunk is not present.
    async fn read_value(&self, ctx: &CancellationToken, hash: Hash) -> Result<Option<Sequence>>;

    /// Bulk read. Result order matches input order; fails as a whole on any
    /// sub-failure.
    async fn read_many_values(
        &self,
        ctx: &CancellationToken,
        hashes: &[Hash],
    ) -> Result<Vec<Sequence>>;

    /// Stores a chunk and returns its content hash.
    async fn write_value(&self, ctx: &CancellationToken, bytes: Vec<u8>) -> Result<Hash>;
}
