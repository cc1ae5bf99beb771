// src/store/mem_store.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::chunk::hash_bytes;
use crate::common::{Format, Hash};
use crate::error::{Result, SequenceError};
use crate::sequence::Sequence;

use super::value_store::ValueReadWriter;

#[derive(Debug, Default)]
struct InMemoryStoreInner {
    chunks: HashMap<Hash, Vec<u8>>,
}

/// An in-memory `ValueReadWriter` over a `tokio::sync::RwLock`d chunk map.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    format: Format,
    inner: Arc<RwLock<InMemoryStoreInner>>,
}

impl InMemoryStore {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            inner: Arc::new(RwLock::new(InMemoryStoreInner::default())),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.chunks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ValueReadWriter for InMemoryStore {
    fn format(&self) -> Format {
        self.format
    }

    async fn read_value(&self, ctx: &CancellationToken, hash: Hash) -> Result<Option<Sequence>> {
        if ctx.is_cancelled() {
            return Err(SequenceError::Cancelled);
        }
        let guard = self.inner.read().await;
        match guard.chunks.get(&hash) {
            Some(bytes) => Ok(Some(Sequence::decode(Arc::new(self.clone()), bytes)?)),
            None => Ok(None),
        }
    }

    async fn read_many_values(
        &self,
        ctx: &CancellationToken,
        hashes: &[Hash],
    ) -> Result<Vec<Sequence>> {
        if ctx.is_cancelled() {
            return Err(SequenceError::Cancelled);
        }
        debug!("batched read of {} chunks", hashes.len());
        let guard = self.inner.read().await;
        let mut out = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let bytes = guard
                .chunks
                .get(hash)
                .ok_or(SequenceError::ChunkNotFound(*hash))?;
            out.push(Sequence::decode(Arc::new(self.clone()), bytes)?);
        }
        Ok(out)
    }

    async fn write_value(&self, ctx: &CancellationToken, bytes: Vec<u8>) -> Result<Hash> {
        if ctx.is_cancelled() {
            return Err(SequenceError::Cancelled);
        }
        let hash = hash_bytes(&bytes);
        let mut guard = self.inner.write().await;
        guard.chunks.entry(hash).or_insert(bytes);
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::ListLeafSequence;
    use crate::value::Value;

    fn store() -> InMemoryStore {
        InMemoryStore::new(Format::V1)
    }

    fn leaf_bytes(store: &InMemoryStore, values: Vec<Value>) -> Vec<u8> {
        ListLeafSequence::new(Arc::new(store.clone()), values)
            .encode()
            .unwrap()
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let store = store();
        let ctx = CancellationToken::new();
        let bytes = leaf_bytes(&store, vec![Value::Float(1.0)]);
        let hash = store.write_value(&ctx, bytes.clone()).await.unwrap();
        assert_eq!(hash, hash_bytes(&bytes));

        let seq = store.read_value(&ctx, hash).await.unwrap().unwrap();
        assert_eq!(seq.encode().unwrap(), bytes);
        assert!(store.read_value(&ctx, [9u8; 20]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn batched_read_preserves_order_and_duplicates() {
        let store = store();
        let ctx = CancellationToken::new();
        let a = store
            .write_value(&ctx, leaf_bytes(&store, vec![Value::Float(1.0)]))
            .await
            .unwrap();
        let b = store
            .write_value(&ctx, leaf_bytes(&store, vec![Value::Float(2.0)]))
            .await
            .unwrap();

        let seqs = store.read_many_values(&ctx, &[b, a, b]).await.unwrap();
        assert_eq!(seqs.len(), 3);
        assert_eq!(hash_bytes(&seqs[0].encode().unwrap()), b);
        assert_eq!(hash_bytes(&seqs[1].encode().unwrap()), a);
        assert_eq!(hash_bytes(&seqs[2].encode().unwrap()), b);
    }

    #[tokio::test]
    async fn batched_read_fails_as_a_whole() {
        let store = store();
        let ctx = CancellationToken::new();
        let a = store
            .write_value(&ctx, leaf_bytes(&store, vec![Value::Float(1.0)]))
            .await
            .unwrap();
        let missing = [7u8; 20];
        assert!(matches!(
            store.read_many_values(&ctx, &[a, missing]).await,
            Err(SequenceError::ChunkNotFound(h)) if h == missing
        ));
    }

    #[tokio::test]
    async fn cancellation_short_circuits() {
        let store = store();
        let ctx = CancellationToken::new();
        ctx.cancel();
        assert!(matches!(
            store.read_many_values(&ctx, &[[1u8; 20]]).await,
            Err(SequenceError::Cancelled)
        ));
        assert!(matches!(
            store.write_value(&ctx, vec![1, 2, 3]).await,
            Err(SequenceError::Cancelled)
        ));
    }
}
