// src/sequence/mod.rs

//! The sequence layer: internal meta nodes, the leaf shapes they summarize,
//! and the empty placeholder, behind one tagged variant.

mod empty;
mod leaf;
mod meta;

pub use empty::EmptySequence;
pub use leaf::{ListLeafSequence, MapEntry, MapLeafSequence, SetLeafSequence};
pub use meta::{MetaSequence, MetaTuple};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::codec::BinaryDecoder;
use crate::common::{Format, Kind};
use crate::error::{Result, SequenceError};
use crate::key::OrderedKey;
use crate::store::ValueReadWriter;
use crate::value::Value;

/// One item of a sequence: a child summary for meta nodes, an element or
/// entry for leaves.
#[derive(Debug, Clone)]
pub enum SequenceItem {
    Tuple(MetaTuple),
    Value(Value),
    Entry(MapEntry),
}

/// One level of a prolly tree. Internal nodes are `Meta`; level 0 is one of
/// the leaf shapes; `Empty` inhabits positions where a subtree range has
/// been truncated.
#[derive(Debug, Clone)]
pub enum Sequence {
    Meta(MetaSequence),
    ListLeaf(ListLeafSequence),
    MapLeaf(MapLeafSequence),
    SetLeaf(SetLeafSequence),
    Empty(EmptySequence),
}

impl Sequence {
    /// Decodes a node buffer, dispatching on its `(kind, level)` header.
    pub fn decode(vrw: Arc<dyn ValueReadWriter>, bytes: &[u8]) -> Result<Sequence> {
        let mut dec = BinaryDecoder::new(bytes);
        let tag = dec.read_u8()?;
        let kind = Kind::from_u8(tag).filter(|k| k.is_collection()).ok_or_else(|| {
            SequenceError::StructuralViolation(format!("kind tag {tag:#04x} is not a collection"))
        })?;
        let level = dec.read_count()?;
        if level > 0 {
            return Ok(Sequence::Meta(MetaSequence::decode(vrw, bytes)?));
        }
        Ok(match kind {
            Kind::List => Sequence::ListLeaf(ListLeafSequence::decode(vrw, bytes)?),
            Kind::Map => Sequence::MapLeaf(MapLeafSequence::decode(vrw, bytes)?),
            Kind::Set => Sequence::SetLeaf(SetLeafSequence::decode(vrw, bytes)?),
            _ => unreachable!("checked as collection above"),
        })
    }

    pub fn format(&self) -> Format {
        match self {
            Sequence::Meta(ms) => ms.format(),
            Sequence::ListLeaf(s) => s.format(),
            Sequence::MapLeaf(s) => s.format(),
            Sequence::SetLeaf(s) => s.format(),
            Sequence::Empty(es) => es.format(),
        }
    }

    pub fn tree_level(&self) -> u64 {
        match self {
            Sequence::Meta(ms) => ms.tree_level(),
            Sequence::ListLeaf(_) | Sequence::MapLeaf(_) | Sequence::SetLeaf(_) => 0,
            Sequence::Empty(es) => es.tree_level(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        match self {
            Sequence::Meta(ms) => ms.is_leaf(),
            Sequence::ListLeaf(_) | Sequence::MapLeaf(_) | Sequence::SetLeaf(_) => true,
            Sequence::Empty(es) => es.is_leaf(),
        }
    }

    pub fn num_leaves(&self) -> u64 {
        match self {
            Sequence::Meta(ms) => ms.num_leaves(),
            Sequence::ListLeaf(s) => s.num_leaves(),
            Sequence::MapLeaf(s) => s.num_leaves(),
            Sequence::SetLeaf(s) => s.num_leaves(),
            Sequence::Empty(es) => es.num_leaves(),
        }
    }

    pub fn seq_len(&self) -> usize {
        match self {
            Sequence::Meta(ms) => ms.seq_len(),
            Sequence::ListLeaf(s) => s.seq_len(),
            Sequence::MapLeaf(s) => s.seq_len(),
            Sequence::SetLeaf(s) => s.seq_len(),
            Sequence::Empty(es) => es.seq_len(),
        }
    }

    /// The collection shape this node belongs to; the empty placeholder has
    /// none.
    pub fn kind(&self) -> Result<Kind> {
        match self {
            Sequence::Meta(ms) => Ok(ms.kind()),
            Sequence::ListLeaf(_) => Ok(Kind::List),
            Sequence::MapLeaf(_) => Ok(Kind::Map),
            Sequence::SetLeaf(_) => Ok(Kind::Set),
            Sequence::Empty(es) => Err(es.violation("kind")),
        }
    }

    pub fn get_item(&self, idx: usize) -> Result<SequenceItem> {
        let check = |len: usize| {
            if idx >= len {
                Err(SequenceError::StructuralViolation(format!(
                    "index {idx} out of range for {len} items"
                )))
            } else {
                Ok(())
            }
        };
        match self {
            Sequence::Meta(ms) => Ok(SequenceItem::Tuple(ms.get_item(idx)?)),
            Sequence::ListLeaf(s) => {
                check(s.seq_len())?;
                Ok(SequenceItem::Value(s.values()[idx].clone()))
            }
            Sequence::MapLeaf(s) => {
                check(s.seq_len())?;
                Ok(SequenceItem::Entry(s.entries()[idx].clone()))
            }
            Sequence::SetLeaf(s) => {
                check(s.seq_len())?;
                Ok(SequenceItem::Value(s.values()[idx].clone()))
            }
            Sequence::Empty(es) => Err(es.violation("get_item")),
        }
    }

    pub fn get_key(&self, idx: usize) -> Result<OrderedKey> {
        match self {
            Sequence::Meta(ms) => ms.get_key(idx),
            Sequence::Empty(es) => Err(es.violation("get_key")),
            _ => Err(SequenceError::StructuralViolation(
                "ordered keys live on meta sequences".to_string(),
            )),
        }
    }

    pub fn search(&self, key: &OrderedKey) -> Result<usize> {
        match self {
            Sequence::Meta(ms) => ms.search(key),
            Sequence::Empty(es) => Err(es.violation("search")),
            _ => Err(SequenceError::StructuralViolation(
                "search runs over meta sequences".to_string(),
            )),
        }
    }

    pub fn cumulative_number_of_leaves(&self, idx: usize) -> Result<u64> {
        match self {
            Sequence::Meta(ms) => ms.cumulative_number_of_leaves(idx),
            Sequence::Empty(es) => Err(es.violation("cumulative_number_of_leaves")),
            _ => Err(SequenceError::StructuralViolation(
                "leaf counts accumulate over meta sequences".to_string(),
            )),
        }
    }

    /// Re-encodes the node. For meta sequences this is the original buffer,
    /// bit for bit.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Sequence::Meta(ms) => Ok(ms.bytes().to_vec()),
            Sequence::ListLeaf(s) => s.encode(),
            Sequence::MapLeaf(s) => s.encode(),
            Sequence::SetLeaf(s) => s.encode(),
            Sequence::Empty(es) => Err(es.violation("encode")),
        }
    }

    pub async fn get_child_sequence(
        &self,
        ctx: &CancellationToken,
        idx: usize,
    ) -> Result<Option<Sequence>> {
        match self {
            Sequence::Meta(ms) => ms.get_child_sequence(ctx, idx).await,
            // Leaves and the empty placeholder have no children to hydrate.
            _ => Ok(None),
        }
    }

    pub async fn get_composite_child_sequence(
        &self,
        ctx: &CancellationToken,
        start: usize,
        length: usize,
    ) -> Result<Sequence> {
        match self {
            Sequence::Meta(ms) => ms.get_composite_child_sequence(ctx, start, length).await,
            Sequence::Empty(es) => Ok(Sequence::Empty(
                es.get_composite_child_sequence(start, length)?,
            )),
            _ => Err(SequenceError::StructuralViolation(
                "leaf sequences have no child sequences".to_string(),
            )),
        }
    }

    pub fn as_meta(&self) -> Result<&MetaSequence> {
        match self {
            Sequence::Meta(ms) => Ok(ms),
            other => Err(SequenceError::StructuralViolation(format!(
                "expected a meta sequence at level {}",
                other.tree_level()
            ))),
        }
    }

    pub fn as_list_leaf(&self) -> Result<&ListLeafSequence> {
        match self {
            Sequence::ListLeaf(s) => Ok(s),
            _ => Err(SequenceError::StructuralViolation(
                "expected a list leaf sequence".to_string(),
            )),
        }
    }

    pub fn as_map_leaf(&self) -> Result<&MapLeafSequence> {
        match self {
            Sequence::MapLeaf(s) => Ok(s),
            _ => Err(SequenceError::StructuralViolation(
                "expected a map leaf sequence".to_string(),
            )),
        }
    }

    pub fn as_set_leaf(&self) -> Result<&SetLeafSequence> {
        match self {
            Sequence::SetLeaf(s) => Ok(s),
            _ => Err(SequenceError::StructuralViolation(
                "expected a set leaf sequence".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn vrw() -> Arc<dyn ValueReadWriter> {
        Arc::new(InMemoryStore::new(Format::V1))
    }

    #[test]
    fn decode_dispatches_on_header() {
        let leaf = ListLeafSequence::new(vrw(), vec![Value::Bool(true)]);
        let bytes = leaf.encode().unwrap();
        let seq = Sequence::decode(vrw(), &bytes).unwrap();
        assert!(matches!(seq, Sequence::ListLeaf(_)));
        assert!(seq.is_leaf());
        assert_eq!(seq.kind().unwrap(), Kind::List);
        assert_eq!(seq.encode().unwrap(), bytes);
    }

    #[test]
    fn empty_sequence_misuse_is_a_structural_violation() {
        let seq = Sequence::Empty(EmptySequence::new(2, Format::V1));
        assert_eq!(seq.num_leaves(), 0);
        assert_eq!(seq.seq_len(), 0);
        assert_eq!(seq.tree_level(), 2);
        assert!(seq.kind().is_err());
        assert!(seq.get_item(0).is_err());
        assert!(seq.get_key(0).is_err());
        assert!(seq
            .search(&OrderedKey::from_value(Value::Bool(true), Format::V1).unwrap())
            .is_err());
        assert!(seq.cumulative_number_of_leaves(0).is_err());
        assert!(seq.encode().is_err());
    }

    #[tokio::test]
    async fn empty_sequence_child_is_conventionally_missing() {
        let ctx = CancellationToken::new();
        let seq = Sequence::Empty(EmptySequence::new(2, Format::V1));
        assert!(seq.get_child_sequence(&ctx, 17).await.unwrap().is_none());

        let child = seq.get_composite_child_sequence(&ctx, 0, 0).await.unwrap();
        assert_eq!(child.tree_level(), 1);
        assert!(matches!(child, Sequence::Empty(_)));
    }
}
