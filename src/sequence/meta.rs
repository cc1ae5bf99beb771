// src/sequence/meta.rs

//! Internal ("meta") nodes: ordered runs of child summaries over one
//! contiguous buffer, decoded lazily through recorded part offsets.

use std::sync::Arc;

use log::debug;
use tokio_util::sync::CancellationToken;

use crate::codec::{BinaryDecoder, BinaryWriter};
use crate::common::{Format, Kind};
use crate::error::{Result, SequenceError};
use crate::key::OrderedKey;
use crate::reference::{Ref, Type};
use crate::store::ValueReadWriter;

use super::{EmptySequence, ListLeafSequence, MapLeafSequence, Sequence, SetLeafSequence};

// Part indexes into a tuple's offset table.
const TUPLE_PART_REF: usize = 0;
const TUPLE_PART_KEY: usize = 1;
const TUPLE_PART_NUM_LEAVES: usize = 2;
const TUPLE_PART_END: usize = 3;

// Part indexes into a sequence's offset table; tuple boundaries follow.
const SEQ_PART_VALUES: usize = 3;

/// One child summary: a ref to the child sequence, the largest key present
/// anywhere under it, and the number of leaves it spans. Owns (or, for
/// views handed out by a node, shares) the contiguous encoding of all three
/// parts.
#[derive(Debug, Clone)]
pub struct MetaTuple {
    buff: Arc<[u8]>,
    offsets: [u32; 4],
    format: Format,
}

impl MetaTuple {
    pub fn new(
        reference: Ref,
        key: OrderedKey,
        num_leaves: u64,
        format: Format,
    ) -> Result<MetaTuple> {
        if !reference.has_target() {
            return Err(SequenceError::InvalidTuple(
                "ref has no target hash".to_string(),
            ));
        }
        if num_leaves == 0 {
            return Err(SequenceError::InvalidTuple(
                "tuple spans zero leaves".to_string(),
            ));
        }
        let mut w = BinaryWriter::new();
        let mut offsets = [0u32; 4];
        offsets[TUPLE_PART_REF] = w.offset();
        reference.encode(&mut w, format)?;
        offsets[TUPLE_PART_KEY] = w.offset();
        key.encode(&mut w, format)?;
        offsets[TUPLE_PART_NUM_LEAVES] = w.offset();
        w.write_count(num_leaves);
        offsets[TUPLE_PART_END] = w.offset();
        Ok(MetaTuple {
            buff: w.into_data().into(),
            offsets,
            format,
        })
    }

    fn view(buff: Arc<[u8]>, offsets: [u32; 4], format: Format) -> MetaTuple {
        MetaTuple {
            buff,
            offsets,
            format,
        }
    }

    fn decoder_at_part(&self, part: usize) -> BinaryDecoder<'_> {
        BinaryDecoder::at(&self.buff, self.offsets[part] as usize)
    }

    pub fn reference(&self) -> Result<Ref> {
        let mut dec = self.decoder_at_part(TUPLE_PART_REF);
        Ref::decode(&mut dec, self.format)
    }

    pub fn key(&self) -> Result<OrderedKey> {
        let mut dec = self.decoder_at_part(TUPLE_PART_KEY);
        OrderedKey::decode(&mut dec, self.format)
    }

    pub fn num_leaves(&self) -> Result<u64> {
        let mut dec = self.decoder_at_part(TUPLE_PART_NUM_LEAVES);
        dec.read_count()
    }

    /// The tuple's encoding, exactly as concatenated into its node and as
    /// fed to the rolling hasher.
    pub fn bytes(&self) -> &[u8] {
        &self.buff[self.offsets[TUPLE_PART_REF] as usize..self.offsets[TUPLE_PART_END] as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn write_to(&self, w: &mut BinaryWriter) {
        w.write_raw(self.bytes());
    }
}

/// An internal prolly-tree node. Carries the raw buffer, an offset table
/// with one entry per structural part plus one per tuple boundary, the
/// cached leaf total, and the collaborator used to hydrate children.
#[derive(Debug, Clone)]
pub struct MetaSequence {
    vrw: Arc<dyn ValueReadWriter>,
    buff: Arc<[u8]>,
    offsets: Vec<u32>,
    kind: Kind,
    level: u64,
    num_leaves: u64,
}

impl MetaSequence {
    /// Builds a node from an already-segmented run of tuples; where to cut
    /// the run is the rolling hasher's decision, made upstream.
    pub fn from_tuples(
        kind: Kind,
        level: u64,
        tuples: &[MetaTuple],
        vrw: Arc<dyn ValueReadWriter>,
    ) -> Result<MetaSequence> {
        if !kind.is_collection() {
            return Err(SequenceError::StructuralViolation(format!(
                "kind {kind:?} cannot form a sequence"
            )));
        }
        if level == 0 {
            return Err(SequenceError::StructuralViolation(
                "meta sequence level must be at least 1".to_string(),
            ));
        }
        if tuples.is_empty() {
            return Err(SequenceError::StructuralViolation(
                "meta sequence needs at least one tuple".to_string(),
            ));
        }
        let format = vrw.format();
        for pair in tuples.windows(2) {
            if pair[1].key()?.less(format, &pair[0].key()?) {
                return Err(SequenceError::StructuralViolation(
                    "child keys are not non-decreasing".to_string(),
                ));
            }
        }

        let mut w = BinaryWriter::new();
        let mut offsets = Vec::with_capacity(tuples.len() + SEQ_PART_VALUES + 1);
        offsets.push(w.offset());
        w.write_u8(kind as u8);
        offsets.push(w.offset());
        w.write_count(level);
        offsets.push(w.offset());
        w.write_count(tuples.len() as u64);
        offsets.push(w.offset());
        let mut num_leaves = 0u64;
        for tuple in tuples {
            if tuple.format() != format {
                return Err(SequenceError::FormatMismatch {
                    expected: format,
                    actual: tuple.format(),
                });
            }
            num_leaves += tuple.num_leaves()?;
            tuple.write_to(&mut w);
            offsets.push(w.offset());
        }
        Ok(MetaSequence {
            vrw,
            buff: w.into_data().into(),
            offsets,
            kind,
            level,
            num_leaves,
        })
    }

    /// Decodes a node buffer, recovering part offsets by skipping each part
    /// with the codec's part-specific skippers.
    pub fn decode(vrw: Arc<dyn ValueReadWriter>, bytes: &[u8]) -> Result<MetaSequence> {
        let format = vrw.format();
        let mut dec = BinaryDecoder::new(bytes);
        let mut offsets = Vec::new();

        offsets.push(dec.offset() as u32);
        let kind_tag = dec.read_u8()?;
        let kind = Kind::from_u8(kind_tag)
            .filter(|k| k.is_collection())
            .ok_or_else(|| {
                SequenceError::StructuralViolation(format!(
                    "kind tag {kind_tag:#04x} is not a collection"
                ))
            })?;
        offsets.push(dec.offset() as u32);
        let level = dec.read_count()?;
        if level == 0 {
            return Err(SequenceError::StructuralViolation(
                "level 0 where a meta sequence was expected".to_string(),
            ));
        }
        offsets.push(dec.offset() as u32);
        let count = dec.read_count()?;
        if count == 0 {
            return Err(SequenceError::StructuralViolation(
                "meta sequence needs at least one tuple".to_string(),
            ));
        }
        offsets.push(dec.offset() as u32);

        let mut num_leaves = 0u64;
        for _ in 0..count {
            Ref::skip(&mut dec, format)?;
            OrderedKey::skip(&mut dec, format)?;
            num_leaves += dec.read_count()?;
            offsets.push(dec.offset() as u32);
        }
        if !dec.is_at_end() {
            return Err(SequenceError::InvalidTuple(
                "trailing bytes after the final tuple".to_string(),
            ));
        }
        Ok(MetaSequence {
            vrw,
            buff: bytes.to_vec().into(),
            offsets,
            kind,
            level,
            num_leaves,
        })
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn tree_level(&self) -> u64 {
        self.level
    }

    pub fn num_leaves(&self) -> u64 {
        self.num_leaves
    }

    pub fn seq_len(&self) -> usize {
        self.offsets.len() - SEQ_PART_VALUES - 1
    }

    pub fn is_leaf(&self) -> bool {
        debug_assert!(self.level > 0);
        false
    }

    pub fn format(&self) -> Format {
        self.vrw.format()
    }

    pub fn value_read_writer(&self) -> &Arc<dyn ValueReadWriter> {
        &self.vrw
    }

    /// The node's encoding; tuple buffers concatenated behind the
    /// `(kind, level, count)` header, bit-identical to what was decoded.
    pub fn bytes(&self) -> &[u8] {
        &self.buff
    }

    /// A decoder positioned at the start of the buffer, for bulk scans via
    /// `get_ref_at`.
    pub fn decoder(&self) -> BinaryDecoder<'_> {
        BinaryDecoder::new(&self.buff)
    }

    fn check_index(&self, idx: usize) -> Result<()> {
        if idx >= self.seq_len() {
            return Err(SequenceError::StructuralViolation(format!(
                "index {idx} out of range for {} children",
                self.seq_len()
            )));
        }
        Ok(())
    }

    fn item_offset(&self, idx: usize) -> usize {
        self.offsets[SEQ_PART_VALUES + idx] as usize
    }

    fn read_tuple(&self, dec: &mut BinaryDecoder<'_>) -> Result<MetaTuple> {
        let format = self.format();
        let mut offsets = [0u32; 4];
        offsets[TUPLE_PART_REF] = dec.offset() as u32;
        Ref::skip(dec, format)?;
        offsets[TUPLE_PART_KEY] = dec.offset() as u32;
        OrderedKey::skip(dec, format)?;
        offsets[TUPLE_PART_NUM_LEAVES] = dec.offset() as u32;
        dec.skip_count()?;
        offsets[TUPLE_PART_END] = dec.offset() as u32;
        Ok(MetaTuple::view(Arc::clone(&self.buff), offsets, format))
    }

    /// Zero-copy view over the `idx`-th child tuple.
    pub fn get_item(&self, idx: usize) -> Result<MetaTuple> {
        self.check_index(idx)?;
        let mut dec = BinaryDecoder::at(&self.buff, self.item_offset(idx));
        self.read_tuple(&mut dec)
    }

    /// Decodes the whole child run in one forward pass.
    pub fn tuples(&self) -> Result<Vec<MetaTuple>> {
        let mut dec = BinaryDecoder::at(&self.buff, self.offsets[SEQ_PART_VALUES] as usize);
        (0..self.seq_len())
            .map(|_| self.read_tuple(&mut dec))
            .collect()
    }

    pub fn get_key(&self, idx: usize) -> Result<OrderedKey> {
        self.check_index(idx)?;
        let format = self.format();
        let mut dec = BinaryDecoder::at(&self.buff, self.item_offset(idx));
        Ref::skip(&mut dec, format)?;
        OrderedKey::decode(&mut dec, format)
    }

    /// Reads the `idx`-th ref through a caller-held decoder, sparing the
    /// per-call setup when bulk-scanning.
    pub fn get_ref_at(&self, dec: &mut BinaryDecoder<'_>, idx: usize) -> Result<Ref> {
        self.check_index(idx)?;
        dec.set_offset(self.item_offset(idx));
        Ref::decode(dec, self.format())
    }

    pub fn get_num_leaves_at(&self, idx: usize) -> Result<u64> {
        self.check_index(idx)?;
        let format = self.format();
        let mut dec = BinaryDecoder::at(&self.buff, self.item_offset(idx));
        Ref::skip(&mut dec, format)?;
        OrderedKey::skip(&mut dec, format)?;
        dec.read_count()
    }

    /// Sum of `num_leaves` over children `0..=idx`. One forward scan per
    /// call; callers amortize by walking in order.
    pub fn cumulative_number_of_leaves(&self, idx: usize) -> Result<u64> {
        self.check_index(idx)?;
        let format = self.format();
        let mut dec = BinaryDecoder::at(&self.buff, self.offsets[SEQ_PART_VALUES] as usize);
        let mut cum = 0u64;
        for _ in 0..=idx {
            Ref::skip(&mut dec, format)?;
            OrderedKey::skip(&mut dec, format)?;
            cum += dec.read_count()?;
        }
        Ok(cum)
    }

    /// Smallest index whose key is not less than `key`; `seq_len` if every
    /// key is smaller.
    pub fn search(&self, key: &OrderedKey) -> Result<usize> {
        let format = self.format();
        let (mut lo, mut hi) = (0usize, self.seq_len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.get_key(mid)?.less(format, key) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    /// Index-to-index child identity test against another node, used by the
    /// diff/merge layer above.
    pub fn get_compare_fn<'a>(
        &'a self,
        other: &'a MetaSequence,
    ) -> impl Fn(usize, usize) -> Result<bool> + 'a {
        move |idx, other_idx| {
            let mut dec = self.decoder();
            let mut other_dec = other.decoder();
            Ok(self.get_ref_at(&mut dec, idx)?.target_hash()
                == other.get_ref_at(&mut other_dec, other_idx)?.target_hash())
        }
    }

    /// Union of the distinct target types of all children. One walk,
    /// coalescing consecutive equal target types; the result is
    /// order-independent.
    pub fn type_of(&self) -> Result<Type> {
        let format = self.format();
        let mut dec = BinaryDecoder::at(&self.buff, self.offsets[SEQ_PART_VALUES] as usize);
        let mut kinds = Vec::new();
        let mut last: Option<Ref> = None;
        for _ in 0..self.seq_len() {
            let r = Ref::decode(&mut dec, format)?;
            if last.as_ref().map_or(true, |l| !l.is_same_target_type(&r)) {
                kinds.push(r.target_kind());
                last = Some(r);
            }
            OrderedKey::skip(&mut dec, format)?;
            dec.skip_count()?;
        }
        Ok(Type::union(kinds))
    }

    fn check_child(&self, child: &Sequence) -> Result<()> {
        if child.format() != self.format() {
            return Err(SequenceError::FormatMismatch {
                expected: self.format(),
                actual: child.format(),
            });
        }
        if child.tree_level() + 1 != self.level {
            return Err(SequenceError::StructuralViolation(format!(
                "level-{} child under a level-{} node",
                child.tree_level(),
                self.level
            )));
        }
        let child_kind = child.kind()?;
        if child_kind != self.kind {
            return Err(SequenceError::StructuralViolation(format!(
                "{child_kind:?} child under a {:?} node",
                self.kind
            )));
        }
        Ok(())
    }

    /// Hydrates the `idx`-th child through the collaborator. An empty tuple
    /// buffer yields `None`, which higher layers treat as a missing child.
    pub async fn get_child_sequence(
        &self,
        ctx: &CancellationToken,
        idx: usize,
    ) -> Result<Option<Sequence>> {
        let tuple = self.get_item(idx)?;
        if tuple.is_empty() {
            return Ok(None);
        }
        let r = tuple.reference()?;
        let seq = self
            .vrw
            .read_value(ctx, r.target_hash())
            .await?
            .ok_or(SequenceError::ChunkNotFound(r.target_hash()))?;
        self.check_child(&seq)?;
        Ok(Some(seq))
    }

    /// Hydrates children `start..end` in one batched store read. Results
    /// come back in request order; an empty range never contacts the store.
    pub async fn get_children(
        &self,
        ctx: &CancellationToken,
        start: usize,
        end: usize,
    ) -> Result<Vec<Sequence>> {
        if start > end || end > self.seq_len() {
            return Err(SequenceError::StructuralViolation(format!(
                "child range {start}..{end} out of range for {} children",
                self.seq_len()
            )));
        }
        if start == end {
            return Ok(Vec::new());
        }

        let mut hashes = Vec::with_capacity(end - start);
        {
            let mut dec = self.decoder();
            for idx in start..end {
                hashes.push(self.get_ref_at(&mut dec, idx)?.target_hash());
            }
        }
        debug!(
            "hydrating {} children of a level-{} {:?} node",
            hashes.len(),
            self.level,
            self.kind
        );
        let seqs = self.vrw.read_many_values(ctx, &hashes).await?;
        for seq in &seqs {
            self.check_child(seq)?;
        }
        Ok(seqs)
    }

    /// The composite sequence spanning children `start..start + length`:
    /// their concatenation one level down, or the empty placeholder when
    /// the range is empty.
    pub async fn get_composite_child_sequence(
        &self,
        ctx: &CancellationToken,
        start: usize,
        length: usize,
    ) -> Result<Sequence> {
        if length == 0 {
            return Ok(Sequence::Empty(EmptySequence::new(
                self.level - 1,
                self.format(),
            )));
        }

        let children = self.get_children(ctx, start, start + length).await?;

        if self.level > 1 {
            let mut tuples = Vec::new();
            for child in &children {
                tuples.extend(child.as_meta()?.tuples()?);
            }
            let seq = MetaSequence::from_tuples(
                self.kind,
                self.level - 1,
                &tuples,
                Arc::clone(&self.vrw),
            )?;
            return Ok(Sequence::Meta(seq));
        }

        match self.kind {
            Kind::List => {
                let mut values = Vec::new();
                for child in &children {
                    values.extend_from_slice(child.as_list_leaf()?.values());
                }
                Ok(Sequence::ListLeaf(ListLeafSequence::new(
                    Arc::clone(&self.vrw),
                    values,
                )))
            }
            Kind::Map => {
                let mut entries = Vec::new();
                for child in &children {
                    entries.extend_from_slice(child.as_map_leaf()?.entries());
                }
                Ok(Sequence::MapLeaf(MapLeafSequence::new(
                    Arc::clone(&self.vrw),
                    entries,
                )))
            }
            Kind::Set => {
                let mut values = Vec::new();
                for child in &children {
                    values.extend_from_slice(child.as_set_leaf()?.values());
                }
                Ok(Sequence::SetLeaf(SetLeafSequence::new(
                    Arc::clone(&self.vrw),
                    values,
                )))
            }
            other => Err(SequenceError::StructuralViolation(format!(
                "kind {other:?} cannot form a sequence"
            ))),
        }
    }
}
