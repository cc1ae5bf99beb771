// src/reference.rs

//! Content-addressed references between sequences, and the union types
//! `type_of` reports for a node's children.

use crate::codec::{BinaryDecoder, BinaryWriter};
use crate::common::{is_empty_hash, Format, Hash, Kind};
use crate::error::{Result, SequenceError};

/// A reference to another sequence: the target's content hash, its
/// collection kind, and its height above the leaves it spans.
#[derive(Debug, Clone, PartialEq)]
pub struct Ref {
    target_hash: Hash,
    target_kind: Kind,
    height: u64,
}

impl Ref {
    pub fn new(target_hash: Hash, target_kind: Kind, height: u64) -> Ref {
        Ref {
            target_hash,
            target_kind,
            height,
        }
    }

    pub fn target_hash(&self) -> Hash {
        self.target_hash
    }

    pub fn target_kind(&self) -> Kind {
        self.target_kind
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// False only for forged zero-hash refs; a live reference always has a
    /// target.
    pub fn has_target(&self) -> bool {
        !is_empty_hash(&self.target_hash)
    }

    pub fn target_type(&self) -> Type {
        Type::simple(self.target_kind)
    }

    pub fn is_same_target_type(&self, other: &Ref) -> bool {
        self.target_kind == other.target_kind
    }

    /// Wire layout: `Kind::Ref` marker, target kind, target hash, height.
    /// The marker lets generic value skippers pass over a ref unseen.
    pub fn encode(&self, w: &mut BinaryWriter, _format: Format) -> Result<()> {
        w.write_u8(Kind::Ref as u8);
        w.write_u8(self.target_kind as u8);
        w.write_hash(&self.target_hash);
        w.write_count(self.height);
        Ok(())
    }

    pub fn decode(dec: &mut BinaryDecoder<'_>, _format: Format) -> Result<Ref> {
        let marker = dec.read_u8()?;
        if Kind::from_u8(marker) != Some(Kind::Ref) {
            return Err(SequenceError::InvalidTuple(format!(
                "expected a ref, found kind tag {marker:#04x}"
            )));
        }
        let kind_tag = dec.read_u8()?;
        let target_kind = Kind::from_u8(kind_tag)
            .filter(|k| k.is_collection())
            .ok_or_else(|| {
                SequenceError::InvalidTuple(format!(
                    "ref target kind tag {kind_tag:#04x} is not a collection"
                ))
            })?;
        let target_hash = dec.read_hash()?;
        let height = dec.read_count()?;
        Ok(Ref {
            target_hash,
            target_kind,
            height,
        })
    }

    pub fn skip(dec: &mut BinaryDecoder<'_>, _format: Format) -> Result<()> {
        dec.skip_raw(2)?; // marker + target kind
        dec.skip_hash()?;
        dec.skip_count()
    }
}

/// The set of distinct collection kinds reachable under a node. A union of
/// one kind collapses to that kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Simple(Kind),
    Union(Vec<Kind>),
}

impl Type {
    pub fn simple(kind: Kind) -> Type {
        Type::Simple(kind)
    }

    /// Builds the union of `kinds`, deduplicated and sorted so the result is
    /// independent of child order.
    pub fn union(mut kinds: Vec<Kind>) -> Type {
        kinds.sort_unstable();
        kinds.dedup();
        if kinds.len() == 1 {
            Type::Simple(kinds[0])
        } else {
            Type::Union(kinds)
        }
    }

    pub fn kinds(&self) -> &[Kind] {
        match self {
            Type::Simple(kind) => std::slice::from_ref(kind),
            Type::Union(kinds) => kinds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::EMPTY_HASH;

    fn some_hash(last: u8) -> Hash {
        let mut h = EMPTY_HASH;
        h[19] = last;
        h
    }

    #[test]
    fn encode_decode_round_trip() {
        let r = Ref::new(some_hash(3), Kind::Map, 4);
        let mut w = BinaryWriter::new();
        r.encode(&mut w, Format::V1).unwrap();
        let data = w.into_data();

        let mut skipper = BinaryDecoder::new(&data);
        Ref::skip(&mut skipper, Format::V1).unwrap();
        assert!(skipper.is_at_end());

        let mut dec = BinaryDecoder::new(&data);
        assert_eq!(Ref::decode(&mut dec, Format::V1).unwrap(), r);
    }

    #[test]
    fn decode_rejects_non_collection_target() {
        let mut w = BinaryWriter::new();
        w.write_u8(Kind::Ref as u8);
        w.write_u8(Kind::Bool as u8);
        w.write_hash(&some_hash(1));
        w.write_count(1);
        let data = w.into_data();
        assert!(Ref::decode(&mut BinaryDecoder::new(&data), Format::V1).is_err());
    }

    #[test]
    fn union_is_order_independent() {
        let a = Type::union(vec![Kind::List, Kind::Set, Kind::List]);
        let b = Type::union(vec![Kind::Set, Kind::List]);
        assert_eq!(a, b);
        assert_eq!(a.kinds(), &[Kind::List, Kind::Set]);

        let single = Type::union(vec![Kind::Map, Kind::Map]);
        assert_eq!(single, Type::Simple(Kind::Map));
    }
}
