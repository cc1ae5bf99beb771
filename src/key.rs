// src/key.rs

//! The uniform comparison key of a prolly-tree level: either an in-band
//! value that sorts by domain order, or a 20-byte digest that sorts
//! lexicographically. Value-ordered keys sort strictly before hash-ordered
//! keys.

use std::cmp::Ordering;

use crate::codec::{BinaryDecoder, BinaryWriter};
use crate::common::{is_empty_hash, Format, Hash, Kind, EMPTY_HASH};
use crate::error::{Result, SequenceError};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum OrderedKey {
    ByValue(Value),
    ByHash(Hash),
    /// Sentinel for "no key written". Encodes as the hash marker plus the
    /// zero digest; a live hash-ordered key never carries that digest.
    Empty,
}

impl OrderedKey {
    pub fn from_value(v: Value, format: Format) -> Result<OrderedKey> {
        if v.kind().is_ordered_by_value() {
            Ok(OrderedKey::ByValue(v))
        } else {
            Ok(OrderedKey::from_hash(v.hash(format)?))
        }
    }

    pub fn from_hash(h: Hash) -> OrderedKey {
        if is_empty_hash(&h) {
            OrderedKey::Empty
        } else {
            OrderedKey::ByHash(h)
        }
    }

    pub fn is_ordered_by_value(&self) -> bool {
        matches!(self, OrderedKey::ByValue(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, OrderedKey::Empty)
    }

    /// The digest of a hash-ordered key; the zero digest for the sentinel.
    pub fn digest(&self) -> Hash {
        match self {
            OrderedKey::ByHash(h) => *h,
            _ => EMPTY_HASH,
        }
    }

    pub fn less(&self, _format: Format, other: &OrderedKey) -> bool {
        match (self, other) {
            (OrderedKey::ByValue(a), OrderedKey::ByValue(b)) => a.compare(b) == Ordering::Less,
            (OrderedKey::ByValue(_), _) => true,
            (_, OrderedKey::ByValue(_)) => false,
            (a, b) => a.digest() < b.digest(),
        }
    }

    pub fn encode(&self, w: &mut BinaryWriter, format: Format) -> Result<()> {
        match self {
            OrderedKey::ByValue(v) => v.encode(w, format),
            OrderedKey::ByHash(h) => {
                if is_empty_hash(h) {
                    return Err(SequenceError::InvalidKey(
                        "hash-ordered key has an empty digest".to_string(),
                    ));
                }
                w.write_u8(Kind::Hash as u8);
                w.write_hash(h);
                Ok(())
            }
            OrderedKey::Empty => {
                w.write_u8(Kind::Hash as u8);
                w.write_hash(&EMPTY_HASH);
                Ok(())
            }
        }
    }

    pub fn decode(dec: &mut BinaryDecoder<'_>, format: Format) -> Result<OrderedKey> {
        let tag = dec.peek_u8()?;
        let kind = Kind::from_u8(tag)
            .ok_or_else(|| SequenceError::InvalidKey(format!("unknown kind tag {tag:#04x}")))?;
        if kind == Kind::Hash {
            dec.read_u8()?;
            return Ok(OrderedKey::from_hash(dec.read_hash()?));
        }
        if !kind.is_ordered_by_value() {
            return Err(SequenceError::InvalidKey(format!(
                "kind {kind:?} cannot begin an ordered key"
            )));
        }
        Ok(OrderedKey::ByValue(Value::decode(dec, format)?))
    }

    pub fn skip(dec: &mut BinaryDecoder<'_>, format: Format) -> Result<()> {
        Value::skip(dec, format)
    }
}
