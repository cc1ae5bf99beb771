// src/value.rs

//! In-band values: the payloads leaf sequences carry and value-ordered keys
//! embed. Encodings are self-describing through a leading kind byte so a
//! decoder can skip any value without a length table.

use std::cmp::Ordering;

use crate::chunk::hash_bytes;
use crate::codec::{BinaryDecoder, BinaryWriter};
use crate::common::{Format, Hash, Kind, HASH_SIZE};
use crate::error::{Result, SequenceError};
use crate::reference::Ref;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Float(f64),
    String(String),
    Ref(Ref),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Ref(_) => Kind::Ref,
        }
    }

    /// Domain order: kind tag first, natural order within a kind. Floats
    /// compare with `total_cmp` so the order is total.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Ref(a), Value::Ref(b)) => a.target_hash().cmp(&b.target_hash()),
            _ => (self.kind() as u8).cmp(&(other.kind() as u8)),
        }
    }

    pub fn encode(&self, w: &mut BinaryWriter, format: Format) -> Result<()> {
        match self {
            Value::Bool(b) => {
                w.write_u8(Kind::Bool as u8);
                w.write_u8(*b as u8);
            }
            Value::Float(v) => {
                w.write_u8(Kind::Float as u8);
                w.write_f64(*v);
            }
            Value::String(s) => {
                w.write_u8(Kind::String as u8);
                w.write_string(s);
            }
            Value::Ref(r) => r.encode(w, format)?,
        }
        Ok(())
    }

    pub fn decode(dec: &mut BinaryDecoder<'_>, format: Format) -> Result<Value> {
        let tag = dec.peek_u8()?;
        let kind = Kind::from_u8(tag)
            .ok_or_else(|| SequenceError::InvalidKey(format!("unknown kind tag {tag:#04x}")))?;
        match kind {
            Kind::Bool => {
                dec.read_u8()?;
                Ok(Value::Bool(dec.read_u8()? != 0))
            }
            Kind::Float => {
                dec.read_u8()?;
                Ok(Value::Float(dec.read_f64()?))
            }
            Kind::String => {
                dec.read_u8()?;
                Ok(Value::String(dec.read_string()?))
            }
            Kind::Ref => Ok(Value::Ref(Ref::decode(dec, format)?)),
            other => Err(SequenceError::InvalidKey(format!(
                "kind {other:?} cannot appear as an in-band value"
            ))),
        }
    }

    /// Skips one encoded value, including the hash-marker form an ordered
    /// key may take.
    pub fn skip(dec: &mut BinaryDecoder<'_>, format: Format) -> Result<()> {
        let tag = dec.peek_u8()?;
        let kind = Kind::from_u8(tag)
            .ok_or_else(|| SequenceError::InvalidKey(format!("unknown kind tag {tag:#04x}")))?;
        match kind {
            Kind::Bool => dec.skip_raw(2),
            Kind::Float => dec.skip_raw(1 + 8),
            Kind::String => {
                dec.read_u8()?;
                dec.skip_string()
            }
            Kind::Ref => Ref::skip(dec, format),
            Kind::Hash => dec.skip_raw(1 + HASH_SIZE),
            other => Err(SequenceError::InvalidKey(format!(
                "kind {other:?} cannot appear as an in-band value"
            ))),
        }
    }

    /// Digest of the value's encoding under `format`; what hash-ordered keys
    /// are made of.
    pub fn hash(&self, format: Format) -> Result<Hash> {
        let mut w = BinaryWriter::new();
        self.encode(&mut w, format)?;
        Ok(hash_bytes(&w.into_data()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::EMPTY_HASH;

    fn round_trip(v: &Value) -> Value {
        let mut w = BinaryWriter::new();
        v.encode(&mut w, Format::V1).unwrap();
        let data = w.into_data();

        // The skipper must cover exactly the encoded bytes.
        let mut skipper = BinaryDecoder::new(&data);
        Value::skip(&mut skipper, Format::V1).unwrap();
        assert!(skipper.is_at_end());

        let mut dec = BinaryDecoder::new(&data);
        let back = Value::decode(&mut dec, Format::V1).unwrap();
        assert!(dec.is_at_end());
        back
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut hash: crate::common::Hash = EMPTY_HASH;
        hash[19] = 9;
        let values = [
            Value::Bool(true),
            Value::Bool(false),
            Value::Float(-1.5),
            Value::Float(0.0),
            Value::String(String::new()),
            Value::String("prolly".to_string()),
            Value::Ref(Ref::new(hash, Kind::Set, 1)),
        ];
        for v in &values {
            assert_eq!(&round_trip(v), v);
        }
    }

    #[test]
    fn order_is_total() {
        let values = [
            Value::Bool(false),
            Value::Bool(true),
            Value::Float(-3.0),
            Value::Float(10.0),
            Value::String("a".to_string()),
            Value::String("b".to_string()),
        ];
        for a in &values {
            for b in &values {
                let less = a.compare(b) == Ordering::Less;
                let greater = b.compare(a) == Ordering::Less;
                let equal = a.compare(b) == Ordering::Equal;
                assert_eq!(
                    [less, greater, equal].iter().filter(|&&x| x).count(),
                    1,
                    "{a:?} vs {b:?}"
                );
            }
        }
        // Kind precedence: bools before floats before strings.
        assert_eq!(values[1].compare(&values[2]), Ordering::Less);
        assert_eq!(values[3].compare(&values[4]), Ordering::Less);
    }
}
