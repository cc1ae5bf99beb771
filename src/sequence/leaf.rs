// src/sequence/leaf.rs

//! Leaf sequences for the three collection shapes. Only their element
//! concatenation interface matters to the node layer above; the payload
//! codec reuses the in-band value codec.

use std::sync::Arc;

use crate::codec::{BinaryDecoder, BinaryWriter};
use crate::common::{Format, Kind};
use crate::error::{Result, SequenceError};
use crate::store::ValueReadWriter;
use crate::value::Value;

/// One key/value pair held by a map leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: Value,
    pub value: Value,
}

impl MapEntry {
    pub fn new(key: Value, value: Value) -> MapEntry {
        MapEntry { key, value }
    }
}

#[derive(Debug, Clone)]
pub struct ListLeafSequence {
    vrw: Arc<dyn ValueReadWriter>,
    values: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct MapLeafSequence {
    vrw: Arc<dyn ValueReadWriter>,
    entries: Vec<MapEntry>,
}

#[derive(Debug, Clone)]
pub struct SetLeafSequence {
    vrw: Arc<dyn ValueReadWriter>,
    values: Vec<Value>,
}

/// Reads `(kind, level, count)` off a leaf buffer, insisting on the
/// expected kind and level 0.
fn read_leaf_header<'a>(
    bytes: &'a [u8],
    expected: Kind,
) -> Result<(u64, BinaryDecoder<'a>)> {
    let mut dec = BinaryDecoder::new(bytes);
    let tag = dec.read_u8()?;
    if Kind::from_u8(tag) != Some(expected) {
        return Err(SequenceError::StructuralViolation(format!(
            "kind tag {tag:#04x} where a {expected:?} leaf was expected"
        )));
    }
    let level = dec.read_count()?;
    if level != 0 {
        return Err(SequenceError::StructuralViolation(format!(
            "level {level} where a leaf was expected"
        )));
    }
    let count = dec.read_count()?;
    Ok((count, dec))
}

impl ListLeafSequence {
    pub fn new(vrw: Arc<dyn ValueReadWriter>, values: Vec<Value>) -> ListLeafSequence {
        ListLeafSequence { vrw, values }
    }

    pub fn decode(vrw: Arc<dyn ValueReadWriter>, bytes: &[u8]) -> Result<ListLeafSequence> {
        let format = vrw.format();
        let (count, mut dec) = read_leaf_header(bytes, Kind::List)?;
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(Value::decode(&mut dec, format)?);
        }
        if !dec.is_at_end() {
            return Err(SequenceError::InvalidTuple(
                "trailing bytes after list leaf values".to_string(),
            ));
        }
        Ok(ListLeafSequence { vrw, values })
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn seq_len(&self) -> usize {
        self.values.len()
    }

    pub fn num_leaves(&self) -> u64 {
        self.values.len() as u64
    }

    pub fn format(&self) -> Format {
        self.vrw.format()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let format = self.format();
        let mut w = BinaryWriter::new();
        w.write_u8(Kind::List as u8);
        w.write_count(0);
        w.write_count(self.values.len() as u64);
        for v in &self.values {
            v.encode(&mut w, format)?;
        }
        Ok(w.into_data())
    }
}

impl MapLeafSequence {
    pub fn new(vrw: Arc<dyn ValueReadWriter>, entries: Vec<MapEntry>) -> MapLeafSequence {
        MapLeafSequence { vrw, entries }
    }

    pub fn decode(vrw: Arc<dyn ValueReadWriter>, bytes: &[u8]) -> Result<MapLeafSequence> {
        let format = vrw.format();
        let (count, mut dec) = read_leaf_header(bytes, Kind::Map)?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = Value::decode(&mut dec, format)?;
            let value = Value::decode(&mut dec, format)?;
            entries.push(MapEntry { key, value });
        }
        if !dec.is_at_end() {
            return Err(SequenceError::InvalidTuple(
                "trailing bytes after map leaf entries".to_string(),
            ));
        }
        Ok(MapLeafSequence { vrw, entries })
    }

    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    pub fn seq_len(&self) -> usize {
        self.entries.len()
    }

    pub fn num_leaves(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn format(&self) -> Format {
        self.vrw.format()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let format = self.format();
        let mut w = BinaryWriter::new();
        w.write_u8(Kind::Map as u8);
        w.write_count(0);
        w.write_count(self.entries.len() as u64);
        for entry in &self.entries {
            entry.key.encode(&mut w, format)?;
            entry.value.encode(&mut w, format)?;
        }
        Ok(w.into_data())
    }
}

impl SetLeafSequence {
    pub fn new(vrw: Arc<dyn ValueReadWriter>, values: Vec<Value>) -> SetLeafSequence {
        SetLeafSequence { vrw, values }
    }

    pub fn decode(vrw: Arc<dyn ValueReadWriter>, bytes: &[u8]) -> Result<SetLeafSequence> {
        let format = vrw.format();
        let (count, mut dec) = read_leaf_header(bytes, Kind::Set)?;
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(Value::decode(&mut dec, format)?);
        }
        if !dec.is_at_end() {
            return Err(SequenceError::InvalidTuple(
                "trailing bytes after set leaf values".to_string(),
            ));
        }
        Ok(SetLeafSequence { vrw, values })
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn seq_len(&self) -> usize {
        self.values.len()
    }

    pub fn num_leaves(&self) -> u64 {
        self.values.len() as u64
    }

    pub fn format(&self) -> Format {
        self.vrw.format()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let format = self.format();
        let mut w = BinaryWriter::new();
        w.write_u8(Kind::Set as u8);
        w.write_count(0);
        w.write_count(self.values.len() as u64);
        for v in &self.values {
            v.encode(&mut w, format)?;
        }
        Ok(w.into_data())
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
    fn list_leaf_round_trip() {
        let leaf = ListLeafSequence::new(
            vrw(),
            vec![Value::Float(1.0), Value::String("two".to_string())],
        );
        let bytes = leaf.encode().unwrap();
        let back = ListLeafSequence::decode(vrw(), &bytes).unwrap();
        assert_eq!(back.values(), leaf.values());
        assert_eq!(back.num_leaves(), 2);
        assert_eq!(back.encode().unwrap(), bytes);
    }

    #[test]
    fn map_leaf_round_trip() {
        let leaf = MapLeafSequence::new(
            vrw(),
            vec![
                MapEntry::new(Value::String("a".to_string()), Value::Bool(true)),
                MapEntry::new(Value::String("b".to_string()), Value::Float(2.0)),
            ],
        );
        let bytes = leaf.encode().unwrap();
        let back = MapLeafSequence::decode(vrw(), &bytes).unwrap();
        assert_eq!(back.entries(), leaf.entries());
        assert_eq!(back.encode().unwrap(), bytes);
    }

    #[test]
    fn leaf_header_is_checked() {
        let leaf = SetLeafSequence::new(vrw(), vec![Value::Bool(false)]);
        let bytes = leaf.encode().unwrap();
        assert!(ListLeafSequence::decode(vrw(), &bytes).is_err());
        assert!(SetLeafSequence::decode(vrw(), &bytes).is_ok());
    }
}
