// src/lib.rs

//! Internal-node layer of a probabilistic B-tree ("prolly tree") backing
//! ordered, content-addressed collections.
//!
//! Internal "meta" nodes summarize child subtrees as `(ref, largest key,
//! leaf count)` tuples over one contiguous, lazily-decoded buffer. Together
//! with the leaf shapes they form a persistent, immutable, hash-addressed
//! tree whose shape depends only on content, never on insertion history;
//! where the tuple runs are cut is decided upstream by a rolling hasher
//! this crate only feeds bytes to.

pub mod chunk;
pub mod codec;
pub mod common;
pub mod error;
pub mod key;
pub mod reference;
pub mod sequence;
pub mod store;
pub mod value;

pub use chunk::{chunk_sequence, hash_bytes, meta_hash_value_bytes, RollingByteHasher};
pub use common::{Format, Hash, Kind, EMPTY_HASH, HASH_SIZE};
pub use error::{Result, SequenceError};
pub use key::OrderedKey;
pub use reference::{Ref, Type};
pub use sequence::{
    EmptySequence, ListLeafSequence, MapEntry, MapLeafSequence, MetaSequence, MetaTuple, Sequence,
    SequenceItem, SetLeafSequence,
};
pub use store::{InMemoryStore, ValueReadWriter};
pub use value::Value;
