// src/common.rs

/// Width of a content digest on the wire.
pub const HASH_SIZE: usize = 20;

/// A 20-byte content digest, truncated Blake3.
pub type Hash = [u8; HASH_SIZE];

/// The all-zero digest. Legal only inside the empty-key sentinel; a live
/// reference never carries it.
pub const EMPTY_HASH: Hash = [0u8; HASH_SIZE];

pub fn is_empty_hash(h: &Hash) -> bool {
    *h == EMPTY_HASH
}

/// Selects the binary layout variant. Threaded through every encode and
/// decode call; values produced under different formats never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    V1,
}

/// One-byte kind tag. Covers the in-band value kinds, the collection kinds
/// a sequence can belong to, refs, and the marker that introduces a
/// hash-ordered key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Kind {
    Bool = 0,
    Float = 1,
    String = 2,
    List = 3,
    Map = 4,
    Set = 5,
    Ref = 6,
    Hash = 7,
}

impl Kind {
    pub fn from_u8(tag: u8) -> Option<Kind> {
        Some(match tag {
            0 => Kind::Bool,
            1 => Kind::Float,
            2 => Kind::String,
            3 => Kind::List,
            4 => Kind::Map,
            5 => Kind::Set,
            6 => Kind::Ref,
            7 => Kind::Hash,
            _ => return None,
        })
    }

    /// Kinds whose keys sort by the value itself rather than by its digest.
    pub fn is_ordered_by_value(self) -> bool {
        matches!(self, Kind::Bool | Kind::Float | Kind::String)
    }

    /// Kinds a sequence (and therefore a ref target) can have.
    pub fn is_collection(self) -> bool {
        matches!(self, Kind::List | Kind::Map | Kind::Set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_round_trip() {
        for tag in 0u8..8 {
            let kind = Kind::from_u8(tag).unwrap();
            assert_eq!(kind as u8, tag);
        }
        assert!(Kind::from_u8(8).is_none());
        assert!(Kind::from_u8(0xff).is_none());
    }

    #[test]
    fn kind_classes() {
        assert!(Kind::Bool.is_ordered_by_value());
        assert!(Kind::Float.is_ordered_by_value());
        assert!(Kind::String.is_ordered_by_value());
        assert!(!Kind::Ref.is_ordered_by_value());
        assert!(Kind::Map.is_collection());
        assert!(!Kind::Hash.is_collection());
    }
}
