// src/sequence/empty.rs

use crate::common::Format;
use crate::error::{Result, SequenceError};

/// Placeholder sequence inhabiting positions where a subtree range has been
/// truncated away. Carries only its level and format; every value-emitting
/// accessor is a structural violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptySequence {
    level: u64,
    format: Format,
}

impl EmptySequence {
    pub fn new(level: u64, format: Format) -> EmptySequence {
        EmptySequence { level, format }
    }

    pub fn tree_level(&self) -> u64 {
        self.level
    }

    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }

    pub fn num_leaves(&self) -> u64 {
        0
    }

    pub fn seq_len(&self) -> usize {
        0
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Only the degenerate call shape is allowed: descending one level from
    /// an internal placeholder with an empty range.
    pub fn get_composite_child_sequence(
        &self,
        start: usize,
        length: usize,
    ) -> Result<EmptySequence> {
        if self.level == 0 {
            return Err(SequenceError::StructuralViolation(
                "empty leaf sequence has no children".to_string(),
            ));
        }
        if start != 0 || length != 0 {
            return Err(SequenceError::StructuralViolation(format!(
                "empty sequence only yields the empty composite, got start {start} length {length}"
            )));
        }
        Ok(EmptySequence::new(self.level - 1, self.format))
    }

    pub(super) fn violation(&self, op: &str) -> SequenceError {
        SequenceError::StructuralViolation(format!("{op} called on an empty sequence"))
    }
}
