//! Dirty-set of configuration fields awaiting commit to the device.

use crate::field::Field;
use std::collections::BTreeSet;

/// Fields changed locally since the last successful set sequence.
///
/// Marks are sticky: restoring a field to its device value does not unmark
/// it. Only a fully successful commit clears the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    dirty: BTreeSet<Field>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the field was not already marked.
    pub fn mark(&mut self, field: Field) -> bool {
        self.dirty.insert(field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.dirty.contains(&field)
    }

    pub fn clear(&mut self) {
        self.dirty.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        self.dirty.iter().copied()
    }
}
