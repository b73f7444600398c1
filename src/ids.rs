// 4.0: id allocation. ids must come out the same when the same command
// sequence is re-driven, so allocation is a pure counter per entity kind.

use crate::types::EntityKind;
use std::collections::BTreeMap;

pub trait IdGenerator {
    fn next_id(&mut self, kind: EntityKind) -> u64;
}

/// Monotonic per-kind counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialIds {
    first: u64,
    next: BTreeMap<EntityKind, u64>,
}

impl SequentialIds {
    pub fn new(first: u64) -> Self {
        Self {
            first,
            next: BTreeMap::new(),
        }
    }

    /// The id the next allocation for `kind` would return.
    pub fn peek(&self, kind: EntityKind) -> u64 {
        self.next.get(&kind).copied().unwrap_or(self.first)
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new(1)
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, kind: EntityKind) -> u64 {
        let slot = self.next.entry(kind).or_insert(self.first);
        let id = *slot;
        *slot += 1;
        id
    }
}
