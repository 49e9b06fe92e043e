//! Operation cache: a fixed-size, power-of-two, direct-mapped table with one
//! entry per slot (spec §4.3). A collision simply overwrites whatever was
//! there; there is no probing and no eviction policy beyond "last write
//! wins" — this is a performance cache, not a source of truth, so a wrong
//! hit would be a correctness bug and a missed hit only costs recomputation.

use std::hash::{Hash, Hasher};

use wyhash::WyHash;

use crate::arc::Arc;

const DEFAULT_CAPACITY: usize = 1 << 18;

/// Identifies which recursive algorithm produced a cached result, so that
/// `and(f, g)` and `or(f, g)` (or a BDD op and a ZDD op reusing the same
/// operand pair) never collide on meaning even if their hash collides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    And,
    Or,
    Xor,
    Diff,
    Ite,
    Restrict,
    Compose,
    Exist,
    Forall,
    Count,
    Support,
    ZddUnion,
    ZddIntersect,
    ZddDiff,
    ZddProduct,
    ZddQuotient,
    ZddRemainder,
    ZddOnset,
    ZddOffset,
    ZddChange,
    ZddCard,
    /// Reserved for application-wrapper custom ops (spec §4.3, §6); the core
    /// never produces one itself.
    Custom(u32),
}

#[derive(Clone, Copy)]
struct Entry {
    tag: u64,
    op: OpCode,
    key1: Arc,
    key2: Arc,
    key3: Arc,
    result: Arc,
}

pub struct OpCache {
    entries: Vec<Option<Entry>>,
    mask: u64,
    hits: u64,
    misses: u64,
}

fn slot_hash(op: OpCode, key1: Arc, key2: Arc, key3: Arc) -> u64 {
    let mut hasher = WyHash::default();
    op.hash(&mut hasher);
    key1.hash(&mut hasher);
    key2.hash(&mut hasher);
    key3.hash(&mut hasher);
    hasher.finish()
}

impl OpCache {
    pub fn new() -> OpCache {
        OpCache::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> OpCache {
        let capacity = capacity.next_power_of_two().max(16);
        OpCache {
            entries: vec![None; capacity],
            mask: (capacity - 1) as u64,
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Looks up a binary operation `op(key1, key2)`.
    pub fn get(&mut self, op: OpCode, key1: Arc, key2: Arc) -> Option<Arc> {
        self.get3(op, key1, key2, Arc::terminal(false))
    }

    /// Looks up a ternary operation `op(key1, key2, key3)` (e.g. ITE).
    pub fn get3(&mut self, op: OpCode, key1: Arc, key2: Arc, key3: Arc) -> Option<Arc> {
        let tag = slot_hash(op, key1, key2, key3);
        let slot = (tag & self.mask) as usize;
        match &self.entries[slot] {
            Some(e) if e.tag == tag && e.op == op && e.key1 == key1 && e.key2 == key2 && e.key3 == key3 => {
                self.hits += 1;
                Some(e.result)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, op: OpCode, key1: Arc, key2: Arc, result: Arc) {
        self.insert3(op, key1, key2, Arc::terminal(false), result);
    }

    pub fn insert3(&mut self, op: OpCode, key1: Arc, key2: Arc, key3: Arc, result: Arc) {
        let tag = slot_hash(op, key1, key2, key3);
        let slot = (tag & self.mask) as usize;
        self.entries[slot] = Some(Entry { tag, op, key1, key2, key3, result });
    }

    /// Drops every entry. Called by the manager whenever the unique table's
    /// node indices are remapped (a cached `Arc` would otherwise point at
    /// the wrong node after a GC rebuild).
    pub fn clear(&mut self) {
        for e in self.entries.iter_mut() {
            *e = None;
        }
        self.hits = 0;
        self.misses = 0;
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl Default for OpCache {
    fn default() -> OpCache {
        OpCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::{FALSE, TRUE};

    #[test]
    fn insert_then_get_hits() {
        let mut c = OpCache::with_capacity(16);
        c.insert(OpCode::And, TRUE, FALSE, FALSE);
        assert_eq!(c.get(OpCode::And, TRUE, FALSE), Some(FALSE));
    }

    #[test]
    fn different_opcode_same_operands_is_a_miss() {
        let mut c = OpCache::with_capacity(16);
        c.insert(OpCode::And, TRUE, FALSE, FALSE);
        assert_eq!(c.get(OpCode::Or, TRUE, FALSE), None);
    }

    #[test]
    fn clear_drops_everything() {
        let mut c = OpCache::with_capacity(16);
        c.insert(OpCode::And, TRUE, FALSE, FALSE);
        c.clear();
        assert_eq!(c.get(OpCode::And, TRUE, FALSE), None);
    }
}
