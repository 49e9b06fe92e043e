//! Unique table (spec §4.2, I1): a stable node arena plus a dedup index.
//!
//! The arena is append-or-reuse-free-slot, so a node's `NodeIndex` — and
//! every `Arc` built from it — stays valid across GC and resize. The dedup
//! index is a separate open-addressed array, keyed by `(var, low, high)`
//! and quadratically probed with explicit tombstones distinct from empty
//! slots; it only ever stores `NodeIndex` values, so it can be freely
//! rehashed without touching anything the rest of the crate holds onto.

use std::hash::{Hash, Hasher};

use wyhash::WyHash;

use crate::arc::Arc;
use crate::common::{NodeIndex, Var};
use crate::node::Node;

const DEFAULT_ARENA_CAPACITY: usize = 1 << 16;
const DEFAULT_INDEX_CAPACITY: usize = 1 << 20;
const MAX_LOAD_FACTOR: f64 = 0.75;

enum ArenaSlot {
    Node(Node),
    /// Free-list link: index of the next free slot, or `u32::MAX` at the
    /// end of the chain.
    Free(u32),
}

#[derive(Clone, Copy)]
enum IndexSlot {
    Empty,
    Tombstone,
    Occupied(NodeIndex),
}

pub struct UniqueTable {
    arena: Vec<ArenaSlot>,
    free_head: u32,
    live_count: usize,
    index: Vec<IndexSlot>,
    index_mask: u64,
    index_occupied: usize,
    index_tombstones: usize,
}

const NO_FREE: u32 = u32::MAX;

fn hash_identity(var: Var, low: Arc, high: Arc) -> u64 {
    let mut hasher = WyHash::default();
    var.hash(&mut hasher);
    low.hash(&mut hasher);
    high.hash(&mut hasher);
    hasher.finish()
}

impl UniqueTable {
    pub fn new() -> UniqueTable {
        UniqueTable::with_capacity(DEFAULT_ARENA_CAPACITY, DEFAULT_INDEX_CAPACITY)
    }

    pub fn with_capacity(arena_capacity: usize, index_capacity: usize) -> UniqueTable {
        let index_capacity = index_capacity.next_power_of_two().max(16);
        UniqueTable {
            arena: Vec::with_capacity(arena_capacity),
            free_head: NO_FREE,
            live_count: 0,
            index: vec![IndexSlot::Empty; index_capacity],
            index_mask: (index_capacity - 1) as u64,
            index_occupied: 0,
            index_tombstones: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    pub fn index_capacity(&self) -> usize {
        self.index.len()
    }

    pub fn load_factor(&self) -> f64 {
        (self.index_occupied + self.index_tombstones) as f64 / self.index.len() as f64
    }

    pub fn needs_resize(&self) -> bool {
        self.load_factor() > MAX_LOAD_FACTOR
    }

    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        match self.arena.get(index as usize) {
            Some(ArenaSlot::Node(node)) => Some(node),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut Node> {
        match self.arena.get_mut(index as usize) {
            Some(ArenaSlot::Node(node)) => Some(node),
            _ => None,
        }
    }

    fn index_probe(&self, start: u64, i: u64) -> usize {
        (start.wrapping_add(i * (i + 1) / 2) & self.index_mask) as usize
    }

    fn index_find_slot(&self, var: Var, low: Arc, high: Arc) -> Option<usize> {
        let start = hash_identity(var, low, high) & self.index_mask;
        let mut i = 0u64;
        loop {
            let slot = self.index_probe(start, i);
            match self.index[slot] {
                IndexSlot::Empty => return None,
                IndexSlot::Tombstone => {}
                IndexSlot::Occupied(node_index) => {
                    if let Some(node) = self.get(node_index) {
                        if node.identity() == (var, low, high) {
                            return Some(slot);
                        }
                    }
                }
            }
            i += 1;
            if (i as usize) > self.index.len() {
                return None;
            }
        }
    }

    fn alloc_arena_slot(&mut self, node: Node) -> NodeIndex {
        if self.free_head != NO_FREE {
            let idx = self.free_head;
            self.free_head = match self.arena[idx as usize] {
                ArenaSlot::Free(next) => next,
                ArenaSlot::Node(_) => unreachable!("free list pointed at a live node"),
            };
            self.arena[idx as usize] = ArenaSlot::Node(node);
            idx
        } else {
            let idx = self.arena.len() as NodeIndex;
            self.arena.push(ArenaSlot::Node(node));
            idx
        }
    }

    fn index_insert(&mut self, var: Var, low: Arc, high: Arc, node_index: NodeIndex) {
        let start = hash_identity(var, low, high) & self.index_mask;
        let mut first_tombstone: Option<usize> = None;
        let mut i = 0u64;
        loop {
            let slot = self.index_probe(start, i);
            match self.index[slot] {
                IndexSlot::Empty => {
                    let target = first_tombstone.unwrap_or(slot);
                    if target == slot {
                        self.index_occupied += 1;
                    } else {
                        self.index_tombstones -= 1;
                        self.index_occupied += 1;
                    }
                    self.index[target] = IndexSlot::Occupied(node_index);
                    return;
                }
                IndexSlot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(slot);
                    }
                }
                IndexSlot::Occupied(_) => {}
            }
            i += 1;
            debug_assert!((i as usize) <= self.index.len(), "dedup index probe exceeded capacity");
        }
    }

    /// Looks up `(var, low, high)`, allocating a fresh node if absent.
    /// Returns a stable `NodeIndex` either way.
    pub fn find_or_insert(&mut self, var: Var, low: Arc, high: Arc) -> NodeIndex {
        if let Some(slot) = self.index_find_slot(var, low, high) {
            if let IndexSlot::Occupied(node_index) = self.index[slot] {
                return node_index;
            }
        }
        let node_index = self.alloc_arena_slot(Node::new(var, low, high));
        self.live_count += 1;
        self.index_insert(var, low, high, node_index);
        if self.needs_resize() {
            self.rehash_index(self.index.len() * 2);
        }
        node_index
    }

    /// Frees the arena slot at `index`, returning it to the free list, and
    /// removes its dedup-index entry. Used by GC's sweep phase.
    pub fn free(&mut self, index: NodeIndex) {
        let node = match std::mem::replace(&mut self.arena[index as usize], ArenaSlot::Free(self.free_head)) {
            ArenaSlot::Node(node) => node,
            ArenaSlot::Free(_) => {
                // Already free; undo the replace and bail.
                self.arena[index as usize] = ArenaSlot::Free(self.free_head);
                return;
            }
        };
        self.free_head = index;
        self.live_count -= 1;
        if let Some(slot) = self.index_find_slot(node.var, node.low, node.high) {
            self.index[slot] = IndexSlot::Tombstone;
            self.index_occupied -= 1;
            self.index_tombstones += 1;
        }
    }

    /// Rebuilds the dedup index at `new_capacity` from the arena's live
    /// nodes. Arena positions (and therefore every outstanding `Arc`) are
    /// untouched.
    pub fn rehash_index(&mut self, new_capacity: usize) {
        let new_capacity = new_capacity.next_power_of_two().max(16);
        self.index = vec![IndexSlot::Empty; new_capacity];
        self.index_mask = (new_capacity - 1) as u64;
        self.index_occupied = 0;
        self.index_tombstones = 0;
        let live: Vec<(NodeIndex, Var, Arc, Arc)> = self
            .arena
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                ArenaSlot::Node(n) => Some((i as NodeIndex, n.var, n.low, n.high)),
                ArenaSlot::Free(_) => None,
            })
            .collect();
        for (node_index, var, low, high) in live {
            self.index_insert(var, low, high, node_index);
        }
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.arena.iter().enumerate().filter_map(|(i, slot)| match slot {
            ArenaSlot::Node(node) => Some((i as NodeIndex, node)),
            ArenaSlot::Free(_) => None,
        })
    }
}

impl Default for UniqueTable {
    fn default() -> UniqueTable {
        UniqueTable::new()
    }
}
