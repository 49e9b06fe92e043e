//! Node record stored in the manager's unique table (spec §3, invariants
//! I1–I6).

use crate::arc::Arc;
use crate::common::Var;

/// Bookkeeping carried alongside every non-terminal node, separate from the
/// two edges so that GC and the reducer can mutate it without touching the
/// node's identity (its `(var, low, high)` triple).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMeta {
    /// Set once the node has passed through `reduce()`; an unreduced scratch
    /// node (spec §4.7) never appears in the shared unique table with this
    /// flag false.
    pub reduced: bool,
    /// Count of live `Arc`s (from other nodes, from the reserved root set,
    /// and from outstanding `Bdd`/`Zdd` handles) referring to this node.
    /// The mark phase of GC treats every node with `refcount > 0` as a root.
    pub refcount: u32,
}

impl NodeMeta {
    pub fn new() -> NodeMeta {
        NodeMeta { reduced: true, refcount: 0 }
    }
}

impl Default for NodeMeta {
    fn default() -> NodeMeta {
        NodeMeta::new()
    }
}

/// A non-terminal node: a variable and its two children. The high edge is
/// never negated in storage (I2) — negation of the "1" branch is pushed
/// onto the node's incoming arcs instead, so two logically complementary
/// functions always share one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub var: Var,
    pub low: Arc,
    pub high: Arc,
    pub meta: NodeMeta,
}

impl Node {
    pub fn new(var: Var, low: Arc, high: Arc) -> Node {
        debug_assert!(!high.is_negated(), "high edge must be stored un-negated (I2)");
        Node { var, low, high, meta: NodeMeta::new() }
    }

    /// The `(var, low, high)` identity used as the unique-table key. Two
    /// nodes with the same identity are the same node (I1).
    #[inline]
    pub fn identity(&self) -> (Var, Arc, Arc) {
        (self.var, self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::{FALSE, TRUE};

    #[test]
    fn high_edge_never_negated() {
        let n = Node::new(1, FALSE, TRUE);
        assert!(!n.high.is_negated());
    }

    #[test]
    fn identity_is_var_low_high() {
        let a = Node::new(3, FALSE, TRUE);
        let b = Node::new(3, FALSE, TRUE);
        assert_eq!(a.identity(), b.identity());
    }
}
