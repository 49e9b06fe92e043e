//! Unreduced DD shells and the reducer (spec §4.7).
//!
//! `UnreducedBdd`/`UnreducedZdd` hold a scratch DAG built without consulting
//! the manager's unique table: nodes may be structurally redundant (I3/I4
//! can be violated) and no hash-consing happens across separate handles.
//! Grounded on `original_source/include/sbdd2/unreduced_bdd.hpp` /
//! `unreduced_zdd.hpp` — the same "shell with a `reduce()` and a `to_qdd()`"
//! shape, minus the C++ manual `get_copy`/`destruct` lifecycle (Rust's
//! `Clone`/`Drop` on `UArc`/`Rc` already provide that).
//!
//! Comparison operators are intentionally not implemented for the unreduced
//! shells: two unreduced DAGs can encode the same function with different
//! node structure, so `==` would be meaningless.

use std::cell::RefCell;
use std::rc::Rc;

use crate::arc::{Arc as DdArc, FALSE, TRUE};
use crate::common::{HashMap, Var};
use crate::manager::Manager;

/// An edge inside a scratch (unreduced) arena: either a terminal or an
/// index into the arena that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UArc {
    Terminal(bool),
    Node(usize),
}

#[derive(Debug, Clone, Copy)]
struct UNode {
    var: Var,
    low: UArc,
    high: UArc,
}

#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<UNode>,
}

impl Arena {
    fn push(&mut self, var: Var, low: UArc, high: UArc) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(UNode { var, low, high });
        idx
    }
}

/// Copies `root` (and everything it reaches) from `src` into `dst`,
/// returning the corresponding `UArc` in `dst`. A no-op when `src` and
/// `dst` are already the same arena.
fn import(dst: &Rc<RefCell<Arena>>, src: &Rc<RefCell<Arena>>, root: UArc) -> UArc {
    if Rc::ptr_eq(dst, src) {
        return root;
    }
    let idx = match root {
        UArc::Terminal(_) => return root,
        UArc::Node(idx) => idx,
    };
    let (var, low, high) = {
        let s = src.borrow();
        let n = s.nodes[idx];
        (n.var, n.low, n.high)
    };
    let low = import(dst, src, low);
    let high = import(dst, src, high);
    UArc::Node(dst.borrow_mut().push(var, low, high))
}

macro_rules! unreduced_shell {
    ($name:ident, $terminal_low:expr, $terminal_high:expr) => {
        /// Scratch (possibly non-canonical) DD shell; see module docs.
        pub struct $name {
            manager: std::sync::Arc<Manager>,
            arena: Rc<RefCell<Arena>>,
            root: UArc,
        }

        impl $name {
            fn wrap(manager: std::sync::Arc<Manager>, arena: Rc<RefCell<Arena>>, root: UArc) -> Self {
                $name { manager, arena, root }
            }

            pub fn manager(&self) -> &std::sync::Arc<Manager> {
                &self.manager
            }

            fn terminal(manager: &std::sync::Arc<Manager>, value: bool) -> Self {
                Self::wrap(manager.clone(), Rc::new(RefCell::new(Arena::default())), UArc::Terminal(value))
            }

            /// Builds a (possibly redundant) node `var` with the given
            /// children. `low`/`high` must belong to the same manager as
            /// each other; if they come from different scratch arenas both
            /// are copied into a freshly shared one.
            pub fn node(manager: &std::sync::Arc<Manager>, var: Var, low: &Self, high: &Self) -> Self {
                assert!(std::sync::Arc::ptr_eq(manager, &low.manager), "operands belong to different managers");
                assert!(std::sync::Arc::ptr_eq(manager, &high.manager), "operands belong to different managers");
                let arena = if matches!(low.root, UArc::Node(_)) {
                    low.arena.clone()
                } else if matches!(high.root, UArc::Node(_)) {
                    high.arena.clone()
                } else {
                    Rc::new(RefCell::new(Arena::default()))
                };
                let low_ref = import(&arena, &low.arena, low.root);
                let high_ref = import(&arena, &high.arena, high.root);
                let idx = arena.borrow_mut().push(var, low_ref, high_ref);
                Self::wrap(manager.clone(), arena, UArc::Node(idx))
            }

            pub fn low(&self) -> Self {
                match self.root {
                    UArc::Terminal(v) => Self::terminal(&self.manager, v),
                    UArc::Node(idx) => {
                        let low = self.arena.borrow().nodes[idx].low;
                        Self::wrap(self.manager.clone(), self.arena.clone(), low)
                    }
                }
            }

            pub fn high(&self) -> Self {
                match self.root {
                    UArc::Terminal(v) => Self::terminal(&self.manager, v),
                    UArc::Node(idx) => {
                        let high = self.arena.borrow().nodes[idx].high;
                        Self::wrap(self.manager.clone(), self.arena.clone(), high)
                    }
                }
            }

            pub fn is_reduced(&self) -> bool {
                // A scratch shell built through `node()`/factories is
                // reduced only in the degenerate terminal case; a real
                // reduction pass is what `reduce()` performs.
                matches!(self.root, UArc::Terminal(_))
            }

            /// Reduces under a single manager-lock hold that also performs
            /// the result's `inc_ref` and GC check, so the freshly
            /// uniquified root is never left refcount-0 and unprotected
            /// while the lock is briefly dropped between two calls.
            fn reduce_into(&self, is_bdd: bool) -> DdArc {
                let mut memo: HashMap<usize, DdArc> = HashMap::default();
                let mut inner = self.manager.lock();
                let arc = reduce_rec(&mut inner, &self.arena.borrow(), &mut memo, self.root, is_bdd);
                inner.inc_ref(arc);
                inner.maybe_gc();
                arc
            }
        }

        impl Clone for $name {
            fn clone(&self) -> Self {
                Self::wrap(self.manager.clone(), self.arena.clone(), self.root)
            }
        }
    };
}

unreduced_shell!(UnreducedBdd, FALSE, TRUE);
unreduced_shell!(UnreducedZdd, FALSE, FALSE);

impl UnreducedBdd {
    pub fn zero(manager: &std::sync::Arc<Manager>) -> UnreducedBdd {
        UnreducedBdd::terminal(manager, false)
    }

    pub fn one(manager: &std::sync::Arc<Manager>) -> UnreducedBdd {
        UnreducedBdd::terminal(manager, true)
    }

    /// Structural negation: swaps terminal leaves, keeping every
    /// intermediate node's `(var, low, high)` shape untouched (no negation
    /// edges exist in the scratch representation).
    pub fn not(&self) -> UnreducedBdd {
        fn flip(src: &Arena, dst: &mut Arena, memo: &mut HashMap<usize, UArc>, a: UArc) -> UArc {
            match a {
                UArc::Terminal(v) => UArc::Terminal(!v),
                UArc::Node(idx) => {
                    if let Some(&cached) = memo.get(&idx) {
                        return cached;
                    }
                    let n = src.nodes[idx];
                    let low = flip(src, dst, memo, n.low);
                    let high = flip(src, dst, memo, n.high);
                    let out = UArc::Node(dst.push(n.var, low, high));
                    memo.insert(idx, out);
                    out
                }
            }
        }
        let mut dst = Arena::default();
        let mut memo = HashMap::default();
        let root = flip(&self.arena.borrow(), &mut dst, &mut memo, self.root);
        UnreducedBdd::wrap(self.manager.clone(), Rc::new(RefCell::new(dst)), root)
    }

    /// Applies the BDD reduction rule (I3) plus negation-edge
    /// canonicalization (I2) bottom-up, uniquifying through the manager.
    pub fn reduce(&self) -> crate::bdd::Bdd {
        let arc = self.reduce_into(true);
        crate::bdd::Bdd::wrap(self.manager.clone(), arc)
    }

    pub fn to_qdd(&self) -> Qdd {
        Qdd::from_unreduced(&self.manager, &self.arena.borrow(), self.root, true)
    }
}

impl UnreducedZdd {
    pub fn empty(manager: &std::sync::Arc<Manager>) -> UnreducedZdd {
        UnreducedZdd::terminal(manager, false)
    }

    pub fn base(manager: &std::sync::Arc<Manager>) -> UnreducedZdd {
        UnreducedZdd::terminal(manager, true)
    }

    /// Applies the ZDD reduction rule (I4) bottom-up, uniquifying through
    /// the manager.
    pub fn reduce(&self) -> crate::zdd::Zdd {
        let arc = self.reduce_into(false);
        crate::zdd::Zdd::wrap(self.manager.clone(), arc)
    }

    pub fn to_qdd(&self) -> Qdd {
        Qdd::from_unreduced(&self.manager, &self.arena.borrow(), self.root, false)
    }
}

fn reduce_rec(
    inner: &mut crate::manager::ManagerInner,
    arena: &Arena,
    memo: &mut HashMap<usize, DdArc>,
    root: UArc,
    is_bdd: bool,
) -> DdArc {
    match root {
        UArc::Terminal(v) => DdArc::terminal(v),
        UArc::Node(idx) => {
            if let Some(&cached) = memo.get(&idx) {
                return cached;
            }
            let n = arena.nodes[idx];
            let low = reduce_rec(inner, arena, memo, n.low, is_bdd);
            let high = reduce_rec(inner, arena, memo, n.high, is_bdd);
            let result =
                if is_bdd { inner.get_or_create_node_bdd(n.var, low, high) } else { inner.get_or_create_node_zdd(n.var, low, high) };
            memo.insert(idx, result);
            result
        }
    }
}

/// A quasi-reduced DAG: nodes are shared (hash-consed within this `Qdd`
/// alone) but every level between the root and the terminals is
/// materialized, even where the reduction rule would have skipped it
/// (spec §4.7). Lives entirely outside the manager's unique table, since
/// mixing unreduced-shape nodes into the shared table would break I3/I4
/// for everything else stored there.
pub struct Qdd {
    nodes: Vec<UNode>,
    root: UArc,
    n_vars: Var,
}

impl Qdd {
    pub fn height(&self) -> usize {
        self.nodes.len()
    }

    /// Converts an already-canonical `Bdd` straight to quasi-reduced form,
    /// resolving negation edges and re-materializing every skipped level.
    pub fn from_bdd(bdd: &crate::bdd::Bdd) -> Qdd {
        let manager = bdd.manager();
        let n_vars = manager.var_count() as Var;
        let levels: Vec<Var> = (1..=n_vars).map(|l| manager.var_of_level(l)).collect();
        let mut dst = Vec::new();
        let mut memo: HashMap<(DdArc, usize), UArc> = HashMap::default();
        let root = qdd_from_real_rec(manager, bdd.raw_arc(), 0, &levels, &mut dst, &mut memo, true);
        Qdd { nodes: dst, root, n_vars }
    }

    /// Converts an already-canonical `Zdd` straight to quasi-reduced form.
    pub fn from_zdd(zdd: &crate::zdd::Zdd) -> Qdd {
        let manager = zdd.manager();
        let n_vars = manager.var_count() as Var;
        let levels: Vec<Var> = (1..=n_vars).map(|l| manager.var_of_level(l)).collect();
        let mut dst = Vec::new();
        let mut memo: HashMap<(DdArc, usize), UArc> = HashMap::default();
        let root = qdd_from_real_rec(manager, zdd.raw_arc(), 0, &levels, &mut dst, &mut memo, false);
        Qdd { nodes: dst, root, n_vars }
    }

    fn from_unreduced(manager: &std::sync::Arc<Manager>, arena: &Arena, root: UArc, is_bdd: bool) -> Qdd {
        let n_vars = manager.var_count() as Var;
        let mut dst = Vec::new();
        let mut memo: HashMap<(usize, Var), UArc> = HashMap::default();
        let levels: Vec<Var> = (1..=n_vars).map(|l| manager.var_of_level(l)).collect();
        let root = build_qdd_rec(manager, arena, &mut dst, &mut memo, root, 0, &levels, is_bdd);
        Qdd { nodes: dst, root, n_vars }
    }
}

/// `cur_level_idx` is the 0-based index into `levels` of the level about to
/// be materialized. `arc` is the unreduced source edge at or below that
/// level (or a terminal). Every step between `cur_level_idx` and the
/// level `arc` actually lives at gets an explicit pass-through node.
fn build_qdd_rec(
    manager: &std::sync::Arc<Manager>,
    arena: &Arena,
    dst: &mut Vec<UNode>,
    memo: &mut HashMap<(usize, Var), UArc>,
    arc: UArc,
    cur_level_idx: usize,
    levels: &[Var],
    is_bdd: bool,
) -> UArc {
    let (node_var, low, high, is_terminal, terminal_value) = match arc {
        UArc::Terminal(v) => (0, UArc::Terminal(v), UArc::Terminal(v), true, v),
        UArc::Node(idx) => {
            let n = arena.nodes[idx];
            (n.var, n.low, n.high, false, false)
        }
    };
    let target_idx = if is_terminal {
        levels.len()
    } else {
        levels.iter().position(|&v| v == node_var).expect("unreduced node var not registered with manager")
    };
    if cur_level_idx < target_idx {
        // Pass-through: this level is skipped by the source DAG, so both
        // branches continue identically (BDD: don't-care; ZDD would have
        // the high branch forced to empty, handled by the caller already
        // funnelling through `arc` unchanged on both sides here because a
        // quasi-reduced ZDD still must show the variable as "present with
        // probability zero" via an explicit arc1=FALSE node).
        let key = (arc_memo_key(arc), cur_level_idx);
        if let Some(&cached) = memo.get(&key) {
            return cached;
        }
        let var = levels[cur_level_idx];
        let continued = build_qdd_rec(manager, arena, dst, memo, arc, cur_level_idx + 1, levels, is_bdd);
        let high_branch = if is_bdd { continued } else { UArc::Terminal(false) };
        let idx = dst.len();
        dst.push(UNode { var, low: continued, high: high_branch });
        let out = UArc::Node(idx);
        memo.insert(key, out);
        return out;
    }
    if is_terminal {
        return UArc::Terminal(terminal_value);
    }
    let key = (arc_memo_key(arc), cur_level_idx);
    if let Some(&cached) = memo.get(&key) {
        return cached;
    }
    let var = levels[cur_level_idx];
    let low = build_qdd_rec(manager, arena, dst, memo, low, cur_level_idx + 1, levels, is_bdd);
    let high = build_qdd_rec(manager, arena, dst, memo, high, cur_level_idx + 1, levels, is_bdd);
    let idx = dst.len();
    dst.push(UNode { var, low, high });
    let out = UArc::Node(idx);
    memo.insert(key, out);
    out
}

/// Mirror of `build_qdd_rec` that reads directly from the manager's live
/// unique table (resolving BDD negation edges) instead of a scratch arena.
fn qdd_from_real_rec(
    manager: &std::sync::Arc<Manager>,
    arc: DdArc,
    cur_level_idx: usize,
    levels: &[Var],
    dst: &mut Vec<UNode>,
    memo: &mut HashMap<(DdArc, usize), UArc>,
    is_bdd: bool,
) -> UArc {
    if arc.is_constant() {
        let target_idx = levels.len();
        if cur_level_idx < target_idx {
            let key = (arc, cur_level_idx);
            if let Some(&cached) = memo.get(&key) {
                return cached;
            }
            let var = levels[cur_level_idx];
            let continued = qdd_from_real_rec(manager, arc, cur_level_idx + 1, levels, dst, memo, is_bdd);
            let high_branch = if is_bdd { continued } else { UArc::Terminal(false) };
            let idx = dst.len();
            dst.push(UNode { var, low: continued, high: high_branch });
            let out = UArc::Node(idx);
            memo.insert(key, out);
            return out;
        }
        return UArc::Terminal(arc.terminal_value());
    }
    let inner = manager.lock();
    let node = *inner.node(arc.index());
    drop(inner);
    let (low, high) = if is_bdd && arc.is_negated() { (node.low.negated(), node.high.negated()) } else { (node.low, node.high) };
    let target_idx = levels.iter().position(|&v| v == node.var).expect("node var not registered with manager");
    if cur_level_idx < target_idx {
        let key = (arc, cur_level_idx);
        if let Some(&cached) = memo.get(&key) {
            return cached;
        }
        let var = levels[cur_level_idx];
        let continued = qdd_from_real_rec(manager, arc, cur_level_idx + 1, levels, dst, memo, is_bdd);
        let high_branch = if is_bdd { continued } else { UArc::Terminal(false) };
        let idx = dst.len();
        dst.push(UNode { var, low: continued, high: high_branch });
        let out = UArc::Node(idx);
        memo.insert(key, out);
        return out;
    }
    let key = (arc, cur_level_idx);
    if let Some(&cached) = memo.get(&key) {
        return cached;
    }
    let var = levels[cur_level_idx];
    let low = qdd_from_real_rec(manager, low, cur_level_idx + 1, levels, dst, memo, is_bdd);
    let high = qdd_from_real_rec(manager, high, cur_level_idx + 1, levels, dst, memo, is_bdd);
    let idx = dst.len();
    dst.push(UNode { var, low, high });
    let out = UArc::Node(idx);
    memo.insert(key, out);
    out
}

fn arc_memo_key(arc: UArc) -> usize {
    match arc {
        UArc::Terminal(false) => usize::MAX,
        UArc::Terminal(true) => usize::MAX - 1,
        UArc::Node(idx) => idx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdd::Bdd;
    use crate::zdd::Zdd;

    #[test]
    fn unreduced_bdd_reduce_skips_redundant_node() {
        let m = Manager::new();
        let v1 = m.new_var();
        let one = UnreducedBdd::one(&m);
        let zero = UnreducedBdd::zero(&m);
        // node(v1, one, one) is redundant: low == high.
        let redundant = UnreducedBdd::node(&m, v1, &one, &one);
        let reduced = redundant.reduce();
        assert!(reduced.is_one());

        let proper = UnreducedBdd::node(&m, v1, &zero, &one);
        assert_eq!(proper.reduce(), Bdd::var(&m, v1));
    }

    #[test]
    fn unreduced_zdd_reduce_skips_dead_branch() {
        let m = Manager::new();
        let v1 = m.new_var();
        let base = UnreducedZdd::base(&m);
        let empty = UnreducedZdd::empty(&m);
        let dead = UnreducedZdd::node(&m, v1, &base, &empty);
        assert!(dead.reduce().is_base());

        let proper = UnreducedZdd::node(&m, v1, &empty, &base);
        assert_eq!(proper.reduce(), Zdd::singleton(&m, v1));
    }

    #[test]
    fn not_then_reduce_matches_bdd_not() {
        let m = Manager::new();
        let v1 = m.new_var();
        let zero = UnreducedBdd::zero(&m);
        let one = UnreducedBdd::one(&m);
        let f = UnreducedBdd::node(&m, v1, &zero, &one);
        let negated = f.not().reduce();
        assert_eq!(negated, Bdd::var(&m, v1).not());
    }

    #[test]
    fn qdd_from_reduced_bdd_materializes_every_level() {
        let m = Manager::new();
        let v1 = m.new_var();
        let _v2 = m.new_var();
        let f = Bdd::var(&m, v1);
        let qdd = Qdd::from_bdd(&f);
        assert_eq!(qdd.height(), 2);
    }

    #[test]
    fn to_qdd_materializes_every_level() {
        let m = Manager::new();
        let v1 = m.new_var();
        let _v2 = m.new_var();
        let zero = UnreducedBdd::zero(&m);
        let one = UnreducedBdd::one(&m);
        // Depends only on v1, so the reduced form has exactly one node, but
        // the quasi-reduced form must still show a pass-through at v2.
        let f = UnreducedBdd::node(&m, v1, &zero, &one);
        let qdd = f.to_qdd();
        assert_eq!(qdd.height(), 2);
    }
}
