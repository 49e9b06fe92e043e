//! Indexed order over a ZDD's family (spec §4.10): a lazily built, per-node
//! cardinality table that turns set enumeration, ranking, and weighted
//! extrema into O(height) lookups instead of a full traversal each time.
//!
//! Grounded on `original_source/src/zdd_index.cpp`'s `build_index_impl`: BFS
//! from the root to collect every reachable node and the deepest level it
//! touches, bucket nodes by level, then walk from the deepest level back up
//! to the root computing `count[node] = count[low] + count[high]` (with the
//! EMPTY terminal at 0 and the BASE terminal at 1). That file only builds
//! the count table; the ranking (`order_of`/`get_set`) and weighted-extrema
//! operations are this module's own extension of the same bottom-up table,
//! following the combinatorial-ranking technique standard for ZDD indexing
//! (subtract the "choose low" branch's count to learn whether a target rank
//! falls in the low or high half). The C++ source carries a separate
//! f64-count/GMP-exact split because GMP is optional there; this crate
//! always has `num-bigint`, so `ZddIndex` only stores exact counts.

use std::collections::VecDeque;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::arc::{Arc, FALSE, TRUE};
use crate::common::{HashMap, HashSet, Level, Var};
use crate::zdd::Zdd;

struct NodeShape {
    var: Var,
    level: Level,
    low: Arc,
    high: Arc,
}

/// The lazily built cardinality table backing `Zdd`'s indexed-order
/// operations.
pub struct ZddIndex {
    root: Arc,
    height: Level,
    /// Reachable non-terminal nodes, keyed by arc, for O(1) structural
    /// lookups during ranking.
    nodes: HashMap<Arc, NodeShape>,
    /// Reachable nodes grouped by level, in BFS discovery order; level 0 is
    /// unused (levels are 1-indexed, matching `VarOrder`).
    by_level: Vec<Vec<Arc>>,
    /// Exact count of sets in the sub-family rooted at `arc`, including the
    /// two terminals.
    count: HashMap<Arc, BigUint>,
}

impl ZddIndex {
    /// Builds the table by walking the manager's live unique table — not
    /// the public ZDD algebra — since this is purely a read-only traversal
    /// of already-reduced nodes the manager already owns.
    pub fn build(zdd: &Zdd) -> ZddIndex {
        let root = zdd.raw_arc();
        let inner = zdd.manager().lock();

        let mut count: HashMap<Arc, BigUint> = HashMap::default();
        count.insert(FALSE, BigUint::zero());
        count.insert(TRUE, BigUint::one());

        if root.is_constant() {
            return ZddIndex { root, height: 0, nodes: HashMap::default(), by_level: Vec::new(), count };
        }

        let root_level = inner.varorder.level_of(inner.node(root.index()).var);
        let mut max_level = root_level;
        let mut visited: HashSet<Arc> = HashSet::default();
        let mut nodes: HashMap<Arc, NodeShape> = HashMap::default();
        let mut queue: VecDeque<Arc> = VecDeque::new();

        visited.insert(root);
        queue.push_back(root);

        while let Some(arc) = queue.pop_front() {
            let raw = *inner.node(arc.index());
            let level = inner.varorder.level_of(raw.var);
            max_level = max_level.max(level);
            nodes.insert(arc, NodeShape { var: raw.var, level, low: raw.low, high: raw.high });
            for child in [raw.low, raw.high] {
                if child.is_constant() || !visited.insert(child) {
                    continue;
                }
                queue.push_back(child);
            }
        }

        let mut by_level: Vec<Vec<Arc>> = (0..=max_level as usize).map(|_| Vec::new()).collect();
        for (&arc, shape) in &nodes {
            by_level[shape.level as usize].push(arc);
        }

        for level in (root_level..=max_level).rev() {
            for &arc in &by_level[level as usize] {
                let shape = &nodes[&arc];
                let c0 = count.get(&shape.low).cloned().unwrap_or_else(BigUint::zero);
                let c1 = count.get(&shape.high).cloned().unwrap_or_else(BigUint::zero);
                count.insert(arc, c0 + c1);
            }
        }

        ZddIndex { root, height: max_level, nodes, by_level, count }
    }

    pub fn height(&self) -> Level {
        self.height
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn size_at_level(&self, level: Level) -> usize {
        self.by_level.get(level as usize).map(|l| l.len()).unwrap_or(0)
    }

    pub fn exact_count(&self) -> BigUint {
        self.count.get(&self.root).cloned().unwrap_or_else(BigUint::zero)
    }

    pub fn count(&self) -> u64 {
        self.exact_count().to_u64().unwrap_or(u64::MAX)
    }

    fn count_of(&self, arc: Arc) -> BigUint {
        self.count.get(&arc).cloned().unwrap_or_else(BigUint::zero)
    }

    /// The rank of `set` within this family's indexed enumeration order.
    /// Returns `None` if `set` is not a member of the family.
    pub fn order_of(&self, set: &[Var]) -> Option<u64> {
        let mut remaining: HashSet<Var> = set.iter().copied().collect();
        let mut cur = self.root;
        let mut rank = BigUint::zero();
        loop {
            if cur == TRUE {
                return if remaining.is_empty() { rank.to_u64() } else { None };
            }
            if cur == FALSE {
                return None;
            }
            let shape = self.nodes.get(&cur)?;
            if remaining.remove(&shape.var) {
                rank += self.count_of(shape.low);
                cur = shape.high;
            } else {
                cur = shape.low;
            }
        }
    }

    /// The `rank`-th set in indexed enumeration order, or `None` if `rank`
    /// is out of range.
    pub fn get_set(&self, rank: u64) -> Option<Vec<Var>> {
        if BigUint::from(rank) >= self.exact_count() {
            return None;
        }
        let mut remaining = BigUint::from(rank);
        let mut cur = self.root;
        let mut set = Vec::new();
        while cur != TRUE {
            let shape = self.nodes.get(&cur)?;
            let low_count = self.count_of(shape.low);
            if remaining < low_count {
                cur = shape.low;
            } else {
                remaining -= low_count;
                set.push(shape.var);
                cur = shape.high;
            }
        }
        Some(set)
    }

    /// A uniformly random member set, drawn by sampling a rank uniformly in
    /// `[0, count)` (exact, via rejection sampling against a `u64` range
    /// when the count exceeds `u64::MAX`, which only the degenerate case
    /// does in practice since a reduced ZDD's arena is `u32`-indexed).
    pub fn random_set<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec<Var>> {
        let total = self.count();
        if total == 0 {
            return None;
        }
        let rank = rng.gen_range(0..total);
        self.get_set(rank)
    }

    /// Sum, over every set in the family, of the sum of `weight(v)` for each
    /// `v` in that set. Computed bottom-up alongside `count`:
    /// `weight_sum(node) = weight_sum(low) + weight_sum(high) +
    /// weight(node.var) * count(high)`, since exactly `count(high)` of the
    /// sets passing through `node` contain `node.var`.
    pub fn sum_weight(&self, weight: impl Fn(Var) -> f64) -> f64 {
        self.fold_weight(&weight, |low_sum, high_sum, w, count_high| low_sum + high_sum + w * count_high)
    }

    /// The maximum, over every set in the family, of the sum of weights of
    /// its members, together with the (a) member set achieving it. `None`
    /// for the empty family.
    pub fn max_weight(&self, weight: impl Fn(Var) -> f64) -> Option<(f64, Vec<Var>)> {
        let (value, choice) = self.fold_extremum(&weight, |high, low| high > low)?;
        Some((value, self.witness_from_choice(&choice)))
    }

    /// The minimum, over every set in the family, of the sum of weights of
    /// its members, together with the (a) member set achieving it. `None`
    /// for the empty family.
    pub fn min_weight(&self, weight: impl Fn(Var) -> f64) -> Option<(f64, Vec<Var>)> {
        let (value, choice) = self.fold_extremum(&weight, |high, low| high < low)?;
        Some((value, self.witness_from_choice(&choice)))
    }

    fn fold_weight(
        &self,
        weight: &impl Fn(Var) -> f64,
        combine: impl Fn(f64, f64, f64, f64) -> f64,
    ) -> f64 {
        let mut memo: HashMap<Arc, f64> = HashMap::default();
        memo.insert(FALSE, 0.0);
        memo.insert(TRUE, 0.0);
        if self.root.is_constant() {
            return *memo.get(&self.root).unwrap();
        }
        for level in (1..=self.height).rev() {
            for &arc in &self.by_level[level as usize] {
                let shape = &self.nodes[&arc];
                let low_sum = *memo.get(&shape.low).unwrap_or(&0.0);
                let high_sum = *memo.get(&shape.high).unwrap_or(&0.0);
                let count_high = self.count_of(shape.high).to_f64().unwrap_or(f64::INFINITY);
                memo.insert(arc, combine(low_sum, high_sum, weight(shape.var), count_high));
            }
        }
        *memo.get(&self.root).unwrap_or(&0.0)
    }

    /// Bottom-up extremum over member weight-sums. A terminal/subtree with
    /// zero members contributes no candidate, so it must not be allowed to
    /// win the `min`/`max` against a subtree that does have members.
    /// `better(high_candidate, low_candidate)` picks whether taking the
    /// high branch (and so including `shape.var`) beats taking the low
    /// branch. Returns the extremal value alongside the bottom-up table of
    /// which branch won at each visited node, so the witnessing member set
    /// can be replayed top-down from the root afterward.
    fn fold_extremum(
        &self,
        weight: &impl Fn(Var) -> f64,
        better: impl Fn(f64, f64) -> bool,
    ) -> Option<(f64, HashMap<Arc, bool>)> {
        if self.count() == 0 {
            return None;
        }
        let mut memo: HashMap<Arc, f64> = HashMap::default();
        let mut choice: HashMap<Arc, bool> = HashMap::default();
        memo.insert(TRUE, 0.0);
        if self.root == TRUE {
            return Some((0.0, choice));
        }
        for level in (1..=self.height).rev() {
            for &arc in &self.by_level[level as usize] {
                let shape = &self.nodes[&arc];
                let low_has_members = self.count_of(shape.low) > BigUint::zero();
                let high_has_members = self.count_of(shape.high) > BigUint::zero();
                let (value, take_high) = match (low_has_members, high_has_members) {
                    (true, true) => {
                        let low_value = memo[&shape.low];
                        let high_value = weight(shape.var) + memo[&shape.high];
                        if better(high_value, low_value) {
                            (high_value, true)
                        } else {
                            (low_value, false)
                        }
                    }
                    (true, false) => (memo[&shape.low], false),
                    (false, true) => (weight(shape.var) + memo[&shape.high], true),
                    (false, false) => unreachable!("a reachable node always has at least one non-empty branch"),
                };
                memo.insert(arc, value);
                choice.insert(arc, take_high);
            }
        }
        memo.get(&self.root).copied().map(|value| (value, choice))
    }

    /// Replays a `fold_extremum` choice table top-down from the root to
    /// recover the member set it witnesses.
    fn witness_from_choice(&self, choice: &HashMap<Arc, bool>) -> Vec<Var> {
        let mut set = Vec::new();
        let mut cur = self.root;
        while cur != TRUE {
            let shape = &self.nodes[&cur];
            if choice[&cur] {
                set.push(shape.var);
                cur = shape.high;
            } else {
                cur = shape.low;
            }
        }
        set
    }

    /// Iterates every set in the family in ascending indexed rank order.
    /// Takes `self` by `Arc` so the returned iterator owns its data instead
    /// of borrowing from a temporary.
    pub fn into_dictionary_iter(self: std::sync::Arc<Self>) -> DictionaryIter {
        let total = self.exact_count();
        DictionaryIter { index: self, next: BigUint::zero(), total, descending: false }
    }

    /// Iterates every set in the family in descending indexed rank order.
    pub fn into_dictionary_iter_rev(self: std::sync::Arc<Self>) -> DictionaryIter {
        let total = self.exact_count();
        DictionaryIter { index: self, next: BigUint::zero(), total, descending: true }
    }

    /// Every member set paired with its total weight, sorted by that weight
    /// (ascending, or descending when `descending` is set). The family is
    /// fully enumerated and sorted up front — there is no indexed shortcut
    /// to the k-th lightest/heaviest set the way there is for dictionary
    /// rank, since weight order has no relationship to the variable order
    /// the table is built over.
    fn weight_sorted_sets(&self, weight: &impl Fn(Var) -> f64, descending: bool) -> Vec<Vec<Var>> {
        let total = self.count();
        let mut items: Vec<(f64, Vec<Var>)> = (0..total)
            .map(|rank| {
                let set = self.get_set(rank).expect("rank in range");
                let w = set.iter().map(|&v| weight(v)).sum();
                (w, set)
            })
            .collect();
        items.sort_by(|a, b| {
            let ord = a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        items.into_iter().map(|(_, set)| set).collect()
    }

    /// Iterates every set in the family in ascending total-weight order
    /// (lightest first).
    pub fn into_weight_ascending_iter(self: std::sync::Arc<Self>, weight: impl Fn(Var) -> f64) -> WeightOrderIter {
        let sets = self.weight_sorted_sets(&weight, false);
        WeightOrderIter { sets: sets.into_iter() }
    }

    /// Iterates every set in the family in descending total-weight order
    /// (heaviest first).
    pub fn into_weight_descending_iter(self: std::sync::Arc<Self>, weight: impl Fn(Var) -> f64) -> WeightOrderIter {
        let sets = self.weight_sorted_sets(&weight, true);
        WeightOrderIter { sets: sets.into_iter() }
    }

    /// Iterates every set in the family exactly once, in a uniformly random
    /// order: an O(n)-space Fisher-Yates shuffle of the `0..count` rank
    /// space, materialized once up front rather than `random_set`'s
    /// with-replacement sampling.
    pub fn into_random_order_iter<R: Rng + ?Sized>(self: std::sync::Arc<Self>, rng: &mut R) -> RandomOrderIter {
        let total = self.count();
        let mut ranks: Vec<u64> = (0..total).collect();
        ranks.shuffle(rng);
        RandomOrderIter { index: self, ranks: ranks.into_iter() }
    }
}

/// Enumerates every set of the family in ascending or descending rank
/// order.
pub struct DictionaryIter {
    index: std::sync::Arc<ZddIndex>,
    next: BigUint,
    total: BigUint,
    descending: bool,
}

impl Iterator for DictionaryIter {
    type Item = Vec<Var>;

    fn next(&mut self) -> Option<Vec<Var>> {
        if self.next >= self.total {
            return None;
        }
        let rank =
            if self.descending { self.total.clone() - BigUint::one() - self.next.clone() } else { self.next.clone() };
        let rank = rank.to_u64().expect("rank fits u64 within the indexable range");
        self.next += BigUint::one();
        self.index.get_set(rank)
    }
}

/// Enumerates every set of the family once, sorted by total member weight.
pub struct WeightOrderIter {
    sets: std::vec::IntoIter<Vec<Var>>,
}

impl Iterator for WeightOrderIter {
    type Item = Vec<Var>;

    fn next(&mut self) -> Option<Vec<Var>> {
        self.sets.next()
    }
}

/// Enumerates every set of the family exactly once in a uniformly random
/// order.
pub struct RandomOrderIter {
    index: std::sync::Arc<ZddIndex>,
    ranks: std::vec::IntoIter<u64>,
}

impl Iterator for RandomOrderIter {
    type Item = Vec<Var>;

    fn next(&mut self) -> Option<Vec<Var>> {
        let rank = self.ranks.next()?;
        self.index.get_set(rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::Manager;

    fn power_set(m: &std::sync::Arc<Manager>, n: usize) -> Zdd {
        let mut family = Zdd::base(m);
        for v in 1..=n as Var {
            let single = Zdd::singleton(m, v);
            family = family.union(&single.product(&family).unwrap()).unwrap();
        }
        family
    }

    #[test]
    fn order_of_and_get_set_round_trip() {
        let m = Manager::new();
        for _ in 0..4 {
            m.new_var();
        }
        let family = power_set(&m, 4);
        let index = ZddIndex::build(&family);
        assert_eq!(index.count(), 16);
        for rank in 0..16 {
            let set = index.get_set(rank).unwrap();
            assert_eq!(index.order_of(&set), Some(rank));
        }
    }

    #[test]
    fn sum_weight_matches_closed_form() {
        let m = Manager::new();
        for _ in 0..4 {
            m.new_var();
        }
        let family = power_set(&m, 4);
        let index = ZddIndex::build(&family);
        // Every variable appears in exactly half of the 16 subsets, so the
        // total is 8 * (1+2+3+4) = 80.
        let total = index.sum_weight(|v| v as f64);
        assert!((total - 80.0).abs() < 1e-9);
    }

    #[test]
    fn max_and_min_weight_bracket_every_subset() {
        let m = Manager::new();
        for _ in 0..3 {
            m.new_var();
        }
        let family = power_set(&m, 3);
        let index = ZddIndex::build(&family);
        let (max_value, max_set) = index.max_weight(|v| v as f64).unwrap();
        assert_eq!(max_value, 6.0);
        assert_eq!(max_set, vec![1, 2, 3]);
        let (min_value, min_set) = index.min_weight(|v| v as f64).unwrap();
        assert_eq!(min_value, 0.0);
        assert_eq!(min_set, Vec::<Var>::new());
    }

    #[test]
    fn dictionary_ascending_and_descending_are_mirror_images() {
        let m = Manager::new();
        for _ in 0..3 {
            m.new_var();
        }
        let family = power_set(&m, 3);
        let index = std::sync::Arc::new(ZddIndex::build(&family));
        let asc: Vec<Vec<Var>> = index.clone().into_dictionary_iter().collect();
        let mut desc: Vec<Vec<Var>> = index.into_dictionary_iter_rev().collect();
        desc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn weight_ascending_and_descending_iterators_are_sorted_and_complete() {
        let m = Manager::new();
        for _ in 0..4 {
            m.new_var();
        }
        let family = power_set(&m, 4);
        let index = std::sync::Arc::new(ZddIndex::build(&family));
        let weight = |v: Var| v as f64;

        let asc: Vec<Vec<Var>> = index.clone().into_weight_ascending_iter(weight).collect();
        let desc: Vec<Vec<Var>> = index.into_weight_descending_iter(weight).collect();
        assert_eq!(asc.len(), 16);
        assert_eq!(desc.len(), 16);

        let asc_weights: Vec<f64> = asc.iter().map(|s| s.iter().map(|&v| weight(v)).sum()).collect();
        for pair in asc_weights.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        let desc_weights: Vec<f64> = desc.iter().map(|s| s.iter().map(|&v| weight(v)).sum()).collect();
        for pair in desc_weights.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn random_order_iterator_is_a_permutation_of_every_set() {
        let m = Manager::new();
        for _ in 0..4 {
            m.new_var();
        }
        let family = power_set(&m, 4);
        let index = std::sync::Arc::new(ZddIndex::build(&family));
        let mut rng = rand::thread_rng();
        let all: Vec<Vec<Var>> = index.into_random_order_iter(&mut rng).collect();
        assert_eq!(all.len(), 16);
        let mut seen: HashSet<Vec<Var>> = HashSet::default();
        for set in all {
            assert!(seen.insert(set));
        }
    }

    #[test]
    fn random_set_is_always_a_member() {
        let m = Manager::new();
        for _ in 0..4 {
            m.new_var();
        }
        let family = power_set(&m, 4);
        let index = ZddIndex::build(&family);
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let set = index.random_set(&mut rng).unwrap();
            assert!(family.member(&set));
        }
    }

    #[test]
    fn dictionary_iterator_yields_every_set_exactly_once() {
        let m = Manager::new();
        for _ in 0..3 {
            m.new_var();
        }
        let family = power_set(&m, 3);
        let index = std::sync::Arc::new(ZddIndex::build(&family));
        let all: Vec<Vec<Var>> = index.into_dictionary_iter().collect();
        assert_eq!(all.len(), 8);
        let mut seen: HashSet<Vec<Var>> = HashSet::default();
        for set in all {
            assert!(seen.insert(set));
        }
    }
}
