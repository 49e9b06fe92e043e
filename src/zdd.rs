//! ZDD algebra: a reference-counted handle (`Zdd`) over a shared `Manager`.
//! Grounded on the teacher's `ZddManager::{intersect,union,setdiff,product,
//! divide}` recursion shape (terminal short-circuits, cache-before-recurse,
//! skip-level split on `level(f)` vs `level(g)`), generalized onto the
//! shared `Manager`/unique table and the I4 reduction rule. `onset`/`offset`/
//! `change`/`card`/`one_set`/`member` are supplemented from
//! `original_source/include/sbdd2/zdd.hpp`.
//!
//! Unlike a BDD, a ZDD arc is never negated — a skipped level means the
//! variable is simply absent from every set in that sub-family, not "don't
//! care", so there is no analogue of `not` being a free flip here.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::arc::{Arc, FALSE, TRUE};
use crate::cache::OpCode;
use crate::common::{HashSet, Level, Var};
use crate::error::{DdError, DdResult};
use crate::manager::{Manager, ManagerInner};
use crate::node::Node;

/// A handle to a ZDD node: a family of finite sets of variables.
pub struct Zdd {
    manager: std::sync::Arc<Manager>,
    arc: Arc,
    /// Lazily built by `crate::index`; never copied on `Clone` (spec §4.10 —
    /// two independent-looking handles onto the same family do not need to
    /// agree on whether the index was ever built).
    index_cache: std::sync::Mutex<Option<std::sync::Arc<crate::index::ZddIndex>>>,
}

impl Zdd {
    pub(crate) fn wrap(manager: std::sync::Arc<Manager>, arc: Arc) -> Zdd {
        Zdd { manager, arc, index_cache: std::sync::Mutex::new(None) }
    }

    pub(crate) fn cached_index(&self) -> std::sync::MutexGuard<'_, Option<std::sync::Arc<crate::index::ZddIndex>>> {
        self.index_cache.lock().expect("zdd index cache mutex poisoned")
    }

    pub fn manager(&self) -> &std::sync::Arc<Manager> {
        &self.manager
    }

    pub(crate) fn raw_arc(&self) -> Arc {
        self.arc
    }

    /// The empty family (contains no sets at all).
    pub fn empty(manager: &std::sync::Arc<Manager>) -> Zdd {
        manager.lock().inc_ref(FALSE);
        Zdd::wrap(manager.clone(), FALSE)
    }

    /// The family containing exactly the empty set, `{∅}`.
    pub fn base(manager: &std::sync::Arc<Manager>) -> Zdd {
        manager.lock().inc_ref(TRUE);
        Zdd::wrap(manager.clone(), TRUE)
    }

    /// The family containing exactly the singleton set `{var}`.
    pub fn singleton(manager: &std::sync::Arc<Manager>, var: Var) -> Zdd {
        let mut inner = manager.lock();
        let arc = inner.get_or_create_node_zdd(var, FALSE, TRUE);
        inner.inc_ref(arc);
        inner.maybe_gc();
        drop(inner);
        Zdd::wrap(manager.clone(), arc)
    }

    pub fn is_empty(&self) -> bool {
        self.arc == FALSE
    }

    pub fn is_base(&self) -> bool {
        self.arc == TRUE
    }

    fn same_manager(&self, other: &Zdd) -> DdResult<()> {
        if std::sync::Arc::ptr_eq(&self.manager, &other.manager) {
            Ok(())
        } else {
            Err(DdError::IncompatibleManager("operands belong to different managers".to_string()))
        }
    }

    pub fn union(&self, other: &Zdd) -> DdResult<Zdd> {
        self.same_manager(other)?;
        let mut inner = self.manager.lock();
        let result = union_rec(&mut inner, self.arc, other.arc);
        inner.inc_ref(result);
        inner.maybe_gc();
        drop(inner);
        Ok(Zdd::wrap(self.manager.clone(), result))
    }

    pub fn intersect(&self, other: &Zdd) -> DdResult<Zdd> {
        self.same_manager(other)?;
        let mut inner = self.manager.lock();
        let result = intersect_rec(&mut inner, self.arc, other.arc);
        inner.inc_ref(result);
        inner.maybe_gc();
        drop(inner);
        Ok(Zdd::wrap(self.manager.clone(), result))
    }

    pub fn difference(&self, other: &Zdd) -> DdResult<Zdd> {
        self.same_manager(other)?;
        let mut inner = self.manager.lock();
        let result = difference_rec(&mut inner, self.arc, other.arc);
        inner.inc_ref(result);
        inner.maybe_gc();
        drop(inner);
        Ok(Zdd::wrap(self.manager.clone(), result))
    }

    /// `{a ∪ b : a ∈ self, b ∈ other}`.
    pub fn product(&self, other: &Zdd) -> DdResult<Zdd> {
        self.same_manager(other)?;
        let mut inner = self.manager.lock();
        let result = product_rec(&mut inner, self.arc, other.arc);
        inner.inc_ref(result);
        inner.maybe_gc();
        drop(inner);
        Ok(Zdd::wrap(self.manager.clone(), result))
    }

    /// `self / other`: the largest family `q` such that `q.product(other)`
    /// is contained in `self`. Dividing by the empty family is an error.
    pub fn quotient(&self, other: &Zdd) -> DdResult<Zdd> {
        self.same_manager(other)?;
        if other.is_empty() {
            return Err(DdError::InvalidArgument("division by the empty ZDD family".to_string()));
        }
        let mut inner = self.manager.lock();
        let result = quotient_rec(&mut inner, self.arc, other.arc)?;
        inner.inc_ref(result);
        inner.maybe_gc();
        drop(inner);
        Ok(Zdd::wrap(self.manager.clone(), result))
    }

    /// `self - self.quotient(other).product(other)`.
    pub fn remainder(&self, other: &Zdd) -> DdResult<Zdd> {
        let q = self.quotient(other)?;
        let qg = q.product(other)?;
        self.difference(&qg)
    }

    /// Sets of `self` containing `var`, with `var` itself stripped out of
    /// the representation (so a cardinality-1 `onset` collapses to `base`).
    pub fn onset(&self, var: Var) -> DdResult<Zdd> {
        self.check_var(var)?;
        let mut inner = self.manager.lock();
        let result = onset_rec(&mut inner, self.arc, var);
        inner.inc_ref(result);
        inner.maybe_gc();
        drop(inner);
        Ok(Zdd::wrap(self.manager.clone(), result))
    }

    /// Sets of `self` not containing `var`.
    pub fn offset(&self, var: Var) -> DdResult<Zdd> {
        self.check_var(var)?;
        let mut inner = self.manager.lock();
        let result = offset_rec(&mut inner, self.arc, var);
        inner.inc_ref(result);
        inner.maybe_gc();
        drop(inner);
        Ok(Zdd::wrap(self.manager.clone(), result))
    }

    /// Toggles membership of `var` in every set of the family.
    pub fn change(&self, var: Var) -> DdResult<Zdd> {
        self.check_var(var)?;
        let mut inner = self.manager.lock();
        let result = change_rec(&mut inner, self.arc, var);
        inner.inc_ref(result);
        inner.maybe_gc();
        drop(inner);
        Ok(Zdd::wrap(self.manager.clone(), result))
    }

    fn check_var(&self, var: Var) -> DdResult<()> {
        if var == 0 || var as usize > self.manager.var_count() {
            Err(DdError::InvalidArgument(format!("variable {} is not known to this manager", var)))
        } else {
            Ok(())
        }
    }

    /// Number of sets in the family. No "don't care" scaling applies, since
    /// a skipped ZDD level means a variable is forced absent, not free.
    pub fn exact_card(&self) -> BigUint {
        let mut inner = self.manager.lock();
        let mut memo: crate::common::HashMap<Arc, BigUint> = crate::common::HashMap::default();
        card_rec(&mut inner, self.arc, &mut memo)
    }

    pub fn card(&self) -> u64 {
        use num_traits::ToPrimitive;
        self.exact_card().to_u64().unwrap_or(u64::MAX)
    }

    /// The unique member set, if `self` has cardinality exactly 1.
    pub fn one_set(&self) -> Option<Vec<Var>> {
        if self.exact_card() != BigUint::one() {
            return None;
        }
        let mut inner = self.manager.lock();
        let mut set = Vec::new();
        let mut cur = self.arc;
        while cur != TRUE {
            let node = *inner.node(cur.index());
            let low_card = card_rec(&mut inner, node.low, &mut crate::common::HashMap::default());
            if low_card.is_zero() {
                set.push(node.var);
                cur = node.high;
            } else {
                cur = node.low;
            }
        }
        Some(set)
    }

    pub fn member(&self, set: &[Var]) -> bool {
        let inner = self.manager.lock();
        let mut remaining: HashSet<Var> = set.iter().copied().collect();
        let mut cur = self.arc;
        loop {
            if cur == TRUE {
                return remaining.is_empty();
            }
            if cur == FALSE {
                return false;
            }
            let node = *inner.node(cur.index());
            if remaining.remove(&node.var) {
                cur = node.high;
            } else {
                cur = node.low;
            }
        }
    }

    /// Drops any cached indexed-order table, forcing the next indexed
    /// operation (`order_of`, `get_set`, ...) to rebuild it from scratch.
    pub fn clear_index(&self) {
        *self.cached_index() = None;
    }

    /// Returns the cached indexed-order table, building it on first use.
    fn index(&self) -> std::sync::Arc<crate::index::ZddIndex> {
        let mut cache = self.cached_index();
        if let Some(existing) = cache.as_ref() {
            return existing.clone();
        }
        let built = std::sync::Arc::new(crate::index::ZddIndex::build(self));
        *cache = Some(built.clone());
        built
    }

    /// Height (deepest level reached) of the indexed-order table.
    pub fn index_height(&self) -> Level {
        self.index().height()
    }

    /// Total number of distinct nodes the indexed-order table tracks.
    pub fn index_size(&self) -> usize {
        self.index().size()
    }

    pub fn index_size_at_level(&self, level: Level) -> usize {
        self.index().size_at_level(level)
    }

    /// Cardinality via the indexed-order table rather than a fresh memoized
    /// traversal; identical result to `exact_card`, reusing a cached table
    /// across repeated calls.
    pub fn indexed_exact_count(&self) -> BigUint {
        self.index().exact_count()
    }

    pub fn indexed_count(&self) -> u64 {
        self.index().count()
    }

    /// The rank of `set` within this family's indexed enumeration order, or
    /// `None` if `set` is not a member.
    pub fn order_of(&self, set: &[Var]) -> Option<u64> {
        self.index().order_of(set)
    }

    /// The `rank`-th set in indexed enumeration order.
    pub fn get_set(&self, rank: u64) -> Option<Vec<Var>> {
        self.index().get_set(rank)
    }

    /// A uniformly random member set.
    pub fn random_set<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec<Var>> {
        self.index().random_set(rng)
    }

    /// Sum, over every member set, of the sum of `weight(v)` over its
    /// elements.
    pub fn sum_weight(&self, weight: impl Fn(Var) -> f64) -> f64 {
        self.index().sum_weight(weight)
    }

    /// The heaviest member set's total weight, paired with that set.
    pub fn max_weight(&self, weight: impl Fn(Var) -> f64) -> Option<(f64, Vec<Var>)> {
        self.index().max_weight(weight)
    }

    /// The lightest member set's total weight, paired with that set.
    pub fn min_weight(&self, weight: impl Fn(Var) -> f64) -> Option<(f64, Vec<Var>)> {
        self.index().min_weight(weight)
    }

    /// Iterates every member set in ascending indexed rank order.
    pub fn iter_indexed(&self) -> crate::index::DictionaryIter {
        self.index().into_dictionary_iter()
    }

    /// Iterates every member set in descending indexed rank order.
    pub fn iter_indexed_rev(&self) -> crate::index::DictionaryIter {
        self.index().into_dictionary_iter_rev()
    }

    /// Iterates every member set in ascending total-weight order.
    pub fn iter_indexed_weight_ascending(&self, weight: impl Fn(Var) -> f64) -> crate::index::WeightOrderIter {
        self.index().into_weight_ascending_iter(weight)
    }

    /// Iterates every member set in descending total-weight order.
    pub fn iter_indexed_weight_descending(&self, weight: impl Fn(Var) -> f64) -> crate::index::WeightOrderIter {
        self.index().into_weight_descending_iter(weight)
    }

    /// Iterates every member set exactly once, in a uniformly random order.
    pub fn iter_indexed_random<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> crate::index::RandomOrderIter {
        self.index().into_random_order_iter(rng)
    }

    pub fn support(&self) -> Vec<Var> {
        let mut inner = self.manager.lock();
        let mut seen: HashSet<u32> = HashSet::default();
        let mut vars: HashSet<Var> = HashSet::default();
        let mut stack = vec![self.arc];
        while let Some(a) = stack.pop() {
            if a.is_constant() {
                continue;
            }
            if !seen.insert(a.index()) {
                continue;
            }
            let node = *inner.node(a.index());
            vars.insert(node.var);
            stack.push(node.low);
            stack.push(node.high);
        }
        let mut result: Vec<Var> = vars.into_iter().collect();
        result.sort_unstable();
        result
    }
}

impl Clone for Zdd {
    fn clone(&self) -> Zdd {
        self.manager.lock().inc_ref(self.arc);
        Zdd::wrap(self.manager.clone(), self.arc)
    }
}

impl Drop for Zdd {
    fn drop(&mut self) {
        self.manager.lock().dec_ref(self.arc);
    }
}

impl PartialEq for Zdd {
    fn eq(&self, other: &Zdd) -> bool {
        std::sync::Arc::ptr_eq(&self.manager, &other.manager) && self.arc == other.arc
    }
}
impl Eq for Zdd {}

impl std::fmt::Debug for Zdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zdd").field("arc", &self.arc).finish()
    }
}

fn level_of_arc(inner: &ManagerInner, arc: Arc) -> Level {
    if arc.is_constant() {
        Level::MAX
    } else {
        inner.varorder.level_of(inner.node(arc.index()).var)
    }
}

fn var_tag(var: Var) -> Arc {
    Arc::node(var, false)
}

/// Cofactors `arc` on the variable at `top_level`. A ZDD node whose own top
/// variable sits below `top_level` (or a terminal) contains no set with
/// that variable at all, so its "has var" cofactor is always empty.
fn cofactor_at(inner: &ManagerInner, arc: Arc, top_level: Level) -> (Arc, Arc) {
    if arc.is_constant() {
        return (arc, FALSE);
    }
    let node = *inner.node(arc.index());
    if inner.varorder.level_of(node.var) != top_level {
        return (arc, FALSE);
    }
    (node.low, node.high)
}

fn union_rec(inner: &mut ManagerInner, f: Arc, g: Arc) -> Arc {
    if f == FALSE {
        return g;
    }
    if g == FALSE {
        return f;
    }
    if f == g {
        return f;
    }
    let (f, g) = if f.raw() > g.raw() { (g, f) } else { (f, g) };
    if let Some(cached) = inner.cache.get(OpCode::ZddUnion, f, g) {
        return cached;
    }
    let top_level = level_of_arc(inner, f).min(level_of_arc(inner, g));
    let var = inner.varorder.var_of_level(top_level);
    let (f0, f1) = cofactor_at(inner, f, top_level);
    let (g0, g1) = cofactor_at(inner, g, top_level);
    let low = union_rec(inner, f0, g0);
    let high = union_rec(inner, f1, g1);
    let result = inner.get_or_create_node_zdd(var, low, high);
    inner.cache.insert(OpCode::ZddUnion, f, g, result);
    result
}

fn intersect_rec(inner: &mut ManagerInner, f: Arc, g: Arc) -> Arc {
    if f == FALSE || g == FALSE {
        return FALSE;
    }
    if f == g {
        return f;
    }
    let (f, g) = if f.raw() > g.raw() { (g, f) } else { (f, g) };
    if let Some(cached) = inner.cache.get(OpCode::ZddIntersect, f, g) {
        return cached;
    }
    let top_level = level_of_arc(inner, f).min(level_of_arc(inner, g));
    let var = inner.varorder.var_of_level(top_level);
    let (f0, f1) = cofactor_at(inner, f, top_level);
    let (g0, g1) = cofactor_at(inner, g, top_level);
    let low = intersect_rec(inner, f0, g0);
    let high = intersect_rec(inner, f1, g1);
    let result = inner.get_or_create_node_zdd(var, low, high);
    inner.cache.insert(OpCode::ZddIntersect, f, g, result);
    result
}

fn difference_rec(inner: &mut ManagerInner, f: Arc, g: Arc) -> Arc {
    if f == FALSE {
        return FALSE;
    }
    if g == FALSE {
        return f;
    }
    if f == g {
        return FALSE;
    }
    if let Some(cached) = inner.cache.get(OpCode::ZddDiff, f, g) {
        return cached;
    }
    let top_level = level_of_arc(inner, f).min(level_of_arc(inner, g));
    let var = inner.varorder.var_of_level(top_level);
    let (f0, f1) = cofactor_at(inner, f, top_level);
    let (g0, g1) = cofactor_at(inner, g, top_level);
    let low = difference_rec(inner, f0, g0);
    let high = difference_rec(inner, f1, g1);
    let result = inner.get_or_create_node_zdd(var, low, high);
    inner.cache.insert(OpCode::ZddDiff, f, g, result);
    result
}

fn product_rec(inner: &mut ManagerInner, f: Arc, g: Arc) -> Arc {
    if f == FALSE || g == FALSE {
        return FALSE;
    }
    if f == TRUE {
        return g;
    }
    if g == TRUE {
        return f;
    }
    let (key_f, key_g) = if f.raw() > g.raw() { (g, f) } else { (f, g) };
    if let Some(cached) = inner.cache.get(OpCode::ZddProduct, key_f, key_g) {
        return cached;
    }
    let top_level = level_of_arc(inner, f).min(level_of_arc(inner, g));
    let var = inner.varorder.var_of_level(top_level);
    let (f0, f1) = cofactor_at(inner, f, top_level);
    let (g0, g1) = cofactor_at(inner, g, top_level);
    let low = product_rec(inner, f0, g0);
    let a = product_rec(inner, f0, g1);
    let b = product_rec(inner, f1, g0);
    let c = product_rec(inner, f1, g1);
    let ab = union_rec(inner, a, b);
    let high = union_rec(inner, ab, c);
    let result = inner.get_or_create_node_zdd(var, low, high);
    inner.cache.insert(OpCode::ZddProduct, key_f, key_g, result);
    result
}

fn quotient_rec(inner: &mut ManagerInner, f: Arc, g: Arc) -> DdResult<Arc> {
    if g == TRUE {
        return Ok(f);
    }
    if f == FALSE {
        return Ok(FALSE);
    }
    if g == FALSE {
        return Ok(FALSE);
    }
    let f_level = level_of_arc(inner, f);
    let g_level = level_of_arc(inner, g);
    if g_level < f_level {
        return Ok(FALSE);
    }
    if let Some(cached) = inner.cache.get(OpCode::ZddQuotient, f, g) {
        return Ok(cached);
    }
    let result = if f_level < g_level {
        let (f0, f1) = cofactor_at(inner, f, f_level);
        let f_var = inner.varorder.var_of_level(f_level);
        let q0 = quotient_rec(inner, f0, g)?;
        let q1 = quotient_rec(inner, f1, g)?;
        inner.get_or_create_node_zdd(f_var, q0, q1)
    } else {
        let (f0, f1) = cofactor_at(inner, f, f_level);
        let (g0, g1) = cofactor_at(inner, g, g_level);
        let q1 = quotient_rec(inner, f1, g1)?;
        if g0 == FALSE {
            q1
        } else {
            let q0 = quotient_rec(inner, f0, g0)?;
            intersect_rec(inner, q0, q1)
        }
    };
    inner.cache.insert(OpCode::ZddQuotient, f, g, result);
    Ok(result)
}

fn onset_rec(inner: &mut ManagerInner, arc: Arc, var: Var) -> Arc {
    if arc.is_constant() {
        return FALSE;
    }
    let node = *inner.node(arc.index());
    let node_level = inner.varorder.level_of(node.var);
    let var_level = inner.varorder.level_of(var);
    if node_level > var_level {
        return FALSE;
    }
    if node.var == var {
        return node.high;
    }
    let value_tag = var_tag(var);
    if let Some(cached) = inner.cache.get3(OpCode::ZddOnset, arc, value_tag, TRUE) {
        return cached;
    }
    let low = onset_rec(inner, node.low, var);
    let high = onset_rec(inner, node.high, var);
    let result = inner.get_or_create_node_zdd(node.var, low, high);
    inner.cache.insert3(OpCode::ZddOnset, arc, value_tag, TRUE, result);
    result
}

fn offset_rec(inner: &mut ManagerInner, arc: Arc, var: Var) -> Arc {
    if arc.is_constant() {
        return arc;
    }
    let node = *inner.node(arc.index());
    let node_level = inner.varorder.level_of(node.var);
    let var_level = inner.varorder.level_of(var);
    if node_level > var_level {
        return arc;
    }
    if node.var == var {
        return node.low;
    }
    let value_tag = var_tag(var);
    if let Some(cached) = inner.cache.get3(OpCode::ZddOffset, arc, value_tag, TRUE) {
        return cached;
    }
    let low = offset_rec(inner, node.low, var);
    let high = offset_rec(inner, node.high, var);
    let result = inner.get_or_create_node_zdd(node.var, low, high);
    inner.cache.insert3(OpCode::ZddOffset, arc, value_tag, TRUE, result);
    result
}

fn change_rec(inner: &mut ManagerInner, arc: Arc, var: Var) -> Arc {
    let var_level = inner.varorder.level_of(var);
    let node_level = level_of_arc(inner, arc);
    if node_level > var_level {
        // Every set here lacks `var`; all of them now gain it.
        return inner.get_or_create_node_zdd(var, FALSE, arc);
    }
    let value_tag = var_tag(var);
    if let Some(cached) = inner.cache.get3(OpCode::ZddChange, arc, value_tag, TRUE) {
        return cached;
    }
    let node: Node = *inner.node(arc.index());
    let result = if node.var == var {
        inner.get_or_create_node_zdd(var, node.high, node.low)
    } else {
        let low = change_rec(inner, node.low, var);
        let high = change_rec(inner, node.high, var);
        inner.get_or_create_node_zdd(node.var, low, high)
    };
    inner.cache.insert3(OpCode::ZddChange, arc, value_tag, TRUE, result);
    result
}

fn card_rec(inner: &mut ManagerInner, arc: Arc, memo: &mut crate::common::HashMap<Arc, BigUint>) -> BigUint {
    if arc == FALSE {
        return BigUint::zero();
    }
    if arc == TRUE {
        return BigUint::one();
    }
    if let Some(cached) = memo.get(&arc) {
        return cached.clone();
    }
    let node = *inner.node(arc.index());
    let total = card_rec(inner, node.low, memo) + card_rec(inner, node.high, memo);
    memo.insert(arc, total.clone());
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_singletons_has_card_two() {
        let m = Manager::new();
        let v1 = m.new_var();
        let v2 = m.new_var();
        let a = Zdd::singleton(&m, v1);
        let b = Zdd::singleton(&m, v2);
        let u = a.union(&b).unwrap();
        assert_eq!(u.exact_card(), BigUint::from(2u32));
    }

    #[test]
    fn intersect_of_disjoint_singletons_is_empty() {
        let m = Manager::new();
        let v1 = m.new_var();
        let v2 = m.new_var();
        let a = Zdd::singleton(&m, v1);
        let b = Zdd::singleton(&m, v2);
        assert!(a.intersect(&b).unwrap().is_empty());
    }

    #[test]
    fn change_adds_and_removes_a_variable() {
        let m = Manager::new();
        let v1 = m.new_var();
        let base = Zdd::base(&m);
        let with_v1 = base.change(v1).unwrap();
        assert_eq!(with_v1.one_set().unwrap(), vec![v1]);
        let back = with_v1.change(v1).unwrap();
        assert!(back.is_base());
    }

    #[test]
    fn member_respects_forced_absence() {
        let m = Manager::new();
        let v1 = m.new_var();
        let v2 = m.new_var();
        let a = Zdd::singleton(&m, v1);
        assert!(a.member(&[v1]));
        assert!(!a.member(&[v1, v2]));
        assert!(!a.member(&[]));
    }

    #[test]
    fn product_join_combines_members() {
        let m = Manager::new();
        let v1 = m.new_var();
        let v2 = m.new_var();
        let a = Zdd::singleton(&m, v1);
        let b = Zdd::singleton(&m, v2);
        let joined = a.product(&b).unwrap();
        assert_eq!(joined.exact_card(), BigUint::one());
        assert_eq!(joined.one_set().unwrap(), vec![v1, v2]);
    }

    #[test]
    fn quotient_by_empty_family_is_an_error() {
        let m = Manager::new();
        let v1 = m.new_var();
        let a = Zdd::singleton(&m, v1);
        let empty = Zdd::empty(&m);
        assert!(a.quotient(&empty).is_err());
    }

    #[test]
    fn onset_offset_partition_the_family() {
        let m = Manager::new();
        let v1 = m.new_var();
        let v2 = m.new_var();
        let a = Zdd::singleton(&m, v1);
        let b = Zdd::singleton(&m, v2);
        let family = a.union(&b).unwrap();
        let with_v1 = family.onset(v1).unwrap();
        let without_v1 = family.offset(v1).unwrap();
        assert!(with_v1.is_base());
        assert_eq!(without_v1.exact_card(), BigUint::one());
    }
}
