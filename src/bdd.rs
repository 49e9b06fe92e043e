//! BDD algebra: a reference-counted handle (`Bdd`) over a shared `Manager`,
//! and the recursive operations spec §4.5 names (`apply`, `ite`, `restrict`,
//! `compose`, quantification, counting). Grounded on the teacher's
//! `BddManager::{not,and,or,xor,imp,nand,nor,xnor,ite}` recursion shape —
//! terminal short-circuits first, then a cache probe, then a Shannon split
//! on the topmost variable — generalized to negation edges (I2), so `not`
//! is a free arc flip rather than a recursive traversal.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::arc::{Arc, FALSE, TRUE};
use crate::cache::OpCode;
use crate::common::{HashSet, Level, Var};
use crate::error::{DdError, DdResult};
use crate::manager::{Manager, ManagerInner};
use crate::node::Node;

/// A handle to a BDD node, refcounted against its manager. Cloning and
/// dropping adjust the manager's refcount so GC's mark phase can use
/// `refcount > 0` as the root set (spec §4.4).
pub struct Bdd {
    manager: std::sync::Arc<Manager>,
    arc: Arc,
}

impl Bdd {
    pub(crate) fn wrap(manager: std::sync::Arc<Manager>, arc: Arc) -> Bdd {
        Bdd { manager, arc }
    }

    pub fn manager(&self) -> &std::sync::Arc<Manager> {
        &self.manager
    }

    pub(crate) fn raw_arc(&self) -> Arc {
        self.arc
    }

    pub fn zero(manager: &std::sync::Arc<Manager>) -> Bdd {
        manager.lock().inc_ref(FALSE);
        Bdd::wrap(manager.clone(), FALSE)
    }

    pub fn one(manager: &std::sync::Arc<Manager>) -> Bdd {
        manager.lock().inc_ref(TRUE);
        Bdd::wrap(manager.clone(), TRUE)
    }

    /// The elementary function `var` (true exactly when `var` is true).
    pub fn var(manager: &std::sync::Arc<Manager>, var: Var) -> Bdd {
        let mut inner = manager.lock();
        let arc = inner.get_or_create_node_bdd(var, FALSE, TRUE);
        inner.inc_ref(arc);
        inner.maybe_gc();
        drop(inner);
        Bdd::wrap(manager.clone(), arc)
    }

    pub fn is_zero(&self) -> bool {
        self.arc == FALSE
    }

    pub fn is_one(&self) -> bool {
        self.arc == TRUE
    }

    pub fn is_negated(&self) -> bool {
        self.arc.is_negated()
    }

    fn same_manager(&self, other: &Bdd) -> DdResult<()> {
        if std::sync::Arc::ptr_eq(&self.manager, &other.manager) {
            Ok(())
        } else {
            Err(DdError::IncompatibleManager("operands belong to different managers".to_string()))
        }
    }

    /// O(1): negation is a free flip of the arc's complement bit (I2).
    pub fn not(&self) -> Bdd {
        let mut inner = self.manager.lock();
        let arc = self.arc.negated();
        inner.inc_ref(arc);
        drop(inner);
        Bdd::wrap(self.manager.clone(), arc)
    }

    fn binary(&self, other: &Bdd, op: BddOp) -> DdResult<Bdd> {
        self.same_manager(other)?;
        let mut inner = self.manager.lock();
        let result = apply_rec(&mut inner, op, self.arc, other.arc);
        inner.inc_ref(result);
        inner.maybe_gc();
        drop(inner);
        Ok(Bdd::wrap(self.manager.clone(), result))
    }

    pub fn and(&self, other: &Bdd) -> DdResult<Bdd> {
        self.binary(other, BddOp::And)
    }

    pub fn or(&self, other: &Bdd) -> DdResult<Bdd> {
        self.binary(other, BddOp::Or)
    }

    pub fn xor(&self, other: &Bdd) -> DdResult<Bdd> {
        self.binary(other, BddOp::Xor)
    }

    /// `self AND NOT other`. Reuses the AND engine on an already-negated
    /// operand rather than running its own recursive algorithm.
    pub fn diff(&self, other: &Bdd) -> DdResult<Bdd> {
        self.same_manager(other)?;
        let mut inner = self.manager.lock();
        let result = apply_rec(&mut inner, BddOp::And, self.arc, other.arc.negated());
        inner.inc_ref(result);
        inner.maybe_gc();
        drop(inner);
        Ok(Bdd::wrap(self.manager.clone(), result))
    }

    pub fn imp(&self, other: &Bdd) -> DdResult<Bdd> {
        self.not().or(other)
    }

    pub fn nand(&self, other: &Bdd) -> DdResult<Bdd> {
        Ok(self.and(other)?.not())
    }

    pub fn nor(&self, other: &Bdd) -> DdResult<Bdd> {
        Ok(self.or(other)?.not())
    }

    pub fn xnor(&self, other: &Bdd) -> DdResult<Bdd> {
        Ok(self.xor(other)?.not())
    }

    /// If-then-else: `if self then then_ else else_`.
    pub fn ite(&self, then_: &Bdd, else_: &Bdd) -> DdResult<Bdd> {
        self.same_manager(then_)?;
        self.same_manager(else_)?;
        let mut inner = self.manager.lock();
        let result = ite_rec(&mut inner, self.arc, then_.arc, else_.arc);
        inner.inc_ref(result);
        inner.maybe_gc();
        drop(inner);
        Ok(Bdd::wrap(self.manager.clone(), result))
    }

    /// Sets `var` to `value` everywhere in `self`, anywhere it appears in
    /// the order (not just at the root).
    pub fn restrict(&self, var: Var, value: bool) -> DdResult<Bdd> {
        if var == 0 || var as usize > self.manager.var_count() {
            return Err(DdError::InvalidArgument(format!("variable {} is not known to this manager", var)));
        }
        let mut inner = self.manager.lock();
        let result = restrict_rec(&mut inner, self.arc, var, value);
        inner.inc_ref(result);
        inner.maybe_gc();
        drop(inner);
        Ok(Bdd::wrap(self.manager.clone(), result))
    }

    /// Shannon cofactors of `self` on its own topmost variable: `(f|0, f|1)`.
    /// Returns `(self.clone(), self.clone())` for a constant.
    pub fn cofactors(&self) -> (Bdd, Bdd) {
        let mut inner = self.manager.lock();
        if self.arc.is_constant() {
            let arc = self.arc;
            inner.inc_ref(arc);
            inner.inc_ref(arc);
            drop(inner);
            return (Bdd::wrap(self.manager.clone(), arc), Bdd::wrap(self.manager.clone(), arc));
        }
        let node = *inner.node(self.arc.index());
        let (low, high) = negate_children(self.arc, &node);
        inner.inc_ref(low);
        inner.inc_ref(high);
        drop(inner);
        (Bdd::wrap(self.manager.clone(), low), Bdd::wrap(self.manager.clone(), high))
    }

    /// Substitutes `var` with `g` inside `self`, via
    /// `ite(g, self|var=1, self|var=0)`.
    pub fn compose(&self, var: Var, g: &Bdd) -> DdResult<Bdd> {
        self.same_manager(g)?;
        let f1 = self.restrict(var, true)?;
        let f0 = self.restrict(var, false)?;
        g.ite(&f1, &f0)
    }

    /// Existential quantification: `OR` over `var`'s two cofactors, for
    /// each variable in `vars`, in order.
    pub fn exist(&self, vars: &[Var]) -> DdResult<Bdd> {
        let mut result = self.clone();
        for &v in vars {
            let r0 = result.restrict(v, false)?;
            let r1 = result.restrict(v, true)?;
            result = r0.or(&r1)?;
        }
        Ok(result)
    }

    /// Universal quantification: `AND` over `var`'s two cofactors.
    pub fn forall(&self, vars: &[Var]) -> DdResult<Bdd> {
        let mut result = self.clone();
        for &v in vars {
            let r0 = result.restrict(v, false)?;
            let r1 = result.restrict(v, true)?;
            result = r0.and(&r1)?;
        }
        Ok(result)
    }

    /// Variables with non-trivial dependence: every variable labeling a
    /// node reachable from the root. The `low == high` reduction (I2)
    /// already guarantees each of these genuinely affects the function.
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

    /// One satisfying assignment, or `None` if `self` is identically false.
    pub fn one_sat(&self) -> Option<Vec<(Var, bool)>> {
        if self.is_zero() {
            return None;
        }
        let mut inner = self.manager.lock();
        let mut assignment = Vec::new();
        let mut cur = self.arc;
        while !cur.is_constant() {
            let node = *inner.node(cur.index());
            let (low, high) = negate_children(cur, &node);
            if high != FALSE {
                assignment.push((node.var, true));
                cur = high;
            } else {
                assignment.push((node.var, false));
                cur = low;
            }
        }
        Some(assignment)
    }

    /// Number of satisfying assignments over every variable the manager
    /// knows about (not just `self.support()`).
    pub fn exact_count(&self) -> BigUint {
        let mut inner = self.manager.lock();
        let total_levels = inner.varorder.bottom_level();
        let mut memo: crate::common::HashMap<Arc, BigUint> = crate::common::HashMap::default();
        count_rec(&mut inner, self.arc, 1, total_levels, &mut memo)
    }

    /// Convenience wrapper truncating `exact_count()` to `u64`, for callers
    /// who know the count fits.
    pub fn count(&self) -> u64 {
        use num_traits::ToPrimitive;
        self.exact_count().to_u64().unwrap_or(u64::MAX)
    }
}

impl Clone for Bdd {
    fn clone(&self) -> Bdd {
        self.manager.lock().inc_ref(self.arc);
        Bdd { manager: self.manager.clone(), arc: self.arc }
    }
}

impl Drop for Bdd {
    fn drop(&mut self) {
        self.manager.lock().dec_ref(self.arc);
    }
}

impl PartialEq for Bdd {
    fn eq(&self, other: &Bdd) -> bool {
        std::sync::Arc::ptr_eq(&self.manager, &other.manager) && self.arc == other.arc
    }
}
impl Eq for Bdd {}

impl std::fmt::Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bdd").field("arc", &self.arc).finish()
    }
}

/// The three operations the BDD "apply" engine runs directly; `diff`,
/// `imp`, `nand`, `nor`, `xnor` are built from these plus the free `not`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BddOp {
    And,
    Or,
    Xor,
}

impl BddOp {
    fn cache_code(self) -> OpCode {
        match self {
            BddOp::And => OpCode::And,
            BddOp::Or => OpCode::Or,
            BddOp::Xor => OpCode::Xor,
        }
    }
}

/// The polymorphic binary apply spec §4.5 names. Equivalent to calling
/// `f.and(g)` / `f.or(g)` / `f.xor(g)`, provided for callers that pick the
/// operator dynamically.
pub fn apply(op: BddOp, f: &Bdd, g: &Bdd) -> DdResult<Bdd> {
    match op {
        BddOp::And => f.and(g),
        BddOp::Or => f.or(g),
        BddOp::Xor => f.xor(g),
    }
}

fn level_of_arc(inner: &ManagerInner, arc: Arc) -> Level {
    if arc.is_constant() {
        Level::MAX
    } else {
        inner.varorder.level_of(inner.node(arc.index()).var)
    }
}

fn negate_children(arc: Arc, node: &Node) -> (Arc, Arc) {
    if arc.is_negated() {
        (node.low.negated(), node.high.negated())
    } else {
        (node.low, node.high)
    }
}

/// Cofactors `arc` on the variable at `top_level`. If `arc`'s own top
/// variable sits below `top_level` it does not depend on that variable, so
/// both cofactors are `arc` itself.
fn cofactor_at(inner: &ManagerInner, arc: Arc, top_level: Level) -> (Arc, Arc) {
    if arc.is_constant() {
        return (arc, arc);
    }
    let node = *inner.node(arc.index());
    if inner.varorder.level_of(node.var) != top_level {
        return (arc, arc);
    }
    negate_children(arc, &node)
}

fn terminal_case(op: BddOp, f: Arc, g: Arc) -> Option<Arc> {
    use BddOp::*;
    if f == g {
        return Some(match op {
            And | Or => f,
            Xor => FALSE,
        });
    }
    if f == g.negated() {
        return Some(match op {
            And => FALSE,
            Or | Xor => TRUE,
        });
    }
    if f.is_constant() {
        let fv = f.terminal_value();
        return Some(match (op, fv) {
            (And, false) => FALSE,
            (And, true) => g,
            (Or, false) => g,
            (Or, true) => TRUE,
            (Xor, false) => g,
            (Xor, true) => g.negated(),
        });
    }
    if g.is_constant() {
        let gv = g.terminal_value();
        return Some(match (op, gv) {
            (And, false) => FALSE,
            (And, true) => f,
            (Or, false) => f,
            (Or, true) => TRUE,
            (Xor, false) => f,
            (Xor, true) => f.negated(),
        });
    }
    None
}

fn apply_rec(inner: &mut ManagerInner, op: BddOp, f: Arc, g: Arc) -> Arc {
    if let Some(result) = terminal_case(op, f, g) {
        return result;
    }
    let opcode = op.cache_code();
    // And/Or/Xor are commutative; canonicalizing operand order doubles the
    // cache's effective hit rate on symmetric calls.
    let (f, g) = if f.raw() > g.raw() { (g, f) } else { (f, g) };
    if let Some(cached) = inner.cache.get(opcode, f, g) {
        return cached;
    }
    let top_level = level_of_arc(inner, f).min(level_of_arc(inner, g));
    let var = inner.varorder.var_of_level(top_level);
    let (f0, f1) = cofactor_at(inner, f, top_level);
    let (g0, g1) = cofactor_at(inner, g, top_level);
    let low = apply_rec(inner, op, f0, g0);
    let high = apply_rec(inner, op, f1, g1);
    let result = inner.get_or_create_node_bdd(var, low, high);
    inner.cache.insert(opcode, f, g, result);
    result
}

fn ite_rec(inner: &mut ManagerInner, f: Arc, g: Arc, h: Arc) -> Arc {
    if f == TRUE {
        return g;
    }
    if f == FALSE {
        return h;
    }
    if g == h {
        return g;
    }
    if g == TRUE && h == FALSE {
        return f;
    }
    if g == FALSE && h == TRUE {
        return f.negated();
    }
    if let Some(cached) = inner.cache.get3(OpCode::Ite, f, g, h) {
        return cached;
    }
    let top_level = level_of_arc(inner, f).min(level_of_arc(inner, g)).min(level_of_arc(inner, h));
    let var = inner.varorder.var_of_level(top_level);
    let (f0, f1) = cofactor_at(inner, f, top_level);
    let (g0, g1) = cofactor_at(inner, g, top_level);
    let (h0, h1) = cofactor_at(inner, h, top_level);
    let low = ite_rec(inner, f0, g0, h0);
    let high = ite_rec(inner, f1, g1, h1);
    let result = inner.get_or_create_node_bdd(var, low, high);
    inner.cache.insert3(OpCode::Ite, f, g, h, result);
    result
}

/// Cache keys for `restrict`/`compose` need to carry a `Var`; they reuse
/// the `Arc` wire format purely as an opaque tag (never dereferenced as a
/// real node) since the cache only ever compares keys for equality.
fn var_tag(var: Var) -> Arc {
    Arc::node(var, false)
}

fn restrict_rec(inner: &mut ManagerInner, f: Arc, var: Var, value: bool) -> Arc {
    if f.is_constant() {
        return f;
    }
    let node = *inner.node(f.index());
    let node_level = inner.varorder.level_of(node.var);
    let var_level = inner.varorder.level_of(var);
    if node_level > var_level {
        return f;
    }
    let (low, high) = negate_children(f, &node);
    if node.var == var {
        return if value { high } else { low };
    }
    let value_tag = Arc::terminal(value);
    if let Some(cached) = inner.cache.get3(OpCode::Restrict, f, var_tag(var), value_tag) {
        return cached;
    }
    let rlow = restrict_rec(inner, low, var, value);
    let rhigh = restrict_rec(inner, high, var, value);
    let result = inner.get_or_create_node_bdd(node.var, rlow, rhigh);
    inner.cache.insert3(OpCode::Restrict, f, var_tag(var), value_tag, result);
    result
}

fn count_rec(
    inner: &mut ManagerInner,
    arc: Arc,
    from_level: Level,
    total_levels: Level,
    memo: &mut crate::common::HashMap<Arc, BigUint>,
) -> BigUint {
    if arc == FALSE {
        return BigUint::zero();
    }
    if arc == TRUE {
        let skipped = total_levels - from_level + 1;
        return BigUint::one() << skipped as usize;
    }
    if let Some(cached) = memo.get(&arc) {
        return cached.clone();
    }
    let node = *inner.node(arc.index());
    let node_level = inner.varorder.level_of(node.var);
    let (low, high) = negate_children(arc, &node);
    let c0 = count_rec(inner, low, node_level + 1, total_levels, memo);
    let c1 = count_rec(inner, high, node_level + 1, total_levels, memo);
    let skipped = node_level - from_level;
    let total = (c0 + c1) << skipped as usize;
    memo.insert(arc, total.clone());
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_or_de_morgan() {
        let m = Manager::new();
        let a = Bdd::var(&m, m.new_var());
        let b = Bdd::var(&m, m.new_var());
        let lhs = a.and(&b).unwrap().not();
        let rhs = a.not().or(&b.not()).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn xor_self_is_false() {
        let m = Manager::new();
        let a = Bdd::var(&m, m.new_var());
        assert!(a.xor(&a).unwrap().is_zero());
    }

    #[test]
    fn restrict_then_count_matches_cofactor() {
        let m = Manager::new();
        let v1 = m.new_var();
        let v2 = m.new_var();
        let a = Bdd::var(&m, v1);
        let b = Bdd::var(&m, v2);
        let f = a.and(&b).unwrap();
        assert_eq!(f.exact_count(), BigUint::one());
        let restricted = f.restrict(v1, true).unwrap();
        assert_eq!(restricted, b);
    }

    #[test]
    fn ite_matches_and_or_definition() {
        let m = Manager::new();
        let a = Bdd::var(&m, m.new_var());
        let b = Bdd::var(&m, m.new_var());
        let c = Bdd::var(&m, m.new_var());
        let ite = a.ite(&b, &c).unwrap();
        let expect = a.and(&b).unwrap().or(&a.not().and(&c).unwrap()).unwrap();
        assert_eq!(ite, expect);
    }

    #[test]
    fn one_sat_is_a_real_satisfying_assignment() {
        let m = Manager::new();
        let v1 = m.new_var();
        let v2 = m.new_var();
        let a = Bdd::var(&m, v1);
        let b = Bdd::var(&m, v2);
        let f = a.and(&b.not()).unwrap();
        let assignment = f.one_sat().unwrap();
        assert!(assignment.contains(&(v1, true)));
        assert!(assignment.contains(&(v2, false)));
    }

    #[test]
    fn support_excludes_irrelevant_variables() {
        let m = Manager::new();
        let v1 = m.new_var();
        let v2 = m.new_var();
        let a = Bdd::var(&m, v1);
        let _b = Bdd::var(&m, v2);
        assert_eq!(a.support(), vec![v1]);
    }

    #[test]
    fn mismatched_manager_is_an_error() {
        let m1 = Manager::new();
        let m2 = Manager::new();
        let a = Bdd::var(&m1, m1.new_var());
        let b = Bdd::var(&m2, m2.new_var());
        assert!(a.and(&b).is_err());
    }
}
