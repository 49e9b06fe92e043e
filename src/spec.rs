//! The top-down construction interface (spec §4.8): a user-supplied
//! state-machine description of a DD, consumed by the builders in
//! `builder.rs`.
//!
//! Grounded on `original_source/include/sbdd2/tdzdd/DdSpec.hpp`'s CRTP
//! `DdSpecBase`/`StatelessDdSpec`/`DdSpec`/`PodArrayDdSpec`/`HybridDdSpec`
//! hierarchy: that design uses `void*` state blobs plus explicit
//! `get_copy`/`destruct`/`destructLevel` lifecycle hooks because C++ has no
//! ownership system to lean on. This translation keeps the same four state
//! shapes but expresses them as plain Rust types behind an associated
//! `State: Clone` — "Stateless" is `State = ()`, "Scalar" is any `Copy`
//! state, "POD array" is `Vec<T>`, "Hybrid" is a tuple of the two — so
//! `Clone`/`Drop` already provide what `get_copy`/`destruct` did by hand.
//! "Variable arity" is the `arity()` method returning something other than
//! the default 2, used by multi-valued collaborators (MDD/MTMDD) consuming
//! this same trait — not by anything built in this crate.

use crate::common::Level;

/// The two constant leaves every Spec transition can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    False,
    True,
}

/// What `get_root`/`get_child` return: either a terminal leaf, or a new
/// state together with the level it lives at (spec requires levels to
/// strictly increase along any path — I5).
#[derive(Debug, Clone)]
pub enum Transition<S> {
    Terminal(Terminal),
    Branch(S, Level),
}

impl<S> Transition<S> {
    pub fn is_terminal(&self, t: Terminal) -> bool {
        matches!(self, Transition::Terminal(x) if *x == t)
    }
}

/// Result of `Spec::merge_states`: whether two frontier states at the same
/// level collapse into one, or one/both fail outright (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The two states merged; the builder keeps a single representative.
    Merged,
    /// The first state cannot continue; route it to the FALSE terminal.
    FailFirst,
    /// The second state cannot continue; route it to the FALSE terminal.
    FailSecond,
}

/// A top-down DD description: given a state (and, for non-root calls, a
/// branch value), produce either a terminal or the next state one level
/// further from the root.
pub trait Spec {
    type State: Clone;

    /// Branch count per node; 2 for ordinary BDD/ZDD specs, more for
    /// multi-valued collaborators.
    fn arity(&self) -> usize {
        2
    }

    fn get_root(&self) -> Transition<Self::State>;

    fn get_child(&self, state: &Self::State, level: Level, branch: usize) -> Transition<Self::State>;

    /// Memoization key for `state` at `level`. Two states that compare
    /// `states_equal` at the same level must hash identically.
    fn hash_state(&self, state: &Self::State, level: Level) -> u64;

    fn states_equal(&self, a: &Self::State, b: &Self::State, level: Level) -> bool;

    /// Optional frontier-merge policy (spec §4.8); `None` means "never
    /// merge distinct states", which is always sound.
    fn merge_states(&self, _a: &mut Self::State, _b: &Self::State, _level: Level) -> Option<MergeOutcome> {
        None
    }
}

/// Blanket helper for the common case where `State` is already `Eq + Hash`:
/// implement `hash_state`/`states_equal` structurally instead of writing
/// them by hand for every scalar/POD-array spec.
pub trait StructuralState: std::hash::Hash + Eq {}
impl<T: std::hash::Hash + Eq> StructuralState for T {}

/// Convenience default for specs whose `State` already derives `Hash`/`Eq`;
/// call these from your `Spec` impl instead of re-deriving the logic.
pub fn structural_hash<S: std::hash::Hash>(s: &S) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut h = wyhash::WyHash::default();
    s.hash(&mut h);
    h.finish()
}

fn transitions_equal<S: Spec>(spec: &S, a: &Transition<S::State>, b: &Transition<S::State>, level: Level) -> bool {
    match (a, b) {
        (Transition::Terminal(x), Transition::Terminal(y)) => x == y,
        (Transition::Branch(sa, la), Transition::Branch(sb, lb)) => la == lb && spec.states_equal(sa, sb, level),
        _ => false,
    }
}

// ---------------------------------------------------------------------
// Lookahead combinators (spec §4.8): eagerly apply the reduction rule
// during descent so the builder never even allocates the redundant node.
// ---------------------------------------------------------------------

/// Wraps `inner` so that whenever both children of a node would be
/// identical, the level is skipped entirely (the BDD I3 rule, applied
/// before construction instead of after).
pub struct BddLookahead<S: Spec> {
    inner: S,
}

pub fn bdd_lookahead<S: Spec>(inner: S) -> BddLookahead<S> {
    BddLookahead { inner }
}

impl<S: Spec> BddLookahead<S> {
    fn collapse(&self, t: Transition<S::State>) -> Transition<S::State> {
        let mut t = t;
        loop {
            match t {
                Transition::Branch(state, level) => {
                    let c0 = self.inner.get_child(&state, level, 0);
                    let c1 = self.inner.get_child(&state, level, 1);
                    if transitions_equal(&self.inner, &c0, &c1, level + 1) {
                        t = c0;
                    } else {
                        return Transition::Branch(state, level);
                    }
                }
                terminal => return terminal,
            }
        }
    }
}

impl<S: Spec> Spec for BddLookahead<S> {
    type State = S::State;

    fn get_root(&self) -> Transition<Self::State> {
        self.collapse(self.inner.get_root())
    }

    fn get_child(&self, state: &Self::State, level: Level, branch: usize) -> Transition<Self::State> {
        self.collapse(self.inner.get_child(state, level, branch))
    }

    fn hash_state(&self, state: &Self::State, level: Level) -> u64 {
        self.inner.hash_state(state, level)
    }

    fn states_equal(&self, a: &Self::State, b: &Self::State, level: Level) -> bool {
        self.inner.states_equal(a, b, level)
    }

    fn merge_states(&self, a: &mut Self::State, b: &Self::State, level: Level) -> Option<MergeOutcome> {
        self.inner.merge_states(a, b, level)
    }
}

/// Wraps `inner` so that whenever a node's 1-branch would lead to the
/// FALSE terminal, the level is skipped (the ZDD I4 rule, applied eagerly).
pub struct ZddLookahead<S: Spec> {
    inner: S,
}

pub fn zdd_lookahead<S: Spec>(inner: S) -> ZddLookahead<S> {
    ZddLookahead { inner }
}

impl<S: Spec> ZddLookahead<S> {
    fn collapse(&self, t: Transition<S::State>) -> Transition<S::State> {
        let mut t = t;
        loop {
            match t {
                Transition::Branch(state, level) => {
                    let c1 = self.inner.get_child(&state, level, 1);
                    if c1.is_terminal(Terminal::False) {
                        t = self.inner.get_child(&state, level, 0);
                    } else {
                        return Transition::Branch(state, level);
                    }
                }
                terminal => return terminal,
            }
        }
    }
}

impl<S: Spec> Spec for ZddLookahead<S> {
    type State = S::State;

    fn get_root(&self) -> Transition<Self::State> {
        self.collapse(self.inner.get_root())
    }

    fn get_child(&self, state: &Self::State, level: Level, branch: usize) -> Transition<Self::State> {
        self.collapse(self.inner.get_child(state, level, branch))
    }

    fn hash_state(&self, state: &Self::State, level: Level) -> u64 {
        self.inner.hash_state(state, level)
    }

    fn states_equal(&self, a: &Self::State, b: &Self::State, level: Level) -> bool {
        self.inner.states_equal(a, b, level)
    }

    fn merge_states(&self, a: &mut Self::State, b: &Self::State, level: Level) -> Option<MergeOutcome> {
        self.inner.merge_states(a, b, level)
    }
}

// ---------------------------------------------------------------------
// Unreduction combinators (spec §4.8): the dual of lookahead — force every
// level from 1 to `n_vars` to materialize a node, even where `inner` would
// skip one, producing a quasi-reduced DAG straight from the builder.
// ---------------------------------------------------------------------

#[derive(Clone)]
pub struct UnreductionState<S> {
    inner: Option<S>, // None once `inner` has resolved to a terminal
    terminal: Option<Terminal>,
}

fn unreduction_wrap<S>(t: Transition<S>) -> (Option<S>, Option<Terminal>) {
    match t {
        Transition::Terminal(term) => (None, Some(term)),
        Transition::Branch(s, _) => (Some(s), None),
    }
}

macro_rules! unreduction_spec {
    ($name:ident) => {
        pub struct $name<S: Spec> {
            inner: S,
            n_vars: Level,
        }

        impl<S: Spec> Spec for $name<S> {
            type State = UnreductionState<S::State>;

            fn get_root(&self) -> Transition<Self::State> {
                let t = self.inner.get_root();
                self.place(t, 1)
            }

            fn get_child(&self, state: &Self::State, level: Level, branch: usize) -> Transition<Self::State> {
                match &state.inner {
                    None => {
                        // Already resolved; pass the fixed terminal through
                        // the remaining pass-through levels.
                        Transition::Branch(state.clone(), level + 1)
                    }
                    Some(inner_state) => {
                        let t = self.inner.get_child(inner_state, level, branch);
                        self.place(t, level + 1)
                    }
                }
            }

            fn hash_state(&self, state: &Self::State, level: Level) -> u64 {
                match &state.inner {
                    Some(s) => self.inner.hash_state(s, level),
                    None => state.terminal.map(|t| t as u64).unwrap_or(u64::MAX),
                }
            }

            fn states_equal(&self, a: &Self::State, b: &Self::State, level: Level) -> bool {
                match (&a.inner, &b.inner) {
                    (Some(x), Some(y)) => self.inner.states_equal(x, y, level),
                    (None, None) => a.terminal == b.terminal,
                    _ => false,
                }
            }
        }

        impl<S: Spec> $name<S> {
            /// Places a just-computed inner transition at `next_level`: if
            /// the inner spec would still be below `n_vars`, materialize a
            /// pass-through state instead of surfacing its real level.
            fn place(&self, t: Transition<S::State>, next_level: Level) -> Transition<Self::State> {
                let (inner, terminal) = unreduction_wrap(t);
                if next_level > self.n_vars {
                    debug_assert!(inner.is_none(), "inner spec did not terminate within n_vars levels");
                    return Transition::Terminal(terminal.unwrap_or(Terminal::False));
                }
                Transition::Branch(UnreductionState { inner, terminal }, next_level)
            }
        }
    };
}

unreduction_spec!(BddUnreduction);
unreduction_spec!(ZddUnreduction);

pub fn bdd_unreduction<S: Spec>(inner: S, n_vars: Level) -> BddUnreduction<S> {
    BddUnreduction { inner, n_vars }
}

pub fn zdd_unreduction<S: Spec>(inner: S, n_vars: Level) -> ZddUnreduction<S> {
    ZddUnreduction { inner, n_vars }
}

// ---------------------------------------------------------------------
// BDD/ZDD combinators (spec §4.8): build the apply-result of two specs
// directly, without first building either operand's DD.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CombineKind {
    BddAnd,
    BddOr,
    ZddUnion,
    ZddIntersect,
}

/// One operand's progress through a combinator: either it has already
/// resolved to a boolean/terminal, or it is sitting at `level` with `state`
/// waiting for the other operand to catch up.
#[derive(Clone)]
enum Side<S> {
    Done(bool),
    Active(S, Level),
}

#[derive(Clone)]
pub struct CombinedState<A, B> {
    a: Side<A>,
    b: Side<B>,
}

pub struct Combine<A: Spec, B: Spec> {
    a: A,
    b: B,
    kind: CombineKind,
}

fn side_of<S: Spec>(spec: &S, t: Transition<S::State>) -> Side<S::State> {
    match t {
        Transition::Terminal(Terminal::False) => Side::Done(false),
        Transition::Terminal(Terminal::True) => Side::Done(true),
        Transition::Branch(s, l) => {
            let _ = spec;
            Side::Active(s, l)
        }
    }
}

impl<A: Spec, B: Spec> Combine<A, B> {
    /// Terminal short-circuit once both operands have resolved to plain
    /// booleans.
    fn terminal_result(&self, a: bool, b: bool) -> bool {
        match self.kind {
            CombineKind::BddAnd | CombineKind::ZddIntersect => a && b,
            CombineKind::BddOr | CombineKind::ZddUnion => a || b,
        }
    }

    /// Whether the combination can short-circuit knowing only one side's
    /// value (`AND`/`intersect` with a known-false side, `OR`/`union` with
    /// a known-true side) — letting the other side's DAG pass through
    /// untouched instead of being walked further.
    fn short_circuits_on(&self, value: bool) -> Option<bool> {
        match (self.kind, value) {
            (CombineKind::BddAnd, false) | (CombineKind::ZddIntersect, false) => Some(false),
            (CombineKind::BddOr, true) | (CombineKind::ZddUnion, true) => Some(true),
            _ => None,
        }
    }

    fn combine(&self, a: Side<A::State>, b: Side<B::State>) -> Transition<CombinedState<A::State, B::State>> {
        match (&a, &b) {
            (Side::Done(x), Side::Done(y)) => {
                let r = self.terminal_result(*x, *y);
                return Transition::Terminal(if r { Terminal::True } else { Terminal::False });
            }
            (Side::Done(x), Side::Active(..)) => {
                if let Some(r) = self.short_circuits_on(*x) {
                    return Transition::Terminal(if r { Terminal::True } else { Terminal::False });
                }
            }
            (Side::Active(..), Side::Done(y)) => {
                if let Some(r) = self.short_circuits_on(*y) {
                    return Transition::Terminal(if r { Terminal::True } else { Terminal::False });
                }
            }
            (Side::Active(..), Side::Active(..)) => {}
        }
        let level = match (&a, &b) {
            (Side::Active(_, la), Side::Active(_, lb)) => (*la).min(*lb),
            (Side::Active(_, l), Side::Done(_)) | (Side::Done(_), Side::Active(_, l)) => *l,
            _ => unreachable!("both-done case handled above"),
        };
        Transition::Branch(CombinedState { a, b }, level)
    }

    /// Steps one operand forward at `top_level`, leaving the other alone if
    /// it has not reached that level yet. ZDD combinators force the
    /// "untouched" side's 1-branch to FALSE (a skipped level means that
    /// variable is forced absent for that operand, per spec §4.8); BDD
    /// combinators leave it unchanged on both branches (a true "don't
    /// care").
    fn step_side<S: Spec>(&self, spec: &S, side: &Side<S::State>, top_level: Level, branch: usize) -> Side<S::State> {
        match side {
            Side::Done(v) => Side::Done(*v),
            Side::Active(state, level) if *level == top_level => side_of(spec, spec.get_child(state, top_level, branch)),
            Side::Active(state, level) => {
                let is_zdd = matches!(self.kind, CombineKind::ZddUnion | CombineKind::ZddIntersect);
                if is_zdd && branch == 1 {
                    Side::Done(false)
                } else {
                    Side::Active(state.clone(), *level)
                }
            }
        }
    }
}

pub fn bdd_and<A: Spec, B: Spec>(a: A, b: B) -> Combine<A, B> {
    Combine { a, b, kind: CombineKind::BddAnd }
}

pub fn bdd_or<A: Spec, B: Spec>(a: A, b: B) -> Combine<A, B> {
    Combine { a, b, kind: CombineKind::BddOr }
}

pub fn zdd_union<A: Spec, B: Spec>(a: A, b: B) -> Combine<A, B> {
    Combine { a, b, kind: CombineKind::ZddUnion }
}

pub fn zdd_intersection<A: Spec, B: Spec>(a: A, b: B) -> Combine<A, B> {
    Combine { a, b, kind: CombineKind::ZddIntersect }
}

impl<A: Spec, B: Spec> Spec for Combine<A, B> {
    type State = CombinedState<A::State, B::State>;

    fn get_root(&self) -> Transition<Self::State> {
        let a = side_of(&self.a, self.a.get_root());
        let b = side_of(&self.b, self.b.get_root());
        self.combine(a, b)
    }

    fn get_child(&self, state: &Self::State, level: Level, branch: usize) -> Transition<Self::State> {
        let a = self.step_side(&self.a, &state.a, level, branch);
        let b = self.step_side(&self.b, &state.b, level, branch);
        self.combine(a, b)
    }

    fn hash_state(&self, state: &Self::State, level: Level) -> u64 {
        let ha = match &state.a {
            Side::Done(v) => *v as u64,
            Side::Active(s, _) => self.a.hash_state(s, level).wrapping_mul(2).wrapping_add(2),
        };
        let hb = match &state.b {
            Side::Done(v) => *v as u64,
            Side::Active(s, _) => self.b.hash_state(s, level).wrapping_mul(2).wrapping_add(2),
        };
        ha.wrapping_mul(1_000_000_007).wrapping_add(hb)
    }

    fn states_equal(&self, x: &Self::State, y: &Self::State, level: Level) -> bool {
        let eq_a = match (&x.a, &y.a) {
            (Side::Done(p), Side::Done(q)) => p == q,
            (Side::Active(p, lp), Side::Active(q, lq)) => lp == lq && self.a.states_equal(p, q, level),
            _ => false,
        };
        let eq_b = match (&x.b, &y.b) {
            (Side::Done(p), Side::Done(q)) => p == q,
            (Side::Active(p, lp), Side::Active(q, lq)) => lp == lq && self.b.states_equal(p, q, level),
            _ => false,
        };
        eq_a && eq_b
    }
}
