//! Top-down construction from a `Spec` (spec §4.9): BFS (two-phase,
//! level-by-level), DFS (recursive, memoized), and a parallel BFS variant.
//!
//! Grounded on `original_source/include/sbdd2/tdzdd/DdSpec.hpp`'s consumer
//! side — `DdStructure::construct` walks a `Spec` breadth-first, collapsing
//! equal states within a level before moving to the next. Phase 1 discovers
//! the frontier top-down and records each child as a `(level, column)` pair
//! in a lightweight `PendingChild` scratch enum, the same forward-reference
//! idea `Arc::placeholder`/`Manager::create_placeholder_bdd` expose to
//! external collaborators, but kept off to the side here rather than routed
//! through the unique table — nothing else needs to see a builder's
//! in-progress frontier. Phase 2 resolves every pending reference
//! bottom-up into a real, reduced node under one manager-lock hold,
//! mirroring the rest of the crate's "one lock per public operation"
//! discipline.

use crate::bdd::Bdd;
use crate::common::{HashMap, Level};
use crate::error::DdResult;
use crate::manager::{Manager, ManagerInner};
use crate::spec::{Spec, Terminal, Transition};
use crate::zdd::Zdd;

use crate::arc::Arc as DdArc;

#[derive(Clone, Copy)]
enum PendingChild {
    Terminal(bool),
    Ref(Level, usize),
}

/// Finds `state`'s column within `frontier[level]`, appending it (and its
/// hash bucket entry) if it hasn't been seen before at this level.
fn intern_state<S: Spec>(
    spec: &S,
    frontier: &mut HashMap<Level, Vec<S::State>>,
    buckets: &mut HashMap<Level, HashMap<u64, Vec<usize>>>,
    level: Level,
    state: S::State,
) -> usize {
    let hash = spec.hash_state(&state, level);
    let level_buckets = buckets.entry(level).or_default();
    let level_states = frontier.entry(level).or_default();
    if let Some(existing) = level_buckets.get(&hash) {
        for &col in existing {
            if spec.states_equal(&level_states[col], &state, level) {
                return col;
            }
        }
    }
    let col = level_states.len();
    level_states.push(state);
    level_buckets.entry(hash).or_default().push(col);
    col
}

/// Phase 1: discovers every reachable state, grouped by level, and records
/// each node's (possibly still-pending) children. Returns `None` if the
/// root itself is already terminal.
fn discover<S: Spec>(spec: &S) -> Option<(Level, HashMap<Level, Vec<[PendingChild; 2]>>)> {
    debug_assert_eq!(spec.arity(), 2, "the BFS/DFS builders only support binary (BDD/ZDD) specs");

    let (root_state, root_level) = match spec.get_root() {
        Transition::Terminal(Terminal::False) => return None,
        Transition::Terminal(Terminal::True) => return None,
        Transition::Branch(s, l) => (s, l),
    };

    let mut frontier: HashMap<Level, Vec<S::State>> = HashMap::default();
    let mut buckets: HashMap<Level, HashMap<u64, Vec<usize>>> = HashMap::default();
    let mut seen_levels: crate::common::HashSet<Level> = crate::common::HashSet::default();
    frontier.insert(root_level, vec![root_state]);
    seen_levels.insert(root_level);

    let mut children_by_level: HashMap<Level, Vec<[PendingChild; 2]>> = HashMap::default();
    let mut pending_levels: Vec<Level> = vec![root_level];

    while let Some(level) = pop_min(&mut pending_levels) {
        let states = frontier.remove(&level).expect("pending level must have states");
        let mut children = Vec::with_capacity(states.len());
        for state in &states {
            let mut row = [PendingChild::Terminal(false); 2];
            for branch in 0..2 {
                row[branch] = match spec.get_child(state, level, branch) {
                    Transition::Terminal(Terminal::False) => PendingChild::Terminal(false),
                    Transition::Terminal(Terminal::True) => PendingChild::Terminal(true),
                    Transition::Branch(next_state, next_level) => {
                        debug_assert!(next_level > level, "spec levels must strictly increase along any path");
                        let col = intern_state(spec, &mut frontier, &mut buckets, next_level, next_state);
                        if seen_levels.insert(next_level) {
                            pending_levels.push(next_level);
                        }
                        PendingChild::Ref(next_level, col)
                    }
                };
            }
            children.push(row);
        }
        children_by_level.insert(level, children);
    }

    Some((root_level, children_by_level))
}

fn pop_min(levels: &mut Vec<Level>) -> Option<Level> {
    if levels.is_empty() {
        return None;
    }
    let (idx, _) = levels.iter().enumerate().min_by_key(|(_, &l)| l)?;
    Some(levels.remove(idx))
}

/// Phase 2: resolves every pending child reference bottom-up into a real,
/// reduced `Arc`, materializing each level in descending order so that a
/// level's children are always already-resolved by the time it is visited.
fn resolve(
    inner: &mut ManagerInner,
    children_by_level: HashMap<Level, Vec<[PendingChild; 2]>>,
    root_level: Level,
    is_bdd: bool,
) -> DdArc {
    let mut levels: Vec<Level> = children_by_level.keys().copied().collect();
    levels.sort_unstable_by(|a, b| b.cmp(a));

    let mut resolved: HashMap<Level, Vec<DdArc>> = HashMap::default();
    for level in levels {
        let var = inner.varorder.var_of_level(level);
        let rows = &children_by_level[&level];
        let mut arcs = Vec::with_capacity(rows.len());
        for row in rows {
            let mut children = [DdArc::terminal(false); 2];
            for (i, child) in row.iter().enumerate() {
                children[i] = match *child {
                    PendingChild::Terminal(v) => DdArc::terminal(v),
                    PendingChild::Ref(next_level, col) => resolved[&next_level][col],
                };
            }
            let arc = if is_bdd {
                inner.get_or_create_node_bdd(var, children[0], children[1])
            } else {
                inner.get_or_create_node_zdd(var, children[0], children[1])
            };
            arcs.push(arc);
        }
        resolved.insert(level, arcs);
    }

    resolved[&root_level][0]
}

/// Breadth-first construction of a reduced, canonical BDD from `spec`.
pub fn build_bdd<S: Spec>(manager: &std::sync::Arc<Manager>, spec: &S) -> DdResult<Bdd> {
    let root = spec.get_root();
    if let Transition::Terminal(t) = root {
        return Ok(match t {
            Terminal::False => Bdd::zero(manager),
            Terminal::True => Bdd::one(manager),
        });
    }
    let (root_level, children_by_level) = discover(spec).expect("non-terminal root already checked above");
    let mut inner = manager.lock();
    let arc = resolve(&mut inner, children_by_level, root_level, true);
    inner.inc_ref(arc);
    inner.maybe_gc();
    drop(inner);
    Ok(Bdd::wrap(manager.clone(), arc))
}

/// Breadth-first construction of a reduced, canonical ZDD from `spec`.
pub fn build_zdd<S: Spec>(manager: &std::sync::Arc<Manager>, spec: &S) -> DdResult<Zdd> {
    let root = spec.get_root();
    if let Transition::Terminal(t) = root {
        return Ok(match t {
            Terminal::False => Zdd::empty(manager),
            Terminal::True => Zdd::base(manager),
        });
    }
    let (root_level, children_by_level) = discover(spec).expect("non-terminal root already checked above");
    let mut inner = manager.lock();
    let arc = resolve(&mut inner, children_by_level, root_level, false);
    inner.inc_ref(arc);
    inner.maybe_gc();
    drop(inner);
    Ok(Zdd::wrap(manager.clone(), arc))
}

// ---------------------------------------------------------------------
// DFS construction: direct recursion with per-level memoization, instead
// of the BFS builders' explicit two-phase frontier. Simpler and usually
// just as fast for specs without wide, bushy frontiers; kept alongside BFS
// because the teacher's own `apply_rec`/`ite_rec` favor plain recursion and
// some specs (deep, narrow state spaces) recurse more naturally than they
// level-batch.
// ---------------------------------------------------------------------

struct DfsMemo<State> {
    buckets: HashMap<Level, HashMap<u64, Vec<(State, DdArc)>>>,
}

impl<State> DfsMemo<State> {
    fn new() -> Self {
        DfsMemo { buckets: HashMap::default() }
    }
}

fn dfs_resolve<S: Spec>(
    inner: &mut ManagerInner,
    spec: &S,
    memo: &mut DfsMemo<S::State>,
    state: &S::State,
    level: Level,
    is_bdd: bool,
) -> DdArc {
    let hash = spec.hash_state(state, level);
    if let Some(entries) = memo.buckets.get(&level).and_then(|b| b.get(&hash)) {
        for (seen_state, arc) in entries {
            if spec.states_equal(seen_state, state, level) {
                return *arc;
            }
        }
    }

    let mut children = [DdArc::terminal(false); 2];
    for branch in 0..2 {
        children[branch] = match spec.get_child(state, level, branch) {
            Transition::Terminal(Terminal::False) => DdArc::terminal(false),
            Transition::Terminal(Terminal::True) => DdArc::terminal(true),
            Transition::Branch(next_state, next_level) => {
                debug_assert!(next_level > level);
                dfs_resolve(inner, spec, memo, &next_state, next_level, is_bdd)
            }
        };
    }

    let var = inner.varorder.var_of_level(level);
    let arc =
        if is_bdd { inner.get_or_create_node_bdd(var, children[0], children[1]) } else { inner.get_or_create_node_zdd(var, children[0], children[1]) };

    memo.buckets.entry(level).or_default().entry(hash).or_default().push((state.clone(), arc));
    arc
}

pub fn build_bdd_dfs<S: Spec>(manager: &std::sync::Arc<Manager>, spec: &S) -> DdResult<Bdd> {
    debug_assert_eq!(spec.arity(), 2);
    match spec.get_root() {
        Transition::Terminal(Terminal::False) => Ok(Bdd::zero(manager)),
        Transition::Terminal(Terminal::True) => Ok(Bdd::one(manager)),
        Transition::Branch(state, level) => {
            let mut inner = manager.lock();
            let mut memo = DfsMemo::new();
            let arc = dfs_resolve(&mut inner, spec, &mut memo, &state, level, true);
            inner.inc_ref(arc);
            inner.maybe_gc();
            drop(inner);
            Ok(Bdd::wrap(manager.clone(), arc))
        }
    }
}

pub fn build_zdd_dfs<S: Spec>(manager: &std::sync::Arc<Manager>, spec: &S) -> DdResult<Zdd> {
    debug_assert_eq!(spec.arity(), 2);
    match spec.get_root() {
        Transition::Terminal(Terminal::False) => Ok(Zdd::empty(manager)),
        Transition::Terminal(Terminal::True) => Ok(Zdd::base(manager)),
        Transition::Branch(state, level) => {
            let mut inner = manager.lock();
            let mut memo = DfsMemo::new();
            let arc = dfs_resolve(&mut inner, spec, &mut memo, &state, level, false);
            inner.inc_ref(arc);
            inner.maybe_gc();
            drop(inner);
            Ok(Zdd::wrap(manager.clone(), arc))
        }
    }
}

// ---------------------------------------------------------------------
// Unreduced construction: same DFS recursion, but materializing into an
// `UnreducedBdd`/`UnreducedZdd` scratch shell instead of calling the
// manager's reduction rules, so callers that want the raw (pre-I3/I4) shape
// can inspect or further transform it before reducing.
// ---------------------------------------------------------------------

use crate::reduce::{UnreducedBdd, UnreducedZdd};

fn dfs_unreduced_bdd<S: Spec>(
    manager: &std::sync::Arc<Manager>,
    spec: &S,
    memo: &mut HashMap<Level, HashMap<u64, Vec<(S::State, UnreducedBdd)>>>,
    state: &S::State,
    level: Level,
) -> UnreducedBdd {
    let hash = spec.hash_state(state, level);
    if let Some(entries) = memo.get(&level).and_then(|b| b.get(&hash)) {
        for (seen_state, shell) in entries {
            if spec.states_equal(seen_state, state, level) {
                return shell.clone();
            }
        }
    }
    let low = match spec.get_child(state, level, 0) {
        Transition::Terminal(Terminal::False) => UnreducedBdd::zero(manager),
        Transition::Terminal(Terminal::True) => UnreducedBdd::one(manager),
        Transition::Branch(s, l) => dfs_unreduced_bdd(manager, spec, memo, &s, l),
    };
    let high = match spec.get_child(state, level, 1) {
        Transition::Terminal(Terminal::False) => UnreducedBdd::zero(manager),
        Transition::Terminal(Terminal::True) => UnreducedBdd::one(manager),
        Transition::Branch(s, l) => dfs_unreduced_bdd(manager, spec, memo, &s, l),
    };
    let var = manager.var_of_level(level);
    let shell = UnreducedBdd::node(manager, var, &low, &high);
    memo.entry(level).or_default().entry(hash).or_default().push((state.clone(), shell.clone()));
    shell
}

pub fn build_unreduced_bdd<S: Spec>(manager: &std::sync::Arc<Manager>, spec: &S) -> UnreducedBdd {
    debug_assert_eq!(spec.arity(), 2);
    match spec.get_root() {
        Transition::Terminal(Terminal::False) => UnreducedBdd::zero(manager),
        Transition::Terminal(Terminal::True) => UnreducedBdd::one(manager),
        Transition::Branch(state, level) => {
            let mut memo = HashMap::default();
            dfs_unreduced_bdd(manager, spec, &mut memo, &state, level)
        }
    }
}

fn dfs_unreduced_zdd<S: Spec>(
    manager: &std::sync::Arc<Manager>,
    spec: &S,
    memo: &mut HashMap<Level, HashMap<u64, Vec<(S::State, UnreducedZdd)>>>,
    state: &S::State,
    level: Level,
) -> UnreducedZdd {
    let hash = spec.hash_state(state, level);
    if let Some(entries) = memo.get(&level).and_then(|b| b.get(&hash)) {
        for (seen_state, shell) in entries {
            if spec.states_equal(seen_state, state, level) {
                return shell.clone();
            }
        }
    }
    let low = match spec.get_child(state, level, 0) {
        Transition::Terminal(Terminal::False) => UnreducedZdd::empty(manager),
        Transition::Terminal(Terminal::True) => UnreducedZdd::base(manager),
        Transition::Branch(s, l) => dfs_unreduced_zdd(manager, spec, memo, &s, l),
    };
    let high = match spec.get_child(state, level, 1) {
        Transition::Terminal(Terminal::False) => UnreducedZdd::empty(manager),
        Transition::Terminal(Terminal::True) => UnreducedZdd::base(manager),
        Transition::Branch(s, l) => dfs_unreduced_zdd(manager, spec, memo, &s, l),
    };
    let var = manager.var_of_level(level);
    let shell = UnreducedZdd::node(manager, var, &low, &high);
    memo.entry(level).or_default().entry(hash).or_default().push((state.clone(), shell.clone()));
    shell
}

pub fn build_unreduced_zdd<S: Spec>(manager: &std::sync::Arc<Manager>, spec: &S) -> UnreducedZdd {
    debug_assert_eq!(spec.arity(), 2);
    match spec.get_root() {
        Transition::Terminal(Terminal::False) => UnreducedZdd::empty(manager),
        Transition::Terminal(Terminal::True) => UnreducedZdd::base(manager),
        Transition::Branch(state, level) => {
            let mut memo = HashMap::default();
            dfs_unreduced_zdd(manager, spec, &mut memo, &state, level)
        }
    }
}

// ---------------------------------------------------------------------
// Parallel BFS: phase 1's per-level transition computation is embarrassingly
// parallel (each state's children depend only on the spec and the state
// itself), so it is farmed out across a `crossbeam::thread::scope`; the
// dedup/merge step that turns those transitions into frontier columns stays
// sequential, matching the "sequential merge, parallel compute" split noted
// for the parallel builder.
// ---------------------------------------------------------------------

const PARALLEL_CHUNK_THRESHOLD: usize = 64;

fn discover_parallel<S>(spec: &S) -> Option<(Level, HashMap<Level, Vec<[PendingChild; 2]>>)>
where
    S: Spec + Sync,
    S::State: Send,
{
    debug_assert_eq!(spec.arity(), 2);

    let (root_state, root_level) = match spec.get_root() {
        Transition::Terminal(_) => return None,
        Transition::Branch(s, l) => (s, l),
    };

    let mut frontier: HashMap<Level, Vec<S::State>> = HashMap::default();
    let mut buckets: HashMap<Level, HashMap<u64, Vec<usize>>> = HashMap::default();
    frontier.insert(root_level, vec![root_state]);

    let mut children_by_level: HashMap<Level, Vec<[PendingChild; 2]>> = HashMap::default();
    let mut pending_levels: Vec<Level> = vec![root_level];

    while let Some(level) = pop_min(&mut pending_levels) {
        let states = frontier.remove(&level).expect("pending level must have states");

        let transitions: Vec<[Transition<S::State>; 2]> = if states.len() >= PARALLEL_CHUNK_THRESHOLD {
            let num_workers = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(8).max(1);
            let chunk_size = (states.len() + num_workers - 1) / num_workers;
            crossbeam::thread::scope(|scope| {
                let handles: Vec<_> = states
                    .chunks(chunk_size)
                    .map(|chunk| {
                        scope.spawn(move |_| {
                            chunk
                                .iter()
                                .map(|state| [spec.get_child(state, level, 0), spec.get_child(state, level, 1)])
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();
                handles.into_iter().flat_map(|h| h.join().expect("builder worker thread panicked")).collect()
            })
            .expect("crossbeam scope failed")
        } else {
            states.iter().map(|state| [spec.get_child(state, level, 0), spec.get_child(state, level, 1)]).collect()
        };

        let mut children = Vec::with_capacity(transitions.len());
        for transition_pair in transitions {
            let mut row = [PendingChild::Terminal(false); 2];
            for (branch, t) in transition_pair.into_iter().enumerate() {
                row[branch] = match t {
                    Transition::Terminal(Terminal::False) => PendingChild::Terminal(false),
                    Transition::Terminal(Terminal::True) => PendingChild::Terminal(true),
                    Transition::Branch(next_state, next_level) => {
                        debug_assert!(next_level > level);
                        let was_pending = pending_levels.contains(&next_level);
                        let col = intern_state(spec, &mut frontier, &mut buckets, next_level, next_state);
                        if !was_pending {
                            pending_levels.push(next_level);
                        }
                        PendingChild::Ref(next_level, col)
                    }
                };
            }
            children.push(row);
        }
        children_by_level.insert(level, children);
    }

    Some((root_level, children_by_level))
}

/// Parallel-discovery BFS construction of a reduced, canonical BDD.
pub fn build_bdd_mp<S>(manager: &std::sync::Arc<Manager>, spec: &S) -> DdResult<Bdd>
where
    S: Spec + Sync,
    S::State: Send,
{
    let root = spec.get_root();
    if let Transition::Terminal(t) = root {
        return Ok(match t {
            Terminal::False => Bdd::zero(manager),
            Terminal::True => Bdd::one(manager),
        });
    }
    let (root_level, children_by_level) = discover_parallel(spec).expect("non-terminal root already checked above");
    let mut inner = manager.lock();
    let arc = resolve(&mut inner, children_by_level, root_level, true);
    inner.inc_ref(arc);
    inner.maybe_gc();
    drop(inner);
    Ok(Bdd::wrap(manager.clone(), arc))
}

/// Parallel-discovery BFS construction of a reduced, canonical ZDD.
pub fn build_zdd_mp<S>(manager: &std::sync::Arc<Manager>, spec: &S) -> DdResult<Zdd>
where
    S: Spec + Sync,
    S::State: Send,
{
    let root = spec.get_root();
    if let Transition::Terminal(t) = root {
        return Ok(match t {
            Terminal::False => Zdd::empty(manager),
            Terminal::True => Zdd::base(manager),
        });
    }
    let (root_level, children_by_level) = discover_parallel(spec).expect("non-terminal root already checked above");
    let mut inner = manager.lock();
    let arc = resolve(&mut inner, children_by_level, root_level, false);
    inner.inc_ref(arc);
    inner.maybe_gc();
    drop(inner);
    Ok(Zdd::wrap(manager.clone(), arc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Spec;

    /// The power set of `{1, ..., n}` as a ZDD: every level offers both a
    /// "not in the set" and "in the set" branch, converging on BASE.
    struct PowerSet {
        n: Level,
    }

    impl Spec for PowerSet {
        type State = Level;

        fn get_root(&self) -> Transition<Level> {
            if self.n == 0 {
                Transition::Terminal(Terminal::True)
            } else {
                Transition::Branch(1, 1)
            }
        }

        fn get_child(&self, state: &Level, level: Level, _branch: usize) -> Transition<Level> {
            debug_assert_eq!(*state, level);
            if level == self.n {
                Transition::Terminal(Terminal::True)
            } else {
                Transition::Branch(level + 1, level + 1)
            }
        }

        fn hash_state(&self, state: &Level, _level: Level) -> u64 {
            *state as u64
        }

        fn states_equal(&self, a: &Level, b: &Level, _level: Level) -> bool {
            a == b
        }
    }

    #[test]
    fn bfs_power_set_has_correct_cardinality() {
        let m = Manager::new();
        for _ in 0..4 {
            m.new_var();
        }
        let built = build_zdd(&m, &PowerSet { n: 4 }).unwrap();
        assert_eq!(built.card(), 16);
    }

    #[test]
    fn bfs_and_dfs_builders_agree() {
        let m = Manager::new();
        for _ in 0..4 {
            m.new_var();
        }
        let bfs = build_zdd(&m, &PowerSet { n: 4 }).unwrap();
        let dfs = build_zdd_dfs(&m, &PowerSet { n: 4 }).unwrap();
        assert_eq!(bfs, dfs);
    }

    #[test]
    fn parallel_bfs_matches_sequential_bfs() {
        let m = Manager::new();
        for _ in 0..4 {
            m.new_var();
        }
        let seq = build_zdd(&m, &PowerSet { n: 4 }).unwrap();
        let par = build_zdd_mp(&m, &PowerSet { n: 4 }).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn unreduced_builder_reduces_to_same_result() {
        let m = Manager::new();
        for _ in 0..4 {
            m.new_var();
        }
        let direct = build_zdd(&m, &PowerSet { n: 4 }).unwrap();
        let via_unreduced = build_unreduced_zdd(&m, &PowerSet { n: 4 }).reduce();
        assert_eq!(direct, via_unreduced);
    }
}
