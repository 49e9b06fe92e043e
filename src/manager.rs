//! The shared manager: unique table, operation cache, variable order, and
//! reference-counted mark-and-sweep GC (spec §4.4, §5).
//!
//! A single `Manager` services both BDD and ZDD node creation, mirroring
//! `original_source/include/sbdd2/dd_manager.hpp`'s one-class design rather
//! than the teacher's separate `BddManager`/`ZddManager`. Its mutable state
//! sits behind one `Mutex`, taken once at the top of every public BDD/ZDD
//! operation and held for that operation's whole recursive descent — apply
//! is sequential under a lock, per spec's non-goal of thread-parallel apply.
//! A second, independent `Mutex` guards the MTBDD terminal-table registry,
//! since collaborators take that lock on an unrelated path.

use std::any::{Any, TypeId};
use std::sync::Mutex;

use crate::arc::Arc;
use crate::cache::OpCache;
use crate::common::{HashMap, HashSet, Level, NodeIndex, TerminalValue, Var};
use crate::error::{DdError, DdResult};
use crate::node::Node;
use crate::utable::UniqueTable;
use crate::varorder::VarOrder;

const DEFAULT_NODE_TABLE_SIZE: usize = 1 << 20;
const DEFAULT_CACHE_SIZE: usize = 1 << 18;

/// Tunables for when the manager runs a GC pass and how aggressively it
/// grows the dedup index afterward (spec §4.4).
#[derive(Debug, Clone, Copy)]
pub struct GcPolicy {
    /// Dedup-index occupancy (including tombstones) above which a GC pass
    /// is triggered before the next node creation.
    pub load_factor: f64,
    /// GC is skipped below this many live nodes — not worth a full mark
    /// sweep over a handful of diagrams.
    pub min_alive_nodes: usize,
}

impl Default for GcPolicy {
    fn default() -> GcPolicy {
        GcPolicy { load_factor: 0.75, min_alive_nodes: 1024 }
    }
}

pub(crate) struct ManagerInner {
    pub(crate) utable: UniqueTable,
    pub(crate) cache: OpCache,
    pub(crate) varorder: VarOrder,
    pub(crate) gc_policy: GcPolicy,
    gc_runs: u64,
    /// Builder-only scratch slots (spec §6 Placeholder API): a reservation
    /// for a node whose children are not known yet. Kept in a vector
    /// separate from `utable` so these are invisible to GC's mark-sweep
    /// until `finalize_node_*` resolves them into real, uniquified nodes.
    placeholders: Vec<Option<Var>>,
}

impl ManagerInner {
    fn new(node_table_size: usize, cache_size: usize) -> ManagerInner {
        ManagerInner {
            utable: UniqueTable::with_capacity(node_table_size, node_table_size),
            cache: OpCache::with_capacity(cache_size),
            varorder: VarOrder::new(),
            gc_policy: GcPolicy::default(),
            gc_runs: 0,
            placeholders: Vec::new(),
        }
    }

    /// BDD node constructor: applies the `low == high` reduction and the
    /// negation-edge canonicalization (I2) before interning.
    ///
    /// Does *not* run GC itself: this is called from deep inside a
    /// recursive `apply`/builder descent, where every intermediate result
    /// is reachable only via the Rust call stack and has `refcount == 0`.
    /// `gc()`'s mark phase only roots `refcount > 0` nodes, so collecting
    /// here would free a live in-flight node out from under its caller.
    /// Callers run `maybe_gc()` once, at the public operation boundary,
    /// after the final result has been `inc_ref`'d.
    pub(crate) fn get_or_create_node_bdd(&mut self, var: Var, low: Arc, high: Arc) -> Arc {
        if low == high {
            return low;
        }
        if high.is_negated() {
            let index = self.utable.find_or_insert(var, low.negated(), high.without_negation());
            Arc::node(index, true)
        } else {
            let index = self.utable.find_or_insert(var, low, high);
            Arc::node(index, false)
        }
    }

    /// ZDD node constructor: applies the "1-child is FALSE" reduction (I4).
    /// ZDD arcs never carry a negation bit. Same GC-deferral contract as
    /// `get_or_create_node_bdd`.
    pub(crate) fn get_or_create_node_zdd(&mut self, var: Var, low: Arc, high: Arc) -> Arc {
        if high == Arc::terminal(false) {
            return low;
        }
        let index = self.utable.find_or_insert(var, low, high);
        Arc::node(index, false)
    }

    pub(crate) fn inc_ref(&mut self, arc: Arc) {
        if arc.is_constant() || arc.is_placeholder() {
            return;
        }
        if let Some(node) = self.utable.get_mut(arc.index()) {
            node.meta.refcount += 1;
        }
    }

    pub(crate) fn dec_ref(&mut self, arc: Arc) {
        if arc.is_constant() || arc.is_placeholder() {
            return;
        }
        if let Some(node) = self.utable.get_mut(arc.index()) {
            node.meta.refcount = node.meta.refcount.saturating_sub(1);
        }
    }

    pub(crate) fn node(&self, index: NodeIndex) -> &Node {
        self.utable.get(index).expect("dangling node index")
    }

    /// Mark-and-sweep: every node with `refcount > 0` is a root; anything
    /// unreachable from the root set is freed. Returns the number of nodes
    /// freed.
    pub(crate) fn gc(&mut self) -> usize {
        let mut stack: Vec<NodeIndex> = self
            .utable
            .iter_live()
            .filter(|(_, node)| node.meta.refcount > 0)
            .map(|(index, _)| index)
            .collect();
        let mut marked: HashSet<NodeIndex> = HashSet::default();
        while let Some(index) = stack.pop() {
            if !marked.insert(index) {
                continue;
            }
            if let Some(node) = self.utable.get(index) {
                for child in [node.low, node.high] {
                    if !child.is_constant() && !child.is_placeholder() && !marked.contains(&child.index()) {
                        stack.push(child.index());
                    }
                }
            }
        }
        let dead: Vec<NodeIndex> =
            self.utable.iter_live().filter(|(index, _)| !marked.contains(index)).map(|(index, _)| index).collect();
        let freed = dead.len();
        for index in dead {
            self.utable.free(index);
        }
        if freed > 0 {
            self.cache.clear();
        }
        self.gc_runs += 1;
        log::debug!("gc pass #{}: freed {} nodes, {} live remain", self.gc_runs, freed, self.utable.len());
        freed
    }

    /// Runs a GC pass (and grows the dedup index if that alone doesn't
    /// relieve load) when the table is past its policy threshold. Only
    /// safe to call when every node reachable solely via the current call
    /// stack has already been abandoned — i.e. at a public operation
    /// boundary, after the operation's own result has been `inc_ref`'d.
    pub(crate) fn maybe_gc(&mut self) {
        if self.utable.len() < self.gc_policy.min_alive_nodes {
            return;
        }
        if !self.utable.needs_resize() {
            return;
        }
        let freed = self.gc();
        if freed == 0 || self.utable.needs_resize() {
            let new_capacity = self.utable.index_capacity() * 2;
            log::debug!("growing dedup index to {} slots", new_capacity);
            self.utable.rehash_index(new_capacity);
        }
    }

    /// Reserves a scratch slot for a node at `var` whose children a
    /// top-down builder hasn't discovered yet. The slot lives outside
    /// `utable` until `finalize_node_bdd` resolves it.
    pub(crate) fn create_placeholder_bdd(&mut self, var: Var) -> usize {
        self.placeholders.push(Some(var));
        self.placeholders.len() - 1
    }

    /// ZDD counterpart of `create_placeholder_bdd`. The two share the same
    /// scratch bookkeeping; only the reduction rule applied at finalize
    /// time differs.
    pub(crate) fn create_placeholder_zdd(&mut self, var: Var) -> usize {
        self.create_placeholder_bdd(var)
    }

    /// Resolves a placeholder into a real, uniquified BDD node and frees
    /// its scratch slot. `reduced` lets a caller that already checked the
    /// `low == high` rule itself skip the redundant check here; the I2
    /// negation-edge canonicalization is always applied regardless. Same
    /// GC-deferral contract as `get_or_create_node_bdd`: the caller runs
    /// `maybe_gc()` once the finalized root is `inc_ref`'d.
    pub(crate) fn finalize_node_bdd(&mut self, index: usize, low: Arc, high: Arc, reduced: bool) -> Arc {
        let var = self.placeholders[index].take().expect("placeholder already finalized");
        if reduced {
            debug_assert!(low != high, "reduced_flag asserted but low == high");
            if high.is_negated() {
                let idx = self.utable.find_or_insert(var, low.negated(), high.without_negation());
                Arc::node(idx, true)
            } else {
                let idx = self.utable.find_or_insert(var, low, high);
                Arc::node(idx, false)
            }
        } else {
            self.get_or_create_node_bdd(var, low, high)
        }
    }

    /// Resolves a placeholder into a real, uniquified ZDD node and frees
    /// its scratch slot, applying the "1-child is FALSE" rule (I4) unless
    /// the caller already guarantees it holds. Same GC-deferral contract as
    /// `get_or_create_node_bdd`.
    pub(crate) fn finalize_node_zdd(&mut self, index: usize, low: Arc, high: Arc, reduced: bool) -> Arc {
        let var = self.placeholders[index].take().expect("placeholder already finalized");
        if reduced {
            debug_assert!(high != Arc::terminal(false), "reduced_flag asserted but high == FALSE");
            let idx = self.utable.find_or_insert(var, low, high);
            Arc::node(idx, false)
        } else {
            self.get_or_create_node_zdd(var, low, high)
        }
    }

    /// Drops every outstanding, unfinalized placeholder slot — used when a
    /// build is abandoned partway through.
    pub(crate) fn clear_unlinked_nodes(&mut self) {
        self.placeholders.clear();
    }
}

pub struct Manager {
    pub(crate) inner: Mutex<ManagerInner>,
    mtbdd_tables: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl Manager {
    pub fn new() -> std::sync::Arc<Manager> {
        Manager::with_capacity(DEFAULT_NODE_TABLE_SIZE, DEFAULT_CACHE_SIZE)
    }

    pub fn with_capacity(node_table_size: usize, cache_size: usize) -> std::sync::Arc<Manager> {
        std::sync::Arc::new(Manager {
            inner: Mutex::new(ManagerInner::new(node_table_size, cache_size)),
            mtbdd_tables: Mutex::new(HashMap::default()),
        })
    }

    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, ManagerInner> {
        self.inner.lock().expect("manager mutex poisoned")
    }

    pub fn set_gc_policy(&self, policy: GcPolicy) {
        self.lock().gc_policy = policy;
    }

    pub fn new_var(&self) -> Var {
        self.lock().varorder.new_var()
    }

    pub fn new_var_of_level(&self, level: Level) -> DdResult<Var> {
        let mut inner = self.lock();
        if level < 1 || level > inner.varorder.bottom_level() + 1 {
            return Err(DdError::InvalidArgument(format!("level {} out of range", level)));
        }
        Ok(inner.varorder.new_var_of_level(level))
    }

    pub fn var_count(&self) -> usize {
        self.lock().varorder.var_count()
    }

    pub fn level_of(&self, var: Var) -> Level {
        self.lock().varorder.level_of(var)
    }

    pub fn var_of_level(&self, level: Level) -> Var {
        self.lock().varorder.var_of_level(level)
    }

    pub fn level_vars(&self) -> Vec<Var> {
        self.lock().varorder.level_vars().to_vec()
    }

    /// Forces an immediate GC pass, bypassing the load-factor trigger.
    pub fn gc(&self) -> usize {
        self.lock().gc()
    }

    pub fn node_count(&self) -> usize {
        self.lock().utable.len()
    }

    pub fn table_capacity(&self) -> usize {
        self.lock().utable.index_capacity()
    }

    pub fn cache_capacity(&self) -> usize {
        self.lock().cache.capacity()
    }

    pub fn cache_hit_rate(&self) -> f64 {
        self.lock().cache.hit_rate()
    }

    /// Registers (creating on first use) the `T`-valued terminal table an
    /// MTBDD/MTZDD collaborator uses to intern terminal values outside this
    /// crate's Boolean-only node set (spec §6). The core never populates or
    /// reads this table itself.
    pub fn get_or_create_terminal_table<T>(&self) -> std::sync::Arc<Mutex<HashMap<T, NodeIndex>>>
    where
        T: TerminalValue + 'static,
    {
        let mut tables = self.mtbdd_tables.lock().expect("terminal table registry mutex poisoned");
        let type_id = TypeId::of::<T>();
        let entry = tables.entry(type_id).or_insert_with(|| {
            let table: std::sync::Arc<Mutex<HashMap<T, NodeIndex>>> = std::sync::Arc::new(Mutex::new(HashMap::default()));
            Box::new(table) as Box<dyn Any + Send + Sync>
        });
        entry
            .downcast_ref::<std::sync::Arc<Mutex<HashMap<T, NodeIndex>>>>()
            .expect("terminal table registered under a mismatched type")
            .clone()
    }

    /// Hook point for an MTBDD collaborator: constructs a node with the
    /// core's ordinary BDD reduction rule. The terminal-value semantics
    /// (which `high`/`low` point at a terminal-table entry rather than at
    /// `Arc::terminal(bool)`) are the collaborator's responsibility.
    pub fn get_or_create_node_mtbdd(&self, var: Var, low: Arc, high: Arc) -> Arc {
        self.lock().get_or_create_node_bdd(var, low, high)
    }

    /// Hook point for an MTZDD collaborator, mirroring
    /// `get_or_create_node_mtbdd` but with the ZDD reduction rule.
    pub fn get_or_create_node_mtzdd(&self, var: Var, low: Arc, high: Arc) -> Arc {
        self.lock().get_or_create_node_zdd(var, low, high)
    }

    /// Builder-only placeholder API (spec §6): reserves a node at `var`
    /// before its children are known. A top-down construction frame can
    /// hand out the returned index as a forward reference and later
    /// resolve it with `finalize_node_bdd`, without forcing every level
    /// of a frontier to be discovered before any node is interned.
    pub fn create_placeholder_bdd(&self, var: Var) -> usize {
        self.lock().create_placeholder_bdd(var)
    }

    /// ZDD counterpart of `create_placeholder_bdd`.
    pub fn create_placeholder_zdd(&self, var: Var) -> usize {
        self.lock().create_placeholder_zdd(var)
    }

    /// Resolves a placeholder returned by `create_placeholder_bdd` into a
    /// real, uniquified node. `reduced` may be set when the caller already
    /// knows `low != high`, sparing the manager a redundant check.
    pub fn finalize_node_bdd(&self, index: usize, low: Arc, high: Arc, reduced: bool) -> Arc {
        self.lock().finalize_node_bdd(index, low, high, reduced)
    }

    /// Resolves a placeholder returned by `create_placeholder_zdd` into a
    /// real, uniquified node. `reduced` may be set when the caller already
    /// knows `high != FALSE`, sparing the manager a redundant check.
    pub fn finalize_node_zdd(&self, index: usize, low: Arc, high: Arc, reduced: bool) -> Arc {
        self.lock().finalize_node_zdd(index, low, high, reduced)
    }

    /// Drops every outstanding, unfinalized placeholder slot. A builder
    /// calls this after an aborted construction so the scratch vector
    /// doesn't grow unbounded across repeated failed attempts.
    pub fn clear_unlinked_nodes(&self) {
        self.lock().clear_unlinked_nodes();
    }
}
