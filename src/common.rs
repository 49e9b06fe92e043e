use num_traits::{NumOps, One, Zero};
use std::fmt::Display;
use std::hash::{BuildHasherDefault, Hash};
use wyhash::WyHash;

pub type HashMap<T, U> = std::collections::HashMap<T, U, BuildHasherDefault<WyHash>>;
pub type HashSet<T> = std::collections::HashSet<T, BuildHasherDefault<WyHash>>;

/// A variable number. Assigned in creation order, 1-indexed; variable `0`
/// is never assigned and terminals carry no variable at all.
pub type Var = u32;

/// A level number, 1-indexed. Level 1 is the top (closest to the root);
/// higher numbers sit closer to the terminals (spec §3).
pub type Level = u32;

/// Index of a node inside the manager's unique table.
pub type NodeIndex = u32;

/// Value type a terminal table (MTBDD/MTZDD collaborator hook, spec §6) may
/// hold. `T::zero()` is reserved as the "zero terminal" used by the MTZDD
/// reduction rule.
pub trait TerminalValue:
    Copy + Clone + PartialEq + Eq + Hash + NumOps + Display + Ord + Zero + One
{
}

impl TerminalValue for u32 {}
impl TerminalValue for u64 {}
impl TerminalValue for i32 {}
impl TerminalValue for i64 {}

/// Weight type used by edge-valued collaborators (EVMDD) and by the
/// indexed-order subsystem's weight-ordered enumeration (spec §4.10).
pub trait EdgeValue: Copy + Clone + PartialEq + Eq + Hash + NumOps + Display + Ord + Zero {}

impl EdgeValue for i32 {}
impl EdgeValue for i64 {}
