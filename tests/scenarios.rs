//! End-to-end scenarios exercising the BDD/ZDD core as a whole: algebra,
//! indexed ZDD enumeration, and the top-down builder agreeing across its
//! BFS/DFS/parallel strategies.

use std::collections::HashMap;

use dd::bdd::Bdd;
use dd::builder::{build_zdd, build_zdd_dfs, build_zdd_mp};
use dd::common::{Level, Var};
use dd::manager::Manager;
use dd::spec::{structural_hash, Spec, Terminal, Transition};
use dd::zdd::Zdd;

#[test]
fn and_or_duality_on_three_vars() {
    let m = Manager::new();
    let v1 = m.new_var();
    let v2 = m.new_var();
    let v3 = m.new_var();
    let x1 = Bdd::var(&m, v1);
    let x2 = Bdd::var(&m, v2);
    let x3 = Bdd::var(&m, v3);

    let f = x1.and(&x2).unwrap().or(&x3).unwrap();

    assert_eq!(f.count(), 5);
    assert_eq!(f.support(), vec![v1, v2, v3]);
    assert!(f.one_sat().is_some());
    assert_eq!(f.not().not(), f);
}

#[test]
fn zdd_power_set_ranking_and_weights() {
    let m = Manager::new();
    let vars: Vec<Var> = (0..4).map(|_| m.new_var()).collect();

    let mut family = Zdd::base(&m);
    for &v in &vars {
        let single = Zdd::singleton(&m, v);
        family = family.union(&single.product(&family).unwrap()).unwrap();
    }

    assert_eq!(family.card(), 16);
    for i in 0..16u64 {
        let set = family.get_set(i).expect("rank in range");
        assert_eq!(family.order_of(&set), Some(i));
    }

    let total = family.sum_weight(|v| v as f64);
    assert!((total - 80.0).abs() < 1e-9);
}

/// Counts subsets of `vars` of size exactly `k`, memoized on
/// `(remaining index, remaining target)` so each of the at-most
/// `vars.len() * (k + 1)` states is built once.
fn exactly_n(
    m: &std::sync::Arc<Manager>,
    vars: &[Var],
    idx: usize,
    target: i64,
    memo: &mut HashMap<(usize, i64), Bdd>,
) -> Bdd {
    if target < 0 || target > (vars.len() - idx) as i64 {
        return Bdd::zero(m);
    }
    if idx == vars.len() {
        return if target == 0 { Bdd::one(m) } else { Bdd::zero(m) };
    }
    if let Some(b) = memo.get(&(idx, target)) {
        return b.clone();
    }
    let excluded = exactly_n(m, vars, idx + 1, target, memo);
    let included = exactly_n(m, vars, idx + 1, target - 1, memo);
    let x = Bdd::var(m, vars[idx]);
    let result = x.ite(&included, &excluded).unwrap();
    memo.insert((idx, target), result.clone());
    result
}

/// The 4x4x4 tic-tac-toe "winning lines": every line of 4 cells that lies
/// along a row, column, pillar, face diagonal, or space diagonal of the
/// cube, indexed `0..64` in raster order (`x + 4*y + 16*z`).
fn tic_tac_toe_lines() -> Vec<[usize; 4]> {
    let idx = |x: i32, y: i32, z: i32| -> usize { (x + 4 * y + 16 * z) as usize };
    let mut lines = Vec::new();
    let range = 0..4i32;

    // Lines that vary along exactly one axis (rows/columns/pillars), or
    // along two axes (face diagonals within a fixed-coordinate slice), or
    // all three axes (space diagonals) — generated by scanning every axis
    // direction `(dx, dy, dz) != (0,0,0)` with entries in `{-1,0,1}` and
    // taking each maximal run of 4 cells exactly once (canonical direction
    // has its first nonzero component positive).
    let dirs = [
        (1, 0, 0),
        (0, 1, 0),
        (0, 0, 1),
        (1, 1, 0),
        (1, -1, 0),
        (1, 0, 1),
        (1, 0, -1),
        (0, 1, 1),
        (0, 1, -1),
        (1, 1, 1),
        (1, 1, -1),
        (1, -1, 1),
        (1, -1, -1),
    ];
    for &(dx, dy, dz) in &dirs {
        for x in range.clone() {
            for y in range.clone() {
                for z in range.clone() {
                    let ex = x + 3 * dx;
                    let ey = y + 3 * dy;
                    let ez = z + 3 * dz;
                    if !(0..4).contains(&ex) || !(0..4).contains(&ey) || !(0..4).contains(&ez) {
                        continue;
                    }
                    // Only take the line starting at its lexicographically
                    // smallest cell so each of the 76 lines is emitted once.
                    let bx = x - dx;
                    let by = y - dy;
                    let bz = z - dz;
                    if (0..4).contains(&bx) && (0..4).contains(&by) && (0..4).contains(&bz) {
                        continue;
                    }
                    let cells = [idx(x, y, z), idx(x + dx, y + dy, z + dz), idx(x + 2 * dx, y + 2 * dy, z + 2 * dz), idx(ex, ey, ez)];
                    lines.push(cells);
                }
            }
        }
    }
    lines
}

#[test]
fn tic_tac_toe_lines_total_seventy_six() {
    assert_eq!(tic_tac_toe_lines().len(), 76);
}

#[test]
fn tic_tac_toe_draws_with_twenty_crosses() {
    let m = Manager::new();
    let vars: Vec<Var> = (0..64).map(|_| m.new_var()).collect();

    let mut memo = HashMap::new();
    let mut f = exactly_n(&m, &vars, 0, 20, &mut memo);

    for line in tic_tac_toe_lines() {
        let cells: Vec<Bdd> = line.iter().map(|&c| Bdd::var(&m, vars[c])).collect();
        let all_crosses = cells[1..].iter().fold(cells[0].clone(), |acc, c| acc.and(c).unwrap());
        let all_blank = cells.iter().map(|c| c.not()).reduce(|acc, c| acc.and(&c).unwrap()).unwrap();
        let line_ok = all_crosses.or(&all_blank).unwrap().not();
        f = f.and(&line_ok).unwrap();
    }

    assert_eq!(f.count(), 304);
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum HamiltonState {
    Root,
    AfterFirstEdge { deg0: u8, deg1: u8 },
    AfterSecondEdge { deg0: u8, deg2: u8 },
}

/// Edges of K3, visited in the order `(0,1)`, `(1,2)`, `(0,2)`. A set of
/// edges is kept iff it is a Hamiltonian path from vertex 0 to vertex 2:
/// degree 1 at both endpoints, degree 2 at the interior vertex.
struct HamiltonPathOnK3;

impl Spec for HamiltonPathOnK3 {
    type State = HamiltonState;

    fn get_root(&self) -> Transition<HamiltonState> {
        Transition::Branch(HamiltonState::Root, 1)
    }

    fn get_child(&self, state: &HamiltonState, level: Level, branch: usize) -> Transition<HamiltonState> {
        let b = branch as u8;
        match (*state, level) {
            (HamiltonState::Root, 1) => Transition::Branch(HamiltonState::AfterFirstEdge { deg0: b, deg1: b }, 2),
            (HamiltonState::AfterFirstEdge { deg0, deg1 }, 2) => {
                if deg1 + b != 2 {
                    Transition::Terminal(Terminal::False)
                } else {
                    Transition::Branch(HamiltonState::AfterSecondEdge { deg0, deg2: b }, 3)
                }
            }
            (HamiltonState::AfterSecondEdge { deg0, deg2 }, 3) => {
                if deg0 + b == 1 && deg2 + b == 1 {
                    Transition::Terminal(Terminal::True)
                } else {
                    Transition::Terminal(Terminal::False)
                }
            }
            _ => unreachable!("every (state, level) pair is covered above"),
        }
    }

    fn hash_state(&self, state: &HamiltonState, _level: Level) -> u64 {
        structural_hash(state)
    }

    fn states_equal(&self, a: &HamiltonState, b: &HamiltonState, _level: Level) -> bool {
        a == b
    }
}

#[test]
fn hamilton_path_on_k3_has_a_unique_solution() {
    let m = Manager::new();
    for _ in 0..3 {
        m.new_var();
    }
    let z = build_zdd(&m, &HamiltonPathOnK3).unwrap();
    assert_eq!(z.card(), 1);
    // The only Hamiltonian 0-to-2 path uses edges (0,1) and (1,2), not the
    // direct edge (0,2) — that would skip vertex 1.
    assert_eq!(z.one_set(), Some(vec![1, 2]));
}

/// The power set of `{1, ..., n}`, used to check that every builder
/// strategy produces the same canonical ZDD.
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
fn bfs_dfs_and_parallel_builders_agree() {
    let m = Manager::new();
    for _ in 0..6 {
        m.new_var();
    }
    let spec = PowerSet { n: 6 };
    let bfs = build_zdd(&m, &spec).unwrap();
    let dfs = build_zdd_dfs(&m, &spec).unwrap();
    let parallel = build_zdd_mp(&m, &spec).unwrap();

    assert_eq!(bfs, dfs);
    assert_eq!(bfs, parallel);
    assert_eq!(bfs.card(), 64);
}

#[test]
fn restrict_matches_the_shannon_expansion() {
    let m = Manager::new();
    let v1 = m.new_var();
    let v2 = m.new_var();
    let v3 = m.new_var();
    let x1 = Bdd::var(&m, v1);
    let x2 = Bdd::var(&m, v2);
    let x3 = Bdd::var(&m, v3);
    let f = x1.and(&x2).unwrap().or(&x3).unwrap();

    for &v in &[v1, v2, v3] {
        let at1 = f.restrict(v, true).unwrap();
        let at0 = f.restrict(v, false).unwrap();
        let xv = Bdd::var(&m, v);
        let rebuilt = xv.ite(&at1, &at0).unwrap();
        assert_eq!(rebuilt, f, "restrict/cofactor reconstruction failed for var {}", v);
    }
}
