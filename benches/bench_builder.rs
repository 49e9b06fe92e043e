use dd::builder::{build_zdd, build_zdd_dfs, build_zdd_mp};
use dd::common::Level;
use dd::manager::Manager;
use dd::spec::{Spec, Terminal, Transition};

fn clock<F, T>(s: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let start = std::time::Instant::now();
    let result = f();
    let end = start.elapsed();
    println!("{}: time {}", s, end.as_secs_f64());
    result
}

/// The power set of `{1, ..., n}`: every level branches into "absent" and
/// "present", converging on BASE once every variable has been decided.
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

fn bench_power_set_builders(n: Level) {
    let m_bfs = Manager::new();
    for _ in 0..n {
        m_bfs.new_var();
    }
    let bfs = clock("BFS build", || build_zdd(&m_bfs, &PowerSet { n }).unwrap());
    println!("  BFS node count: {}, card: {}", m_bfs.node_count(), bfs.card());

    let m_dfs = Manager::new();
    for _ in 0..n {
        m_dfs.new_var();
    }
    let dfs = clock("DFS build", || build_zdd_dfs(&m_dfs, &PowerSet { n }).unwrap());
    println!("  DFS node count: {}, card: {}", m_dfs.node_count(), dfs.card());

    let m_mp = Manager::new();
    for _ in 0..n {
        m_mp.new_var();
    }
    let mp = clock("parallel BFS build", || build_zdd_mp(&m_mp, &PowerSet { n }).unwrap());
    println!("  parallel BFS node count: {}, card: {}", m_mp.node_count(), mp.card());
}

fn main() {
    bench_power_set_builders(20);
}
