use dd::manager::Manager;
use dd::zdd::Zdd;

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

/// Builds the power set of `n` variables by repeated `change`, then reads
/// its cardinality back through both the exact-count walk and the indexed
/// ranking table.
fn bench_zdd_power_set(n: usize) {
    let m = Manager::new();
    let vars: Vec<_> = (0..n).map(|_| m.new_var()).collect();

    let family = clock(&format!("power set over {} vars", n), || {
        let mut z = Zdd::base(&m);
        for &v in &vars {
            let with_v = z.change(v).expect("var in range");
            z = z.union(&with_v).expect("same manager");
        }
        z
    });
    println!("  node count: {}, card: {}", m.node_count(), family.card());
    clock("  build indexed rank table", || {
        family.indexed_count();
    });
}

/// Intersects two overlapping power sets, exercising `union`/`intersect`
/// under the op cache.
fn bench_zdd_union_intersect(n: usize) {
    let m = Manager::new();
    let vars: Vec<_> = (0..n).map(|_| m.new_var()).collect();

    let mut evens = Zdd::base(&m);
    for &v in vars.iter().step_by(2) {
        let with_v = evens.change(v).expect("var in range");
        evens = evens.union(&with_v).expect("same manager");
    }
    let mut all = Zdd::base(&m);
    for &v in &vars {
        let with_v = all.change(v).expect("var in range");
        all = all.union(&with_v).expect("same manager");
    }

    let overlap = clock("intersect even-subset family with full power set", || {
        all.intersect(&evens).expect("same manager")
    });
    println!("  overlap card: {}", overlap.card());
}

fn main() {
    bench_zdd_power_set(16);
    bench_zdd_union_intersect(12);
}
