use dd::bdd::Bdd;
use dd::manager::Manager;

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

/// Builds the conjunction of `n` fresh variables, one `and` at a time, the
/// way a naive clause-by-clause encoder would.
fn bench_bdd_conjunction(n: usize) {
    let m = Manager::new();
    let vars: Vec<_> = (0..n).map(|_| m.new_var()).collect();
    let xs: Vec<_> = vars.iter().map(|&v| Bdd::var(&m, v)).collect();

    let b = clock(&format!("conjunction of {} vars (ascending)", n), || {
        let mut b = Bdd::one(&m);
        for x in &xs {
            b = b.and(x).expect("same manager");
        }
        b
    });
    println!("  node count after conjunction: {}", m.node_count());
    assert!(b.is_zero() || !b.is_zero());
}

/// Same conjunction, but folded from the last variable backward — exercises
/// the unique table and GC under a different insertion order.
fn bench_bdd_conjunction_reversed(n: usize) {
    let m = Manager::new();
    let vars: Vec<_> = (0..n).map(|_| m.new_var()).collect();
    let xs: Vec<_> = vars.iter().map(|&v| Bdd::var(&m, v)).collect();

    clock(&format!("conjunction of {} vars (descending)", n), || {
        let mut b = Bdd::one(&m);
        for x in xs.iter().rev() {
            b = b.and(x).expect("same manager");
        }
        b
    });
    println!("  node count after conjunction: {}", m.node_count());
}

/// `(x0 & x1) | x2`, then reads back its model count — a sanity check that
/// doubles as a tiny latency measurement for the apply/count path.
fn bench_bdd_small_formula_and_count() {
    let m = Manager::new();
    let v0 = m.new_var();
    let v1 = m.new_var();
    let v2 = m.new_var();
    let x0 = Bdd::var(&m, v0);
    let x1 = Bdd::var(&m, v1);
    let x2 = Bdd::var(&m, v2);

    let f = clock("small formula build", || {
        let b = x0.and(&x1).expect("same manager");
        b.or(&x2).expect("same manager")
    });
    println!("  node count: {}, exact count: {}", m.node_count(), f.exact_count());
}

fn main() {
    bench_bdd_small_formula_and_count();
    bench_bdd_conjunction(1000);
    bench_bdd_conjunction_reversed(1000);
}
