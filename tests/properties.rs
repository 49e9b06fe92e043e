//! Randomized algebraic-identity checks, run via `quickcheck`.

use quickcheck_macros::quickcheck;

use dd::bdd::Bdd;
use dd::common::Var;
use dd::manager::Manager;
use dd::zdd::Zdd;

/// The minterm (single satisfying assignment) picked out by `mask`'s bits:
/// bit `i` set means `vars[i]` is asserted positive, clear means negated.
fn mask_to_minterm(m: &std::sync::Arc<Manager>, vars: &[Var], mask: u8) -> Bdd {
    let mut f = Bdd::one(m);
    for (i, &v) in vars.iter().enumerate() {
        let x = Bdd::var(m, v);
        let lit = if mask & (1 << i) != 0 { x } else { x.not() };
        f = f.and(&lit).unwrap();
    }
    f
}

#[quickcheck]
fn de_morgan_holds_for_random_minterms(a: u8, b: u8) -> bool {
    let mask_a = a % 8;
    let mask_b = b % 8;
    let m = Manager::new();
    let vars: Vec<Var> = (0..3).map(|_| m.new_var()).collect();
    let f = mask_to_minterm(&m, &vars, mask_a);
    let g = mask_to_minterm(&m, &vars, mask_b);

    let lhs = f.and(&g).unwrap().not();
    let rhs = f.not().or(&g.not()).unwrap();
    lhs == rhs
}

#[quickcheck]
fn double_negation_is_identity_for_random_minterms(a: u8) -> bool {
    let mask = a % 8;
    let m = Manager::new();
    let vars: Vec<Var> = (0..3).map(|_| m.new_var()).collect();
    let f = mask_to_minterm(&m, &vars, mask);
    f.not().not() == f
}

/// The family containing exactly the single set described by `mask`'s bits
/// over `vars`.
fn mask_to_singleton_family(m: &std::sync::Arc<Manager>, vars: &[Var], mask: u8) -> Zdd {
    let mut z = Zdd::base(m);
    for (i, &v) in vars.iter().enumerate() {
        if mask & (1 << i) != 0 {
            z = z.change(v).unwrap();
        }
    }
    z
}

#[quickcheck]
fn zdd_union_and_intersection_cardinalities_add_up(a: u8, b: u8) -> bool {
    let mask_a = a % 16;
    let mask_b = b % 16;
    let m = Manager::new();
    let vars: Vec<Var> = (0..4).map(|_| m.new_var()).collect();
    let za = mask_to_singleton_family(&m, &vars, mask_a);
    let zb = mask_to_singleton_family(&m, &vars, mask_b);

    let union = za.union(&zb).unwrap();
    let inter = za.intersect(&zb).unwrap();
    union.card() + inter.card() == za.card() + zb.card()
}

#[quickcheck]
fn zdd_union_absorbs_intersection(a: u8, b: u8) -> bool {
    let mask_a = a % 16;
    let mask_b = b % 16;
    let m = Manager::new();
    let vars: Vec<Var> = (0..4).map(|_| m.new_var()).collect();
    let za = mask_to_singleton_family(&m, &vars, mask_a);
    let zb = mask_to_singleton_family(&m, &vars, mask_b);

    let union = za.union(&zb).unwrap();
    let inter = za.intersect(&zb).unwrap();
    (union.intersect(&za).unwrap() == za) && (inter.union(&za).unwrap() == za)
}
