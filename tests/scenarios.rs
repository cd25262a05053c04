//! End-to-end tests: script in, solution counts and graphs out.

use num_bigint::BigUint;

use robdd::bdd::{Bdd, BddConfig};
use robdd::dot::to_dot;
use robdd::program::decode;
use robdd::reference::Ref;
use robdd::script::parse_script;

/// Run a script on the given number of worker threads.
fn run(source: &str, threads: usize) -> (Bdd, Vec<(String, Ref)>) {
    let program = parse_script(source).expect("script should parse");
    let config = BddConfig::default().with_threads(threads);
    let bdd = Bdd::with_config(program.num_inputs(), config);
    let roots = decode(&bdd, &program);
    (bdd, roots)
}

fn count(bdd: &Bdd, roots: &[(String, Ref)], name: &str) -> BigUint {
    let (_, root) = roots.iter().find(|(n, _)| n == name).unwrap();
    bdd.solution_count(*root)
}

// ─── Counting scenarios ────────────────────────────────────────────────────────

#[test]
fn tautology() {
    let (bdd, roots) = run("output.t = input.a + !input.a", 1);
    let (_, root) = &roots[0];
    assert_eq!(*root, bdd.one());
    assert_eq!(bdd.weight(*root), 1);
    assert_eq!(bdd.solution_count(*root), 2u32.into());
}

#[test]
fn contradiction() {
    let (bdd, roots) = run(
        "output.f = (input.a * input.b) * (input.a * !input.b)",
        1,
    );
    let (_, root) = &roots[0];
    assert_eq!(*root, bdd.zero());
    assert_eq!(bdd.weight(*root), 0);
}

#[test]
fn half_adder_sum_bit() {
    let (bdd, roots) = run("output.sum = input.a ^ input.b", 1);
    let (_, root) = &roots[0];

    // Root at a; low = b, high = NOT b.
    assert_eq!(bdd.variable(*root), 0);
    let low = bdd.low(*root);
    let high = bdd.high(*root);
    assert_eq!(bdd.variable(low), 1);
    assert_eq!(bdd.low(low), bdd.zero());
    assert_eq!(bdd.high(low), bdd.one());
    assert_eq!(bdd.low(high), bdd.one());
    assert_eq!(bdd.high(high), bdd.zero());

    assert_eq!(bdd.solution_count(*root), 2u32.into());
}

#[test]
fn majority_of_three() {
    let source = "
        ab = input.a * input.b
        ac = input.a * input.c
        bc = input.b * input.c
        output.maj = ab + ac + bc
    ";
    let (bdd, roots) = run(source, 1);
    assert_eq!(count(&bdd, &roots, "maj"), 4u32.into());

    // The four models are exactly the assignments with at least two ones.
    let (_, root) = &roots[0];
    for bits in 0..8u32 {
        let assignment: Vec<bool> = (0..3).map(|i| bits >> i & 1 == 1).collect();
        let expected = assignment.iter().filter(|&&b| b).count() >= 2;
        assert_eq!(bdd.evaluate(*root, &assignment), expected, "bits {:03b}", bits);
    }
}

#[test]
fn three_bit_equality() {
    let source = "
        title = \"3-bit equality\"
        d0 = input.a0 ^ input.b0
        d1 = input.a1 ^ input.b1
        d2 = input.a2 ^ input.b2
        output.eq = !(d0 + d1 + d2)
    ";
    let (bdd, roots) = run(source, 1);
    assert_eq!(count(&bdd, &roots, "eq"), 8u32.into());
}

#[test]
fn determinism_across_thread_counts() {
    let source = "
        ab = input.a * input.b
        ac = input.a * input.c
        bc = input.b * input.c
        output.maj = ab + ac + bc
    ";
    let render = |threads: usize| {
        let program = parse_script(source).unwrap();
        let bdd = Bdd::with_config(
            program.num_inputs(),
            BddConfig::default().with_threads(threads),
        );
        let roots = decode(&bdd, &program);
        to_dot(&bdd, &roots, &program.inputs, program.title.as_deref()).unwrap()
    };
    assert_eq!(render(1), render(8));
}

// ─── Algebraic laws through the whole pipeline ─────────────────────────────────

#[test]
fn operand_order_is_irrelevant() {
    let (bdd_ab, roots_ab) = run("output.f = input.a * input.b", 1);
    let (_, f_ab) = &roots_ab[0];
    let (bdd_ba, roots_ba) = run("output.f = input.b * input.a", 1);
    let (_, f_ba) = &roots_ba[0];
    // Different managers, but structurally identical graphs: the variable
    // order follows declaration order in both.
    assert_eq!(bdd_ab.size(*f_ab), bdd_ba.size(*f_ba));
    assert_eq!(bdd_ab.solution_count(*f_ab), bdd_ba.solution_count(*f_ba));
}

#[test]
fn de_morgan_compiles_to_the_same_handle() {
    let source = "
        lhs = !(input.a * input.b)
        rhs = !input.a + !input.b
        output.lhs = lhs
        output.rhs = rhs
        output.same = lhs ^ rhs
    ";
    let (bdd, roots) = run(source, 1);
    assert_eq!(roots[0].1, roots[1].1);
    assert_eq!(roots[2].1, bdd.zero());
}

#[test]
fn xor_cancels_itself() {
    let (bdd, roots) = run("x = input.a ^ input.b\noutput.f = x ^ x", 1);
    assert_eq!(roots[0].1, bdd.zero());
}

// ─── Boundaries ────────────────────────────────────────────────────────────────

#[test]
fn empty_script() {
    let (bdd, roots) = run("# just a comment", 1);
    assert!(roots.is_empty());
    assert_eq!(bdd.num_vars(), 0);
    assert_eq!(bdd.num_nodes(), 2);
}

#[test]
fn single_variable() {
    let (bdd, roots) = run(
        "output.and = input.x * !input.x\noutput.or = input.x + !input.x",
        1,
    );
    assert_eq!(roots[0].1, bdd.zero());
    assert_eq!(roots[1].1, bdd.one());
}

#[test]
fn shared_subformulas_share_nodes() {
    // f and g overlap; the manager must not duplicate the shared part.
    let source = "
        shared = input.a * input.b
        output.f = shared + input.c
        output.g = shared ^ input.c
    ";
    let (bdd, roots) = run(source, 1);
    let handles: Vec<Ref> = roots.iter().map(|(_, r)| *r).collect();
    let union = bdd.descendants(handles.clone()).len();
    let separate: usize = handles.iter().map(|&r| bdd.size(r)).sum();
    assert!(union < separate, "no sharing between roots");
}

#[test]
fn parallel_run_matches_sequential_counts() {
    // A wider formula so the parallel recursion actually forks.
    let source = "
        s0 = input.a0 ^ input.b0
        s1 = input.a1 ^ input.b1
        s2 = input.a2 ^ input.b2
        s3 = input.a3 ^ input.b3
        odd = s0 ^ s1 ^ s2 ^ s3
        some = s0 + s1 + s2 + s3
        output.odd = odd
        output.some = some
        output.both = odd * some
    ";
    let sequential = run(source, 1);
    let parallel = run(source, 8);
    for ((name, seq_root), (_, par_root)) in sequential.1.iter().zip(&parallel.1) {
        assert_eq!(
            sequential.0.solution_count(*seq_root),
            parallel.0.solution_count(*par_root),
            "count mismatch for root {}",
            name
        );
    }
}
