//! End-to-end fixed-point scenarios: transitive closure, same-generation,
//! incremental maintenance, round caps

use zodd::{join_into, Context, Iteration, IterationError, IterationOptions, Relation};

/// Drive `reachable(x, z) <- edge(x, y), reachable(y, z)` to fixed point.
fn transitive_closure(ctx: &Context, edges: &[(u32, u32)]) -> Relation<(u32, u32)> {
    let mut iteration = Iteration::new(ctx);
    // Edges keyed by destination, so the join key (y) is the first field.
    let edges_by_dst = iteration.variable::<(u32, u32)>("edges_by_dst");
    let reachable = iteration.variable::<(u32, u32)>("reachable");

    edges_by_dst.insert(edges.iter().map(|&(src, dst)| (dst, src)));
    reachable.insert(edges.iter().copied());

    while iteration.changed().expect("unbounded iteration") {
        join_into(ctx, &edges_by_dst, &reachable, &reachable, |_y, &x, &z| {
            (x, z)
        });
    }
    reachable.complete()
}

#[test]
fn linear_chain_closure() {
    let ctx = Context::sequential();
    let closure = transitive_closure(&ctx, &[(1, 2), (2, 3), (3, 4)]);
    assert_eq!(
        closure.elements(),
        &[(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)]
    );
}

#[test]
fn cyclic_graph_closure_terminates() {
    let ctx = Context::sequential();
    let closure = transitive_closure(&ctx, &[(1, 2), (2, 3), (3, 1)]);

    // Every ordered pair over {1, 2, 3}.
    let mut expected = Vec::new();
    for x in 1..=3 {
        for y in 1..=3 {
            expected.push((x, y));
        }
    }
    assert_eq!(closure.elements(), &expected[..]);
}

#[test]
fn closure_is_identical_under_worker_pool() {
    let edges: Vec<(u32, u32)> = (0..600u32)
        .map(|i| ((i * 373) % 100, (i * 911) % 100))
        .collect();

    let sequential = transitive_closure(&Context::sequential(), &edges);
    let pooled = transitive_closure(&Context::with_workers(4).unwrap(), &edges);
    assert_eq!(sequential, pooled);
}

#[test]
fn same_generation_over_tree() {
    let ctx = Context::sequential();
    let parent: Vec<(u32, u32)> = vec![(1, 2), (1, 3), (2, 4), (2, 5)];

    let mut iteration = Iteration::new(&ctx);
    let parent_of = iteration.variable::<(u32, u32)>("parent_of");
    let same_gen = iteration.variable::<(u32, u32)>("same_gen");
    let half_step = iteration.variable::<(u32, u32)>("half_step");

    parent_of.insert(parent.clone());
    same_gen.insert((1..=5u32).map(|i| (i, i)));

    while iteration.changed().expect("unbounded iteration") {
        // half_step(q, x) <- same_gen(p, q), parent(p, x)
        join_into(&ctx, &same_gen, &parent_of, &half_step, |_p, &q, &x| (q, x));
        // same_gen(x, y) <- half_step(q, x), parent(q, y)
        join_into(&ctx, &half_step, &parent_of, &same_gen, |_q, &x, &y| (x, y));
    }

    let result = same_gen.complete();
    assert_eq!(
        result.elements(),
        &[
            (1, 1),
            (2, 2),
            (2, 3),
            (3, 2),
            (3, 3),
            (4, 4),
            (4, 5),
            (5, 4),
            (5, 5),
        ]
    );
    assert_eq!(result.len(), 9);
}

#[test]
fn incremental_maintenance_after_reset() {
    let ctx = Context::sequential();
    let mut iteration = Iteration::new(&ctx);
    let edges_by_dst = iteration.variable::<(u32, u32)>("edges_by_dst");
    let reachable = iteration.variable::<(u32, u32)>("reachable");

    let base: Vec<(u32, u32)> = vec![(1, 2), (2, 3)];
    edges_by_dst.insert(base.iter().map(|&(src, dst)| (dst, src)));
    reachable.insert(base.iter().copied());

    while iteration.changed().expect("unbounded iteration") {
        join_into(&ctx, &edges_by_dst, &reachable, &reachable, |_y, &x, &z| {
            (x, z)
        });
    }
    assert_eq!(reachable.total_len(), 3);
    let first_pass_rounds = iteration.round();

    // Feed one more edge and re-drive from the converged state.
    edges_by_dst.insert(vec![(4, 3)]);
    reachable.insert(vec![(3, 4)]);
    iteration.reset();

    while iteration.changed().expect("unbounded iteration") {
        join_into(&ctx, &edges_by_dst, &reachable, &reachable, |_y, &x, &z| {
            (x, z)
        });
    }

    let closure = reachable.complete();
    assert_eq!(
        closure.elements(),
        &[(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)]
    );
    // The second pass only chases derivations reachable from the new
    // edge; it converges in about as many rounds as the first, not the
    // compounded total.
    assert!(iteration.round() <= first_pass_rounds + 2);
}

#[test]
fn round_cap_aborts_a_deep_derivation() {
    let ctx = Context::sequential();
    let mut iteration =
        Iteration::with_options(&ctx, IterationOptions { max_rounds: Some(3) });
    let edges_by_dst = iteration.variable::<(u32, u32)>("edges_by_dst");
    let reachable = iteration.variable::<(u32, u32)>("reachable");

    // A chain of length 64 needs far more than three rounds.
    let edges: Vec<(u32, u32)> = (0..64u32).map(|i| (i, i + 1)).collect();
    edges_by_dst.insert(edges.iter().map(|&(src, dst)| (dst, src)));
    reachable.insert(edges.iter().copied());

    let outcome = loop {
        match iteration.changed() {
            Ok(true) => {
                join_into(&ctx, &edges_by_dst, &reachable, &reachable, |_y, &x, &z| {
                    (x, z)
                });
            }
            Ok(false) => break Ok(()),
            Err(err) => break Err(err),
        }
    };
    assert_eq!(outcome, Err(IterationError::MaxRoundsExceeded { limit: 3 }));
}
