//! Property-based tests for the points-to solvers
//!
//! Invariants that must hold for every constraint problem:
//! - Union-find: roots are stable, partitions match a naive model
//! - Andersen: the result satisfies every inclusion constraint
//! - Andersen: worklist order, cycle collapsing and difference propagation do
//!   not change the result
//! - Steensgaard: sound, and never more precise than Andersen

mod common;

use common::*;
use memstate_ir::config::WorklistPolicy;
use memstate_ir::features::points_to::infrastructure::AndersenConfig;
use memstate_ir::features::points_to::{
    AndersenSolver, EntityIndex, EntityKind, NodeSet, PointsToSolver, SteensgaardSolver,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn solve_andersen(problem: &Problem, config: AndersenConfig) -> Instance {
    let mut instance = problem.instantiate();
    AndersenSolver::new(config).solve(&mut instance.set, &instance.constraints);
    instance
}

fn solve_steensgaard(problem: &Problem) -> Instance {
    let mut instance = problem.instantiate();
    SteensgaardSolver::new().solve(&mut instance.set, &instance.constraints);
    instance
}

/// Points-to sets by entity position, comparable across node sets
fn all_points_to(instance: &Instance) -> Vec<BTreeSet<usize>> {
    instance
        .registers
        .iter()
        .chain(&instance.objects)
        .map(|e| pts(&instance.set, *e).into_iter().map(EntityIndex::as_usize).collect())
        .collect()
}

proptest! {
    #[test]
    fn prop_union_find_matches_naive_partition(
        n in 1usize..24,
        merges in prop::collection::vec((0usize..24, 0usize..24), 0..32),
    ) {
        let mut set = NodeSet::new();
        let entities: Vec<EntityIndex> = (0..n)
            .map(|i| set.create_entity(EntityKind::Register, format!("r{}", i)).unwrap())
            .collect();
        let mut labels: Vec<usize> = (0..n).collect();

        for (a, b) in merges {
            let (a, b) = (a % n, b % n);
            let ra = set.get_unification_root(entities[a]);
            let rb = set.get_unification_root(entities[b]);
            if ra != rb {
                let survivor = set.unify(ra, rb);
                prop_assert!(survivor == ra || survivor == rb);
            }
            let (from, to) = (labels[b], labels[a]);
            for label in labels.iter_mut() {
                if *label == from {
                    *label = to;
                }
            }
        }

        for i in 0..n {
            let root = set.get_unification_root(entities[i]);
            prop_assert_eq!(set.get_unification_root(root), root);
            prop_assert!(set.is_unification_root(root));
            prop_assert_eq!(set.root_of(entities[i]), root);
            for j in 0..n {
                let same = set.root_of(entities[j]) == root;
                prop_assert_eq!(same, labels[i] == labels[j]);
            }
        }

        let distinct: BTreeSet<usize> = labels.iter().copied().collect();
        // Sentinels are never merged here
        prop_assert_eq!(set.num_roots(), distinct.len() + 2);
        prop_assert_eq!(set.partitions().len(), set.num_roots());
    }

    #[test]
    fn prop_andersen_reaches_inclusion_fixpoint(problem in problem_strategy()) {
        for enable_cycle_detection in [false, true] {
            for difference_propagation in [false, true] {
                let config = AndersenConfig {
                    enable_cycle_detection,
                    worklist: WorklistPolicy::Fifo,
                    difference_propagation,
                };
                let instance = solve_andersen(&problem, config);
                assert_inclusion_fixpoint(&instance.set, &instance.constraints);
            }
        }
    }

    #[test]
    fn prop_andersen_result_independent_of_strategy(problem in problem_strategy()) {
        let baseline = all_points_to(&solve_andersen(
            &problem,
            AndersenConfig {
                enable_cycle_detection: false,
                worklist: WorklistPolicy::Fifo,
                difference_propagation: false,
            },
        ));

        for enable_cycle_detection in [false, true] {
            for worklist in [WorklistPolicy::Fifo, WorklistPolicy::Lifo] {
                for difference_propagation in [false, true] {
                    let config = AndersenConfig { enable_cycle_detection, worklist, difference_propagation };
                    let result = all_points_to(&solve_andersen(&problem, config));
                    prop_assert_eq!(&result, &baseline, "{:?}", config);
                }
            }
        }
    }

    #[test]
    fn prop_steensgaard_is_sound(problem in problem_strategy()) {
        let instance = solve_steensgaard(&problem);
        assert_inclusion_fixpoint(&instance.set, &instance.constraints);
    }

    #[test]
    fn prop_steensgaard_over_approximates_andersen(problem in problem_strategy()) {
        let precise = all_points_to(&solve_andersen(&problem, AndersenConfig::default()));
        let coarse = all_points_to(&solve_steensgaard(&problem));

        for (p, c) in precise.iter().zip(&coarse) {
            prop_assert!(p.is_subset(c), "andersen {:?} not within steensgaard {:?}", p, c);
        }
    }

    #[test]
    fn prop_steensgaard_unified_entities_share_points_to(problem in problem_strategy()) {
        let instance = solve_steensgaard(&problem);
        let set = &instance.set;
        for members in set.partitions().values() {
            let first = pts(set, members[0]);
            for member in &members[1..] {
                prop_assert_eq!(&pts(set, *member), &first);
            }
        }
    }
}
