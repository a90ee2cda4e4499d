//! Property-based tests for program generation and variation.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use typed_gp::config::{EvolutionConfig, SearchSpaceConfig};
use typed_gp::data::Dataset;
use typed_gp::engines::generation::crossover;
use typed_gp::functions::MAX_ARITY;
use typed_gp::{Program, ProgramType, SearchSpace, Value, ValueKind, Variation};

fn data() -> Dataset {
    let x1: Vec<f64> = (0..10).map(|i| i as f64 + 1.0).collect();
    let x2: Vec<f64> = (0..10).map(|i| ((i * 5) % 4) as f64 + 0.5).collect();
    let n: Vec<i64> = (0..10).map(|i| i % 4).collect();
    let b: Vec<bool> = (0..10).map(|i| i > 4).collect();
    let y = x1.iter().zip(&x2).map(|(a, c)| a - c).collect();
    Dataset::new(
        vec![
            ("x1".to_string(), Value::ArrayF(x1)),
            ("x2".to_string(), Value::ArrayF(x2)),
            ("n".to_string(), Value::ArrayI(n)),
            ("b".to_string(), Value::ArrayB(b)),
        ],
        y,
        false,
    )
    .unwrap()
}

fn full_space() -> Arc<SearchSpace> {
    Arc::new(SearchSpace::new(&data(), &SearchSpaceConfig::default()).unwrap())
}

fn finite_space() -> Arc<SearchSpace> {
    let cfg = SearchSpaceConfig::with_functions([("Add", 1.0), ("Sub", 1.0), ("Mul", 1.0), ("SplitBest", 1.0)]);
    Arc::new(SearchSpace::new(&data(), &cfg).unwrap())
}

fn params(max_depth: usize, max_size: usize) -> EvolutionConfig {
    EvolutionConfig {
        max_depth,
        max_size,
        ..EvolutionConfig::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every child type matches its parent's declared argument type.
    #[test]
    fn prop_generated_trees_are_well_typed(seed in any::<u64>(), depth in 1usize..8, size in 1usize..40) {
        let ss = full_space();
        let mut rng = StdRng::seed_from_u64(seed);
        let tree = ss.sample_subtree(ValueKind::ArrayF, depth, size, &mut rng).unwrap().unwrap();
        prop_assert!(tree.validate().is_ok());
        prop_assert!(tree.depth() <= depth);
        prop_assert!(tree.size() <= size + MAX_ARITY);
    }

    /// Raw PTC2 may go one level past the depth limit, never more.
    #[test]
    fn prop_build_respects_limits(seed in any::<u64>(), depth in 1usize..6, size in 1usize..30) {
        let ss = full_space();
        let mut rng = StdRng::seed_from_u64(seed);
        let tree = ss.build(ValueKind::ArrayF, None, depth, size, &mut rng).unwrap();
        prop_assert!(tree.validate().is_ok());
        prop_assert!(tree.depth() <= depth + 1);
        prop_assert!(tree.size() <= size.max(1) + MAX_ARITY);
    }

    #[test]
    fn prop_variation_stays_in_budget(seed in any::<u64>(), depth in 2usize..7, size in 5usize..40) {
        let ss = full_space();
        let params = params(depth, size);
        let variation = Variation::new(&ss, &params);
        let mut rng = StdRng::seed_from_u64(seed);
        let mom = ss.make_program(ProgramType::Regressor, 0, 0, &params, &mut rng).unwrap();
        let dad = ss.make_program(ProgramType::Regressor, 0, 0, &params, &mut rng).unwrap();
        if let Some(child) = variation.vary(&mom, Some(&dad), &mut rng).unwrap() {
            prop_assert!(child.tree.validate().is_ok());
            prop_assert!(child.size(true) <= size);
            prop_assert!(child.depth() <= depth);
        }
    }

    /// Crossover only swaps subtrees of the same return type.
    #[test]
    fn prop_crossover_preserves_types(seed in any::<u64>()) {
        let ss = full_space();
        let params = EvolutionConfig::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let mom = ss.make_program(ProgramType::Regressor, 0, 0, &params, &mut rng).unwrap();
        let dad = ss.make_program(ProgramType::Regressor, 0, 0, &params, &mut rng).unwrap();
        if let Some(child) = crossover(&mom, &dad, &params, &mut rng) {
            prop_assert!(child.tree.validate().is_ok());
            prop_assert_eq!(child.tree.node(child.tree.root()).ret_type, ValueKind::ArrayF);
            prop_assert!(child.size(true) <= params.max_size);
        }
    }

    #[test]
    fn prop_json_round_trip(seed in any::<u64>()) {
        let d = data();
        let ss = finite_space();
        let params = EvolutionConfig::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut program = ss.make_program(ProgramType::Regressor, 0, 0, &params, &mut rng).unwrap();
        program.fit(&d).unwrap();
        let restored = Program::from_json(&program.to_json().unwrap()).unwrap();
        prop_assert!(restored.tree == program.tree);
        prop_assert_eq!(restored.get_weights(), program.get_weights());
        prop_assert_eq!(restored.predict(&d).unwrap(), program.predict(&d).unwrap());
    }

    #[test]
    fn prop_own_weights_reproduce_predictions(seed in any::<u64>()) {
        let d = data();
        let ss = finite_space();
        let params = EvolutionConfig::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut program = ss.make_program(ProgramType::Regressor, 0, 0, &params, &mut rng).unwrap();
        program.fit(&d).unwrap();
        let weights = program.get_weights();
        prop_assert_eq!(
            program.predict_with_weights(&d, &weights).unwrap(),
            program.predict(&d).unwrap()
        );
    }
}
