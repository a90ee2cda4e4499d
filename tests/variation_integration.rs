use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use typed_gp::config::{EvolutionConfig, MutationProbs, SearchSpaceConfig};
use typed_gp::data::Dataset;
use typed_gp::engines::generation::{offspring, MutationKind};
use typed_gp::{ProgramType, SearchSpace, Value, Variation};

fn data() -> Dataset {
    let x1: Vec<f64> = (0..12).map(|i| i as f64).collect();
    let x2: Vec<i64> = (0..12).map(|i| i % 3).collect();
    let flag: Vec<bool> = (0..12).map(|i| i % 2 == 0).collect();
    let y = x1.iter().map(|x| x * 2.0).collect();
    Dataset::new(
        vec![
            ("x1".to_string(), Value::ArrayF(x1)),
            ("x2".to_string(), Value::ArrayI(x2)),
            ("flag".to_string(), Value::ArrayB(flag)),
        ],
        y,
        false,
    )
    .unwrap()
}

fn only(kind: MutationKind) -> MutationProbs {
    let mut probs = MutationProbs {
        point: 0.0,
        insert: 0.0,
        delete: 0.0,
        subtree: 0.0,
        toggle_weight_on: 0.0,
        toggle_weight_off: 0.0,
    };
    match kind {
        MutationKind::Point => probs.point = 1.0,
        MutationKind::Insert => probs.insert = 1.0,
        MutationKind::Delete => probs.delete = 1.0,
        MutationKind::Subtree => probs.subtree = 1.0,
        MutationKind::ToggleWeightOn => probs.toggle_weight_on = 1.0,
        MutationKind::ToggleWeightOff => probs.toggle_weight_off = 1.0,
    }
    probs
}

#[test]
fn test_every_mutation_respects_budgets() {
    let d = data();
    let ss = Arc::new(SearchSpace::new(&d, &SearchSpaceConfig::default()).unwrap());
    let mut rng = StdRng::seed_from_u64(7);

    for kind in MutationKind::ALL {
        let mut params = EvolutionConfig::default();
        params.max_depth = 5;
        params.max_size = 30;
        params.mutation_probs = only(kind);
        let variation = Variation::new(&ss, &params);

        for _ in 0..25 {
            let parent = ss.make_program(ProgramType::Regressor, 0, 0, &params, &mut rng).unwrap();
            if let Some(child) = variation.mutate(&parent, &mut rng).unwrap() {
                child.tree.validate().unwrap();
                assert!(child.size(true) <= params.max_size, "{:?}", kind);
                assert!(child.depth() <= params.max_depth, "{:?}", kind);
                assert!(!child.is_fitted());
                assert_eq!(
                    child.tree.node(child.tree.root()).ret_type,
                    parent.tree.node(parent.tree.root()).ret_type
                );
            }
        }
    }
}

#[test]
fn test_mutation_leaves_parent_untouched() {
    let d = data();
    let ss = Arc::new(SearchSpace::new(&d, &SearchSpaceConfig::default()).unwrap());
    let params = EvolutionConfig::default();
    let variation = Variation::new(&ss, &params);
    let mut rng = StdRng::seed_from_u64(8);

    let mut parent = ss.make_program(ProgramType::Regressor, 4, 20, &params, &mut rng).unwrap();
    parent.fit(&d).unwrap();
    let snapshot = parent.to_json().unwrap();
    for _ in 0..20 {
        let _ = variation.vary(&parent, Some(&parent), &mut rng).unwrap();
    }
    assert_eq!(parent.to_json().unwrap(), snapshot);
    assert!(parent.is_fitted());
}

#[test]
fn test_toggle_off_without_weights_fails() {
    let d = data();
    let ss = Arc::new(SearchSpace::new(&d, &SearchSpaceConfig::default()).unwrap());
    let mut params = EvolutionConfig::default();
    params.mutation_probs = only(MutationKind::ToggleWeightOff);
    let variation = Variation::new(&ss, &params);
    let mut rng = StdRng::seed_from_u64(9);

    let mut parent = ss.make_program(ProgramType::Regressor, 3, 10, &params, &mut rng).unwrap();
    for id in parent.tree.pre_order() {
        parent.tree.node_mut(id).set_is_weighted(false);
    }
    let toggleable = parent
        .tree
        .pre_order()
        .into_iter()
        .any(|id| parent.tree.node(id).is_weighted() && parent.tree.node(id).can_toggle_weight());
    assert!(!toggleable);
    assert!(variation.mutate(&parent, &mut rng).unwrap().is_none());
}

#[test]
fn test_offspring_in_parallel() {
    let d = data();
    let ss = Arc::new(SearchSpace::new(&d, &SearchSpaceConfig::default()).unwrap());
    let mut params = EvolutionConfig::default();
    params.population_size = 24;
    params.cx_prob = 0.5;
    let parents = typed_gp::engines::generation::initial_population(&ss, ProgramType::Regressor, &params, 3).unwrap();

    let first = offspring(&parents, &ss, &params, 11).unwrap();
    let again = offspring(&parents, &ss, &params, 11).unwrap();
    assert_eq!(first.len(), parents.len());
    assert!(first.iter().any(|c| c.is_some()));
    for (a, b) in first.iter().zip(&again) {
        assert_eq!(a.as_ref().map(|p| p.tree.clone()), b.as_ref().map(|p| p.tree.clone()));
    }
    for child in first.into_iter().flatten() {
        assert!(child.size(true) <= params.max_size);
        assert!(child.depth() <= params.max_depth);
    }
}
