use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use typed_gp::config::{EvolutionConfig, SearchSpaceConfig};
use typed_gp::data::Dataset;
use typed_gp::engines::generation::{initial_population, Node, Tree};
use typed_gp::functions::{NodeKind, Signature};
use typed_gp::{ModelFormat, Program, ProgramType, SearchSpace, TypedGpError, Value, ValueKind};

fn regression_data() -> Dataset {
    let x1: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
    let x2: Vec<f64> = (0..20).map(|i| ((i * 3) % 7) as f64 + 1.0).collect();
    let y = x1.iter().zip(&x2).map(|(a, b)| a * b + 1.0).collect();
    Dataset::new(
        vec![("x1".to_string(), Value::ArrayF(x1)), ("x2".to_string(), Value::ArrayF(x2))],
        y,
        false,
    )
    .unwrap()
}

fn classification_data(n_classes: usize) -> Dataset {
    let x1: Vec<f64> = (0..30).map(|i| i as f64).collect();
    let y = (0..30).map(|i| (i % n_classes) as f64).collect();
    Dataset::new(vec![("x1".to_string(), Value::ArrayF(x1))], y, true).unwrap()
}

/// Operators that stay finite on positive inputs, so outputs compare equal.
fn finite_space(d: &Dataset) -> Arc<SearchSpace> {
    let cfg = SearchSpaceConfig::with_functions([
        ("Add", 1.0),
        ("Sub", 1.0),
        ("Mul", 1.0),
        ("Sin", 1.0),
        ("SplitBest", 1.0),
    ]);
    Arc::new(SearchSpace::new(d, &cfg).unwrap())
}

#[test]
fn test_split_best_separates_classes() {
    let d = Dataset::new(
        vec![("x1".to_string(), Value::ArrayF(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))],
        vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        true,
    )
    .unwrap();
    let sig = Signature::nary(ValueKind::ArrayF, ValueKind::ArrayF, 2);
    let mut tree = Tree::new(Node::new(NodeKind::SplitBest, &sig, false));
    let root = tree.root();
    tree.append_child(root, Node::mean_label());
    tree.append_child(root, Node::mean_label());

    let mut program = Program::new(tree, ProgramType::Regressor);
    program.fit(&d).unwrap();
    assert_eq!(
        program.predict(&d).unwrap(),
        Value::ArrayF(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0])
    );
    let split = program.tree.node(program.tree.root());
    assert_eq!(split.feature(), "x1");
    assert_eq!(split.weight, 3.5);
}

#[test]
fn test_random_program_needs_fit() {
    let d = regression_data();
    let ss = finite_space(&d);
    let params = EvolutionConfig::default();
    let mut rng = StdRng::seed_from_u64(1);
    let program = ss.make_program(ProgramType::Regressor, 4, 20, &params, &mut rng).unwrap();
    assert!(matches!(program.predict(&d), Err(TypedGpError::NotFitted)));
    assert!(matches!(
        program.predict_with_weights(&d, &program.get_weights()),
        Err(TypedGpError::NotFitted)
    ));
}

#[test]
fn test_predict_with_own_weights_matches_predict() {
    let d = regression_data();
    let ss = finite_space(&d);
    let params = EvolutionConfig::default();
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..30 {
        let mut program = ss.make_program(ProgramType::Regressor, 0, 0, &params, &mut rng).unwrap();
        program.fit(&d).unwrap();
        let weights = program.get_weights();
        assert_eq!(weights.len(), program.n_weights());
        assert_eq!(
            program.predict_with_weights(&d, &weights).unwrap(),
            program.predict(&d).unwrap(),
            "{}",
            program.get_model(ModelFormat::Compact)
        );
        let mut longer = weights.clone();
        longer.push(1.0);
        assert!(matches!(
            program.predict_with_weights(&d, &longer),
            Err(TypedGpError::SizeMismatch { .. })
        ));
    }
}

#[test]
fn test_binary_classifier_shape() {
    let d = classification_data(2);
    let ss = finite_space(&d);
    let params = EvolutionConfig::default();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..10 {
        let mut program = ss.make_program(ProgramType::BinaryClassifier, 5, 30, &params, &mut rng).unwrap();
        let root = program.tree.root();
        assert_eq!(program.tree.node(root).kind, NodeKind::Logistic);
        assert!(program.tree.node(root).fixed);
        let offset = program.tree.children(root)[0];
        assert_eq!(program.tree.node(offset).kind, NodeKind::OffsetSum);
        assert!(program.tree.node(offset).is_weighted());

        program.fit(&d).unwrap();
        match program.predict_proba(&d).unwrap() {
            Value::ArrayF(p) => assert!(p.iter().all(|x| (0.0..=1.0).contains(x))),
            other => panic!("unexpected {:?}", other.kind()),
        }
        assert_eq!(program.predict(&d).unwrap().kind(), ValueKind::ArrayB);
    }
}

#[test]
fn test_multiclass_classifier_labels() {
    let d = classification_data(3);
    let ss = finite_space(&d);
    assert_eq!(ProgramType::for_dataset(&d), ProgramType::MulticlassClassifier);
    let params = EvolutionConfig::default();
    let mut rng = StdRng::seed_from_u64(4);
    let mut program = ss.make_program(ProgramType::MulticlassClassifier, 4, 30, &params, &mut rng).unwrap();
    let root = program.tree.root();
    assert_eq!(program.tree.node(root).kind, NodeKind::Softmax);
    assert_eq!(program.tree.children(root).len(), 3);

    program.fit(&d).unwrap();
    match program.predict(&d).unwrap() {
        Value::ArrayI(labels) => {
            assert_eq!(labels.len(), 30);
            assert!(labels.iter().all(|l| (0..3).contains(l)));
        }
        other => panic!("unexpected {:?}", other.kind()),
    }
}

#[test]
fn test_json_restores_fitted_program() {
    let d = regression_data();
    let ss = finite_space(&d);
    let params = EvolutionConfig::default();
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..10 {
        let mut program = ss.make_program(ProgramType::Regressor, 0, 0, &params, &mut rng).unwrap();
        program.fit(&d).unwrap();
        let restored = Program::from_json(&program.to_json().unwrap()).unwrap();
        assert_eq!(restored.tree, program.tree);
        assert_eq!(restored.get_weights(), program.get_weights());
        assert_eq!(
            restored.get_model(ModelFormat::Compact),
            program.get_model(ModelFormat::Compact)
        );
        assert!(restored.search_space().is_none());
    }
}

#[test]
fn test_from_json_rejects_bad_arity() {
    let d = regression_data();
    let ss = finite_space(&d);
    let params = EvolutionConfig::default();
    let mut rng = StdRng::seed_from_u64(6);
    let program = ss.make_program(ProgramType::Regressor, 3, 10, &params, &mut rng).unwrap();
    let mut json: serde_json::Value = serde_json::from_str(&program.to_json().unwrap()).unwrap();
    // drop the first leaf so the root is short of children
    json["tree"].as_array_mut().unwrap().remove(0);
    let broken = serde_json::to_string(&json).unwrap();
    if program.tree.size() > 1 {
        assert!(Program::from_json(&broken).is_err());
    }
}

#[test]
fn test_from_json_rejects_split_with_shortened_signature() {
    let sig = Signature::nary(ValueKind::ArrayF, ValueKind::ArrayF, 2);
    let mut tree = Tree::new(Node::new(NodeKind::SplitBest, &sig, false));
    let root = tree.root();
    tree.append_child(root, Node::terminal("x1", ValueKind::ArrayF, false));
    tree.append_child(root, Node::terminal("x1", ValueKind::ArrayF, false));
    let program = Program::new(tree, ProgramType::Regressor);

    let mut json: serde_json::Value = serde_json::from_str(&program.to_json().unwrap()).unwrap();
    let records = json["tree"].as_array_mut().unwrap();
    records.remove(0);
    // the split keeps its hash but now claims a single argument
    records.last_mut().unwrap()["arg_types"].as_array_mut().unwrap().pop();
    let broken = serde_json::to_string(&json).unwrap();
    assert!(Program::from_json(&broken).is_err());
}

#[test]
fn test_parallel_init_is_reproducible() {
    let d = regression_data();
    let ss = finite_space(&d);
    let mut params = EvolutionConfig::default();
    params.population_size = 40;
    let models = |seed| {
        initial_population(&ss, ProgramType::Regressor, &params, seed)
            .unwrap()
            .iter()
            .map(|p| p.get_model(ModelFormat::Tree))
            .collect::<Vec<_>>()
    };
    let first = models(42);
    assert_eq!(first.len(), 40);
    assert_eq!(first, models(42));
    assert_ne!(first, models(1000));
}
