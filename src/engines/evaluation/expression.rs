use super::split::{best_split, best_threshold, threshold_mask};
use crate::{
    data::Dataset,
    engines::generation::ast::{NodeId, Tree},
    error::{Result, TypedGpError},
    functions::{
        nodetype::NodeKind,
        primitives,
        registry::{DispatchTable, WeightOverrides},
    },
    types::{Value, ValueKind},
    utils::stats,
};

/// Fits the subtree at `id` and returns its output on `d`.
pub fn fit(tree: &mut Tree, id: NodeId, d: &Dataset) -> Result<Value> {
    let node = tree.node(id);
    let routine = DispatchTable::global().fit_routine(node.kind, node.sig_hash)?;
    routine(tree, id, d)
}

/// Evaluates the subtree at `id`. With `overrides`, weighted nodes read their
/// weight from the map and dispatch goes through the dual signature.
pub fn predict(tree: &Tree, id: NodeId, d: &Dataset, overrides: Option<&WeightOverrides>) -> Result<Value> {
    let node = tree.node(id);
    let hash = if overrides.is_some() {
        node.sig_dual_hash
    } else {
        node.sig_hash
    };
    let routine = DispatchTable::global().predict_routine(node.kind, hash)?;
    routine(tree, id, d, overrides)
}

fn weight_of(tree: &Tree, id: NodeId, overrides: Option<&WeightOverrides>) -> f64 {
    overrides
        .and_then(|o| o.get(&id).copied())
        .unwrap_or_else(|| tree.node(id).weight)
}

fn finish(tree: &Tree, id: NodeId, value: Value, overrides: Option<&WeightOverrides>) -> Value {
    let node = tree.node(id);
    if !node.is_weighted() {
        return value;
    }
    let w = weight_of(tree, id, overrides);
    match node.kind {
        NodeKind::OffsetSum => primitives::offset(value, w),
        _ => primitives::scale(value, w),
    }
}

pub fn fit_terminal(tree: &mut Tree, id: NodeId, d: &Dataset) -> Result<Value> {
    predict_terminal(tree, id, d, None)
}

pub fn predict_terminal(tree: &Tree, id: NodeId, d: &Dataset, overrides: Option<&WeightOverrides>) -> Result<Value> {
    let node = tree.node(id);
    let value = d.get(node.feature())?;
    if value.kind() != node.ret_type {
        return Err(TypedGpError::TypeMismatch {
            expected: format!("{} for feature '{}'", node.ret_type, node.feature()),
            actual: value.kind().to_string(),
        });
    }
    Ok(finish(tree, id, value.clone(), overrides))
}

pub fn fit_constant(tree: &mut Tree, id: NodeId, d: &Dataset) -> Result<Value> {
    predict_constant(tree, id, d, None)
}

pub fn predict_constant(tree: &Tree, id: NodeId, d: &Dataset, overrides: Option<&WeightOverrides>) -> Result<Value> {
    let node = tree.node(id);
    let n = d.n_samples();
    let w = weight_of(tree, id, overrides);
    match node.ret_type {
        ValueKind::ArrayF => Ok(Value::ArrayF(vec![w; n])),
        ValueKind::ArrayI => Ok(Value::ArrayI(vec![w.round() as i64; n])),
        ValueKind::ArrayB => Ok(Value::ArrayB(vec![true; n])),
        other => Err(TypedGpError::TypeMismatch {
            expected: "array constant".to_string(),
            actual: other.to_string(),
        }),
    }
}

/// Sets the weight to the target mean, or its mode for classification.
pub fn fit_mean_label(tree: &mut Tree, id: NodeId, d: &Dataset) -> Result<Value> {
    let label = if d.classification {
        stats::mode(&d.y)
    } else {
        stats::mean(&d.y)
    };
    tree.node_mut(id).weight = if label.is_finite() { label } else { 0.0 };
    predict_constant(tree, id, d, None)
}

pub fn fit_operator(tree: &mut Tree, id: NodeId, d: &Dataset) -> Result<Value> {
    let children = tree.children(id).to_vec();
    let mut args = Vec::with_capacity(children.len());
    for child in children {
        args.push(fit(tree, child, d)?);
    }
    let node = tree.node(id);
    let value = primitives::apply(node.kind, &args, node.ret_type)?;
    Ok(finish(tree, id, value, None))
}

pub fn predict_operator(tree: &Tree, id: NodeId, d: &Dataset, overrides: Option<&WeightOverrides>) -> Result<Value> {
    let args = tree
        .children(id)
        .iter()
        .map(|&child| predict(tree, child, d, overrides))
        .collect::<Result<Vec<_>>>()?;
    let node = tree.node(id);
    let value = primitives::apply(node.kind, &args, node.ret_type)?;
    Ok(finish(tree, id, value, overrides))
}

/// Index of the first branch child; SplitOn spends child 0 on its split feature.
fn first_branch(kind: NodeKind) -> usize {
    match kind {
        NodeKind::SplitOn => 1,
        _ => 0,
    }
}

fn all_rows(d: &Dataset) -> Vec<bool> {
    vec![true; d.n_samples()]
}

fn child(tree: &Tree, id: NodeId, index: usize) -> Result<NodeId> {
    tree.children(id).get(index).copied().ok_or_else(|| {
        TypedGpError::InvalidTree(format!("{} is missing child {}", tree.node(id).kind, index))
    })
}

pub fn fit_split(tree: &mut Tree, id: NodeId, d: &Dataset) -> Result<Value> {
    let kind = tree.node(id).kind;
    let mask = match kind {
        NodeKind::SplitOn => {
            let on = child(tree, id, 0)?;
            let x = fit(tree, on, d)?;
            let threshold = best_threshold(&x, &d.y, d.classification)
                .map(|(t, _)| t)
                .unwrap_or(0.0);
            tree.node_mut(id).weight = threshold;
            threshold_mask(&x, threshold)?
        }
        _ => match best_split(d) {
            Some((feature, threshold)) => {
                let node = tree.node_mut(id);
                node.set_feature(&feature);
                node.weight = threshold;
                threshold_mask(d.get(&feature)?, threshold)?
            }
            None => {
                let node = tree.node_mut(id);
                node.set_feature("");
                node.weight = 0.0;
                all_rows(d)
            }
        },
    };

    let (left_data, right_data) = d.split(&mask);
    let branch = first_branch(kind);
    let left_id = child(tree, id, branch)?;
    let right_id = child(tree, id, branch + 1)?;

    let left = if left_data.n_samples() > 0 {
        fit(tree, left_id, &left_data)?
    } else {
        Value::empty(tree.node(left_id).ret_type)
    };
    let right = if right_data.n_samples() > 0 {
        fit(tree, right_id, &right_data)?
    } else {
        Value::empty(tree.node(right_id).ret_type)
    };
    Value::stitch(left, right, &mask)
}

pub fn predict_split(tree: &Tree, id: NodeId, d: &Dataset, overrides: Option<&WeightOverrides>) -> Result<Value> {
    let node = tree.node(id);
    let mask = match node.kind {
        NodeKind::SplitOn => {
            let x = predict(tree, child(tree, id, 0)?, d, overrides)?;
            threshold_mask(&x, node.weight)?
        }
        _ if node.feature().is_empty() => all_rows(d),
        _ => threshold_mask(d.get(node.feature())?, node.weight)?,
    };

    let (left_data, right_data) = d.split(&mask);
    let branch = first_branch(node.kind);
    let (left_id, right_id) = (child(tree, id, branch)?, child(tree, id, branch + 1)?);

    let left = if left_data.n_samples() > 0 {
        predict(tree, left_id, &left_data, overrides)?
    } else {
        Value::empty(tree.node(left_id).ret_type)
    };
    let right = if right_data.n_samples() > 0 {
        predict(tree, right_id, &right_data, overrides)?
    } else {
        Value::empty(tree.node(right_id).ret_type)
    };
    Value::stitch(left, right, &mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::node::Node;
    use crate::functions::signatures::Signature;

    fn data() -> Dataset {
        Dataset::new(
            vec![
                ("x1".to_string(), Value::ArrayF(vec![1.0, 2.0, 3.0, 4.0])),
                ("x2".to_string(), Value::ArrayF(vec![10.0, 20.0, 30.0, 40.0])),
            ],
            vec![0.0, 0.0, 1.0, 1.0],
            true,
        )
        .unwrap()
    }

    fn binary(kind: NodeKind) -> Node {
        Node::new(kind, &Signature::nary(ValueKind::ArrayF, ValueKind::ArrayF, 2), false)
    }

    #[test]
    fn test_weighted_arithmetic() {
        let mut tree = Tree::new(binary(NodeKind::Add));
        let root = tree.root();
        let mut x1 = Node::terminal("x1", ValueKind::ArrayF, true);
        x1.weight = 2.0;
        tree.append_child(root, x1);
        tree.append_child(root, Node::terminal("x2", ValueKind::ArrayF, false));
        let out = fit(&mut tree, root, &data()).unwrap();
        assert_eq!(out, Value::ArrayF(vec![12.0, 24.0, 36.0, 48.0]));
    }

    #[test]
    fn test_overrides_replace_weights() {
        let mut tree = Tree::new(Node::terminal("x1", ValueKind::ArrayF, true));
        let root = tree.root();
        let mut overrides = WeightOverrides::new();
        overrides.insert(root, -1.0);
        let out = predict(&tree, root, &data(), Some(&overrides)).unwrap();
        assert_eq!(out, Value::ArrayF(vec![-1.0, -2.0, -3.0, -4.0]));
        tree.node_mut(root).weight = 3.0;
        let out = predict(&tree, root, &data(), None).unwrap();
        assert_eq!(out, Value::ArrayF(vec![3.0, 6.0, 9.0, 12.0]));
    }

    #[test]
    fn test_mean_label_fits_mode_for_classification() {
        let mut tree = Tree::new(Node::mean_label());
        let root = tree.root();
        let d = Dataset::new(
            vec![("x1".to_string(), Value::ArrayF(vec![0.0, 0.0, 0.0]))],
            vec![1.0, 1.0, 0.0],
            true,
        )
        .unwrap();
        let out = fit(&mut tree, root, &d).unwrap();
        assert_eq!(out, Value::ArrayF(vec![1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_split_on_uses_first_child() {
        let sig = Signature::new(ValueKind::ArrayF, vec![ValueKind::ArrayF; 3]);
        let mut tree = Tree::new(Node::new(NodeKind::SplitOn, &sig, false));
        let root = tree.root();
        tree.append_child(root, Node::terminal("x1", ValueKind::ArrayF, false));
        tree.append_child(root, Node::mean_label());
        tree.append_child(root, Node::mean_label());
        let out = fit(&mut tree, root, &data()).unwrap();
        assert_eq!(out, Value::ArrayF(vec![0.0, 0.0, 1.0, 1.0]));
        assert_eq!(tree.node(root).weight, 2.5);
        let again = predict(&tree, root, &data(), None).unwrap();
        assert_eq!(again, out);
    }

    #[test]
    fn test_missing_feature_surfaces() {
        let mut tree = Tree::new(Node::terminal("nope", ValueKind::ArrayF, false));
        let root = tree.root();
        assert!(matches!(fit(&mut tree, root, &data()), Err(TypedGpError::FeatureNotFound(_))));
    }

    #[test]
    fn test_foreign_hash_is_lookup_error() {
        let mut node = binary(NodeKind::Add);
        node.sig_hash ^= 0xdead_beef;
        let tree = Tree::new(node);
        let out = predict(&tree, tree.root(), &data(), None);
        assert!(matches!(out, Err(TypedGpError::Lookup { .. })));
    }

    #[test]
    fn test_split_missing_branch_is_invalid_tree() {
        let mut tree = Tree::new(binary(NodeKind::SplitBest));
        let root = tree.root();
        tree.append_child(root, Node::mean_label());
        assert!(matches!(fit(&mut tree, root, &data()), Err(TypedGpError::InvalidTree(_))));
        assert!(matches!(predict(&tree, root, &data(), None), Err(TypedGpError::InvalidTree(_))));
    }
}
