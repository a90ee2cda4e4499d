use super::ast::{NodeId, Tree};
use super::search_space::SearchSpace;
use crate::config::EvolutionConfig;
use crate::data::Dataset;
use crate::engines::evaluation::expression;
use crate::error::{Result, TypedGpError};
use crate::functions::nodetype::NodeKind;
use crate::functions::primitives;
use crate::functions::registry::WeightOverrides;
use crate::functions::signatures::Signature;
use crate::types::{Value, ValueKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// What a program's root produces and how `predict` reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgramType {
    Regressor,
    BinaryClassifier,
    MulticlassClassifier,
    Representer,
}

impl ProgramType {
    /// Return type of the tree root.
    pub fn root_type(self) -> ValueKind {
        match self {
            ProgramType::Regressor | ProgramType::BinaryClassifier => ValueKind::ArrayF,
            ProgramType::MulticlassClassifier | ProgramType::Representer => ValueKind::MatrixF,
        }
    }

    pub fn for_dataset(d: &Dataset) -> Self {
        match (d.classification, d.n_classes()) {
            (false, _) => ProgramType::Regressor,
            (true, n) if n <= 2 => ProgramType::BinaryClassifier,
            (true, _) => ProgramType::MulticlassClassifier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// Infix expression on one line.
    Compact,
    /// Indented outline, one node per line.
    Tree,
    /// Graphviz digraph.
    Dot,
}

/// A typed expression tree together with the task it solves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub tree: Tree,
    pub program_type: ProgramType,
    #[serde(default)]
    is_fitted: bool,
    #[serde(skip)]
    search_space: Option<Arc<SearchSpace>>,
}

impl Program {
    pub fn new(tree: Tree, program_type: ProgramType) -> Self {
        Self {
            tree,
            program_type,
            is_fitted: false,
            search_space: None,
        }
    }

    pub fn with_search_space(mut self, ss: Arc<SearchSpace>) -> Self {
        self.search_space = Some(ss);
        self
    }

    pub fn search_space(&self) -> Option<&Arc<SearchSpace>> {
        self.search_space.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Marks the program as changed so it must be fit again.
    pub(crate) fn invalidate(&mut self) {
        self.is_fitted = false;
    }

    /// Draws a random program. Zero limits are replaced by a random value
    /// between 1 and the configured maximum.
    pub fn random<R: Rng>(
        ss: Arc<SearchSpace>,
        program_type: ProgramType,
        max_depth: usize,
        max_size: usize,
        params: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let max_depth = match (max_depth, params.max_depth) {
            (0, 0) => return Err(TypedGpError::Configuration("max_depth must be at least 1".into())),
            (0, limit) => rng.gen_range(1..=limit),
            (depth, _) => depth,
        };
        let max_size = match (max_size, params.max_size) {
            (0, 0) => return Err(TypedGpError::Configuration("max_size must be at least 1".into())),
            (0, limit) => rng.gen_range(1..=limit),
            (size, _) => size,
        };

        let tree = match program_type {
            ProgramType::Regressor | ProgramType::Representer => {
                random_subtree(&ss, program_type.root_type(), max_depth, max_size, rng)?
            }
            ProgramType::BinaryClassifier => binary_classifier(&ss, max_depth, max_size, rng)?,
            ProgramType::MulticlassClassifier => multiclass_classifier(&ss, max_depth, max_size, rng)?,
        };
        log::trace!("random {:?} with {} nodes", program_type, tree.size());
        Ok(Program::new(tree, program_type).with_search_space(ss))
    }

    pub fn fit(&mut self, d: &Dataset) -> Result<&mut Self> {
        let root = self.tree.root();
        expression::fit(&mut self.tree, root, d)?;
        self.is_fitted = true;
        Ok(self)
    }

    /// Predictions in task form: class labels for classifiers, the raw
    /// output otherwise.
    pub fn predict(&self, d: &Dataset) -> Result<Value> {
        let raw = self.predict_proba(d)?;
        self.finish_prediction(raw)
    }

    /// Raw root output; class probabilities for classifiers.
    pub fn predict_proba(&self, d: &Dataset) -> Result<Value> {
        if !self.is_fitted {
            return Err(TypedGpError::NotFitted);
        }
        expression::predict(&self.tree, self.tree.root(), d, None)
    }

    /// Like `predict`, with the weights of the weighted nodes taken from
    /// `weights` in post-order instead of from the tree.
    pub fn predict_with_weights(&self, d: &Dataset, weights: &[f64]) -> Result<Value> {
        if !self.is_fitted {
            return Err(TypedGpError::NotFitted);
        }
        let ids = self.weighted_ids();
        if ids.len() != weights.len() {
            return Err(TypedGpError::SizeMismatch {
                expected: ids.len(),
                actual: weights.len(),
            });
        }
        let overrides: WeightOverrides = ids.into_iter().zip(weights.iter().copied()).collect();
        let raw = expression::predict(&self.tree, self.tree.root(), d, Some(&overrides))?;
        self.finish_prediction(raw)
    }

    fn finish_prediction(&self, raw: Value) -> Result<Value> {
        match (self.program_type, raw) {
            (ProgramType::BinaryClassifier, Value::ArrayF(p)) => {
                Ok(Value::ArrayB(p.into_iter().map(|x| x > 0.5).collect()))
            }
            (ProgramType::MulticlassClassifier, raw @ Value::MatrixF(_)) => {
                primitives::apply(NodeKind::ArgMax, &[raw], ValueKind::ArrayI)
            }
            (ProgramType::BinaryClassifier | ProgramType::MulticlassClassifier, other) => {
                Err(TypedGpError::TypeMismatch {
                    expected: self.program_type.root_type().to_string(),
                    actual: other.kind().to_string(),
                })
            }
            (_, raw) => Ok(raw),
        }
    }

    /// Ids of the weighted nodes in post-order.
    pub fn weighted_ids(&self) -> Vec<NodeId> {
        self.tree
            .post_order()
            .into_iter()
            .filter(|id| self.tree.node(*id).is_weighted())
            .collect()
    }

    pub fn get_weights(&self) -> Vec<f64> {
        self.weighted_ids()
            .into_iter()
            .map(|id| self.tree.node(id).weight)
            .collect()
    }

    pub fn set_weights(&mut self, weights: &[f64]) -> Result<()> {
        let ids = self.weighted_ids();
        if ids.len() != weights.len() {
            return Err(TypedGpError::SizeMismatch {
                expected: ids.len(),
                actual: weights.len(),
            });
        }
        for (id, w) in ids.into_iter().zip(weights) {
            self.tree.node_mut(id).weight = *w;
        }
        Ok(())
    }

    pub fn n_weights(&self) -> usize {
        self.weighted_ids().len()
    }

    pub fn size(&self, include_weight: bool) -> usize {
        self.size_at(self.tree.root(), include_weight)
    }

    pub fn size_at(&self, id: NodeId, include_weight: bool) -> usize {
        self.tree
            .pre_order_from(id)
            .into_iter()
            .map(|n| self.tree.node(n).size_cost(include_weight))
            .sum()
    }

    /// Levels in the tree; a lone root has depth 1.
    pub fn depth(&self) -> usize {
        self.tree.depth()
    }

    /// Edges between `id` and the root.
    pub fn depth_of(&self, id: NodeId) -> usize {
        self.tree.depth_of(id)
    }

    pub fn subtree_depth(&self, id: NodeId) -> usize {
        self.tree.subtree_depth(id)
    }

    /// Each node costs its base complexity times the summed complexity of its
    /// children (at least 1). A weighted node is costed as a multiplication
    /// of a constant with the node.
    pub fn complexity(&self) -> u64 {
        let mut cost: HashMap<NodeId, u64> = HashMap::new();
        for id in self.tree.post_order() {
            let node = self.tree.node(id);
            let children: u64 = self.tree.children(id).iter().map(|c| cost[c]).sum();
            let inner = node.kind.complexity().saturating_mul(children.max(1));
            let total = if node.is_weighted() && !matches!(node.kind, NodeKind::Constant | NodeKind::MeanLabel) {
                NodeKind::Mul
                    .complexity()
                    .saturating_mul(NodeKind::Constant.complexity().saturating_add(inner))
            } else {
                inner
            };
            cost.insert(id, total);
        }
        cost.get(&self.tree.root()).copied().unwrap_or(0)
    }

    pub fn get_model(&self, format: ModelFormat) -> String {
        match format {
            ModelFormat::Compact => render_compact(&self.tree, self.tree.root()),
            ModelFormat::Tree => render_outline(&self.tree),
            ModelFormat::Dot => render_dot(&self.tree),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores a program; attach a search space with `with_search_space`
    /// before varying it.
    pub fn from_json(json: &str) -> Result<Self> {
        let program: Program = serde_json::from_str(json)?;
        program.tree.validate()?;
        Ok(program)
    }
}

impl SearchSpace {
    /// Random program of `program_type` drawn from this search space.
    pub fn make_program<R: Rng>(
        self: &Arc<Self>,
        program_type: ProgramType,
        max_depth: usize,
        max_size: usize,
        params: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Program> {
        Program::random(Arc::clone(self), program_type, max_depth, max_size, params, rng)
    }
}

fn random_subtree<R: Rng>(
    ss: &SearchSpace,
    ret: ValueKind,
    max_depth: usize,
    max_size: usize,
    rng: &mut R,
) -> Result<Tree> {
    match ss.sample_subtree(ret, max_depth, max_size, rng)? {
        Some(tree) => Ok(tree),
        None => Ok(Tree::new(ss.terminal_for(ret, rng)?)),
    }
}

/// `Logistic(OffsetSum(subtree))` with both wrappers pinned.
fn binary_classifier<R: Rng>(ss: &SearchSpace, max_depth: usize, max_size: usize, rng: &mut R) -> Result<Tree> {
    let unary = Signature::new(ValueKind::ArrayF, vec![ValueKind::ArrayF]).hash();
    let mut logistic = ss.get(NodeKind::Logistic, ValueKind::ArrayF, unary)?;
    logistic.fix();
    let mut offset = ss.get(NodeKind::OffsetSum, ValueKind::ArrayF, unary)?;
    offset.fix();
    let fixed_size = logistic.size_cost(true) + offset.size_cost(true);

    let mut tree = Tree::new(logistic);
    let root = tree.root();
    let offset_id = tree.append_child(root, offset);

    let body = random_subtree(
        ss,
        ValueKind::ArrayF,
        max_depth.saturating_sub(2).max(1),
        max_size.saturating_sub(fixed_size).max(1),
        rng,
    )?;
    let slot = tree.append_child(offset_id, body.node(body.root()).clone());
    tree.graft(slot, &body, body.root());
    Ok(tree)
}

/// A pinned n-ary `Softmax` with one subtree per class.
fn multiclass_classifier<R: Rng>(ss: &SearchSpace, max_depth: usize, max_size: usize, rng: &mut R) -> Result<Tree> {
    let n_classes = ss.n_classes();
    if n_classes < 2 {
        return Err(TypedGpError::Configuration(
            "Multiclass programs need a classification search space".to_string(),
        ));
    }
    let sig = Signature::nary(ValueKind::MatrixF, ValueKind::ArrayF, n_classes);
    let mut softmax = ss.get(NodeKind::Softmax, ValueKind::MatrixF, sig.hash())?;
    softmax.fix();

    let per_class_size = (max_size.saturating_sub(softmax.size_cost(true)) / n_classes).max(1);
    let mut tree = Tree::new(softmax);
    let root = tree.root();
    for _ in 0..n_classes {
        let body = random_subtree(ss, ValueKind::ArrayF, max_depth.saturating_sub(1).max(1), per_class_size, rng)?;
        let slot = tree.append_child(root, body.node(body.root()).clone());
        tree.graft(slot, &body, body.root());
    }
    Ok(tree)
}

fn render_compact(tree: &Tree, id: NodeId) -> String {
    let node = tree.node(id);
    let args: Vec<String> = tree.children(id).iter().map(|c| render_compact(tree, *c)).collect();

    let body = match (node.kind, args.as_slice()) {
        (kind, []) if kind.is_leaf() => return node.name(true),
        (NodeKind::SplitBest, [left, right]) => {
            format!("If({}>{:.2},{},{})", node.feature(), node.weight, left, right)
        }
        (NodeKind::SplitOn, [on, left, right]) => {
            format!("If({}>{:.2},{},{})", on, node.weight, left, right)
        }
        (kind, [a, b]) if kind.symbol().is_some() => {
            format!("({}{}{})", a, kind.symbol().unwrap_or_default(), b)
        }
        (kind, _) => format!("{}({})", kind.name(), args.join(",")),
    };

    if node.is_weighted() {
        match node.kind {
            NodeKind::OffsetSum => format!("({:.2}+{})", node.weight, args.join(",")),
            _ => format!("{:.2}*{}", node.weight, body),
        }
    } else {
        body
    }
}

fn render_outline(tree: &Tree) -> String {
    let mut out = String::new();
    let mut stack = vec![(tree.root(), 0usize)];
    while let Some((id, level)) = stack.pop() {
        if level > 0 {
            out.push_str(&"|  ".repeat(level - 1));
            out.push_str("|- ");
        }
        out.push_str(&tree.node(id).name(true));
        out.push('\n');
        for &child in tree.children(id).iter().rev() {
            stack.push((child, level + 1));
        }
    }
    out
}

fn render_dot(tree: &Tree) -> String {
    let mut out = String::from("digraph G {\n");
    for id in tree.pre_order() {
        let node = tree.node(id);
        out.push_str(&format!("  n{} [label=\"{}\"];\n", id, node.name(true).replace('"', "\\\"")));
        for &child in tree.children(id) {
            out.push_str(&format!("  n{} -> n{};\n", id, child));
        }
    }
    out.push_str("}\n");
    out
}
