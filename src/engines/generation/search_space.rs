use super::node::Node;
use crate::config::SearchSpaceConfig;
use crate::data::Dataset;
use crate::error::{Result, TypedGpError};
use crate::functions::nodetype::NodeKind;
use crate::functions::signatures::{signatures, Signature, MAX_NARY_ARGS};
use crate::types::{Value, ValueKind};
use crate::utils::sampling::{has_positive_weight, select_weighted};
use crate::utils::stats;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

type OperatorMap<T> = BTreeMap<ValueKind, BTreeMap<u64, BTreeMap<NodeKind, T>>>;

/// Catalog of the operators and terminals programs may be built from,
/// with the sampling weight of each entry.
///
/// Operators are indexed by return type, then signature hash, then kind.
/// Terminals are indexed by return type. Every map has a parallel map of
/// weights; entries with weight zero stay in the catalog but are never drawn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    node_map: OperatorMap<Node>,
    node_map_weights: OperatorMap<f64>,
    terminal_map: BTreeMap<ValueKind, Vec<Node>>,
    terminal_weights: BTreeMap<ValueKind, Vec<f64>>,
    terminal_types: Vec<ValueKind>,
    n_classes: usize,
}

impl SearchSpace {
    pub fn new(d: &Dataset, cfg: &SearchSpaceConfig) -> Result<Self> {
        let mut space = Self {
            terminal_types: d.unique_data_types().to_vec(),
            n_classes: if d.classification { d.n_classes() } else { 0 },
            ..Self::default()
        };

        for terminal in generate_terminals(d, cfg.weights_init) {
            let ret = terminal.ret_type;
            space.terminal_weights.entry(ret).or_default().push(terminal.prob_change);
            space.terminal_map.entry(ret).or_default().push(terminal);
        }

        let user_ops = cfg.operator_weights()?;
        let data_types = d.unique_data_types();
        for kind in NodeKind::ALL.iter().copied().filter(|k| !k.is_leaf()) {
            let weight = if user_ops.is_empty() {
                1.0
            } else {
                match user_ops.get(&kind) {
                    Some(w) => *w,
                    None => continue,
                }
            };
            for sig in signatures(kind) {
                if sig.args.iter().all(|a| data_types.contains(a)) {
                    space.add_operator(kind, &sig, weight);
                }
            }
        }

        if d.classification {
            space.add_classification_roots()?;
        }

        log::info!(
            "Search space: {} operators, {} terminals over {} data types",
            space.n_operators(),
            space.n_terminals(),
            space.terminal_types.len()
        );
        log::debug!("{}", space);
        Ok(space)
    }

    fn add_operator(&mut self, kind: NodeKind, sig: &Signature, weight: f64) {
        let node = Node::new(kind, sig, false);
        self.node_map
            .entry(sig.ret)
            .or_default()
            .entry(sig.hash())
            .or_default()
            .insert(kind, node);
        self.node_map_weights
            .entry(sig.ret)
            .or_default()
            .entry(sig.hash())
            .or_default()
            .insert(kind, weight);
    }

    fn contains(&self, kind: NodeKind, ret: ValueKind, sig_hash: u64) -> bool {
        self.node_map
            .get(&ret)
            .and_then(|by_sig| by_sig.get(&sig_hash))
            .is_some_and(|by_kind| by_kind.contains_key(&kind))
    }

    /// Classifier roots must be buildable even when the user did not ask for
    /// them; they enter with weight zero so they are never sampled elsewhere.
    fn add_classification_roots(&mut self) -> Result<()> {
        let mut required = vec![(
            NodeKind::OffsetSum,
            Signature::new(ValueKind::ArrayF, vec![ValueKind::ArrayF]),
        )];
        if self.n_classes <= 2 {
            required.push((
                NodeKind::Logistic,
                Signature::new(ValueKind::ArrayF, vec![ValueKind::ArrayF]),
            ));
        } else if self.n_classes <= MAX_NARY_ARGS {
            required.push((
                NodeKind::Softmax,
                Signature::nary(ValueKind::MatrixF, ValueKind::ArrayF, self.n_classes),
            ));
        } else {
            return Err(TypedGpError::Configuration(format!(
                "{} classes exceed the {} arguments Softmax accepts",
                self.n_classes, MAX_NARY_ARGS
            )));
        }
        for (kind, sig) in required {
            if !self.contains(kind, sig.ret, sig.hash()) {
                self.add_operator(kind, &sig, 0.0);
            }
        }
        Ok(())
    }

    pub fn n_operators(&self) -> usize {
        self.node_map
            .values()
            .flat_map(|by_sig| by_sig.values())
            .map(|by_kind| by_kind.len())
            .sum()
    }

    pub fn n_terminals(&self) -> usize {
        self.terminal_map.values().map(|v| v.len()).sum()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Data types present among the dataset's features.
    pub fn terminal_types(&self) -> &[ValueKind] {
        &self.terminal_types
    }

    pub fn terminals(&self, ret: ValueKind) -> &[Node] {
        self.terminal_map.get(&ret).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The catalog entry for `(kind, ret, sig_hash)`.
    pub fn get(&self, kind: NodeKind, ret: ValueKind, sig_hash: u64) -> Result<Node> {
        self.node_map
            .get(&ret)
            .and_then(|by_sig| by_sig.get(&sig_hash))
            .and_then(|by_kind| by_kind.get(&kind))
            .cloned()
            .ok_or_else(|| {
                TypedGpError::Configuration(format!(
                    "{} returning {} (signature {:#x}) is not in the search space",
                    kind, ret, sig_hash
                ))
            })
    }

    /// Whether some operator returning `ret` can be drawn.
    pub fn has_operator(&self, ret: ValueKind) -> bool {
        self.node_map_weights.get(&ret).is_some_and(|by_sig| {
            by_sig
                .values()
                .flat_map(|by_kind| by_kind.values())
                .any(|w| w.is_finite() && *w > 0.0)
        })
    }

    pub fn has_terminal(&self, ret: ValueKind) -> bool {
        self.terminal_weights
            .get(&ret)
            .is_some_and(|w| has_positive_weight(w))
    }

    pub fn set_terminal_weight(&mut self, feature: &str, weight: f64) -> Result<()> {
        for (ret, nodes) in &mut self.terminal_map {
            if let Some(i) = nodes.iter().position(|n| n.feature() == feature) {
                nodes[i].prob_change = weight;
                if let Some(weights) = self.terminal_weights.get_mut(ret) {
                    weights[i] = weight;
                }
                return Ok(());
            }
        }
        Err(TypedGpError::FeatureNotFound(feature.to_string()))
    }

    /// Sets the weight of every overload of `kind`.
    pub fn set_operator_weight(&mut self, kind: NodeKind, weight: f64) {
        for by_sig in self.node_map_weights.values_mut() {
            for by_kind in by_sig.values_mut() {
                if let Some(w) = by_kind.get_mut(&kind) {
                    *w = weight;
                }
            }
        }
    }

    /// Draws a terminal returning `ret`, or of any type when `ret` is `None`.
    ///
    /// With `force` the weights are ignored and the draw is uniform, which
    /// always succeeds when a terminal of the type exists.
    pub fn sample_terminal<R: Rng>(&self, ret: Option<ValueKind>, force: bool, rng: &mut R) -> Option<Node> {
        let (nodes, weights): (Vec<&Node>, Vec<f64>) = match ret {
            Some(ret) => {
                let nodes = self.terminal_map.get(&ret)?;
                let weights = self.terminal_weights.get(&ret)?;
                (nodes.iter().collect(), weights.clone())
            }
            None => (
                self.terminal_map.values().flatten().collect(),
                self.terminal_weights.values().flatten().copied().collect(),
            ),
        };
        if nodes.is_empty() {
            return None;
        }
        let i = if force {
            rng.gen_range(0..nodes.len())
        } else {
            select_weighted(&weights, rng)?
        };
        Some(nodes[i].clone())
    }

    /// Weighted draw over operators returning `ret`, optionally restricted to
    /// one signature or one kind.
    pub fn sample_operator<R: Rng>(
        &self,
        ret: ValueKind,
        sig_hash: Option<u64>,
        kind: Option<NodeKind>,
        rng: &mut R,
    ) -> Option<Node> {
        self.sample_where(ret, rng, |sig, k, _| {
            sig_hash.map_or(true, |h| h == sig) && kind.map_or(true, |want| want == k)
        })
    }

    /// Weighted draw over operators returning `ret` that take at least one
    /// argument of type `arg`.
    ///
    /// With `terminal_compatible` every argument besides the first `arg` slot
    /// must have terminals, and `max_arity` bounds the number of arguments.
    pub fn sample_operator_with_argument<R: Rng>(
        &self,
        ret: ValueKind,
        arg: ValueKind,
        terminal_compatible: bool,
        max_arity: Option<usize>,
        rng: &mut R,
    ) -> Option<Node> {
        self.sample_where(ret, rng, |_, _, node| {
            let Some(slot) = node.arg_types.iter().position(|a| *a == arg) else {
                return false;
            };
            max_arity.map_or(true, |m| node.arity() <= m)
                && (!terminal_compatible
                    || node
                        .arg_types
                        .iter()
                        .enumerate()
                        .all(|(i, a)| i == slot || self.terminal_map.contains_key(a)))
        })
    }

    fn sample_where<R, F>(&self, ret: ValueKind, rng: &mut R, keep: F) -> Option<Node>
    where
        R: Rng,
        F: Fn(u64, NodeKind, &Node) -> bool,
    {
        let by_sig = self.node_map.get(&ret)?;
        let weights_by_sig = self.node_map_weights.get(&ret)?;

        let mut candidates = Vec::new();
        let mut weights = Vec::new();
        for (sig_hash, by_kind) in by_sig {
            for (kind, node) in by_kind {
                if !keep(*sig_hash, *kind, node) {
                    continue;
                }
                let w = weights_by_sig
                    .get(sig_hash)
                    .and_then(|m| m.get(kind))
                    .copied()
                    .unwrap_or(0.0);
                candidates.push(node);
                weights.push(w);
            }
        }
        let i = select_weighted(&weights, rng)?;
        Some(candidates[i].clone())
    }

    /// A replacement for `node` with the same signature. Leaves are replaced
    /// by any terminal of the same type. The draw may return an equal node.
    pub fn get_similar<R: Rng>(&self, node: &Node, rng: &mut R) -> Option<Node> {
        if node.kind.is_leaf() {
            return self.sample_terminal(Some(node.ret_type), false, rng);
        }
        self.sample_operator(node.ret_type, Some(node.sig_hash), None, rng)
    }
}

/// One terminal per feature plus the constants and `MeanLabel`.
fn generate_terminals(d: &Dataset, weights_init: bool) -> Vec<Node> {
    let mut terminals = Vec::new();
    for (name, value) in d.features() {
        let mut node = Node::terminal(name, value.kind(), true);
        node.prob_change = if weights_init && !d.y.is_empty() {
            terminal_weight(value, &d.y)
        } else {
            1.0
        };
        terminals.push(node);
    }

    let mean_change = |kind: ValueKind| {
        let changes: Vec<f64> = terminals
            .iter()
            .filter(|t| t.ret_type == kind)
            .map(|t| t.prob_change)
            .collect();
        if changes.is_empty() {
            1.0
        } else {
            stats::mean(&changes)
        }
    };

    let mut extra = Vec::new();
    for kind in [ValueKind::ArrayF, ValueKind::ArrayI, ValueKind::ArrayB] {
        let mut constant = Node::constant(kind);
        constant.prob_change = mean_change(kind);
        extra.push(constant);
    }
    let mut mean_label = Node::mean_label();
    mean_label.prob_change = mean_change(ValueKind::ArrayF);
    extra.push(mean_label);

    terminals.extend(extra);
    terminals
}

/// Absolute standardized slope of the target on the feature.
///
/// Integer features are scored one-vs-all over their distinct values and the
/// scores averaged. Non-array features score 1. Near-zero scores are raised
/// to 0.1 so the feature stays reachable; undefined scores become 0.
pub(crate) fn terminal_weight(x: &Value, y: &[f64]) -> f64 {
    let zy = stats::z_score(y);
    let score = |xs: &[f64]| stats::slope(&stats::z_score(xs), &zy).abs();

    let w = match x {
        Value::ArrayF(v) => score(v),
        Value::ArrayB(v) => {
            let xs: Vec<f64> = v.iter().map(|b| *b as u8 as f64).collect();
            score(&xs)
        }
        Value::ArrayI(v) => {
            let xs: Vec<f64> = v.iter().map(|i| *i as f64).collect();
            let scores: Vec<f64> = stats::unique(&xs)
                .into_iter()
                .map(|u| {
                    let indicator: Vec<f64> = xs.iter().map(|x| (*x == u) as u8 as f64).collect();
                    score(&indicator)
                })
                .filter(|s| s.is_finite())
                .collect();
            stats::mean(&scores)
        }
        _ => 1.0,
    };

    if w.is_nan() {
        0.0
    } else if w < 1e-4 {
        0.1
    } else {
        w
    }
}

impl fmt::Display for SearchSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Terminals:")?;
        for (ret, nodes) in &self.terminal_map {
            let weights = self.terminal_weights.get(ret);
            for (i, node) in nodes.iter().enumerate() {
                let w = weights.and_then(|w| w.get(i)).copied().unwrap_or(0.0);
                writeln!(f, "  {:<12} {:<20} {:.3}", ret.as_str(), node.name(false), w)?;
            }
        }
        writeln!(f, "Operators:")?;
        for (ret, by_sig) in &self.node_map {
            for (sig_hash, by_kind) in by_sig {
                for (kind, node) in by_kind {
                    let w = self
                        .node_map_weights
                        .get(ret)
                        .and_then(|m| m.get(sig_hash))
                        .and_then(|m| m.get(kind))
                        .copied()
                        .unwrap_or(0.0);
                    let args: Vec<&str> = node.arg_types.iter().map(|a| a.as_str()).collect();
                    writeln!(f, "  {:<12} {:<10} ({}) {:.3}", ret.as_str(), kind.name(), args.join(", "), w)?;
                }
            }
        }
        Ok(())
    }
}
