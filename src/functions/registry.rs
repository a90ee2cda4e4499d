use super::nodetype::NodeKind;
use super::signatures::signatures;
use crate::data::Dataset;
use crate::engines::evaluation::expression;
use crate::engines::generation::ast::{NodeId, Tree};
use crate::error::{Result, TypedGpError};
use crate::types::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Alternate weights keyed by node, used by `predict_with_weights`.
pub type WeightOverrides = HashMap<NodeId, f64>;

pub type FitRoutine = fn(&mut Tree, NodeId, &Dataset) -> Result<Value>;
pub type PredictRoutine = fn(&Tree, NodeId, &Dataset, Option<&WeightOverrides>) -> Result<Value>;

/// Evaluation routines keyed by `(kind, signature hash)`.
///
/// Predict routines are registered a second time under the dual hash so a
/// tree can be evaluated with externally supplied weights.
pub struct DispatchTable {
    fit: HashMap<(NodeKind, u64), FitRoutine>,
    predict: HashMap<(NodeKind, u64), PredictRoutine>,
}

impl DispatchTable {
    pub fn new() -> Self {
        let mut table = Self {
            fit: HashMap::new(),
            predict: HashMap::new(),
        };
        for kind in NodeKind::ALL {
            let (fit, predict) = Self::routines(kind);
            for sig in signatures(kind) {
                table.fit.insert((kind, sig.hash()), fit);
                table.predict.insert((kind, sig.hash()), predict);
                table.predict.insert((kind, sig.dual_hash()), predict);
            }
        }
        table
    }

    /// Process-wide table, built on first use.
    pub fn global() -> &'static DispatchTable {
        static TABLE: OnceLock<DispatchTable> = OnceLock::new();
        TABLE.get_or_init(DispatchTable::new)
    }

    fn routines(kind: NodeKind) -> (FitRoutine, PredictRoutine) {
        let fit: FitRoutine = match kind {
            NodeKind::Terminal => expression::fit_terminal,
            NodeKind::Constant => expression::fit_constant,
            NodeKind::MeanLabel => expression::fit_mean_label,
            NodeKind::SplitBest | NodeKind::SplitOn => expression::fit_split,
            _ => expression::fit_operator,
        };
        let predict: PredictRoutine = match kind {
            NodeKind::Terminal => expression::predict_terminal,
            NodeKind::Constant | NodeKind::MeanLabel => expression::predict_constant,
            NodeKind::SplitBest | NodeKind::SplitOn => expression::predict_split,
            _ => expression::predict_operator,
        };
        (fit, predict)
    }

    pub fn fit_routine(&self, kind: NodeKind, sig_hash: u64) -> Result<FitRoutine> {
        self.fit
            .get(&(kind, sig_hash))
            .copied()
            .ok_or(TypedGpError::Lookup {
                mode: "fit",
                kind,
                sig_hash,
            })
    }

    pub fn predict_routine(&self, kind: NodeKind, sig_hash: u64) -> Result<PredictRoutine> {
        self.predict
            .get(&(kind, sig_hash))
            .copied()
            .ok_or(TypedGpError::Lookup {
                mode: "predict",
                kind,
                sig_hash,
            })
    }

    pub fn contains(&self, kind: NodeKind, sig_hash: u64) -> bool {
        self.fit.contains_key(&(kind, sig_hash))
    }

    /// Number of `(kind, signature)` pairs with a fit routine.
    pub fn len(&self) -> usize {
        self.fit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fit.is_empty()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}
