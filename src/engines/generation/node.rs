use crate::error::TypedGpError;
use crate::functions::nodetype::{NodeKind, ALWAYS_WEIGHTED, NEVER_WEIGHTED};
use crate::functions::signatures::{find_signature, fnv1a, Signature, MAX_ARITY};
use crate::types::ValueKind;
use serde::{Deserialize, Serialize};

/// One vertex of a program tree.
///
/// Equality is decided by `complete_hash` alone, which covers the kind,
/// signature, weighted flag and feature. The weight value never takes part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "NodeRecord", try_from = "NodeRecord")]
pub struct Node {
    pub kind: NodeKind,
    pub sig_hash: u64,
    pub sig_dual_hash: u64,
    pub ret_type: ValueKind,
    pub arg_types: Vec<ValueKind>,
    /// Scalar weight; split threshold for split kinds; the value of a constant.
    pub weight: f64,
    pub fixed: bool,
    pub prob_change: f64,
    is_weighted: bool,
    feature: String,
    complete_hash: u64,
}

impl Node {
    pub fn new(kind: NodeKind, sig: &Signature, weighted: bool) -> Self {
        let mut node = Self {
            kind,
            sig_hash: sig.hash(),
            sig_dual_hash: sig.dual_hash(),
            ret_type: sig.ret,
            arg_types: sig.args.clone(),
            weight: if kind.is_split() { 0.0 } else { 1.0 },
            fixed: false,
            prob_change: 1.0,
            is_weighted: weighted || ALWAYS_WEIGHTED.contains(kind),
            feature: String::new(),
            complete_hash: 0,
        };
        if node.is_weighted && NEVER_WEIGHTED.contains(kind) {
            node.is_weighted = false;
        }
        node.rehash();
        node
    }

    /// A leaf reading the named dataset feature.
    pub fn terminal(feature: &str, ret: ValueKind, weighted: bool) -> Self {
        let mut node = Self::new(NodeKind::Terminal, &Signature::leaf(ret), weighted && ret.is_weighable());
        node.feature = feature.to_string();
        node.rehash();
        node
    }

    pub fn constant(ret: ValueKind) -> Self {
        let mut node = Self::new(NodeKind::Constant, &Signature::leaf(ret), true);
        // boolean constants have no scalar to tune
        if ret == ValueKind::ArrayB {
            node.is_weighted = false;
            node.rehash();
        }
        node
    }

    pub fn mean_label() -> Self {
        Self::new(NodeKind::MeanLabel, &Signature::leaf(ValueKind::ArrayF), true)
    }

    fn rehash(&mut self) {
        let bytes = self
            .kind
            .bits()
            .to_le_bytes()
            .into_iter()
            .chain(self.sig_hash.to_le_bytes())
            .chain(std::iter::once(self.is_weighted as u8))
            .chain(self.feature.bytes());
        self.complete_hash = fnv1a(bytes);
    }

    pub fn complete_hash(&self) -> u64 {
        self.complete_hash
    }

    pub fn is_weighted(&self) -> bool {
        self.is_weighted
    }

    /// Whether the weighted flag of this node may be flipped by variation.
    pub fn can_toggle_weight(&self) -> bool {
        self.ret_type.is_weighable()
            && !ALWAYS_WEIGHTED.contains(self.kind)
            && !NEVER_WEIGHTED.contains(self.kind)
    }

    /// Returns false when the request is refused.
    pub fn set_is_weighted(&mut self, weighted: bool) -> bool {
        if weighted == self.is_weighted {
            return true;
        }
        if !self.can_toggle_weight() {
            return false;
        }
        self.is_weighted = weighted;
        if weighted {
            self.weight = 1.0;
        }
        self.rehash();
        true
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn set_feature(&mut self, feature: &str) {
        self.feature = feature.to_string();
        self.rehash();
    }

    /// Pins the node so variation never selects it.
    pub fn fix(&mut self) {
        self.fixed = true;
        self.prob_change = 0.0;
    }

    pub fn arity(&self) -> usize {
        self.arg_types.len()
    }

    /// Contribution of this node to the program size.
    pub fn size_cost(&self, include_weight: bool) -> usize {
        let mut cost = 1;
        if self.kind.is_split() {
            cost += 3;
        }
        if include_weight
            && self.is_weighted
            && !matches!(self.kind, NodeKind::Constant | NodeKind::MeanLabel)
        {
            cost += 2;
        }
        cost
    }

    /// Short label used when rendering models.
    pub fn name(&self, include_weight: bool) -> String {
        let base = match self.kind {
            NodeKind::Terminal => self.feature.clone(),
            NodeKind::Constant => {
                return match self.ret_type {
                    ValueKind::ArrayB => "true".to_string(),
                    ValueKind::ArrayI => format!("{}", self.weight.round() as i64),
                    _ => format!("{:.2}", self.weight),
                };
            }
            NodeKind::MeanLabel => {
                return if include_weight {
                    format!("{:.2}", self.weight)
                } else {
                    "MeanLabel".to_string()
                };
            }
            NodeKind::SplitBest => {
                if include_weight {
                    format!("If({}>{:.2})", self.feature, self.weight)
                } else {
                    format!("If({})", self.feature)
                }
            }
            NodeKind::SplitOn => {
                if include_weight {
                    format!("If(>{:.2})", self.weight)
                } else {
                    "If".to_string()
                }
            }
            kind => kind.name().to_string(),
        };
        if include_weight && self.is_weighted {
            match self.kind {
                NodeKind::OffsetSum => format!("{:.2}+{}", self.weight, base),
                _ => format!("{:.2}*{}", self.weight, base),
            }
        } else {
            base
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.complete_hash == other.complete_hash
    }
}

impl Eq for Node {}

/// Flat persisted form of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub kind: NodeKind,
    #[serde(default)]
    pub feature: String,
    pub is_weighted: bool,
    pub weight: f64,
    pub ret_type: ValueKind,
    pub arg_types: Vec<ValueKind>,
    pub sig_hash: u64,
    pub sig_dual_hash: u64,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default = "default_prob_change")]
    pub prob_change: f64,
}

fn default_prob_change() -> f64 {
    1.0
}

impl From<Node> for NodeRecord {
    fn from(node: Node) -> Self {
        Self {
            kind: node.kind,
            feature: node.feature,
            is_weighted: node.is_weighted,
            weight: node.weight,
            ret_type: node.ret_type,
            arg_types: node.arg_types,
            sig_hash: node.sig_hash,
            sig_dual_hash: node.sig_dual_hash,
            fixed: node.fixed,
            prob_change: node.prob_change,
        }
    }
}

impl TryFrom<NodeRecord> for Node {
    type Error = TypedGpError;

    fn try_from(record: NodeRecord) -> Result<Self, Self::Error> {
        if record.arg_types.len() > MAX_ARITY {
            return Err(TypedGpError::InvalidTree(format!(
                "{} declares {} arguments",
                record.kind,
                record.arg_types.len()
            )));
        }
        let registered = find_signature(record.kind, record.sig_hash).filter(|sig| {
            sig.ret == record.ret_type && sig.args == record.arg_types && sig.dual_hash() == record.sig_dual_hash
        });
        if registered.is_none() {
            let args: Vec<&str> = record.arg_types.iter().map(|a| a.as_str()).collect();
            return Err(TypedGpError::InvalidTree(format!(
                "{} has no overload {}({}) with hash {}",
                record.kind,
                record.ret_type,
                args.join(","),
                record.sig_hash
            )));
        }
        let mut node = Self {
            kind: record.kind,
            sig_hash: record.sig_hash,
            sig_dual_hash: record.sig_dual_hash,
            ret_type: record.ret_type,
            arg_types: record.arg_types,
            weight: record.weight,
            fixed: record.fixed,
            prob_change: record.prob_change,
            is_weighted: record.is_weighted,
            feature: record.feature,
            complete_hash: 0,
        };
        node.rehash();
        Ok(node)
    }
}
