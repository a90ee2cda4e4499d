use serde::{Deserialize, Serialize};
use std::fmt;

/// Every operator, terminal and constant kind. Each variant is a single bit so
/// kind classes can be tested with one mask operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u64)]
pub enum NodeKind {
    // unary elementwise
    Abs = 1 << 0,
    Acos = 1 << 1,
    Asin = 1 << 2,
    Atan = 1 << 3,
    Cos = 1 << 4,
    Cosh = 1 << 5,
    Sin = 1 << 6,
    Sinh = 1 << 7,
    Tan = 1 << 8,
    Tanh = 1 << 9,
    Ceil = 1 << 10,
    Floor = 1 << 11,
    Exp = 1 << 12,
    Log = 1 << 13,
    Logabs = 1 << 14,
    Log1p = 1 << 15,
    Sqrt = 1 << 16,
    Sqrtabs = 1 << 17,
    Square = 1 << 18,
    Logistic = 1 << 19,
    OffsetSum = 1 << 20,

    // timing masks
    Before = 1 << 21,
    After = 1 << 22,
    During = 1 << 23,

    // reducers
    Min = 1 << 24,
    Max = 1 << 25,
    Mean = 1 << 26,
    Median = 1 << 27,
    Sum = 1 << 28,
    Prod = 1 << 29,
    Count = 1 << 30,
    ArgMax = 1 << 31,

    // transformers
    Softmax = 1 << 32,

    // binary arithmetic
    Add = 1 << 33,
    Sub = 1 << 34,
    Mul = 1 << 35,
    Div = 1 << 36,
    Pow = 1 << 37,

    // logic
    And = 1 << 38,
    Or = 1 << 39,
    Not = 1 << 40,

    // decision splits
    SplitBest = 1 << 41,
    SplitOn = 1 << 42,

    // leaves
    MeanLabel = 1 << 43,
    Constant = 1 << 44,
    Terminal = 1 << 45,
}

impl NodeKind {
    pub const ALL: [NodeKind; 46] = [
        NodeKind::Abs,
        NodeKind::Acos,
        NodeKind::Asin,
        NodeKind::Atan,
        NodeKind::Cos,
        NodeKind::Cosh,
        NodeKind::Sin,
        NodeKind::Sinh,
        NodeKind::Tan,
        NodeKind::Tanh,
        NodeKind::Ceil,
        NodeKind::Floor,
        NodeKind::Exp,
        NodeKind::Log,
        NodeKind::Logabs,
        NodeKind::Log1p,
        NodeKind::Sqrt,
        NodeKind::Sqrtabs,
        NodeKind::Square,
        NodeKind::Logistic,
        NodeKind::OffsetSum,
        NodeKind::Before,
        NodeKind::After,
        NodeKind::During,
        NodeKind::Min,
        NodeKind::Max,
        NodeKind::Mean,
        NodeKind::Median,
        NodeKind::Sum,
        NodeKind::Prod,
        NodeKind::Count,
        NodeKind::ArgMax,
        NodeKind::Softmax,
        NodeKind::Add,
        NodeKind::Sub,
        NodeKind::Mul,
        NodeKind::Div,
        NodeKind::Pow,
        NodeKind::And,
        NodeKind::Or,
        NodeKind::Not,
        NodeKind::SplitBest,
        NodeKind::SplitOn,
        NodeKind::MeanLabel,
        NodeKind::Constant,
        NodeKind::Terminal,
    ];

    pub const fn bits(self) -> u64 {
        self as u64
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Abs => "Abs",
            NodeKind::Acos => "Acos",
            NodeKind::Asin => "Asin",
            NodeKind::Atan => "Atan",
            NodeKind::Cos => "Cos",
            NodeKind::Cosh => "Cosh",
            NodeKind::Sin => "Sin",
            NodeKind::Sinh => "Sinh",
            NodeKind::Tan => "Tan",
            NodeKind::Tanh => "Tanh",
            NodeKind::Ceil => "Ceil",
            NodeKind::Floor => "Floor",
            NodeKind::Exp => "Exp",
            NodeKind::Log => "Log",
            NodeKind::Logabs => "Logabs",
            NodeKind::Log1p => "Log1p",
            NodeKind::Sqrt => "Sqrt",
            NodeKind::Sqrtabs => "Sqrtabs",
            NodeKind::Square => "Square",
            NodeKind::Logistic => "Logistic",
            NodeKind::OffsetSum => "OffsetSum",
            NodeKind::Before => "Before",
            NodeKind::After => "After",
            NodeKind::During => "During",
            NodeKind::Min => "Min",
            NodeKind::Max => "Max",
            NodeKind::Mean => "Mean",
            NodeKind::Median => "Median",
            NodeKind::Sum => "Sum",
            NodeKind::Prod => "Prod",
            NodeKind::Count => "Count",
            NodeKind::ArgMax => "ArgMax",
            NodeKind::Softmax => "Softmax",
            NodeKind::Add => "Add",
            NodeKind::Sub => "Sub",
            NodeKind::Mul => "Mul",
            NodeKind::Div => "Div",
            NodeKind::Pow => "Pow",
            NodeKind::And => "And",
            NodeKind::Or => "Or",
            NodeKind::Not => "Not",
            NodeKind::SplitBest => "SplitBest",
            NodeKind::SplitOn => "SplitOn",
            NodeKind::MeanLabel => "MeanLabel",
            NodeKind::Constant => "Constant",
            NodeKind::Terminal => "Terminal",
        }
    }

    /// Case-insensitive; layered config sources may lowercase keys.
    pub fn from_name(name: &str) -> Option<NodeKind> {
        NodeKind::ALL.iter().copied().find(|k| k.name().eq_ignore_ascii_case(name))
    }

    /// Infix symbol used when rendering models, if any.
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            NodeKind::Add => Some("+"),
            NodeKind::Sub => Some("-"),
            NodeKind::Mul => Some("*"),
            NodeKind::Div => Some("/"),
            NodeKind::Pow => Some("^"),
            _ => None,
        }
    }

    pub fn is_in(self, set: KindSet) -> bool {
        set.contains(self)
    }

    pub fn is_leaf(self) -> bool {
        LEAVES.contains(self)
    }

    pub fn is_split(self) -> bool {
        SPLITS.contains(self)
    }

    /// Base cost used by `Program::complexity`.
    pub fn complexity(self) -> u64 {
        match self {
            NodeKind::Add | NodeKind::Sub | NodeKind::Sum | NodeKind::OffsetSum => 2,
            NodeKind::Mul | NodeKind::Abs | NodeKind::Square | NodeKind::Logistic => 3,
            NodeKind::Div | NodeKind::Ceil | NodeKind::Floor => 4,
            NodeKind::Exp | NodeKind::Log | NodeKind::Sqrt | NodeKind::Sqrtabs => 4,
            NodeKind::Pow => 5,
            NodeKind::Acos
            | NodeKind::Asin
            | NodeKind::Atan
            | NodeKind::Cos
            | NodeKind::Cosh
            | NodeKind::Sin
            | NodeKind::Sinh
            | NodeKind::Tan
            | NodeKind::Tanh => 5,
            NodeKind::Logabs => 12,
            NodeKind::Log1p => 8,
            NodeKind::Before | NodeKind::After | NodeKind::During => 3,
            NodeKind::Min | NodeKind::Max | NodeKind::Mean | NodeKind::Median | NodeKind::Prod => 3,
            NodeKind::Count => 3,
            NodeKind::ArgMax => 5,
            NodeKind::Softmax => 4,
            NodeKind::SplitBest | NodeKind::SplitOn => 4,
            NodeKind::And | NodeKind::Or | NodeKind::Not => 2,
            NodeKind::MeanLabel | NodeKind::Constant => 1,
            NodeKind::Terminal => 2,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of node kinds packed into one bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet(u64);

impl KindSet {
    pub const EMPTY: KindSet = KindSet(0);

    pub const fn of(kinds: &[NodeKind]) -> KindSet {
        let mut bits = 0u64;
        let mut i = 0;
        while i < kinds.len() {
            bits |= kinds[i] as u64;
            i += 1;
        }
        KindSet(bits)
    }

    pub const fn contains(self, kind: NodeKind) -> bool {
        self.0 & (kind as u64) != 0
    }

    pub const fn union(self, other: KindSet) -> KindSet {
        KindSet(self.0 | other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = NodeKind> {
        NodeKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

pub const LEAVES: KindSet = KindSet::of(&[NodeKind::Terminal, NodeKind::Constant, NodeKind::MeanLabel]);

pub const SPLITS: KindSet = KindSet::of(&[NodeKind::SplitBest, NodeKind::SplitOn]);

pub const UNARY_MATH: KindSet = KindSet::of(&[
    NodeKind::Abs,
    NodeKind::Acos,
    NodeKind::Asin,
    NodeKind::Atan,
    NodeKind::Cos,
    NodeKind::Cosh,
    NodeKind::Sin,
    NodeKind::Sinh,
    NodeKind::Tan,
    NodeKind::Tanh,
    NodeKind::Ceil,
    NodeKind::Floor,
    NodeKind::Exp,
    NodeKind::Log,
    NodeKind::Logabs,
    NodeKind::Log1p,
    NodeKind::Sqrt,
    NodeKind::Sqrtabs,
    NodeKind::Square,
    NodeKind::Logistic,
]);

pub const BINARY_MATH: KindSet = KindSet::of(&[
    NodeKind::Add,
    NodeKind::Sub,
    NodeKind::Mul,
    NodeKind::Div,
    NodeKind::Pow,
]);

pub const TIMING: KindSet = KindSet::of(&[NodeKind::Before, NodeKind::After, NodeKind::During]);

pub const REDUCERS: KindSet = KindSet::of(&[
    NodeKind::Min,
    NodeKind::Max,
    NodeKind::Mean,
    NodeKind::Median,
    NodeKind::Sum,
    NodeKind::Prod,
]);

pub const LOGIC: KindSet = KindSet::of(&[NodeKind::And, NodeKind::Or, NodeKind::Not]);

/// Kinds that carry a weight no matter what.
pub const ALWAYS_WEIGHTED: KindSet = KindSet::of(&[NodeKind::OffsetSum, NodeKind::Constant, NodeKind::MeanLabel]);

/// Kinds whose output is never scaled.
pub const NEVER_WEIGHTED: KindSet = KindSet::of(&[
    NodeKind::Ceil,
    NodeKind::Floor,
    NodeKind::Before,
    NodeKind::After,
    NodeKind::During,
    NodeKind::Count,
    NodeKind::ArgMax,
    NodeKind::Softmax,
    NodeKind::SplitBest,
    NodeKind::SplitOn,
    NodeKind::And,
    NodeKind::Or,
    NodeKind::Not,
]);

pub const COMMUTATIVE: KindSet = KindSet::of(&[NodeKind::Add, NodeKind::Mul, NodeKind::Min, NodeKind::Max]);
