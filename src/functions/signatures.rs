use super::nodetype::{NodeKind, BINARY_MATH, REDUCERS, TIMING, UNARY_MATH};
use crate::types::ValueKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest arity of the n-ary signature families.
pub const MAX_NARY_ARGS: usize = 4;

/// Largest arity of any registered signature.
pub const MAX_ARITY: usize = 4;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const DUAL_MARKER: u8 = 0xd1;

/// Stable FNV-1a hash, identical across processes and platforms.
pub(crate) fn fnv1a(bytes: impl IntoIterator<Item = u8>) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Return type plus ordered argument types of one operator overload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub ret: ValueKind,
    pub args: Vec<ValueKind>,
}

impl Signature {
    pub fn new(ret: ValueKind, args: Vec<ValueKind>) -> Self {
        Self { ret, args }
    }

    pub fn leaf(ret: ValueKind) -> Self {
        Self { ret, args: Vec::new() }
    }

    pub fn nary(ret: ValueKind, arg: ValueKind, n: usize) -> Self {
        Self { ret, args: vec![arg; n] }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
        std::iter::once(self.ret.tag())
            .chain(std::iter::once(self.args.len() as u8))
            .chain(self.args.iter().map(|a| a.tag()))
    }

    pub fn hash(&self) -> u64 {
        fnv1a(self.bytes())
    }

    /// Hash of the differentiable twin used when evaluating with external weights.
    pub fn dual_hash(&self) -> u64 {
        fnv1a(std::iter::once(DUAL_MARKER).chain(self.bytes()))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<&str> = self.args.iter().map(|a| a.as_str()).collect();
        write!(f, "{}({})", self.ret, args.join(","))
    }
}

fn nary_family(ret: ValueKind, arg: ValueKind) -> impl Iterator<Item = Signature> {
    (2..=MAX_NARY_ARGS).map(move |n| Signature::nary(ret, arg, n))
}

/// Every registered overload of `kind`.
pub fn signatures(kind: NodeKind) -> Vec<Signature> {
    use ValueKind::*;

    let s = Signature::new;

    if UNARY_MATH.contains(kind) {
        return vec![s(ArrayF, vec![ArrayF]), s(MatrixF, vec![MatrixF])];
    }
    if BINARY_MATH.contains(kind) {
        return vec![s(ArrayF, vec![ArrayF, ArrayF]), s(MatrixF, vec![MatrixF, MatrixF])];
    }
    if TIMING.contains(kind) {
        return vec![
            s(TimeSeriesF, vec![TimeSeriesF, TimeSeriesF]),
            s(TimeSeriesI, vec![TimeSeriesI, TimeSeriesI]),
            s(TimeSeriesB, vec![TimeSeriesB, TimeSeriesB]),
        ];
    }

    match kind {
        NodeKind::Terminal => ValueKind::ALL.iter().map(|k| Signature::leaf(*k)).collect(),
        NodeKind::Constant => vec![Signature::leaf(ArrayF), Signature::leaf(ArrayI), Signature::leaf(ArrayB)],
        NodeKind::MeanLabel => vec![Signature::leaf(ArrayF)],
        NodeKind::OffsetSum => vec![s(ArrayF, vec![ArrayF])],
        NodeKind::And | NodeKind::Or => {
            vec![s(ArrayB, vec![ArrayB, ArrayB]), s(MatrixB, vec![MatrixB, MatrixB])]
        }
        NodeKind::Not => vec![s(ArrayB, vec![ArrayB]), s(MatrixB, vec![MatrixB])],
        NodeKind::Min | NodeKind::Max => {
            let mut sigs = vec![
                s(ArrayF, vec![MatrixF]),
                s(ArrayI, vec![MatrixI]),
                s(ArrayF, vec![TimeSeriesF]),
            ];
            sigs.extend(nary_family(ArrayF, ArrayF));
            sigs
        }
        k if REDUCERS.contains(k) => {
            let mut sigs = vec![s(ArrayF, vec![MatrixF]), s(ArrayF, vec![TimeSeriesF])];
            sigs.extend(nary_family(ArrayF, ArrayF));
            sigs
        }
        NodeKind::Count => vec![
            s(ArrayF, vec![TimeSeriesF]),
            s(ArrayF, vec![TimeSeriesI]),
            s(ArrayF, vec![TimeSeriesB]),
            s(ArrayF, vec![MatrixB]),
        ],
        NodeKind::ArgMax => vec![s(ArrayI, vec![MatrixF]), s(ArrayI, vec![MatrixI])],
        NodeKind::Softmax => {
            let mut sigs = vec![s(MatrixF, vec![MatrixF])];
            sigs.extend(nary_family(MatrixF, ArrayF));
            sigs
        }
        NodeKind::SplitBest => vec![
            s(ArrayF, vec![ArrayF, ArrayF]),
            s(ArrayI, vec![ArrayI, ArrayI]),
            s(ArrayB, vec![ArrayB, ArrayB]),
        ],
        NodeKind::SplitOn => vec![
            s(ArrayF, vec![ArrayF, ArrayF, ArrayF]),
            s(ArrayF, vec![ArrayI, ArrayF, ArrayF]),
            s(ArrayF, vec![ArrayB, ArrayF, ArrayF]),
            s(ArrayI, vec![ArrayF, ArrayI, ArrayI]),
            s(ArrayI, vec![ArrayI, ArrayI, ArrayI]),
            s(ArrayI, vec![ArrayB, ArrayI, ArrayI]),
        ],
        // class checks above cover the remaining kinds
        _ => Vec::new(),
    }
}

/// Looks up the overload of `kind` whose hash is `sig_hash`.
pub fn find_signature(kind: NodeKind, sig_hash: u64) -> Option<Signature> {
    signatures(kind).into_iter().find(|s| s.hash() == sig_hash)
}
