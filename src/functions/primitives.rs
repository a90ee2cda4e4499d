use super::nodetype::{NodeKind, REDUCERS, TIMING};
use crate::error::{Result, TypedGpError};
use crate::types::{Matrix, TimeSeries, Value, ValueKind};

fn mismatch(kind: NodeKind, args: &[Value]) -> TypedGpError {
    let actual: Vec<&str> = args.iter().map(|a| a.kind().as_str()).collect();
    TypedGpError::TypeMismatch {
        expected: format!("a registered signature of {}", kind),
        actual: format!("({})", actual.join(",")),
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Scalar semantics of the unary elementwise kinds.
pub fn unary_fn(kind: NodeKind) -> Option<fn(f64) -> f64> {
    let f: fn(f64) -> f64 = match kind {
        NodeKind::Abs => f64::abs,
        NodeKind::Acos => f64::acos,
        NodeKind::Asin => f64::asin,
        NodeKind::Atan => f64::atan,
        NodeKind::Cos => f64::cos,
        NodeKind::Cosh => f64::cosh,
        NodeKind::Sin => f64::sin,
        NodeKind::Sinh => f64::sinh,
        NodeKind::Tan => f64::tan,
        NodeKind::Tanh => f64::tanh,
        NodeKind::Ceil => f64::ceil,
        NodeKind::Floor => f64::floor,
        NodeKind::Exp => f64::exp,
        NodeKind::Log => f64::ln,
        NodeKind::Logabs => |x| x.abs().ln(),
        NodeKind::Log1p => f64::ln_1p,
        NodeKind::Sqrt => f64::sqrt,
        NodeKind::Sqrtabs => |x| x.abs().sqrt(),
        NodeKind::Square => |x| x * x,
        NodeKind::Logistic => logistic,
        NodeKind::OffsetSum => |x| x,
        _ => return None,
    };
    Some(f)
}

pub fn binary_fn(kind: NodeKind) -> Option<fn(f64, f64) -> f64> {
    let f: fn(f64, f64) -> f64 = match kind {
        NodeKind::Add => |a, b| a + b,
        NodeKind::Sub => |a, b| a - b,
        NodeKind::Mul => |a, b| a * b,
        NodeKind::Div => |a, b| a / b,
        NodeKind::Pow => f64::powf,
        _ => return None,
    };
    Some(f)
}

/// Folds one row of values for a reducer kind.
pub fn reduce(kind: NodeKind, xs: &[f64]) -> f64 {
    match kind {
        NodeKind::Sum => xs.iter().sum(),
        NodeKind::Prod => xs.iter().product(),
        _ if xs.is_empty() => f64::NAN,
        NodeKind::Min => xs.iter().copied().fold(f64::INFINITY, f64::min),
        NodeKind::Max => xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        NodeKind::Mean => xs.iter().sum::<f64>() / xs.len() as f64,
        NodeKind::Median => {
            let mut sorted = xs.to_vec();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            } else {
                sorted[mid]
            }
        }
        _ => f64::NAN,
    }
}

fn reduce_int(kind: NodeKind, xs: &[i64]) -> i64 {
    match kind {
        NodeKind::Min => xs.iter().copied().min().unwrap_or(0),
        _ => xs.iter().copied().max().unwrap_or(0),
    }
}

fn argmax<T: PartialOrd + Copy>(row: &[T]) -> i64 {
    let mut best = 0;
    for (i, v) in row.iter().enumerate() {
        if *v > row[best] {
            best = i;
        }
    }
    best as i64
}

fn softmax_rows(m: &Matrix<f64>) -> Result<Matrix<f64>> {
    let mut data = Vec::with_capacity(m.values().len());
    for row in m.row_iter() {
        let top = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = row.iter().map(|x| (x - top).exp()).collect();
        let total: f64 = exps.iter().sum();
        data.extend(exps.into_iter().map(|e| e / total));
    }
    Matrix::new(m.rows(), m.cols(), data)
}

fn per_row<T: Copy>(args: &[Value], pick: fn(&Value) -> Option<&Vec<T>>) -> Option<Vec<Vec<T>>> {
    let columns: Vec<&Vec<T>> = args.iter().map(pick).collect::<Option<_>>()?;
    let rows = columns.first().map(|c| c.len()).unwrap_or(0);
    if columns.iter().any(|c| c.len() != rows) {
        return None;
    }
    Some((0..rows).map(|i| columns.iter().map(|c| c[i]).collect()).collect())
}

fn array_f(v: &Value) -> Option<&Vec<f64>> {
    match v {
        Value::ArrayF(x) => Some(x),
        _ => None,
    }
}

fn timing<T: Clone>(kind: NodeKind, a: &TimeSeries<T>, b: &TimeSeries<T>) -> TimeSeries<T> {
    let bounds: Vec<(i64, i64)> = b
        .time
        .iter()
        .map(|ts| {
            let lo = ts.iter().copied().min().unwrap_or(i64::MAX);
            let hi = ts.iter().copied().max().unwrap_or(i64::MIN);
            (lo, hi)
        })
        .collect();
    a.filter_by_time(|i, t| {
        let (lo, hi) = bounds.get(i).copied().unwrap_or((i64::MAX, i64::MIN));
        match kind {
            NodeKind::Before => t < lo,
            NodeKind::After => t > hi,
            _ => lo <= t && t <= hi,
        }
    })
}

/// Applies an operator to already-evaluated children.
///
/// Leaves and split kinds are handled by the evaluator, not here.
pub fn apply(kind: NodeKind, args: &[Value], ret: ValueKind) -> Result<Value> {
    let out = if let Some(f) = unary_fn(kind) {
        match args {
            [Value::ArrayF(x)] => Value::ArrayF(x.iter().map(|v| f(*v)).collect()),
            [Value::MatrixF(m)] => Value::MatrixF(m.map(|v| f(*v))),
            _ => return Err(mismatch(kind, args)),
        }
    } else if let Some(f) = binary_fn(kind) {
        match args {
            [Value::ArrayF(a), Value::ArrayF(b)] if a.len() == b.len() => {
                Value::ArrayF(a.iter().zip(b).map(|(x, y)| f(*x, *y)).collect())
            }
            [Value::MatrixF(a), Value::MatrixF(b)] => Value::MatrixF(a.zip_with(b, |x, y| f(*x, *y))?),
            _ => return Err(mismatch(kind, args)),
        }
    } else if TIMING.contains(kind) {
        match args {
            [Value::TimeSeriesF(a), Value::TimeSeriesF(b)] => Value::TimeSeriesF(timing(kind, a, b)),
            [Value::TimeSeriesI(a), Value::TimeSeriesI(b)] => Value::TimeSeriesI(timing(kind, a, b)),
            [Value::TimeSeriesB(a), Value::TimeSeriesB(b)] => Value::TimeSeriesB(timing(kind, a, b)),
            _ => return Err(mismatch(kind, args)),
        }
    } else if REDUCERS.contains(kind) {
        match args {
            [Value::MatrixF(m)] => Value::ArrayF(m.row_iter().map(|r| reduce(kind, r)).collect()),
            [Value::MatrixI(m)] if matches!(kind, NodeKind::Min | NodeKind::Max) => {
                Value::ArrayI(m.row_iter().map(|r| reduce_int(kind, r)).collect())
            }
            [Value::TimeSeriesF(ts)] => Value::ArrayF(ts.value.iter().map(|r| reduce(kind, r)).collect()),
            _ => {
                let rows = per_row(args, array_f).ok_or_else(|| mismatch(kind, args))?;
                Value::ArrayF(rows.iter().map(|r| reduce(kind, r)).collect())
            }
        }
    } else {
        match (kind, args) {
            (NodeKind::And, [Value::ArrayB(a), Value::ArrayB(b)]) => {
                Value::ArrayB(a.iter().zip(b).map(|(x, y)| *x && *y).collect())
            }
            (NodeKind::And, [Value::MatrixB(a), Value::MatrixB(b)]) => Value::MatrixB(a.zip_with(b, |x, y| *x && *y)?),
            (NodeKind::Or, [Value::ArrayB(a), Value::ArrayB(b)]) => {
                Value::ArrayB(a.iter().zip(b).map(|(x, y)| *x || *y).collect())
            }
            (NodeKind::Or, [Value::MatrixB(a), Value::MatrixB(b)]) => Value::MatrixB(a.zip_with(b, |x, y| *x || *y)?),
            (NodeKind::Not, [Value::ArrayB(a)]) => Value::ArrayB(a.iter().map(|x| !x).collect()),
            (NodeKind::Not, [Value::MatrixB(a)]) => Value::MatrixB(a.map(|x| !x)),
            (NodeKind::Count, [Value::TimeSeriesF(ts)]) => Value::ArrayF(ts.value.iter().map(|r| r.len() as f64).collect()),
            (NodeKind::Count, [Value::TimeSeriesI(ts)]) => Value::ArrayF(ts.value.iter().map(|r| r.len() as f64).collect()),
            (NodeKind::Count, [Value::TimeSeriesB(ts)]) => Value::ArrayF(ts.value.iter().map(|r| r.len() as f64).collect()),
            (NodeKind::Count, [Value::MatrixB(m)]) => {
                Value::ArrayF(m.row_iter().map(|r| r.iter().filter(|b| **b).count() as f64).collect())
            }
            (NodeKind::ArgMax, [Value::MatrixF(m)]) => Value::ArrayI(m.row_iter().map(argmax).collect()),
            (NodeKind::ArgMax, [Value::MatrixI(m)]) => Value::ArrayI(m.row_iter().map(argmax).collect()),
            (NodeKind::Softmax, [Value::MatrixF(m)]) => Value::MatrixF(softmax_rows(m)?),
            (NodeKind::Softmax, _) => {
                let rows = per_row(args, array_f).ok_or_else(|| mismatch(kind, args))?;
                Value::MatrixF(softmax_rows(&Matrix::from_rows(rows)?)?)
            }
            _ => return Err(mismatch(kind, args)),
        }
    };

    if out.kind() != ret {
        return Err(TypedGpError::TypeMismatch {
            expected: ret.to_string(),
            actual: out.kind().to_string(),
        });
    }
    Ok(out)
}

/// Scales a floating output by a node weight.
pub fn scale(value: Value, w: f64) -> Value {
    match value {
        Value::ArrayF(v) => Value::ArrayF(v.into_iter().map(|x| x * w).collect()),
        Value::MatrixF(m) => Value::MatrixF(m.map(|x| x * w)),
        other => other,
    }
}

/// Shifts a floating output by a node weight.
pub fn offset(value: Value, w: f64) -> Value {
    match value {
        Value::ArrayF(v) => Value::ArrayF(v.into_iter().map(|x| x + w).collect()),
        Value::MatrixF(m) => Value::MatrixF(m.map(|x| x + w)),
        other => other,
    }
}
