use crate::error::{Result, TypedGpError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of value types a node can consume or produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKind {
    ArrayB,
    ArrayI,
    ArrayF,
    MatrixB,
    MatrixI,
    MatrixF,
    TimeSeriesB,
    TimeSeriesI,
    TimeSeriesF,
}

impl ValueKind {
    pub const ALL: [ValueKind; 9] = [
        ValueKind::ArrayB,
        ValueKind::ArrayI,
        ValueKind::ArrayF,
        ValueKind::MatrixB,
        ValueKind::MatrixI,
        ValueKind::MatrixF,
        ValueKind::TimeSeriesB,
        ValueKind::TimeSeriesI,
        ValueKind::TimeSeriesF,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArrayB => "ArrayB",
            Self::ArrayI => "ArrayI",
            Self::ArrayF => "ArrayF",
            Self::MatrixB => "MatrixB",
            Self::MatrixI => "MatrixI",
            Self::MatrixF => "MatrixF",
            Self::TimeSeriesB => "TimeSeriesB",
            Self::TimeSeriesI => "TimeSeriesI",
            Self::TimeSeriesF => "TimeSeriesF",
        }
    }

    /// Only floating outputs can be scaled by a node weight.
    pub fn is_weighable(&self) -> bool {
        matches!(self, Self::ArrayF | Self::MatrixF)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::ArrayB | Self::ArrayI | Self::ArrayF)
    }

    pub(crate) fn tag(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row-major table with one row per sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone> Matrix<T> {
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if rows * cols != data.len() {
            return Err(TypedGpError::Dataset(format!(
                "Matrix of {}x{} cannot hold {} values",
                rows,
                cols,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let n_rows = rows.len();
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(TypedGpError::Dataset("Ragged matrix rows".to_string()));
        }
        let data = rows.into_iter().flatten().collect();
        Ok(Self {
            rows: n_rows,
            cols,
            data,
        })
    }

    /// Stacks equally long columns side by side.
    pub fn from_columns(columns: &[Vec<T>]) -> Result<Self> {
        let cols = columns.len();
        let rows = columns.first().map(|c| c.len()).unwrap_or(0);
        if columns.iter().any(|c| c.len() != rows) {
            return Err(TypedGpError::Dataset("Columns differ in length".to_string()));
        }
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for column in columns {
                data.push(column[i].clone());
            }
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_iter(&self) -> impl Iterator<Item = &[T]> {
        (0..self.rows).map(move |i| self.row(i))
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }

    pub fn map<U, F: Fn(&T) -> U>(&self, f: F) -> Matrix<U> {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    pub fn zip_with<U, F: Fn(&T, &T) -> U>(&self, other: &Matrix<T>, f: F) -> Result<Matrix<U>> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(TypedGpError::Dataset(format!(
                "Matrix shapes differ: {}x{} vs {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| f(a, b))
                .collect(),
        })
    }

    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }
}

/// Per-sample sequences of time-stamped observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries<T> {
    pub time: Vec<Vec<i64>>,
    pub value: Vec<Vec<T>>,
}

impl<T: Clone> TimeSeries<T> {
    pub fn new(time: Vec<Vec<i64>>, value: Vec<Vec<T>>) -> Result<Self> {
        if time.len() != value.len() || time.iter().zip(&value).any(|(t, v)| t.len() != v.len()) {
            return Err(TypedGpError::Dataset(
                "Time stamps and values must have the same shape".to_string(),
            ));
        }
        Ok(Self { time, value })
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            time: indices.iter().map(|&i| self.time[i].clone()).collect(),
            value: indices.iter().map(|&i| self.value[i].clone()).collect(),
        }
    }

    /// Keeps the observations whose time stamp satisfies `keep`, per sample.
    pub fn filter_by_time<F: Fn(usize, i64) -> bool>(&self, keep: F) -> Self {
        let mut time = Vec::with_capacity(self.len());
        let mut value = Vec::with_capacity(self.len());
        for (i, (ts, vs)) in self.time.iter().zip(&self.value).enumerate() {
            let (t, v): (Vec<i64>, Vec<T>) = ts
                .iter()
                .zip(vs)
                .filter(|(t, _)| keep(i, **t))
                .map(|(t, v)| (*t, v.clone()))
                .unzip();
            time.push(t);
            value.push(v);
        }
        Self { time, value }
    }
}

/// A runtime value produced by evaluating a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    ArrayB(Vec<bool>),
    ArrayI(Vec<i64>),
    ArrayF(Vec<f64>),
    MatrixB(Matrix<bool>),
    MatrixI(Matrix<i64>),
    MatrixF(Matrix<f64>),
    TimeSeriesB(TimeSeries<bool>),
    TimeSeriesI(TimeSeries<i64>),
    TimeSeriesF(TimeSeries<f64>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::ArrayB(_) => ValueKind::ArrayB,
            Value::ArrayI(_) => ValueKind::ArrayI,
            Value::ArrayF(_) => ValueKind::ArrayF,
            Value::MatrixB(_) => ValueKind::MatrixB,
            Value::MatrixI(_) => ValueKind::MatrixI,
            Value::MatrixF(_) => ValueKind::MatrixF,
            Value::TimeSeriesB(_) => ValueKind::TimeSeriesB,
            Value::TimeSeriesI(_) => ValueKind::TimeSeriesI,
            Value::TimeSeriesF(_) => ValueKind::TimeSeriesF,
        }
    }

    /// Number of sample rows.
    pub fn len(&self) -> usize {
        match self {
            Value::ArrayB(v) => v.len(),
            Value::ArrayI(v) => v.len(),
            Value::ArrayF(v) => v.len(),
            Value::MatrixB(m) => m.rows(),
            Value::MatrixI(m) => m.rows(),
            Value::MatrixF(m) => m.rows(),
            Value::TimeSeriesB(ts) => ts.len(),
            Value::TimeSeriesI(ts) => ts.len(),
            Value::TimeSeriesF(ts) => ts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A zero-row value of the given kind.
    pub fn empty(kind: ValueKind) -> Value {
        match kind {
            ValueKind::ArrayB => Value::ArrayB(Vec::new()),
            ValueKind::ArrayI => Value::ArrayI(Vec::new()),
            ValueKind::ArrayF => Value::ArrayF(Vec::new()),
            ValueKind::MatrixB => Value::MatrixB(Matrix { rows: 0, cols: 0, data: Vec::new() }),
            ValueKind::MatrixI => Value::MatrixI(Matrix { rows: 0, cols: 0, data: Vec::new() }),
            ValueKind::MatrixF => Value::MatrixF(Matrix { rows: 0, cols: 0, data: Vec::new() }),
            ValueKind::TimeSeriesB => Value::TimeSeriesB(TimeSeries { time: Vec::new(), value: Vec::new() }),
            ValueKind::TimeSeriesI => Value::TimeSeriesI(TimeSeries { time: Vec::new(), value: Vec::new() }),
            ValueKind::TimeSeriesF => Value::TimeSeriesF(TimeSeries { time: Vec::new(), value: Vec::new() }),
        }
    }

    pub fn select_rows(&self, indices: &[usize]) -> Value {
        match self {
            Value::ArrayB(v) => Value::ArrayB(indices.iter().map(|&i| v[i]).collect()),
            Value::ArrayI(v) => Value::ArrayI(indices.iter().map(|&i| v[i]).collect()),
            Value::ArrayF(v) => Value::ArrayF(indices.iter().map(|&i| v[i]).collect()),
            Value::MatrixB(m) => Value::MatrixB(m.select_rows(indices)),
            Value::MatrixI(m) => Value::MatrixI(m.select_rows(indices)),
            Value::MatrixF(m) => Value::MatrixF(m.select_rows(indices)),
            Value::TimeSeriesB(ts) => Value::TimeSeriesB(ts.select_rows(indices)),
            Value::TimeSeriesI(ts) => Value::TimeSeriesI(ts.select_rows(indices)),
            Value::TimeSeriesF(ts) => Value::TimeSeriesF(ts.select_rows(indices)),
        }
    }

    /// Interleaves two partition outputs back into original row order.
    /// Rows where `mask` is true are taken from `left`, the rest from `right`.
    pub fn stitch(left: Value, right: Value, mask: &[bool]) -> Result<Value> {
        fn merge<T: Clone>(l: Vec<T>, r: Vec<T>, mask: &[bool]) -> Result<Vec<T>> {
            let expected_left = mask.iter().filter(|m| **m).count();
            if l.len() != expected_left || r.len() != mask.len() - expected_left {
                return Err(TypedGpError::Dataset(format!(
                    "Cannot stitch partitions of {} and {} rows into {} rows",
                    l.len(),
                    r.len(),
                    mask.len()
                )));
            }
            let mut li = l.into_iter();
            let mut ri = r.into_iter();
            Ok(mask
                .iter()
                .filter_map(|&m| if m { li.next() } else { ri.next() })
                .collect())
        }

        match (left, right) {
            (Value::ArrayF(l), Value::ArrayF(r)) => Ok(Value::ArrayF(merge(l, r, mask)?)),
            (Value::ArrayI(l), Value::ArrayI(r)) => Ok(Value::ArrayI(merge(l, r, mask)?)),
            (Value::ArrayB(l), Value::ArrayB(r)) => Ok(Value::ArrayB(merge(l, r, mask)?)),
            (l, r) => Err(TypedGpError::TypeMismatch {
                expected: "matching array partitions".to_string(),
                actual: format!("{} and {}", l.kind(), r.kind()),
            }),
        }
    }

    /// Numeric view of a sequence value; booleans map to 0/1.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Value::ArrayF(v) => Some(v.clone()),
            Value::ArrayI(v) => Some(v.iter().map(|&x| x as f64).collect()),
            Value::ArrayB(v) => Some(v.iter().map(|&x| if x { 1.0 } else { 0.0 }).collect()),
            _ => None,
        }
    }

    pub fn as_array_f(&self) -> Option<&[f64]> {
        match self {
            Value::ArrayF(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_matrix_f(&self) -> Option<&Matrix<f64>> {
        match self {
            Value::MatrixF(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stitch_restores_row_order() {
        let mask = vec![true, false, true, false];
        let left = Value::ArrayF(vec![1.0, 3.0]);
        let right = Value::ArrayF(vec![2.0, 4.0]);
        let out = Value::stitch(left, right, &mask).unwrap();
        assert_eq!(out, Value::ArrayF(vec![1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_stitch_rejects_wrong_partition_sizes() {
        let mask = vec![true, true, false];
        let left = Value::ArrayI(vec![1]);
        let right = Value::ArrayI(vec![2, 3]);
        assert!(Value::stitch(left, right, &mask).is_err());
    }

    #[test]
    fn test_matrix_from_columns_is_row_major() {
        let m = Matrix::from_columns(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.row(0), &[1.0, 3.0]);
        assert_eq!(m.row(1), &[2.0, 4.0]);
    }

    #[test]
    fn test_time_series_filter_keeps_shape() {
        let ts = TimeSeries::new(vec![vec![1, 2, 3], vec![5]], vec![vec![0.1, 0.2, 0.3], vec![0.5]]).unwrap();
        let filtered = ts.filter_by_time(|_, t| t >= 2);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.value[0], vec![0.2, 0.3]);
        assert_eq!(filtered.time[1], vec![5]);
    }
}
