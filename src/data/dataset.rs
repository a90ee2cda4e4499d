use crate::error::{Result, TypedGpError};
use crate::types::{Value, ValueKind};
use std::collections::BTreeMap;

/// Named, typed feature columns plus a target vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: BTreeMap<String, Value>,
    pub y: Vec<f64>,
    pub classification: bool,
    n_samples: usize,
    features_of_type: BTreeMap<ValueKind, Vec<String>>,
    unique_data_types: Vec<ValueKind>,
}

impl Dataset {
    pub fn new(features: Vec<(String, Value)>, y: Vec<f64>, classification: bool) -> Result<Self> {
        let n_samples = features
            .first()
            .map(|(_, v)| v.len())
            .unwrap_or(y.len());

        let mut map = BTreeMap::new();
        for (name, value) in features {
            if value.len() != n_samples {
                return Err(TypedGpError::Dataset(format!(
                    "Feature '{}' has {} rows, expected {}",
                    name,
                    value.len(),
                    n_samples
                )));
            }
            if map.insert(name.clone(), value).is_some() {
                return Err(TypedGpError::Dataset(format!("Duplicate feature '{}'", name)));
            }
        }
        if !y.is_empty() && y.len() != n_samples {
            return Err(TypedGpError::Dataset(format!(
                "Target has {} rows, features have {}",
                y.len(),
                n_samples
            )));
        }

        Ok(Self::assemble(map, y, classification, n_samples))
    }

    fn assemble(
        features: BTreeMap<String, Value>,
        y: Vec<f64>,
        classification: bool,
        n_samples: usize,
    ) -> Self {
        let mut features_of_type: BTreeMap<ValueKind, Vec<String>> = BTreeMap::new();
        for (name, value) in &features {
            features_of_type
                .entry(value.kind())
                .or_default()
                .push(name.clone());
        }
        let unique_data_types = features_of_type.keys().copied().collect();
        Self {
            features,
            y,
            classification,
            n_samples,
            features_of_type,
            unique_data_types,
        }
    }

    /// Builds a dataset from float columns, narrowing each column to the
    /// tightest type: only 0/1 values become booleans, integral values integers.
    pub fn from_matrix(columns: &[Vec<f64>], names: &[String], y: Vec<f64>, classification: bool) -> Result<Self> {
        if columns.len() != names.len() {
            return Err(TypedGpError::Dataset(format!(
                "{} columns but {} names",
                columns.len(),
                names.len()
            )));
        }
        let features = names
            .iter()
            .zip(columns)
            .map(|(name, col)| (name.clone(), infer_value(col)))
            .collect();
        Self::new(features, y, classification)
    }

    pub fn get(&self, name: &str) -> Result<&Value> {
        self.features
            .get(name)
            .ok_or_else(|| TypedGpError::FeatureNotFound(name.to_string()))
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(|k| k.as_str())
    }

    pub fn features(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.features.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn features_of_type(&self, kind: ValueKind) -> &[String] {
        self.features_of_type
            .get(&kind)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn unique_data_types(&self) -> &[ValueKind] {
        &self.unique_data_types
    }

    /// Distinct target values, sorted.
    pub fn classes(&self) -> Vec<f64> {
        let mut classes = self.y.clone();
        classes.sort_by(|a, b| a.total_cmp(b));
        classes.dedup();
        classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes().len()
    }

    /// Partitions rows by `mask`: rows where it is true go left.
    pub fn split(&self, mask: &[bool]) -> (Dataset, Dataset) {
        let left: Vec<usize> = (0..mask.len()).filter(|&i| mask[i]).collect();
        let right: Vec<usize> = (0..mask.len()).filter(|&i| !mask[i]).collect();
        (self.select(&left), self.select(&right))
    }

    pub fn select(&self, indices: &[usize]) -> Dataset {
        let features = self
            .features
            .iter()
            .map(|(k, v)| (k.clone(), v.select_rows(indices)))
            .collect();
        let y = if self.y.is_empty() {
            Vec::new()
        } else {
            indices.iter().map(|&i| self.y[i]).collect()
        };
        Self::assemble(features, y, self.classification, indices.len())
    }
}

fn infer_value(col: &[f64]) -> Value {
    if col.iter().all(|v| *v == 0.0 || *v == 1.0) {
        Value::ArrayB(col.iter().map(|v| *v == 1.0).collect())
    } else if col.iter().all(|v| v.is_finite() && v.fract() == 0.0) {
        Value::ArrayI(col.iter().map(|v| *v as i64).collect())
    } else {
        Value::ArrayF(col.to_vec())
    }
}
