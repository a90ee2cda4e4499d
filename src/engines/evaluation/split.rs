use crate::data::Dataset;
use crate::error::{Result, TypedGpError};
use crate::types::{Value, ValueKind};
use crate::utils::stats::{gini, unique, variance};

/// Feature types a split may partition on, in scan order.
pub const SPLITTABLE: [ValueKind; 3] = [ValueKind::ArrayF, ValueKind::ArrayI, ValueKind::ArrayB];

/// Rows where the returned mask is true go to the first branch.
pub fn threshold_mask(x: &Value, threshold: f64) -> Result<Vec<bool>> {
    match x {
        Value::ArrayF(v) => Ok(v.iter().map(|a| *a > threshold).collect()),
        Value::ArrayI(v) => Ok(v.iter().map(|a| *a as f64 == threshold).collect()),
        Value::ArrayB(v) => Ok(v.clone()),
        other => Err(TypedGpError::TypeMismatch {
            expected: "ArrayF, ArrayI or ArrayB split feature".to_string(),
            actual: other.kind().to_string(),
        }),
    }
}

fn candidate_thresholds(x: &Value) -> Vec<f64> {
    match x {
        Value::ArrayF(v) => {
            let u = unique(v);
            u.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
        }
        Value::ArrayI(v) => {
            let as_f: Vec<f64> = v.iter().map(|a| *a as f64).collect();
            unique(&as_f)
        }
        Value::ArrayB(_) => vec![0.0],
        _ => Vec::new(),
    }
}

/// Impurity of a partition; lower is better.
pub fn split_score(left: &[f64], right: &[f64], classification: bool, classes: &[f64]) -> f64 {
    if classification {
        let n = (left.len() + right.len()) as f64;
        (left.len() as f64 * gini(left, classes) + right.len() as f64 * gini(right, classes)) / n
    } else {
        variance(left) / left.len() as f64 + variance(right) / right.len() as f64
    }
}

fn partition(y: &[f64], mask: &[bool]) -> (Vec<f64>, Vec<f64>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for (v, m) in y.iter().zip(mask) {
        if *m {
            left.push(*v);
        } else {
            right.push(*v);
        }
    }
    (left, right)
}

/// Best `(threshold, score)` for splitting `y` on `x`, skipping thresholds
/// that leave one side empty.
pub fn best_threshold(x: &Value, y: &[f64], classification: bool) -> Option<(f64, f64)> {
    let classes = if classification { unique(y) } else { Vec::new() };
    let mut best: Option<(f64, f64)> = None;

    for threshold in candidate_thresholds(x) {
        let mask = threshold_mask(x, threshold).ok()?;
        let (left, right) = partition(y, &mask);
        if left.is_empty() || right.is_empty() {
            continue;
        }
        let score = split_score(&left, &right, classification, &classes);
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, s)| score < s) {
            best = Some((threshold, score));
        }
    }

    best.map(|(t, s)| (if t.is_finite() { t } else { 0.0 }, s))
}

/// Scans every splittable feature and returns `(feature, threshold)` with the lowest score.
pub fn best_split(d: &Dataset) -> Option<(String, f64)> {
    let mut best: Option<(String, f64, f64)> = None;
    for kind in SPLITTABLE {
        for name in d.features_of_type(kind) {
            let Ok(x) = d.get(name) else { continue };
            if let Some((threshold, score)) = best_threshold(x, &d.y, d.classification) {
                if best.as_ref().map_or(true, |(_, _, s)| score < *s) {
                    best = Some((name.clone(), threshold, score));
                }
            }
        }
    }
    best.map(|(name, threshold, _)| (name, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_threshold_is_midpoint() {
        let x = Value::ArrayF(vec![1.0, 2.0, 3.0, 4.0]);
        let y = vec![0.0, 0.0, 1.0, 1.0];
        let (t, score) = best_threshold(&x, &y, true).unwrap();
        assert_eq!(t, 2.5);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_integer_threshold_uses_equality() {
        let x = Value::ArrayI(vec![1, 2, 2, 3]);
        let y = vec![5.0, 9.0, 9.0, 5.0];
        let (t, _) = best_threshold(&x, &y, false).unwrap();
        assert_eq!(t, 2.0);
        assert_eq!(threshold_mask(&x, t).unwrap(), vec![false, true, true, false]);
    }

    #[test]
    fn test_constant_feature_has_no_split() {
        let x = Value::ArrayF(vec![1.0, 1.0, 1.0]);
        assert!(best_threshold(&x, &[0.0, 1.0, 0.0], true).is_none());
    }

    #[test]
    fn test_best_split_picks_separating_feature() {
        let d = Dataset::new(
            vec![
                ("noise".to_string(), Value::ArrayF(vec![0.3, 0.1, 0.4, 0.2])),
                ("signal".to_string(), Value::ArrayF(vec![0.0, 0.1, 0.9, 1.0])),
            ],
            vec![0.0, 0.0, 1.0, 1.0],
            true,
        )
        .unwrap();
        let (feature, threshold) = best_split(&d).unwrap();
        assert_eq!(feature, "signal");
        assert_eq!(threshold, 0.5);
    }
}
