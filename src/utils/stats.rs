pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population variance.
pub fn variance(xs: &[f64]) -> f64 {
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64
}

pub fn z_score(xs: &[f64]) -> Vec<f64> {
    let m = mean(xs);
    let sd = variance(xs).sqrt();
    xs.iter().map(|x| (x - m) / sd).collect()
}

/// Least-squares slope of `y` on `x`; NaN when `x` is constant.
pub fn slope(x: &[f64], y: &[f64]) -> f64 {
    let mx = mean(x);
    let my = mean(y);
    let cov: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let var: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
    cov / var
}

/// Gini impurity of a set of labels over the given classes.
pub fn gini(labels: &[f64], classes: &[f64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let n = labels.len() as f64;
    1.0 - classes
        .iter()
        .map(|c| {
            let p = labels.iter().filter(|l| *l == c).count() as f64 / n;
            p * p
        })
        .sum::<f64>()
}

/// Most frequent value; ties go to the smallest.
pub fn mode(xs: &[f64]) -> f64 {
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mut best = f64::NAN;
    let mut best_count = 0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best_count {
            best_count = j - i;
            best = sorted[i];
        }
        i = j;
    }
    best
}

/// Sorted distinct values.
pub fn unique(xs: &[f64]) -> Vec<f64> {
    let mut out = xs.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out.dedup();
    out
}
