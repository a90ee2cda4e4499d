use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Draws an index with probability proportional to its weight.
/// Non-positive and non-finite weights never win; `None` when nothing can.
pub fn select_weighted<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let cleaned = weights
        .iter()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 });
    let dist = WeightedIndex::new(cleaned).ok()?;
    Some(dist.sample(rng))
}

pub fn has_positive_weight(weights: &[f64]) -> bool {
    weights.iter().any(|w| w.is_finite() && *w > 0.0)
}

/// Removes and returns a uniformly chosen element.
pub fn random_dequeue<T, R: Rng>(queue: &mut Vec<T>, rng: &mut R) -> Option<T> {
    if queue.is_empty() {
        return None;
    }
    let i = rng.gen_range(0..queue.len());
    Some(queue.swap_remove(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_weights_never_selected() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let i = select_weighted(&[0.0, 2.0, -1.0, f64::NAN], &mut rng);
            assert_eq!(i, Some(1));
        }
    }

    #[test]
    fn test_no_candidates() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(select_weighted(&[], &mut rng), None);
        assert_eq!(select_weighted(&[0.0, 0.0], &mut rng), None);
        assert!(!has_positive_weight(&[0.0, -3.0]));
    }

    #[test]
    fn test_random_dequeue_drains() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut queue = vec![1, 2, 3];
        let mut seen = Vec::new();
        while let Some(x) = random_dequeue(&mut queue, &mut rng) {
            seen.push(x);
        }
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
