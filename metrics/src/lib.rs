//! Pure, deterministic ranking and scoring functions. No I/O,
//! no panics on empty input — every function returns a documented
//! zero/`None` default instead.

use std::collections::HashSet;

#[must_use]
pub const fn clamp_unit(value: f64) -> f64 {
    if value < 0.0 {
        0.0
    } else if value > 1.0 {
        1.0
    } else {
        value
    }
}

fn top_k(retrieved: &[String], k: usize) -> &[String] {
    &retrieved[..retrieved.len().min(k)]
}

/// `P@k = |top_k ∩ R| / min(k, |top_k|)`, or 0 when `top_k` is empty.
#[must_use]
pub fn precision_at_k(retrieved: &[String], relevant: &HashSet<String>, k: usize) -> f64 {
    let window = top_k(retrieved, k);
    if window.is_empty() {
        return 0.0;
    }
    let hits = window.iter().filter(|id| relevant.contains(*id)).count();
    hits as f64 / window.len() as f64
}

/// `R@k = |top_k ∩ R| / |R|`, or 0 when `R` is empty or `k == 0`.
#[must_use]
pub fn recall_at_k(retrieved: &[String], relevant: &HashSet<String>, k: usize) -> f64 {
    if relevant.is_empty() || k == 0 {
        return 0.0;
    }
    let window = top_k(retrieved, k);
    let hits = window.iter().filter(|id| relevant.contains(*id)).count();
    hits as f64 / relevant.len() as f64
}

/// `true` iff `top_k ∩ R != ∅`.
#[must_use]
pub fn hit_at_k(retrieved: &[String], relevant: &HashSet<String>, k: usize) -> bool {
    top_k(retrieved, k).iter().any(|id| relevant.contains(id))
}

/// `1/rank` of the first relevant item in `top_k`, else 0.
#[must_use]
pub fn reciprocal_rank_at_k(retrieved: &[String], relevant: &HashSet<String>, k: usize) -> f64 {
    for (index, id) in top_k(retrieved, k).iter().enumerate() {
        if relevant.contains(id) {
            return 1.0 / (index + 1) as f64;
        }
    }
    0.0
}

/// Binary-relevance NDCG@k: `DCG / IDCG`, or 0 when `IDCG == 0`.
#[must_use]
pub fn ndcg_at_k(retrieved: &[String], relevant: &HashSet<String>, k: usize) -> f64 {
    let dcg: f64 = top_k(retrieved, k)
        .iter()
        .enumerate()
        .filter(|(_, id)| relevant.contains(*id))
        .map(|(position, _)| 1.0 / ((position + 2) as f64).log2())
        .sum();

    let ideal_hits = relevant.len().min(k);
    let idcg: f64 = (0..ideal_hits)
        .map(|position| 1.0 / ((position + 2) as f64).log2())
        .sum();

    if idcg == 0.0 {
        0.0
    } else {
        dcg / idcg
    }
}

/// `AP@k = (1/|R|) * Σ_{i=1..k} P@i * rel_i`.
#[must_use]
pub fn average_precision_at_k(retrieved: &[String], relevant: &HashSet<String>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let window = top_k(retrieved, k);
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (index, id) in window.iter().enumerate() {
        if relevant.contains(id) {
            hits += 1;
            sum += hits as f64 / (index + 1) as f64;
        }
    }
    sum / relevant.len() as f64
}

/// Cosine similarity in `[-1, 1]`; 0 when either vector has zero norm or
/// the vectors differ in length.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Pearson correlation coefficient. `None` unless both series have at
/// least 3 points and non-zero variance.
#[must_use]
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 3 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// The `{perfect, missed, partial}` bucketing applied to a per-case
/// recall value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecallBucket {
    Perfect,
    Missed,
    Partial,
}

#[must_use]
pub fn bucket_by_recall(recall: f64) -> RecallBucket {
    if recall >= 1.0 {
        RecallBucket::Perfect
    } else if recall <= 0.0 {
        RecallBucket::Missed
    } else {
        RecallBucket::Partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    fn set(values: &[&str]) -> HashSet<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn ranking_metrics_on_a_single_relevant_item() {
        let retrieved = ids(&["cA", "cG", "cB", "cC", "cD"]);
        let relevant = set(&["cG"]);

        assert!((precision_at_k(&retrieved, &relevant, 5) - 0.2).abs() < 1e-9);
        assert!((recall_at_k(&retrieved, &relevant, 5) - 1.0).abs() < 1e-9);
        assert!(hit_at_k(&retrieved, &relevant, 5));
        assert!((reciprocal_rank_at_k(&retrieved, &relevant, 5) - 0.5).abs() < 1e-9);

        let expected_ndcg = 1.0 / 3f64.log2();
        assert!((ndcg_at_k(&retrieved, &relevant, 5) - expected_ndcg).abs() < 1e-9);

        assert!((average_precision_at_k(&retrieved, &relevant, 5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empty_inputs_return_zero() {
        let relevant: HashSet<String> = HashSet::new();
        let retrieved: Vec<String> = Vec::new();

        assert_eq!(precision_at_k(&retrieved, &relevant, 5), 0.0);
        assert_eq!(recall_at_k(&retrieved, &relevant, 5), 0.0);
        assert!(!hit_at_k(&retrieved, &relevant, 5));
        assert_eq!(reciprocal_rank_at_k(&retrieved, &relevant, 5), 0.0);
        assert_eq!(ndcg_at_k(&retrieved, &relevant, 5), 0.0);
        assert_eq!(average_precision_at_k(&retrieved, &relevant, 5), 0.0);
    }

    #[test]
    fn metric_bounds_hold_across_random_like_inputs() {
        let retrieved = ids(&["a", "b", "c", "d", "e", "f"]);
        for relevant_ids in [vec!["a"], vec!["a", "c", "e"], vec!["z"], vec![]] {
            let relevant = set(&relevant_ids.iter().map(|s| &**s).collect::<Vec<_>>());
            for k in 0..=retrieved.len() {
                let p = precision_at_k(&retrieved, &relevant, k);
                let r = recall_at_k(&retrieved, &relevant, k);
                let rr = reciprocal_rank_at_k(&retrieved, &relevant, k);
                let ndcg = ndcg_at_k(&retrieved, &relevant, k);
                let map_score = average_precision_at_k(&retrieved, &relevant, k);
                assert!((0.0..=1.0).contains(&p));
                assert!((0.0..=1.0).contains(&r));
                assert!((0.0..=1.0).contains(&rr));
                assert!((0.0..=1.0).contains(&ndcg));
                assert!((0.0..=1.0).contains(&map_score));
            }
        }
    }

    #[test]
    fn cosine_similarity_handles_identical_and_orthogonal_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn pearson_requires_three_points_and_variance() {
        assert_eq!(pearson_correlation(&[1.0, 1.0], &[1.0, 2.0]), None);
        assert_eq!(pearson_correlation(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        assert!(pearson_correlation(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).is_some());
    }

    #[test]
    fn recall_buckets_partition_the_unit_interval() {
        assert_eq!(bucket_by_recall(1.0), RecallBucket::Perfect);
        assert_eq!(bucket_by_recall(0.0), RecallBucket::Missed);
        assert_eq!(bucket_by_recall(0.5), RecallBucket::Partial);
    }
}
