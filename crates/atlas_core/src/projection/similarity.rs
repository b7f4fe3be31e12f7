//! Vector similarity helpers.

/// Cosine similarity of two equally sized vectors.
///
/// Returns `0.0` when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "cosine operands must share a dimension");
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// Angular distance in radians derived from a cosine similarity.
pub fn angular_distance(a: &[f32], b: &[f32]) -> f64 {
    f64::from(cosine_similarity(a, b)).clamp(-1.0, 1.0).acos()
}

/// Indices of `scores` ordered by descending score; ties keep index order.
///
/// NaN ranks below every other score.
pub fn rank_descending(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|left, right| descending(scores[*left], scores[*right]));
    order
}

/// Total descending order on scores with NaN treated as negative infinity.
pub fn descending(left: f32, right: f32) -> std::cmp::Ordering {
    rank_key(right).total_cmp(&rank_key(left))
}

fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::{angular_distance, cosine_similarity, rank_descending};

    #[test]
    fn zero_vectors_have_zero_similarity() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn parallel_vectors_are_fully_similar() {
        let score = cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]);
        assert!((score - 1.0).abs() < 1e-6);
        assert!(angular_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-3);
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        assert_eq!(rank_descending(&[0.1, 0.9, 0.5, 0.9]), vec![1, 3, 2, 0]);
    }

    #[test]
    fn nan_scores_rank_last_without_disturbing_finite_order() {
        let scores: Vec<f32> = (0..200)
            .map(|i| if i % 3 == 0 { f32::NAN } else { (i * 37 % 101) as f32 })
            .collect();

        let order = rank_descending(&scores);

        let finite = scores.iter().filter(|score| !score.is_nan()).count();
        let (head, tail) = order.split_at(finite);
        assert!(head
            .windows(2)
            .all(|pair| scores[pair[0]] >= scores[pair[1]]));
        assert!(tail.iter().all(|&index| scores[index].is_nan()));
        assert_eq!(tail.first(), Some(&0));
    }
}
