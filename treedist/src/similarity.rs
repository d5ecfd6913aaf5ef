//! Distance to similarity normalization.

/// Map a raw edit distance to a score in `[0, 1]`.
///
/// `max_distance` is the cost of deleting every node of one tree and inserting every
/// node of the other, the largest distance any comparison of the pair can produce.
/// Two empty trees (`max_distance == 0`) score 1.0.
pub fn similarity(distance: f64, max_distance: f64) -> f64 {
    if max_distance <= 0.0 {
        return 1.0;
    }
    (1.0 - distance / max_distance).clamp(0.0, 1.0)
}

/// [`similarity`] for unit costs, where the bound is the total node count.
pub fn normalize(distance: f64, size_a: usize, size_b: usize) -> f64 {
    similarity(distance, (size_a + size_b) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_zero_distance_is_perfect_score() {
        assert_eq!(normalize(0.0, 5, 5), 1.0);
        assert_eq!(normalize(0.0, 0, 0), 1.0);
    }

    #[test]
    fn test_score_decreases_with_distance() {
        let scores: Vec<f64> = (0..=10).map(|d| normalize(d as f64, 5, 5)).collect();
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(scores[10], 0.0);
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(similarity(12.0, 10.0), 0.0);
        assert_eq!(similarity(-1.0, 10.0), 1.0);
    }

    #[test]
    fn test_one_rename_between_small_trees() {
        // Two four-node trees one rename apart.
        assert_eq!(normalize(1.0, 4, 4), 1.0 - 1.0 / 8.0);
    }
}
