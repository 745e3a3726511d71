//! Weighted random selection shared by template picking and loot rolls.

use rand::Rng;

/// Draw one item with probability proportional to its weight.
///
/// Scans a cumulative sum against a uniform draw in `[0, total_weight)`.
/// `total_weight` is supplied by the caller so a running total can be reused.
///
/// - Empty `items` yields `None`.
/// - A non-positive `total_weight` yields the first item without drawing.
/// - When `total_weight` exceeds the real sum of weights (a floored total),
///   draws landing past the last item yield `None`.
pub fn select_weighted<'a, T, R, F>(
    items: &'a [T],
    total_weight: f64,
    weight_of: F,
    rng: &mut R,
) -> Option<&'a T>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f64,
{
    if items.is_empty() {
        return None;
    }
    if total_weight.is_nan() || total_weight <= 0.0 {
        return items.first();
    }

    let roll = rng.gen_range(0.0..total_weight);
    let mut cumulative = 0.0;
    for item in items {
        cumulative += weight_of(item).max(0.0);
        if roll < cumulative {
            return Some(item);
        }
    }
    None
}

/// Sum of non-negative weights.
pub fn total_weight<T>(items: &[T], weight_of: impl Fn(&T) -> f64) -> f64 {
    items.iter().map(|item| weight_of(item).max(0.0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn empirical_frequencies_follow_weights() {
        let items = [("a", 1.0), ("b", 2.0), ("c", 5.0), ("d", 0.0)];
        let total = total_weight(&items, |i| i.1);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut counts = [0usize; 4];
        let trials = 40_000;

        for _ in 0..trials {
            let picked = select_weighted(&items, total, |i| i.1, &mut rng).unwrap();
            let idx = items.iter().position(|i| i.0 == picked.0).unwrap();
            counts[idx] += 1;
        }

        for (idx, item) in items.iter().enumerate() {
            let expected = item.1 / total;
            let observed = counts[idx] as f64 / trials as f64;
            assert!(
                (expected - observed).abs() < 0.01,
                "{}: expected {:.3}, observed {:.3}",
                item.0,
                expected,
                observed
            );
        }
        assert_eq!(counts[3], 0, "zero weight must never be picked");
    }

    #[test]
    fn zero_total_falls_back_to_first() {
        let items = [10, 20];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(select_weighted(&items, 0.0, |_| 0.0, &mut rng), Some(&10));
    }

    #[test]
    fn empty_list_yields_none() {
        let items: [u8; 0] = [];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(select_weighted(&items, 3.0, |_| 1.0, &mut rng), None);
    }

    #[test]
    fn floored_total_can_miss() {
        let items = [0.25];
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let misses = (0..2_000)
            .filter(|_| select_weighted(&items, 1.0, |w| *w, &mut rng).is_none())
            .count();
        // About three quarters of the draws land past the only item.
        assert!(misses > 1_300 && misses < 1_700, "misses = {}", misses);
    }

    #[test]
    fn selection_is_deterministic_per_seed() {
        let items = [1.0, 2.0, 3.0];
        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..20)
                .map(|_| *select_weighted(&items, 6.0, |w| *w, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(77), run(77));
    }
}
