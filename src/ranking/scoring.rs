//! Signal normalization and per-item score records

/// Value every item gets when a signal does not vary across the batch
pub const MIDPOINT: f64 = 0.5;

/// Rescales one numeric signal across a batch into `[0, 1]`.
///
/// Each output is `(value - min) / (max - min)`, in input order. Missing
/// values count as `0`. When all values are equal (including a single item)
/// every output is exactly [`MIDPOINT`], so a flat signal neither helps nor
/// hurts any item.
pub fn normalize<T, F>(items: &[T], field: F) -> Vec<f64>
where
    F: Fn(&T) -> Option<f64>,
{
    let values: Vec<f64> = items.iter().map(|item| field(item).unwrap_or(0.0)).collect();

    let Some(min) = values.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max = values.iter().copied().fold(min, f64::max);

    let span = max - min;
    if span == 0.0 || !span.is_finite() {
        return vec![MIDPOINT; values.len()];
    }

    values.iter().map(|value| (value - min) / span).collect()
}

/// An item entering the ranking stage, with the signals it is ranked on
///
/// The item itself is only borrowed; ranking never modifies it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem<'a, T> {
    pub item: &'a T,
    /// Relevance in `[0, 1]`, if a relevance scorer produced one
    pub relevance_score: Option<f64>,
    /// Popularity as reported by the source (stars, points)
    pub popularity_raw: Option<f64>,
    /// Popularity rescaled to `[0, 1]`; this is what ranking uses
    pub popularity_normalized: Option<f64>,
    /// Filled in by [`Ranker::rank`](super::Ranker::rank)
    pub composite_score: f64,
}

impl<'a, T> ScoredItem<'a, T> {
    /// Creates a record from signals that are already in `[0, 1]`
    pub fn new(item: &'a T, relevance: Option<f64>, popularity: Option<f64>) -> Self {
        Self {
            item,
            relevance_score: relevance,
            popularity_raw: popularity,
            popularity_normalized: popularity,
            composite_score: 0.0,
        }
    }

    pub(crate) fn relevance_signal(&self) -> f64 {
        self.relevance_score.unwrap_or(0.0)
    }

    pub(crate) fn popularity_signal(&self) -> f64 {
        self.popularity_normalized.unwrap_or(0.0)
    }
}

/// Builds score records for a batch, normalizing raw popularity across it.
///
/// Only items from a single source should be normalized together: star counts
/// and upvotes live on different scales.
pub fn score_items<'a, T, R, P>(items: &'a [T], relevance: R, popularity_raw: P) -> Vec<ScoredItem<'a, T>>
where
    R: Fn(&T) -> Option<f64>,
    P: Fn(&T) -> Option<f64>,
{
    let normalized = normalize(items, &popularity_raw);

    items
        .iter()
        .zip(normalized)
        .map(|(item, popularity_normalized)| ScoredItem {
            item,
            relevance_score: relevance(item),
            popularity_raw: popularity_raw(item),
            popularity_normalized: Some(popularity_normalized),
            composite_score: 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Post {
        id: u32,
        points: Option<f64>,
    }

    fn posts(points: &[Option<f64>]) -> Vec<Post> {
        points
            .iter()
            .enumerate()
            .map(|(i, &points)| Post { id: i as u32 + 1, points })
            .collect()
    }

    #[test]
    fn test_normalize_spans_zero_to_one() {
        let items = posts(&[Some(10.0), Some(20.0), Some(30.0)]);

        let normalized = normalize(&items, |p| p.points);

        assert_eq!(normalized, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_normalize_equal_values_give_midpoint() {
        let items = posts(&[Some(42.0), Some(42.0), Some(42.0)]);

        let normalized = normalize(&items, |p| p.points);

        assert_eq!(normalized, vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_normalize_single_item_gives_midpoint() {
        let items = posts(&[Some(1234.0)]);

        assert_eq!(normalize(&items, |p| p.points), vec![0.5]);
    }

    #[test]
    fn test_normalize_empty_input() {
        let items: Vec<Post> = Vec::new();

        assert!(normalize(&items, |p| p.points).is_empty());
    }

    #[test]
    fn test_normalize_missing_values_count_as_zero() {
        let items = posts(&[None, Some(50.0), Some(100.0)]);

        let normalized = normalize(&items, |p| p.points);

        assert_eq!(normalized, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_score_items_keeps_order_and_raw_values() {
        let items = posts(&[Some(5.0), Some(15.0)]);

        let scored = score_items(&items, |p| Some(p.id as f64 / 10.0), |p| p.points);

        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].item.id, 1);
        assert_eq!(scored[0].popularity_raw, Some(5.0));
        assert_eq!(scored[0].popularity_normalized, Some(0.0));
        assert_eq!(scored[1].popularity_normalized, Some(1.0));
        assert_eq!(scored[1].relevance_score, Some(0.2));
    }

    #[test]
    fn test_score_items_does_not_touch_inputs() {
        let items = posts(&[Some(1.0), Some(2.0)]);
        let before = posts(&[Some(1.0), Some(2.0)]);

        let _ = score_items(&items, |_| None, |p| p.points);

        assert_eq!(items, before);
    }
}
