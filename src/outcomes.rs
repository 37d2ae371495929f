use rayon::prelude::*;
use serde::Serialize;

/// Narrative margin outcomes for the campaign (USD).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    /// 5th percentile margin: a hard year.
    pub bad: f64,
    /// Median margin.
    pub typical: f64,
    /// 95th percentile margin: a very good year.
    pub good: f64,
    /// Fraction of draws with strictly positive margin.
    pub probability_positive: f64,
}

/// Nearest-rank quantile on an ascending slice: `sorted[floor(p * (n - 1))]`.
/// `None` when the slice is empty.
pub fn nearest_rank(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let idx = (p * last as f64).floor() as usize;
    sorted.get(idx.min(last)).copied()
}

/// Summarise per-draw margins. Consumes the vector to sort it in place.
pub fn summarize(mut margins: Vec<f64>) -> Insights {
    margins.par_sort_unstable_by(f64::total_cmp);
    let (Some(bad), Some(typical), Some(good)) = (
        nearest_rank(&margins, 0.05),
        nearest_rank(&margins, 0.50),
        nearest_rank(&margins, 0.95),
    ) else {
        return Insights::default();
    };
    let positive = margins.iter().filter(|&&m| m > 0.0).count();
    Insights { bad, typical, good, probability_positive: positive as f64 / margins.len() as f64 }
}

/// Spread of a metric across repeated runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistStats {
    pub n: usize,
    pub min: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
    pub mean: f64,
}

/// Order statistics with linear interpolation between ranks. `None` when empty.
pub fn dist_stats(mut values: Vec<f64>) -> Option<DistStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);
    let n = values.len();

    let interp = |p: f64| -> f64 {
        let h = p * (n - 1) as f64;
        let lo = h.floor() as usize;
        let hi = (lo + 1).min(n - 1);
        let frac = h - lo as f64;
        values[lo] * (1.0 - frac) + values[hi] * frac
    };

    Some(DistStats {
        n,
        min: values[0],
        p5: interp(0.05),
        p50: interp(0.50),
        p95: interp(0.95),
        max: values[n - 1],
        mean: values.iter().sum::<f64>() / n as f64,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn nearest_rank_uses_floor_index() {
        let sorted: Vec<f64> = (0..=100).map(|x| x as f64).collect();
        assert_eq!(nearest_rank(&sorted, 0.05), Some(5.0));
        assert_eq!(nearest_rank(&sorted, 0.50), Some(50.0));
        assert_eq!(nearest_rank(&sorted, 0.95), Some(95.0));

        // n = 10: floor(0.95 * 9) = 8, floor(0.05 * 9) = 0.
        let ten: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        assert_eq!(nearest_rank(&ten, 0.95), Some(9.0));
        assert_eq!(nearest_rank(&ten, 0.05), Some(1.0));
    }

    #[test]
    fn nearest_rank_of_empty_slice_is_none() {
        assert_eq!(nearest_rank(&[], 0.5), None);
        assert_eq!(nearest_rank(&[], 0.0), None);
        assert_eq!(nearest_rank(&[7.0], 1.0), Some(7.0));
    }

    #[test]
    fn summarize_counts_strictly_positive() {
        let insights = summarize(vec![-2.0, 0.0, 3.0, 5.0]);
        assert_eq!(insights.probability_positive, 0.5);
        assert_eq!(insights.bad, -2.0);
        assert_eq!(insights.typical, 0.0);
    }

    #[test]
    fn single_draw_is_every_quantile() {
        let insights = summarize(vec![42.0]);
        assert_eq!((insights.bad, insights.typical, insights.good), (42.0, 42.0, 42.0));
        assert_eq!(insights.probability_positive, 1.0);
    }

    #[test]
    fn empty_margins_summarise_to_zero() {
        assert_eq!(summarize(Vec::new()), Insights::default());
    }

    #[test]
    fn dist_stats_interpolates_between_ranks() {
        let ds = dist_stats(vec![5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert_eq!(ds.n, 5);
        assert_eq!((ds.min, ds.max), (1.0, 5.0));
        assert!((ds.p50 - 3.0).abs() < 1e-12, "p50");
        assert!((ds.mean - 3.0).abs() < 1e-12, "mean");
        // h = 0.95 * 4 = 3.8 → 4 * 0.2 + 5 * 0.8
        assert!((ds.p95 - 4.8).abs() < 1e-12, "p95 = {}", ds.p95);
    }

    #[test]
    fn dist_stats_empty_is_none() {
        assert!(dist_stats(Vec::new()).is_none());
    }

    proptest! {
        #[test]
        fn prop_quantiles_are_ordered(margins in proptest::collection::vec(-1e7f64..1e7, 1..500)) {
            let insights = summarize(margins);
            prop_assert!(insights.bad <= insights.typical);
            prop_assert!(insights.typical <= insights.good);
            prop_assert!((0.0..=1.0).contains(&insights.probability_positive));
        }
    }
}
