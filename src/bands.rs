use serde::Serialize;

use crate::grid::CreditGridPoint;

/// Longest contiguous run of indices whose value satisfies `pred`, as an
/// inclusive `(start, end)`. Ties go to the earliest run.
pub fn longest_run_where(values: &[f64], pred: impl Fn(f64) -> bool) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut cur_start: Option<usize> = None;
    let mut close = |start: usize, end: usize| {
        if best.is_none_or(|(bs, be)| end - start > be - bs) {
            best = Some((start, end));
        }
    };

    for (i, &v) in values.iter().enumerate() {
        if pred(v) {
            cur_start.get_or_insert(i);
        } else if let Some(start) = cur_start.take() {
            close(start, i - 1);
        }
    }
    if let Some(start) = cur_start {
        close(start, values.len() - 1);
    }
    best
}

/// Longest contiguous run with `value >= threshold`.
pub fn longest_run_at_or_above(values: &[f64], threshold: f64) -> Option<(usize, usize)> {
    longest_run_where(values, |v| v >= threshold)
}

/// A contiguous slice of the credit grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBand {
    pub start_index: usize,
    pub end_index: usize,
    pub pct_min: f64,
    pub pct_max: f64,
    #[serde(rename = "amtMinUSD")]
    pub amt_min: f64,
    #[serde(rename = "amtMaxUSD")]
    pub amt_max: f64,
}

impl RiskBand {
    fn over(grid: &[CreditGridPoint], start: usize, end: usize) -> Self {
        RiskBand {
            start_index: start,
            end_index: end,
            pct_min: grid[start].pct,
            pct_max: grid[end].pct,
            amt_min: grid[start].amount,
            amt_max: grid[end].amount,
        }
    }

    pub fn len(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RiskBands {
    pub green: Option<RiskBand>,
    pub yellow: Option<RiskBand>,
    pub red: Option<RiskBand>,
}

/// The recommended credit range: the green band plus its highest level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub pct_min: f64,
    pub pct_max: f64,
    #[serde(rename = "amtMinUSD")]
    pub amt_min: f64,
    #[serde(rename = "amtMaxUSD")]
    pub amt_max: f64,
    pub max_credit_pct: f64,
    #[serde(rename = "maxCreditAmtUSD")]
    pub max_credit_amt: f64,
}

impl From<&RiskBand> for Recommendation {
    fn from(green: &RiskBand) -> Self {
        // The green band is contiguous and ordered by pct, so its end is the
        // highest level meeting the target.
        Recommendation {
            pct_min: green.pct_min,
            pct_max: green.pct_max,
            amt_min: green.amt_min,
            amt_max: green.amt_max,
            max_credit_pct: green.pct_max,
            max_credit_amt: green.amt_max,
        }
    }
}

/// Split the grid into green (≥ `target`), yellow (`[red, target)`) and red
/// (< `red`) bands.
///
/// Green is the longest run at or above target. Red starts at the first index
/// below `red` after green and runs to the end of the grid. Yellow is the
/// longest run in `[red, target)` strictly between the two.
pub fn classify(grid: &[CreditGridPoint], target: f64, red: f64) -> (Option<Recommendation>, RiskBands) {
    if grid.is_empty() {
        return (None, RiskBands::default());
    }
    let probs: Vec<f64> = grid.iter().map(|g| g.probability).collect();
    let last = probs.len() - 1;

    let green = longest_run_at_or_above(&probs, target).map(|(s, e)| RiskBand::over(grid, s, e));

    let red_from = green.map_or(0, |g| g.end_index + 1);
    let red_band = (red_from..=last)
        .find(|&i| probs[i] < red)
        .map(|s| RiskBand::over(grid, s, last));

    let window_start = green.map_or(0, |g| g.end_index + 1);
    let window_end = red_band.map_or(Some(last), |r| r.start_index.checked_sub(1));
    let yellow = match window_end {
        Some(end) if window_start <= end => {
            longest_run_where(&probs[window_start..=end], |p| p >= red && p < target)
                .map(|(s, e)| RiskBand::over(grid, window_start + s, window_start + e))
        }
        _ => None,
    };

    let recommendation = green.as_ref().map(Recommendation::from);
    (recommendation, RiskBands { green, yellow, red: red_band })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::grid::grid_pcts;

    const T: f64 = 0.85;
    const R: f64 = 0.60;

    fn grid_from(probs: &[f64]) -> Vec<CreditGridPoint> {
        grid_pcts(probs.len())
            .into_iter()
            .zip(probs)
            .map(|(pct, &probability)| CreditGridPoint { pct, amount: pct * 1_000.0, probability })
            .collect()
    }

    // ── Run scan ─────────────────────────────────────────────────────────────

    #[test]
    fn run_scan_finds_longest() {
        let v = [0.9, 0.1, 0.9, 0.9, 0.9, 0.1, 0.9, 0.9];
        assert_eq!(longest_run_at_or_above(&v, 0.85), Some((2, 4)));
    }

    #[test]
    fn run_scan_ties_go_to_earliest() {
        let v = [0.1, 0.9, 0.9, 0.1, 0.9, 0.9];
        assert_eq!(longest_run_at_or_above(&v, 0.85), Some((1, 2)));
    }

    #[test]
    fn run_scan_handles_run_reaching_the_end() {
        let v = [0.9, 0.1, 0.9, 0.9];
        assert_eq!(longest_run_at_or_above(&v, 0.85), Some((2, 3)));
    }

    #[test]
    fn run_scan_threshold_is_inclusive() {
        assert_eq!(longest_run_at_or_above(&[0.85], 0.85), Some((0, 0)));
        assert_eq!(longest_run_at_or_above(&[0.8499], 0.85), None);
        assert_eq!(longest_run_at_or_above(&[], 0.85), None);
    }

    // ── Classification ───────────────────────────────────────────────────────

    #[test]
    fn decreasing_curve_gives_three_adjacent_bands() {
        let grid = grid_from(&[0.97, 0.92, 0.86, 0.80, 0.70, 0.61, 0.55, 0.30]);
        let (rec, bands) = classify(&grid, T, R);

        let green = bands.green.unwrap();
        assert_eq!((green.start_index, green.end_index), (0, 2));
        let yellow = bands.yellow.unwrap();
        assert_eq!((yellow.start_index, yellow.end_index), (3, 5));
        let red = bands.red.unwrap();
        assert_eq!((red.start_index, red.end_index), (6, 7));

        let rec = rec.unwrap();
        assert_eq!(rec.pct_min, 0.0);
        assert_eq!(rec.max_credit_pct, grid[2].pct);
        assert_eq!(rec.max_credit_amt, grid[2].amount);
        assert_eq!(rec.amt_max, rec.max_credit_amt);
    }

    #[test]
    fn no_green_reports_no_recommendation() {
        let grid = grid_from(&[0.80, 0.70, 0.50]);
        let (rec, bands) = classify(&grid, T, R);
        assert!(rec.is_none());
        assert!(bands.green.is_none());
        let yellow = bands.yellow.unwrap();
        assert_eq!((yellow.start_index, yellow.end_index), (0, 1));
        assert_eq!(bands.red.unwrap().start_index, 2);
    }

    #[test]
    fn all_green_collapses_to_single_band() {
        let grid = grid_from(&[1.0; 21]);
        let (rec, bands) = classify(&grid, T, R);
        let green = bands.green.unwrap();
        assert_eq!((green.start_index, green.end_index), (0, 20));
        assert!(bands.yellow.is_none());
        assert!(bands.red.is_none());
        assert_eq!(rec.unwrap().max_credit_pct, 1.0);
    }

    #[test]
    fn all_red_collapses_to_single_band() {
        let grid = grid_from(&[0.4, 0.3, 0.2]);
        let (rec, bands) = classify(&grid, T, R);
        assert!(rec.is_none());
        assert!(bands.green.is_none());
        assert!(bands.yellow.is_none());
        let red = bands.red.unwrap();
        assert_eq!((red.start_index, red.end_index), (0, 2));
    }

    #[test]
    fn single_point_grid() {
        let (rec, bands) = classify(&grid_from(&[0.9]), T, R);
        assert_eq!(rec.unwrap().max_credit_pct, 0.0);
        assert_eq!(bands.green.unwrap().len(), 1);

        let (rec, bands) = classify(&grid_from(&[0.7]), T, R);
        assert!(rec.is_none());
        assert_eq!(bands.yellow.unwrap().len(), 1);
    }

    #[test]
    fn red_never_overlaps_green_on_non_monotone_curve() {
        // Dip below red before the longest green run.
        let grid = grid_from(&[0.5, 0.9, 0.9, 0.9, 0.7, 0.4]);
        let (_, bands) = classify(&grid, T, R);
        let green = bands.green.unwrap();
        let red = bands.red.unwrap();
        assert_eq!((green.start_index, green.end_index), (1, 3));
        assert_eq!(red.start_index, 5);
        assert_eq!(bands.yellow.unwrap().start_index, 4);
    }

    #[test]
    fn green_directly_followed_by_red_has_no_yellow() {
        let grid = grid_from(&[0.95, 0.90, 0.50, 0.40]);
        let (_, bands) = classify(&grid, T, R);
        assert!(bands.yellow.is_none());
        assert_eq!(bands.red.unwrap().start_index, 2);
    }

    #[test]
    fn empty_grid_has_no_bands() {
        let (rec, bands) = classify(&[], T, R);
        assert!(rec.is_none());
        assert_eq!(bands, RiskBands::default());
    }

    proptest! {
        #[test]
        fn prop_green_is_maximal_contiguous_run(probs in proptest::collection::vec(0.0f64..=1.0, 1..40)) {
            let grid = grid_from(&probs);
            let (_, bands) = classify(&grid, T, R);
            match bands.green {
                None => prop_assert!(probs.iter().all(|&p| p < T)),
                Some(g) => {
                    for i in g.start_index..=g.end_index {
                        prop_assert!(probs[i] >= T);
                    }
                    // No other run of qualifying indices is longer.
                    let mut run = 0usize;
                    for &p in &probs {
                        run = if p >= T { run + 1 } else { 0 };
                        prop_assert!(run <= g.len());
                    }
                }
            }
        }

        #[test]
        fn prop_yellow_sits_between_green_and_red(probs in proptest::collection::vec(0.0f64..=1.0, 1..40)) {
            let grid = grid_from(&probs);
            let (_, bands) = classify(&grid, T, R);
            if let Some(y) = bands.yellow {
                for i in y.start_index..=y.end_index {
                    prop_assert!(probs[i] >= R && probs[i] < T);
                }
                if let Some(g) = bands.green {
                    prop_assert!(y.start_index > g.end_index);
                }
                if let Some(r) = bands.red {
                    prop_assert!(y.end_index < r.start_index);
                }
            }
            if let (Some(g), Some(r)) = (bands.green, bands.red) {
                prop_assert!(r.start_index > g.end_index);
            }
        }
    }
}
