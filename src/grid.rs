use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::error::SimulationError;
use crate::scenario::Scenarios;

/// One candidate credit level and its empirical repayment probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditGridPoint {
    pub pct: f64,
    #[serde(rename = "amountUSD")]
    pub amount: f64,
    pub probability: f64,
}

/// `steps` equally spaced fractions from 0 to 1 inclusive. A single step is `[0.0]`.
pub fn grid_pcts(steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let last = (steps - 1) as f64;
            (0..steps).map(|s| s as f64 / last).collect()
        }
    }
}

/// Principal plus campaign interest.
pub fn required_repayment(amount: f64, interest_rate: f64) -> f64 {
    amount + amount * interest_rate
}

/// Fraction of draws whose revenue covers labor and rent first and then the
/// credit obligation: `revenue ≥ rest + required`.
///
/// Inputs are not on the must-cover side: the credit itself finances them.
pub fn repayment_probability(scenarios: &Scenarios, required: f64) -> f64 {
    if scenarios.is_empty() {
        return 0.0;
    }
    let repaid = scenarios
        .revenue
        .par_iter()
        .zip(scenarios.rest.par_iter())
        .filter(|&(&revenue, &rest)| revenue >= rest + required)
        .count();
    repaid as f64 / scenarios.len() as f64
}

/// Evaluate every grid level against the shared, read-only scenarios.
/// Cancellation is polled before each level.
pub fn scan_credit_grid(
    scenarios: &Scenarios,
    base: f64,
    interest_rate: f64,
    steps: usize,
    cancel: &CancellationToken,
) -> Result<Vec<CreditGridPoint>, SimulationError> {
    let mut grid = Vec::with_capacity(steps);
    for pct in grid_pcts(steps) {
        cancel.check()?;
        let amount = base * pct;
        let probability = repayment_probability(scenarios, required_repayment(amount, interest_rate));
        grid.push(CreditGridPoint { pct, amount, probability });
    }
    debug!(
        steps,
        base,
        p_zero = grid.first().map(|g| g.probability),
        p_full = grid.last().map(|g| g.probability),
        "credit grid scanned"
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn scenarios(rows: &[(f64, f64, f64)]) -> Scenarios {
        Scenarios {
            revenue: rows.iter().map(|r| r.0).collect(),
            inputs: rows.iter().map(|r| r.1).collect(),
            rest: rows.iter().map(|r| r.2).collect(),
        }
    }

    #[test]
    fn default_grid_is_five_percent_steps() {
        let pcts = grid_pcts(21);
        assert_eq!(pcts.len(), 21);
        assert_eq!(pcts[0], 0.0);
        assert_eq!(pcts[20], 1.0);
        assert!((pcts[1] - 0.05).abs() < 1e-12);
    }

    #[test]
    fn single_step_grid_is_zero_only() {
        assert_eq!(grid_pcts(1), vec![0.0]);
    }

    #[test]
    fn zero_pct_probability_is_revenue_covers_rest() {
        let s = scenarios(&[(100.0, 50.0, 100.0), (99.0, 0.0, 100.0), (500.0, 400.0, 10.0), (0.0, 0.0, 0.0)]);
        let grid = scan_credit_grid(&s, 1_000.0, 0.1, 5, &CancellationToken::new()).unwrap();
        assert_eq!(grid[0].amount, 0.0);
        assert_eq!(required_repayment(grid[0].amount, 0.1), 0.0);
        let covered = s.revenue.iter().zip(&s.rest).filter(|&(r, q)| r >= q).count() as f64 / 4.0;
        assert_eq!(grid[0].probability, covered);
        assert_eq!(covered, 0.75);
    }

    #[test]
    fn waterfall_services_rest_before_credit() {
        // Revenue 1_000, rest 600, inputs 900: with rest serviced first, 400 is
        // left for the credit. Inputs never enter the test.
        let s = scenarios(&[(1_000.0, 900.0, 600.0)]);
        assert_eq!(repayment_probability(&s, 400.0), 1.0);
        assert_eq!(repayment_probability(&s, 400.01), 0.0);
    }

    #[test]
    fn interest_is_added_to_the_obligation() {
        assert!((required_repayment(1_000.0, 0.08) - 1_080.0).abs() < 1e-9);
        let s = scenarios(&[(1_100.0, 0.0, 0.0)]);
        // The full base of 1_100 at 8% owes 1_188, more than the revenue.
        let grid = scan_credit_grid(&s, 1_100.0, 0.08, 12, &CancellationToken::new()).unwrap();
        let p_at = |pct: f64| grid.iter().find(|g| (g.pct - pct).abs() < 1e-9).unwrap().probability;
        assert_eq!(p_at(0.0), 1.0);
        assert_eq!(p_at(1.0), 0.0);
    }

    #[test]
    fn amounts_scale_with_base() {
        let s = scenarios(&[(10.0, 0.0, 0.0)]);
        let grid = scan_credit_grid(&s, 2_000.0, 0.0, 3, &CancellationToken::new()).unwrap();
        let amounts: Vec<f64> = grid.iter().map(|g| g.amount).collect();
        assert_eq!(amounts, vec![0.0, 1_000.0, 2_000.0]);
    }

    #[test]
    fn zero_base_is_always_repaid_when_costs_are_zero() {
        let s = scenarios(&[(0.0, 0.0, 0.0); 8]);
        let grid = scan_credit_grid(&s, 0.0, 0.08, 21, &CancellationToken::new()).unwrap();
        assert!(grid.iter().all(|g| g.probability == 1.0 && g.amount == 0.0));
    }

    #[test]
    fn cancelled_scan_returns_error() {
        let s = scenarios(&[(10.0, 0.0, 0.0)]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(scan_credit_grid(&s, 1.0, 0.0, 21, &cancel), Err(SimulationError::Cancelled));
    }

    proptest! {
        #[test]
        fn prop_grid_shape(steps in 2usize..200) {
            let pcts = grid_pcts(steps);
            prop_assert_eq!(pcts.len(), steps);
            prop_assert_eq!(pcts[0], 0.0);
            prop_assert_eq!(pcts[steps - 1], 1.0);
            for w in pcts.windows(2) {
                prop_assert!(w[1] > w[0], "grid must be strictly increasing");
            }
        }

        #[test]
        fn prop_probability_in_unit_interval(
            rows in proptest::collection::vec((0.0f64..1e6, 0.0f64..1e6, 0.0f64..1e6), 1..64),
            base in 0.0f64..1e6,
        ) {
            let s = scenarios(&rows);
            let grid = scan_credit_grid(&s, base, 0.08, 11, &CancellationToken::new()).unwrap();
            for g in &grid {
                prop_assert!((0.0..=1.0).contains(&g.probability));
            }
            // The same draws are tested against a growing obligation, so a
            // draw that fails at one level fails at every higher one.
            for w in grid.windows(2) {
                prop_assert!(w[1].probability <= w[0].probability);
            }
        }
    }
}
