use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bands::{self, Recommendation, RiskBands};
use crate::cancel::CancellationToken;
use crate::config::{CreditBase, ReferenceData, SimulationParameters};
use crate::error::{ConfigError, SimulationError};
use crate::grid::{self, CreditGridPoint};
use crate::outcomes::{self, DistStats, Insights};
use crate::scenario::{Needs, PortfolioInput, Scenarios};

/// Everything the presentation layer needs from one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    #[serde(flatten)]
    pub portfolio: PortfolioInput,
    pub seed: u64,
    pub draws: usize,
    pub credit_base: CreditBase,
    #[serde(rename = "creditBaseUSD")]
    pub credit_base_usd: f64,
    #[serde(rename = "needInputsUSD")]
    pub need_inputs_usd: f64,
    #[serde(rename = "needWorkingCapitalUSD")]
    pub need_working_capital_usd: f64,
    #[serde(rename = "costTotalUSD")]
    pub cost_total_usd: f64,
    /// Absent when no credit level meets the target probability.
    pub recommendation: Option<Recommendation>,
    pub bands: RiskBands,
    pub insights: Insights,
    pub grid: Vec<CreditGridPoint>,
}

/// How stable the recommendation is across a seed sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub runs: usize,
    pub no_recommendation: usize,
    /// Over runs that produced a recommendation.
    pub max_credit_pct: Option<DistStats>,
    /// Green band length in grid points, 0 when absent.
    pub green_len: Option<DistStats>,
}

impl SweepSummary {
    pub fn from_results(results: &[SimulationResult]) -> Self {
        let pcts: Vec<f64> = results.iter().filter_map(|r| r.recommendation).map(|r| r.max_credit_pct).collect();
        let green: Vec<f64> = results
            .iter()
            .map(|r| r.bands.green.map_or(0.0, |g| g.len() as f64))
            .collect();
        SweepSummary {
            runs: results.len(),
            no_recommendation: results.len() - pcts.len(),
            max_credit_pct: outcomes::dist_stats(pcts),
            green_len: outcomes::dist_stats(green),
        }
    }
}

/// Monte Carlo credit engine. Stateless between runs: each call to
/// [`Engine::run`] allocates its own draw buffers and drops them on return.
pub struct Engine {
    reference: ReferenceData,
    params: SimulationParameters,
    seed: Option<u64>,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(reference: ReferenceData, params: SimulationParameters) -> Self {
        Engine { reference, params, seed: None, cancel: CancellationToken::new() }
    }

    /// Canonical reference tables with default parameters.
    pub fn canonical() -> Self {
        Self::new(ReferenceData::canonical(), SimulationParameters::default())
    }

    /// Fix the seed for reproducible runs. Without it every run draws a fresh
    /// seed from OS entropy and reports it in the result.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// All configuration checks, performed before any sampling.
    pub fn validate(&self, input: &PortfolioInput) -> Result<(), ConfigError> {
        self.params.validate()?;
        input.validate()?;
        self.reference.validate_zone(input.zone)
    }

    pub fn run(&self, input: &PortfolioInput) -> Result<SimulationResult, SimulationError> {
        let seed = self.seed.unwrap_or_else(rand::random);
        self.run_with_seed(input, seed)
    }

    pub fn run_with_seed(&self, input: &PortfolioInput, seed: u64) -> Result<SimulationResult, SimulationError> {
        self.validate(input)?;
        let params = &self.params;

        info!(
            zone = %input.zone,
            ha_soy = input.ha_soy,
            ha_corn = input.ha_corn,
            rent = input.rent_applies,
            draws = params.draws,
            seed,
            "simulation started"
        );
        if input.total_hectares() == 0.0 {
            warn!("portfolio has no hectares; result is degenerate");
        }

        let needs = Needs::from_means(&self.reference, input)?;
        let base = needs.credit_base(params.credit_base);
        debug!(
            inputs = needs.inputs_usd,
            working_capital = needs.working_capital_usd,
            cost_total = needs.cost_total_usd,
            base,
            "deterministic needs"
        );

        let scenarios = Scenarios::simulate(&self.reference, params, input, seed, &self.cancel)?;
        let grid = grid::scan_credit_grid(&scenarios, base, params.interest_rate, params.grid_steps, &self.cancel)?;
        let (recommendation, bands) = bands::classify(&grid, params.target_prob, params.red_prob);
        let insights = outcomes::summarize(scenarios.margins());
        drop(scenarios);

        match &recommendation {
            Some(r) => info!(max_credit_pct = r.max_credit_pct, max_credit_amt = r.max_credit_amt, "simulation finished"),
            None => info!(target = params.target_prob, "simulation finished; no credit level meets the target"),
        }

        Ok(SimulationResult {
            portfolio: input.clone(),
            seed,
            draws: params.draws,
            credit_base: params.credit_base,
            credit_base_usd: base,
            need_inputs_usd: needs.inputs_usd,
            need_working_capital_usd: needs.working_capital_usd,
            cost_total_usd: needs.cost_total_usd,
            recommendation,
            bands,
            insights,
            grid,
        })
    }

    /// Run the same portfolio under `runs` consecutive seeds from `start_seed`, in parallel.
    pub fn sweep_seeds(
        &self,
        input: &PortfolioInput,
        start_seed: u64,
        runs: u64,
    ) -> Result<Vec<SimulationResult>, SimulationError> {
        self.validate(input)?;
        (0..runs)
            .into_par_iter()
            .map(|k| self.run_with_seed(input, start_seed.wrapping_add(k)))
            .collect()
    }
}
