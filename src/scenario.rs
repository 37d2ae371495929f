use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::config::{CreditBase, ReferenceData, SimulationParameters};
use crate::error::{ConfigError, SimulationError};
use crate::types::{Crop, Zone};
use crate::variates::{CropDraws, CropSampler};

/// The farm being financed. Owned by the caller; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioInput {
    pub zone: Zone,
    pub ha_soy: f64,
    pub ha_corn: f64,
    pub rent_applies: bool,
}

impl PortfolioInput {
    pub fn hectares(&self, crop: Crop) -> f64 {
        match crop {
            Crop::Soy => self.ha_soy,
            Crop::Corn => self.ha_corn,
        }
    }

    pub fn total_hectares(&self) -> f64 {
        self.ha_soy + self.ha_corn
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for crop in Crop::ALL {
            let value = self.hectares(crop);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidHectares { crop, value });
            }
        }
        Ok(())
    }
}

/// Deterministic financing needs, computed from mean costs only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Needs {
    pub inputs_usd: f64,
    pub working_capital_usd: f64,
    pub cost_total_usd: f64,
}

impl Needs {
    pub fn from_means(reference: &ReferenceData, input: &PortfolioInput) -> Result<Self, ConfigError> {
        let mut needs = Needs::default();
        for crop in Crop::ALL {
            let ha = input.hectares(crop);
            let p = reference.crop_profile(input.zone, crop)?;
            needs.inputs_usd += ha * p.cost_inputs_mean;
            needs.working_capital_usd += ha * p.working_capital_mean(input.rent_applies);
            needs.cost_total_usd += ha * p.cost_total_mean;
        }
        Ok(needs)
    }

    /// Amount the credit grid percentages refer to.
    pub fn credit_base(&self, base: CreditBase) -> f64 {
        match base {
            CreditBase::NeedInputs => self.inputs_usd,
            CreditBase::WorkingCapital => self.working_capital_usd,
        }
    }
}

/// Whole-portfolio outcome per draw, stored column-wise (USD).
/// Owned by a single run and dropped with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenarios {
    pub revenue: Vec<f64>,
    pub inputs: Vec<f64>,
    /// Labor + rent: the obligations serviced from revenue ahead of credit.
    pub rest: Vec<f64>,
}

impl Scenarios {
    /// Weight each crop's per-hectare draws by its hectares and sum across crops.
    pub fn aggregate(n: usize, crops: &[(f64, &CropDraws)]) -> Self {
        let mut s = Scenarios { revenue: vec![0.0; n], inputs: vec![0.0; n], rest: vec![0.0; n] };

        s.revenue
            .par_iter_mut()
            .zip(s.inputs.par_iter_mut())
            .zip(s.rest.par_iter_mut())
            .enumerate()
            .for_each(|(i, ((revenue, inputs), rest))| {
                for &(ha, d) in crops {
                    *revenue += ha * d.yield_t[i] * d.price[i];
                    *inputs += ha * d.inputs[i];
                    *rest += ha * (d.labor[i] + d.rent[i]);
                }
            });

        s
    }

    /// Sample both crops and aggregate. Crops with zero hectares are not sampled.
    pub fn simulate(
        reference: &ReferenceData,
        params: &SimulationParameters,
        input: &PortfolioInput,
        seed: u64,
        cancel: &CancellationToken,
    ) -> Result<Self, SimulationError> {
        let mut draws = Vec::with_capacity(Crop::ALL.len());
        for crop in Crop::ALL {
            let ha = input.hectares(crop);
            if ha == 0.0 {
                continue;
            }
            let sampler = CropSampler {
                crop,
                profile: reference.crop_profile(input.zone, crop)?,
                price: reference.price_profile(crop)?,
                risk: params.risk(crop),
                rent_applies: input.rent_applies,
            };
            let d = CropDraws::generate(&sampler, params.draws, seed, cancel)?;
            let shocks = d.shock_counts();
            debug!(%crop, ha, partial = shocks.partial, total_loss = shocks.total_loss, "crop draws generated");
            draws.push((ha, d));
        }

        let refs: Vec<(f64, &CropDraws)> = draws.iter().map(|(ha, d)| (*ha, d)).collect();
        Ok(Scenarios::aggregate(params.draws, &refs))
    }

    pub fn len(&self) -> usize {
        self.revenue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revenue.is_empty()
    }

    pub fn total_cost(&self, i: usize) -> f64 {
        self.inputs[i] + self.rest[i]
    }

    pub fn margin(&self, i: usize) -> f64 {
        self.revenue[i] - self.total_cost(i)
    }

    pub fn margins(&self) -> Vec<f64> {
        (0..self.len()).into_par_iter().map(|i| self.margin(i)).collect()
    }
}
