use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use crate::cancel::CancellationToken;
use crate::config::{CropProfile, CropRisk, PriceProfile};
use crate::error::SimulationError;
use crate::types::{Crop, QUINTALS_PER_TON};

/// Draws per parallel work unit. Each chunk owns an independent ChaCha stream,
/// so output depends on the seed only, never on the thread count.
pub const CHUNK_DRAWS: usize = 8192;

/// RNG for chunk `chunk` of `crop` under the run seed.
pub fn chunk_rng(seed: u64, crop: Crop, chunk: usize) -> ChaCha20Rng {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    rng.set_stream((crop.index() << 32) | chunk as u64);
    rng
}

/// Box–Muller standard normal. A zero first uniform is redrawn so `ln` stays finite.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let mut u: f64 = rng.random();
    while u == 0.0 {
        u = rng.random();
    }
    let v: f64 = rng.random();
    (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos()
}

/// Standard normal pair `(z_yield, z_price)` with correlation `rho`.
pub fn correlated_normals<R: Rng + ?Sized>(rng: &mut R, rho: f64) -> (f64, f64) {
    let a = standard_normal(rng);
    let b = standard_normal(rng);
    (a, rho * a + (1.0 - rho * rho).sqrt() * b)
}

/// `mean + sd * z`, floored at 0.
pub fn floored_normal(mean: f64, sd: f64, z: f64) -> f64 {
    (mean + sd * z).max(0.0)
}

/// Two-piece normal: `sd_down` below the mean, `sd_up` at or above it, floored at 0.
pub fn two_piece(mean: f64, sd_down: f64, sd_up: f64, z: f64) -> f64 {
    let sd = if z < 0.0 { sd_down } else { sd_up };
    floored_normal(mean, sd, z)
}

/// Outcome of the per-draw downside shock check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shock {
    #[default]
    None,
    Partial,
    TotalLoss,
}

/// Apply the downside shock to `base_yield` given an independent uniform `u`.
///
/// `u < total_loss_prob` zeroes the yield; otherwise
/// `u < total_loss_prob + partial_loss_prob` scales it by `partial_loss_retained`.
/// The two outcomes partition `[0, 1)`, so they can never both fire.
pub fn apply_shock(base_yield: f64, u: f64, risk: &CropRisk) -> (f64, Shock) {
    if u < risk.total_loss_prob {
        (0.0, Shock::TotalLoss)
    } else if u < risk.total_loss_prob + risk.partial_loss_prob {
        (base_yield * risk.partial_loss_retained, Shock::Partial)
    } else {
        (base_yield, Shock::None)
    }
}

/// One simulated draw for one crop, per hectare.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropDraw {
    pub yield_t: f64,
    pub price: f64,
    pub inputs: f64,
    pub labor: f64,
    pub rent: f64,
    pub shock: Shock,
}

/// Everything needed to sample one crop in one zone.
#[derive(Debug, Clone, Copy)]
pub struct CropSampler<'a> {
    pub crop: Crop,
    pub profile: &'a CropProfile,
    pub price: &'a PriceProfile,
    pub risk: &'a CropRisk,
    pub rent_applies: bool,
}

impl CropSampler<'_> {
    pub fn sample(&self, rng: &mut impl Rng) -> CropDraw {
        let p = self.profile;
        let (z_yield, z_price) = correlated_normals(rng, self.risk.rho);

        let base_qq = two_piece(
            p.yield_mean_qq,
            p.yield_sd_qq * self.risk.yield_down_sd_factor,
            p.yield_sd_qq * self.risk.yield_up_sd_factor,
            z_yield,
        );
        let u: f64 = rng.random();
        let (yield_qq, shock) = apply_shock(base_qq, u, self.risk);

        let price = floored_normal(self.price.price_mean, self.price.price_sd, z_price);
        let inputs = floored_normal(p.cost_inputs_mean, p.cost_inputs_sd, standard_normal(rng));
        let labor = floored_normal(p.cost_labor_mean, p.cost_labor_sd, standard_normal(rng));
        let rent = if self.rent_applies {
            floored_normal(p.cost_rent_mean, p.cost_rent_sd, standard_normal(rng))
        } else {
            0.0
        };

        CropDraw { yield_t: yield_qq / QUINTALS_PER_TON, price, inputs, labor, rent, shock }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShockCounts {
    pub partial: usize,
    pub total_loss: usize,
}

/// Columnar per-hectare draws for one crop. Index `i` across all columns is draw `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct CropDraws {
    pub crop: Crop,
    /// Yield in ton/ha.
    pub yield_t: Vec<f64>,
    /// Price in USD/ton.
    pub price: Vec<f64>,
    pub inputs: Vec<f64>,
    pub labor: Vec<f64>,
    pub rent: Vec<f64>,
    pub shock: Vec<Shock>,
}

impl CropDraws {
    fn zeroed(crop: Crop, n: usize) -> Self {
        CropDraws {
            crop,
            yield_t: vec![0.0; n],
            price: vec![0.0; n],
            inputs: vec![0.0; n],
            labor: vec![0.0; n],
            rent: vec![0.0; n],
            shock: vec![Shock::None; n],
        }
    }

    /// Generate `n` draws in parallel, one ChaCha stream per chunk.
    pub fn generate(
        sampler: &CropSampler<'_>,
        n: usize,
        seed: u64,
        cancel: &CancellationToken,
    ) -> Result<Self, SimulationError> {
        let mut out = CropDraws::zeroed(sampler.crop, n);

        out.yield_t
            .par_chunks_mut(CHUNK_DRAWS)
            .zip(out.price.par_chunks_mut(CHUNK_DRAWS))
            .zip(out.inputs.par_chunks_mut(CHUNK_DRAWS))
            .zip(out.labor.par_chunks_mut(CHUNK_DRAWS))
            .zip(out.rent.par_chunks_mut(CHUNK_DRAWS))
            .zip(out.shock.par_chunks_mut(CHUNK_DRAWS))
            .enumerate()
            .try_for_each(|(k, (((((yields, prices), inputs), labor), rent), shock))| -> Result<(), SimulationError> {
                cancel.check()?;
                let mut rng = chunk_rng(seed, sampler.crop, k);
                for j in 0..yields.len() {
                    let d = sampler.sample(&mut rng);
                    yields[j] = d.yield_t;
                    prices[j] = d.price;
                    inputs[j] = d.inputs;
                    labor[j] = d.labor;
                    rent[j] = d.rent;
                    shock[j] = d.shock;
                }
                Ok(())
            })?;

        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.yield_t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.yield_t.is_empty()
    }

    pub fn shock_counts(&self) -> ShockCounts {
        self.shock.iter().fold(ShockCounts::default(), |mut acc, s| {
            match s {
                Shock::Partial => acc.partial += 1,
                Shock::TotalLoss => acc.total_loss += 1,
                Shock::None => {}
            }
            acc
        })
    }
}
