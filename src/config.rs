use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Crop, Zone};

/// Per-hectare agronomic and cost parameters for one (zone, crop) pair.
/// Yields in quintals/ha, costs in USD/ha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub yield_mean_qq: f64,
    pub yield_sd_qq: f64,
    pub cost_total_mean: f64,
    pub cost_total_sd: f64,
    pub cost_inputs_mean: f64,
    pub cost_inputs_sd: f64,
    pub cost_labor_mean: f64,
    pub cost_labor_sd: f64,
    pub cost_rent_mean: f64,
    pub cost_rent_sd: f64,
}

impl CropProfile {
    /// Mean per-hectare working capital: inputs + labor (+ rent if it applies).
    pub fn working_capital_mean(&self, rent_applies: bool) -> f64 {
        let rent = if rent_applies { self.cost_rent_mean } else { 0.0 };
        self.cost_inputs_mean + self.cost_labor_mean + rent
    }
}

/// Price parameters in USD/ton.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceProfile {
    pub price_mean: f64,
    pub price_sd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonalRow {
    pub zone: Zone,
    pub crop: Crop,
    pub profile: CropProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub crop: Crop,
    pub profile: PriceProfile,
}

/// Static zonal and price tables handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub zonal: Vec<ZonalRow>,
    pub prices: Vec<PriceRow>,
}

impl ReferenceData {
    pub fn canonical() -> Self {
        // ── Zonal table (yield qq/ha, costs USD/ha) ──────────────────────────
        // Rent is charged per hectare at the zone's reference rate; labor is
        // the contractor rate for the full campaign.
        let row = |zone, crop, p: [f64; 10]| ZonalRow {
            zone,
            crop,
            profile: CropProfile {
                yield_mean_qq: p[0],
                yield_sd_qq: p[1],
                cost_total_mean: p[2],
                cost_total_sd: p[3],
                cost_inputs_mean: p[4],
                cost_inputs_sd: p[5],
                cost_labor_mean: p[6],
                cost_labor_sd: p[7],
                cost_rent_mean: p[8],
                cost_rent_sd: p[9],
            },
        };

        ReferenceData {
            zonal: vec![
                //                           y_mean y_sd  tot_mean tot_sd  in_mean in_sd  lab_mean lab_sd rent_mean rent_sd
                row(Zone::Nucleo, Crop::Soy,  [40.0, 5.0, 1027.6, 120.0, 234.3, 50.0, 53.9, 15.0, 520.1, 70.0]),
                row(Zone::Nucleo, Crop::Corn, [10.0, 6.0, 1491.0, 150.0, 470.9, 94.0, 53.9, 15.0, 520.1, 70.0]),
                row(Zone::Nea,    Crop::Soy,  [26.0, 3.0,  584.8,  58.0, 277.1, 30.0, 85.1, 10.0, 133.7, 30.0]),
                row(Zone::Nea,    Crop::Corn, [59.0, 2.5, 1071.3, 100.0, 442.1, 44.0, 76.1,  9.0, 133.7, 30.0]),
            ],
            prices: vec![
                PriceRow { crop: Crop::Soy,  profile: PriceProfile { price_mean: 320.0, price_sd: 15.0 } },
                PriceRow { crop: Crop::Corn, profile: PriceProfile { price_mean: 172.5, price_sd: 8.5 } },
            ],
        }
    }

    pub fn crop_profile(&self, zone: Zone, crop: Crop) -> Result<&CropProfile, ConfigError> {
        self.zonal
            .iter()
            .find(|r| r.zone == zone && r.crop == crop)
            .map(|r| &r.profile)
            .ok_or(ConfigError::MissingCropProfile { zone, crop })
    }

    pub fn price_profile(&self, crop: Crop) -> Result<&PriceProfile, ConfigError> {
        self.prices
            .iter()
            .find(|r| r.crop == crop)
            .map(|r| &r.profile)
            .ok_or(ConfigError::MissingPriceProfile(crop))
    }

    /// Check every profile needed for `zone` exists and carries sane numbers.
    pub fn validate_zone(&self, zone: Zone) -> Result<(), ConfigError> {
        for crop in Crop::ALL {
            let p = self.crop_profile(zone, crop)?;
            let prefix = format!("{zone}.{crop}");
            for (name, value) in [
                ("yield_mean_qq", p.yield_mean_qq),
                ("yield_sd_qq", p.yield_sd_qq),
                ("cost_total_mean", p.cost_total_mean),
                ("cost_total_sd", p.cost_total_sd),
                ("cost_inputs_mean", p.cost_inputs_mean),
                ("cost_inputs_sd", p.cost_inputs_sd),
                ("cost_labor_mean", p.cost_labor_mean),
                ("cost_labor_sd", p.cost_labor_sd),
                ("cost_rent_mean", p.cost_rent_mean),
                ("cost_rent_sd", p.cost_rent_sd),
            ] {
                non_negative(&format!("{prefix}.{name}"), value)?;
            }
            let price = self.price_profile(crop)?;
            non_negative(&format!("{crop}.price_mean"), price.price_mean)?;
            non_negative(&format!("{crop}.price_sd"), price.price_sd)?;
        }
        Ok(())
    }
}

/// Amount against which credit-grid percentages are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditBase {
    /// Hectare-weighted mean input cost. Credit finances inputs only; labor and
    /// rent are serviced from revenue ahead of the credit.
    #[default]
    NeedInputs,
    /// Hectare-weighted mean working capital (inputs + labor + rent if it applies).
    WorkingCapital,
}

/// Per-crop stochastic shape: yield/price correlation, yield asymmetry and
/// downside shocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropRisk {
    /// Correlation between the yield and price standard normals.
    pub rho: f64,
    /// Multiplier on the zonal yield sd applied below the mean, not an absolute sd:
    /// `sd_down = yield_sd_qq × yield_down_sd_factor`.
    pub yield_down_sd_factor: f64,
    /// Multiplier on the zonal yield sd applied at or above the mean:
    /// `sd_up = yield_sd_qq × yield_up_sd_factor`.
    pub yield_up_sd_factor: f64,
    /// Probability of a total crop loss (yield forced to 0).
    pub total_loss_prob: f64,
    /// Probability of a partial loss, disjoint from total loss.
    pub partial_loss_prob: f64,
    /// Fraction of yield retained after a partial loss.
    pub partial_loss_retained: f64,
}

impl Default for CropRisk {
    fn default() -> Self {
        CropRisk {
            rho: -0.05,
            yield_down_sd_factor: 1.25,
            yield_up_sd_factor: 0.75,
            total_loss_prob: 0.005,
            partial_loss_prob: 0.03,
            partial_loss_retained: 0.45,
        }
    }
}

impl CropRisk {
    /// Shape with no asymmetry and no shocks: plain correlated normals.
    pub fn symmetric(rho: f64) -> Self {
        CropRisk {
            rho,
            yield_down_sd_factor: 1.0,
            yield_up_sd_factor: 1.0,
            total_loss_prob: 0.0,
            partial_loss_prob: 0.0,
            partial_loss_retained: 1.0,
        }
    }

    fn validate(&self, crop: Crop) -> Result<(), ConfigError> {
        if !(-1.0..=1.0).contains(&self.rho) {
            return Err(ConfigError::CorrelationOutOfRange { crop, rho: self.rho });
        }
        non_negative(&format!("{crop}.yield_down_sd_factor"), self.yield_down_sd_factor)?;
        non_negative(&format!("{crop}.yield_up_sd_factor"), self.yield_up_sd_factor)?;
        probability(&format!("{crop}.total_loss_prob"), self.total_loss_prob)?;
        probability(&format!("{crop}.partial_loss_prob"), self.partial_loss_prob)?;
        probability(&format!("{crop}.partial_loss_retained"), self.partial_loss_retained)?;
        if self.total_loss_prob + self.partial_loss_prob > 1.0 {
            return Err(ConfigError::ShockProbabilitiesExceedOne {
                crop,
                total: self.total_loss_prob,
                partial: self.partial_loss_prob,
            });
        }
        Ok(())
    }
}

/// Engine-wide constants. Every field has a documented default; a JSON
/// parameter file only needs the fields it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    /// Monte Carlo draw count N.
    pub draws: usize,
    /// Number of equally spaced credit levels from 0% to 100% of the base.
    pub grid_steps: usize,
    /// Interest charged on the credit amount over the campaign.
    pub interest_rate: f64,
    pub credit_base: CreditBase,
    /// Green band / recommendation threshold T.
    pub target_prob: f64,
    /// Red band threshold R.
    pub red_prob: f64,
    pub soy: CropRisk,
    pub corn: CropRisk,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        SimulationParameters {
            draws: 100_000,
            grid_steps: 21,
            interest_rate: 0.08,
            credit_base: CreditBase::NeedInputs,
            target_prob: 0.85,
            red_prob: 0.60,
            soy: CropRisk::default(),
            corn: CropRisk::default(),
        }
    }
}

impl SimulationParameters {
    pub fn risk(&self, crop: Crop) -> &CropRisk {
        match crop {
            Crop::Soy => &self.soy,
            Crop::Corn => &self.corn,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.draws == 0 {
            return Err(ConfigError::ZeroDraws);
        }
        if self.grid_steps == 0 {
            return Err(ConfigError::ZeroGridSteps);
        }
        non_negative("interest_rate", self.interest_rate)?;
        probability("target_prob", self.target_prob)?;
        probability("red_prob", self.red_prob)?;
        if self.red_prob > self.target_prob {
            return Err(ConfigError::ThresholdsOutOfOrder {
                target: self.target_prob,
                red: self.red_prob,
            });
        }
        for crop in Crop::ALL {
            self.risk(crop).validate(crop)?;
        }
        Ok(())
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativeParameter { name: name.to_string(), value })
    }
}

fn probability(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange { name: name.to_string(), value })
    }
}
