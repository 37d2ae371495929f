use thiserror::Error;

use crate::types::{Crop, Zone};

/// Invalid reference data or parameters. Always raised before any sampling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no crop profile for zone {zone}, crop {crop}")]
    MissingCropProfile { zone: Zone, crop: Crop },

    #[error("no price profile for crop {0}")]
    MissingPriceProfile(Crop),

    #[error("draw count must be at least 1")]
    ZeroDraws,

    #[error("credit grid needs at least 1 step")]
    ZeroGridSteps,

    #[error("parameter '{name}' must be finite and non-negative, got {value}")]
    NegativeParameter { name: String, value: f64 },

    #[error("probability '{name}' must lie in [0, 1], got {value}")]
    ProbabilityOutOfRange { name: String, value: f64 },

    #[error("{crop}: total-loss ({total}) plus partial-loss ({partial}) probability exceeds 1")]
    ShockProbabilitiesExceedOne { crop: Crop, total: f64, partial: f64 },

    #[error("{crop}: yield/price correlation must lie in [-1, 1], got {rho}")]
    CorrelationOutOfRange { crop: Crop, rho: f64 },

    #[error("red threshold {red} is above target threshold {target}")]
    ThresholdsOutOfOrder { target: f64, red: f64 },

    #[error("hectares of {crop} must be finite and non-negative, got {value}")]
    InvalidHectares { crop: Crop, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("simulation cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_lifts_into_simulation_error() {
        let err: SimulationError = ConfigError::ZeroDraws.into();
        assert_eq!(err, SimulationError::Config(ConfigError::ZeroDraws));
        assert!(err.to_string().contains("draw count"));
    }

    #[test]
    fn missing_profile_message_names_zone_and_crop() {
        let err = ConfigError::MissingCropProfile { zone: Zone::Nea, crop: Crop::Corn };
        let msg = err.to_string();
        assert!(msg.contains("NEA") && msg.contains("corn"), "unexpected message: {msg}");
    }
}
