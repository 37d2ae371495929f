use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Quintals per metric ton. Zonal yields are quoted in qq/ha.
pub const QUINTALS_PER_TON: f64 = 10.0;

/// Agro-climatic zone. A portfolio sits entirely inside one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Zone {
    #[serde(rename = "Núcleo", alias = "nucleo")]
    Nucleo,
    #[serde(rename = "NEA", alias = "nea")]
    Nea,
}

impl Zone {
    pub const ALL: [Zone; 2] = [Zone::Nucleo, Zone::Nea];

    pub fn as_str(self) -> &'static str {
        match self {
            Zone::Nucleo => "Núcleo",
            Zone::Nea => "NEA",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "núcleo" | "nucleo" => Ok(Zone::Nucleo),
            "nea" => Ok(Zone::Nea),
            other => Err(format!("unknown zone '{other}' (expected nucleo or nea)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crop {
    Soy,
    Corn,
}

impl Crop {
    pub const ALL: [Crop; 2] = [Crop::Soy, Crop::Corn];

    /// Stable small integer used to derive per-crop RNG streams.
    pub fn index(self) -> u64 {
        match self {
            Crop::Soy => 0,
            Crop::Corn => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Crop::Soy => "soy",
            Crop::Corn => "corn",
        }
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
