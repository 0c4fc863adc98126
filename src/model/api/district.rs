use serde::{Deserialize, Serialize};

use crate::model::district::{District, LocalityCode};

/// A district in listings, without its prefix table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictSummary {
    pub name: String,
    pub description: String,
    pub province: String,
    pub cities: Vec<String>,
}

impl From<&District> for DistrictSummary {
    fn from(district: &District) -> Self {
        Self {
            name: district.name.clone(),
            description: district.description.clone(),
            province: district.province.clone(),
            cities: district.cities.clone(),
        }
    }
}

/// A single district in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictDetail {
    #[serde(flatten)]
    pub summary: DistrictSummary,
    pub localities: Vec<String>,
    pub nik_prefixes: Vec<String>,
    pub locality_codes: Vec<LocalityCode>,
}

impl From<&District> for DistrictDetail {
    fn from(district: &District) -> Self {
        Self {
            summary: district.into(),
            localities: district.localities.clone(),
            nik_prefixes: district.nik_prefixes.clone(),
            locality_codes: district.locality_codes.clone(),
        }
    }
}
