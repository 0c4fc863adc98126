//! Electoral districts (dapil) and the resolution of identity numbers to them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod nik;
pub use nik::{is_valid_prefix, Nik, NIK_LENGTH, PREFIX_LENGTH};

mod reference;
pub use reference::{reference_districts, reference_officials};

mod registry;
pub use registry::{DistrictRegistry, PrefixOverlap, Resolution};

/// A fixed mapping from a region prefix to the precise locality it encodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalityCode {
    pub prefix: String,
    pub locality: String,
}

/// An electoral district, as seeded into the reference dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    /// Unique, human-readable label, e.g. "JAWA TIMUR VI".
    pub name: String,
    pub description: String,
    pub province: String,
    /// Municipalities covered by the district.
    pub cities: Vec<String>,
    /// Member localities (kecamatan).
    pub localities: Vec<String>,
    /// Every identity number prefix that maps into this district.
    pub nik_prefixes: Vec<String>,
    /// Precise locality names for prefixes belonging to a specific municipality.
    /// Prefixes without an entry resolve to the district's own name.
    #[serde(default)]
    pub locality_codes: Vec<LocalityCode>,
}

impl District {
    /// Does this district own the given region prefix?
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.nik_prefixes.iter().any(|p| p == prefix)
    }

    /// The locality a prefix resolves to within this district.
    pub fn locality_for(&self, prefix: &str) -> &str {
        self.locality_codes
            .iter()
            .find(|code| code.prefix == prefix)
            .map(|code| code.locality.as_str())
            .unwrap_or(&self.name)
    }

    /// Is the given electoral area label this district, its province, or one of its cities?
    fn covers_area(&self, area: &str) -> bool {
        self.name.eq_ignore_ascii_case(area)
            || self.province.eq_ignore_ascii_case(area)
            || self.cities.iter().any(|city| city.eq_ignore_ascii_case(area))
    }
}

/// The body an official sits in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficialRole {
    /// Regional legislature.
    Dprd,
    /// National legislature.
    Dpri,
    /// Regional executive (governor, mayor and their deputies).
    PimpinanDaerah,
}

/// An elected official representing some electoral area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Official {
    pub name: String,
    pub position: String,
    pub party: Option<String>,
    pub role: OfficialRole,
    /// A district name, province, or city.
    pub electoral_district: String,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

/// Reasons an identity number cannot be resolved to a district.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("NIK must be exactly 16 digits")]
    MalformedIdentifier,
    #[error("No district named '{0}'")]
    UnknownDistrict(String),
    #[error("NIK prefix {prefix} does not belong to district '{district}'")]
    PrefixNotInDistrict { prefix: String, district: String },
    #[error("No district owns NIK prefix {0}")]
    NoMatchingDistrict(String),
}

impl ResolveError {
    /// Stable name of the failure, for the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedIdentifier => "MalformedIdentifier",
            Self::UnknownDistrict(_) => "UnknownDistrict",
            Self::PrefixNotInDistrict { .. } => "PrefixNotInDistrict",
            Self::NoMatchingDistrict(_) => "NoMatchingDistrict",
        }
    }
}

/// Defects in reference data that make it unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("District name '{0}' appears more than once")]
    DuplicateName(String),
    #[error("District '{district}' has malformed prefix '{prefix}'")]
    MalformedPrefix { district: String, prefix: String },
    #[error("District '{district}' maps prefix {prefix} to a locality but does not own it")]
    ForeignLocalityCode { district: String, prefix: String },
    #[error("{} overlapping prefixes between districts", .0.len())]
    Overlapping(Vec<PrefixOverlap>),
}
