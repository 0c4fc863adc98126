use std::collections::HashSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{is_valid_prefix, District, Nik, Official, RegistryError, ResolveError};

/// The outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub nik: Nik,
    pub locality: String,
    pub district: String,
}

/// A prefix claimed by more than one district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixOverlap {
    pub prefix: String,
    /// The district that wins un-hinted resolution.
    pub first: String,
    /// The district that is shadowed.
    pub second: String,
}

/// Immutable reference data: every district in insertion order, and the
/// officials representing them. Loaded once at launch and shared freely.
#[derive(Debug, Clone)]
pub struct DistrictRegistry {
    districts: Vec<District>,
    officials: Vec<Official>,
    overlaps: Vec<PrefixOverlap>,
}

impl DistrictRegistry {
    /// Validate and index the given reference data.
    ///
    /// Prefixes shared between districts are not fatal here: they are
    /// logged and recorded, and un-hinted resolution keeps returning the
    /// earliest district. Use [`DistrictRegistry::strict`] to reject them.
    pub fn new(districts: Vec<District>, officials: Vec<Official>) -> Result<Self, RegistryError> {
        let mut names = HashSet::new();
        for district in districts.iter() {
            if !names.insert(district.name.as_str()) {
                return Err(RegistryError::DuplicateName(district.name.clone()));
            }
            if let Some(prefix) = district.nik_prefixes.iter().find(|p| !is_valid_prefix(p)) {
                return Err(RegistryError::MalformedPrefix {
                    district: district.name.clone(),
                    prefix: prefix.clone(),
                });
            }
            if let Some(code) = district
                .locality_codes
                .iter()
                .find(|code| !district.contains_prefix(&code.prefix))
            {
                return Err(RegistryError::ForeignLocalityCode {
                    district: district.name.clone(),
                    prefix: code.prefix.clone(),
                });
            }
        }

        let overlaps = find_overlaps(&districts);
        for overlap in overlaps.iter() {
            warn!(
                "NIK prefix {} is claimed by both '{}' and '{}'; resolving to '{}'",
                overlap.prefix, overlap.first, overlap.second, overlap.first
            );
        }
        debug!(
            "Loaded {} districts and {} officials",
            districts.len(),
            officials.len()
        );

        Ok(Self {
            districts,
            officials,
            overlaps,
        })
    }

    /// Reject this registry if any prefix is claimed by two districts.
    pub fn strict(self) -> Result<Self, RegistryError> {
        if self.overlaps.is_empty() {
            Ok(self)
        } else {
            Err(RegistryError::Overlapping(self.overlaps))
        }
    }

    /// Resolve an identity number to its district and locality, optionally
    /// constrained to a single named district.
    pub fn resolve(&self, nik: &str, hint: Option<&str>) -> Result<Resolution, ResolveError> {
        let nik = Nik::parse(nik)?;
        let prefix = nik.prefix();

        let district = match hint {
            Some(name) => {
                let district = self
                    .district(name)
                    .ok_or_else(|| ResolveError::UnknownDistrict(name.to_string()))?;
                if !district.contains_prefix(prefix) {
                    return Err(ResolveError::PrefixNotInDistrict {
                        prefix: prefix.to_string(),
                        district: district.name.clone(),
                    });
                }
                district
            }
            None => self
                .districts
                .iter()
                .find(|d| d.contains_prefix(prefix))
                .ok_or_else(|| ResolveError::NoMatchingDistrict(prefix.to_string()))?,
        };

        Ok(Resolution {
            locality: district.locality_for(prefix).to_string(),
            district: district.name.clone(),
            nik,
        })
    }

    /// Look up a district by its exact name.
    pub fn district(&self, name: &str) -> Option<&District> {
        self.districts.iter().find(|d| d.name == name)
    }

    /// All districts, in insertion order.
    pub fn districts(&self) -> &[District] {
        &self.districts
    }

    /// Officials representing the named district, including those elected
    /// for its province or one of its cities.
    pub fn officials_for(&self, name: &str) -> Option<Vec<&Official>> {
        let district = self.district(name)?;
        Some(
            self.officials
                .iter()
                .filter(|o| district.covers_area(&o.electoral_district))
                .collect(),
        )
    }

    pub fn overlaps(&self) -> &[PrefixOverlap] {
        &self.overlaps
    }
}

fn find_overlaps(districts: &[District]) -> Vec<PrefixOverlap> {
    let mut overlaps = Vec::new();
    for (i, later) in districts.iter().enumerate() {
        let mut seen = HashSet::new();
        for prefix in later.nik_prefixes.iter() {
            if !seen.insert(prefix) {
                continue;
            }
            if let Some(earlier) = districts[..i].iter().find(|d| d.contains_prefix(prefix)) {
                overlaps.push(PrefixOverlap {
                    prefix: prefix.clone(),
                    first: earlier.name.clone(),
                    second: later.name.clone(),
                });
            }
        }
    }
    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::district::LocalityCode;

    fn district(name: &str, prefixes: &[&str], codes: &[(&str, &str)]) -> District {
        District {
            name: name.to_string(),
            description: String::new(),
            province: "Jawa Timur".to_string(),
            cities: vec![],
            localities: codes.iter().map(|(_, l)| l.to_string()).collect(),
            nik_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            locality_codes: codes
                .iter()
                .map(|(p, l)| LocalityCode {
                    prefix: p.to_string(),
                    locality: l.to_string(),
                })
                .collect(),
        }
    }

    fn two_districts() -> DistrictRegistry {
        DistrictRegistry::new(
            vec![
                district("D1", &["357301", "357302"], &[("357301", "Alpha")]),
                district("D2", &["357801"], &[]),
            ],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn reference_prefixes_are_disjoint() {
        let registry = DistrictRegistry::reference();
        assert!(registry.overlaps().is_empty());
        let mut all = HashSet::new();
        for district in registry.districts() {
            for prefix in district.nik_prefixes.iter() {
                assert!(all.insert(prefix), "prefix {prefix} appears twice");
            }
        }
        assert!(registry.clone().strict().is_ok());
    }

    #[test]
    fn malang_prefix_resolves_for_any_suffix() {
        let registry = DistrictRegistry::reference();
        for suffix in ["0000000000", "0101900001", "9999999999", "1234567890"] {
            let nik = format!("357301{suffix}");
            let resolution = registry.resolve(&nik, None).unwrap();
            assert_eq!(resolution.district, "JAWA TIMUR VI");
            assert_eq!(resolution.locality, "Klojen");
        }
    }

    #[test]
    fn reference_locality_codes() {
        let registry = DistrictRegistry::reference();
        let expected = [
            ("357301", "Klojen"),
            ("357302", "Blimbing"),
            ("357303", "Kedungkandang"),
            ("357304", "Sukun"),
            ("357305", "Lowokwaru"),
        ];
        for (prefix, locality) in expected {
            let resolution = registry.resolve(&format!("{prefix}0101900001"), None).unwrap();
            assert_eq!(resolution.locality, locality);
        }
    }

    #[test]
    fn unmapped_prefix_defaults_to_district_name() {
        let registry = DistrictRegistry::reference();
        let resolution = registry.resolve("3507120101900001", None).unwrap();
        assert_eq!(resolution.district, "JAWA TIMUR VI");
        assert_eq!(resolution.locality, "JAWA TIMUR VI");

        let resolution = registry.resolve("3515030101900001", None).unwrap();
        assert_eq!(resolution.district, "JAWA TIMUR I");
        assert_eq!(resolution.locality, "JAWA TIMUR I");
    }

    #[test]
    fn malformed_never_matches() {
        let registry = two_districts();
        for nik in ["357301", "35730101019000011", "357301010190000x", "357301 101900001"] {
            assert_eq!(
                registry.resolve(nik, None),
                Err(ResolveError::MalformedIdentifier)
            );
            assert_eq!(
                registry.resolve(nik, Some("D1")),
                Err(ResolveError::MalformedIdentifier)
            );
        }
    }

    #[test]
    fn hint_constrains_resolution() {
        let registry = two_districts();
        assert_eq!(
            registry.resolve("3573010101900001", Some("D1")),
            Ok(Resolution {
                nik: Nik::parse("3573010101900001").unwrap(),
                locality: "Alpha".to_string(),
                district: "D1".to_string(),
            })
        );
        // The prefix belongs to D2, but D1 was requested.
        assert_eq!(
            registry.resolve("3578010101900001", Some("D1")),
            Err(ResolveError::PrefixNotInDistrict {
                prefix: "357801".to_string(),
                district: "D1".to_string(),
            })
        );
        assert_eq!(
            registry.resolve("3573010101900001", Some("D9")),
            Err(ResolveError::UnknownDistrict("D9".to_string()))
        );
    }

    #[test]
    fn unknown_prefix() {
        let registry = two_districts();
        assert_eq!(
            registry.resolve("1101010101900001", None),
            Err(ResolveError::NoMatchingDistrict("110101".to_string()))
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let registry = DistrictRegistry::reference();
        for nik in ["3573050101900001", "3579020101900001", "9999990101900001", "abc"] {
            assert_eq!(registry.resolve(nik, None), registry.resolve(nik, None));
        }
    }

    #[test]
    fn overlapping_prefixes_first_match_wins() {
        let registry = DistrictRegistry::new(
            vec![
                district("WIDE", &["357301", "357302"], &[]),
                district("NARROW", &["357301"], &[("357301", "Klojen")]),
            ],
            vec![],
        )
        .unwrap();
        assert_eq!(
            registry.overlaps(),
            &[PrefixOverlap {
                prefix: "357301".to_string(),
                first: "WIDE".to_string(),
                second: "NARROW".to_string(),
            }]
        );
        let resolution = registry.resolve("3573010101900001", None).unwrap();
        assert_eq!(resolution.district, "WIDE");
        // The shadowed district is still reachable with a hint.
        let resolution = registry.resolve("3573010101900001", Some("NARROW")).unwrap();
        assert_eq!(resolution.locality, "Klojen");

        assert!(matches!(
            registry.strict(),
            Err(RegistryError::Overlapping(overlaps)) if overlaps.len() == 1
        ));
    }

    #[test]
    fn rejects_bad_reference_data() {
        let result = DistrictRegistry::new(
            vec![district("D1", &["357301"], &[]), district("D1", &["357302"], &[])],
            vec![],
        );
        assert_eq!(result.unwrap_err(), RegistryError::DuplicateName("D1".into()));

        let result = DistrictRegistry::new(vec![district("D1", &["35730"], &[])], vec![]);
        assert!(matches!(result, Err(RegistryError::MalformedPrefix { .. })));

        let result = DistrictRegistry::new(
            vec![district("D1", &["357301"], &[("357302", "Blimbing")])],
            vec![],
        );
        assert!(matches!(result, Err(RegistryError::ForeignLocalityCode { .. })));
    }

    #[test]
    fn officials_by_area() {
        let registry = DistrictRegistry::reference();
        let officials = registry.officials_for("JAWA TIMUR VI").unwrap();
        let names: Vec<_> = officials.iter().map(|o| o.name.as_str()).collect();
        assert!(names.contains(&"Dr. Gamal Albinsaid")); // district
        assert!(names.contains(&"Drs. H. Sutiaji")); // city
        assert!(names.contains(&"Khofifah Indar Parawansa")); // province

        let officials = registry.officials_for("JAWA TIMUR I").unwrap();
        assert!(officials.iter().all(|o| o.electoral_district == "Jawa Timur"));

        assert!(registry.officials_for("NOWHERE").is_none());
    }
}
