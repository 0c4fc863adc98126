use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::ResolveError;

/// Number of digits in a national identity number.
pub const NIK_LENGTH: usize = 16;

/// Number of leading digits encoding the administrative region.
pub const PREFIX_LENGTH: usize = 6;

/// A citizen's national identity number (NIK), guaranteed to be exactly
/// [`NIK_LENGTH`] ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nik(String);

impl Nik {
    /// Validate a raw identity number.
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        if raw.len() != NIK_LENGTH || !is_digits(raw) {
            return Err(ResolveError::MalformedIdentifier);
        }
        Ok(Self(raw.to_string()))
    }

    /// The region prefix: the first [`PREFIX_LENGTH`] digits.
    pub fn prefix(&self) -> &str {
        &self.0[..PREFIX_LENGTH]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Nik {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Nik {
    type Error = ResolveError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<Nik> for String {
    fn from(nik: Nik) -> Self {
        nik.0
    }
}

/// Is this a well-formed region prefix?
pub fn is_valid_prefix(prefix: &str) -> bool {
    prefix.len() == PREFIX_LENGTH && is_digits(prefix)
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_sixteen_digits() {
        let nik = Nik::parse("3573010101900001").unwrap();
        assert_eq!(nik.prefix(), "357301");
        assert_eq!(nik.as_str(), "3573010101900001");
    }

    #[test]
    fn rejects_bad_lengths() {
        for raw in ["", "357301", "357301010190000", "35730101019000011"] {
            assert_eq!(Nik::parse(raw), Err(ResolveError::MalformedIdentifier));
        }
    }

    #[test]
    fn rejects_non_digits() {
        for raw in [
            "35730101019000a1",
            "3573 10101900001",
            "-573010101900001",
            "357301010190000١", // Arabic-indic digit, multi-byte
        ] {
            assert_eq!(Nik::parse(raw), Err(ResolveError::MalformedIdentifier));
        }
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<Nik, _> = rocket::serde::json::serde_json::from_str("\"3507010101900001\"");
        assert!(ok.is_ok());
        let bad: Result<Nik, _> = rocket::serde::json::serde_json::from_str("\"12345\"");
        assert!(bad.is_err());
    }
}
