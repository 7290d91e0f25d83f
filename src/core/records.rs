use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::utils::format_hex_spaced;

/// Number of digits in an identity number
pub const IDENTITY_NUMBER_DIGITS: usize = 12;

/// Twelve digit identity number read from the card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityNumber(String);

impl IdentityNumber {
    /// Wrap a digit string, returning `None` unless it has exactly
    /// [`IDENTITY_NUMBER_DIGITS`] ASCII digits.
    pub fn new(digits: impl Into<String>) -> Option<Self> {
        let digits = digits.into();
        if digits.len() == IDENTITY_NUMBER_DIGITS && digits.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(digits))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the last digit matches the check digit computed from the
    /// first eleven.
    pub fn has_valid_check_digit(&self) -> bool {
        let digits: Option<Vec<u32>> = self.0.chars().map(|c| c.to_digit(10)).collect();
        let Some(digits) = digits.filter(|d| d.len() == IDENTITY_NUMBER_DIGITS) else {
            return false;
        };
        let (body, check) = digits.split_at(IDENTITY_NUMBER_DIGITS - 1);

        let sum: u32 = body
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &digit)| {
                let n = i as u32 + 1;
                let weight = if n <= 6 { n + 1 } else { n - 5 };
                digit * weight
            })
            .sum();

        let remainder = sum % 11;
        let expected = if remainder <= 1 { 0 } else { 11 - remainder };
        check[0] == expected
    }
}

impl TryFrom<String> for IdentityNumber {
    type Error = String;

    fn try_from(digits: String) -> Result<Self, Self::Error> {
        Self::new(digits.as_str())
            .ok_or_else(|| format!("identity number must be {IDENTITY_NUMBER_DIGITS} digits, got {digits:?}"))
    }
}

impl From<IdentityNumber> for String {
    fn from(number: IdentityNumber) -> Self {
        number.0
    }
}

impl fmt::Display for IdentityNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sex category according to the ISO 5218 code stored on the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SexCategory {
    Male,
    Female,
    NotApplicable,
    Unknown,
}

impl SexCategory {
    /// Interpret an ISO 5218 code. Never fails: anything that is not
    /// 1, 2 or 9 is [`SexCategory::Unknown`].
    pub fn from_code(code: &str) -> Self {
        match code.parse::<u32>() {
            Ok(1) => SexCategory::Male,
            Ok(2) => SexCategory::Female,
            Ok(9) => SexCategory::NotApplicable,
            _ => SexCategory::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SexCategory::Male => "male",
            SexCategory::Female => "female",
            SexCategory::NotApplicable => "not applicable",
            SexCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SexCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute bundle printed on the face of the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRecord {
    pub header: Vec<u8>,
    pub name: String,
    pub address: String,
    /// Birth date as stored, `YYYYMMDD`
    pub birth: String,
    /// ISO 5218 code as stored
    pub sex: String,
}

impl AttributeRecord {
    /// Header bytes as space separated upper case hex
    pub fn header_hex(&self) -> String {
        format_hex_spaced(&self.header)
    }

    pub fn sex_category(&self) -> SexCategory {
        SexCategory::from_code(&self.sex)
    }

    /// Birth date, when the stored text is a valid `YYYYMMDD` date
    pub fn birth_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.birth, "%Y%m%d").ok()
    }

    pub fn summary(&self) -> AttributeSummary {
        AttributeSummary {
            header_hex: self.header_hex(),
            name: self.name.clone(),
            address: self.address.clone(),
            birth: self.birth.clone(),
            birth_date: self.birth_date(),
            sex_category: self.sex_category(),
        }
    }
}

/// Presentation form of an [`AttributeRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSummary {
    pub header_hex: String,
    pub name: String,
    pub address: String,
    pub birth: String,
    pub birth_date: Option<NaiveDate>,
    pub sex_category: SexCategory,
}
