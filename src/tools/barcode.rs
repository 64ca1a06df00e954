//! Barcode tools.
//!
//! Validation covers the GTIN family (EAN-13, EAN-8, UPC-A), which share one
//! mod-10 check digit scheme.

use std::fmt;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::schema::OutputShape;
use crate::registry::{Tool, ToolContext, ToolError, ToolOutput, ToolResult};
use crate::tools::{optional_str, required_str};

/// A GTIN symbology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Symbology {
    /// 13 digits.
    Ean13,
    /// 8 digits.
    Ean8,
    /// 12 digits.
    Upca,
}

impl Symbology {
    /// Total digits including the check digit.
    #[must_use]
    pub const fn length(self) -> usize {
        match self {
            Self::Ean13 => 13,
            Self::Ean8 => 8,
            Self::Upca => 12,
        }
    }

    /// Picks the symbology implied by a code length.
    #[must_use]
    pub const fn for_length(len: usize) -> Option<Self> {
        match len {
            13 => Some(Self::Ean13),
            8 => Some(Self::Ean8),
            12 => Some(Self::Upca),
            _ => None,
        }
    }

    fn parse(name: &str) -> ToolResult<Option<Self>> {
        match name.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "auto" => Ok(None),
            "ean13" => Ok(Some(Self::Ean13)),
            "ean8" => Ok(Some(Self::Ean8)),
            "upca" => Ok(Some(Self::Upca)),
            _ => Err(ToolError::unsupported(format!("symbology '{name}'"))),
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ean13 => write!(f, "EAN-13"),
            Self::Ean8 => write!(f, "EAN-8"),
            Self::Upca => write!(f, "UPC-A"),
        }
    }
}

/// Computes the mod-10 check digit for the data digits of a GTIN.
///
/// Weights alternate 3, 1, ... starting from the rightmost data digit.
#[must_use]
pub fn check_digit(data: &[u8]) -> u8 {
    let sum: u32 = data
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| u32::from(*d) * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    // sum % 10 is < 10
    #[allow(clippy::cast_possible_truncation)]
    let rem = (sum % 10) as u8;
    (10 - rem) % 10
}

/// Validation verdict.
#[derive(Debug, PartialEq, Eq, Serialize, JsonSchema)]
pub struct BarcodeValidation {
    /// Whether the check digit matches.
    pub valid: bool,
    /// Symbology the code was checked against.
    pub symbology: Symbology,
    /// Check digit present in the code.
    pub check_digit: u8,
    /// Check digit computed from the data digits.
    pub expected_check_digit: u8,
}

/// Validates a code against a symbology.
///
/// # Errors
///
/// Returns an invalid-argument error for non-digit input or a length that
/// does not fit the symbology.
pub fn validate(code: &str, symbology: Option<Symbology>) -> ToolResult<BarcodeValidation> {
    let code: String = code.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    let digits: Vec<u8> = code
        .chars()
        .map(|c| c.to_digit(10).and_then(|d| u8::try_from(d).ok()))
        .collect::<Option<_>>()
        .ok_or_else(|| ToolError::invalid("code must contain only digits"))?;

    let symbology = match symbology {
        Some(s) if s.length() == digits.len() => s,
        Some(s) => {
            return Err(ToolError::invalid(format!(
                "{s} codes have {} digits, got {}",
                s.length(),
                digits.len()
            )))
        }
        None => Symbology::for_length(digits.len()).ok_or_else(|| {
            ToolError::invalid(format!(
                "cannot infer symbology from {} digits; expected 8, 12 or 13",
                digits.len()
            ))
        })?,
    };

    let (data, check) = digits.split_at(digits.len() - 1);
    let expected = check_digit(data);
    Ok(BarcodeValidation {
        valid: check[0] == expected,
        symbology,
        check_digit: check[0],
        expected_check_digit: expected,
    })
}

/// Checks a barcode's check digit.
#[derive(Debug, Default)]
pub struct BarcodeValidateTool;

#[async_trait]
impl Tool for BarcodeValidateTool {
    fn description(&self) -> &'static str {
        "Validate the check digit of an EAN-13, EAN-8 or UPC-A barcode."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Barcode digits, including the check digit"
                },
                "symbology": {
                    "type": "string",
                    "enum": ["auto", "ean13", "ean8", "upca"],
                    "description": "Symbology (default: inferred from length)"
                }
            },
            "required": ["code"]
        })
    }

    fn output_shapes(&self) -> Vec<OutputShape> {
        vec![OutputShape::of::<BarcodeValidation>("validation")]
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let code = required_str(&arguments, "code")?;
        let symbology = optional_str(&arguments, "symbology")?
            .map(Symbology::parse)
            .transpose()?
            .flatten();
        ToolOutput::json(&validate(code, symbology)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_validate() {
        let ean13 = validate("4006381333931", None).unwrap();
        assert!(ean13.valid);
        assert_eq!(ean13.symbology, Symbology::Ean13);

        assert!(validate("96385074", None).unwrap().valid);
        assert!(validate("0-36000-29145-2", Some(Symbology::Upca)).unwrap().valid);
    }

    #[test]
    fn wrong_check_digit_reports_expected() {
        let result = validate("4006381333932", None).unwrap();
        assert!(!result.valid);
        assert_eq!(result.check_digit, 2);
        assert_eq!(result.expected_check_digit, 1);
    }

    #[test]
    fn length_mismatch_is_invalid_argument() {
        let err = validate("96385074", Some(Symbology::Ean13)).unwrap_err();
        assert_eq!(err.to_string(), "EAN-13 codes have 13 digits, got 8");
        assert!(validate("12345", None).is_err());
        assert!(validate("40063813339x1", None).is_err());
    }

    #[test]
    fn unknown_symbology_is_unsupported() {
        assert!(matches!(
            Symbology::parse("qr"),
            Err(ToolError::Unsupported(_))
        ));
        assert_eq!(Symbology::parse("EAN-13").unwrap(), Some(Symbology::Ean13));
    }
}
