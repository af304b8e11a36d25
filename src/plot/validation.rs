use super::{IndustryType, PlotInput};
use std::fmt;

/// Validation errors for plot write requests
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    UnknownIndustryType(String),
    InvalidId(i64),
    NonFiniteAttribute(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownIndustryType(t) => {
                write!(f, "unknown industry type '{}'", t)
            }
            ValidationError::InvalidId(id) => {
                write!(f, "plot id must be positive, got {}", id)
            }
            ValidationError::NonFiniteAttribute(field) => {
                write!(f, "attribute '{}' must be a finite number", field)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates the scalar attributes of a write request.
///
/// Rules:
/// - `type` must be one of the known industry tags (exact match)
/// - `id`, when given, must be positive
/// - `area`, `disroad`, `diswater`, `elephase` must be finite
///
/// Returns the parsed industry type. Geometry is checked separately by the
/// geometry codec.
pub fn validate(input: &PlotInput) -> Result<IndustryType, ValidationError> {
    if let Some(id) = input.id {
        if id <= 0 {
            return Err(ValidationError::InvalidId(id));
        }
    }

    let numeric = [
        ("area", input.area),
        ("disroad", input.disroad),
        ("diswater", input.diswater),
        ("elephase", input.elephase),
    ];
    if let Some(&(field, _)) = numeric.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ValidationError::NonFiniteAttribute(field));
    }

    input.plot_type.parse()
}
