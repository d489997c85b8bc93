//! Error types for resource record parsing and validation.

use crate::model::ResourcePair;

/// Why a submitted resource record was rejected.
///
/// The first three variants come from [`parse_form`](crate::metrics::parse_form),
/// which turns raw form input into numbers. `AvailableExceedsTotal` is the only
/// failure [`validate`](crate::metrics::validate) raises.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("{0} must be a non-negative whole number")]
    NotANumber(&'static str),

    #[error("date must be formatted as YYYY-MM-DD")]
    InvalidDate,

    #[error("available {} must be less than or equal to total {}", .0.label(), .0.label())]
    AvailableExceedsTotal(ResourcePair),
}

impl ValidationError {
    /// Name of the field or resource pair that failed, for targeted messages.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField(field) | ValidationError::NotANumber(field) => field,
            ValidationError::InvalidDate => "date",
            ValidationError::AvailableExceedsTotal(pair) => pair.name(),
        }
    }
}
