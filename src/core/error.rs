use thiserror::Error;

/// Rejection of an assumption set before any computation runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required assumption: {field}")]
    MissingField { field: &'static str },

    #[error("horizon_years must be between {min} and {max}, got {years}")]
    HorizonOutOfRange { years: i64, min: u32, max: u32 },

    #[error("invalid assumption {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field } => field,
            ValidationError::HorizonOutOfRange { .. } => "horizon_years",
            ValidationError::InvalidValue { field, .. } => field,
        }
    }
}
