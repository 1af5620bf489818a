use thiserror::Error;

pub type MortgageResult<T> = Result<T, MortgageError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MortgageError {
    #[error("invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("invalid date: {0}")]
    InvalidDate(String),
}

impl MortgageError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        MortgageError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Rejects NaN/infinite values and anything below `min` (or at `min` when
/// `inclusive` is false).
pub(crate) fn check_amount(field: &str, value: f64, min: f64, inclusive: bool) -> MortgageResult<()> {
    if !value.is_finite() {
        return Err(MortgageError::invalid(field, "must be a finite number"));
    }
    let ok = if inclusive { value >= min } else { value > min };
    if ok {
        Ok(())
    } else if inclusive {
        Err(MortgageError::invalid(field, format!("must be at least {min}, got {value}")))
    } else {
        Err(MortgageError::invalid(field, format!("must be greater than {min}, got {value}")))
    }
}
