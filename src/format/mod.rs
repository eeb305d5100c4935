//! Numeric formatting primitives shared by every dialect.
//!
//! Two renderings exist: fixed-point decimals at a configured precision, and
//! integer machine steps obtained by scaling and truncating toward zero.

use thiserror::Error;

/// Highest precision any context may request.
pub const MAX_DECIMALS: usize = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("cannot format {field}: value {value} is not finite")]
    NonFinite { field: &'static str, value: f64 },

    #[error("cannot format with {decimals} decimals (max {max})", max = MAX_DECIMALS)]
    Precision { decimals: usize },

    #[error("cannot format {field}: scaled value {value} does not fit a machine integer")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Render `value` with exactly `decimals` digits after the point.
pub fn fixed(field: &'static str, value: f64, decimals: usize) -> Result<String, FormatError> {
    if decimals > MAX_DECIMALS {
        return Err(FormatError::Precision { decimals });
    }
    if !value.is_finite() {
        return Err(FormatError::NonFinite { field, value });
    }
    Ok(format!("{:.prec$}", value, prec = decimals))
}

/// Render `value * factor` as an integer, truncating toward zero.
pub fn scaled(field: &'static str, value: f64, factor: f64) -> Result<String, FormatError> {
    if !value.is_finite() {
        return Err(FormatError::NonFinite { field, value });
    }
    let steps = (value * factor).trunc();
    if !steps.is_finite() || steps.abs() >= i64::MAX as f64 {
        return Err(FormatError::OutOfRange { field, value: steps });
    }
    Ok(format!("{}", steps as i64))
}
