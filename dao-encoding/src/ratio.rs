//! Fixed-point encoding of ratios between 0 and 1.
//!
//! The plugin contracts store percentages as integers scaled by `10^digits`.
//! The precision is chosen by the caller at every call site: the majority
//! voting settings use 6 digits, other contracts use 2 or 18.
use ethereum_types::U256;
use thiserror::Error;

pub const MIN_DIGITS: u32 = 1;
/// Beyond 15 digits an `f64` no longer holds the scaled value exactly.
pub const MAX_DIGITS: u32 = 15;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RatioError {
    #[error("the ratio value should range between 0 and 1, got {0}")]
    RatioOutOfRange(f64),

    #[error("the number of digits should range between {} and {}, got {0}", MIN_DIGITS, MAX_DIGITS)]
    InvalidDigits(u32),

    #[error("the value {value} is out of range for {digits} digits")]
    ValueOutOfRange { value: U256, digits: u32 },
}

fn scale(digits: u32) -> Result<u64, RatioError> {
    if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
        return Err(RatioError::InvalidDigits(digits));
    }
    Ok(10u64.pow(digits))
}

/// Scales `ratio` by `10^digits`, rounding to the nearest integer.
pub fn encode_ratio(ratio: f64, digits: u32) -> Result<u64, RatioError> {
    // NaN fails the range check as well
    if !(0.0..=1.0).contains(&ratio) {
        return Err(RatioError::RatioOutOfRange(ratio));
    }
    let scale = scale(digits)?;
    Ok((ratio * scale as f64).round() as u64)
}

pub fn decode_ratio(value: impl Into<U256>, digits: u32) -> Result<f64, RatioError> {
    let value = value.into();
    let scale = scale(digits)?;
    if value > U256::from(scale) {
        return Err(RatioError::ValueOutOfRange { value, digits });
    }
    Ok(value.low_u64() as f64 / scale as f64)
}
