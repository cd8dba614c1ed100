//! Fixed-point prices.
//!
//! Prices carry at most two decimal places and ten significant digits. The
//! store keeps them as integer minor units (cents) so that SQL never touches
//! floating point.

use crate::{Error, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Decimal places kept for every price
pub const PRICE_SCALE: u32 = 2;

/// Maximum number of digits, including the decimal places
pub const PRICE_MAX_DIGITS: u32 = 10;

/// Convert a price into minor units, rejecting values that do not fit.
pub fn to_minor_units(price: Decimal) -> Result<i64> {
    let mut scaled = price.normalize();
    if scaled.scale() > PRICE_SCALE {
        return Err(Error::InvalidPrice(format!(
            "{price} has more than {PRICE_SCALE} decimal places"
        )));
    }
    scaled.rescale(PRICE_SCALE);

    let units = scaled.mantissa();
    if units.unsigned_abs() >= 10u128.pow(PRICE_MAX_DIGITS) {
        return Err(Error::InvalidPrice(format!(
            "{price} has more than {PRICE_MAX_DIGITS} digits"
        )));
    }
    Ok(units as i64)
}

/// Convert stored minor units back into a price with two decimal places.
pub fn from_minor_units(units: i64) -> Decimal {
    Decimal::new(units, PRICE_SCALE)
}

/// Parse a user-supplied price such as `"699"` or `"699.00"`.
pub fn parse_price(s: &str) -> Result<Decimal> {
    let price = Decimal::from_str(s.trim())
        .map_err(|e| Error::InvalidPrice(format!("{s}: {e}")))?;
    to_minor_units(price)?;
    Ok(price)
}

pub fn ensure_non_negative(price: Decimal) -> Result<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(Error::InvalidPrice(format!("{price} is negative")));
    }
    Ok(())
}
