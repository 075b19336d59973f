//! Conversions between integer base units and human readable amounts.
//!
//! `parse_units` and `format_units` are exact. The gas price helpers go through
//! `f64` and are meant for display and rough user input only.

use anyhow::{anyhow, ensure, Result};
use primitive_types::U256;

pub const GWEI_DECIMALS: u32 = 9;
pub const ETHER_DECIMALS: u32 = 18;

/// Every 77 digit number fits into a `U256`.
pub const MAX_DECIMALS: u32 = 77;

const GWEI: f64 = 1e9;
const ETHER: f64 = 1e18;

/// Parses a decimal amount like `"1.5"` into base units with `decimals` places.
pub fn parse_units(amount: &str, decimals: u32) -> Result<U256> {
    check_decimals(decimals)?;
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    ensure!(
        !(whole.is_empty() && fraction.is_empty()) && is_digits(whole) && is_digits(fraction),
        "invalid amount {:?}",
        amount
    );
    ensure!(
        fraction.len() <= decimals as usize,
        "amount {:?} has more than {} decimals",
        amount,
        decimals
    );
    let digits = format!("{}{:0<width$}", whole, fraction, width = decimals as usize);
    U256::from_dec_str(&digits)
        .map_err(|err| anyhow!("amount {:?} out of range: {:?}", amount, err))
}

/// Formats base units as a decimal amount without trailing zeros.
pub fn format_units(amount: U256, decimals: u32) -> Result<String> {
    check_decimals(decimals)?;
    let decimals = decimals as usize;
    let digits = amount.to_string();
    if decimals == 0 {
        return Ok(digits);
    }
    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        Ok(whole.to_string())
    } else {
        Ok(format!("{}.{}", whole, fraction))
    }
}

fn check_decimals(decimals: u32) -> Result<()> {
    ensure!(
        decimals <= MAX_DECIMALS,
        "{} decimals is more than a 256 bit amount can have",
        decimals
    );
    Ok(())
}

/// Wei to gwei.
pub fn readable_gas_price(price: U256) -> f64 {
    price.to_f64_lossy() / GWEI
}

/// Gwei to wei.
pub fn functional_gas_price(gwei: f64) -> U256 {
    U256::from_f64_lossy(gwei * GWEI)
}

/// Cost in ether of a transaction using its whole gas limit.
pub fn maximum_gas_cost(price: U256, limit: U256) -> f64 {
    price.saturating_mul(limit).to_f64_lossy() / ETHER
}
