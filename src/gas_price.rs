//! Gas price and limit policy applied to raw node estimates.

use primitive_types::{U256, U512};
use serde::{Deserialize, Serialize};

/// How fast a transaction should be mined, relative to the node's current gas price.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasPriceTarget {
    Slow,
    #[default]
    Standard,
    Fast,
}

impl GasPriceTarget {
    // Scale the node reported price: slow pays two thirds of it, fast pays double.
    // Fast saturates at `U256::MAX`.
    pub fn apply(self, price: U256) -> U256 {
        match self {
            GasPriceTarget::Slow => mul_div(price, 2, 3),
            GasPriceTarget::Standard => price,
            GasPriceTarget::Fast => mul_div(price, 2, 1),
        }
    }
}

/// Contract calls are padded so that state changes between estimation and
/// mining do not push them out of gas: `raw * 100 / 90`, saturating at `U256::MAX`.
pub fn pad_call_limit(raw: U256) -> U256 {
    mul_div(raw, 100, 90)
}

// `value * numerator / denominator` rounded down, without intermediate overflow.
fn mul_div(value: U256, numerator: u64, denominator: u64) -> U256 {
    let exact = value.full_mul(U256::from(numerator)) / U512::from(denominator);
    U256::try_from(exact).unwrap_or(U256::MAX)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
/// Gas settings for one transaction.
pub struct GasEstimate {
    // Price per unit of gas in wei, already scaled to the target.
    pub price: U256,
    // Maximum units of gas the transaction may use.
    pub limit: U256,
    pub target: GasPriceTarget,
}

impl GasEstimate {
    // Most the transaction can cost in wei, reached if it uses its whole limit.
    pub fn max_cost(&self) -> U256 {
        self.price.saturating_mul(self.limit)
    }
}
