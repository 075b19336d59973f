//! Format checks for addresses and transaction hashes given as hex strings.

use anyhow::{ensure, Context, Result};
use primitive_types::{H160, H256};

const HEX_PREFIX: &str = "0x";
const ADDRESS_LENGTH: usize = 2 + 2 * 20;
const TRANSACTION_HASH_LENGTH: usize = 2 + 2 * 32;

fn is_prefixed_hex(value: &str, length: usize) -> bool {
    value.len() == length
        && value.starts_with(HEX_PREFIX)
        && value[HEX_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit())
}

/// `0x` followed by 40 hex digits. Checksums are not verified.
pub fn is_valid_address(address: &str) -> bool {
    is_prefixed_hex(address, ADDRESS_LENGTH)
}

/// `0x` followed by 64 hex digits.
pub fn is_valid_transaction_hash(hash: &str) -> bool {
    is_prefixed_hex(hash, TRANSACTION_HASH_LENGTH)
}

pub fn parse_address(address: &str) -> Result<H160> {
    ensure!(is_valid_address(address), "invalid address {:?}", address);
    let bytes = hex::decode(&address[HEX_PREFIX.len()..]).context("invalid address hex")?;
    Ok(H160::from_slice(&bytes))
}

pub fn parse_transaction_hash(hash: &str) -> Result<H256> {
    ensure!(
        is_valid_transaction_hash(hash),
        "invalid transaction hash {:?}",
        hash
    );
    let bytes = hex::decode(&hash[HEX_PREFIX.len()..]).context("invalid transaction hash hex")?;
    Ok(H256::from_slice(&bytes))
}
