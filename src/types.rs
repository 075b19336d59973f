//! Plain data exchanged with the RPC and signing collaborators.

use primitive_types::{H160, H256, U256};
use serde::Serialize;

/// Input of `eth_call` and `eth_estimateGas`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<H160>,
    pub to: Option<H160>,
    pub value: Option<U256>,
    pub data: Vec<u8>,
}

impl CallRequest {
    /// A plain value transfer with no calldata.
    pub fn transfer(to: H160, value: U256) -> Self {
        Self {
            to: Some(to),
            value: Some(value),
            ..Default::default()
        }
    }

    /// A contract call with already encoded calldata.
    pub fn contract_call(contract: H160, caller: H160, data: Vec<u8>) -> Self {
        Self {
            from: Some(caller),
            to: Some(contract),
            data,
            ..Default::default()
        }
    }
}

/// Unsigned legacy transaction handed to a [`TransactionSigner`](crate::TransactionSigner).
///
/// Nonce and chain id are left to the signer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    pub to: H160,
    pub value: U256,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub data: Vec<u8>,
}

/// What the node reports about a mined transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    pub transaction_hash: H256,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
    /// `Some(true)` for success, `Some(false)` for a revert. Receipts of blocks
    /// from before the status field existed leave it empty.
    pub status: Option<bool>,
    /// Error detail some nodes attach to failed receipts.
    pub error: Option<String>,
}

/// A transaction as the node knows it, mined or not.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransactionDetails {
    pub hash: H256,
    pub nonce: U256,
    pub from: Option<H160>,
    /// `None` for contract creations.
    pub to: Option<H160>,
    pub value: U256,
    pub gas_price: Option<U256>,
    pub gas_limit: U256,
    pub input: Vec<u8>,
    /// `None` while the transaction is pending.
    pub block_number: Option<u64>,
}

impl TransactionDetails {
    pub fn is_pending(&self) -> bool {
        self.block_number.is_none()
    }
}

impl TransactionReceipt {
    /// The failure detail if this receipt describes a failed transaction.
    pub fn failure(&self) -> Option<String> {
        match (&self.error, self.status) {
            (Some(error), _) if !error.is_empty() => Some(error.clone()),
            (_, Some(false)) => Some("transaction reverted".to_string()),
            _ => None,
        }
    }
}
