//! Deferred results for Ethereum JSON-RPC operations.
//!
//! Contract reads resolve a [`QueryOperation`] after a single round trip, sent
//! transactions resolve a [`TransactionTracker`] once their receipt shows up, and
//! both report through the same [`DeferredResult`] observer contract.
//! [`GasEstimator`] turns raw node estimates into prices and limits for new
//! transactions. Everything talks to the chain through [`EthRpc`].
//!
//! # Features
//! `web3_`: Implements `EthRpc` for `Web3`, adds a local key signer and `ethabi`
//! based contract calls.

pub mod abi;
pub mod address;
mod client;
pub mod config;
mod deferred;
mod error;
#[cfg(feature = "web3_")]
pub mod eth_node;
pub mod gas_estimator;
pub mod gas_price;
pub mod query;
#[cfg(feature = "web3_")]
pub mod signer;
pub mod tracker;
pub mod types;
pub mod units;

pub use client::{EthClient, GasSettings};
pub use config::{ClientConfig, Network, TrackerConfig};
pub use deferred::DeferredResult;
#[cfg(feature = "web3_")]
pub use eth_node::connect;
pub use error::{ErrorKind, OperationError};
pub use gas_estimator::GasEstimator;
pub use gas_price::{GasEstimate, GasPriceTarget};
pub use query::QueryOperation;
#[cfg(feature = "web3_")]
pub use signer::LocalSigner;
pub use tracker::{ConfirmationOutcome, PollState, TransactionTracker};
pub use types::{CallRequest, TransactionDetails, TransactionReceipt, TransactionRequest};

use anyhow::Result;
use primitive_types::{H160, H256, U256};
use std::{future::Future, time::Duration};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// The JSON-RPC calls this crate needs from a node.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EthRpc: Send + Sync {
    /// `eth_call` against the latest block, returning the raw output bytes.
    async fn call(&self, request: CallRequest) -> Result<Vec<u8>>;
    /// `eth_getBalance` at the latest block, in wei.
    async fn balance(&self, address: H160) -> Result<U256>;
    /// `eth_sendRawTransaction`.
    async fn send_raw_transaction(&self, signed: Vec<u8>) -> Result<H256>;
    /// `eth_getTransactionByHash`. `None` if the node does not know the transaction.
    async fn transaction(&self, hash: H256) -> Result<Option<TransactionDetails>>;
    /// `eth_getTransactionReceipt`. `None` while the transaction is not mined.
    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>>;
    /// `eth_gasPrice`, in wei.
    async fn gas_price(&self) -> Result<U256>;
    /// `eth_estimateGas`.
    async fn estimate_gas(&self, request: CallRequest) -> Result<U256>;
}

/// Turns unsigned transactions into raw signed bytes ready for broadcast.
/// Implementations pick the nonce and chain id.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> H160;
    async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Vec<u8>>;
}

/// Spawns `task` on the tokio runtime of the calling context. Returns false if
/// there is no runtime to spawn on.
fn spawn_detached<F>(task: F) -> bool
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
            true
        }
        Err(_) => false,
    }
}
