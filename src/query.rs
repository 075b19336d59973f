//! Read-only chain queries that resolve after a single round trip.

use crate::{
    abi::ContractQuery, address::parse_transaction_hash, spawn_detached, CallRequest,
    DeferredResult, EthRpc, OperationError, TransactionDetails,
};
use anyhow::Context;
use primitive_types::{H160, U256};
use std::{future::Future, ops::Deref, sync::Arc};

/// The eventual result of one read request.
///
/// Dereferences to the underlying [`DeferredResult`] for subscribing.
pub struct QueryOperation<T> {
    result: DeferredResult<T>,
}

impl<T> Clone for QueryOperation<T> {
    fn clone(&self) -> Self {
        Self {
            result: self.result.clone(),
        }
    }
}

impl<T> Deref for QueryOperation<T> {
    type Target = DeferredResult<T>;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}

impl<T: Send + Sync + 'static> QueryOperation<T> {
    /// Drives `request` on the current tokio runtime and resolves with its output.
    ///
    /// Outside of a runtime nothing can be sent and the operation fails right away.
    pub fn from_request<F>(request: F) -> Self
    where
        F: Future<Output = Result<T, OperationError>> + Send + 'static,
    {
        let result = DeferredResult::new();
        let resolver = result.clone();
        let spawned = spawn_detached(async move {
            resolver.resolve(request.await);
        });
        if !spawned {
            result.resolve_error(OperationError::Transport(
                "no tokio runtime to send the request on".to_string(),
            ));
        }
        Self { result }
    }

    /// Calls a read-only contract function with one `eth_call`.
    ///
    /// Outputs the query considers inconclusive, typically the default value,
    /// resolve as [`OperationError::Inconclusive`] rather than success.
    pub fn issue<Q>(rpc: Arc<dyn EthRpc>, query: Q, contract: H160, sender: H160) -> Self
    where
        Q: ContractQuery<Output = T> + 'static,
    {
        Self::from_request(async move {
            let data = query
                .encode()
                .map_err(|err| OperationError::InvalidInput(format!("{:#}", err)))?;
            let output = rpc
                .call(CallRequest::contract_call(contract, sender, data))
                .await
                .with_context(|| format!("eth_call to {:#x} failed", contract))
                .map_err(OperationError::transport)?;
            if output.is_empty() {
                return Err(no_data(contract));
            }
            let value = query.decode(&output).map_err(OperationError::transport)?;
            if query.is_inconclusive(&value) {
                return Err(no_data(contract));
            }
            tracing::debug!(?contract, "contract query resolved");
            Ok(value)
        })
    }
}

fn no_data(contract: H160) -> OperationError {
    OperationError::Inconclusive(format!(
        "no data returned by {:#x}, make sure the contract has the function being queried",
        contract
    ))
}

impl QueryOperation<U256> {
    /// Ether balance of `address` in wei. A zero balance is a valid answer here
    /// since the node reports it as a number, not as decoded contract output.
    pub fn ether_balance(rpc: Arc<dyn EthRpc>, address: H160) -> Self {
        Self::from_request(async move {
            rpc.balance(address)
                .await
                .with_context(|| format!("failed to get balance of {:#x}", address))
                .map_err(OperationError::transport)
        })
    }
}

impl QueryOperation<TransactionDetails> {
    /// Looks up a transaction by hash, whether or not it is mined yet.
    ///
    /// A malformed hash fails before returning without contacting the node. A
    /// hash the node does not know resolves as [`OperationError::Inconclusive`].
    pub fn transaction_details(rpc: Arc<dyn EthRpc>, tx_hash: &str) -> Self {
        let hash = match parse_transaction_hash(tx_hash) {
            Ok(hash) => hash,
            Err(err) => {
                let result = DeferredResult::new();
                result.resolve_error(OperationError::InvalidInput(format!("{:#}", err)));
                return Self { result };
            }
        };
        Self::from_request(async move {
            let details = rpc
                .transaction(hash)
                .await
                .with_context(|| format!("failed to get transaction {:#x}", hash))
                .map_err(OperationError::transport)?;
            details.ok_or_else(|| {
                OperationError::Inconclusive(format!("transaction {:#x} not found", hash))
            })
        })
    }
}
