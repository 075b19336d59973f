//! Gas prices and limits for new transactions, derived from the node's own estimates.

use crate::{
    abi::ContractFunction,
    gas_price::{pad_call_limit, GasEstimate, GasPriceTarget},
    CallRequest, EthRpc, OperationError,
};
use anyhow::Context;
use primitive_types::{H160, U256};
use std::sync::Arc;

#[derive(Clone)]
pub struct GasEstimator {
    rpc: Arc<dyn EthRpc>,
}

impl GasEstimator {
    pub fn new(rpc: Arc<dyn EthRpc>) -> Self {
        Self { rpc }
    }

    /// Current node gas price in wei scaled for `target`.
    pub async fn estimate_price(&self, target: GasPriceTarget) -> Result<U256, OperationError> {
        let raw = self
            .rpc
            .gas_price()
            .await
            .context("failed to get gas price")
            .map_err(OperationError::transport)?;
        let price = target.apply(raw);
        if price.is_zero() {
            return Err(OperationError::Inconclusive(format!(
                "gas price {} rounds to zero for {:?} target",
                raw, target
            )));
        }
        tracing::debug!(%raw, %price, ?target, "estimated gas price");
        Ok(price)
    }

    /// Gas limit for sending `value` wei to `to`, as estimated by the node.
    pub async fn estimate_transfer_limit(
        &self,
        to: H160,
        value: U256,
    ) -> Result<U256, OperationError> {
        let limit = self.raw_limit(CallRequest::transfer(to, value)).await?;
        tracing::debug!(?to, %limit, "estimated transfer gas limit");
        Ok(limit)
    }

    /// Gas limit for calling `function` on `contract`, with headroom on top of
    /// the node's estimate.
    pub async fn estimate_call_limit(
        &self,
        function: &dyn ContractFunction,
        contract: H160,
        caller: H160,
    ) -> Result<U256, OperationError> {
        self.call_limit(function, contract, caller, None).await
    }

    /// Like [`Self::estimate_call_limit`] for a call that also sends `value` wei.
    /// Payable functions may revert during estimation if the value is missing.
    pub async fn estimate_payable_call_limit(
        &self,
        function: &dyn ContractFunction,
        contract: H160,
        caller: H160,
        value: U256,
    ) -> Result<U256, OperationError> {
        self.call_limit(function, contract, caller, Some(value)).await
    }

    pub async fn estimate_transfer(
        &self,
        to: H160,
        value: U256,
        target: GasPriceTarget,
    ) -> Result<GasEstimate, OperationError> {
        Ok(GasEstimate {
            price: self.estimate_price(target).await?,
            limit: self.estimate_transfer_limit(to, value).await?,
            target,
        })
    }

    pub async fn estimate_call(
        &self,
        function: &dyn ContractFunction,
        contract: H160,
        caller: H160,
        target: GasPriceTarget,
    ) -> Result<GasEstimate, OperationError> {
        Ok(GasEstimate {
            price: self.estimate_price(target).await?,
            limit: self.estimate_call_limit(function, contract, caller).await?,
            target,
        })
    }

    async fn call_limit(
        &self,
        function: &dyn ContractFunction,
        contract: H160,
        caller: H160,
        value: Option<U256>,
    ) -> Result<U256, OperationError> {
        let data = function
            .encode()
            .map_err(|err| OperationError::InvalidInput(format!("{:#}", err)))?;
        let request = CallRequest {
            value,
            ..CallRequest::contract_call(contract, caller, data)
        };
        let raw = self.raw_limit(request).await?;
        let limit = pad_call_limit(raw);
        tracing::debug!(?contract, %raw, %limit, "estimated call gas limit");
        Ok(limit)
    }

    async fn raw_limit(&self, request: CallRequest) -> Result<U256, OperationError> {
        let limit = self
            .rpc
            .estimate_gas(request)
            .await
            .context("failed to estimate gas")
            .map_err(OperationError::transport)?;
        if limit.is_zero() {
            return Err(OperationError::Inconclusive(
                "node estimated zero gas".to_string(),
            ));
        }
        Ok(limit)
    }
}
