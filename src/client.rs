use crate::{
    abi::{ContractFunction, ContractQuery},
    ClientConfig, EthRpc, GasEstimator, GasPriceTarget, OperationError, QueryOperation,
    TransactionDetails, TransactionRequest, TransactionSigner, TransactionTracker,
};
use anyhow::Context;
use primitive_types::{H160, H256, U256};
use std::{future::Future, sync::Arc};

/// Where the gas price and limit of a sent transaction come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GasSettings {
    /// Estimate both, pricing for the given target.
    Estimate(GasPriceTarget),
    /// Use this price in wei and estimate the limit.
    Price(U256),
    Exact { price: U256, limit: U256 },
}

impl Default for GasSettings {
    fn default() -> Self {
        GasSettings::Estimate(GasPriceTarget::default())
    }
}

impl GasSettings {
    /// Price and limit to send with. `estimate_limit` is only awaited if the
    /// limit is not fixed.
    async fn resolve<L>(
        self,
        estimator: &GasEstimator,
        estimate_limit: L,
    ) -> Result<(U256, U256), OperationError>
    where
        L: Future<Output = Result<U256, OperationError>>,
    {
        match self {
            GasSettings::Estimate(target) => {
                let price = estimator.estimate_price(target).await?;
                Ok((price, estimate_limit.await?))
            }
            GasSettings::Price(price) => Ok((price, estimate_limit.await?)),
            GasSettings::Exact { price, limit } => Ok((price, limit)),
        }
    }
}

/// Entry point bundling a node connection with its configuration.
#[derive(Clone)]
pub struct EthClient {
    rpc: Arc<dyn EthRpc>,
    config: ClientConfig,
}

impl EthClient {
    pub fn new(rpc: Arc<dyn EthRpc>, config: ClientConfig) -> Self {
        Self { rpc, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn rpc(&self) -> Arc<dyn EthRpc> {
        self.rpc.clone()
    }

    pub fn gas(&self) -> GasEstimator {
        GasEstimator::new(self.rpc.clone())
    }

    pub fn query<Q>(&self, query: Q, contract: H160, sender: H160) -> QueryOperation<Q::Output>
    where
        Q: ContractQuery + 'static,
    {
        QueryOperation::issue(self.rpc.clone(), query, contract, sender)
    }

    pub fn ether_balance(&self, address: H160) -> QueryOperation<U256> {
        QueryOperation::ether_balance(self.rpc.clone(), address)
    }

    pub fn transaction_details(&self, tx_hash: &str) -> QueryOperation<TransactionDetails> {
        QueryOperation::transaction_details(self.rpc.clone(), tx_hash)
    }

    /// Tracks a transaction that was broadcast elsewhere.
    pub fn track(&self, tx_hash: &str) -> TransactionTracker {
        TransactionTracker::start(self.rpc.clone(), tx_hash, &self.config.tracker)
    }

    /// Sends `amount` wei from the signer's account to `to`.
    ///
    /// Gas estimation, signing and broadcast happen in the background; their
    /// failures resolve the returned tracker.
    pub fn send_ether(
        &self,
        signer: Arc<dyn TransactionSigner>,
        to: H160,
        amount: U256,
        gas: GasSettings,
    ) -> TransactionTracker {
        let rpc = self.rpc.clone();
        let estimator = self.gas();
        self.submit(async move {
            let (gas_price, gas_limit) = gas
                .resolve(&estimator, estimator.estimate_transfer_limit(to, amount))
                .await?;
            let tx = TransactionRequest {
                to,
                value: amount,
                gas_price,
                gas_limit,
                data: Vec::new(),
            };
            sign_and_send(rpc.as_ref(), signer.as_ref(), tx).await
        })
    }

    /// Sends a state changing call of `function` on `contract`, paying `value`
    /// wei along with it. Non-payable functions take a zero value.
    pub fn send_contract_message<F>(
        &self,
        signer: Arc<dyn TransactionSigner>,
        function: F,
        contract: H160,
        value: U256,
        gas: GasSettings,
    ) -> TransactionTracker
    where
        F: ContractFunction + 'static,
    {
        let rpc = self.rpc.clone();
        let estimator = self.gas();
        self.submit(async move {
            let data = function
                .encode()
                .map_err(|err| OperationError::InvalidInput(format!("{:#}", err)))?;
            let caller = signer.address();
            let (gas_price, gas_limit) = gas
                .resolve(
                    &estimator,
                    estimator.estimate_payable_call_limit(&function, contract, caller, value),
                )
                .await?;
            let tx = TransactionRequest {
                to: contract,
                value,
                gas_price,
                gas_limit,
                data,
            };
            sign_and_send(rpc.as_ref(), signer.as_ref(), tx).await
        })
    }

    fn submit<F>(&self, broadcast: F) -> TransactionTracker
    where
        F: Future<Output = Result<H256, OperationError>> + Send + 'static,
    {
        TransactionTracker::submit(self.rpc.clone(), &self.config.tracker, broadcast)
    }
}

async fn sign_and_send(
    rpc: &dyn EthRpc,
    signer: &dyn TransactionSigner,
    tx: TransactionRequest,
) -> Result<H256, OperationError> {
    let to = tx.to;
    let signed = signer
        .sign_transaction(tx)
        .await
        .context("failed to sign transaction")
        .map_err(OperationError::transport)?;
    let hash = rpc
        .send_raw_transaction(signed)
        .await
        .context("failed to broadcast transaction")
        .map_err(OperationError::transport)?;
    tracing::info!(?hash, ?to, "transaction broadcast");
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ErrorKind, MockEthRpc, MockTransactionSigner, PollState, TrackerConfig,
        TransactionReceipt,
    };
    use anyhow::{anyhow, Result};
    use std::time::Duration;

    const SIGNED: [u8; 3] = [0xf8, 0x6b, 0x80];

    fn sender() -> H160 {
        H160::repeat_byte(0xaa)
    }

    fn recipient() -> H160 {
        H160::repeat_byte(0xbb)
    }

    fn hash() -> H256 {
        H256::repeat_byte(0x11)
    }

    fn config() -> ClientConfig {
        ClientConfig {
            tracker: TrackerConfig {
                poll_interval: Duration::from_secs(5),
                timeout: None,
            },
            ..Default::default()
        }
    }

    fn mined() -> Result<Option<TransactionReceipt>> {
        Ok(Some(TransactionReceipt {
            transaction_hash: hash(),
            block_number: Some(12),
            status: Some(true),
            ..Default::default()
        }))
    }

    fn signer_expecting(
        check: impl Fn(&TransactionRequest) -> bool + Send + 'static,
    ) -> Arc<dyn TransactionSigner> {
        let mut signer = MockTransactionSigner::new();
        signer.expect_address().returning(sender);
        signer
            .expect_sign_transaction()
            .times(1)
            .withf(check)
            .returning(|_| Ok(SIGNED.to_vec()));
        Arc::new(signer)
    }

    fn expect_broadcast_and_receipt(rpc: &mut MockEthRpc) {
        rpc.expect_send_raw_transaction()
            .times(1)
            .withf(|signed| signed == &SIGNED.to_vec())
            .returning(|_| Ok(hash()));
        rpc.expect_transaction_receipt()
            .times(1)
            .withf(|tx_hash| *tx_hash == hash())
            .returning(|_| mined());
    }

    struct Mint;

    impl ContractFunction for Mint {
        fn encode(&self) -> Result<Vec<u8>> {
            Ok(vec![0x40, 0xc1, 0x0f, 0x19])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn send_ether_with_estimated_gas() {
        let mut rpc = MockEthRpc::new();
        rpc.expect_gas_price()
            .times(1)
            .returning(|| Ok(U256::from(100)));
        rpc.expect_estimate_gas()
            .times(1)
            .withf(|request| request.to == Some(recipient()) && request.data.is_empty())
            .returning(|_| Ok(U256::from(21_000)));
        expect_broadcast_and_receipt(&mut rpc);
        let signer = signer_expecting(|tx| {
            *tx == TransactionRequest {
                to: recipient(),
                value: U256::from(5),
                gas_price: U256::from(200),
                gas_limit: U256::from(21_000),
                data: Vec::new(),
            }
        });

        let client = EthClient::new(Arc::new(rpc), config());
        let tracker = client.send_ether(
            signer,
            recipient(),
            U256::from(5),
            GasSettings::Estimate(GasPriceTarget::Fast),
        );
        let outcome = tracker.wait().await.unwrap();
        assert!(outcome.succeeded);
        assert_eq!(outcome.tx_hash, hash());
        assert_eq!(tracker.tx_hash(), Some(hash()));
        assert_eq!(tracker.poll_state(), PollState::Resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn send_ether_with_fixed_price() {
        let mut rpc = MockEthRpc::new();
        rpc.expect_gas_price().never();
        rpc.expect_estimate_gas()
            .times(1)
            .returning(|_| Ok(U256::from(21_000)));
        expect_broadcast_and_receipt(&mut rpc);
        let signer = signer_expecting(|tx| {
            tx.gas_price == U256::from(7) && tx.gas_limit == U256::from(21_000)
        });

        let client = EthClient::new(Arc::new(rpc), config());
        let tracker = client.send_ether(
            signer,
            recipient(),
            U256::one(),
            GasSettings::Price(U256::from(7)),
        );
        assert!(tracker.wait().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn contract_message_with_exact_gas() {
        let mut rpc = MockEthRpc::new();
        rpc.expect_gas_price().never();
        rpc.expect_estimate_gas().never();
        expect_broadcast_and_receipt(&mut rpc);
        let signer = signer_expecting(|tx| {
            tx.to == recipient()
                && tx.value.is_zero()
                && tx.gas_price == U256::from(3)
                && tx.gas_limit == U256::from(80_000)
                && tx.data == vec![0x40, 0xc1, 0x0f, 0x19]
        });

        let client = EthClient::new(Arc::new(rpc), config());
        let tracker = client.send_contract_message(
            signer,
            Mint,
            recipient(),
            U256::zero(),
            GasSettings::Exact {
                price: U256::from(3),
                limit: U256::from(80_000),
            },
        );
        assert_eq!(tracker.wait().await.unwrap().block_number, Some(12));
    }

    #[tokio::test(start_paused = true)]
    async fn contract_message_limit_uses_signer_as_caller() {
        let mut rpc = MockEthRpc::new();
        rpc.expect_estimate_gas()
            .times(1)
            .withf(|request| request.from == Some(sender()) && request.to == Some(recipient()))
            .returning(|_| Ok(U256::from(90_000)));
        expect_broadcast_and_receipt(&mut rpc);
        let signer = signer_expecting(|tx| tx.gas_limit == U256::from(100_000));

        let client = EthClient::new(Arc::new(rpc), config());
        let tracker = client.send_contract_message(
            signer,
            Mint,
            recipient(),
            U256::zero(),
            GasSettings::Price(U256::one()),
        );
        assert!(tracker.wait().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn payable_contract_message_sends_value() {
        let value = U256::exp10(16);
        let mut rpc = MockEthRpc::new();
        rpc.expect_estimate_gas()
            .times(1)
            .withf(move |request| request.value == Some(value) && request.from == Some(sender()))
            .returning(|_| Ok(U256::from(45_000)));
        expect_broadcast_and_receipt(&mut rpc);
        let signer = signer_expecting(move |tx| {
            tx.value == value && tx.gas_limit == U256::from(50_000) && tx.to == recipient()
        });

        let client = EthClient::new(Arc::new(rpc), config());
        let tracker = client.send_contract_message(
            signer,
            Mint,
            recipient(),
            value,
            GasSettings::Price(U256::one()),
        );
        assert!(tracker.wait().await.unwrap().succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn estimation_failure_resolves_tracker() {
        let mut rpc = MockEthRpc::new();
        rpc.expect_gas_price()
            .returning(|| Err(anyhow!("node unreachable")));
        rpc.expect_send_raw_transaction().never();
        rpc.expect_transaction_receipt().never();
        let mut signer = MockTransactionSigner::new();
        signer.expect_sign_transaction().never();

        let client = EthClient::new(Arc::new(rpc), config());
        let tracker = client.send_ether(
            Arc::new(signer),
            recipient(),
            U256::one(),
            GasSettings::default(),
        );
        let err = tracker.wait().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(tracker.tx_hash(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_broadcast_resolves_tracker() {
        let mut rpc = MockEthRpc::new();
        rpc.expect_send_raw_transaction()
            .times(1)
            .returning(|_| Err(anyhow!("nonce too low")));
        rpc.expect_transaction_receipt().never();
        let signer = signer_expecting(|_| true);

        let client = EthClient::new(Arc::new(rpc), config());
        let tracker = client.send_ether(
            signer,
            recipient(),
            U256::one(),
            GasSettings::Exact {
                price: U256::one(),
                limit: U256::from(21_000),
            },
        );
        let err = tracker.wait().await.unwrap_err();
        assert!(err.to_string().contains("nonce too low"));
        assert!(!err.is_transaction_failure());
    }

    #[tokio::test]
    async fn track_rejects_bad_hash() {
        let mut rpc = MockEthRpc::new();
        rpc.expect_transaction_receipt().never();
        let client = EthClient::new(Arc::new(rpc), config());
        let tracker = client.track("0x1234");
        assert_eq!(
            tracker.outcome().unwrap().unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }

    #[tokio::test]
    async fn ether_balance_through_client() {
        let mut rpc = MockEthRpc::new();
        rpc.expect_balance()
            .times(1)
            .returning(|_| Ok(U256::exp10(18)));
        let client = EthClient::new(Arc::new(rpc), config());
        assert_eq!(
            client.ether_balance(sender()).wait().await,
            Ok(U256::exp10(18))
        );
    }
}
