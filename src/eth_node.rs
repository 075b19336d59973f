//! Ethereum node `EthRpc` implementation.

use crate::{
    CallRequest, ClientConfig, EthClient, EthRpc, TransactionDetails, TransactionReceipt,
};
use anyhow::{Context, Result};
use primitive_types::{H160, H256, U256};
use std::sync::Arc;
use web3::{
    types::{Bytes, TransactionId},
    Transport, Web3,
};

#[async_trait::async_trait]
impl<T> EthRpc for Web3<T>
where
    T: Transport + Send + Sync,
    <T as Transport>::Out: Send,
{
    async fn call(&self, request: CallRequest) -> Result<Vec<u8>> {
        let output = self
            .eth()
            .call(web3_call_request(request), None)
            .await
            .context("eth_call failed")?;
        Ok(output.0)
    }

    async fn balance(&self, address: H160) -> Result<U256> {
        self.eth()
            .balance(address, None)
            .await
            .context("failed to get web3 balance")
    }

    async fn send_raw_transaction(&self, signed: Vec<u8>) -> Result<H256> {
        self.eth()
            .send_raw_transaction(Bytes(signed))
            .await
            .context("failed to send raw transaction")
    }

    async fn transaction(&self, hash: H256) -> Result<Option<TransactionDetails>> {
        let transaction = self
            .eth()
            .transaction(TransactionId::Hash(hash))
            .await
            .context("failed to get web3 transaction")?;
        Ok(transaction.map(details_from_web3))
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>> {
        let receipt = self
            .eth()
            .transaction_receipt(hash)
            .await
            .context("failed to get web3 transaction receipt")?;
        Ok(receipt.map(receipt_from_web3))
    }

    async fn gas_price(&self) -> Result<U256> {
        self.eth()
            .gas_price()
            .await
            .context("failed to get web3 gas price")
    }

    async fn estimate_gas(&self, request: CallRequest) -> Result<U256> {
        self.eth()
            .estimate_gas(web3_call_request(request), None)
            .await
            .context("failed to estimate web3 gas")
    }
}

fn web3_call_request(request: CallRequest) -> web3::types::CallRequest {
    web3::types::CallRequest {
        from: request.from,
        to: request.to,
        value: request.value,
        data: Some(Bytes(request.data)),
        ..Default::default()
    }
}

fn details_from_web3(transaction: web3::types::Transaction) -> TransactionDetails {
    TransactionDetails {
        hash: transaction.hash,
        nonce: transaction.nonce,
        from: transaction.from,
        to: transaction.to,
        value: transaction.value,
        gas_price: transaction.gas_price,
        gas_limit: transaction.gas,
        input: transaction.input.0,
        block_number: transaction.block_number.map(|number| number.as_u64()),
    }
}

fn receipt_from_web3(receipt: web3::types::TransactionReceipt) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: receipt.transaction_hash,
        block_number: receipt.block_number.map(|number| number.as_u64()),
        gas_used: receipt.gas_used,
        status: receipt.status.map(|status| !status.is_zero()),
        error: None,
    }
}

/// Client for the network in `config`, talking JSON-RPC over HTTP.
pub fn connect(config: &ClientConfig) -> Result<EthClient> {
    let url = config.network.url();
    let transport = web3::transports::Http::new(url)
        .with_context(|| format!("failed to create transport for {}", url))?;
    Ok(EthClient::new(Arc::new(Web3::new(transport)), config.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Network;
    use tracing::metadata::LevelFilter;
    use web3::types::U64;

    #[test]
    fn converts_call_request() {
        let request = web3_call_request(CallRequest::contract_call(
            H160::repeat_byte(1),
            H160::repeat_byte(2),
            vec![1, 2, 3],
        ));
        assert_eq!(request.to, Some(H160::repeat_byte(1)));
        assert_eq!(request.from, Some(H160::repeat_byte(2)));
        assert_eq!(request.data, Some(Bytes(vec![1, 2, 3])));
        assert_eq!(request.value, None);
    }

    #[test]
    fn converts_receipt_status() {
        let mut receipt = web3::types::TransactionReceipt {
            transaction_hash: H256::repeat_byte(3),
            block_number: Some(U64::from(100)),
            status: Some(U64::from(1)),
            ..Default::default()
        };
        let converted = receipt_from_web3(receipt.clone());
        assert_eq!(converted.transaction_hash, H256::repeat_byte(3));
        assert_eq!(converted.block_number, Some(100));
        assert_eq!(converted.failure(), None);

        receipt.status = Some(U64::zero());
        assert_eq!(
            receipt_from_web3(receipt).failure().as_deref(),
            Some("transaction reverted")
        );
    }

    #[test]
    fn converts_transaction() {
        let transaction = web3::types::Transaction {
            hash: H256::repeat_byte(4),
            to: Some(H160::repeat_byte(5)),
            value: U256::from(9),
            gas: U256::from(21_000),
            input: Bytes(vec![0xab]),
            block_number: Some(U64::from(7)),
            ..Default::default()
        };
        let details = details_from_web3(transaction);
        assert_eq!(details.hash, H256::repeat_byte(4));
        assert_eq!(details.to, Some(H160::repeat_byte(5)));
        assert_eq!(details.gas_limit, U256::from(21_000));
        assert_eq!(details.input, vec![0xab]);
        assert!(!details.is_pending());
    }

    #[test]
    fn connects_to_custom_network() {
        let config = ClientConfig {
            network: Network::Custom {
                url: "http://localhost:8545".parse().unwrap(),
                chain_id: 1337,
            },
            ..Default::default()
        };
        let client = connect(&config).unwrap();
        assert_eq!(client.config().network.chain_id(), 1337);
    }

    fn node_config() -> ClientConfig {
        ClientConfig {
            network: Network::Custom {
                url: std::env::var("NODE_URL").unwrap().parse().unwrap(),
                chain_id: 1,
            },
            ..Default::default()
        }
    }

    // NODE_URL=... cargo test --features web3_ eth_node -- --ignored --nocapture
    #[tokio::test]
    #[ignore]
    async fn real_request() {
        let client = connect(&node_config()).unwrap();
        let price = client
            .gas()
            .estimate_price(Default::default())
            .await
            .unwrap();
        println!("gas price {} gwei", crate::units::readable_gas_price(price));
        let balance = client.ether_balance(H160::zero()).wait().await.unwrap();
        let balance = crate::units::format_units(balance, 18).unwrap();
        println!("burn address holds {} ether", balance);
    }

    #[ignore]
    #[tokio::test]
    async fn track_real_transaction() {
        tracing_subscriber::fmt()
            .with_max_level(LevelFilter::DEBUG)
            .init();
        let client = connect(&node_config()).unwrap();
        let tracker = client.track(&std::env::var("TX_HASH").unwrap());
        tracing::info!("{:?}", tracker.wait().await);
    }
}
