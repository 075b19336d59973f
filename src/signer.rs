//! Signing with a private key held in memory.

use crate::{TransactionRequest, TransactionSigner};
use anyhow::{ensure, Context, Result};
use primitive_types::H160;
use web3::{
    signing::{Key, SecretKey, SecretKeyRef},
    types::{Bytes, TransactionParameters},
    Transport, Web3,
};

/// Signs legacy transactions with a local key. The nonce is fetched from the
/// node the signer was created with.
pub struct LocalSigner<T: Transport> {
    web3: Web3<T>,
    key: SecretKey,
    chain_id: u64,
}

impl<T: Transport> LocalSigner<T> {
    pub fn new(web3: Web3<T>, key: SecretKey, chain_id: u64) -> Self {
        Self {
            web3,
            key,
            chain_id,
        }
    }

    /// Accepts the key as 64 hex digits with an optional `0x` prefix.
    pub fn from_hex(web3: Web3<T>, private_key: &str, chain_id: u64) -> Result<Self> {
        let digits = private_key.strip_prefix("0x").unwrap_or(private_key);
        ensure!(digits.len() == 64, "private key must be 32 bytes");
        let bytes = hex::decode(digits).context("private key is not hex")?;
        let key = SecretKey::from_slice(&bytes).context("invalid private key")?;
        Ok(Self::new(web3, key, chain_id))
    }
}

#[async_trait::async_trait]
impl<T> TransactionSigner for LocalSigner<T>
where
    T: Transport + Send + Sync,
    <T as Transport>::Out: Send,
{
    fn address(&self) -> H160 {
        SecretKeyRef::new(&self.key).address()
    }

    async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Vec<u8>> {
        let params = TransactionParameters {
            to: Some(tx.to),
            value: tx.value,
            gas: tx.gas_limit,
            gas_price: Some(tx.gas_price),
            data: Bytes(tx.data),
            chain_id: Some(self.chain_id),
            ..Default::default()
        };
        let signed = self
            .web3
            .accounts()
            .sign_transaction(params, &self.key)
            .await
            .context("failed to sign transaction")?;
        tracing::debug!(hash = ?signed.transaction_hash, "signed transaction");
        Ok(signed.raw_transaction.0)
    }
}
