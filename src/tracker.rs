//! Tracking of sent transactions until their receipt shows up.
//!
//! A tracker owns one spawned task that waits a poll interval, asks the node for
//! the receipt and repeats until the receipt says whether the transaction
//! succeeded. Fetch errors and missing receipts only mean "try again"; the
//! transaction fails only if a receipt says so. The task races the poll loop
//! against [`TransactionTracker::cancel`] and the optional timeout of the
//! [`TrackerConfig`] and resolves exactly once with whichever finishes first.

use crate::{
    address::parse_transaction_hash, spawn_detached, DeferredResult, EthRpc, OperationError,
    TrackerConfig, TransactionReceipt,
};
use futures::future::{self, BoxFuture, Either, FutureExt};
use primitive_types::{H256, U256};
use serde::Serialize;
use std::{
    ops::Deref,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::watch;

/// How a tracked transaction ended, if it ended well.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfirmationOutcome {
    pub tx_hash: H256,
    pub succeeded: bool,
    pub message: String,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

impl ConfirmationOutcome {
    fn from_receipt(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            succeeded: true,
            message: "transaction successful".to_string(),
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    /// Waiting for the transaction to be broadcast.
    NotStarted,
    Polling,
    Resolved,
}

struct Shared {
    state: Mutex<PollState>,
    tx_hash: Mutex<Option<H256>>,
    cancel: watch::Sender<bool>,
}

/// The eventual confirmation of one transaction.
///
/// Dereferences to the underlying [`DeferredResult`] for subscribing. Clones
/// share the same polling task; dropping every handle does not stop it.
#[derive(Clone)]
pub struct TransactionTracker {
    result: DeferredResult<ConfirmationOutcome>,
    shared: Arc<Shared>,
}

impl Deref for TransactionTracker {
    type Target = DeferredResult<ConfirmationOutcome>;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}

impl TransactionTracker {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (cancel, cancelled) = watch::channel(false);
        let tracker = Self {
            result: DeferredResult::new(),
            shared: Arc::new(Shared {
                state: Mutex::new(PollState::NotStarted),
                tx_hash: Mutex::new(None),
                cancel,
            }),
        };
        (tracker, cancelled)
    }

    /// Starts polling for the receipt of an already broadcast transaction.
    ///
    /// Returns immediately. A malformed `tx_hash` resolves the tracker with
    /// [`OperationError::InvalidInput`] before returning, without contacting the node.
    pub fn start(rpc: Arc<dyn EthRpc>, tx_hash: &str, config: &TrackerConfig) -> Self {
        let (tracker, cancelled) = Self::new();
        let hash = match parse_transaction_hash(tx_hash) {
            Ok(hash) => hash,
            Err(err) => {
                tracing::warn!(%tx_hash, ?err, "not tracking transaction");
                tracker.settle(Err(OperationError::InvalidInput(
                    "invalid transaction hash".to_string(),
                )));
                return tracker;
            }
        };
        tracker.set_polling(hash);
        tracker.spawn(
            rpc,
            future::ready(Ok::<_, OperationError>(hash)).boxed(),
            cancelled,
            config,
        );
        tracker
    }

    /// Tracks a transaction whose broadcast is still in flight.
    ///
    /// The tracker stays [`PollState::NotStarted`] until `broadcast` yields the
    /// transaction hash. A broadcast error resolves the tracker with that error.
    pub fn submit<F>(rpc: Arc<dyn EthRpc>, config: &TrackerConfig, broadcast: F) -> Self
    where
        F: std::future::Future<Output = Result<H256, OperationError>> + Send + 'static,
    {
        let (tracker, cancelled) = Self::new();
        tracker.spawn(rpc, broadcast.boxed(), cancelled, config);
        tracker
    }

    /// Stops polling and resolves with [`OperationError::Cancelled`].
    ///
    /// Does nothing if the tracker already resolved.
    pub fn cancel(&self) {
        // Fails only when the polling task is gone, in which case we are resolved.
        let _ = self.shared.cancel.send(true);
    }

    pub fn poll_state(&self) -> PollState {
        *self.shared.state.lock().unwrap()
    }

    /// `None` until the transaction has been broadcast.
    pub fn tx_hash(&self) -> Option<H256> {
        *self.shared.tx_hash.lock().unwrap()
    }

    fn set_polling(&self, hash: H256) {
        *self.shared.tx_hash.lock().unwrap() = Some(hash);
        *self.shared.state.lock().unwrap() = PollState::Polling;
    }

    fn finish(&self, outcome: Result<ConfirmationOutcome, OperationError>) {
        let tx_hash = self.tx_hash();
        match &outcome {
            Ok(outcome) => {
                tracing::info!(?tx_hash, block = ?outcome.block_number, "transaction confirmed")
            }
            Err(err) => tracing::warn!(?tx_hash, %err, "transaction not confirmed"),
        }
        self.settle(outcome);
    }

    fn settle(&self, outcome: Result<ConfirmationOutcome, OperationError>) {
        *self.shared.state.lock().unwrap() = PollState::Resolved;
        self.result.resolve(outcome);
    }

    fn spawn(
        &self,
        rpc: Arc<dyn EthRpc>,
        broadcast: BoxFuture<'static, Result<H256, OperationError>>,
        cancelled: watch::Receiver<bool>,
        config: &TrackerConfig,
    ) {
        let tracker = self.clone();
        let poll_interval = config.poll_interval;
        let timeout = config.timeout;
        let task = async move {
            let work = async {
                let hash = broadcast.await?;
                tracker.set_polling(hash);
                tracing::debug!(?hash, ?poll_interval, "polling for transaction receipt");
                poll_receipt(rpc.as_ref(), hash, poll_interval).await
            };
            let deadline = async move {
                match timeout {
                    Some(timeout) => tokio::time::sleep(timeout).await,
                    None => future::pending::<()>().await,
                }
            };
            let cancelled = wait_for_cancel(cancelled);
            futures::pin_mut!(work);
            futures::pin_mut!(deadline);
            futures::pin_mut!(cancelled);
            let outcome = match future::select(work, future::select(cancelled, deadline)).await {
                Either::Left((outcome, _)) => outcome,
                Either::Right((Either::Left(_), _)) => Err(OperationError::Cancelled),
                Either::Right((Either::Right(_), _)) => Err(OperationError::TimedOut),
            };
            tracker.finish(outcome);
        };
        if !spawn_detached(task) {
            self.finish(Err(OperationError::Transport(
                "no tokio runtime to poll for the receipt on".to_string(),
            )));
        }
    }
}

async fn wait_for_cancel(mut cancelled: watch::Receiver<bool>) {
    loop {
        if *cancelled.borrow() {
            return;
        }
        if cancelled.changed().await.is_err() {
            // Nobody is left who could cancel.
            future::pending::<()>().await;
        }
    }
}

/// Returns on the first receipt. One fetch is in flight at a time.
async fn poll_receipt(
    rpc: &dyn EthRpc,
    hash: H256,
    poll_interval: Duration,
) -> Result<ConfirmationOutcome, OperationError> {
    let mut attempt = 0u64;
    loop {
        tokio::time::sleep(poll_interval).await;
        attempt += 1;
        let receipt = match rpc.transaction_receipt(hash).await {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                tracing::trace!(?hash, attempt, "transaction not mined yet");
                continue;
            }
            Err(err) => {
                tracing::debug!(?hash, attempt, ?err, "receipt fetch failed");
                continue;
            }
        };
        return match receipt.failure() {
            Some(detail) => Err(OperationError::Reverted(detail)),
            None => Ok(ConfirmationOutcome::from_receipt(&receipt)),
        };
    }
}
