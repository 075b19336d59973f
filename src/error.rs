//! Errors reported through the error channel of a [`DeferredResult`](crate::DeferredResult).

use thiserror::Error;

/// Why an operation did not produce a value.
///
/// Every failure of a query, gas estimate or tracked transaction ends up here,
/// delivered to error observers rather than returned from the call that started
/// the operation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OperationError {
    /// The node could not be reached, answered with an error, or sent data that
    /// could not be decoded.
    #[error("transport error: {0}")]
    Transport(String),
    /// The node answered but the value cannot be told apart from "no data".
    #[error("inconclusive result: {0}")]
    Inconclusive(String),
    /// The transaction was mined and the chain rejected it.
    #[error("transaction failed: {0}")]
    Reverted(String),
    /// Rejected before any request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("cancelled")]
    Cancelled,
    #[error("timed out")]
    TimedOut,
}

/// Category of an [`OperationError`] without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Inconclusive,
    Reverted,
    InvalidInput,
    Cancelled,
    TimedOut,
}

impl OperationError {
    /// Wraps a collaborator error, keeping its whole context chain in the message.
    pub fn transport(err: anyhow::Error) -> Self {
        Self::Transport(format!("{:#}", err))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Inconclusive(_) => ErrorKind::Inconclusive,
            Self::Reverted(_) => ErrorKind::Reverted,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::TimedOut => ErrorKind::TimedOut,
        }
    }

    /// True when the chain itself rejected the transaction, as opposed to us
    /// giving up on it or never reaching the node.
    pub fn is_transaction_failure(&self) -> bool {
        matches!(self, Self::Reverted(_))
    }
}
