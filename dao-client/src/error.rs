use crate::gateway::TransportError;
use dao_encoding::{
    address::{InvalidAddress, InvalidAddressOrEns},
    bitmap::BitmapError,
    cid::InvalidCid,
    proposal_id::ProposalIdError,
    ratio::RatioError,
    util::HexError,
    H256, U256,
};
use thiserror::Error;

/// Input rejected before anything is sent over the network.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error(transparent)]
    ProposalId(#[from] ProposalIdError),

    #[error(transparent)]
    Ratio(#[from] RatioError),

    #[error(transparent)]
    Bitmap(#[from] BitmapError),

    /// The fail-safe flags do not line up with the actions.
    #[error("size mismatch: {actions} actions but {fail_safe_actions} fail-safe flags")]
    SizeMismatch {
        actions: usize,
        fail_safe_actions: usize,
    },

    #[error(transparent)]
    InvalidCid(#[from] InvalidCid),

    #[error(transparent)]
    InvalidAddress(#[from] InvalidAddress),

    #[error(transparent)]
    InvalidAddressOrEns(#[from] InvalidAddressOrEns),

    #[error("invalid voting mode: {0}")]
    InvalidVotingMode(String),

    #[error(transparent)]
    Hex(#[from] HexError),

    #[error("cannot encode the `{function}` call: {reason}")]
    CallEncoding {
        function: &'static str,
        reason: String,
    },
}

/// The transaction could not be sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("no signer available")]
    NoSigner,

    #[error("no provider available")]
    NoProvider,

    #[error("the transaction was rejected by the signer: {0}")]
    Rejected(String),

    #[error("RPC failure: {0}")]
    Rpc(String),

    #[error("the transaction {transaction_hash:#x} reverted")]
    Reverted { transaction_hash: H256 },
}

/// The transaction was mined but its outcome is not the expected one.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfirmationError {
    #[error("operation confirmation error: the `{event}` event was not emitted")]
    MissingEvent { event: &'static str },

    #[error("operation confirmation error: malformed `{event}` event: {reason}")]
    MalformedEvent { event: &'static str, reason: String },

    #[error("operation confirmation error: allowance of {granted} granted, {requested} requested")]
    AllowanceNotGranted { requested: U256, granted: U256 },
}

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("cannot process the `{name}` query")]
    Query {
        name: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("unexpected response to the `{name}` query")]
    MalformedResponse {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The record was read but one of its values is out of range.
    #[error("invalid record in the response to the `{name}` query")]
    InvalidRecord {
        name: &'static str,
        #[source]
        source: RatioError,
    },

    #[error("invalid address or ENS name")]
    InvalidAddressOrEns,
}

/// Metadata could not be stored. Reading metadata never fails.
#[derive(Debug, Error)]
pub enum ContentStoreError {
    #[error("cannot pin the metadata")]
    Pin(#[source] TransportError),
}

/// Any failure of the client.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),

    #[error(transparent)]
    Indexer(#[from] IndexerError),

    #[error(transparent)]
    ContentStore(#[from] ContentStoreError),
}

macro_rules! validation_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for Error {
                fn from(error: $source) -> Self {
                    Error::Validation(error.into())
                }
            }
        )*
    };
}

validation_error_from!(
    ProposalIdError,
    RatioError,
    BitmapError,
    InvalidCid,
    InvalidAddress,
    InvalidAddressOrEns,
    HexError,
);
