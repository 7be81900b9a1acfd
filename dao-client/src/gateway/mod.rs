//! Boundaries with the external services the client drives.
//!
//! The client never talks to a node, a subgraph or an IPFS daemon
//! directly: it goes through these traits, which the embedding application
//! implements on top of its own transports. All of them are object safe
//! and shared behind `Arc<dyn …>`.
mod contract;
mod content_store;
mod indexer;

pub use contract::{ContractCall, ContractGateway, Log, TransactionReceipt};
pub use content_store::ContentStoreGateway;
pub use indexer::{GraphqlRequest, IndexerGateway};

use thiserror::Error;

/// A failure reported by a transport, carried as text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        TransportError(message.into())
    }
}
