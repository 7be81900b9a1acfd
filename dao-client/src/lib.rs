//! Client of the DAO governance plugins.
//!
//! Writes are submitted through a [`ContractGateway`](gateway::ContractGateway)
//! and observed as a submitted step followed by the confirmed outcome.
//! Reads go to the subgraph through an [`IndexerGateway`](gateway::IndexerGateway),
//! proposal statuses are derived locally and proposal metadata is fetched
//! from a [`ContentStoreGateway`](gateway::ContentStoreGateway).
pub mod abi;
pub mod config;
pub mod error;
pub mod gateway;
pub mod plugins;
pub mod proposal;
pub mod steps;

#[cfg(any(test, feature = "property-test-api"))]
pub mod testing;

pub use dao_encoding;

pub use config::{ClientConfig, Network};
pub use error::{
    ConfirmationError, ContentStoreError, Error, IndexerError, SubmissionError, ValidationError,
};
pub use plugins::{ClientContext, DaoClient, MajorityVotingClient, MultisigClient};
pub use proposal::{MetadataLink, ProposalMetadata, ProposalStatus};
pub use steps::{PendingTransaction, StepValue};
