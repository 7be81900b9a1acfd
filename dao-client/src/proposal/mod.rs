//! Proposals as seen by the clients of the governance plugins.
pub mod metadata;
pub mod query;
pub mod status;
pub(crate) mod subgraph;

pub use metadata::{
    pin_metadata, resolve_metadata, MetadataLink, ProposalMedia, ProposalMetadata,
    ProposalMetadataSummary, ProposalResource,
};
pub use query::{ProposalQuery, ProposalSortBy, SortDirection};
pub use status::{compute_status, status_filter, PluginFamily, ProposalSnapshot, ProposalStatus};

use dao_encoding::{Address, U256};
use serde::Serialize;

/// The DAO a proposal belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaoRef {
    pub address: Address,
    /// ENS subdomain of the DAO.
    pub name: String,
}

/// A call the DAO performs when the proposal executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaoAction {
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
}
