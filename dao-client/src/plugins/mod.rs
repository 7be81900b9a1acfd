//! Clients of the governance plugins and of the DAO itself.
//!
//! Writes return the stream of [`StepValue`](crate::steps::StepValue)s of
//! their transaction; the `submit_*` variants stop at the
//! [`PendingTransaction`](crate::steps::PendingTransaction) for callers that
//! drive the confirmation themselves.
pub mod dao;
pub mod majority_voting;
pub mod multisig;

pub use dao::{
    DaoClient, MultiTargetPermission, PermissionOperation, PrepareInstallationParams,
    PreparedInstallation, SetAllowanceParams, VersionTag,
};
pub use majority_voting::{MajorityVotingClient, VoteValue, VotingMode, VotingPlugin};
pub use multisig::MultisigClient;

use crate::{
    abi::EventArgs,
    error::{ConfirmationError, Error},
    gateway::{ContentStoreGateway, ContractGateway, IndexerGateway, Log},
    proposal::{resolve_metadata, DaoAction, ProposalMetadata},
};
use dao_encoding::{address::address_to_string, encode_proposal_id, Address};
use ethabi::{Contract, Token};
use std::sync::Arc;

/// The gateways shared by every client.
#[derive(Clone)]
pub struct ClientContext {
    pub contract: Arc<dyn ContractGateway>,
    pub indexer: Arc<dyn IndexerGateway>,
    pub content_store: Arc<dyn ContentStoreGateway>,
}

impl ClientContext {
    pub fn new(
        contract: Arc<dyn ContractGateway>,
        indexer: Arc<dyn IndexerGateway>,
        content_store: Arc<dyn ContentStoreGateway>,
    ) -> Self {
        ClientContext {
            contract,
            indexer,
            content_store,
        }
    }

    /// Resolves the metadata reference of a proposal, falling back to a
    /// placeholder.
    pub(crate) async fn metadata(&self, reference: &str) -> ProposalMetadata {
        resolve_metadata(self.content_store.as_ref(), reference)
            .await
            .into_metadata()
    }
}

/// The `(address to, uint256 value, bytes data)[]` argument of the
/// proposal creation.
pub(crate) fn actions_token(actions: &[DaoAction]) -> Token {
    Token::Array(
        actions
            .iter()
            .map(|action| {
                Token::Tuple(vec![
                    Token::Address(action.to),
                    Token::Uint(action.value),
                    Token::Bytes(action.data.clone()),
                ])
            })
            .collect(),
    )
}

/// The id of the proposal announced by the `ProposalCreated` event of
/// `plugin_address`.
pub(crate) fn created_proposal_id(
    contract: &Contract,
    plugin_address: Address,
    logs: &[Log],
) -> Result<String, Error> {
    let args = EventArgs::extract(contract, "ProposalCreated", logs)?;
    let nonce = args.uint("proposalId")?;
    encode_proposal_id(&address_to_string(&plugin_address), nonce).map_err(|e| {
        ConfirmationError::MalformedEvent {
            event: "ProposalCreated",
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::testing::{MockContentStore, MockContractGateway, MockIndexer};
    use dao_encoding::{H256, U256};
    use ethabi::Event;

    pub struct Fixture {
        pub contract: Arc<MockContractGateway>,
        pub indexer: Arc<MockIndexer>,
        pub content_store: Arc<MockContentStore>,
    }

    impl Fixture {
        pub fn new() -> Self {
            Fixture {
                contract: Arc::new(MockContractGateway::new()),
                indexer: Arc::new(MockIndexer::new()),
                content_store: Arc::new(MockContentStore::new()),
            }
        }

        pub fn context(&self) -> ClientContext {
            ClientContext::new(
                self.contract.clone(),
                self.indexer.clone(),
                self.content_store.clone(),
            )
        }
    }

    pub fn plugin_address() -> Address {
        Address::from_low_u64_be(0x1234)
    }

    /// `ProposalCreated` as emitted by both plugin families.
    pub fn proposal_created(event: &Event, plugin: Address, nonce: u64) -> Log {
        crate::testing::event_log(
            event,
            plugin,
            vec![
                H256::from_low_u64_be(nonce),
                H256::from(Address::from_low_u64_be(0xc0ffee)),
            ],
            &[
                Token::Uint(U256::from(1)),
                Token::Uint(U256::from(2)),
                Token::Bytes(b"ipfs://QmQPeNsJPyVWPFDVHb77w8G42Fvo15z4bG2X8D2GhfbSXc".to_vec()),
                Token::Array(vec![]),
                Token::Uint(U256::zero()),
            ],
        )
    }
}
