//! Client of the multisig plugin.
//!
//! A multisig proposal passes once `minApprovals` listed members approved
//! it. Approving may also try to execute the proposal in the same
//! transaction.
use super::{actions_token, created_proposal_id, ClientContext};
use crate::{
    abi::{encode_call, MULTISIG},
    error::{ContentStoreError, Error, IndexerError},
    gateway::ContractCall,
    proposal::{
        compute_status,
        subgraph::{
            compact_id, member_address, opt_u64_from_str, proposal_list_variables, run_query,
            u64_from_str, unix_now, SubgraphAction, SubgraphDao,
        },
        DaoAction, DaoRef, PluginFamily, ProposalMetadata, ProposalMetadataSummary,
        ProposalQuery, ProposalSnapshot, ProposalStatus,
    },
    steps::{failure_map, steps, Operation, PendingTransaction, StepValue},
};
use dao_encoding::{
    address::address_to_string, extended_proposal_id, parse_proposal_id, Address,
};
use ethabi::Token;
use futures::{future::join_all, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;

const QUERY_PROPOSAL: &str = r#"
query MultisigProposal($proposalId: ID!) {
  multisigProposal(id: $proposalId) {
    id
    dao { id subdomain }
    creator
    metadata
    createdAt
    startDate
    endDate
    executed
    approvalReached
    approvers { id }
    actions { to value data }
    minApprovals
    plugin { onlyListed }
    creationBlockNumber
    executionDate
    executionTxHash
    executionBlockNumber
  }
}"#;

const QUERY_PROPOSALS: &str = r#"
query MultisigProposals($where: MultisigProposal_filter!, $limit: Int!, $skip: Int!, $direction: OrderDirection!, $sortBy: MultisigProposal_orderBy!) {
  multisigProposals(where: $where, first: $limit, skip: $skip, orderDirection: $direction, orderBy: $sortBy) {
    id
    dao { id subdomain }
    creator
    metadata
    startDate
    endDate
    executed
    approvalReached
    approvers { id }
    actions { to value data }
    minApprovals
    plugin { onlyListed }
  }
}"#;

const QUERY_MEMBERS: &str = r#"
query MultisigMembers($pluginAddress: ID!) {
  multisigPlugin(id: $pluginAddress) {
    members { address }
  }
}"#;

const QUERY_SETTINGS: &str = r#"
query MultisigSettings($pluginAddress: ID!) {
  multisigPlugin(id: $pluginAddress) {
    onlyListed
    minApprovals
  }
}"#;

/// Parameters of [`MultisigClient::create_proposal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMultisigProposalParams {
    pub plugin_address: Address,
    /// Usually the `ipfs://` URI returned by
    /// [`pin_metadata`](MultisigClient::pin_metadata).
    pub metadata_uri: String,
    pub actions: Vec<DaoAction>,
    /// One flag per action; empty when no action may fail.
    pub fail_safe_actions: Vec<bool>,
    /// Approve the proposal on behalf of its creator.
    pub approve: bool,
    /// Execute the proposal right away if the approval suffices.
    pub try_execution: bool,
    /// Unix time in seconds, 0 for now.
    pub start_date: u64,
    /// Unix time in seconds, 0 for the plugin default.
    pub end_date: u64,
}

impl CreateMultisigProposalParams {
    /// A proposal without actions, open now, executed as soon as approved.
    pub fn new(plugin_address: Address, metadata_uri: impl Into<String>) -> Self {
        CreateMultisigProposalParams {
            plugin_address,
            metadata_uri: metadata_uri.into(),
            actions: Vec::new(),
            fail_safe_actions: Vec::new(),
            approve: false,
            try_execution: true,
            start_date: 0,
            end_date: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveMultisigProposalParams {
    pub proposal_id: String,
    pub try_execution: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigVotingSettings {
    pub only_listed: bool,
    pub min_approvals: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigProposal {
    pub id: String,
    pub dao: DaoRef,
    pub creator_address: Address,
    pub metadata: ProposalMetadata,
    pub settings: MultisigVotingSettings,
    pub creation_date: u64,
    pub creation_block_number: u64,
    pub start_date: u64,
    pub end_date: u64,
    pub execution_date: Option<u64>,
    pub execution_block_number: Option<u64>,
    pub execution_tx_hash: Option<String>,
    pub actions: Vec<DaoAction>,
    pub status: ProposalStatus,
    pub approvals: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigProposalListItem {
    pub id: String,
    pub dao: DaoRef,
    pub creator_address: Address,
    pub metadata: ProposalMetadataSummary,
    pub settings: MultisigVotingSettings,
    pub start_date: u64,
    pub end_date: u64,
    pub actions: Vec<DaoAction>,
    pub status: ProposalStatus,
    pub approvals: Vec<Address>,
}

#[derive(Debug, Deserialize)]
struct SubgraphApprover {
    #[serde(deserialize_with = "member_address")]
    id: Address,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubgraphPluginRef {
    only_listed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubgraphProposal {
    #[serde(deserialize_with = "compact_id")]
    id: String,
    dao: SubgraphDao,
    creator: Address,
    #[serde(default)]
    metadata: Option<String>,
    #[serde(default, deserialize_with = "opt_u64_from_str")]
    created_at: Option<u64>,
    #[serde(deserialize_with = "u64_from_str")]
    start_date: u64,
    #[serde(deserialize_with = "u64_from_str")]
    end_date: u64,
    executed: bool,
    approval_reached: bool,
    approvers: Vec<SubgraphApprover>,
    actions: Vec<SubgraphAction>,
    min_approvals: u32,
    plugin: SubgraphPluginRef,
    #[serde(default, deserialize_with = "opt_u64_from_str")]
    creation_block_number: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64_from_str")]
    execution_date: Option<u64>,
    #[serde(default)]
    execution_tx_hash: Option<String>,
    #[serde(default, deserialize_with = "opt_u64_from_str")]
    execution_block_number: Option<u64>,
}

impl SubgraphProposal {
    fn status(&self, now: u64) -> ProposalStatus {
        let snapshot = ProposalSnapshot {
            start_date: self.start_date,
            end_date: self.end_date,
            executed: self.executed,
            approval: self.approval_reached,
            early_executable: None,
        };
        compute_status(&snapshot, now)
    }

    fn settings(&self) -> MultisigVotingSettings {
        MultisigVotingSettings {
            only_listed: self.plugin.only_listed,
            min_approvals: self.min_approvals,
        }
    }

    fn into_proposal(self, metadata: ProposalMetadata, now: u64) -> MultisigProposal {
        MultisigProposal {
            status: self.status(now),
            settings: self.settings(),
            id: self.id,
            dao: self.dao.into(),
            creator_address: self.creator,
            metadata,
            creation_date: self.created_at.unwrap_or_default(),
            creation_block_number: self.creation_block_number.unwrap_or_default(),
            start_date: self.start_date,
            end_date: self.end_date,
            execution_date: self.execution_date,
            execution_block_number: self.execution_block_number,
            execution_tx_hash: self.execution_tx_hash.filter(|hash| !hash.is_empty()),
            actions: self.actions.into_iter().map(Into::into).collect(),
            approvals: self.approvers.into_iter().map(|a| a.id).collect(),
        }
    }

    fn into_list_item(self, metadata: &ProposalMetadata, now: u64) -> MultisigProposalListItem {
        MultisigProposalListItem {
            status: self.status(now),
            settings: self.settings(),
            id: self.id,
            dao: self.dao.into(),
            creator_address: self.creator,
            metadata: metadata.summary(),
            start_date: self.start_date,
            end_date: self.end_date,
            actions: self.actions.into_iter().map(Into::into).collect(),
            approvals: self.approvers.into_iter().map(|a| a.id).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProposalResponse {
    multisig_proposal: Option<SubgraphProposal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProposalsResponse {
    multisig_proposals: Vec<SubgraphProposal>,
}

#[derive(Debug, Deserialize)]
struct SubgraphMember {
    address: Address,
}

#[derive(Debug, Deserialize)]
struct SubgraphMembers {
    members: Vec<SubgraphMember>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembersResponse {
    multisig_plugin: Option<SubgraphMembers>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsResponse {
    multisig_plugin: Option<MultisigVotingSettings>,
}

#[derive(Clone)]
pub struct MultisigClient {
    context: ClientContext,
}

impl MultisigClient {
    pub fn new(context: ClientContext) -> Self {
        MultisigClient { context }
    }

    /// Submits the creation of a proposal. The payload of the confirmation
    /// is the id of the new proposal.
    pub async fn submit_create_proposal(
        &self,
        params: CreateMultisigProposalParams,
    ) -> Result<PendingTransaction<String>, Error> {
        let allow_failure_map = failure_map(params.actions.len(), &params.fail_safe_actions)?;
        let data = encode_call(
            &MULTISIG,
            "createProposal",
            &[
                Token::Bytes(params.metadata_uri.into_bytes()),
                actions_token(&params.actions),
                Token::Uint(allow_failure_map),
                Token::Bool(params.approve),
                Token::Bool(params.try_execution),
                Token::Uint(params.start_date.into()),
                Token::Uint(params.end_date.into()),
            ],
        )?;
        let plugin_address = params.plugin_address;
        PendingTransaction::submit(
            self.context.contract.clone(),
            Operation::CreateProposal,
            ContractCall::new(plugin_address, data),
            move |receipt| created_proposal_id(&MULTISIG, plugin_address, &receipt.logs),
        )
        .await
    }

    pub fn create_proposal(
        &self,
        params: CreateMultisigProposalParams,
    ) -> impl Stream<Item = Result<StepValue<String>, Error>> + Send {
        let client = self.clone();
        steps(async move { client.submit_create_proposal(params).await })
    }

    pub async fn submit_approve_proposal(
        &self,
        params: ApproveMultisigProposalParams,
    ) -> Result<PendingTransaction<()>, Error> {
        let proposal_id = parse_proposal_id(&params.proposal_id)?;
        let data = encode_call(
            &MULTISIG,
            "approve",
            &[
                Token::Uint(proposal_id.nonce),
                Token::Bool(params.try_execution),
            ],
        )?;
        PendingTransaction::submit(
            self.context.contract.clone(),
            Operation::ApproveProposal,
            ContractCall::new(proposal_id.plugin_address, data),
            |_| Ok(()),
        )
        .await
    }

    pub fn approve_proposal(
        &self,
        params: ApproveMultisigProposalParams,
    ) -> impl Stream<Item = Result<StepValue<()>, Error>> + Send {
        let client = self.clone();
        steps(async move { client.submit_approve_proposal(params).await })
    }

    pub async fn submit_execute_proposal(
        &self,
        proposal_id: &str,
    ) -> Result<PendingTransaction<()>, Error> {
        let proposal_id = parse_proposal_id(proposal_id)?;
        let data = encode_call(&MULTISIG, "execute", &[Token::Uint(proposal_id.nonce)])?;
        PendingTransaction::submit(
            self.context.contract.clone(),
            Operation::ExecuteProposal,
            ContractCall::new(proposal_id.plugin_address, data),
            |_| Ok(()),
        )
        .await
    }

    pub fn execute_proposal(
        &self,
        proposal_id: String,
    ) -> impl Stream<Item = Result<StepValue<()>, Error>> + Send {
        let client = self.clone();
        steps(async move { client.submit_execute_proposal(&proposal_id).await })
    }

    /// Stores the metadata of a future proposal, returning its `ipfs://`
    /// URI.
    pub async fn pin_metadata(&self, metadata: &ProposalMetadata) -> Result<String, ContentStoreError> {
        crate::proposal::pin_metadata(self.context.content_store.as_ref(), metadata).await
    }

    /// The proposal with its full metadata, `None` when the subgraph does
    /// not know it.
    pub async fn get_proposal(&self, proposal_id: &str) -> Result<Option<MultisigProposal>, Error> {
        let proposal_id = extended_proposal_id(proposal_id)?;
        let response: ProposalResponse = run_query(
            self.context.indexer.as_ref(),
            "Multisig proposal",
            QUERY_PROPOSAL,
            json!({ "proposalId": proposal_id }),
        )
        .await?;
        let proposal = match response.multisig_proposal {
            Some(proposal) => proposal,
            None => return Ok(None),
        };
        let metadata = self
            .context
            .metadata(proposal.metadata.as_deref().unwrap_or_default())
            .await;
        Ok(Some(proposal.into_proposal(metadata, unix_now())))
    }

    pub async fn get_proposals(
        &self,
        query: &ProposalQuery,
    ) -> Result<Vec<MultisigProposalListItem>, Error> {
        let now = unix_now();
        let variables = proposal_list_variables(
            self.context.contract.as_ref(),
            query,
            PluginFamily::Multisig,
            now,
        )
        .await?;
        let response: ProposalsResponse = run_query(
            self.context.indexer.as_ref(),
            "Multisig proposals",
            QUERY_PROPOSALS,
            variables,
        )
        .await?;
        let metadata = join_all(response.multisig_proposals.iter().map(|proposal| {
            self.context
                .metadata(proposal.metadata.as_deref().unwrap_or_default())
        }))
        .await;
        Ok(response
            .multisig_proposals
            .into_iter()
            .zip(metadata)
            .map(|(proposal, metadata)| proposal.into_list_item(&metadata, now))
            .collect())
    }

    pub async fn get_members(&self, plugin_address: Address) -> Result<Vec<Address>, IndexerError> {
        let response: MembersResponse = run_query(
            self.context.indexer.as_ref(),
            "Multisig members",
            QUERY_MEMBERS,
            json!({ "pluginAddress": address_to_string(&plugin_address) }),
        )
        .await?;
        Ok(response
            .multisig_plugin
            .map(|plugin| plugin.members.into_iter().map(|m| m.address).collect())
            .unwrap_or_default())
    }

    pub async fn get_voting_settings(
        &self,
        plugin_address: Address,
    ) -> Result<Option<MultisigVotingSettings>, IndexerError> {
        let response: SettingsResponse = run_query(
            self.context.indexer.as_ref(),
            "Multisig settings",
            QUERY_SETTINGS,
            json!({ "pluginAddress": address_to_string(&plugin_address) }),
        )
        .await?;
        Ok(response.multisig_plugin)
    }
}
