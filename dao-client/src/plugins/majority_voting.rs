//! Client of the majority voting plugins.
//!
//! Address list voting and token voting share their contract interface and
//! differ only in how the voting power is assigned, which the client never
//! needs to know. They are indexed as distinct subgraph entities.
use super::{actions_token, created_proposal_id, ClientContext};
use crate::{
    abi::{encode_call, MAJORITY_VOTING},
    error::{ContentStoreError, Error, IndexerError, ValidationError},
    gateway::ContractCall,
    proposal::{
        compute_status,
        subgraph::{
            compact_id, opt_u256_from_str, opt_u64_from_str, proposal_list_variables, run_query,
            u256_from_str, u64_from_str, unix_now, SubgraphAction, SubgraphDao,
        },
        DaoAction, DaoRef, PluginFamily, ProposalMetadata, ProposalMetadataSummary,
        ProposalQuery, ProposalSnapshot, ProposalStatus,
    },
    steps::{failure_map, steps, Operation, PendingTransaction, StepValue},
};
use dao_encoding::{
    address::address_to_string, decode_ratio, extended_proposal_id, parse_proposal_id,
    ratio::RatioError, Address, U256,
};
use ethabi::Token;
use futures::{future::join_all, Stream};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{fmt, str::FromStr};

/// Precision of the ratios stored by the plugins.
pub const RATIO_DIGITS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteValue {
    Abstain,
    Yes,
    No,
}

impl VoteValue {
    /// The `uint8` vote option of the contracts, 0 meaning no vote.
    pub fn to_contract(self) -> u8 {
        match self {
            VoteValue::Abstain => 1,
            VoteValue::Yes => 2,
            VoteValue::No => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VotingMode {
    Standard,
    EarlyExecution,
    VoteReplacement,
}

impl VotingMode {
    pub fn to_contract(self) -> u8 {
        match self {
            VotingMode::Standard => 0,
            VotingMode::EarlyExecution => 1,
            VotingMode::VoteReplacement => 2,
        }
    }

    pub fn from_contract(value: u8) -> Result<Self, ValidationError> {
        match value {
            0 => Ok(VotingMode::Standard),
            1 => Ok(VotingMode::EarlyExecution),
            2 => Ok(VotingMode::VoteReplacement),
            _ => Err(ValidationError::InvalidVotingMode(value.to_string())),
        }
    }
}

impl fmt::Display for VotingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VotingMode::Standard => "Standard",
            VotingMode::EarlyExecution => "EarlyExecution",
            VotingMode::VoteReplacement => "VoteReplacement",
        };
        f.write_str(s)
    }
}

impl FromStr for VotingMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Standard" => Ok(VotingMode::Standard),
            "EarlyExecution" => Ok(VotingMode::EarlyExecution),
            "VoteReplacement" => Ok(VotingMode::VoteReplacement),
            _ => Err(ValidationError::InvalidVotingMode(s.to_owned())),
        }
    }
}

/// The majority voting plugin a client is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VotingPlugin {
    Addresslist,
    Token,
}

struct Queries {
    proposal_field: &'static str,
    proposals_field: &'static str,
    plugin_field: &'static str,
    proposal: &'static str,
    proposals: &'static str,
    members: &'static str,
    settings: &'static str,
}

macro_rules! voting_queries {
    ($proposal:literal, $proposals:literal, $plugin:literal, $entity:literal) => {
        Queries {
            proposal_field: $proposal,
            proposals_field: $proposals,
            plugin_field: $plugin,
            proposal: concat!(
                "query Proposal($proposalId: ID!) {\n  ",
                $proposal,
                "(id: $proposalId) {\n",
                "    id dao { id subdomain } creator metadata createdAt startDate endDate\n",
                "    executed potentiallyExecutable earlyExecutable yes no abstain\n",
                "    supportThreshold minVotingPower totalVotingPower votingMode\n",
                "    voters { voter { address } voteOption voteReplaced }\n",
                "    actions { to value data }\n",
                "    creationBlockNumber executionDate executionTxHash executionBlockNumber\n",
                "  }\n}"
            ),
            proposals: concat!(
                "query Proposals($where: ",
                $entity,
                "_filter!, $limit: Int!, $skip: Int!, $direction: OrderDirection!, $sortBy: ",
                $entity,
                "_orderBy!) {\n  ",
                $proposals,
                "(where: $where, first: $limit, skip: $skip, orderDirection: $direction, orderBy: $sortBy) {\n",
                "    id dao { id subdomain } creator metadata startDate endDate\n",
                "    executed potentiallyExecutable earlyExecutable yes no abstain\n",
                "    voters { voter { address } voteOption voteReplaced }\n",
                "    actions { to value data }\n",
                "  }\n}"
            ),
            members: concat!(
                "query Members($pluginAddress: ID!) {\n  ",
                $plugin,
                "(id: $pluginAddress) {\n    members { address }\n  }\n}"
            ),
            settings: concat!(
                "query Settings($pluginAddress: ID!) {\n  ",
                $plugin,
                "(id: $pluginAddress) {\n",
                "    minDuration minProposerVotingPower minParticipation supportThreshold votingMode\n",
                "  }\n}"
            ),
        }
    };
}

const ADDRESSLIST_QUERIES: Queries = voting_queries!(
    "addresslistVotingProposal",
    "addresslistVotingProposals",
    "addresslistVotingPlugin",
    "AddresslistVotingProposal"
);

const TOKEN_QUERIES: Queries = voting_queries!(
    "tokenVotingProposal",
    "tokenVotingProposals",
    "tokenVotingPlugin",
    "TokenVotingProposal"
);

impl VotingPlugin {
    fn queries(self) -> &'static Queries {
        match self {
            VotingPlugin::Addresslist => &ADDRESSLIST_QUERIES,
            VotingPlugin::Token => &TOKEN_QUERIES,
        }
    }
}

/// Parameters of [`MajorityVotingClient::create_proposal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMajorityVotingProposalParams {
    pub plugin_address: Address,
    pub metadata_uri: String,
    pub actions: Vec<DaoAction>,
    /// One flag per action; empty when no action may fail.
    pub fail_safe_actions: Vec<bool>,
    /// Unix time in seconds, 0 for now.
    pub start_date: u64,
    /// Unix time in seconds, 0 for the minimal duration.
    pub end_date: u64,
    /// Vote cast by the creator along with the creation.
    pub creator_vote: Option<VoteValue>,
    /// Execute as soon as the creator vote makes the outcome certain.
    pub execute_on_pass: bool,
}

impl CreateMajorityVotingProposalParams {
    pub fn new(plugin_address: Address, metadata_uri: impl Into<String>) -> Self {
        CreateMajorityVotingProposalParams {
            plugin_address,
            metadata_uri: metadata_uri.into(),
            actions: Vec::new(),
            fail_safe_actions: Vec::new(),
            start_date: 0,
            end_date: 0,
            creator_vote: None,
            execute_on_pass: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteProposalParams {
    pub proposal_id: String,
    pub vote: VoteValue,
    pub try_early_execution: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingSettings {
    /// Seconds.
    pub min_duration: u64,
    pub min_proposer_voting_power: U256,
    pub min_participation: f64,
    pub support_threshold: f64,
    pub voting_mode: VotingMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub yes: U256,
    pub no: U256,
    pub abstain: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalVote {
    pub address: Address,
    pub vote: VoteValue,
    pub vote_replaced: bool,
}

/// The settings a proposal was created with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalVotingSettings {
    pub support_threshold: f64,
    pub min_participation: f64,
    /// Seconds.
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MajorityVotingProposal {
    pub id: String,
    pub dao: DaoRef,
    pub creator_address: Address,
    pub metadata: ProposalMetadata,
    pub creation_date: u64,
    pub creation_block_number: u64,
    pub start_date: u64,
    pub end_date: u64,
    pub execution_date: Option<u64>,
    pub execution_block_number: Option<u64>,
    pub execution_tx_hash: Option<String>,
    pub actions: Vec<DaoAction>,
    pub status: ProposalStatus,
    pub result: VoteTally,
    pub settings: ProposalVotingSettings,
    pub voting_mode: Option<VotingMode>,
    pub total_voting_weight: U256,
    pub votes: Vec<ProposalVote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MajorityVotingProposalListItem {
    pub id: String,
    pub dao: DaoRef,
    pub creator_address: Address,
    pub metadata: ProposalMetadataSummary,
    pub start_date: u64,
    pub end_date: u64,
    pub actions: Vec<DaoAction>,
    pub status: ProposalStatus,
    pub result: VoteTally,
    pub votes: Vec<ProposalVote>,
}

#[derive(Debug, Deserialize)]
struct SubgraphMember {
    address: Address,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubgraphVoter {
    voter: SubgraphMember,
    vote_option: VoteValue,
    #[serde(default)]
    vote_replaced: bool,
}

impl From<SubgraphVoter> for ProposalVote {
    fn from(voter: SubgraphVoter) -> Self {
        ProposalVote {
            address: voter.voter.address,
            vote: voter.vote_option,
            vote_replaced: voter.vote_replaced,
        }
    }
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
    potentially_executable: bool,
    #[serde(default)]
    early_executable: Option<bool>,
    #[serde(default, deserialize_with = "opt_u256_from_str")]
    yes: Option<U256>,
    #[serde(default, deserialize_with = "opt_u256_from_str")]
    no: Option<U256>,
    #[serde(default, deserialize_with = "opt_u256_from_str")]
    abstain: Option<U256>,
    #[serde(default, deserialize_with = "opt_u256_from_str")]
    support_threshold: Option<U256>,
    #[serde(default, deserialize_with = "opt_u256_from_str")]
    min_voting_power: Option<U256>,
    #[serde(default, deserialize_with = "opt_u256_from_str")]
    total_voting_power: Option<U256>,
    #[serde(default)]
    voting_mode: Option<VotingMode>,
    voters: Vec<SubgraphVoter>,
    actions: Vec<SubgraphAction>,
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
            approval: self.potentially_executable,
            early_executable: self.early_executable,
        };
        compute_status(&snapshot, now)
    }

    fn tally(&self) -> VoteTally {
        VoteTally {
            yes: self.yes.unwrap_or_default(),
            no: self.no.unwrap_or_default(),
            abstain: self.abstain.unwrap_or_default(),
        }
    }

    /// The participation required by the proposal, out of its total
    /// voting power.
    fn settings(&self) -> Result<ProposalVotingSettings, RatioError> {
        let scale = U256::exp10(RATIO_DIGITS as usize);
        let min_participation = match (self.min_voting_power, self.total_voting_power) {
            (Some(min), Some(total)) if !total.is_zero() => {
                decode_ratio(min.saturating_mul(scale) / total, RATIO_DIGITS)?
            }
            _ => 0.0,
        };
        Ok(ProposalVotingSettings {
            support_threshold: decode_ratio(
                self.support_threshold.unwrap_or_default(),
                RATIO_DIGITS,
            )?,
            min_participation,
            duration: self.end_date.saturating_sub(self.start_date),
        })
    }

    fn into_proposal(
        self,
        metadata: ProposalMetadata,
        now: u64,
    ) -> Result<MajorityVotingProposal, RatioError> {
        Ok(MajorityVotingProposal {
            status: self.status(now),
            result: self.tally(),
            settings: self.settings()?,
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
            voting_mode: self.voting_mode,
            total_voting_weight: self.total_voting_power.unwrap_or_default(),
            votes: self.voters.into_iter().map(Into::into).collect(),
        })
    }

    fn into_list_item(
        self,
        metadata: &ProposalMetadata,
        now: u64,
    ) -> MajorityVotingProposalListItem {
        MajorityVotingProposalListItem {
            status: self.status(now),
            result: self.tally(),
            id: self.id,
            dao: self.dao.into(),
            creator_address: self.creator,
            metadata: metadata.summary(),
            start_date: self.start_date,
            end_date: self.end_date,
            actions: self.actions.into_iter().map(Into::into).collect(),
            votes: self.voters.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubgraphSettings {
    #[serde(deserialize_with = "u64_from_str")]
    min_duration: u64,
    #[serde(deserialize_with = "u256_from_str")]
    min_proposer_voting_power: U256,
    #[serde(deserialize_with = "u256_from_str")]
    min_participation: U256,
    #[serde(deserialize_with = "u256_from_str")]
    support_threshold: U256,
    voting_mode: VotingMode,
}

impl SubgraphSettings {
    fn into_settings(self) -> Result<VotingSettings, RatioError> {
        Ok(VotingSettings {
            min_duration: self.min_duration,
            min_proposer_voting_power: self.min_proposer_voting_power,
            min_participation: decode_ratio(self.min_participation, RATIO_DIGITS)?,
            support_threshold: decode_ratio(self.support_threshold, RATIO_DIGITS)?,
            voting_mode: self.voting_mode,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SubgraphMembers {
    members: Vec<SubgraphMember>,
}

/// Takes the entity named `field` out of the `data` object.
fn entity<T: serde::de::DeserializeOwned>(
    mut data: Value,
    field: &str,
    name: &'static str,
) -> Result<T, IndexerError> {
    let value = data.get_mut(field).map(Value::take).unwrap_or_default();
    serde_json::from_value(value)
        .map_err(|source| IndexerError::MalformedResponse { name, source })
}

#[derive(Clone)]
pub struct MajorityVotingClient {
    context: ClientContext,
    plugin: VotingPlugin,
}

impl MajorityVotingClient {
    pub fn new(context: ClientContext, plugin: VotingPlugin) -> Self {
        MajorityVotingClient { context, plugin }
    }

    pub fn plugin(&self) -> VotingPlugin {
        self.plugin
    }

    /// Submits the creation of a proposal. The payload of the confirmation
    /// is the id of the new proposal.
    pub async fn submit_create_proposal(
        &self,
        params: CreateMajorityVotingProposalParams,
    ) -> Result<PendingTransaction<String>, Error> {
        let allow_failure_map = failure_map(params.actions.len(), &params.fail_safe_actions)?;
        let vote_option = params.creator_vote.map(VoteValue::to_contract).unwrap_or(0);
        let data = encode_call(
            &MAJORITY_VOTING,
            "createProposal",
            &[
                Token::Bytes(params.metadata_uri.into_bytes()),
                actions_token(&params.actions),
                Token::Uint(allow_failure_map),
                Token::Uint(params.start_date.into()),
                Token::Uint(params.end_date.into()),
                Token::Uint(vote_option.into()),
                Token::Bool(params.execute_on_pass),
            ],
        )?;
        let plugin_address = params.plugin_address;
        PendingTransaction::submit(
            self.context.contract.clone(),
            Operation::CreateProposal,
            ContractCall::new(plugin_address, data),
            move |receipt| created_proposal_id(&MAJORITY_VOTING, plugin_address, &receipt.logs),
        )
        .await
    }

    pub fn create_proposal(
        &self,
        params: CreateMajorityVotingProposalParams,
    ) -> impl Stream<Item = Result<StepValue<String>, Error>> + Send {
        let client = self.clone();
        steps(async move { client.submit_create_proposal(params).await })
    }

    pub async fn submit_vote_proposal(
        &self,
        params: VoteProposalParams,
    ) -> Result<PendingTransaction<()>, Error> {
        let proposal_id = parse_proposal_id(&params.proposal_id)?;
        let data = encode_call(
            &MAJORITY_VOTING,
            "vote",
            &[
                Token::Uint(proposal_id.nonce),
                Token::Uint(params.vote.to_contract().into()),
                Token::Bool(params.try_early_execution),
            ],
        )?;
        PendingTransaction::submit(
            self.context.contract.clone(),
            Operation::VoteProposal,
            ContractCall::new(proposal_id.plugin_address, data),
            |_| Ok(()),
        )
        .await
    }

    pub fn vote_proposal(
        &self,
        params: VoteProposalParams,
    ) -> impl Stream<Item = Result<StepValue<()>, Error>> + Send {
        let client = self.clone();
        steps(async move { client.submit_vote_proposal(params).await })
    }

    pub async fn submit_execute_proposal(
        &self,
        proposal_id: &str,
    ) -> Result<PendingTransaction<()>, Error> {
        let proposal_id = parse_proposal_id(proposal_id)?;
        let data = encode_call(&MAJORITY_VOTING, "execute", &[Token::Uint(proposal_id.nonce)])?;
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

    pub async fn pin_metadata(&self, metadata: &ProposalMetadata) -> Result<String, ContentStoreError> {
        crate::proposal::pin_metadata(self.context.content_store.as_ref(), metadata).await
    }

    pub async fn get_proposal(
        &self,
        proposal_id: &str,
    ) -> Result<Option<MajorityVotingProposal>, Error> {
        let proposal_id = extended_proposal_id(proposal_id)?;
        let queries = self.plugin.queries();
        let data: Value = run_query(
            self.context.indexer.as_ref(),
            "Majority voting proposal",
            queries.proposal,
            json!({ "proposalId": proposal_id }),
        )
        .await?;
        let proposal: Option<SubgraphProposal> =
            entity(data, queries.proposal_field, "Majority voting proposal")?;
        let proposal = match proposal {
            Some(proposal) => proposal,
            None => return Ok(None),
        };
        let metadata = self
            .context
            .metadata(proposal.metadata.as_deref().unwrap_or_default())
            .await;
        let proposal = proposal
            .into_proposal(metadata, unix_now())
            .map_err(|source| IndexerError::InvalidRecord {
                name: "Majority voting proposal",
                source,
            })?;
        Ok(Some(proposal))
    }

    pub async fn get_proposals(
        &self,
        query: &ProposalQuery,
    ) -> Result<Vec<MajorityVotingProposalListItem>, Error> {
        let now = unix_now();
        let queries = self.plugin.queries();
        let variables = proposal_list_variables(
            self.context.contract.as_ref(),
            query,
            PluginFamily::MajorityVoting,
            now,
        )
        .await?;
        let data: Value = run_query(
            self.context.indexer.as_ref(),
            "Majority voting proposals",
            queries.proposals,
            variables,
        )
        .await?;
        let proposals: Vec<SubgraphProposal> =
            entity(data, queries.proposals_field, "Majority voting proposals")?;
        let metadata = join_all(proposals.iter().map(|proposal| {
            self.context
                .metadata(proposal.metadata.as_deref().unwrap_or_default())
        }))
        .await;
        Ok(proposals
            .into_iter()
            .zip(metadata)
            .map(|(proposal, metadata)| proposal.into_list_item(&metadata, now))
            .collect())
    }

    pub async fn get_members(&self, plugin_address: Address) -> Result<Vec<Address>, IndexerError> {
        let queries = self.plugin.queries();
        let data: Value = run_query(
            self.context.indexer.as_ref(),
            "Majority voting members",
            queries.members,
            json!({ "pluginAddress": address_to_string(&plugin_address) }),
        )
        .await?;
        let plugin: Option<SubgraphMembers> =
            entity(data, queries.plugin_field, "Majority voting members")?;
        Ok(plugin
            .map(|plugin| plugin.members.into_iter().map(|m| m.address).collect())
            .unwrap_or_default())
    }

    pub async fn get_voting_settings(
        &self,
        plugin_address: Address,
    ) -> Result<Option<VotingSettings>, Error> {
        let queries = self.plugin.queries();
        let data: Value = run_query(
            self.context.indexer.as_ref(),
            "Majority voting settings",
            queries.settings,
            json!({ "pluginAddress": address_to_string(&plugin_address) }),
        )
        .await?;
        let settings: Option<SubgraphSettings> =
            entity(data, queries.plugin_field, "Majority voting settings")?;
        let settings = settings
            .map(SubgraphSettings::into_settings)
            .transpose()
            .map_err(|source| IndexerError::InvalidRecord {
                name: "Majority voting settings",
                source,
            })?;
        Ok(settings)
    }
}
