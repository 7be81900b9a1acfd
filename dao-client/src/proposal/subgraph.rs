//! Records of the subgraph and the plumbing shared by the proposal queries.
//!
//! The subgraph serializes big integers and timestamps as decimal strings
//! and byte arrays as `0x` prefixed hex.
use super::{
    query::ProposalQuery,
    status::{status_filter, PluginFamily},
    DaoAction, DaoRef,
};
use crate::{
    error::IndexerError,
    gateway::{ContractGateway, GraphqlRequest, IndexerGateway},
};
use dao_encoding::{
    address::{address_to_string, parse_address},
    util::hex_to_bytes,
    compact_proposal_id, Address, AddressOrEns, U256,
};
use serde::{de, de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Current unix time, in seconds.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

pub(crate) fn u64_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(de::Error::custom)
}

pub(crate) fn opt_u64_from_str<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(s) if !s.is_empty() => s.parse().map(Some).map_err(de::Error::custom),
        _ => Ok(None),
    }
}

pub(crate) fn u256_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    let s = String::deserialize(deserializer)?;
    U256::from_dec_str(&s).map_err(|e| de::Error::custom(format!("{:?}", e)))
}

pub(crate) fn opt_u256_from_str<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<U256>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(s) if !s.is_empty() => U256::from_dec_str(&s)
            .map(Some)
            .map_err(|e| de::Error::custom(format!("{:?}", e))),
        _ => Ok(None),
    }
}

pub(crate) fn bytes_from_hex<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    hex_to_bytes(&s).map_err(de::Error::custom)
}

/// Proposal ids, compacted.
pub(crate) fn compact_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let s = String::deserialize(deserializer)?;
    compact_proposal_id(&s).map_err(de::Error::custom)
}

/// Member entities are keyed by `<member address>_<plugin address>`.
pub(crate) fn member_address<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Address, D::Error> {
    let s = String::deserialize(deserializer)?;
    let address = s.get(..42).unwrap_or(&s);
    parse_address(address).map_err(de::Error::custom)
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubgraphDao {
    pub id: Address,
    pub subdomain: String,
}

impl From<SubgraphDao> for DaoRef {
    fn from(dao: SubgraphDao) -> Self {
        DaoRef {
            address: dao.id,
            name: dao.subdomain,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubgraphAction {
    pub to: Address,
    #[serde(deserialize_with = "u256_from_str")]
    pub value: U256,
    #[serde(deserialize_with = "bytes_from_hex")]
    pub data: Vec<u8>,
}

impl From<SubgraphAction> for DaoAction {
    fn from(action: SubgraphAction) -> Self {
        DaoAction {
            to: action.to,
            value: action.value,
            data: action.data,
        }
    }
}

/// Runs `query` and deserializes the `data` object of the response.
pub(crate) async fn run_query<T: DeserializeOwned>(
    indexer: &dyn IndexerGateway,
    name: &'static str,
    query: &'static str,
    variables: Value,
) -> Result<T, IndexerError> {
    debug!(query = name, %variables, "querying the subgraph");
    let data = indexer
        .request(GraphqlRequest {
            name,
            query,
            variables,
        })
        .await
        .map_err(|source| IndexerError::Query { name, source })?;
    serde_json::from_value(data).map_err(|source| IndexerError::MalformedResponse { name, source })
}

/// Variables of a proposal listing, with the DAO resolved and the status
/// translated into the `where` predicate.
pub(crate) async fn proposal_list_variables(
    contract: &dyn ContractGateway,
    query: &ProposalQuery,
    family: PluginFamily,
    now: u64,
) -> Result<Value, IndexerError> {
    let mut predicate = match query.status {
        Some(status) => status_filter(status, now, family),
        None => json!({}),
    };
    if let Some(dao) = &query.dao_address_or_ens {
        let address = match dao {
            AddressOrEns::Address(address) => *address,
            AddressOrEns::Ens(name) => contract
                .resolve_name(name)
                .await
                .ok()
                .flatten()
                .ok_or(IndexerError::InvalidAddressOrEns)?,
        };
        predicate["dao"] = json!(address_to_string(&address));
    }
    Ok(json!({
        "where": predicate,
        "limit": query.limit,
        "skip": query.skip,
        "direction": query.direction,
        "sortBy": query.sort_by,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        proposal::{ProposalSortBy, ProposalStatus, SortDirection},
        testing::MockContractGateway,
    };
    use futures::executor::block_on;

    #[derive(Debug, Deserialize)]
    struct Record {
        #[serde(deserialize_with = "u64_from_str")]
        start_date: u64,
        #[serde(default, deserialize_with = "opt_u64_from_str")]
        execution_date: Option<u64>,
        #[serde(deserialize_with = "member_address")]
        approver: Address,
        action: SubgraphAction,
    }

    #[test]
    fn subgraph_encodings() {
        let record: Record = serde_json::from_value(json!({
            "start_date": "1700000000",
            "execution_date": null,
            "approver": "0x0000000000000000000000000000000000000001_0x0000000000000000000000000000000000000002",
            "action": {
                "to": "0x0000000000000000000000000000000000000003",
                "value": "1000000000000000000",
                "data": "0x0102",
            },
        }))
        .unwrap();
        assert_eq!(record.start_date, 1_700_000_000);
        assert_eq!(record.execution_date, None);
        assert_eq!(record.approver, Address::from_low_u64_be(1));
        let action = DaoAction::from(record.action);
        assert_eq!(action.to, Address::from_low_u64_be(3));
        assert_eq!(action.value, U256::exp10(18));
        assert_eq!(action.data, vec![1, 2]);
    }

    #[test]
    fn listing_variables() {
        let contract = MockContractGateway::new();
        let dao = Address::from_low_u64_be(0xda0);
        contract.register_name("my-dao.dao.eth", dao);
        let query = ProposalQuery {
            dao_address_or_ens: Some(AddressOrEns::Ens("my-dao.dao.eth".to_owned())),
            direction: SortDirection::Desc,
            sort_by: ProposalSortBy::Name,
            status: Some(ProposalStatus::Executed),
            ..ProposalQuery::default()
        };
        let variables = block_on(proposal_list_variables(
            &contract,
            &query,
            PluginFamily::Multisig,
            0,
        ))
        .unwrap();
        assert_eq!(
            variables,
            json!({
                "where": { "executed": true, "dao": address_to_string(&dao) },
                "limit": 10,
                "skip": 0,
                "direction": "desc",
                "sortBy": "name",
            })
        );
    }

    #[test]
    fn unknown_ens_name() {
        let contract = MockContractGateway::new();
        let query = ProposalQuery {
            dao_address_or_ens: Some(AddressOrEns::Ens("unknown.dao.eth".to_owned())),
            ..ProposalQuery::default()
        };
        assert!(matches!(
            block_on(proposal_list_variables(
                &contract,
                &query,
                PluginFamily::MajorityVoting,
                0
            )),
            Err(IndexerError::InvalidAddressOrEns)
        ));
    }
}
