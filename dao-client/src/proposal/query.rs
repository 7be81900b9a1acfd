use super::status::ProposalStatus;
use dao_encoding::AddressOrEns;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Asc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProposalSortBy {
    CreatedAt,
    Name,
    Popularity,
    Votes,
}

impl Default for ProposalSortBy {
    fn default() -> Self {
        ProposalSortBy::CreatedAt
    }
}

/// Parameters of a proposal listing.
///
/// Defaults to the first ten proposals of every DAO, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalQuery {
    pub dao_address_or_ens: Option<AddressOrEns>,
    pub skip: u32,
    pub limit: u32,
    pub direction: SortDirection,
    pub sort_by: ProposalSortBy,
    pub status: Option<ProposalStatus>,
}

impl Default for ProposalQuery {
    fn default() -> Self {
        ProposalQuery {
            dao_address_or_ens: None,
            skip: 0,
            limit: 10,
            direction: SortDirection::default(),
            sort_by: ProposalSortBy::default(),
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let query = ProposalQuery::default();
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, 10);
        assert_eq!(query.direction, SortDirection::Asc);
        assert_eq!(query.sort_by, ProposalSortBy::CreatedAt);
        assert_eq!(query.status, None);
    }

    #[test]
    fn subgraph_names() {
        assert_eq!(serde_json::to_value(SortDirection::Desc).unwrap(), json!("desc"));
        assert_eq!(
            serde_json::to_value(ProposalSortBy::CreatedAt).unwrap(),
            json!("createdAt")
        );
        assert_eq!(
            serde_json::from_value::<ProposalSortBy>(json!("popularity")).unwrap(),
            ProposalSortBy::Popularity
        );
    }
}
