use super::TransportError;
use async_trait::async_trait;
use serde_json::Value;

/// A GraphQL request to the subgraph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphqlRequest {
    /// Logical name of the query, reported in errors.
    pub name: &'static str,
    pub query: &'static str,
    pub variables: Value,
}

/// Runs queries against the subgraph indexing the governance contracts.
#[async_trait]
pub trait IndexerGateway: Send + Sync {
    /// Returns the `data` object of the GraphQL response.
    async fn request(&self, request: GraphqlRequest) -> Result<Value, TransportError>;
}
