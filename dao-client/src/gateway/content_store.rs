use super::TransportError;
use async_trait::async_trait;

/// A content addressed store, IPFS in practice.
#[async_trait]
pub trait ContentStoreGateway: Send + Sync {
    /// Stores `content` and returns its CID.
    async fn add(&self, content: Vec<u8>) -> Result<String, TransportError>;

    async fn fetch(&self, cid: &str) -> Result<Vec<u8>, TransportError>;

    async fn pin(&self, cid: &str) -> Result<(), TransportError>;
}
