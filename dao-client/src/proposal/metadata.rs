//! Proposal metadata stored off-chain.
//!
//! Proposals only carry a reference to their metadata. Resolving it never
//! fails: a missing, unsupported or unreachable reference yields one of the
//! placeholder documents below so that lists of proposals still render.
use crate::{
    error::ContentStoreError,
    gateway::{ContentStoreGateway, TransportError},
};
use dao_encoding::cid::{resolve_ipfs_cid, IPFS_SCHEME};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResource {
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalMedia {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// The metadata document of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalMetadata {
    pub title: String,
    pub summary: String,
    pub description: String,
    pub resources: Vec<ProposalResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<ProposalMedia>,
}

/// The part of the metadata shown in lists of proposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalMetadataSummary {
    pub title: String,
    pub summary: String,
}

impl ProposalMetadata {
    fn placeholder(title: &str, summary: &str) -> Self {
        ProposalMetadata {
            title: title.to_owned(),
            summary: summary.to_owned(),
            description: summary.to_owned(),
            resources: Vec::new(),
            media: None,
        }
    }

    pub fn unsupported_link() -> Self {
        Self::placeholder(
            "(unsupported metadata link)",
            "(the link to the metadata is not supported)",
        )
    }

    pub fn empty() -> Self {
        Self::placeholder(
            "(the proposal has no metadata)",
            "(the current proposal does not have any content defined)",
        )
    }

    pub fn unavailable() -> Self {
        Self::placeholder(
            "(unavailable metadata)",
            "(the proposal metadata is not available)",
        )
    }

    pub fn summary(&self) -> ProposalMetadataSummary {
        ProposalMetadataSummary {
            title: self.title.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Outcome of the resolution of a metadata reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataLink {
    Resolved(ProposalMetadata),
    /// The proposal has no metadata reference.
    Empty,
    /// The reference does not point to the content store.
    UnsupportedLink,
    /// The content could not be fetched or is not a metadata document.
    Unavailable,
}

impl MetadataLink {
    /// The resolved metadata, or the placeholder of the failure.
    pub fn into_metadata(self) -> ProposalMetadata {
        match self {
            MetadataLink::Resolved(metadata) => metadata,
            MetadataLink::Empty => ProposalMetadata::empty(),
            MetadataLink::UnsupportedLink => ProposalMetadata::unsupported_link(),
            MetadataLink::Unavailable => ProposalMetadata::unavailable(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, MetadataLink::Resolved(_))
    }
}

/// Resolves the metadata `reference` of a proposal.
///
/// The content store is only reached when the reference holds a valid CID.
pub async fn resolve_metadata(
    content_store: &dyn ContentStoreGateway,
    reference: &str,
) -> MetadataLink {
    if reference.is_empty() {
        return MetadataLink::Empty;
    }
    let cid = match resolve_ipfs_cid(reference) {
        Ok(cid) => cid,
        Err(_) => {
            warn!(reference, "unsupported metadata link");
            return MetadataLink::UnsupportedLink;
        }
    };
    let content = match content_store.fetch(&cid).await {
        Ok(content) => content,
        Err(error) => {
            warn!(%cid, %error, "cannot fetch the proposal metadata");
            return MetadataLink::Unavailable;
        }
    };
    match serde_json::from_slice::<ProposalMetadata>(&content) {
        Ok(metadata) => {
            debug!(%cid, "proposal metadata resolved");
            MetadataLink::Resolved(metadata)
        }
        Err(error) => {
            warn!(%cid, %error, "invalid proposal metadata");
            MetadataLink::Unavailable
        }
    }
}

/// Adds `metadata` to the content store, pins it and returns its
/// `ipfs://` URI.
pub async fn pin_metadata(
    content_store: &dyn ContentStoreGateway,
    metadata: &ProposalMetadata,
) -> Result<String, ContentStoreError> {
    let content = serde_json::to_vec(metadata)
        .map_err(|e| ContentStoreError::Pin(TransportError::new(e.to_string())))?;
    let cid = content_store
        .add(content)
        .await
        .map_err(ContentStoreError::Pin)?;
    content_store
        .pin(&cid)
        .await
        .map_err(ContentStoreError::Pin)?;
    debug!(%cid, "proposal metadata pinned");
    Ok(format!("{}{}", IPFS_SCHEME, cid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockContentStore, TEST_CID};
    use futures::executor::block_on;

    fn metadata() -> ProposalMetadata {
        ProposalMetadata {
            title: "Title".to_owned(),
            summary: "Summary".to_owned(),
            description: "Description".to_owned(),
            resources: vec![ProposalResource {
                url: "https://example.org".to_owned(),
                name: "Example".to_owned(),
            }],
            media: Some(ProposalMedia {
                header: None,
                logo: Some("https://example.org/logo.png".to_owned()),
            }),
        }
    }

    #[test]
    fn empty_reference_does_not_reach_the_store() {
        let store = MockContentStore::new();
        assert_eq!(block_on(resolve_metadata(&store, "")), MetadataLink::Empty);
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn invalid_reference_is_unsupported() {
        let store = MockContentStore::new();
        assert_eq!(
            block_on(resolve_metadata(&store, "https://example.org/metadata.json")),
            MetadataLink::UnsupportedLink
        );
        assert_eq!(
            block_on(resolve_metadata(&store, "ipfs://not-a-cid")),
            MetadataLink::UnsupportedLink
        );
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn fetch_failure_is_unavailable() {
        let store = MockContentStore::new();
        let link = block_on(resolve_metadata(&store, &format!("ipfs://{}", TEST_CID)));
        assert_eq!(link, MetadataLink::Unavailable);
        assert_eq!(store.calls(), 1);
    }

    #[test]
    fn invalid_document_is_unavailable() {
        let store = MockContentStore::new();
        store.insert(TEST_CID, b"{\"title\": 1}".to_vec());
        assert_eq!(
            block_on(resolve_metadata(&store, TEST_CID)),
            MetadataLink::Unavailable
        );
    }

    #[test]
    fn resolved() {
        let store = MockContentStore::new();
        store.insert(TEST_CID, serde_json::to_vec(&metadata()).unwrap());
        let link = block_on(resolve_metadata(&store, &format!("ipfs://{}/", TEST_CID)));
        assert_eq!(link, MetadataLink::Resolved(metadata()));
        assert!(link.is_resolved());
    }

    #[test]
    fn media_is_optional() {
        let store = MockContentStore::new();
        store.insert(
            TEST_CID,
            br#"{"title":"t","summary":"s","description":"d","resources":[]}"#.to_vec(),
        );
        let metadata = block_on(resolve_metadata(&store, TEST_CID)).into_metadata();
        assert_eq!(metadata.media, None);
        assert_eq!(
            metadata.summary(),
            ProposalMetadataSummary {
                title: "t".to_owned(),
                summary: "s".to_owned()
            }
        );
    }

    #[test]
    fn placeholders() {
        assert_eq!(
            MetadataLink::Empty.into_metadata().title,
            "(the proposal has no metadata)"
        );
        assert_eq!(
            MetadataLink::UnsupportedLink.into_metadata().description,
            "(the link to the metadata is not supported)"
        );
        let unavailable = MetadataLink::Unavailable.into_metadata();
        assert_eq!(unavailable.summary, "(the proposal metadata is not available)");
        assert!(unavailable.resources.is_empty());
    }

    #[test]
    fn pin() {
        let store = MockContentStore::new();
        let uri = block_on(pin_metadata(&store, &metadata())).unwrap();
        let cid = uri.strip_prefix("ipfs://").unwrap();
        assert!(store.is_pinned(cid));
        assert_eq!(
            block_on(resolve_metadata(&store, &uri)),
            MetadataLink::Resolved(metadata())
        );
    }

    #[test]
    fn pin_failure() {
        let store = MockContentStore::new();
        store.fail_pins();
        assert!(matches!(
            block_on(pin_metadata(&store, &metadata())),
            Err(ContentStoreError::Pin(_))
        ));
    }
}
