//! Content identifiers and the multi-URIs that carry them.
//!
//! Proposal metadata is referenced on-chain by a comma separated list of
//! URIs. The IPFS entries are either a bare CID or `ipfs://<cid>` with an
//! optional path after the CID.
use std::{fmt, str::FromStr};
use thiserror::Error;

pub const IPFS_SCHEME: &str = "ipfs://";

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid CID")]
pub struct InvalidCid;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MultiUriError {
    #[error("the multi URI is empty")]
    Empty,
}

fn is_base58(c: char) -> bool {
    BASE58_ALPHABET.contains(c)
}

fn is_base32_lower(c: char) -> bool {
    c.is_ascii_lowercase() || ('2'..='7').contains(&c)
}

fn is_base32_upper(c: char) -> bool {
    c.is_ascii_uppercase() || ('2'..='7').contains(&c)
}

fn is_hex_upper(c: char) -> bool {
    c.is_ascii_digit() || ('A'..='F').contains(&c)
}

fn tail_matches(tail: &str, min_len: usize, allowed: impl Fn(char) -> bool) -> bool {
    tail.len() >= min_len && tail.chars().all(allowed)
}

/// Checks for a CIDv0 (`Qm…`) or a CIDv1 in one of the multibase encodings
/// the gateways serve: base32 (`b…`, `B…`), base58btc (`z…`) or base16
/// upper (`F…`).
pub fn is_ipfs_cid(s: &str) -> bool {
    if let Some(tail) = s.strip_prefix("Qm") {
        return tail_matches(tail, 44, is_base58);
    }
    let mut chars = s.chars();
    let prefix = chars.next();
    let tail = chars.as_str();
    match prefix {
        Some('b') => tail_matches(tail, 58, is_base32_lower),
        Some('B') => tail_matches(tail, 58, is_base32_upper),
        Some('z') => tail_matches(tail, 48, is_base58),
        Some('F') => tail_matches(tail, 50, is_hex_upper),
        _ => false,
    }
}

/// Checks for `ipfs://<cid>` with an optional `/path`.
pub fn is_ipfs_uri(s: &str) -> bool {
    match s.strip_prefix(IPFS_SCHEME) {
        Some(rest) => {
            let cid = rest.split('/').next().unwrap_or_default();
            is_ipfs_cid(cid)
        }
        None => false,
    }
}

/// A CID and the path requested under it, without query or fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpfsLocation {
    pub cid: String,
    pub path: String,
}

/// A comma separated list of URIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiUri {
    items: Vec<String>,
}

impl MultiUri {
    pub fn new(multi_uri: &str) -> Result<Self, MultiUriError> {
        if multi_uri.is_empty() {
            return Err(MultiUriError::Empty);
        }
        Ok(MultiUri {
            items: multi_uri.split(',').map(str::to_owned).collect(),
        })
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// The CID of the first IPFS item.
    pub fn ipfs_cid(&self) -> Option<&str> {
        self.ipfs_items().next().map(|(cid, _)| cid)
    }

    /// The CID and path of the first IPFS item.
    pub fn ipfs(&self) -> Option<IpfsLocation> {
        self.ipfs_items().next().map(|(cid, rest)| {
            let end = rest.find(|c: char| c == '?' || c == '#').unwrap_or(rest.len());
            IpfsLocation {
                cid: cid.to_owned(),
                path: rest[..end].to_owned(),
            }
        })
    }

    /// The `http://` and `https://` items, in order.
    pub fn http(&self) -> Vec<&str> {
        self.items
            .iter()
            .map(String::as_str)
            .filter(|item| item.starts_with("http://") || item.starts_with("https://"))
            .collect()
    }

    /// Every item holding a valid CID, split into the CID and whatever
    /// follows it.
    fn ipfs_items(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().filter_map(|item| {
            let item = item.as_str();
            let item = item.strip_prefix(IPFS_SCHEME).unwrap_or(item);
            let (cid, rest) = match item.find('/') {
                Some(idx) => item.split_at(idx),
                None => (item, ""),
            };
            is_ipfs_cid(cid).then(|| (cid, rest))
        })
    }
}

impl FromStr for MultiUri {
    type Err = MultiUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MultiUri::new(s)
    }
}

impl fmt::Display for MultiUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.items.join(","))
    }
}

/// Extracts the CID out of a bare CID, an `ipfs://` URI or a multi-URI.
pub fn resolve_ipfs_cid(data: &str) -> Result<String, InvalidCid> {
    MultiUri::new(data)
        .ok()
        .and_then(|uri| uri.ipfs_cid().map(str::to_owned))
        .ok_or(InvalidCid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID_V0: &str = "QmQPeNsJPyVWPFDVHb77w8G42Fvo15z4bG2X8D2GhfbSXc";
    const CID_V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn cids() {
        assert!(is_ipfs_cid(CID_V0));
        assert!(is_ipfs_cid(CID_V1));
        assert!(is_ipfs_cid(&CID_V1.to_uppercase()));
        assert!(!is_ipfs_cid(""));
        assert!(!is_ipfs_cid("Qm"));
        assert!(!is_ipfs_cid("QmQPeNsJPyVWPFDVHb77w8G42Fvo15z4bG2X8D2GhfbS"));
        // `0` is not part of the base58 alphabet
        assert!(!is_ipfs_cid("QmQPeNsJPyVWPFDVHb77w8G42Fvo15z4bG2X8D2GhfbSX0"));
        assert!(!is_ipfs_cid("https://example.org"));
    }

    #[test]
    fn ipfs_uris() {
        assert!(is_ipfs_uri(&format!("ipfs://{}", CID_V0)));
        assert!(is_ipfs_uri(&format!("ipfs://{}/metadata.json", CID_V0)));
        assert!(!is_ipfs_uri(CID_V0));
        assert!(!is_ipfs_uri("ipfs://not-a-cid"));
    }

    #[test]
    fn empty_multi_uri() {
        assert_eq!(MultiUri::new(""), Err(MultiUriError::Empty));
    }

    #[test]
    fn ipfs_cid_of_multi_uris() {
        let uri = MultiUri::new(CID_V0).unwrap();
        assert_eq!(uri.ipfs_cid(), Some(CID_V0));

        let uri = MultiUri::new(&format!("ipfs://{}", CID_V0)).unwrap();
        assert_eq!(uri.ipfs_cid(), Some(CID_V0));

        let uri = MultiUri::new(&format!("ipfs://{}/path/to/file.json", CID_V0)).unwrap();
        assert_eq!(uri.ipfs_cid(), Some(CID_V0));

        let uri = MultiUri::new(&format!(
            "https://example.org,ipfs://invalid,ipfs://{},{}",
            CID_V0, CID_V1
        ))
        .unwrap();
        assert_eq!(uri.ipfs_cid(), Some(CID_V0));

        let uri = MultiUri::new("https://example.org,ipfs://invalid").unwrap();
        assert_eq!(uri.ipfs_cid(), None);
    }

    #[test]
    fn ipfs_locations() {
        let uri = MultiUri::new(CID_V0).unwrap();
        assert_eq!(
            uri.ipfs(),
            Some(IpfsLocation {
                cid: CID_V0.to_owned(),
                path: String::new()
            })
        );

        let uri = MultiUri::new(&format!("ipfs://{}/dir/file.json?query=1", CID_V1)).unwrap();
        assert_eq!(
            uri.ipfs(),
            Some(IpfsLocation {
                cid: CID_V1.to_owned(),
                path: "/dir/file.json".to_owned()
            })
        );

        let uri = MultiUri::new(&format!("ipfs://{}/file#anchor", CID_V0)).unwrap();
        assert_eq!(uri.ipfs().map(|location| location.path), Some("/file".to_owned()));
    }

    #[test]
    fn http_items() {
        let uri = MultiUri::new(&format!(
            "http://one.example,{},https://two.example,ftp://three.example",
            CID_V0
        ))
        .unwrap();
        assert_eq!(uri.http(), vec!["http://one.example", "https://two.example"]);
        assert_eq!(uri.items().len(), 4);
        assert_eq!(uri.to_string().parse::<MultiUri>(), Ok(uri));
    }

    #[test]
    fn resolve() {
        assert_eq!(resolve_ipfs_cid(CID_V0), Ok(CID_V0.to_owned()));
        assert_eq!(
            resolve_ipfs_cid(&format!("ipfs://{}", CID_V0)),
            Ok(CID_V0.to_owned())
        );
        assert_eq!(resolve_ipfs_cid(""), Err(InvalidCid));
        assert_eq!(resolve_ipfs_cid("an invalid reference"), Err(InvalidCid));
        assert_eq!(resolve_ipfs_cid("ipfs://1234"), Err(InvalidCid));
    }
}
