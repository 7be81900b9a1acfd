//! Codecs shared by the governance client.
//!
//! Everything in this crate is a pure function over immutable inputs: the
//! composite proposal identifier, the fixed-point ratio and failure-map
//! encodings expected by the plugin contracts, and the validation of the
//! addresses, ENS names and content identifiers the client accepts.
pub use ethereum_types;

pub mod address;
pub mod bitmap;
pub mod cid;
pub mod proposal_id;
pub mod ratio;
pub mod util;

pub use address::{AddressOrEns, InvalidAddress, InvalidAddressOrEns};
pub use bitmap::{
    bitmap_to_bool_array, bool_array_to_bitmap, parse_bitmap, BitmapError, BITMAP_SIZE,
};
pub use cid::{is_ipfs_cid, resolve_ipfs_cid, InvalidCid, IpfsLocation, MultiUri, MultiUriError};
pub use ethereum_types::{Address, H256, U256};
pub use proposal_id::{
    compact_proposal_id, decode_proposal_id, encode_proposal_id, extended_proposal_id,
    parse_proposal_id, ProposalId, ProposalIdError,
};
pub use ratio::{decode_ratio, encode_ratio, RatioError};
