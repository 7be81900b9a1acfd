//! The composite proposal identifier.
//!
//! A proposal is identified on-chain by the address of the plugin that holds
//! it and a nonce local to that plugin. Both are packed into a single string
//! of the form `0x<40 hex digits>_0x<64 hex digits>`.
use crate::{
    address::{address_to_string, is_address, parse_address},
    util::is_hex_of_len,
};
use ethereum_types::{Address, U256};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Number of hex digits of the padded nonce, without the `0x` prefix.
pub const NONCE_HEX_LEN: usize = 64;

const SEPARATOR: char = '_';

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProposalIdError {
    #[error("invalid address")]
    InvalidAddress,

    #[error("invalid proposal id")]
    InvalidProposalId,

    /// The identifier passed the shape check but its parts could not be
    /// recovered.
    #[error("failed to deconstruct the proposal id")]
    FailedToDeconstruct,
}

/// A decoded proposal identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProposalId {
    pub plugin_address: Address,
    pub nonce: U256,
}

impl ProposalId {
    pub fn new(plugin_address: Address, nonce: U256) -> Self {
        Self {
            plugin_address,
            nonce,
        }
    }

    /// The identifier with the nonce stripped of its leading zeros, as the
    /// indexer exposes it.
    pub fn to_compact_string(&self) -> String {
        format!(
            "{}{}0x{:x}",
            address_to_string(&self.plugin_address),
            SEPARATOR,
            self.nonce
        )
    }
}

fn nonce_to_padded_hex(nonce: &U256) -> String {
    let mut bytes = [0u8; 32];
    nonce.to_big_endian(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            address_to_string(&self.plugin_address),
            SEPARATOR,
            nonce_to_padded_hex(&self.nonce)
        )
    }
}

impl FromStr for ProposalId {
    type Err = ProposalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_proposal_id(s)
    }
}

/// Packs a plugin address and a proposal nonce into a proposal id.
///
/// The address text is kept as given.
pub fn encode_proposal_id(plugin_address: &str, nonce: U256) -> Result<String, ProposalIdError> {
    if !is_address(plugin_address) {
        return Err(ProposalIdError::InvalidAddress);
    }
    Ok(format!(
        "{}{}{}",
        plugin_address,
        SEPARATOR,
        nonce_to_padded_hex(&nonce)
    ))
}

/// Checks `^0x[0-9a-fA-F]{40}_0x[0-9a-fA-F]{64}$`.
pub fn is_proposal_id(s: &str) -> bool {
    match s.split_once(SEPARATOR) {
        Some((address, nonce)) => {
            is_address(address)
                && nonce
                    .strip_prefix("0x")
                    .map(|digits| is_hex_of_len(digits, NONCE_HEX_LEN))
                    .unwrap_or(false)
        }
        None => false,
    }
}

pub fn decode_proposal_id(proposal_id: &str) -> Result<ProposalId, ProposalIdError> {
    if !is_proposal_id(proposal_id) {
        return Err(ProposalIdError::InvalidProposalId);
    }

    let (address, nonce) = proposal_id
        .split_once(SEPARATOR)
        .ok_or(ProposalIdError::FailedToDeconstruct)?;
    let plugin_address = parse_address(address).map_err(|_| ProposalIdError::FailedToDeconstruct)?;
    let nonce = nonce
        .strip_prefix("0x")
        .and_then(|digits| hex::decode(digits).ok())
        .filter(|bytes| bytes.len() == 32)
        .map(|bytes| U256::from_big_endian(&bytes))
        .ok_or(ProposalIdError::FailedToDeconstruct)?;

    Ok(ProposalId {
        plugin_address,
        nonce,
    })
}

/// Splits a proposal id whose nonce has between 1 and 64 hex digits.
fn split_loose(proposal_id: &str) -> Option<(&str, &str)> {
    let (address, nonce) = proposal_id.split_once(SEPARATOR)?;
    let digits = nonce.strip_prefix("0x")?;
    let valid = is_address(address)
        && !digits.is_empty()
        && digits.len() <= NONCE_HEX_LEN
        && digits.chars().all(|c| c.is_ascii_hexdigit());
    valid.then(|| (address, digits))
}

/// Drops the leading zeros of the nonce: `0x…_0x00…01` becomes `0x…_0x1`.
pub fn compact_proposal_id(proposal_id: &str) -> Result<String, ProposalIdError> {
    let (address, digits) = split_loose(proposal_id).ok_or(ProposalIdError::InvalidProposalId)?;
    let trimmed = digits.trim_start_matches('0');
    let trimmed = if trimmed.is_empty() { "0" } else { trimmed };
    Ok(format!("{}{}0x{}", address, SEPARATOR, trimmed))
}

/// Pads the nonce back to 64 hex digits.
pub fn extended_proposal_id(proposal_id: &str) -> Result<String, ProposalIdError> {
    let (address, digits) = split_loose(proposal_id).ok_or(ProposalIdError::InvalidProposalId)?;
    Ok(format!(
        "{}{}0x{:0>width$}",
        address,
        SEPARATOR,
        digits,
        width = NONCE_HEX_LEN
    ))
}

/// Decodes a proposal id whose nonce is either padded or compacted.
pub fn parse_proposal_id(proposal_id: &str) -> Result<ProposalId, ProposalIdError> {
    decode_proposal_id(&extended_proposal_id(proposal_id)?)
}

#[cfg(any(test, feature = "property-test-api"))]
mod testing {
    use super::*;
    use quickcheck::{Arbitrary, Gen};

    impl Arbitrary for ProposalId {
        fn arbitrary<G: Gen>(g: &mut G) -> Self {
            let mut address = [0u8; 20];
            for byte in &mut address {
                *byte = Arbitrary::arbitrary(g);
            }
            let mut nonce = [0u8; 32];
            // small nonces are the common case, keep them well represented
            let significant = usize::arbitrary(g) % 33;
            for byte in nonce.iter_mut().skip(32 - significant) {
                *byte = Arbitrary::arbitrary(g);
            }
            ProposalId {
                plugin_address: Address::from(address),
                nonce: U256::from_big_endian(&nonce),
            }
        }
    }
}
