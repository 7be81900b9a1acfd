use crate::util::is_hex_of_len;
use ethereum_types::Address;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Number of hex digits of a 20 bytes address, without the `0x` prefix.
pub const ADDRESS_HEX_LEN: usize = 40;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid address")]
pub struct InvalidAddress;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid address or ENS name")]
pub struct InvalidAddressOrEns;

/// Checks `^0x[0-9a-fA-F]{40}$`.
pub fn is_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .map(|digits| is_hex_of_len(digits, ADDRESS_HEX_LEN))
        .unwrap_or(false)
}

pub fn parse_address(s: &str) -> Result<Address, InvalidAddress> {
    if !is_address(s) {
        return Err(InvalidAddress);
    }
    let bytes = hex::decode(&s[2..]).map_err(|_| InvalidAddress)?;
    Ok(Address::from_slice(&bytes))
}

/// Lowercase `0x`-prefixed rendering of an address.
pub fn address_to_string(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// Checks for a dot separated ENS name under the `eth` root, made of
/// lowercase alphanumeric or `-` labels.
pub fn is_ens_name(s: &str) -> bool {
    match s.strip_suffix(".eth") {
        Some(labels) if !labels.is_empty() => labels.split('.').all(is_subdomain),
        _ => false,
    }
}

/// Checks a single ENS label.
pub fn is_subdomain(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// A DAO (or plugin) designated either by its address or by its ENS name.
///
/// Resolving the name is left to the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AddressOrEns {
    Address(Address),
    Ens(String),
}

impl AddressOrEns {
    /// The form expected by the indexer queries: lowercase address or the
    /// ENS name as given.
    pub fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl From<Address> for AddressOrEns {
    fn from(address: Address) -> Self {
        AddressOrEns::Address(address)
    }
}

impl fmt::Display for AddressOrEns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressOrEns::Address(address) => f.write_str(&address_to_string(address)),
            AddressOrEns::Ens(name) => f.write_str(name),
        }
    }
}

impl FromStr for AddressOrEns {
    type Err = InvalidAddressOrEns;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("0x") {
            return parse_address(s)
                .map(AddressOrEns::Address)
                .map_err(|_| InvalidAddressOrEns);
        }
        if is_ens_name(s) {
            return Ok(AddressOrEns::Ens(s.to_owned()));
        }
        Err(InvalidAddressOrEns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses() {
        assert!(is_address("0x1234567890123456789012345678901234567890"));
        assert!(is_address("0xAbCdEf7890123456789012345678901234567890"));
        assert!(!is_address("1234567890123456789012345678901234567890"));
        assert!(!is_address("0x123456789012345678901234567890123456789"));
        assert!(!is_address("0x123456789012345678901234567890123456789g"));
        assert_eq!(
            parse_address("0x0000000000000000000000000000000000000001").unwrap(),
            Address::from_low_u64_be(1)
        );
    }

    #[test]
    fn ens_names() {
        assert!(is_ens_name("my-dao.dao.eth"));
        assert!(is_ens_name("test.eth"));
        assert!(!is_ens_name(".eth"));
        assert!(!is_ens_name("Test.eth"));
        assert!(!is_ens_name("test..eth"));
        assert!(!is_ens_name("test.com"));
        assert!(is_subdomain("my-dao"));
        assert!(!is_subdomain("my_dao"));
    }

    #[test]
    fn address_or_ens() {
        let parsed: AddressOrEns = "0x000000000000000000000000000000000000000A".parse().unwrap();
        assert_eq!(parsed, AddressOrEns::Address(Address::from_low_u64_be(10)));
        assert_eq!(
            parsed.to_query_value(),
            "0x000000000000000000000000000000000000000a"
        );
        let parsed: AddressOrEns = "my-dao.dao.eth".parse().unwrap();
        assert_eq!(parsed, AddressOrEns::Ens("my-dao.dao.eth".to_owned()));
        assert_eq!("0x1234".parse::<AddressOrEns>(), Err(InvalidAddressOrEns));
        assert_eq!("not an ens".parse::<AddressOrEns>(), Err(InvalidAddressOrEns));
    }
}
