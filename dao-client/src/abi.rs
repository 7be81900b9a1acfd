//! Contract interfaces and the decoding of their event logs.
//!
//! Only the functions and events the client calls or waits for are
//! described, as JSON ABI fragments embedded at build time.
use crate::{
    error::{ConfirmationError, ValidationError},
    gateway::Log,
};
use dao_encoding::{Address, H256, U256};
use ethabi::{Contract, Event, RawLog, Token};
use lazy_static::lazy_static;

const MULTISIG_ABI: &str = include_str!("abi/multisig.json");
const MAJORITY_VOTING_ABI: &str = include_str!("abi/majority_voting.json");
const PLUGIN_SETUP_PROCESSOR_ABI: &str = include_str!("abi/plugin_setup_processor.json");
const ERC20_ABI: &str = include_str!("abi/erc20.json");

fn load(abi: &'static str) -> Contract {
    Contract::load(abi.as_bytes()).expect("embedded contract ABIs are valid JSON ABI")
}

lazy_static! {
    pub static ref MULTISIG: Contract = load(MULTISIG_ABI);
    pub static ref MAJORITY_VOTING: Contract = load(MAJORITY_VOTING_ABI);
    pub static ref PLUGIN_SETUP_PROCESSOR: Contract = load(PLUGIN_SETUP_PROCESSOR_ABI);
    pub static ref ERC20: Contract = load(ERC20_ABI);
}

/// ABI encodes a call to `function` of `contract`.
pub fn encode_call(
    contract: &Contract,
    function: &'static str,
    tokens: &[Token],
) -> Result<Vec<u8>, ValidationError> {
    contract
        .function(function)
        .and_then(|f| f.encode_input(tokens))
        .map_err(|e| ValidationError::CallEncoding {
            function,
            reason: e.to_string(),
        })
}

/// The first log whose topic 0 is the signature of `event`.
pub fn find_event<'a>(logs: &'a [Log], event: &Event) -> Option<&'a Log> {
    let signature = event.signature();
    logs.iter()
        .find(|log| log.topics.first() == Some(&signature))
}

/// Decodes the arguments of `event` out of `log`.
pub fn decode_event(event: &Event, log: &Log) -> Result<ethabi::Log, ethabi::Error> {
    event.parse_log(RawLog {
        topics: log.topics.clone(),
        data: log.data.clone(),
    })
}

/// Arguments of an event found in a transaction receipt.
#[derive(Debug, Clone)]
pub struct EventArgs {
    event: &'static str,
    params: Vec<ethabi::LogParam>,
}

impl EventArgs {
    /// Finds `event` of `contract` among `logs` and decodes it.
    pub fn extract(
        contract: &Contract,
        event: &'static str,
        logs: &[Log],
    ) -> Result<Self, ConfirmationError> {
        let description = contract
            .event(event)
            .map_err(|e| ConfirmationError::MalformedEvent {
                event,
                reason: e.to_string(),
            })?;
        let log = find_event(logs, description).ok_or(ConfirmationError::MissingEvent { event })?;
        let decoded =
            decode_event(description, log).map_err(|e| ConfirmationError::MalformedEvent {
                event,
                reason: e.to_string(),
            })?;
        Ok(EventArgs {
            event,
            params: decoded.params,
        })
    }

    fn malformed(&self, reason: String) -> ConfirmationError {
        ConfirmationError::MalformedEvent {
            event: self.event,
            reason,
        }
    }

    pub fn token(&self, name: &str) -> Result<&Token, ConfirmationError> {
        self.params
            .iter()
            .find(|param| param.name == name)
            .map(|param| &param.value)
            .ok_or_else(|| self.malformed(format!("missing argument `{}`", name)))
    }

    pub fn uint(&self, name: &str) -> Result<U256, ConfirmationError> {
        self.token(name)?
            .clone()
            .into_uint()
            .ok_or_else(|| self.malformed(format!("`{}` is not an unsigned integer", name)))
    }

    pub fn address(&self, name: &str) -> Result<Address, ConfirmationError> {
        self.token(name)?
            .clone()
            .into_address()
            .ok_or_else(|| self.malformed(format!("`{}` is not an address", name)))
    }

    pub fn tuple(&self, name: &str) -> Result<Vec<Token>, ConfirmationError> {
        self.token(name)?
            .clone()
            .into_tuple()
            .ok_or_else(|| self.malformed(format!("`{}` is not a tuple", name)))
    }

    pub(crate) fn malformed_argument(&self, name: &str) -> ConfirmationError {
        self.malformed(format!("unexpected shape of `{}`", name))
    }
}

/// Converts a 32 bytes word, as found in `bytes32` tokens.
pub(crate) fn token_to_h256(token: Token) -> Option<H256> {
    token
        .into_fixed_bytes()
        .filter(|bytes| bytes.len() == 32)
        .map(|bytes| H256::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_abis_load() {
        for (contract, function) in [
            (&*MULTISIG, "createProposal"),
            (&*MULTISIG, "approve"),
            (&*MULTISIG, "execute"),
            (&*MAJORITY_VOTING, "createProposal"),
            (&*MAJORITY_VOTING, "vote"),
            (&*MAJORITY_VOTING, "execute"),
            (&*PLUGIN_SETUP_PROCESSOR, "prepareInstallation"),
            (&*ERC20, "approve"),
        ] {
            assert!(contract.function(function).is_ok(), "{}", function);
        }
        assert!(MULTISIG.event("ProposalCreated").is_ok());
        assert!(MAJORITY_VOTING.event("ProposalCreated").is_ok());
        assert!(PLUGIN_SETUP_PROCESSOR.event("InstallationPrepared").is_ok());
        assert!(ERC20.event("Approval").is_ok());
    }

    #[test]
    fn well_known_selectors() {
        let approve = encode_call(
            &ERC20,
            "approve",
            &[Token::Address(Address::zero()), Token::Uint(U256::one())],
        )
        .unwrap();
        assert_eq!(hex::encode(&approve[..4]), "095ea7b3");
        assert_eq!(
            format!("{:x}", ERC20.event("Approval").unwrap().signature()),
            "8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925"
        );
    }

    #[test]
    fn mismatched_arguments_are_rejected() {
        assert!(matches!(
            encode_call(&ERC20, "approve", &[Token::Bool(true)]),
            Err(ValidationError::CallEncoding { function: "approve", .. })
        ));
    }

    #[test]
    fn events_are_found_by_signature() {
        let approval = ERC20.event("Approval").unwrap();
        let owner = Address::from_low_u64_be(1);
        let spender = Address::from_low_u64_be(2);
        let unrelated = Log {
            address: Address::zero(),
            topics: vec![H256::repeat_byte(0xaa)],
            data: Vec::new(),
        };
        let log = Log {
            address: Address::zero(),
            topics: vec![approval.signature(), owner.into(), spender.into()],
            data: ethabi::encode(&[Token::Uint(U256::from(42))]),
        };
        let logs = vec![unrelated, log];

        assert_eq!(find_event(&logs, approval), Some(&logs[1]));
        assert_eq!(find_event(&logs[..1], approval), None);

        let args = EventArgs::extract(&ERC20, "Approval", &logs).unwrap();
        assert_eq!(args.address("owner").unwrap(), owner);
        assert_eq!(args.address("spender").unwrap(), spender);
        assert_eq!(args.uint("value").unwrap(), U256::from(42));
        assert!(matches!(
            args.uint("owner"),
            Err(ConfirmationError::MalformedEvent { event: "Approval", .. })
        ));
        assert!(matches!(
            args.token("missing"),
            Err(ConfirmationError::MalformedEvent { .. })
        ));

        assert_eq!(
            EventArgs::extract(&ERC20, "Approval", &logs[..1]).unwrap_err(),
            ConfirmationError::MissingEvent { event: "Approval" }
        );
    }
}
