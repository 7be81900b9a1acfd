//! Operations performed on behalf of a DAO rather than through one of its
//! governance plugins.
use super::ClientContext;
use crate::{
    abi::{encode_call, token_to_h256, EventArgs, ERC20, PLUGIN_SETUP_PROCESSOR},
    config::{ClientConfig, ConfigError},
    error::{ConfirmationError, Error},
    gateway::{ContractCall, TransactionReceipt},
    steps::{steps, Operation, PendingTransaction, StepValue},
};
use dao_encoding::{Address, H256, U256};
use ethabi::Token;
use futures::Stream;
use serde::Serialize;
use tracing::debug;

/// Release and build of a plugin version, as published in its repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VersionTag {
    pub release: u8,
    pub build: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PermissionOperation {
    Grant,
    Revoke,
    GrantWithCondition,
}

impl PermissionOperation {
    fn from_contract(value: u8) -> Option<Self> {
        match value {
            0 => Some(PermissionOperation::Grant),
            1 => Some(PermissionOperation::Revoke),
            2 => Some(PermissionOperation::GrantWithCondition),
            _ => None,
        }
    }
}

/// A permission the DAO has to apply to install the plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiTargetPermission {
    pub operation: PermissionOperation,
    #[serde(rename = "where")]
    pub where_: Address,
    pub who: Address,
    pub condition: Address,
    pub permission_id: H256,
}

/// Outcome of [`DaoClient::prepare_installation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedInstallation {
    pub plugin_address: Address,
    pub plugin_repo: Address,
    pub version_tag: VersionTag,
    pub helpers: Vec<Address>,
    pub permissions: Vec<MultiTargetPermission>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetAllowanceParams {
    pub token_address: Address,
    pub spender: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareInstallationParams {
    pub dao_address: Address,
    pub plugin_repo: Address,
    pub version_tag: VersionTag,
    /// ABI encoded installation parameters of the plugin.
    pub installation_data: Vec<u8>,
}

fn small_uint(token: &Token) -> Option<u64> {
    token
        .clone()
        .into_uint()
        .filter(|value| value.bits() <= 16)
        .map(|value| value.low_u64())
}

fn version_tag(token: Token) -> Option<VersionTag> {
    match token.into_tuple()?.as_slice() {
        [release, build] => Some(VersionTag {
            release: u8::try_from(small_uint(release)?).ok()?,
            build: u16::try_from(small_uint(build)?).ok()?,
        }),
        _ => None,
    }
}

fn permission(token: Token) -> Option<MultiTargetPermission> {
    let mut fields = token.into_tuple()?.into_iter();
    let operation = u8::try_from(small_uint(&fields.next()?)?).ok()?;
    Some(MultiTargetPermission {
        operation: PermissionOperation::from_contract(operation)?,
        where_: fields.next()?.into_address()?,
        who: fields.next()?.into_address()?,
        condition: fields.next()?.into_address()?,
        permission_id: token_to_h256(fields.next()?)?,
    })
}

fn prepared_installation(
    receipt: &TransactionReceipt,
    plugin_repo: Address,
    version: VersionTag,
) -> Result<PreparedInstallation, ConfirmationError> {
    let args = EventArgs::extract(&PLUGIN_SETUP_PROCESSOR, "InstallationPrepared", &receipt.logs)?;
    let plugin_address = args.address("plugin")?;
    let version_tag = version_tag(args.token("versionTag")?.clone())
        .ok_or_else(|| args.malformed_argument("versionTag"))?;
    let mut setup_data = args.tuple("preparedSetupData")?.into_iter();
    let helpers: Vec<Address> = setup_data
        .next()
        .and_then(Token::into_array)
        .and_then(|helpers| helpers.into_iter().map(Token::into_address).collect())
        .ok_or_else(|| args.malformed_argument("preparedSetupData.helpers"))?;
    let permissions: Vec<MultiTargetPermission> = setup_data
        .next()
        .and_then(Token::into_array)
        .and_then(|permissions| permissions.into_iter().map(permission).collect())
        .ok_or_else(|| args.malformed_argument("preparedSetupData.permissions"))?;
    debug!(
        plugin = ?plugin_address,
        requested = ?version,
        prepared = ?version_tag,
        "plugin installation prepared"
    );
    Ok(PreparedInstallation {
        plugin_address,
        plugin_repo,
        version_tag,
        helpers,
        permissions,
    })
}

#[derive(Clone)]
pub struct DaoClient {
    context: ClientContext,
    plugin_setup_processor: Address,
}

impl DaoClient {
    pub fn new(context: ClientContext, plugin_setup_processor: Address) -> Self {
        DaoClient {
            context,
            plugin_setup_processor,
        }
    }

    /// Uses the plugin setup processor configured for the deployment.
    pub fn from_config(context: ClientContext, config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(DaoClient::new(
            context,
            config.contracts.plugin_setup_processor()?,
        ))
    }

    /// Lets `spender` transfer up to `amount` tokens on behalf of the
    /// signer. The payload is the allowance reported by the token.
    pub async fn submit_set_allowance(
        &self,
        params: SetAllowanceParams,
    ) -> Result<PendingTransaction<U256>, Error> {
        let data = encode_call(
            &ERC20,
            "approve",
            &[Token::Address(params.spender), Token::Uint(params.amount)],
        )?;
        let requested = params.amount;
        PendingTransaction::submit(
            self.context.contract.clone(),
            Operation::SetAllowance,
            ContractCall::new(params.token_address, data),
            move |receipt| {
                let granted = EventArgs::extract(&ERC20, "Approval", &receipt.logs)?.uint("value")?;
                if granted < requested {
                    return Err(ConfirmationError::AllowanceNotGranted { requested, granted }.into());
                }
                Ok(granted)
            },
        )
        .await
    }

    pub fn set_allowance(
        &self,
        params: SetAllowanceParams,
    ) -> impl Stream<Item = Result<StepValue<U256>, Error>> + Send {
        let client = self.clone();
        steps(async move { client.submit_set_allowance(params).await })
    }

    /// Asks the plugin setup processor to deploy a plugin for the DAO and
    /// to describe the permissions its installation requires.
    pub async fn submit_prepare_installation(
        &self,
        params: PrepareInstallationParams,
    ) -> Result<PendingTransaction<PreparedInstallation>, Error> {
        let version = params.version_tag;
        let plugin_setup_ref = Token::Tuple(vec![
            Token::Tuple(vec![
                Token::Uint(version.release.into()),
                Token::Uint(version.build.into()),
            ]),
            Token::Address(params.plugin_repo),
        ]);
        let data = encode_call(
            &PLUGIN_SETUP_PROCESSOR,
            "prepareInstallation",
            &[
                Token::Address(params.dao_address),
                Token::Tuple(vec![plugin_setup_ref, Token::Bytes(params.installation_data)]),
            ],
        )?;
        let plugin_repo = params.plugin_repo;
        PendingTransaction::submit(
            self.context.contract.clone(),
            Operation::PrepareInstallation,
            ContractCall::new(self.plugin_setup_processor, data),
            move |receipt| Ok(prepared_installation(receipt, plugin_repo, version)?),
        )
        .await
    }

    pub fn prepare_installation(
        &self,
        params: PrepareInstallationParams,
    ) -> impl Stream<Item = Result<StepValue<PreparedInstallation>, Error>> + Send {
        let client = self.clone();
        steps(async move { client.submit_prepare_installation(params).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::Log,
        plugins::fixtures::Fixture,
        testing::event_log,
    };
    use futures::{executor::block_on, StreamExt};

    fn token_address() -> Address {
        Address::from_low_u64_be(0x20)
    }

    fn approval(value: u64) -> Log {
        event_log(
            ERC20.event("Approval").unwrap(),
            token_address(),
            vec![
                H256::from(Address::from_low_u64_be(1)),
                H256::from(Address::from_low_u64_be(2)),
            ],
            &[Token::Uint(U256::from(value))],
        )
    }

    fn params(amount: u64) -> SetAllowanceParams {
        SetAllowanceParams {
            token_address: token_address(),
            spender: Address::from_low_u64_be(2),
            amount: U256::from(amount),
        }
    }

    #[test]
    fn allowance_granted() {
        let fixture = Fixture::new();
        fixture.contract.push_logs(vec![approval(100)]);
        let client = DaoClient::new(fixture.context(), Address::zero());
        let values: Vec<_> = block_on(client.set_allowance(params(100)).collect());
        assert_eq!(values[0].as_ref().unwrap().key(), "setting_allowance");
        assert!(matches!(&values[1], Ok(StepValue::Done(v)) if *v == U256::from(100)));
        assert_eq!(fixture.contract.submitted()[0].to, token_address());
    }

    #[test]
    fn allowance_below_the_requested_amount() {
        let fixture = Fixture::new();
        fixture.contract.push_logs(vec![approval(10)]);
        let client = DaoClient::new(fixture.context(), Address::zero());
        let pending = block_on(client.submit_set_allowance(params(100))).unwrap();
        assert!(matches!(
            block_on(pending.confirm()),
            Err(Error::Confirmation(ConfirmationError::AllowanceNotGranted { .. }))
        ));
    }

    #[test]
    fn setup_processor_from_config() {
        let fixture = Fixture::new();
        let mut config = ClientConfig::for_network(crate::config::Network::Goerli);
        assert!(matches!(
            DaoClient::from_config(fixture.context(), &config),
            Err(ConfigError::NoContract("pluginSetupProcessor"))
        ));
        config.contracts.plugin_setup_processor = Some(Address::from_low_u64_be(0x9500));
        let client = DaoClient::from_config(fixture.context(), &config).unwrap();
        assert_eq!(client.plugin_setup_processor, Address::from_low_u64_be(0x9500));
    }

    #[test]
    fn installation_prepared() {
        let fixture = Fixture::new();
        let processor = Address::from_low_u64_be(0x9500);
        let dao = Address::from_low_u64_be(0xda0);
        let repo = Address::from_low_u64_be(0x4e90);
        let plugin = Address::from_low_u64_be(0x1234);
        let helper = Address::from_low_u64_be(0x4e1);
        let permission_id = H256::repeat_byte(0x11);
        let event = PLUGIN_SETUP_PROCESSOR.event("InstallationPrepared").unwrap();
        fixture.contract.push_logs(vec![event_log(
            event,
            processor,
            vec![
                H256::from(Address::from_low_u64_be(1)),
                H256::from(dao),
                H256::from(repo),
            ],
            &[
                Token::FixedBytes(vec![0; 32]),
                Token::Tuple(vec![Token::Uint(U256::from(1)), Token::Uint(U256::from(2))]),
                Token::Bytes(Vec::new()),
                Token::Address(plugin),
                Token::Tuple(vec![
                    Token::Array(vec![Token::Address(helper)]),
                    Token::Array(vec![Token::Tuple(vec![
                        Token::Uint(U256::from(0)),
                        Token::Address(dao),
                        Token::Address(plugin),
                        Token::Address(Address::zero()),
                        Token::FixedBytes(permission_id.as_bytes().to_vec()),
                    ])]),
                ]),
            ],
        )]);

        let client = DaoClient::new(fixture.context(), processor);
        let values: Vec<_> = block_on(
            client
                .prepare_installation(PrepareInstallationParams {
                    dao_address: dao,
                    plugin_repo: repo,
                    version_tag: VersionTag {
                        release: 1,
                        build: 2,
                    },
                    installation_data: vec![0xab],
                })
                .collect(),
        );
        assert_eq!(values[0].as_ref().unwrap().key(), "preparing");
        let prepared = match &values[1] {
            Ok(StepValue::Done(prepared)) => prepared.clone(),
            other => panic!("unexpected step {:?}", other),
        };
        assert_eq!(
            prepared,
            PreparedInstallation {
                plugin_address: plugin,
                plugin_repo: repo,
                version_tag: VersionTag {
                    release: 1,
                    build: 2
                },
                helpers: vec![helper],
                permissions: vec![MultiTargetPermission {
                    operation: PermissionOperation::Grant,
                    where_: dao,
                    who: plugin,
                    condition: Address::zero(),
                    permission_id,
                }],
            }
        );
        assert_eq!(fixture.contract.submitted()[0].to, processor);
    }
}
