use crate::error::SubmissionError;
use async_trait::async_trait;
use dao_encoding::{Address, H256, U256};

/// A state changing call to a contract, already ABI encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Vec<u8>,
    pub value: U256,
}

impl ContractCall {
    pub fn new(to: Address, data: Vec<u8>) -> Self {
        ContractCall {
            to,
            data,
            value: U256::zero(),
        }
    }
}

/// An event log emitted while executing a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: H256,
    pub logs: Vec<Log>,
}

/// Signs and broadcasts transactions, then waits for them to be mined.
///
/// Implementations hold the signer and the RPC provider. They do not retry
/// and report a reverted transaction as [`SubmissionError::Reverted`].
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Signs and broadcasts `call`, returning the transaction hash.
    async fn submit(&self, call: ContractCall) -> Result<H256, SubmissionError>;

    /// Waits until the transaction is included in a block.
    async fn await_confirmation(
        &self,
        transaction_hash: H256,
    ) -> Result<TransactionReceipt, SubmissionError>;

    /// Resolves an ENS name through the provider. `None` when the name is
    /// not registered.
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, SubmissionError>;
}
