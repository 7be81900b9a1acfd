//! Two step writes.
//!
//! Every state changing operation goes through the same sequence: the call
//! is signed and broadcast, which yields the transaction hash, then the
//! receipt is awaited and turned into the operation result. A
//! [`PendingTransaction`] only exists once the submission succeeded and is
//! consumed by its confirmation, so an operation cannot be confirmed twice
//! nor confirmed without having been submitted.
use crate::{
    error::{Error, ValidationError},
    gateway::{ContractCall, ContractGateway, TransactionReceipt},
};
use dao_encoding::{bitmap::bool_array_to_bitmap, H256, U256};
use futures::{
    future::Future,
    stream::{self, Stream},
};
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::{fmt, sync::Arc};
use tracing::debug;

/// Key of the terminal step value.
pub const DONE_KEY: &str = "done";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateProposal,
    VoteProposal,
    ApproveProposal,
    ExecuteProposal,
    PrepareInstallation,
    SetAllowance,
}

impl Operation {
    /// Key of the step value reporting the submission.
    pub fn key(self) -> &'static str {
        match self {
            Operation::CreateProposal => "creating",
            Operation::VoteProposal => "voting",
            Operation::ApproveProposal => "approving",
            Operation::ExecuteProposal => "executing",
            Operation::PrepareInstallation => "preparing",
            Operation::SetAllowance => "setting_allowance",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Progress of a write, as observed through [`into_steps`](PendingTransaction::into_steps).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepValue<P> {
    Submitted {
        operation: Operation,
        transaction_hash: H256,
    },
    Done(P),
}

impl<P> StepValue<P> {
    pub fn key(&self) -> &'static str {
        match self {
            StepValue::Submitted { operation, .. } => operation.key(),
            StepValue::Done(_) => DONE_KEY,
        }
    }

    pub fn transaction_hash(&self) -> Option<H256> {
        match self {
            StepValue::Submitted {
                transaction_hash, ..
            } => Some(*transaction_hash),
            StepValue::Done(_) => None,
        }
    }
}

/// `{"key": "<verb>ing", "transactionHash": …}` then
/// `{"key": "done", "payload": …}`.
impl<P: Serialize> Serialize for StepValue<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("key", self.key())?;
        match self {
            StepValue::Submitted {
                transaction_hash, ..
            } => map.serialize_entry("transactionHash", transaction_hash)?,
            StepValue::Done(payload) => map.serialize_entry("payload", payload)?,
        }
        map.end()
    }
}

type Extractor<P> = Box<dyn FnOnce(&TransactionReceipt) -> Result<P, Error> + Send>;

/// A broadcast transaction waiting for its confirmation.
pub struct PendingTransaction<P> {
    gateway: Arc<dyn ContractGateway>,
    operation: Operation,
    transaction_hash: H256,
    extract: Extractor<P>,
}

impl<P> fmt::Debug for PendingTransaction<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("operation", &self.operation)
            .field("transaction_hash", &self.transaction_hash)
            .finish()
    }
}

impl<P> PendingTransaction<P> {
    /// Submits `call`. `extract` turns the receipt into the result of the
    /// operation once the transaction is mined.
    pub async fn submit<F>(
        gateway: Arc<dyn ContractGateway>,
        operation: Operation,
        call: ContractCall,
        extract: F,
    ) -> Result<Self, Error>
    where
        F: FnOnce(&TransactionReceipt) -> Result<P, Error> + Send + 'static,
    {
        let to = call.to;
        let transaction_hash = gateway.submit(call).await?;
        debug!(
            operation = operation.key(),
            contract = ?to,
            transaction_hash = ?transaction_hash,
            "transaction submitted"
        );
        Ok(PendingTransaction {
            gateway,
            operation,
            transaction_hash,
            extract: Box::new(extract),
        })
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn tx_hash(&self) -> H256 {
        self.transaction_hash
    }

    /// Waits for the transaction to be mined and extracts the result.
    pub async fn confirm(self) -> Result<P, Error> {
        let receipt = self
            .gateway
            .await_confirmation(self.transaction_hash)
            .await?;
        debug!(
            operation = self.operation.key(),
            transaction_hash = ?self.transaction_hash,
            logs = receipt.logs.len(),
            "transaction confirmed"
        );
        (self.extract)(&receipt)
    }
}

impl<P: Send + 'static> PendingTransaction<P> {
    /// The submitted step followed by the outcome of the confirmation.
    pub fn into_steps(self) -> impl Stream<Item = Result<StepValue<P>, Error>> + Send {
        steps(async move { Ok(self) })
    }
}

enum StepState<F, P> {
    Submitting(F),
    Confirming(PendingTransaction<P>),
    Finished,
}

/// Drives a submission and its confirmation as a stream of step values.
///
/// The stream yields at most one `Submitted` value followed by at most one
/// `Done` value. An error ends the stream.
pub fn steps<F, P>(submission: F) -> impl Stream<Item = Result<StepValue<P>, Error>> + Send
where
    F: Future<Output = Result<PendingTransaction<P>, Error>> + Send,
    P: Send + 'static,
{
    stream::unfold(StepState::Submitting(submission), |state| async move {
        match state {
            StepState::Submitting(submission) => match submission.await {
                Ok(pending) => {
                    let step = StepValue::Submitted {
                        operation: pending.operation,
                        transaction_hash: pending.transaction_hash,
                    };
                    Some((Ok(step), StepState::Confirming(pending)))
                }
                Err(error) => Some((Err(error), StepState::Finished)),
            },
            StepState::Confirming(pending) => match pending.confirm().await {
                Ok(payload) => Some((Ok(StepValue::Done(payload)), StepState::Finished)),
                Err(error) => Some((Err(error), StepState::Finished)),
            },
            StepState::Finished => None,
        }
    })
}

/// Builds the failure map of a proposal.
///
/// No fail-safe flags means that no action may fail. Otherwise there must
/// be exactly one flag per action.
pub fn failure_map(actions: usize, fail_safe_actions: &[bool]) -> Result<U256, ValidationError> {
    if fail_safe_actions.is_empty() {
        return Ok(U256::zero());
    }
    if fail_safe_actions.len() != actions {
        return Err(ValidationError::SizeMismatch {
            actions,
            fail_safe_actions: fail_safe_actions.len(),
        });
    }
    Ok(bool_array_to_bitmap(fail_safe_actions)?)
}
