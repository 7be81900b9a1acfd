//! In-memory gateways for tests.
//!
//! Every double records what it was asked to do so that tests can assert on
//! the calls that reached the network boundary, or on their absence.
use crate::{
    error::SubmissionError,
    gateway::{
        ContentStoreGateway, ContractCall, ContractGateway, GraphqlRequest, IndexerGateway, Log,
        TransactionReceipt, TransportError,
    },
    proposal::ProposalSnapshot,
};
use async_trait::async_trait;
use dao_encoding::{Address, H256};
use ethabi::{Event, Token};
use quickcheck::{Arbitrary, Gen};
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Mutex, MutexGuard},
};

/// A valid CIDv0.
pub const TEST_CID: &str = "QmQPeNsJPyVWPFDVHb77w8G42Fvo15z4bG2X8D2GhfbSXc";

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Builds the log `event` emits from `address`.
///
/// `indexed` are the topics following the signature, `data` the non
/// indexed arguments.
pub fn event_log(event: &Event, address: Address, indexed: Vec<H256>, data: &[Token]) -> Log {
    let mut topics = vec![event.signature()];
    topics.extend(indexed);
    Log {
        address,
        topics,
        data: ethabi::encode(data),
    }
}

impl Arbitrary for ProposalSnapshot {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        // dates close to each other so that every status shows up
        let start_date = u64::arbitrary(g) % 10_000;
        ProposalSnapshot {
            start_date,
            end_date: start_date + u64::arbitrary(g) % 10_000,
            executed: bool::arbitrary(g),
            approval: bool::arbitrary(g),
            early_executable: Option::<bool>::arbitrary(g),
        }
    }
}

/// Mines every submitted transaction.
///
/// Transaction hashes are the submission counter, starting at 1. Receipts
/// carry the logs queued with [`push_logs`](Self::push_logs), in order, or
/// no log at all once the queue is empty.
#[derive(Default)]
pub struct MockContractGateway {
    submitted: Mutex<Vec<ContractCall>>,
    confirmed: Mutex<Vec<H256>>,
    logs: Mutex<VecDeque<Vec<Log>>>,
    submission_failure: Mutex<Option<SubmissionError>>,
    confirmation_failure: Mutex<Option<SubmissionError>>,
    names: Mutex<HashMap<String, Address>>,
}

impl MockContractGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_logs(&self, logs: Vec<Log>) {
        lock(&self.logs).push_back(logs);
    }

    pub fn fail_submissions(&self, error: SubmissionError) {
        *lock(&self.submission_failure) = Some(error);
    }

    pub fn fail_confirmations(&self, error: SubmissionError) {
        *lock(&self.confirmation_failure) = Some(error);
    }

    pub fn register_name(&self, name: &str, address: Address) {
        lock(&self.names).insert(name.to_owned(), address);
    }

    pub fn submitted(&self) -> Vec<ContractCall> {
        lock(&self.submitted).clone()
    }

    pub fn confirmed(&self) -> Vec<H256> {
        lock(&self.confirmed).clone()
    }

    pub fn confirmations(&self) -> usize {
        lock(&self.confirmed).len()
    }
}

#[async_trait]
impl ContractGateway for MockContractGateway {
    async fn submit(&self, call: ContractCall) -> Result<H256, SubmissionError> {
        if let Some(error) = lock(&self.submission_failure).clone() {
            return Err(error);
        }
        let mut submitted = lock(&self.submitted);
        submitted.push(call);
        Ok(H256::from_low_u64_be(submitted.len() as u64))
    }

    async fn await_confirmation(
        &self,
        transaction_hash: H256,
    ) -> Result<TransactionReceipt, SubmissionError> {
        if let Some(error) = lock(&self.confirmation_failure).clone() {
            return Err(error);
        }
        lock(&self.confirmed).push(transaction_hash);
        let logs = lock(&self.logs).pop_front().unwrap_or_default();
        Ok(TransactionReceipt {
            transaction_hash,
            logs,
        })
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, SubmissionError> {
        Ok(lock(&self.names).get(name).copied())
    }
}

/// Answers queries with the `data` registered under their name.
#[derive(Default)]
pub struct MockIndexer {
    responses: Mutex<HashMap<&'static str, Value>>,
    requests: Mutex<Vec<GraphqlRequest>>,
    failing: Mutex<bool>,
}

impl MockIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, name: &'static str, data: Value) {
        lock(&self.responses).insert(name, data);
    }

    pub fn fail(&self) {
        *lock(&self.failing) = true;
    }

    pub fn requests(&self) -> Vec<GraphqlRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl IndexerGateway for MockIndexer {
    async fn request(&self, request: GraphqlRequest) -> Result<Value, TransportError> {
        let name = request.name;
        lock(&self.requests).push(request);
        if *lock(&self.failing) {
            return Err(TransportError::new("indexer unreachable"));
        }
        lock(&self.responses)
            .get(name)
            .cloned()
            .ok_or_else(|| TransportError::new(format!("no response for `{}`", name)))
    }
}

/// Content addressed by a CIDv0 derived from the content itself.
#[derive(Default)]
pub struct MockContentStore {
    contents: Mutex<HashMap<String, Vec<u8>>>,
    pinned: Mutex<HashSet<String>>,
    calls: Mutex<usize>,
    failing_pins: Mutex<bool>,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, cid: &str, content: Vec<u8>) {
        lock(&self.contents).insert(cid.to_owned(), content);
    }

    pub fn fail_pins(&self) {
        *lock(&self.failing_pins) = true;
    }

    pub fn is_pinned(&self, cid: &str) -> bool {
        lock(&self.pinned).contains(cid)
    }

    /// Number of requests that reached the store.
    pub fn calls(&self) -> usize {
        *lock(&self.calls)
    }

    fn count(&self) {
        *lock(&self.calls) += 1;
    }
}

fn content_id(content: &[u8]) -> String {
    let mut state: u64 = 0xcbf2_9ce4_8422_2325;
    let mut cid = String::from("Qm");
    for i in 0..44 {
        for byte in content.iter().chain(&[i as u8]) {
            state = (state ^ u64::from(*byte)).wrapping_mul(0x0100_0000_01b3);
        }
        cid.push(char::from(BASE58_ALPHABET[(state % 58) as usize]));
    }
    cid
}

#[async_trait]
impl ContentStoreGateway for MockContentStore {
    async fn add(&self, content: Vec<u8>) -> Result<String, TransportError> {
        self.count();
        let cid = content_id(&content);
        self.insert(&cid, content);
        Ok(cid)
    }

    async fn fetch(&self, cid: &str) -> Result<Vec<u8>, TransportError> {
        self.count();
        lock(&self.contents)
            .get(cid)
            .cloned()
            .ok_or_else(|| TransportError::new(format!("{} not found", cid)))
    }

    async fn pin(&self, cid: &str) -> Result<(), TransportError> {
        self.count();
        if *lock(&self.failing_pins) {
            return Err(TransportError::new("pinning refused"));
        }
        lock(&self.pinned).insert(cid.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dao_encoding::is_ipfs_cid;

    #[test]
    fn derived_cids_are_valid() {
        for content in [&b""[..], b"a", b"{\"title\":\"t\"}"] {
            assert!(is_ipfs_cid(&content_id(content)));
        }
        assert_ne!(content_id(b"a"), content_id(b"b"));
    }
}
