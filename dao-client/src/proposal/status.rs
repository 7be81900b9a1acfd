//! Lifecycle status of proposals.
//!
//! The status is never stored: it is derived from the dates and flags
//! indexed for the proposal and from the current time, both when computing
//! the status of a single proposal and when filtering lists on the indexer.
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    Pending,
    Active,
    Succeeded,
    Executed,
    Defeated,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalStatus::Pending => "Pending",
            ProposalStatus::Active => "Active",
            ProposalStatus::Succeeded => "Succeeded",
            ProposalStatus::Executed => "Executed",
            ProposalStatus::Defeated => "Defeated",
        };
        f.write_str(s)
    }
}

/// The governance plugins differ in how they tell that a proposal passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginFamily {
    /// Passes once enough members approved it.
    Multisig,
    /// Passes once the vote tally allows the execution.
    MajorityVoting,
}

/// The part of an indexed proposal the status depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalSnapshot {
    /// Unix time, in seconds.
    pub start_date: u64,
    /// Unix time, in seconds.
    pub end_date: u64,
    pub executed: bool,
    /// `approvalReached` for multisig proposals, `potentiallyExecutable`
    /// for majority voting ones.
    pub approval: bool,
    /// Whether the proposal may execute before its end date. Unknown for
    /// plugins that do not index it.
    pub early_executable: Option<bool>,
}

/// Derives the status of a proposal at time `now` (unix seconds).
pub fn compute_status(snapshot: &ProposalSnapshot, now: u64) -> ProposalStatus {
    if snapshot.executed {
        return ProposalStatus::Executed;
    }
    if now < snapshot.start_date {
        return ProposalStatus::Pending;
    }
    // an approved proposal succeeds as soon as it can execute
    if snapshot.approval && (snapshot.early_executable == Some(true) || now >= snapshot.end_date) {
        return ProposalStatus::Succeeded;
    }
    if now < snapshot.end_date {
        return ProposalStatus::Active;
    }
    ProposalStatus::Defeated
}

/// Translates a status into the `where` predicate of the subgraph.
///
/// Dates are compared against `now` (unix seconds), sent as a string the
/// way the subgraph expects big integers.
///
/// The `startDate_gte` and `endDate_gte` bounds are inclusive where
/// [`compute_status`] is not: a proposal starting exactly at `now` is
/// selected as pending but computed as active, one ending at `now` is
/// selected as active but computed as ended.
pub fn status_filter(status: ProposalStatus, now: u64, family: PluginFamily) -> Value {
    let now = now.to_string();
    match status {
        // inclusive, unlike `compute_status`
        ProposalStatus::Pending => json!({ "startDate_gte": now }),
        ProposalStatus::Active => json!({
            "startDate_lt": now,
            "endDate_gte": now,
            "executed": false,
        }),
        ProposalStatus::Executed => json!({ "executed": true }),
        ProposalStatus::Succeeded => match family {
            PluginFamily::Multisig => json!({
                "approvalReached": true,
                "endDate_lt": now,
                "executed": false,
            }),
            PluginFamily::MajorityVoting => json!({
                "or": [
                    { "potentiallyExecutable": true, "endDate_lt": now, "executed": false },
                    { "earlyExecutable": true, "executed": false },
                ]
            }),
        },
        ProposalStatus::Defeated => match family {
            PluginFamily::Multisig => json!({
                "approvalReached": false,
                "endDate_lt": now,
                "executed": false,
            }),
            PluginFamily::MajorityVoting => json!({
                "potentiallyExecutable": false,
                "endDate_lt": now,
                "executed": false,
            }),
        },
    }
}
