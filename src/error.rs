//! Protocol-level command outcomes.
//!
//! These are the textual results that travel in a broadcast delta —
//! data, not `std::error::Error`. Every command produces one, success
//! or rejection, and every outcome still earns an audit line.

use std::fmt;

/// Why a command was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Out-of-range coordinate, malformed parameters, unknown command,
    /// `end <= start` on a range, heading level outside 1-3.
    InvalidPosition,
    /// The targeted byte was scheduled for deletion earlier in this batch.
    DeletedPosition,
    /// The command's version does not match the document's current version.
    OutdatedVersion,
    /// The submitting user lacks the write permission a mutator requires.
    Unauthorised,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            RejectReason::InvalidPosition => "INVALID_POSITION",
            RejectReason::DeletedPosition => "DELETED_POSITION",
            RejectReason::OutdatedVersion => "OUTDATED_VERSION",
            RejectReason::Unauthorised => "UNAUTHORISED",
        };
        write!(f, "Reject {token}")
    }
}

impl From<crate::store::StoreError> for RejectReason {
    fn from(value: crate::store::StoreError) -> Self {
        match value {
            crate::store::StoreError::InvalidPosition => RejectReason::InvalidPosition,
        }
    }
}

/// The outcome of applying one command: success, or a rejection reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Success,
    Reject(RejectReason),
}

impl fmt::Display for EditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOutcome::Success => write!(f, "SUCCESS"),
            EditOutcome::Reject(reason) => write!(f, "{reason}"),
        }
    }
}
