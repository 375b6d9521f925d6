use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::clock::TimeTicket;

/// Error kinds an operation executor or change integration can raise.
///
/// `ConcurrentStale` (spec §7) is deliberately not a variant here: an
/// operation that loses to a newer write resolves as a silent no-op, not
/// an error.
#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CrdtError {
    /// A createdAt/prevCreatedAt/key referenced by an operation isn't in
    /// the root.
    NotFound { what: String },

    /// The operation's parent element exists but is the wrong variant
    /// (e.g. ADD against an Object).
    TypeMismatch { expected: &'static str, found: &'static str },

    /// A structural invariant from spec §3 would be violated.
    InvariantViolation { detail: String },

    /// An inbound ChangePack was malformed.
    SerializationError { detail: String },

    /// The local `update` callback returned an error; no operations were
    /// applied.
    Cancelled { reason: String },
}

impl CrdtError {
    pub fn not_found(what: impl Into<String>) -> Self {
        CrdtError::NotFound { what: what.into() }
    }

    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        CrdtError::TypeMismatch { expected, found }
    }

    pub fn invariant(detail: impl Into<String>) -> Self {
        CrdtError::InvariantViolation { detail: detail.into() }
    }

    pub fn serialization(detail: impl Into<String>) -> Self {
        CrdtError::SerializationError { detail: detail.into() }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        CrdtError::Cancelled { reason: reason.into() }
    }

    pub fn missing_ticket(ticket: TimeTicket) -> Self {
        CrdtError::NotFound { what: format!("element created at {ticket:?}") }
    }
}

impl Display for CrdtError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CrdtError::NotFound { what } => write!(f, "not found: {what}"),
            CrdtError::TypeMismatch { expected, found } =>
                write!(f, "type mismatch: expected {expected}, found {found}"),
            CrdtError::InvariantViolation { detail } => write!(f, "invariant violation: {detail}"),
            CrdtError::SerializationError { detail } => write!(f, "serialization error: {detail}"),
            CrdtError::Cancelled { reason } => write!(f, "update cancelled: {reason}"),
        }
    }
}

impl Error for CrdtError {}

pub type CrdtResult<T> = Result<T, CrdtError>;
