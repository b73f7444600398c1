// 3.0: error types. validators raise the recoverable kinds; anything coming out
// of an applier is wrapped in Corrupted and treated as fatal by the engine.

use crate::fixed::Fixed;
use crate::types::EntityKind;

/// Coarse classification used by callers deciding on retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    DuplicateId,
    InvalidArgument,
    InsufficientFunds,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },

    #[error("{kind} {id} already exists")]
    DuplicateId { kind: EntityKind, id: u64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Fixed, available: Fixed },

    #[error("Transaction action {action} failed, ledger state is suspect: {source}")]
    Corrupted {
        action: &'static str,
        #[source]
        source: Box<LedgerError>,
    },

    #[error("Ledger is poisoned by an earlier failed action and refuses new commands")]
    Poisoned,

    #[error("Query that produced this view has ended")]
    QueryClosed,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl LedgerError {
    pub fn not_found(kind: EntityKind, id: impl Into<u64>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotFound { .. } | LedgerError::QueryClosed => ErrorKind::NotFound,
            LedgerError::DuplicateId { .. } => ErrorKind::DuplicateId,
            LedgerError::InvalidArgument(_) | LedgerError::InvalidConfig(_) => {
                ErrorKind::InvalidArgument
            }
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::Corrupted { .. } | LedgerError::Poisoned => ErrorKind::Fatal,
        }
    }

    /// True when repository state can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}
