use thiserror::Error;

use crate::transaction::TransactionID;
use crate::types::Pod;

/// Error taxonomy of the engine.
///
/// `TransactionAborted` is the only recoverable kind: the caller must stop
/// issuing work for that transaction and call `Transaction::abort`.
#[derive(Error, Debug)]
pub enum DbError {
    /// Logical storage failure (page out of range, invalid slot, schema
    /// mismatch, no evictable page, iterator misuse).
    #[error("db error: {0}")]
    Db(String),

    /// The transaction was chosen as a deadlock victim, or the caller
    /// requested an abort.
    #[error("transaction {0} aborted")]
    TransactionAborted(TransactionID),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation not defined for the given types, e.g. LIKE on an integer
    /// field, or a string aggregate other than COUNT.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl DbError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, DbError::TransactionAborted(_))
    }
}

pub type DbResult = Result<(), DbError>;
pub type ResultPod<T> = Result<Pod<T>, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let e = DbError::TransactionAborted(7);
        assert!(e.is_aborted());
        assert!(!DbError::Db("page out of range".to_string()).is_aborted());
        assert_eq!(format!("{}", e), "transaction 7 aborted");
    }
}
