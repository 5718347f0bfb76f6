use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{error::DbResult, transaction::TransactionID, Database};

static TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// A transaction handle: a process-unique id, assigned monotonically.
#[derive(Eq, Hash, PartialEq, Clone, Copy)]
pub struct Transaction {
    uuid: TransactionID,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            uuid: TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn get_id(&self) -> TransactionID {
        self.uuid
    }

    pub fn start(&self) -> DbResult {
        Database::mut_log_manager().log_start(self)
    }

    pub fn commit(&self) -> DbResult {
        Database::buffer_pool().tx_complete(self, true)
    }

    /// Roll back: dirty pages are dropped from the cache and every lock is
    /// released. Callers must re-read pages afterwards; nothing of this
    /// transaction ever reached disk.
    pub fn abort(&self) -> DbResult {
        Database::buffer_pool().tx_complete(self, false)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.uuid)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
