mod concurrent_status;
mod tx;
mod wait_for_graph;

pub type TransactionID = u64;

pub use concurrent_status::{ConcurrentStatus, Lock, Permission};
pub use tx::Transaction;
