use core::fmt;
use std::{
    collections::{HashMap, HashSet},
    sync::{Condvar, Mutex, MutexGuard},
};

use log::debug;

use super::wait_for_graph::WaitForGraph;
use crate::{
    error::{DbError, DbResult},
    storage::page_id::HeapPageID,
    transaction::TransactionID,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Lock {
    XLock,
    SLock,
}

impl fmt::Display for Lock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(&self) -> Lock {
        match self {
            Permission::ReadOnly => Lock::SLock,
            Permission::ReadWrite => Lock::XLock,
        }
    }
}

/// Page-level strict two-phase locking.
///
/// One mutex guards the lock table and the wait-for graph together, so a
/// release can never race a cycle check. Blocked requests park on the
/// condvar; every release wakes all waiters and lets them re-race.
pub struct ConcurrentStatus {
    state: Mutex<LockTable>,
    cond: Condvar,
}

struct LockTable {
    s_lock_map: HashMap<HeapPageID, HashSet<TransactionID>>,
    x_lock_map: HashMap<HeapPageID, TransactionID>,

    hold_pages: HashMap<TransactionID, HashSet<HeapPageID>>,

    wait_for_graph: WaitForGraph,
}

impl LockTable {
    fn new() -> Self {
        Self {
            s_lock_map: HashMap::new(),
            x_lock_map: HashMap::new(),
            hold_pages: HashMap::new(),
            wait_for_graph: WaitForGraph::new(),
        }
    }

    /// Grant the request if it is compatible with the current owners.
    /// Reentrant requests are no-ops; a sole shared owner upgrades to
    /// exclusive in place.
    fn try_acquire(&mut self, tid: TransactionID, lock: Lock, pid: &HeapPageID) -> bool {
        if let Some(owner) = self.x_lock_map.get(pid) {
            // an exclusive owner covers any of its own later requests
            return *owner == tid;
        }

        match lock {
            Lock::SLock => {
                self.s_lock_map
                    .entry(*pid)
                    .or_insert_with(HashSet::new)
                    .insert(tid);
            }
            Lock::XLock => {
                if let Some(owners) = self.s_lock_map.get(pid) {
                    if owners.iter().any(|t| *t != tid) {
                        return false;
                    }
                }
                // empty or sole shared owner: upgrade in place
                self.s_lock_map.remove(pid);
                self.x_lock_map.insert(*pid, tid);
            }
        }

        self.hold_pages.entry(tid).or_insert_with(HashSet::new).insert(*pid);
        true
    }

    /// The transactions the request has to wait for: the exclusive owner,
    /// and for an exclusive request every shared owner as well.
    fn blockers(&self, tid: TransactionID, lock: Lock, pid: &HeapPageID) -> HashSet<TransactionID> {
        let mut blockers = HashSet::new();
        if let Some(owner) = self.x_lock_map.get(pid) {
            if *owner != tid {
                blockers.insert(*owner);
            }
        }
        if lock == Lock::XLock {
            if let Some(owners) = self.s_lock_map.get(pid) {
                for t in owners {
                    if *t != tid {
                        blockers.insert(*t);
                    }
                }
            }
        }
        blockers
    }

    fn release(&mut self, tid: TransactionID, pid: &HeapPageID) {
        if let Some(owners) = self.s_lock_map.get_mut(pid) {
            owners.remove(&tid);
            if owners.is_empty() {
                self.s_lock_map.remove(pid);
            }
        }
        if self.x_lock_map.get(pid) == Some(&tid) {
            self.x_lock_map.remove(pid);
        }
        if let Some(pages) = self.hold_pages.get_mut(&tid) {
            pages.remove(pid);
        }
    }
}

impl ConcurrentStatus {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockTable::new()),
            cond: Condvar::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, LockTable> {
        self.state.lock().unwrap()
    }

    /// Acquire a lock for the transaction, blocking until it is granted.
    ///
    /// If waiting would close a cycle in the wait-for graph the request
    /// fails with `TransactionAborted` instead; the caller must stop doing
    /// work and abort.
    pub fn acquire_lock(&self, tid: TransactionID, lock: Lock, pid: &HeapPageID) -> DbResult {
        let mut table = self.state();
        loop {
            if table.try_acquire(tid, lock, pid) {
                table.wait_for_graph.remove_waiter(tid);
                debug!("tx_{} acquired {} on {}", tid, lock, pid);
                return Ok(());
            }

            // refresh this transaction's wait edges before checking for a
            // cycle; owners may have changed since the last round
            table.wait_for_graph.remove_waiter(tid);
            for owner in table.blockers(tid, lock, pid) {
                table.wait_for_graph.add_edge(tid, owner);
            }

            if table.wait_for_graph.has_cycle_from(tid) {
                table.wait_for_graph.remove_waiter(tid);
                debug!("deadlock detected, aborting tx_{} ({} on {})", tid, lock, pid);
                return Err(DbError::TransactionAborted(tid));
            }

            table = self.cond.wait(table).unwrap();
        }
    }

    /// Release one lock. Waiters are woken to re-race.
    pub fn release_lock(&self, tid: TransactionID, pid: &HeapPageID) {
        let mut table = self.state();
        table.release(tid, pid);
        self.cond.notify_all();
    }

    /// Release every lock the transaction holds, exclusive locks first.
    /// Called only from transaction completion (strict 2PL).
    pub fn release_locks_by_tx(&self, tid: TransactionID) {
        let mut table = self.state();

        let pages: Vec<HeapPageID> = table
            .hold_pages
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default();

        let (write_pages, read_pages): (Vec<_>, Vec<_>) = pages
            .into_iter()
            .partition(|pid| table.x_lock_map.get(pid) == Some(&tid));

        for pid in write_pages.iter().chain(read_pages.iter()) {
            table.release(tid, pid);
        }

        table.hold_pages.remove(&tid);
        table.wait_for_graph.remove_waiter(tid);
        self.cond.notify_all();
    }

    pub fn holds_lock(&self, tid: TransactionID, pid: &HeapPageID) -> bool {
        let table = self.state();
        table.x_lock_map.get(pid) == Some(&tid)
            || table
                .s_lock_map
                .get(pid)
                .map_or(false, |owners| owners.contains(&tid))
    }

    /// Pages the transaction holds exclusively.
    pub fn locked_write_pages(&self, tid: TransactionID) -> HashSet<HeapPageID> {
        let table = self.state();
        table
            .x_lock_map
            .iter()
            .filter(|(_, owner)| **owner == tid)
            .map(|(pid, _)| *pid)
            .collect()
    }

    /// Pages the transaction holds in shared mode.
    pub fn locked_read_pages(&self, tid: TransactionID) -> HashSet<HeapPageID> {
        let table = self.state();
        table
            .s_lock_map
            .iter()
            .filter(|(_, owners)| owners.contains(&tid))
            .map(|(pid, _)| *pid)
            .collect()
    }

    pub fn hold_pages(&self, tid: TransactionID) -> HashSet<HeapPageID> {
        let table = self.state();
        table.hold_pages.get(&tid).cloned().unwrap_or_default()
    }

    pub fn clear(&self) {
        let mut table = self.state();
        *table = LockTable::new();
        self.cond.notify_all();
    }
}

impl fmt::Debug for ConcurrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let table = self.state();
        write!(
            f,
            "s_lock_map: {:?}, x_lock_map: {:?}, hold_pages: {:?}",
            table.s_lock_map, table.x_lock_map, table.hold_pages
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::init_log;

    fn pid(page_index: u32) -> HeapPageID {
        HeapPageID::new(1, page_index)
    }

    #[test]
    fn test_reentrant_and_shared_grants() {
        init_log();
        let cs = ConcurrentStatus::new();

        cs.acquire_lock(1, Lock::SLock, &pid(0)).unwrap();
        cs.acquire_lock(1, Lock::SLock, &pid(0)).unwrap();
        cs.acquire_lock(1, Lock::SLock, &pid(1)).unwrap();
        cs.acquire_lock(2, Lock::SLock, &pid(0)).unwrap();
        assert!(cs.holds_lock(1, &pid(0)));
        assert!(cs.holds_lock(2, &pid(0)));

        cs.release_lock(1, &pid(1));
        assert!(!cs.holds_lock(1, &pid(1)));
        assert!(cs.holds_lock(1, &pid(0)));

        cs.release_locks_by_tx(1);
        assert!(!cs.holds_lock(1, &pid(0)));
        assert!(cs.holds_lock(2, &pid(0)));
    }

    #[test]
    fn test_sole_owner_upgrades_in_place() {
        let cs = ConcurrentStatus::new();

        cs.acquire_lock(1, Lock::SLock, &pid(0)).unwrap();
        cs.acquire_lock(1, Lock::XLock, &pid(0)).unwrap();

        assert!(cs.holds_lock(1, &pid(0)));
        assert_eq!(cs.locked_write_pages(1).len(), 1);
        assert_eq!(cs.locked_read_pages(1).len(), 0);
    }

    #[test]
    fn test_exclusive_covers_later_shared_request() {
        let cs = ConcurrentStatus::new();

        cs.acquire_lock(1, Lock::XLock, &pid(0)).unwrap();
        cs.acquire_lock(1, Lock::SLock, &pid(0)).unwrap();
        assert_eq!(cs.locked_write_pages(1).len(), 1);
    }

    #[test]
    fn test_immediate_deadlock_between_two_waiters() {
        let cs = ConcurrentStatus::new();

        cs.acquire_lock(1, Lock::XLock, &pid(0)).unwrap();
        cs.acquire_lock(2, Lock::XLock, &pid(1)).unwrap();

        // t1 waits for t2 in a helper thread; t2 then closes the cycle and
        // must be refused
        std::thread::scope(|s| {
            let cs_ref = &cs;
            let waiter = s.spawn(move || cs_ref.acquire_lock(1, Lock::XLock, &pid(1)));

            // wait until t1 has installed its wait edge and parked
            while !cs_ref.state().wait_for_graph.is_waiting(1) {
                std::thread::yield_now();
            }

            let result = cs_ref.acquire_lock(2, Lock::XLock, &pid(0));
            assert!(matches!(result, Err(DbError::TransactionAborted(2))));

            // victim releases; the parked waiter gets through
            cs_ref.release_locks_by_tx(2);
            waiter.join().unwrap().unwrap();
        });
    }
}
