use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, RwLock,
    },
};

use log::{debug, error};
use rand::Rng;

use crate::{
    error::{DbError, DbResult, ResultPod},
    storage::{heap_page::HeapPage, page_id::HeapPageID, tuple::Tuple},
    transaction::{Permission, Transaction},
    types::{ConcurrentHashMap, Pod},
    utils::HandyRwLock,
    Database,
};

pub const DEFAULT_PAGE_SIZE: usize = 4096;
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Fixed-capacity page cache and locking facade.
///
/// Every page access goes through `get_page`, which takes the page lock for
/// the requesting transaction before the cache is consulted. The pool runs
/// NO-STEAL/FORCE: dirty pages are never evicted or written out before the
/// owning transaction commits, and commit forces them to disk.
pub struct BufferPool {
    capacity: usize,
    cache: ConcurrentHashMap<HeapPageID, Pod<HeapPage>>,
}

impl BufferPool {
    /// Default number of cached pages.
    pub const DEFAULT_PAGES: usize = 50;

    pub fn new() -> Self {
        Self::new_with_capacity(Self::DEFAULT_PAGES)
    }

    pub fn new_with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            cache: ConcurrentHashMap::new(),
        }
    }

    pub fn get_page_size() -> usize {
        PAGE_SIZE.load(Ordering::Relaxed)
    }

    // Test hook only.
    pub fn set_page_size(page_size: usize) {
        PAGE_SIZE.store(page_size, Ordering::Relaxed);
    }

    pub fn get_capacity(&self) -> usize {
        self.capacity
    }

    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }

    /// Retrieve a page with the given intent.
    ///
    /// Acquires the matching page lock first (shared for reads, exclusive
    /// for writes); this may block, or fail with `TransactionAborted` if
    /// waiting would deadlock. On a cache miss the page is read from its
    /// table; when two transactions race to install the same page the first
    /// entry wins and the loser's copy is dropped.
    pub fn get_page(
        &self,
        tx: &Transaction,
        perm: Permission,
        pid: &HeapPageID,
    ) -> ResultPod<HeapPage> {
        Database::concurrent_status().acquire_lock(tx.get_id(), perm.to_lock(), pid)?;

        if let Some(page) = self.cache.get(pid) {
            return Ok(page);
        }

        // miss: fetch outside the cache's critical section
        let table_rc = Database::catalog()
            .get_table(&pid.get_table_id())
            .ok_or_else(|| DbError::Db(format!("table {} not found", pid.get_table_id())))?;
        let page = table_rc.rl().read_page(pid)?;

        let mut cache = self.cache.get_inner_wl();
        if !cache.contains_key(pid) && cache.len() >= self.capacity {
            Self::evict_page(&mut cache)?;
        }
        let entry = cache
            .entry(*pid)
            .or_insert_with(|| Arc::new(RwLock::new(page)));
        Ok(entry.clone())
    }

    /// Insert a tuple into the named table, write-locking every page the
    /// operation touches. Dirtied pages are marked and put (back) into the
    /// cache so later requests see them.
    pub fn insert_tuple(&self, tx: &Transaction, table_id: u32, tuple: &mut Tuple) -> DbResult {
        let table_rc = Database::catalog()
            .get_table(&table_id)
            .ok_or_else(|| DbError::Db(format!("table {} not found", table_id)))?;

        let dirtied = table_rc.rl().insert_tuple(tx, tuple)?;
        self.mark_pages_dirty(tx, dirtied);
        Ok(())
    }

    /// Delete the tuple its record id points at.
    pub fn delete_tuple(&self, tx: &Transaction, tuple: &mut Tuple) -> DbResult {
        let rid = tuple
            .get_record_id()
            .ok_or_else(|| DbError::Db("tuple has no record id".to_string()))?;
        let table_rc = Database::catalog()
            .get_table(&rid.pid.get_table_id())
            .ok_or_else(|| DbError::Db(format!("table {} not found", rid.pid.get_table_id())))?;

        let dirtied = table_rc.rl().delete_tuple(tx, tuple)?;
        self.mark_pages_dirty(tx, dirtied);
        Ok(())
    }

    fn mark_pages_dirty(&self, tx: &Transaction, pages: Vec<Pod<HeapPage>>) {
        for page_rc in pages {
            let pid = {
                let mut page = page_rc.wl();
                page.mark_dirty(true, tx.get_id());
                page.get_pid()
            };
            self.cache.insert(pid, page_rc);
        }
    }

    /// Evict one clean page, chosen at random. NO-STEAL: a cache full of
    /// dirty pages cannot be evicted from, which surfaces as an error on
    /// the requesting transaction.
    fn evict_page(cache: &mut HashMap<HeapPageID, Pod<HeapPage>>) -> DbResult {
        let clean: Vec<HeapPageID> = cache
            .iter()
            .filter(|(_, page)| page.rl().is_dirty().is_none())
            .map(|(pid, _)| *pid)
            .collect();

        if clean.is_empty() {
            return Err(DbError::Db(
                "buffer pool is full and every page is dirty".to_string(),
            ));
        }

        let victim = clean[rand::thread_rng().gen_range(0..clean.len())];
        cache.remove(&victim);
        debug!("evicted page {}", victim);
        Ok(())
    }

    /// Drop a page from the cache without writing it. The next access
    /// re-reads the committed image from disk.
    pub fn discard_page(&self, pid: &HeapPageID) {
        self.cache.remove(pid);
    }

    /// Write one dirty page out: append and force the WAL update record,
    /// then write the page bytes at their offset. No-op for clean or
    /// uncached pages.
    pub fn flush_page(&self, pid: &HeapPageID) -> DbResult {
        let page_rc = match self.cache.get(pid) {
            Some(page) => page,
            None => return Ok(()),
        };

        let (tid, before_image, after_image) = {
            let page = page_rc.rl();
            match page.is_dirty() {
                Some(tid) => (tid, page.get_before_image(), page.get_page_data()?),
                None => return Ok(()),
            }
        };

        // log record goes to stable storage before the page does
        {
            let mut log_manager = Database::mut_log_manager();
            log_manager.log_update(tid, &before_image, &after_image)?;
            log_manager.force()?;
        }

        let table_rc = Database::catalog()
            .get_table(&pid.get_table_id())
            .ok_or_else(|| DbError::Db(format!("table {} not found", pid.get_table_id())))?;
        table_rc.rl().write_page(pid, &after_image)?;

        page_rc.wl().mark_dirty(false, tid);
        Ok(())
    }

    /// Flush every dirty page. Breaks NO-STEAL if any owning transaction is
    /// still running; reserved for shutdown and tests.
    pub fn flush_all_pages(&self) -> DbResult {
        for pid in self.cache.keys() {
            self.flush_page(&pid)?;
        }
        Ok(())
    }

    pub fn holds_lock(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        Database::concurrent_status().holds_lock(tx.get_id(), pid)
    }

    /// Commit or abort: on commit every write-locked page is forced out and
    /// its bytes become the new before image; on abort those pages are
    /// discarded so later readers re-read the committed image. Locks are
    /// released afterwards, exclusive before shared.
    pub fn tx_complete(&self, tx: &Transaction, commit: bool) -> DbResult {
        let tid = tx.get_id();
        let write_pages = Database::concurrent_status().locked_write_pages(tid);

        if commit {
            for pid in &write_pages {
                // a flush failure must not keep the locks pinned; the WAL
                // still has everything needed for recovery
                if let Err(e) = self.flush_page(pid) {
                    error!("failed to flush page {} during commit: {}", pid, e);
                    continue;
                }
                if let Some(page_rc) = self.cache.get(pid) {
                    if let Err(e) = page_rc.wl().set_before_image() {
                        error!("failed to snapshot page {} during commit: {}", pid, e);
                    }
                }
            }
            Database::mut_log_manager().log_commit(tx)?;
        } else {
            for pid in &write_pages {
                self.discard_page(pid);
            }
            Database::mut_log_manager().log_abort(tx)?;
        }

        Database::concurrent_status().release_locks_by_tx(tid);
        debug!("{} completed, commit: {}", tx, commit);
        Ok(())
    }

    /// Drop all cached pages. Test hook.
    pub fn clear(&self) {
        self.cache.clear();
    }
}
