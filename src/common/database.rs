use std::{
    mem,
    path::PathBuf,
    sync::{Arc, Once, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use super::Catalog;
use crate::{
    storage::buffer_pool::{BufferPool, DEFAULT_PAGE_SIZE},
    transaction::ConcurrentStatus,
    tx_log::LogManager,
    types::Pod,
    utils::HandyRwLock,
};

/// All process-wide state: the catalog, the page cache, the lock manager
/// and the write-ahead log.
///
/// The buffer pool and the lock manager synchronize internally, so their
/// accessors hand out plain references; the catalog and the log manager sit
/// behind read-write locks.
pub struct Database {
    path: PathBuf,

    catalog: Pod<Catalog>,
    buffer_pool: BufferPool,
    concurrent_status: ConcurrentStatus,
    log_manager: Pod<LogManager>,
}

static mut SINGLETON: *mut Database = 0 as *mut Database;

impl Database {
    fn new() -> Self {
        let db_path = PathBuf::from("data");
        if !db_path.exists() {
            std::fs::create_dir_all(&db_path).expect("failed to create the data directory");
        }

        let log_path = db_path.join("wal.log");
        let log_manager = LogManager::new(&log_path).expect("failed to open the write-ahead log");

        Self {
            path: db_path,

            catalog: Arc::new(RwLock::new(Catalog::new())),
            buffer_pool: BufferPool::new(),
            concurrent_status: ConcurrentStatus::new(),
            log_manager: Arc::new(RwLock::new(log_manager)),
        }
    }

    /// Rebuild the in-memory state of the database. Test hook: the page
    /// cache, catalog and lock table are dropped, the page size goes back
    /// to its default, and the log file is reused.
    pub fn reset() {
        BufferPool::set_page_size(DEFAULT_PAGE_SIZE);

        unsafe {
            if !SINGLETON.is_null() {
                mem::drop(Box::from_raw(SINGLETON));
            }
        }

        let singleton = Self::new();

        unsafe {
            SINGLETON = mem::transmute(Box::new(singleton));
        }
    }

    pub fn global() -> &'static Self {
        static ONCE: Once = Once::new();

        ONCE.call_once(|| {
            let singleton = Self::new();

            unsafe {
                // Put it on the heap so it can outlive this call.
                SINGLETON = mem::transmute(Box::new(singleton));
            }
        });

        unsafe { SINGLETON.as_ref().unwrap() }
    }

    pub fn catalog() -> RwLockReadGuard<'static, Catalog> {
        Self::global().catalog.rl()
    }

    pub fn mut_catalog() -> RwLockWriteGuard<'static, Catalog> {
        Self::global().catalog.wl()
    }

    pub fn buffer_pool() -> &'static BufferPool {
        &Self::global().buffer_pool
    }

    pub fn concurrent_status() -> &'static ConcurrentStatus {
        &Self::global().concurrent_status
    }

    pub fn mut_log_manager() -> RwLockWriteGuard<'static, LogManager> {
        Self::global().log_manager.wl()
    }

    pub fn get_path(&self) -> PathBuf {
        self.path.clone()
    }
}
