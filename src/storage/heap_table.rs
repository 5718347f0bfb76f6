use std::{
    collections::hash_map::DefaultHasher,
    collections::HashMap,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::debug;

use crate::{
    error::{DbError, DbResult},
    io::LockedFile,
    storage::{
        buffer_pool::BufferPool,
        heap_page::HeapPage,
        page_id::HeapPageID,
        schema::Schema,
        tuple::Tuple,
    },
    transaction::{Permission, Transaction},
    types::Pod,
    utils::HandyRwLock,
    Database,
};

/// A heap table: an unordered collection of tuples backed by one file whose
/// length is always a whole number of pages.
///
/// Pages appended past the end of file live in the overflow map until the
/// buffer pool writes them out; the on-disk length stays authoritative.
pub struct HeapTable {
    name: String,
    path: PathBuf,
    schema: Schema,
    table_id: u32,

    file: LockedFile,

    // appended-but-unflushed pages, page index -> initial byte image
    overflow: Mutex<HashMap<u32, Vec<u8>>>,
}

impl HeapTable {
    pub fn new<P: AsRef<Path>>(file_path: P, name: &str, schema: &Schema) -> Result<Self, DbError> {
        let file = LockedFile::new(&file_path)?;
        let path = file_path.as_ref().canonicalize()?;

        Ok(Self {
            name: name.to_string(),
            table_id: Self::hash_path(&path),
            path,
            schema: schema.clone(),
            file,
            overflow: Mutex::new(HashMap::new()),
        })
    }

    // The table id is a stable hash of the absolute file path, so each
    // table keeps one id for the process lifetime.
    fn hash_path(path: &Path) -> u32 {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        hasher.finish() as u32
    }

    pub fn get_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    fn disk_pages(&self) -> Result<u32, DbError> {
        Ok((self.file.get_size()? / BufferPool::get_page_size() as u64) as u32)
    }

    /// Pages reachable through `read_page`: everything on disk plus the
    /// overflow tail.
    pub fn num_pages(&self) -> Result<u32, DbError> {
        let disk = self.disk_pages()?;
        let overflow = self.overflow.lock().unwrap();
        let appended = overflow.keys().max().map(|i| i + 1).unwrap_or(0);
        Ok(disk.max(appended))
    }

    /// Read one page, bypassing the buffer pool. Overflow pages are served
    /// from memory; everything else comes from disk.
    pub fn read_page(&self, pid: &HeapPageID) -> Result<HeapPage, DbError> {
        {
            let overflow = self.overflow.lock().unwrap();
            if let Some(bytes) = overflow.get(&pid.page_index) {
                return HeapPage::new(*pid, bytes, &self.schema);
            }
        }

        let page_size = BufferPool::get_page_size();
        if pid.page_index >= self.disk_pages()? {
            return Err(DbError::Db(format!(
                "page {} is out of range for table {}",
                pid, self.name
            )));
        }

        let offset = pid.page_index as u64 * page_size as u64;
        let bytes = self.file.read_at(offset, page_size)?;
        HeapPage::new(*pid, &bytes, &self.schema)
    }

    /// Write one page image at its offset, growing the file if the page was
    /// an overflow page.
    pub fn write_page(&self, pid: &HeapPageID, bytes: &[u8]) -> DbResult {
        let page_size = BufferPool::get_page_size();
        if bytes.len() != page_size {
            return Err(DbError::Db(format!(
                "refusing to write {} bytes as page {}",
                bytes.len(),
                pid
            )));
        }

        let offset = pid.page_index as u64 * page_size as u64;
        self.file.write_at(offset, bytes)?;
        self.overflow.lock().unwrap().remove(&pid.page_index);
        debug!("wrote page {} at offset {}", pid, offset);
        Ok(())
    }

    /// Allocate the next page index and register an empty page image for
    /// it. The file itself grows only when the page is written out.
    fn append_empty_page(&self) -> Result<HeapPageID, DbError> {
        let disk = self.disk_pages()?;
        let mut overflow = self.overflow.lock().unwrap();
        let next = overflow
            .keys()
            .max()
            .map(|i| i + 1)
            .unwrap_or(0)
            .max(disk);
        overflow.insert(next, HeapPage::empty_page_data());
        debug!("appended page {} to table {}", next, self.name);
        Ok(HeapPageID::new(self.table_id, next))
    }

    /// Insert by free-slot scan: probe every page for room, append a fresh
    /// page when the table is full. Returns the dirtied pages.
    pub fn insert_tuple(
        &self,
        tx: &Transaction,
        tuple: &mut Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, DbError> {
        for i in 0..self.num_pages()? {
            let pid = HeapPageID::new(self.table_id, i);
            let page_rc = Database::buffer_pool().get_page(tx, Permission::ReadWrite, &pid)?;

            let mut page = page_rc.wl();
            if page.get_num_empty_slots() > 0 {
                page.insert_tuple(tuple)?;
                drop(page);
                return Ok(vec![page_rc]);
            }
        }

        let pid = self.append_empty_page()?;
        let page_rc = Database::buffer_pool().get_page(tx, Permission::ReadWrite, &pid)?;
        page_rc.wl().insert_tuple(tuple)?;
        Ok(vec![page_rc])
    }

    /// Delete the tuple its record id points at. Returns the dirtied page.
    pub fn delete_tuple(
        &self,
        tx: &Transaction,
        tuple: &mut Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, DbError> {
        let rid = tuple
            .get_record_id()
            .ok_or_else(|| DbError::Db("tuple has no record id".to_string()))?;
        if rid.pid.table_id != self.table_id {
            return Err(DbError::Db(format!(
                "record id {} does not belong to table {}",
                rid, self.name
            )));
        }

        let page_rc = Database::buffer_pool().get_page(tx, Permission::ReadWrite, &rid.pid)?;
        page_rc.wl().delete_tuple(tuple)?;
        Ok(vec![page_rc])
    }
}

/// Pull iterator over every tuple of a table, page order then slot order.
/// Pages are latched with read intent as they are opened.
pub struct HeapTableIterator {
    tx: Transaction,
    table: Pod<HeapTable>,

    opened: bool,
    page_index: u32,
    page_tuples: Vec<Tuple>,
    cursor: usize,
}

impl HeapTableIterator {
    pub fn new(tx: &Transaction, table: Pod<HeapTable>) -> Self {
        Self {
            tx: *tx,
            table,
            opened: false,
            page_index: 0,
            page_tuples: Vec::new(),
            cursor: 0,
        }
    }

    pub fn open(&mut self) -> DbResult {
        self.page_index = 0;
        self.cursor = 0;
        self.page_tuples.clear();
        self.opened = true;

        if self.num_pages()? > 0 {
            self.load_page(0)?;
        }
        Ok(())
    }

    pub fn has_next(&mut self) -> Result<bool, DbError> {
        if !self.opened {
            return Ok(false);
        }

        while self.cursor >= self.page_tuples.len() {
            if self.page_index + 1 >= self.num_pages()? {
                return Ok(false);
            }
            self.page_index += 1;
            let next = self.page_index;
            self.load_page(next)?;
        }
        Ok(true)
    }

    pub fn next(&mut self) -> Result<Tuple, DbError> {
        if !self.opened {
            return Err(DbError::Db(
                "iterator must be opened before calling next".to_string(),
            ));
        }
        if !self.has_next()? {
            return Err(DbError::Db("no more tuples".to_string()));
        }

        let tuple = self.page_tuples[self.cursor].clone();
        self.cursor += 1;
        Ok(tuple)
    }

    pub fn rewind(&mut self) -> DbResult {
        self.open()
    }

    pub fn close(&mut self) {
        self.opened = false;
        self.page_tuples.clear();
        self.cursor = 0;
    }

    fn num_pages(&self) -> Result<u32, DbError> {
        self.table.rl().num_pages()
    }

    fn load_page(&mut self, page_index: u32) -> DbResult {
        let pid = HeapPageID::new(self.table.rl().get_id(), page_index);
        let page_rc = Database::buffer_pool().get_page(&self.tx, Permission::ReadOnly, &pid)?;

        let page = page_rc.rl();
        self.page_tuples = page.iterator().cloned().collect();
        self.cursor = 0;
        Ok(())
    }
}
