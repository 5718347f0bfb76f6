use std::io::Cursor;

use bit_vec::BitVec;
use log::debug;

use crate::{
    error::{DbError, DbResult},
    storage::{
        buffer_pool::BufferPool,
        page_id::{HeapPageID, RecordID},
        schema::Schema,
        tuple::Tuple,
    },
    transaction::TransactionID,
    utils::ceil_div,
};

/// A slotted heap page.
///
/// On disk the page is a header bitmap (one bit per slot, MSB-first within
/// each byte, 1 = occupied) followed by `slot_count` fixed-size tuple
/// records. Trailing bytes beyond the last record are zero.
pub struct HeapPage {
    pid: HeapPageID,
    schema: Schema,

    slot_count: usize,

    // slot status bits: true means occupied
    header: BitVec,

    // record bodies for all slots, including empty ones
    tuples: Vec<Tuple>,

    dirty: Option<TransactionID>,

    // byte image at the last commit, attached to WAL update records
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Parse a page from exactly one page worth of bytes.
    pub fn new(pid: HeapPageID, bytes: &[u8], schema: &Schema) -> Result<Self, DbError> {
        let page_size = BufferPool::get_page_size();
        if bytes.len() != page_size {
            return Err(DbError::Db(format!(
                "page {} has {} bytes, expected {}",
                pid,
                bytes.len(),
                page_size
            )));
        }

        let slot_count = Self::get_slots_count(schema);
        let header_size = Self::get_header_size(slot_count);
        let tuple_size = schema.get_size();

        let header = BitVec::from_bytes(&bytes[..header_size]);

        let mut tuples = Vec::with_capacity(slot_count);
        for i in 0..slot_count {
            let start = header_size + i * tuple_size;
            let mut reader = Cursor::new(&bytes[start..start + tuple_size]);
            let mut tuple = Tuple::read_from(&mut reader, schema)?;
            if header.get(i).unwrap_or(false) {
                tuple.set_record_id(Some(RecordID::new(pid, i)));
            }
            tuples.push(tuple);
        }

        Ok(Self {
            pid,
            schema: schema.clone(),
            slot_count,
            header,
            tuples,
            dirty: None,
            before_image: bytes.to_vec(),
        })
    }

    pub fn new_empty(pid: HeapPageID, schema: &Schema) -> Result<Self, DbError> {
        Self::new(pid, &Self::empty_page_data(), schema)
    }

    pub fn empty_page_data() -> Vec<u8> {
        vec![0; BufferPool::get_page_size()]
    }

    /// Number of records a page can hold: each record costs its body plus
    /// one header bit.
    pub fn get_slots_count(schema: &Schema) -> usize {
        let bits_per_tuple = schema.get_size() * 8 + 1;
        BufferPool::get_page_size() * 8 / bits_per_tuple
    }

    pub fn get_header_size(slot_count: usize) -> usize {
        ceil_div(slot_count, 8)
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        self.header.get(slot).unwrap_or(false)
    }

    pub fn mark_slot_used(&mut self, slot: usize, used: bool) {
        self.header.set(slot, used);
    }

    pub fn get_num_empty_slots(&self) -> usize {
        (0..self.slot_count).filter(|i| !self.is_slot_used(*i)).count()
    }

    pub fn get_num_tuples(&self) -> usize {
        self.slot_count - self.get_num_empty_slots()
    }

    /// Place the tuple in the lowest-indexed free slot and point its record
    /// id at that slot.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> DbResult {
        if tuple.get_schema() != &self.schema {
            return Err(DbError::Db(format!(
                "tuple schema {} does not match page schema {}",
                tuple.get_schema(),
                self.schema
            )));
        }
        if let Some(rid) = tuple.get_record_id() {
            return Err(DbError::Db(format!(
                "tuple is already stored at {}",
                rid
            )));
        }

        let slot = (0..self.slot_count)
            .find(|i| !self.is_slot_used(*i))
            .ok_or_else(|| DbError::Db(format!("page {} is full", self.pid)))?;

        tuple.set_record_id(Some(RecordID::new(self.pid, slot)));
        self.tuples[slot] = tuple.clone();
        self.mark_slot_used(slot, true);

        debug!("inserted tuple into {} slot {}", self.pid, slot);
        Ok(())
    }

    /// Free the slot the tuple's record id points at and clear the record
    /// id.
    pub fn delete_tuple(&mut self, tuple: &mut Tuple) -> DbResult {
        let rid = tuple
            .get_record_id()
            .ok_or_else(|| DbError::Db("tuple has no record id".to_string()))?;
        if rid.pid != self.pid {
            return Err(DbError::Db(format!(
                "record id {} does not reference page {}",
                rid, self.pid
            )));
        }
        if rid.slot >= self.slot_count || !self.is_slot_used(rid.slot) {
            return Err(DbError::Db(format!("slot {} is not in use", rid.slot)));
        }

        self.mark_slot_used(rid.slot, false);
        tuple.set_record_id(None);
        Ok(())
    }

    /// Occupied tuples in ascending slot order.
    pub fn iterator(&self) -> impl Iterator<Item = &Tuple> {
        (0..self.slot_count)
            .filter(|i| self.is_slot_used(*i))
            .map(|i| &self.tuples[i])
    }

    /// Serialize header and body back to exactly one page worth of bytes.
    /// Empty slots serialize as zeros.
    pub fn get_page_data(&self) -> Result<Vec<u8>, DbError> {
        let page_size = BufferPool::get_page_size();
        let tuple_size = self.schema.get_size();

        let mut bytes = self.header.to_bytes();
        for i in 0..self.slot_count {
            if self.is_slot_used(i) {
                bytes.extend_from_slice(&self.tuples[i].to_bytes()?);
            } else {
                bytes.extend_from_slice(&vec![0; tuple_size]);
            }
        }
        bytes.resize(page_size, 0);
        Ok(bytes)
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionID) {
        if dirty {
            self.dirty = Some(tid);
        } else {
            self.dirty = None;
        }
    }

    pub fn is_dirty(&self) -> Option<TransactionID> {
        self.dirty
    }

    pub fn get_before_image(&self) -> Vec<u8> {
        self.before_image.clone()
    }

    /// Capture the current bytes as the committed image. Called after a
    /// successful flush at commit time.
    pub fn set_before_image(&mut self) -> DbResult {
        self.before_image = self.get_page_data()?;
        Ok(())
    }
}
