use std::path::{Path, PathBuf};

use log::debug;

use crate::{
    error::{DbError, DbResult},
    io::LockedFile,
    transaction::{Transaction, TransactionID},
};

#[derive(Debug, Clone, Copy)]
#[repr(u8)]
enum RecordType {
    Start = 0,
    Update = 1,
    Commit = 2,
    Abort = 3,
}

/// Append-only write-ahead log.
///
/// An UPDATE record carries the before and after image of one page and must
/// be appended and forced before that page is written out; with NO-STEAL +
/// FORCE this is all the recovery information the engine emits. There is no
/// replay pass.
pub struct LogManager {
    file: LockedFile,
    file_path: PathBuf,

    total_records: usize,
    current_offset: u64,
}

impl LogManager {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self, DbError> {
        let file = LockedFile::new(&file_path)?;
        let current_offset = file.get_size()?;
        Ok(Self {
            file,
            file_path: file_path.as_ref().to_path_buf(),
            total_records: 0,
            current_offset,
        })
    }

    pub fn records_count(&self) -> usize {
        self.total_records
    }

    /// Byte position one past the last appended record.
    pub fn get_current_offset(&self) -> u64 {
        self.current_offset
    }

    pub fn log_start(&mut self, tx: &Transaction) -> DbResult {
        self.append_plain(RecordType::Start, tx.get_id())
    }

    pub fn log_commit(&mut self, tx: &Transaction) -> DbResult {
        self.append_plain(RecordType::Commit, tx.get_id())?;
        self.force()
    }

    pub fn log_abort(&mut self, tx: &Transaction) -> DbResult {
        self.append_plain(RecordType::Abort, tx.get_id())?;
        self.force()
    }

    /// Append an UPDATE record with the page images surrounding one write.
    pub fn log_update(
        &mut self,
        tid: TransactionID,
        before_image: &[u8],
        after_image: &[u8],
    ) -> DbResult {
        let mut buf = Vec::with_capacity(1 + 8 + 8 + before_image.len() + after_image.len());
        buf.push(RecordType::Update as u8);
        buf.extend_from_slice(&tid.to_be_bytes());
        buf.extend_from_slice(&(before_image.len() as u32).to_be_bytes());
        buf.extend_from_slice(before_image);
        buf.extend_from_slice(&(after_image.len() as u32).to_be_bytes());
        buf.extend_from_slice(after_image);

        self.append(&buf)?;
        debug!(
            "logged update for tx_{}, {} byte images",
            tid,
            after_image.len()
        );
        Ok(())
    }

    /// Force everything appended so far to stable storage.
    pub fn force(&mut self) -> DbResult {
        self.file.sync()
    }

    /// Drop all log content. Test hook.
    pub fn reset(&mut self) -> DbResult {
        self.file.get_file().set_len(0)?;
        self.total_records = 0;
        self.current_offset = 0;
        Ok(())
    }

    pub fn get_file_path(&self) -> &Path {
        &self.file_path
    }

    fn append_plain(&mut self, record_type: RecordType, tid: TransactionID) -> DbResult {
        let mut buf = Vec::with_capacity(9);
        buf.push(record_type as u8);
        buf.extend_from_slice(&tid.to_be_bytes());
        self.append(&buf)
    }

    fn append(&mut self, bytes: &[u8]) -> DbResult {
        let offset = self.file.append(bytes)?;
        self.current_offset = offset + bytes.len() as u64;
        self.total_records += 1;
        Ok(())
    }
}
