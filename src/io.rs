use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
    sync::{Mutex, MutexGuard},
};

use crate::error::{DbError, DbResult};

/// A file handle behind its own monitor. All positioned reads and writes go
/// through the guard, so seek+read pairs are atomic with respect to other
/// users of the same handle.
pub struct LockedFile {
    file: Mutex<File>,
}

impl LockedFile {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self, DbError> {
        let f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(file_path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    pub fn get_file(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap()
    }

    pub fn get_size(&self) -> Result<u64, DbError> {
        let metadata = self.get_file().metadata()?;
        Ok(metadata.len())
    }

    pub fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, DbError> {
        let mut file = self.get_file();
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn write_at(&self, offset: u64, bytes: &[u8]) -> DbResult {
        let mut file = self.get_file();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }

    /// Append at the current end of file, returning the offset the payload
    /// was written at.
    pub fn append(&self, bytes: &[u8]) -> Result<u64, DbError> {
        let mut file = self.get_file();
        let offset = file.seek(SeekFrom::End(0))?;
        file.write_all(bytes)?;
        Ok(offset)
    }

    pub fn sync(&self) -> DbResult {
        self.get_file().sync_all()?;
        Ok(())
    }
}

pub fn read_exact<R: Read>(reader: &mut R, bytes_count: usize) -> Result<Vec<u8>, DbError> {
    let mut buffer = vec![0u8; bytes_count];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

pub fn read_i32<R: Read>(reader: &mut R) -> Result<i32, DbError> {
    let bytes = read_exact(reader, 4)?;
    let bytes: [u8; 4] = bytes
        .try_into()
        .map_err(|_| DbError::Db("short read".to_string()))?;
    Ok(i32::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_round_trip() {
        let path = std::env::temp_dir().join("heapdb_io_test.bin");
        let _ = std::fs::remove_file(&path);
        let file = LockedFile::new(&path).unwrap();

        file.write_at(0, &[1, 2, 3, 4]).unwrap();
        let offset = file.append(&[5, 6]).unwrap();
        assert_eq!(offset, 4);
        assert_eq!(file.get_size().unwrap(), 6);
        assert_eq!(file.read_at(2, 3).unwrap(), vec![3, 4, 5]);

        let _ = std::fs::remove_file(&path);
    }
}
