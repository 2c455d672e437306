use crate::common::config::{PageId, DB_PAGE_SIZE};
use log::debug;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Result as IoResult, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

/// The `DiskIO` trait defines the basic operations for interacting with disk
/// storage. Implementers of this trait must provide methods to write and read
/// pages.
pub trait DiskIO: Send + Sync {
    fn write_page(&self, page_id: PageId, page_data: &[u8; DB_PAGE_SIZE]) -> IoResult<()>;
    fn read_page(&self, page_id: PageId, page_data: &mut [u8; DB_PAGE_SIZE]) -> IoResult<()>;
}

/// File-backed disk manager. Page `n` lives at byte offset
/// `n * DB_PAGE_SIZE` in the database file.
pub struct FileDiskManager {
    db_io: Mutex<File>,
    file_name: PathBuf,
    num_writes: AtomicU32,
}

impl FileDiskManager {
    /// Opens (creating if necessary) the database file at `db_file`.
    pub fn new(db_file: impl AsRef<Path>) -> IoResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(db_file.as_ref())?;
        Ok(Self {
            db_io: Mutex::new(file),
            file_name: db_file.as_ref().to_path_buf(),
            num_writes: AtomicU32::new(0),
        })
    }

    pub fn get_file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }
}

impl DiskIO for FileDiskManager {
    fn write_page(&self, page_id: PageId, page_data: &[u8; DB_PAGE_SIZE]) -> IoResult<()> {
        let offset = page_id as u64 * DB_PAGE_SIZE as u64;
        let mut file = self.db_io.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(page_data)?;
        file.flush()?;
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        debug!("wrote page {} at offset {}", page_id, offset);
        Ok(())
    }

    fn read_page(&self, page_id: PageId, page_data: &mut [u8; DB_PAGE_SIZE]) -> IoResult<()> {
        let offset = page_id as u64 * DB_PAGE_SIZE as u64;
        let mut file = self.db_io.lock();
        file.seek(SeekFrom::Start(offset))?;

        // A page past the end of the file has never been flushed; it reads
        // back as zeroes.
        let mut total = 0;
        while total < DB_PAGE_SIZE {
            let n = file.read(&mut page_data[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        page_data[total..].fill(0);
        debug!("read page {} at offset {} ({} bytes on disk)", page_id, offset, total);
        Ok(())
    }
}
