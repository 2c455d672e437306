use crate::common::config::{PageId, DB_PAGE_SIZE};
use crate::storage::disk::disk_manager::DiskIO;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::Result as IoResult;

/// DiskManagerMemory replicates the utility of the file-backed disk manager
/// in memory. It is primarily used for data structure testing.
pub struct DiskManagerMemory {
    pages: RwLock<HashMap<PageId, Box<[u8; DB_PAGE_SIZE]>>>,
}

impl DiskManagerMemory {
    pub fn new() -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
        }
    }

    /// Number of pages ever written.
    pub fn num_pages(&self) -> usize {
        self.pages.read().len()
    }
}

impl Default for DiskManagerMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskIO for DiskManagerMemory {
    fn write_page(&self, page_id: PageId, page_data: &[u8; DB_PAGE_SIZE]) -> IoResult<()> {
        let mut pages = self.pages.write();
        pages.insert(page_id, Box::new(*page_data));
        Ok(())
    }

    fn read_page(&self, page_id: PageId, page_data: &mut [u8; DB_PAGE_SIZE]) -> IoResult<()> {
        let pages = self.pages.read();
        match pages.get(&page_id) {
            Some(stored) => page_data.copy_from_slice(&stored[..]),
            // Never-written pages read back as zeroes, mirroring the
            // file-backed manager's short-read behavior.
            None => page_data.fill(0),
        }
        Ok(())
    }
}
