use crate::common::config::{PageId, DB_PAGE_SIZE};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Page is the basic unit of storage within the database system. Page wraps
/// an actual data page held in main memory, plus the book-keeping used by
/// the buffer pool manager: pin count, dirty flag, page id.
///
/// The payload lives behind a reader-writer lock which doubles as the
/// per-page latch: `data()` acquires the read latch, `data_mut()` the write
/// latch. Latches must only be taken while the page is pinned, and must be
/// released before the pin is given back.
pub struct Page {
    /// The ID of this page.
    page_id: PageId,
    /// The pin count of this page.
    pin_count: AtomicU32,
    /// True if the page was modified since it was last flushed.
    is_dirty: AtomicBool,
    /// The actual data stored within the page, guarded by the page latch.
    data: RwLock<[u8; DB_PAGE_SIZE]>,
}

impl Page {
    /// Constructor. Zeroes out the page data and starts with one pin
    /// (held by the caller that asked the buffer pool for the page).
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            pin_count: AtomicU32::new(1),
            is_dirty: AtomicBool::new(false),
            data: RwLock::new([0; DB_PAGE_SIZE]),
        }
    }

    /// Returns the page id of this page.
    pub fn get_page_id(&self) -> PageId {
        self.page_id
    }

    /// Acquires the page read latch and returns the page contents.
    pub fn data(&self) -> RwLockReadGuard<'_, [u8; DB_PAGE_SIZE]> {
        self.data.read()
    }

    /// Acquires the page write latch and returns the page contents.
    pub fn data_mut(&self) -> RwLockWriteGuard<'_, [u8; DB_PAGE_SIZE]> {
        self.data.write()
    }

    /// Returns the pin count of this page.
    pub fn get_pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::SeqCst)
    }

    /// Returns true if the page is dirty.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::SeqCst)
    }

    /// Sets the dirty flag of this page.
    pub fn set_dirty(&self, is_dirty: bool) {
        self.is_dirty.store(is_dirty, Ordering::SeqCst);
    }

    /// Increments the pin count, returning the new value. Called by the
    /// buffer pool manager under its own lock.
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Decrements the pin count, returning the new value. The caller must
    /// have checked that the count is nonzero.
    pub(crate) fn unpin(&self) -> u32 {
        self.pin_count.fetch_sub(1, Ordering::SeqCst) - 1
    }
}
