use crate::buffer::buffer_pool_manager::BufferPool;
use crate::common::config::{PageId, DB_PAGE_SIZE};
use crate::storage::page::page::Page;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use std::cell::Cell;
use std::sync::Arc;

/// Scoped pin on a buffer-pool page.
///
/// A `PageGuard` pairs a pinned page with the pool that pinned it and
/// unpins on drop, carrying a dirty flag that the holder sets after
/// mutating the page. This makes the pin/unpin pairing hold on every exit
/// path, including early returns and panics.
///
/// Page latches are taken through [`PageGuard::read`] and
/// [`PageGuard::write`]; the returned lock guards borrow from this guard,
/// so a latch can never outlive its pin.
pub struct PageGuard {
    bpm: Arc<dyn BufferPool>,
    page: Arc<Page>,
    is_dirty: Cell<bool>,
}

impl PageGuard {
    /// Allocates a fresh zeroed page, pinned.
    pub fn alloc(bpm: Arc<dyn BufferPool>) -> Option<Self> {
        let page = bpm.new_page()?;
        Some(Self {
            bpm,
            page,
            is_dirty: Cell::new(false),
        })
    }

    /// Pins an existing page.
    pub fn fetch(bpm: Arc<dyn BufferPool>, page_id: PageId) -> Option<Self> {
        let page = bpm.fetch_page(page_id)?;
        Some(Self {
            bpm,
            page,
            is_dirty: Cell::new(false),
        })
    }

    pub fn get_page_id(&self) -> PageId {
        self.page.get_page_id()
    }

    /// Acquires the page read latch.
    pub fn read(&self) -> RwLockReadGuard<'_, [u8; DB_PAGE_SIZE]> {
        self.page.data()
    }

    /// Acquires the page write latch.
    pub fn write(&self) -> RwLockWriteGuard<'_, [u8; DB_PAGE_SIZE]> {
        self.page.data_mut()
    }

    /// Records that the holder mutated the page; the eventual unpin will
    /// commit the modification.
    pub fn mark_dirty(&self) {
        self.is_dirty.set(true);
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.bpm
            .unpin_page(self.page.get_page_id(), self.is_dirty.get());
    }
}
