use crate::buffer::lru_replacer::LRUReplacer;
use crate::common::config::{FrameId, PageId};
use crate::storage::disk::disk_manager::DiskIO;
use crate::storage::page::page::Page;
use log::{debug, error, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// The buffer pool contract the index core depends on.
///
/// Every page handed out by `new_page`/`fetch_page` is pinned; the caller
/// owes exactly one `unpin_page` per pin, with `is_dirty = true` if it
/// mutated the page. `delete_page` frees a page whose pin count is zero.
pub trait BufferPool: Send + Sync {
    /// Allocates a fresh zeroed page and pins it. Returns `None` when
    /// every frame is pinned.
    fn new_page(&self) -> Option<Arc<Page>>;

    /// Pins an existing page, reading it from disk if necessary. Returns
    /// `None` when the page cannot be brought into the pool.
    fn fetch_page(&self, page_id: PageId) -> Option<Arc<Page>>;

    /// Releases one pin. `is_dirty` commits the caller's modifications.
    /// Returns `false` if the page is not resident or was not pinned.
    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool;

    /// Frees a page. Returns `false` if the page is still pinned; returns
    /// `true` if it was freed or is not resident.
    fn delete_page(&self, page_id: PageId) -> bool;
}

struct PoolInner {
    pages: Vec<Option<Arc<Page>>>,
    page_table: HashMap<PageId, FrameId>,
    free_list: Vec<FrameId>,
}

/// BufferPoolManager caches disk pages in a fixed set of in-memory frames,
/// evicting the least recently unpinned page when a frame is needed and
/// writing dirty pages back on eviction.
pub struct BufferPoolManager {
    pool_size: usize,
    next_page_id: AtomicU32,
    inner: Mutex<PoolInner>,
    replacer: LRUReplacer,
    disk: Arc<dyn DiskIO>,
}

impl BufferPoolManager {
    /// Creates a new buffer pool with `pool_size` frames over `disk`.
    pub fn new(pool_size: usize, disk: Arc<dyn DiskIO>) -> Self {
        let free_list: Vec<FrameId> = (0..pool_size).rev().collect();
        Self {
            pool_size,
            next_page_id: AtomicU32::new(0),
            inner: Mutex::new(PoolInner {
                pages: vec![None; pool_size],
                page_table: HashMap::new(),
                free_list,
            }),
            replacer: LRUReplacer::new(pool_size),
            disk,
        }
    }

    pub fn get_pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of resident pages with at least one outstanding pin. Useful
    /// for asserting pin balance in tests.
    pub fn num_pinned_pages(&self) -> usize {
        let inner = self.inner.lock();
        inner
            .pages
            .iter()
            .flatten()
            .filter(|page| page.get_pin_count() > 0)
            .count()
    }

    /// Pin count of a resident page, if any.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let inner = self.inner.lock();
        let frame_id = *inner.page_table.get(&page_id)?;
        inner.pages[frame_id].as_ref().map(|p| p.get_pin_count())
    }

    /// Writes every dirty resident page back to disk.
    pub fn flush_all_pages(&self) {
        let inner = self.inner.lock();
        for page in inner.pages.iter().flatten() {
            if page.is_dirty() {
                if let Err(e) = self.disk.write_page(page.get_page_id(), &page.data()) {
                    error!("failed to flush page {}: {}", page.get_page_id(), e);
                    continue;
                }
                page.set_dirty(false);
            }
        }
    }

    /// Finds a usable frame: the free list first, then the replacer. An
    /// evicted dirty page is written back before the frame is reused.
    fn acquire_frame(&self, inner: &mut PoolInner) -> Option<FrameId> {
        if let Some(frame_id) = inner.free_list.pop() {
            return Some(frame_id);
        }
        let frame_id = self.replacer.victim()?;
        if let Some(old_page) = inner.pages[frame_id].take() {
            if old_page.is_dirty() {
                let write_result = self.disk.write_page(old_page.get_page_id(), &old_page.data());
                if let Err(e) = write_result {
                    error!(
                        "failed to write back page {} during eviction: {}",
                        old_page.get_page_id(),
                        e
                    );
                    // Leave the old page in place and put the frame back up
                    // for eviction; the caller sees an allocation failure.
                    inner.pages[frame_id] = Some(old_page);
                    self.replacer.unpin(frame_id);
                    return None;
                }
            }
            debug!("evicted page {} from frame {}", old_page.get_page_id(), frame_id);
            inner.page_table.remove(&old_page.get_page_id());
        }
        Some(frame_id)
    }
}

impl BufferPool for BufferPoolManager {
    fn new_page(&self) -> Option<Arc<Page>> {
        let mut inner = self.inner.lock();
        let frame_id = match self.acquire_frame(&mut inner) {
            Some(frame_id) => frame_id,
            None => {
                warn!("new_page failed: all frames are pinned");
                return None;
            }
        };
        let page_id = self.next_page_id.fetch_add(1, Ordering::SeqCst);
        let page = Arc::new(Page::new(page_id));
        inner.pages[frame_id] = Some(Arc::clone(&page));
        inner.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        debug!("allocated page {} in frame {}", page_id, frame_id);
        Some(page)
    }

    fn fetch_page(&self, page_id: PageId) -> Option<Arc<Page>> {
        let mut inner = self.inner.lock();
        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let page = Arc::clone(inner.pages[frame_id].as_ref()?);
            page.pin();
            self.replacer.pin(frame_id);
            return Some(page);
        }

        let frame_id = match self.acquire_frame(&mut inner) {
            Some(frame_id) => frame_id,
            None => {
                warn!("fetch_page({}) failed: all frames are pinned", page_id);
                return None;
            }
        };
        let page = Arc::new(Page::new(page_id));
        {
            let mut data = page.data_mut();
            if let Err(e) = self.disk.read_page(page_id, &mut data) {
                error!("failed to read page {} from disk: {}", page_id, e);
                inner.free_list.push(frame_id);
                return None;
            }
        }
        inner.pages[frame_id] = Some(Arc::clone(&page));
        inner.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        debug!("fetched page {} into frame {}", page_id, frame_id);
        Some(page)
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return false;
        };
        let Some(page) = inner.pages[frame_id].as_ref() else {
            return false;
        };
        if page.get_pin_count() == 0 {
            return false;
        }
        if is_dirty {
            page.set_dirty(true);
        }
        if page.unpin() == 0 {
            self.replacer.unpin(frame_id);
        }
        true
    }

    fn delete_page(&self, page_id: PageId) -> bool {
        let mut inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            // Not resident: nothing to free in the pool.
            return true;
        };
        let Some(page) = inner.pages[frame_id].as_ref() else {
            return true;
        };
        if page.get_pin_count() > 0 {
            warn!(
                "delete_page({}) refused: {} outstanding pin(s)",
                page_id,
                page.get_pin_count()
            );
            return false;
        }
        inner.page_table.remove(&page_id);
        inner.pages[frame_id] = None;
        self.replacer.pin(frame_id);
        inner.free_list.push(frame_id);
        debug!("deleted page {} from frame {}", page_id, frame_id);
        true
    }
}
