use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A reader-writer latch protecting the structural identity of a shared
/// data structure. Multiple readers may hold the latch simultaneously;
/// writers are exclusive.
///
/// Both acquisition methods hand back a guard so the latch is released on
/// every exit path, including panics and early returns.
#[derive(Default)]
pub struct ReaderWriterLatch {
    latch: RwLock<()>,
}

impl ReaderWriterLatch {
    pub fn new() -> Self {
        Self {
            latch: RwLock::new(()),
        }
    }

    /// Acquires the latch in shared (read) mode, blocking until available.
    pub fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.latch.read()
    }

    /// Acquires the latch in exclusive (write) mode, blocking until available.
    pub fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.latch.write()
    }
}
