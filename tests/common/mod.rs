use exthash::buffer::buffer_pool_manager::BufferPoolManager;
use exthash::common::logger::initialize_logger;
use exthash::storage::disk::disk_manager_memory::DiskManagerMemory;
use std::sync::Arc;

/// Builds a buffer pool over an in-memory disk manager.
pub fn setup_bpm(pool_size: usize) -> Arc<BufferPoolManager> {
    initialize_logger();
    Arc::new(BufferPoolManager::new(
        pool_size,
        Arc::new(DiskManagerMemory::new()),
    ))
}
