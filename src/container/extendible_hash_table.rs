use crate::buffer::buffer_pool_manager::BufferPool;
use crate::common::config::PageId;
use crate::common::exception::HashTableError;
use crate::common::rwlatch::ReaderWriterLatch;
use crate::concurrency::transaction::Transaction;
use crate::container::hash_function::HashFunction;
use crate::storage::index::Comparator;
use crate::storage::page::hash_table_bucket_page::HashTableBucketPage;
use crate::storage::page::hash_table_directory_page::HashTableDirectoryPage;
use crate::storage::page::hash_table_page_defs::{bucket_array_size, PageSerde};
use crate::storage::page::page_guard::PageGuard;
use log::{debug, error, info, warn};
use std::marker::PhantomData;
use std::sync::Arc;

/// Implementation of an extendible hash table backed by a buffer pool.
/// Non-unique keys are supported; identical (key, value) pairs are
/// rejected. The directory grows and shrinks dynamically as buckets
/// become full and empty.
///
/// Two levels of synchronization coordinate concurrent callers: a
/// table-level reader-writer latch protecting the structural identity of
/// the directory (`get_value` and the fast path of `insert` hold it
/// shared; `remove` and all structural changes hold it exclusive), and the
/// per-page latches taken through page guards. Latches are always acquired
/// table first, then directory, then bucket, with the buffer pool pin held
/// before the page latch.
pub struct ExtendibleHashTable<K, V, C> {
    index_name: String,
    bpm: Arc<dyn BufferPool>,
    comparator: C,
    hash_fn: HashFunction<K>,
    directory_page_id: PageId,
    table_latch: ReaderWriterLatch,
    _marker: PhantomData<(K, V)>,
}

impl<K, V, C> ExtendibleHashTable<K, V, C>
where
    K: PageSerde,
    V: PageSerde + PartialEq,
    C: Comparator<K>,
{
    /// Creates a new `ExtendibleHashTable`, allocating its directory page
    /// and one initial bucket with global and local depth zero.
    pub fn new(
        name: String,
        bpm: Arc<dyn BufferPool>,
        comparator: C,
        hash_fn: HashFunction<K>,
    ) -> Result<Self, HashTableError> {
        let dir_guard = PageGuard::alloc(Arc::clone(&bpm))
            .ok_or_else(|| HashTableError::DirectoryCreationFailed(name.clone()))?;
        let directory_page_id = dir_guard.get_page_id();

        let bucket_guard = match PageGuard::alloc(Arc::clone(&bpm)) {
            Some(guard) => guard,
            None => {
                drop(dir_guard);
                bpm.delete_page(directory_page_id);
                return Err(HashTableError::BucketCreationFailed(name));
            }
        };
        let bucket_page_id = bucket_guard.get_page_id();

        {
            let mut data = dir_guard.write();
            let mut directory = HashTableDirectoryPage::new(&mut *data);
            directory.init();
            directory.set_bucket_page_id(0, bucket_page_id);
            directory.set_local_depth(0, 0);
        }
        dir_guard.mark_dirty();
        bucket_guard.mark_dirty();
        info!(
            "created hash table {} with directory page {} and bucket page {}",
            name, directory_page_id, bucket_page_id
        );

        Ok(Self {
            index_name: name,
            bpm,
            comparator,
            hash_fn,
            directory_page_id,
            table_latch: ReaderWriterLatch::new(),
            _marker: PhantomData,
        })
    }

    pub fn get_index_name(&self) -> &str {
        &self.index_name
    }

    /// Downcasts the hash to the 32 bits the directory indexes with.
    fn hash(&self, key: &K) -> u32 {
        self.hash_fn.get_hash(key) as u32
    }

    /// Resolves a key to its bucket page id through the directory. The
    /// directory pin is held only for the lookup.
    fn bucket_page_id_for(&self, key: &K) -> Option<PageId> {
        let dir_guard = PageGuard::fetch(Arc::clone(&self.bpm), self.directory_page_id)?;
        let data = dir_guard.read();
        let directory = HashTableDirectoryPage::new(&*data);
        let bucket_idx = self.hash(key) & directory.get_global_depth_mask();
        Some(directory.get_bucket_page_id(bucket_idx))
    }

    /// Collects every value stored under `key` into `result`. Returns
    /// `true` if at least one value was found.
    pub fn get_value(&self, _txn: Option<&Transaction>, key: &K, result: &mut Vec<V>) -> bool {
        let _table_latch = self.table_latch.read();
        let Some(bucket_page_id) = self.bucket_page_id_for(key) else {
            return false;
        };
        let Some(bucket_guard) = PageGuard::fetch(Arc::clone(&self.bpm), bucket_page_id) else {
            return false;
        };
        let data = bucket_guard.read();
        let bucket = HashTableBucketPage::<_, K, V>::new(&*data);
        bucket.get_value(key, &self.comparator, result)
    }

    /// Inserts a (key, value) pair. Returns `false` if the identical pair
    /// is already present or the directory cannot grow any further.
    pub fn insert(&self, txn: Option<&Transaction>, key: &K, value: &V) -> bool {
        let (inserted, full) = {
            let _table_latch = self.table_latch.read();
            let Some(bucket_page_id) = self.bucket_page_id_for(key) else {
                return false;
            };
            let Some(bucket_guard) = PageGuard::fetch(Arc::clone(&self.bpm), bucket_page_id)
            else {
                return false;
            };
            let (inserted, full) = {
                let mut data = bucket_guard.write();
                let mut bucket = HashTableBucketPage::<_, K, V>::new(&mut *data);
                (
                    bucket.insert(key, value, &self.comparator),
                    bucket.is_full(),
                )
            };
            if inserted {
                bucket_guard.mark_dirty();
            }
            (inserted, full)
        };

        if inserted {
            return true;
        }
        if !full {
            // Duplicate (key, value) pair; nothing to do.
            return false;
        }
        // The bucket is full: retry under the table writer latch. The
        // directory may have changed in the window between the latch
        // release and reacquisition, so everything is re-resolved there.
        self.split_insert(txn, key, value)
    }

    /// Slow insert path: splits the destination bucket until the pair fits
    /// or the directory is exhausted.
    fn split_insert(&self, _txn: Option<&Transaction>, key: &K, value: &V) -> bool {
        let _table_latch = self.table_latch.write();
        loop {
            let Some(bucket_page_id) = self.bucket_page_id_for(key) else {
                return false;
            };
            let Some(bucket_guard) = PageGuard::fetch(Arc::clone(&self.bpm), bucket_page_id)
            else {
                return false;
            };
            let inserted = {
                let mut data = bucket_guard.write();
                let mut bucket = HashTableBucketPage::<_, K, V>::new(&mut *data);
                bucket.insert(key, value, &self.comparator)
            };
            if inserted {
                bucket_guard.mark_dirty();
                return true;
            }
            drop(bucket_guard);
            // Pathological hash collisions may leave the destination full
            // even after a split, so splitting repeats until the insert
            // lands or the directory cannot grow.
            if !self.split(key) {
                return false;
            }
        }
    }

    /// Splits the bucket the key routes to, growing the directory first if
    /// the bucket is already at global depth.
    ///
    /// Either the split completes (two fresh buckets installed, old bucket
    /// deleted) or the directory keeps the old bucket and any pages
    /// allocated along the way are freed; a partial split is never visible.
    fn split(&self, key: &K) -> bool {
        let Some(dir_guard) = PageGuard::fetch(Arc::clone(&self.bpm), self.directory_page_id)
        else {
            return false;
        };
        let mut dir_data = dir_guard.write();
        let mut directory = HashTableDirectoryPage::new(&mut *dir_data);

        let bucket_idx = self.hash(key) & directory.get_global_depth_mask();
        let local_depth = directory.get_local_depth(bucket_idx);

        if local_depth == directory.get_global_depth() {
            if directory.size() * 2 > directory.max_size() {
                warn!(
                    "{}: directory exhausted at global depth {}",
                    self.index_name,
                    directory.get_global_depth()
                );
                return false;
            }
            let size = directory.size();
            for i in 0..size {
                let page_id = directory.get_bucket_page_id(i);
                let depth = directory.get_local_depth(i) as u8;
                directory.set_bucket_page_id(i + size, page_id);
                directory.set_local_depth(i + size, depth);
            }
            directory.incr_global_depth();
            dir_guard.mark_dirty();
            info!(
                "{}: directory grown to global depth {}",
                self.index_name,
                directory.get_global_depth()
            );
        }

        let old_page_id = directory.get_bucket_page_id(bucket_idx);
        let split_bit = 1u32 << local_depth;
        let new_depth = (local_depth + 1) as u8;

        let Some(new_a) = PageGuard::alloc(Arc::clone(&self.bpm)) else {
            warn!("{}: bucket split aborted, page allocation failed", self.index_name);
            return false;
        };
        let Some(new_b) = PageGuard::alloc(Arc::clone(&self.bpm)) else {
            let a_page_id = new_a.get_page_id();
            drop(new_a);
            self.bpm.delete_page(a_page_id);
            warn!("{}: bucket split aborted, page allocation failed", self.index_name);
            return false;
        };
        let Some(old_guard) = PageGuard::fetch(Arc::clone(&self.bpm), old_page_id) else {
            let (a_page_id, b_page_id) = (new_a.get_page_id(), new_b.get_page_id());
            drop(new_a);
            drop(new_b);
            self.bpm.delete_page(a_page_id);
            self.bpm.delete_page(b_page_id);
            return false;
        };

        // Redistribute every live entry of the old bucket by the new
        // distinguishing hash bit.
        {
            let old_data = old_guard.read();
            let old_bucket = HashTableBucketPage::<_, K, V>::new(&*old_data);
            let mut a_data = new_a.write();
            let mut b_data = new_b.write();
            let mut bucket_a = HashTableBucketPage::<_, K, V>::new(&mut *a_data);
            let mut bucket_b = HashTableBucketPage::<_, K, V>::new(&mut *b_data);
            for i in 0..bucket_array_size::<K, V>() as u32 {
                if !old_bucket.is_occupied(i) {
                    break;
                }
                if !old_bucket.is_readable(i) {
                    continue;
                }
                let entry_key = old_bucket.key_at(i);
                let entry_value = old_bucket.value_at(i);
                let target = if self.hash(&entry_key) & split_bit == 0 {
                    &mut bucket_a
                } else {
                    &mut bucket_b
                };
                if !target.insert(&entry_key, &entry_value, &self.comparator) {
                    error!("{}: entry lost during bucket split", self.index_name);
                }
            }
        }
        new_a.mark_dirty();
        new_b.mark_dirty();

        let a_page_id = new_a.get_page_id();
        let b_page_id = new_b.get_page_id();
        for j in 0..directory.size() {
            if directory.get_bucket_page_id(j) == old_page_id {
                let target = if j & split_bit == 0 { a_page_id } else { b_page_id };
                directory.set_bucket_page_id(j, target);
                directory.set_local_depth(j, new_depth);
            }
        }
        dir_guard.mark_dirty();
        debug!(
            "{}: split bucket page {} into {} and {} at local depth {}",
            self.index_name, old_page_id, a_page_id, b_page_id, new_depth
        );

        drop(old_guard);
        self.bpm.delete_page(old_page_id);
        true
    }

    /// Removes a (key, value) pair. Returns `false` if the pair is not
    /// present. When the bucket becomes empty the table keeps merging it
    /// with its split image and shrinking the directory for as long as the
    /// merge conditions hold; a failed merge ends the cascade but the
    /// remove itself still succeeded.
    pub fn remove(&self, _txn: Option<&Transaction>, key: &K, value: &V) -> bool {
        let _table_latch = self.table_latch.write();
        let Some(bucket_page_id) = self.bucket_page_id_for(key) else {
            return false;
        };
        let Some(bucket_guard) = PageGuard::fetch(Arc::clone(&self.bpm), bucket_page_id) else {
            return false;
        };
        let removed = {
            let mut data = bucket_guard.write();
            let mut bucket = HashTableBucketPage::<_, K, V>::new(&mut *data);
            bucket.remove(key, value, &self.comparator)
        };
        if !removed {
            return false;
        }
        bucket_guard.mark_dirty();
        drop(bucket_guard);

        loop {
            let is_empty = {
                let Some(page_id) = self.bucket_page_id_for(key) else {
                    break;
                };
                let Some(guard) = PageGuard::fetch(Arc::clone(&self.bpm), page_id) else {
                    break;
                };
                let data = guard.read();
                let bucket = HashTableBucketPage::<_, K, V>::new(&*data);
                bucket.is_empty()
            };
            if !is_empty {
                break;
            }
            if !self.merge(key) {
                break;
            }
            self.shrink_directory();
        }
        true
    }

    /// Merges the (empty) bucket the key routes to into its split image.
    /// Returns `false` when there is nothing to merge: the bucket is at
    /// local depth zero, or its buddy sits at a different local depth.
    fn merge(&self, key: &K) -> bool {
        let Some(dir_guard) = PageGuard::fetch(Arc::clone(&self.bpm), self.directory_page_id)
        else {
            return false;
        };
        let mut dir_data = dir_guard.write();
        let mut directory = HashTableDirectoryPage::new(&mut *dir_data);

        let bucket_idx = self.hash(key) & directory.get_global_depth_mask();
        let local_depth = directory.get_local_depth(bucket_idx);
        if local_depth == 0 {
            return false;
        }
        let buddy_idx = directory.get_split_image_index(bucket_idx);
        if directory.get_local_depth(buddy_idx) != local_depth {
            return false;
        }

        let old_page_id = directory.get_bucket_page_id(bucket_idx);
        let buddy_page_id = directory.get_bucket_page_id(buddy_idx);
        // Redirect the whole slot group, now one level shallower.
        let group_mask = (1u32 << (local_depth - 1)) - 1;
        let group_tag = bucket_idx & group_mask;
        for j in 0..directory.size() {
            if j & group_mask == group_tag {
                directory.set_bucket_page_id(j, buddy_page_id);
                directory.decr_local_depth(j);
            }
        }
        dir_guard.mark_dirty();
        debug!(
            "{}: merged bucket page {} into {}",
            self.index_name, old_page_id, buddy_page_id
        );

        drop(dir_data);
        drop(dir_guard);
        self.bpm.delete_page(old_page_id);
        true
    }

    /// Halves the directory for as long as every bucket's local depth is
    /// strictly below the global depth.
    fn shrink_directory(&self) {
        let Some(dir_guard) = PageGuard::fetch(Arc::clone(&self.bpm), self.directory_page_id)
        else {
            return;
        };
        let mut dir_data = dir_guard.write();
        let mut directory = HashTableDirectoryPage::new(&mut *dir_data);
        let mut shrunk = false;
        while directory.can_shrink() {
            directory.decr_global_depth();
            shrunk = true;
        }
        if shrunk {
            dir_guard.mark_dirty();
            info!(
                "{}: directory shrunk to global depth {}",
                self.index_name,
                directory.get_global_depth()
            );
        }
    }

    /// Returns the directory's global depth.
    pub fn get_global_depth(&self) -> u32 {
        let _table_latch = self.table_latch.read();
        let dir_guard = PageGuard::fetch(Arc::clone(&self.bpm), self.directory_page_id)
            .expect("directory page must be fetchable");
        let data = dir_guard.read();
        HashTableDirectoryPage::new(&*data).get_global_depth()
    }

    /// Verifies the directory invariants, panicking on violation. Intended
    /// for tests and assertions.
    pub fn verify_integrity(&self) {
        let _table_latch = self.table_latch.read();
        let dir_guard = PageGuard::fetch(Arc::clone(&self.bpm), self.directory_page_id)
            .expect("directory page must be fetchable");
        let data = dir_guard.read();
        HashTableDirectoryPage::new(&*data).verify_integrity();
    }
}
