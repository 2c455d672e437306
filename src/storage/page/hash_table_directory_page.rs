use crate::common::config::{PageId, DB_PAGE_SIZE, INVALID_PAGE_ID};
use crate::storage::page::hash_table_page_defs::DIRECTORY_ARRAY_SIZE;
use std::collections::HashMap;

/// Directory page for the extendible hash index.
///
/// Directory format (sizes in bytes):
///
/// ```text
/// ---------------------------------------------------------------------
/// | GlobalDepth (4) | BucketPageIds (4 * 512) | LocalDepths (512) | ... |
/// ---------------------------------------------------------------------
/// ```
///
/// Only the first `2^global_depth` slots are live; the rest are retained
/// so that shrinking the directory is a matter of decrementing the global
/// depth. Structural invariants (equal page id implies equal local depth,
/// slot-group congruence) are maintained by the hash table, not here.
///
/// Like the bucket page, this is a view over the raw page bytes of a
/// pinned, latched page.
pub struct HashTableDirectoryPage<T> {
    data: T,
}

const GLOBAL_DEPTH_OFFSET: usize = 0;
const BUCKET_PAGE_IDS_OFFSET: usize = 4;
const LOCAL_DEPTHS_OFFSET: usize = BUCKET_PAGE_IDS_OFFSET + 4 * DIRECTORY_ARRAY_SIZE;

impl<T: AsRef<[u8]>> HashTableDirectoryPage<T> {
    /// Creates a directory page view over the given page payload.
    ///
    /// # Panics
    ///
    /// Panics if `data` is not exactly `DB_PAGE_SIZE` bytes.
    pub fn new(data: T) -> Self {
        assert_eq!(
            data.as_ref().len(),
            DB_PAGE_SIZE,
            "directory page view requires exactly {} bytes",
            DB_PAGE_SIZE
        );
        Self { data }
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Returns the global depth of the hash table directory.
    pub fn get_global_depth(&self) -> u32 {
        u32::from_le_bytes(
            self.data()[GLOBAL_DEPTH_OFFSET..GLOBAL_DEPTH_OFFSET + 4]
                .try_into()
                .unwrap(),
        )
    }

    /// Returns the current directory size, `2^global_depth`.
    pub fn size(&self) -> u32 {
        1 << self.get_global_depth()
    }

    /// Returns the maximum directory size.
    pub fn max_size(&self) -> u32 {
        DIRECTORY_ARRAY_SIZE as u32
    }

    /// Returns a mask of global-depth ones and the rest zeroes.
    pub fn get_global_depth_mask(&self) -> u32 {
        (1 << self.get_global_depth()) - 1
    }

    /// Looks up the bucket page id stored at a directory index.
    pub fn get_bucket_page_id(&self, bucket_idx: u32) -> PageId {
        let offset = BUCKET_PAGE_IDS_OFFSET + 4 * bucket_idx as usize;
        PageId::from_le_bytes(self.data()[offset..offset + 4].try_into().unwrap())
    }

    /// Gets the local depth of the bucket at `bucket_idx`.
    pub fn get_local_depth(&self, bucket_idx: u32) -> u32 {
        self.data()[LOCAL_DEPTHS_OFFSET + bucket_idx as usize] as u32
    }

    /// Returns a mask of local-depth ones for the bucket at `bucket_idx`.
    pub fn get_local_depth_mask(&self, bucket_idx: u32) -> u32 {
        (1 << self.get_local_depth(bucket_idx)) - 1
    }

    /// Gets the split image of an index: the sibling slot that the bucket
    /// at `bucket_idx` would merge with. Requires a nonzero local depth.
    pub fn get_split_image_index(&self, bucket_idx: u32) -> u32 {
        bucket_idx ^ (1 << (self.get_local_depth(bucket_idx) - 1))
    }

    /// Returns true if the directory can be shrunk: every live slot's local
    /// depth is strictly below the global depth.
    pub fn can_shrink(&self) -> bool {
        self.get_global_depth() > 0
            && (0..self.size()).all(|i| self.get_local_depth(i) < self.get_global_depth())
    }

    /// Verifies the integrity of the directory:
    ///
    /// 1. All local depths are less than or equal to the global depth.
    /// 2. Each bucket has precisely `2^(global depth - local depth)` slots
    ///    pointing to it.
    /// 3. The local depth is the same at each index with the same bucket
    ///    page id.
    ///
    /// # Panics
    ///
    /// Panics with a description of the violated invariant. Intended for
    /// tests and assertions; there is no self-healing.
    pub fn verify_integrity(&self) {
        let mut pointer_counts: HashMap<PageId, u32> = HashMap::new();
        let mut depths: HashMap<PageId, u32> = HashMap::new();

        for bucket_idx in 0..self.size() {
            let page_id = self.get_bucket_page_id(bucket_idx);
            let local_depth = self.get_local_depth(bucket_idx);
            assert!(
                local_depth <= self.get_global_depth(),
                "local depth {} at index {} exceeds global depth {}",
                local_depth,
                bucket_idx,
                self.get_global_depth()
            );
            *pointer_counts.entry(page_id).or_default() += 1;
            if let Some(&seen) = depths.get(&page_id) {
                assert_eq!(
                    seen, local_depth,
                    "bucket page {} has inconsistent local depths {} and {}",
                    page_id, seen, local_depth
                );
            } else {
                depths.insert(page_id, local_depth);
            }
        }

        for (page_id, count) in pointer_counts {
            let expected = 1 << (self.get_global_depth() - depths[&page_id]);
            assert_eq!(
                count, expected,
                "bucket page {} is referenced by {} slots, expected {}",
                page_id, count, expected
            );
        }
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> HashTableDirectoryPage<T> {
    fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }

    /// Initializes an empty directory: global depth zero, all local depths
    /// zero, all bucket page ids invalid.
    pub fn init(&mut self) {
        self.set_global_depth(0);
        for i in 0..DIRECTORY_ARRAY_SIZE as u32 {
            self.set_bucket_page_id(i, INVALID_PAGE_ID);
            self.set_local_depth(i, 0);
        }
    }

    fn set_global_depth(&mut self, global_depth: u32) {
        self.data_mut()[GLOBAL_DEPTH_OFFSET..GLOBAL_DEPTH_OFFSET + 4]
            .copy_from_slice(&global_depth.to_le_bytes());
    }

    /// Increments the global depth of the directory.
    pub fn incr_global_depth(&mut self) {
        let depth = self.get_global_depth();
        debug_assert!(((depth + 1) as usize) <= DIRECTORY_ARRAY_SIZE.trailing_zeros() as usize);
        self.set_global_depth(depth + 1);
    }

    /// Decrements the global depth of the directory. The upper half of the
    /// directory simply becomes inaccessible; no entries move.
    pub fn decr_global_depth(&mut self) {
        let depth = self.get_global_depth();
        debug_assert!(depth > 0);
        self.set_global_depth(depth - 1);
    }

    /// Updates the directory slot at `bucket_idx` to point at `bucket_page_id`.
    pub fn set_bucket_page_id(&mut self, bucket_idx: u32, bucket_page_id: PageId) {
        let offset = BUCKET_PAGE_IDS_OFFSET + 4 * bucket_idx as usize;
        self.data_mut()[offset..offset + 4].copy_from_slice(&bucket_page_id.to_le_bytes());
    }

    /// Sets the local depth of the bucket at `bucket_idx`.
    pub fn set_local_depth(&mut self, bucket_idx: u32, local_depth: u8) {
        self.data_mut()[LOCAL_DEPTHS_OFFSET + bucket_idx as usize] = local_depth;
    }

    /// Increments the local depth of the bucket at `bucket_idx`.
    pub fn incr_local_depth(&mut self, bucket_idx: u32) {
        let depth = self.get_local_depth(bucket_idx);
        self.set_local_depth(bucket_idx, (depth + 1) as u8);
    }

    /// Decrements the local depth of the bucket at `bucket_idx`.
    pub fn decr_local_depth(&mut self, bucket_idx: u32) {
        let depth = self.get_local_depth(bucket_idx);
        debug_assert!(depth > 0);
        self.set_local_depth(bucket_idx, (depth - 1) as u8);
    }
}
