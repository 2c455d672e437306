use crate::common::config::DB_PAGE_SIZE;

/// Fixed-width little-endian encoding of a key or value into an index page.
///
/// Bucket pages store their entries as raw bytes at computed offsets, so
/// every key and value type that goes into the index must round-trip
/// through a fixed number of bytes. This is the monomorphization glue: the
/// index is instantiated per (key, value, comparator) triple and all layout
/// arithmetic follows from the two `ENCODED_LEN`s.
pub trait PageSerde: Copy {
    /// Number of bytes this type occupies inside a page.
    const ENCODED_LEN: usize;

    /// Writes the value into `buf[..ENCODED_LEN]`.
    fn write_le(&self, buf: &mut [u8]);

    /// Reads a value back from `buf[..ENCODED_LEN]`.
    fn read_le(buf: &[u8]) -> Self;
}

impl PageSerde for i32 {
    const ENCODED_LEN: usize = 4;

    fn write_le(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.to_le_bytes());
    }

    fn read_le(buf: &[u8]) -> Self {
        i32::from_le_bytes(buf[..4].try_into().expect("i32::read_le: buffer too small"))
    }
}

impl PageSerde for u32 {
    const ENCODED_LEN: usize = 4;

    fn write_le(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.to_le_bytes());
    }

    fn read_le(buf: &[u8]) -> Self {
        u32::from_le_bytes(buf[..4].try_into().expect("u32::read_le: buffer too small"))
    }
}

/// BUCKET_ARRAY_SIZE is the number of (key, value) pairs that can be stored
/// in an extendible hash index bucket page. Each pair needs two additional
/// bits for the occupied and readable bitmaps, hence
/// `4 * DB_PAGE_SIZE / (4 * sizeof(pair) + 1)`: 0.25 bytes = 2 bits is the
/// bitmap space per pair. This is the largest capacity whose entry array
/// plus both bitmaps still fit in one page.
pub const fn bucket_array_size<K: PageSerde, V: PageSerde>() -> usize {
    (4 * DB_PAGE_SIZE) / (4 * (K::ENCODED_LEN + V::ENCODED_LEN) + 1)
}

/// DIRECTORY_ARRAY_SIZE is the number of bucket page ids that fit in the
/// directory page of an extendible hash index. It must be a power of two
/// (the directory grows by doubling), and 512 leaves room for the global
/// depth and the local depth array alongside the page id array.
pub const DIRECTORY_ARRAY_SIZE: usize = 512;
