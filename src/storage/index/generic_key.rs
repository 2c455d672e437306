use crate::storage::index::Comparator;
use crate::storage::page::hash_table_page_defs::PageSerde;
use std::cmp::Ordering;

/// A generic fixed-width key used for indexing with opaque data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GenericKey<const N: usize> {
    /// The fixed-size array holding the key data.
    data: [u8; N],
}

impl<const N: usize> GenericKey<N> {
    /// Creates a new `GenericKey` with zeroed data.
    pub fn new() -> Self {
        Self { data: [0; N] }
    }

    /// Sets the key data from a slice of bytes, truncating or leaving the
    /// tail zeroed as needed.
    pub fn set_from_bytes(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(N);
        self.data[..len].copy_from_slice(&bytes[..len]);
    }

    /// Sets the key from an integer, little-endian, for tests and integer
    /// key columns.
    pub fn set_from_integer(&mut self, value: i64) {
        self.data = [0; N];
        let bytes = value.to_le_bytes();
        let len = bytes.len().min(N);
        self.data[..len].copy_from_slice(&bytes[..len]);
    }

    /// Returns a reference to the key's byte data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl<const N: usize> Default for GenericKey<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PageSerde for GenericKey<N> {
    const ENCODED_LEN: usize = N;

    fn write_le(&self, buf: &mut [u8]) {
        buf[..N].copy_from_slice(&self.data);
    }

    fn read_le(buf: &[u8]) -> Self {
        let mut key = Self::new();
        key.data.copy_from_slice(&buf[..N]);
        key
    }
}

/// Bytewise comparator for `GenericKey`.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericComparator<const N: usize>;

impl<const N: usize> GenericComparator<N> {
    pub fn new() -> Self {
        Self
    }
}

impl<const N: usize> Comparator<GenericKey<N>> for GenericComparator<N> {
    fn compare(&self, lhs: &GenericKey<N>, rhs: &GenericKey<N>) -> Ordering {
        lhs.data.cmp(&rhs.data)
    }
}
