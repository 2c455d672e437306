//! # Record ID (RID)
//!
//! The `RID` (Record ID) is the fundamental identifier for locating
//! individual records (tuples) within a table: which page holds the record,
//! and which slot within that page. Indexes store RIDs as their values.
//!
//! On index pages a RID is stored as a fixed-width little-endian pair
//! `[page_id: u32][slot_num: u32]` (see [`RID::ENCODED_LEN`]).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::config::{PageId, INVALID_PAGE_ID};
use crate::storage::page::hash_table_page_defs::PageSerde;

/// Record ID (RID) - identifies a record's physical location in a table.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Hash, Ord, Serialize, Deserialize)]
pub struct RID {
    /// The page identifier within the table heap.
    page_id: PageId,
    /// The slot index within the page's slot directory.
    slot_num: u32,
}

impl RID {
    /// Fixed-width on-disk/in-page encoding length (little-endian):
    /// `[page_id: u32][slot_num: u32]`.
    pub const ENCODED_LEN: usize = 4 + 4;

    /// Creates a new RID with the given page ID and slot number.
    pub const fn new(page_id: PageId, slot_num: u32) -> Self {
        Self { page_id, slot_num }
    }

    /// Returns the page ID of the RID.
    pub const fn get_page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the slot number of the RID.
    pub const fn get_slot_num(&self) -> u32 {
        self.slot_num
    }

    /// Serialize the RID as a fixed-width, little-endian byte array:
    /// `[page_id: u32][slot_num: u32]`.
    pub fn to_bytes_le(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[..4].copy_from_slice(&self.page_id.to_le_bytes());
        out[4..8].copy_from_slice(&self.slot_num.to_le_bytes());
        out
    }

    /// Try to deserialize a RID from `[page_id: u32][slot_num: u32]`
    /// (little-endian). Returns `None` if the buffer is too small.
    pub fn try_deserialize(data: &[u8]) -> Option<Self> {
        if data.len() < Self::ENCODED_LEN {
            return None;
        }
        let page_id = PageId::from_le_bytes(data[..4].try_into().ok()?);
        let slot_num = u32::from_le_bytes(data[4..8].try_into().ok()?);
        Some(Self::new(page_id, slot_num))
    }
}

impl PageSerde for RID {
    const ENCODED_LEN: usize = RID::ENCODED_LEN;

    fn write_le(&self, buf: &mut [u8]) {
        buf[..Self::ENCODED_LEN].copy_from_slice(&self.to_bytes_le());
    }

    fn read_le(buf: &[u8]) -> Self {
        RID::try_deserialize(buf).expect("RID::read_le: buffer too small")
    }
}

/// Formats the RID as `"page_id: <id> slot_num: <num>"`.
impl fmt::Display for RID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page_id: {} slot_num: {}", self.page_id, self.slot_num)
    }
}

/// Returns an invalid RID using [`INVALID_PAGE_ID`] and slot 0.
impl Default for RID {
    fn default() -> Self {
        Self {
            page_id: INVALID_PAGE_ID,
            slot_num: 0,
        }
    }
}
