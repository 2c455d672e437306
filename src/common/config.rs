pub const INVALID_PAGE_ID: PageId = PageId::MAX; // invalid page id
pub const INVALID_TXN_ID: TxnId = TxnId::MAX; // invalid transaction id
pub const DB_PAGE_SIZE: usize = 4096; // size of a data page in bytes
pub const BUFFER_POOL_SIZE: usize = 64; // default number of frames in the buffer pool

pub type FrameId = usize; // frame id type
pub type PageId = u32; // page id type
pub type TxnId = u64; // transaction id type
