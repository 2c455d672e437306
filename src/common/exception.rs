use thiserror::Error;

/// Failures raised while constructing a hash index.
///
/// Once the index exists, every operation reports logical failure through
/// its boolean return value instead; buffer pool exhaustion is converted
/// to `false` after the index restores a consistent state.
#[derive(Error, Debug)]
pub enum HashTableError {
    #[error("failed to allocate the directory page for index {0}")]
    DirectoryCreationFailed(String),
    #[error("failed to allocate the initial bucket page for index {0}")]
    BucketCreationFailed(String),
}
