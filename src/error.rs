//! Error taxonomy shared by every façade operation.

use thiserror::Error;

/// Everything a caller of this crate can observe going wrong.
///
/// Operations never assert an invariant fatal; they return one of these and
/// let the caller decide.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("corrupt superblock: {0}")]
    CorruptSuperblock(&'static str),

    #[error("no free cluster available")]
    NoSpace,

    #[error("no such inode or directory entry")]
    NotFound,

    #[error("inode does not refer to a directory")]
    NotADirectory,

    #[error("directory is not empty")]
    NotEmpty,

    #[error("unsupported volume: {0}")]
    Unsupported(&'static str),

    #[error("block device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, FsError>;
