//! A FAT12 filesystem driver exposing an inode-oriented façade: `read`,
//! `write`, `touch`, `readdir`, `link`, `unlink`, `fstat`, `mkdir`, `rmdir`,
//! plus the `load`/`create`/`close`/`check` lifecycle, dispatched through
//! `Driver` over any `block::BlockDevice`.

pub mod block;
pub mod driver;
pub mod error;
pub mod fat;
pub mod partition;

pub use block::{Block, BlockDevice, FileBackedDevice, MemoryDevice, SECTOR_SIZE};
pub use driver::{Driver, FsKind};
pub use error::{FsError, Result};
pub use fat::{DirListing, FatFilesystem, Fstat, NewFile};
pub use fat::types::Inode;
pub use partition::MasterBootRecord;
