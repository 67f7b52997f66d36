//! Uniform dispatch over filesystem drivers.
//!
//! Only FAT12 is implemented; `FsKind` exists so a caller that identifies a
//! partition by its MBR type byte has somewhere to route an unsupported one
//! without the façade operations themselves growing a second implementation.

use crate::block::BlockDevice;
use crate::error::{FsError, Result};
use crate::fat::{DirListing, FatFilesystem, Fstat, NewFile};
use crate::fat::types::Inode;
use crate::partition::{PARTITION_TYPE_FAT12, PARTITION_TYPE_FAT16, PARTITION_TYPE_FAT16_LBA};

/// Which on-disk filesystem a `Driver` is holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsKind {
    Fat12,
}

impl FsKind {
    /// Maps an MBR partition type byte to the driver that handles it.
    pub fn from_partition_type(type_byte: u8) -> Result<Self> {
        match type_byte {
            PARTITION_TYPE_FAT12 | PARTITION_TYPE_FAT16 | PARTITION_TYPE_FAT16_LBA => Ok(FsKind::Fat12),
            _ => Err(FsError::Unsupported("partition type is not a FAT12/16 one")),
        }
    }
}

/// Bundles the nine façade operations and four lifecycle hooks behind one
/// handle, plus the `present` flag a caller enumerating driver slots uses
/// to tell a mounted volume from an empty one, so a caller that has
/// already resolved `FsKind` doesn't need to name `FatFilesystem` directly.
pub struct Driver<D: BlockDevice> {
    kind: FsKind,
    present: bool,
    fs: FatFilesystem<D>,
}

impl<D: BlockDevice> Driver<D> {
    pub fn kind(&self) -> FsKind {
        self.kind
    }

    /// Whether this slot currently holds a mounted filesystem. Always
    /// `true` for a `Driver` obtained from `load`/`create`; exists so a
    /// caller that keeps a fixed-size table of driver slots has a way to
    /// tell a live mount from an empty one without an `Option<Driver<D>>`
    /// at every call site.
    pub fn present(&self) -> bool {
        self.present
    }

    pub fn load(device: D) -> Result<Self> {
        Ok(Self { kind: FsKind::Fat12, present: true, fs: FatFilesystem::load(device)? })
    }

    pub fn create(device: D, total_sectors: u32, fat_count: u8, root_count: u16) -> Result<Self> {
        Ok(Self { kind: FsKind::Fat12, present: true, fs: FatFilesystem::create(device, total_sectors, fat_count, root_count)? })
    }

    pub fn close(self) -> Result<()> {
        self.fs.close()
    }

    pub fn check(&self) -> Result<()> {
        self.fs.check()
    }

    pub fn read(&mut self, ino: Inode, buf: &mut [u8], len: usize, offset: u64) -> Result<usize> {
        self.fs.read(ino, buf, len, offset)
    }

    pub fn write(&mut self, ino: Inode, buf: &[u8], len: usize, offset: u64) -> Result<usize> {
        self.fs.write(ino, buf, len, offset)
    }

    pub fn touch(&mut self, new: NewFile) -> Result<Inode> {
        self.fs.touch(new)
    }

    pub fn readdir(&mut self, dir: Inode, n: u32) -> Result<Option<DirListing>> {
        self.fs.readdir(dir, n)
    }

    pub fn link(&mut self, child: Inode, dir: Inode, name: &str) -> Result<()> {
        self.fs.link(child, dir, name)
    }

    pub fn unlink(&mut self, dir: Inode, n: u32) -> Result<()> {
        self.fs.unlink(dir, n)
    }

    pub fn fstat(&self, ino: Inode) -> Result<Fstat> {
        self.fs.fstat(ino)
    }

    pub fn mkdir(&mut self, parent: Inode, name: &str) -> Result<()> {
        self.fs.mkdir(parent, name)
    }

    pub fn rmdir(&mut self, dir: Inode, n: u32) -> Result<()> {
        self.fs.rmdir(dir, n)
    }
}
