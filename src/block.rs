//! Block I/O adapter: fixed 512-byte blocks on a partition.
//!
//! This is the external collaborator the driver dispatch layer consumes as
//! "Block I/O". The FAT core only ever asks for whole blocks at a block
//! index relative to the start of its partition; it never performs partial
//! sector I/O.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{FsError, Result};

/// Size in bytes of a single block. The driver never negotiates this value;
/// a `bytes_per_sector` read out of a BPB that disagrees with it is a
/// `CorruptSuperblock` error (see `fat::boot_sector`).
pub const SECTOR_SIZE: usize = 512;

/// A single fixed-size block.
pub type Block = [u8; SECTOR_SIZE];

/// Read/write access to fixed-size blocks on some sector-addressable medium,
/// scoped to a single partition (block 0 here is the partition's first LBA,
/// not the disk's).
pub trait BlockDevice {
    /// Reads `n` consecutive blocks starting at `start_block` into `buf`.
    /// `buf` must be exactly `n * SECTOR_SIZE` bytes.
    fn read_blocks(&mut self, start_block: u64, n: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes `n` consecutive blocks starting at `start_block` from `buf`.
    /// `buf` must be exactly `n * SECTOR_SIZE` bytes.
    fn write_blocks(&mut self, start_block: u64, n: u64, buf: &[u8]) -> Result<()>;

    /// Total number of blocks available on this device.
    fn block_count(&self) -> u64;
}

/// A `BlockDevice` backed by a `std::fs::File` — an on-disk image or a raw
/// block device node.
#[derive(Debug)]
pub struct FileBackedDevice {
    file: File,
    block_count: u64,
}

impl FileBackedDevice {
    /// Opens `path`, sizing the device from the file's current length.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::options().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, block_count: len / SECTOR_SIZE as u64 })
    }

    /// Opens `path`, overriding the device's reported block count — for
    /// raw devices whose `metadata().len()` does not reflect their true
    /// capacity.
    pub fn open_with_block_count(path: impl AsRef<Path>, block_count: u64) -> Result<Self> {
        let file = File::options().read(true).write(true).open(path)?;
        Ok(Self { file, block_count })
    }

    /// Creates a new zero-filled image of `block_count` blocks at `path`.
    pub fn create(path: impl AsRef<Path>, block_count: u64) -> Result<Self> {
        let file = File::options().read(true).write(true).create(true).truncate(true).open(path)?;
        file.set_len(block_count * SECTOR_SIZE as u64)?;
        Ok(Self { file, block_count })
    }
}

impl BlockDevice for FileBackedDevice {
    fn read_blocks(&mut self, start_block: u64, n: u64, buf: &mut [u8]) -> Result<()> {
        check_bounds(start_block, n, self.block_count, buf.len())?;
        self.file.seek(SeekFrom::Start(start_block * SECTOR_SIZE as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_blocks(&mut self, start_block: u64, n: u64, buf: &[u8]) -> Result<()> {
        check_bounds(start_block, n, self.block_count, buf.len())?;
        self.file.seek(SeekFrom::Start(start_block * SECTOR_SIZE as u64))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn block_count(&self) -> u64 {
        self.block_count
    }
}

fn check_bounds(start_block: u64, n: u64, block_count: u64, buf_len: usize) -> Result<()> {
    if buf_len as u64 != n * SECTOR_SIZE as u64 {
        return Err(FsError::InvalidArgument("buffer length does not match block count"));
    }
    if start_block.checked_add(n).map_or(true, |end| end > block_count) {
        return Err(FsError::InvalidArgument("block range out of device bounds"));
    }
    Ok(())
}

/// An in-memory `BlockDevice`, used by the test suite and as a scratch pad
/// for `FatFilesystem::create` before a caller decides to back it with a
/// real file.
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    blocks: Vec<u8>,
}

impl MemoryDevice {
    pub fn zeroed(block_count: u64) -> Self {
        Self { blocks: vec![0u8; block_count as usize * SECTOR_SIZE] }
    }
}

impl BlockDevice for MemoryDevice {
    fn read_blocks(&mut self, start_block: u64, n: u64, buf: &mut [u8]) -> Result<()> {
        let block_count = self.block_count();
        check_bounds(start_block, n, block_count, buf.len())?;
        let start = start_block as usize * SECTOR_SIZE;
        let len = n as usize * SECTOR_SIZE;
        buf.copy_from_slice(&self.blocks[start..start + len]);
        Ok(())
    }

    fn write_blocks(&mut self, start_block: u64, n: u64, buf: &[u8]) -> Result<()> {
        let block_count = self.block_count();
        check_bounds(start_block, n, block_count, buf.len())?;
        let start = start_block as usize * SECTOR_SIZE;
        let len = n as usize * SECTOR_SIZE;
        self.blocks[start..start + len].copy_from_slice(buf);
        Ok(())
    }

    fn block_count(&self) -> u64 {
        self.blocks.len() as u64 / SECTOR_SIZE as u64
    }
}
