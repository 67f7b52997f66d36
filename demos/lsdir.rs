//! Lists the top-level entries of a FAT12 disk image's root directory.
//!
//! Reads the MBR, locates the first FAT12/16 partition, and walks it
//! through `readdir` rather than any OS mount.
//!
//! ```text
//! cargo run --example lsdir -- <path>
//! ```

use std::env;
use std::process::ExitCode;

use fatimg::block::{BlockDevice, FileBackedDevice};
use fatimg::partition::MasterBootRecord;
use fatimg::{FatFilesystem, Result};

/// A `BlockDevice` view over one partition of a larger device, offsetting
/// every block index by the partition's first block.
struct PartitionView<D> {
    inner: D,
    first_block: u64,
}

impl<D: BlockDevice> BlockDevice for PartitionView<D> {
    fn read_blocks(&mut self, start_block: u64, n: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.read_blocks(self.first_block + start_block, n, buf)
    }

    fn write_blocks(&mut self, start_block: u64, n: u64, buf: &[u8]) -> Result<()> {
        self.inner.write_blocks(self.first_block + start_block, n, buf)
    }

    fn block_count(&self) -> u64 {
        self.inner.block_count().saturating_sub(self.first_block)
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: lsdir <path>");
        return ExitCode::FAILURE;
    };

    let result = (|| -> Result<Vec<String>> {
        let mut device = FileBackedDevice::open(&path)?;
        let (first_block, block_count) = match MasterBootRecord::read(&mut device) {
            Ok(mbr) => match mbr.first_fat_partition() {
                Some(p) => (p.first_block as u64, p.block_count as u64),
                None => (0, device.block_count()),
            },
            Err(_) => (0, device.block_count()),
        };

        let view = PartitionView { inner: device, first_block };
        let _ = block_count;
        let mut fs = FatFilesystem::load(view)?;

        let mut names = Vec::new();
        let mut index = 0u32;
        while let Some(entry) = fs.readdir(fatimg::fat::types::ROOT_INODE, index)? {
            names.push(entry.name);
            index += 1;
        }
        Ok(names)
    })();

    match result {
        Ok(names) => {
            for name in names {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("lsdir failed: {e}");
            ExitCode::FAILURE
        }
    }
}
