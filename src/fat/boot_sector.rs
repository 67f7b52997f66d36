//! The Boot Parameter Block (BPB): sector 0 of a FAT12/16 volume, and the
//! geometry constants derived from it.
//!
//! Byte layout and field-by-field decoding style grounded on the byte-offset
//! decoding a BIOS Parameter Block reader uses, generalized from a FAT32
//! EBPB down to the plain DOS 3.31 BPB that FAT12 uses.

use crate::block::{BlockDevice, SECTOR_SIZE};
use crate::error::{FsError, Result};
use crate::fat::types::Cluster;

/// FAT variant selected by cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatVariant {
    Fat12,
    Fat16,
    Fat32,
}

/// The subset of the BPB this driver reads, plus the fields needed to write
/// one back out during `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bpb {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub fat_count: u8,
    pub root_count: u16,
    pub total_sectors_small: u16,
    pub media_descriptor: u8,
    pub sectors_per_fat: u16,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_large: u32,
}

macro_rules! field {
    ($buf:expr, $ty:tt, $offset:literal) => {
        $ty::from_le_bytes($buf[$offset..($offset + core::mem::size_of::<$ty>())].try_into().unwrap())
    };
}

impl Bpb {
    /// Reads and validates the BPB from block 0 of the partition.
    pub fn read<D: BlockDevice>(device: &mut D) -> Result<Self> {
        let mut sector = [0u8; SECTOR_SIZE];
        device.read_blocks(0, 1, &mut sector)?;
        Self::decode(&sector)
    }

    fn decode(sector: &[u8; SECTOR_SIZE]) -> Result<Self> {
        let bpb = Self {
            bytes_per_sector: field!(sector, u16, 0x0B),
            sectors_per_cluster: sector[0x0D],
            reserved_sectors: field!(sector, u16, 0x0E),
            fat_count: sector[0x10],
            root_count: field!(sector, u16, 0x11),
            total_sectors_small: field!(sector, u16, 0x13),
            media_descriptor: sector[0x15],
            sectors_per_fat: field!(sector, u16, 0x16),
            sectors_per_track: field!(sector, u16, 0x18),
            num_heads: field!(sector, u16, 0x1A),
            hidden_sectors: field!(sector, u32, 0x1C),
            total_sectors_large: field!(sector, u32, 0x20),
        };

        if bpb.bytes_per_sector as usize != SECTOR_SIZE {
            return Err(FsError::CorruptSuperblock("bytes_per_sector is not 512"));
        }
        if !bpb.sectors_per_cluster.is_power_of_two() || bpb.sectors_per_cluster > 128 {
            return Err(FsError::CorruptSuperblock("sectors_per_cluster is not a power of two in 1..=128"));
        }

        Ok(bpb)
    }

    /// Encodes this BPB into a freshly zeroed sector 0, including the
    /// `0x55AA` boot-sector signature so the image round-trips through
    /// `create` → `load`.
    pub fn encode(&self) -> [u8; SECTOR_SIZE] {
        let mut sector = [0u8; SECTOR_SIZE];
        sector[0] = 0xEB; // short jmp, filler boot code
        sector[1] = 0x3C;
        sector[2] = 0x90;
        sector[3..11].copy_from_slice(b"FATIMG10");
        sector[0x0B..0x0D].copy_from_slice(&self.bytes_per_sector.to_le_bytes());
        sector[0x0D] = self.sectors_per_cluster;
        sector[0x0E..0x10].copy_from_slice(&self.reserved_sectors.to_le_bytes());
        sector[0x10] = self.fat_count;
        sector[0x11..0x13].copy_from_slice(&self.root_count.to_le_bytes());
        sector[0x13..0x15].copy_from_slice(&self.total_sectors_small.to_le_bytes());
        sector[0x15] = self.media_descriptor;
        sector[0x16..0x18].copy_from_slice(&self.sectors_per_fat.to_le_bytes());
        sector[0x18..0x1A].copy_from_slice(&self.sectors_per_track.to_le_bytes());
        sector[0x1A..0x1C].copy_from_slice(&self.num_heads.to_le_bytes());
        sector[0x1C..0x20].copy_from_slice(&self.hidden_sectors.to_le_bytes());
        sector[0x20..0x24].copy_from_slice(&self.total_sectors_large.to_le_bytes());
        sector[SECTOR_SIZE - 2] = 0x55;
        sector[SECTOR_SIZE - 1] = 0xAA;
        sector
    }

    /// Picks a geometry for a freshly formatted volume of `total_sectors`
    /// 512-byte sectors. FAT12 only; `sectors_per_cluster` scales with
    /// volume size so that `num_clusters` stays comfortably under the
    /// FAT12 `4085` ceiling.
    pub fn new_fat12(total_sectors: u32, fat_count: u8, root_count: u16) -> Self {
        let sectors_per_cluster: u8 = if total_sectors <= 2_000 {
            1
        } else if total_sectors <= 8_000 {
            2
        } else if total_sectors <= 32_000 {
            4
        } else {
            8
        };

        let reserved_sectors: u16 = 1;
        let root_sectors = ((root_count as u32 * 32) + (SECTOR_SIZE as u32 - 1)) / SECTOR_SIZE as u32;

        // Solve for sectors_per_fat such that the resulting num_clusters is
        // consistent with the FAT size we pick (each FAT12 entry is 1.5
        // bytes; a few bytes of slack keeps this simple rather than exact).
        let mut sectors_per_fat: u32 = 1;
        loop {
            let first_data_sector = reserved_sectors as u32 + fat_count as u32 * sectors_per_fat;
            let data_sectors = total_sectors.saturating_sub(first_data_sector + root_sectors);
            let num_clusters = data_sectors / sectors_per_cluster as u32;
            let fat_bytes_needed = (num_clusters + 2) * 3 / 2;
            let needed_sectors = (fat_bytes_needed + SECTOR_SIZE as u32 - 1) / SECTOR_SIZE as u32;
            if needed_sectors <= sectors_per_fat || sectors_per_fat > 64 {
                break;
            }
            sectors_per_fat += 1;
        }

        let total_sectors_small = if total_sectors <= u16::MAX as u32 { total_sectors as u16 } else { 0 };
        let total_sectors_large = if total_sectors_small == 0 { total_sectors } else { 0 };

        Self {
            bytes_per_sector: SECTOR_SIZE as u16,
            sectors_per_cluster,
            reserved_sectors,
            fat_count,
            root_count,
            total_sectors_small,
            media_descriptor: 0xF8,
            sectors_per_fat: sectors_per_fat as u16,
            sectors_per_track: 63,
            num_heads: 255,
            hidden_sectors: 0,
            total_sectors_large,
        }
    }

    pub fn cluster_size(&self) -> u32 {
        self.bytes_per_sector as u32 * self.sectors_per_cluster as u32
    }

    pub fn root_sectors(&self) -> u32 {
        ((self.root_count as u32 * 32) + (self.bytes_per_sector as u32 - 1)) / self.bytes_per_sector as u32
    }

    pub fn first_data_sector(&self) -> u32 {
        self.reserved_sectors as u32 + self.fat_count as u32 * self.sectors_per_fat as u32
    }

    pub fn total_sectors(&self) -> u32 {
        if self.total_sectors_small != 0 { self.total_sectors_small as u32 } else { self.total_sectors_large }
    }

    pub fn num_clusters(&self) -> u32 {
        let data_sectors = self.total_sectors().saturating_sub(self.first_data_sector() + self.root_sectors());
        data_sectors / self.sectors_per_cluster as u32
    }

    pub fn fat_variant(&self) -> FatVariant {
        let n = self.num_clusters();
        if n < 4085 {
            FatVariant::Fat12
        } else if n < 65525 {
            FatVariant::Fat16
        } else {
            FatVariant::Fat32
        }
    }

    pub fn fat_bytes(&self) -> usize {
        self.sectors_per_fat as usize * self.bytes_per_sector as usize
    }

    /// Sector at which logical cluster `c` begins (cluster 0 denotes the
    /// FAT12/16 root, which is unchained).
    pub fn cluster_to_sector(&self, cluster: Cluster) -> u32 {
        if cluster == 0 {
            self.first_data_sector()
        } else {
            self.first_data_sector() + self.root_sectors() + (cluster - 2) * self.sectors_per_cluster as u32
        }
    }
}
