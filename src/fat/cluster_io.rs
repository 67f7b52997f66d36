//! Cluster I/O: translating `(cluster, offset)` into `(sector, byte)` and
//! reading/writing whole clusters, including the FAT12/16 root-directory
//! special case.

use crate::block::{BlockDevice, SECTOR_SIZE};
use crate::error::Result;
use crate::fat::boot_sector::Bpb;
use crate::fat::types::Cluster;

/// Reads `n` logical clusters starting at `cluster` into `buf`.
///
/// `cluster == 0` addresses the (unchained) FAT12/16 root directory;
/// reading a partial root-directory window is undefined, so callers always
/// start such reads from the beginning.
pub fn read_clusters<D: BlockDevice>(device: &mut D, bpb: &Bpb, cluster: Cluster, n: u32, buf: &mut [u8]) -> Result<()> {
    let start_sector = bpb.cluster_to_sector(cluster) as u64;
    let sectors = n * bpb.sectors_per_cluster as u32;
    device.read_blocks(start_sector, sectors as u64, buf)
}

/// Writes `n` logical clusters starting at `cluster` from `buf`.
pub fn write_clusters<D: BlockDevice>(device: &mut D, bpb: &Bpb, cluster: Cluster, n: u32, buf: &[u8]) -> Result<()> {
    let start_sector = bpb.cluster_to_sector(cluster) as u64;
    let sectors = n * bpb.sectors_per_cluster as u32;
    device.write_blocks(start_sector, sectors as u64, buf)
}

/// Allocates a zeroed scratch buffer sized for `n` clusters.
pub fn scratch_buffer(bpb: &Bpb, n: u32) -> Vec<u8> {
    vec![0u8; n as usize * bpb.cluster_size() as usize]
}

/// Reads `n` logical clusters of the unchained FAT12/16 root directory,
/// starting at logical index `start` (root clusters have no FAT chain, so
/// they're addressed by position rather than by cluster number).
pub fn read_root_clusters<D: BlockDevice>(device: &mut D, bpb: &Bpb, start: u32, n: u32, buf: &mut [u8]) -> Result<()> {
    let start_sector = bpb.first_data_sector() as u64 + start as u64 * bpb.sectors_per_cluster as u64;
    let sectors = n * bpb.sectors_per_cluster as u32;
    device.read_blocks(start_sector, sectors as u64, buf)
}

/// Writes `n` logical clusters of the unchained FAT12/16 root directory,
/// starting at logical index `start`.
pub fn write_root_clusters<D: BlockDevice>(device: &mut D, bpb: &Bpb, start: u32, n: u32, buf: &[u8]) -> Result<()> {
    let start_sector = bpb.first_data_sector() as u64 + start as u64 * bpb.sectors_per_cluster as u64;
    let sectors = n * bpb.sectors_per_cluster as u32;
    device.write_blocks(start_sector, sectors as u64, buf)
}

/// Reads the whole unchained FAT12/16 root-directory region, sector-exact
/// (the region's byte size is a sector count, not necessarily a whole
/// number of clusters).
pub fn read_root_region<D: BlockDevice>(device: &mut D, bpb: &Bpb, buf: &mut [u8]) -> Result<()> {
    device.read_blocks(bpb.first_data_sector() as u64, bpb.root_sectors() as u64, buf)
}

/// Writes the whole unchained FAT12/16 root-directory region, sector-exact.
pub fn write_root_region<D: BlockDevice>(device: &mut D, bpb: &Bpb, buf: &[u8]) -> Result<()> {
    device.write_blocks(bpb.first_data_sector() as u64, bpb.root_sectors() as u64, buf)
}

/// How many whole sectors the FAT12/16 root directory occupies, expressed
/// in "logical clusters" terms for uniform chain-length math.
pub fn root_logical_cluster_count(bpb: &Bpb) -> u32 {
    let root_bytes = bpb.root_count as u32 * 32;
    (root_bytes + bpb.cluster_size() - 1) / bpb.cluster_size()
}
