//! The FAT12 filesystem façade: the generic inode-oriented operations
//! built on top of the BPB parser, FAT table codec, cluster allocator,
//! cluster I/O, inode registry, and directory-entry codec.

pub mod boot_sector;
pub mod cluster_io;
pub mod dirent;
pub mod fstime;
pub mod inode;
pub mod table;
pub mod types;

use log::{debug, trace, warn};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::block::{BlockDevice, SECTOR_SIZE};
use crate::error::{FsError, Result};

use boot_sector::Bpb;
use dirent::{EntryMarker, LongNameEntry, ShortEntry};
use inode::{InodeRecord, InodeRegistry};
use table::FatTable;
use types::{attr, Cluster, Inode, PARENT_UNKNOWN, ROOT_INODE};

/// What a caller hands `touch` to describe the inode it wants created.
#[derive(Debug, Clone, Copy)]
pub struct NewFile {
    pub size: u32,
    pub directory: bool,
}

/// The metadata record `fstat` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fstat {
    pub size: u64,
    pub mode: u32,
    pub atime: i64,
    pub ctime: i64,
    pub mtime: i64,
}

/// One live entry returned by `readdir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    pub name: String,
    pub inode: Inode,
}

fn now_epoch() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// Where a given inode's bytes physically live: the unchained FAT12/16
/// root-directory region, or an ordinary FAT cluster chain.
enum ClusterSource {
    Root { logical_clusters: u32 },
    Chain(Vec<Cluster>),
}

impl ClusterSource {
    fn len(&self) -> u32 {
        match self {
            ClusterSource::Root { logical_clusters } => *logical_clusters,
            ClusterSource::Chain(v) => v.len() as u32,
        }
    }
}

/// A mounted FAT12 volume, bridging an inode-oriented API onto a
/// filesystem that keeps all of its metadata inside directory entries.
pub struct FatFilesystem<D: BlockDevice> {
    device: D,
    bpb: Bpb,
    fat: FatTable,
    inodes: InodeRegistry,
}

impl<D: BlockDevice> FatFilesystem<D> {
    // ---- lifecycle -------------------------------------------------------

    /// `load`: read the BPB, read the (first) FAT into memory, seed the
    /// registry with the root inode.
    pub fn load(mut device: D) -> Result<Self> {
        let bpb = Bpb::read(&mut device)?;
        if bpb.fat_variant() != boot_sector::FatVariant::Fat12 {
            return Err(FsError::Unsupported("only FAT12 volumes are implemented"));
        }

        let fat_bytes = bpb.fat_bytes();
        let mut raw_fat = vec![0u8; fat_bytes];
        device.read_blocks(bpb.reserved_sectors as u64, bpb.sectors_per_fat as u64, &mut raw_fat)?;
        let fat = FatTable::from_bytes(raw_fat, bpb.num_clusters());

        debug!("mounted FAT12 volume: {} clusters, cluster size {}", bpb.num_clusters(), bpb.cluster_size());

        Ok(Self { device, bpb, fat, inodes: InodeRegistry::new(now_epoch()) })
    }

    /// `create`: format a fresh FAT12 volume of `total_sectors` 512-byte
    /// sectors. FAT16/32 formatting is out of scope.
    pub fn create(mut device: D, total_sectors: u32, fat_count: u8, root_count: u16) -> Result<Self> {
        if total_sectors as u64 > device.block_count() {
            return Err(FsError::InvalidArgument("total_sectors exceeds the device's capacity"));
        }

        let bpb = Bpb::new_fat12(total_sectors, fat_count, root_count);
        device.write_blocks(0, 1, &bpb.encode())?;

        // Zero the root directory region so a freshly formatted volume
        // reads back as an empty directory (first byte 0x00 terminates).
        let root_sectors = bpb.root_sectors();
        let zeros = vec![0u8; root_sectors as usize * SECTOR_SIZE];
        device.write_blocks(bpb.first_data_sector() as u64, root_sectors as u64, &zeros)?;

        let fat = FatTable::new_formatted(bpb.fat_bytes(), bpb.num_clusters(), bpb.media_descriptor);

        debug!("formatted FAT12 volume: {total_sectors} sectors, {} clusters", bpb.num_clusters());

        Ok(Self { device, bpb, fat, inodes: InodeRegistry::new(now_epoch()) })
    }

    /// Flushes the in-memory FAT out to every on-disk copy, without
    /// consuming the mount.
    fn flush(&mut self) -> Result<()> {
        for copy in 0..self.bpb.fat_count as u32 {
            let start = self.bpb.reserved_sectors as u32 + copy * self.bpb.sectors_per_fat as u32;
            self.device.write_blocks(start as u64, self.bpb.sectors_per_fat as u64, self.fat.as_bytes())?;
        }
        debug!("flushed {} FAT cop{} at close", self.bpb.fat_count, if self.bpb.fat_count == 1 { "y" } else { "ies" });
        Ok(())
    }

    /// `close`: flush the in-memory FAT out to every on-disk copy, then
    /// drop everything.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    /// Flushes and hands back the underlying device, for a caller that
    /// wants to reopen the same backing storage without round-tripping
    /// through a file (tests, in-process demos).
    pub fn into_device(mut self) -> Result<D> {
        self.flush()?;
        Ok(self.device)
    }

    /// `check`: no-op placeholder.
    pub fn check(&self) -> Result<()> {
        Ok(())
    }

    // ---- internal cluster/window helpers ----------------------------------

    fn cluster_source(&self, ino: Inode) -> Result<ClusterSource> {
        let record = self.inodes.get(ino)?;
        if ino == ROOT_INODE {
            Ok(ClusterSource::Root { logical_clusters: cluster_io::root_logical_cluster_count(&self.bpb) })
        } else {
            Ok(ClusterSource::Chain(self.fat.chain(record.first_cluster)))
        }
    }

    fn effective_size(&self, record: &InodeRecord, source: &ClusterSource) -> u64 {
        if record.size != 0 {
            record.size as u64
        } else {
            source.len() as u64 * self.bpb.cluster_size() as u64
        }
    }

    /// Reads logical cluster `i` of `source` into `window`, delegating the
    /// actual cluster-to-sector translation to `cluster_io` so the root's
    /// unchained addressing and an ordinary chain's per-cluster addressing
    /// share the same two functions.
    fn read_cluster_window(&mut self, source: &ClusterSource, i: u32, window: &mut [u8]) -> Result<()> {
        match source {
            ClusterSource::Root { logical_clusters } => {
                if i >= *logical_clusters {
                    return Err(FsError::InvalidArgument("cluster chain shorter than declared size"));
                }
                cluster_io::read_root_clusters(&mut self.device, &self.bpb, i, 1, window)
            }
            ClusterSource::Chain(v) => {
                let c = *v.get(i as usize).ok_or(FsError::InvalidArgument("cluster chain shorter than declared size"))?;
                cluster_io::read_clusters(&mut self.device, &self.bpb, c, 1, window)
            }
        }
    }

    /// Writes `window` to logical cluster `i` of `source`; the write-side
    /// counterpart of [`Self::read_cluster_window`].
    fn write_cluster_window(&mut self, source: &ClusterSource, i: u32, window: &[u8]) -> Result<()> {
        match source {
            ClusterSource::Root { logical_clusters } => {
                if i >= *logical_clusters {
                    return Err(FsError::InvalidArgument("cluster chain shorter than declared size"));
                }
                cluster_io::write_root_clusters(&mut self.device, &self.bpb, i, 1, window)
            }
            ClusterSource::Chain(v) => {
                let c = *v.get(i as usize).ok_or(FsError::InvalidArgument("cluster chain shorter than declared size"))?;
                cluster_io::write_clusters(&mut self.device, &self.bpb, c, 1, window)
            }
        }
    }

    // ---- façade operations -------------------------------------------------

    /// `read(fs, INODE, buf, len, off) -> bytes_read`.
    pub fn read(&mut self, ino: Inode, buf: &mut [u8], len: usize, offset: u64) -> Result<usize> {
        let record = self.inodes.get(ino)?.clone();
        let source = self.cluster_source(ino)?;
        let size = self.effective_size(&record, &source);

        if offset >= size {
            return Ok(0);
        }
        let len = len.min(buf.len()).min((size - offset) as usize);
        if len == 0 {
            return Ok(0);
        }

        let cluster_size = self.bpb.cluster_size() as u64;
        let start_cluster = (offset / cluster_size) as u32;
        let intra = (offset % cluster_size) as usize;
        let n_clusters = ((len + intra) as u64).div_ceil(cluster_size) as u32;

        let mut scratch = cluster_io::scratch_buffer(&self.bpb, n_clusters);
        for i in 0..n_clusters {
            let window = &mut scratch[(i as usize) * cluster_size as usize..(i as usize + 1) * cluster_size as usize];
            self.read_cluster_window(&source, start_cluster + i, window)?;
        }

        buf[..len].copy_from_slice(&scratch[intra..intra + len]);
        Ok(len)
    }

    /// `write(fs, INODE, buf, len, off) -> bytes_written`. Read-modify-write
    /// per cluster window; does not extend files.
    pub fn write(&mut self, ino: Inode, buf: &[u8], len: usize, offset: u64) -> Result<usize> {
        let record = self.inodes.get(ino)?.clone();
        let source = self.cluster_source(ino)?;
        let size = self.effective_size(&record, &source);

        if offset >= size {
            return Ok(0);
        }
        let len = len.min(buf.len()).min((size - offset) as usize);
        if len == 0 {
            return Ok(0);
        }

        let cluster_size = self.bpb.cluster_size() as u64;
        let start_cluster = (offset / cluster_size) as u32;
        let intra = (offset % cluster_size) as usize;
        let n_clusters = ((len + intra) as u64).div_ceil(cluster_size) as u32;

        let mut scratch = cluster_io::scratch_buffer(&self.bpb, n_clusters);
        for i in 0..n_clusters {
            let window = &mut scratch[(i as usize) * cluster_size as usize..(i as usize + 1) * cluster_size as usize];
            self.read_cluster_window(&source, start_cluster + i, window)?;
        }

        scratch[intra..intra + len].copy_from_slice(&buf[..len]);

        for i in 0..n_clusters {
            let window = &scratch[(i as usize) * cluster_size as usize..(i as usize + 1) * cluster_size as usize];
            self.write_cluster_window(&source, start_cluster + i, window)?;
        }

        if let Ok(record) = self.inodes.get_mut(ino) {
            record.mtime = now_epoch();
        }

        Ok(len)
    }

    /// `touch(fs, fstat) -> INODE`. Allocates a chain of at least one
    /// cluster (never zero, even for a zero-byte file), but writes no
    /// directory entry yet; linkage happens in `link`.
    pub fn touch(&mut self, new: NewFile) -> Result<Inode> {
        let cluster_size = self.bpb.cluster_size();
        let n = (new.size as u64).div_ceil(cluster_size as u64).max(1) as u32;
        let head = self.fat.allocate_chain(n)?;

        let now = now_epoch();
        let attributes = if new.directory { attr::DIRECTORY } else { 0 };
        let record = InodeRecord { parent: PARENT_UNKNOWN, attributes, first_cluster: head, size: new.size, atime: now, ctime: now, mtime: now };
        let handle = self.inodes.register(record);
        trace!("touch: inode {handle} with {n} cluster(s) starting at {head}");
        Ok(handle)
    }

    /// `readdir(fs, INODE, index) -> {name, INODE} | none`.
    pub fn readdir(&mut self, dir: Inode, n: u32) -> Result<Option<DirListing>> {
        let dir_record = self.inodes.get(dir)?.clone();
        if !dir_record.is_dir() {
            return Err(FsError::NotADirectory);
        }

        if n == 0 {
            return Ok(Some(DirListing { name: ".".to_string(), inode: dir }));
        }
        if n == 1 {
            let parent = if dir_record.parent < 0 { dir } else { dir_record.parent as Inode };
            return Ok(Some(DirListing { name: "..".to_string(), inode: parent }));
        }

        // The FAT12/16 root carries no physical `.`/`..`; every other
        // directory does (written by `mkdir`). `n` is the requested index
        // counting the synthetic `.`/`..` at 0/1, so the number of live
        // physical entries to skip before the target is `n - 2` for root
        // and `n` for everything else.
        let mut skip = if dir == ROOT_INODE { n - 2 } else { n };

        let bytes = self.read_whole_directory(dir)?;
        let mut pos = 0usize;
        let mut pending_long: Vec<LongNameEntry> = Vec::new();

        loop {
            if pos + dirent::ENTRY_SIZE > bytes.len() {
                return Ok(None);
            }
            let raw: [u8; dirent::ENTRY_SIZE] = bytes[pos..pos + dirent::ENTRY_SIZE].try_into().unwrap();

            match dirent::marker(&raw) {
                EntryMarker::EndOfDirectory => return Ok(None),
                EntryMarker::Deleted => {
                    pending_long.clear();
                    pos += dirent::ENTRY_SIZE;
                }
                EntryMarker::LongName => {
                    pending_long.push(LongNameEntry::decode(&raw));
                    pos += dirent::ENTRY_SIZE;
                }
                EntryMarker::Short => {
                    let short = ShortEntry::decode(&raw);
                    if skip == 0 {
                        let name = if !pending_long.is_empty() {
                            let expected = pending_long[0].checksum;
                            let actual = dirent::short_name_checksum(&short.short_name_bytes());
                            if actual == expected {
                                dirent::decode_long_name(&pending_long)
                            } else {
                                warn!(
                                    "long-name checksum mismatch in directory {dir} (expected {expected:#04x}, got {actual:#04x}); falling back to the short name"
                                );
                                dirent::display_short_name(&short.name, &short.ext, short.is_dir())
                            }
                        } else {
                            dirent::display_short_name(&short.name, &short.ext, short.is_dir())
                        };

                        let (atime, ctime, mtime) = decode_entry_times(&short);
                        let record = InodeRecord {
                            parent: dir as i64,
                            attributes: short.attributes,
                            first_cluster: short.cluster(),
                            size: short.size,
                            atime,
                            ctime,
                            mtime,
                        };
                        let handle = self.inodes.register(record);
                        return Ok(Some(DirListing { name, inode: handle }));
                    }
                    skip -= 1;
                    pending_long.clear();
                    pos += dirent::ENTRY_SIZE;
                }
            }
        }
    }

    /// `link(fs, INODE child, INODE dir, name) -> 0|err`.
    pub fn link(&mut self, child: Inode, dir: Inode, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(FsError::InvalidArgument("name must not be empty"));
        }
        let dir_record = self.inodes.get(dir)?.clone();
        if !dir_record.is_dir() {
            return Err(FsError::NotADirectory);
        }

        let is_dot = name == "." || name == "..";
        if !is_dot {
            if let Ok(record) = self.inodes.get_mut(child) {
                record.parent = dir as i64;
            }
        }

        let child_record = self.inodes.get(child)?.clone();

        let short_name = if is_dot {
            let mut raw = [b' '; 11];
            raw[0] = b'.';
            if name == ".." {
                raw[1] = b'.';
            }
            raw
        } else {
            let existing = self.collect_short_names(dir)?;
            dirent::derive_short_name(name, &existing)
        };

        let mut raw_entries: Vec<[u8; dirent::ENTRY_SIZE]> = Vec::new();
        if !is_dot {
            let checksum = dirent::short_name_checksum(&short_name);
            for long in dirent::encode_long_name(name, checksum) {
                raw_entries.push(long.encode());
            }
        }

        let (cy, cm, cd, ch, cmi, cs) = fstime::epoch_to_utc(child_record.ctime);
        let (ay, am, ad, _, _, _) = fstime::epoch_to_utc(child_record.atime);
        let (my, mm, md, mh, mmi, ms) = fstime::epoch_to_utc(child_record.mtime);

        let mut short = ShortEntry {
            name: short_name[0..8].try_into().unwrap(),
            ext: short_name[8..11].try_into().unwrap(),
            attributes: child_record.attributes,
            creation_time_tenths: 0,
            ctime: dirent::pack_time(ch, cmi, cs),
            cdate: dirent::pack_date(cy, cm, cd),
            adate: dirent::pack_date(ay, am, ad),
            cluster_high: 0,
            mtime: dirent::pack_time(mh, mmi, ms),
            mdate: dirent::pack_date(my, mm, md),
            cluster_low: 0,
            size: child_record.size,
        };
        short.set_cluster(child_record.first_cluster);
        raw_entries.push(short.encode());

        self.insert_entries(dir, &raw_entries)?;
        Ok(())
    }

    /// `unlink(fs, INODE dir, index) -> 0|err`.
    pub fn unlink(&mut self, dir: Inode, n: u32) -> Result<()> {
        if n < 2 {
            return Err(FsError::InvalidArgument("unlink requires index >= 2"));
        }
        let target = self.readdir(dir, n)?.ok_or(FsError::NotFound)?.inode;

        let mut skip = if dir == ROOT_INODE { n - 2 } else { n };
        let mut bytes = self.read_whole_directory(dir)?;
        let mut pos = 0usize;
        let mut long_chain_start: Option<usize> = None;

        loop {
            if pos + dirent::ENTRY_SIZE > bytes.len() {
                return Err(FsError::NotFound);
            }
            let raw: [u8; dirent::ENTRY_SIZE] = bytes[pos..pos + dirent::ENTRY_SIZE].try_into().unwrap();

            match dirent::marker(&raw) {
                EntryMarker::EndOfDirectory => return Err(FsError::NotFound),
                EntryMarker::Deleted => {
                    long_chain_start = None;
                    pos += dirent::ENTRY_SIZE;
                }
                EntryMarker::LongName => {
                    if long_chain_start.is_none() {
                        long_chain_start = Some(pos);
                    }
                    pos += dirent::ENTRY_SIZE;
                }
                EntryMarker::Short => {
                    if skip == 0 {
                        let range_start = long_chain_start.unwrap_or(pos);
                        let range_end = pos + dirent::ENTRY_SIZE;

                        let mut compacted = Vec::with_capacity(bytes.len());
                        compacted.extend_from_slice(&bytes[..range_start]);
                        compacted.extend_from_slice(&bytes[range_end..]);
                        compacted.resize(bytes.len(), 0);
                        bytes = compacted;

                        self.write_whole_directory(dir, &bytes)?;

                        let target_record = self.inodes.get(target)?.clone();
                        if target_record.first_cluster != 0 {
                            self.fat.release_chain(target_record.first_cluster);
                        }
                        return Ok(());
                    }
                    skip -= 1;
                    long_chain_start = None;
                    pos += dirent::ENTRY_SIZE;
                }
            }
        }
    }

    /// `fstat(fs, INODE) -> {size, mode, atime, ctime, mtime}`.
    pub fn fstat(&self, ino: Inode) -> Result<Fstat> {
        let record = self.inodes.get(ino)?;
        let mode = (if record.is_dir() { types::S_DIR } else { 0 }) | types::DEFAULT_PERM_BITS;
        Ok(Fstat { size: record.size as u64, mode, atime: record.atime, ctime: record.ctime, mtime: record.mtime })
    }

    /// `mkdir(fs, INODE parent, name) -> 0|err`.
    pub fn mkdir(&mut self, parent: Inode, name: &str) -> Result<()> {
        let child = self.touch(NewFile { size: 0, directory: true })?;
        self.link(child, parent, name)?;

        let record = self.inodes.get(child)?.clone();
        let zero = cluster_io::scratch_buffer(&self.bpb, 1);
        cluster_io::write_clusters(&mut self.device, &self.bpb, record.first_cluster, 1, &zero)?;

        self.link(child, child, ".")?;
        self.link(parent, child, "..")?;
        Ok(())
    }

    /// `rmdir(fs, INODE dir, index) -> 0|err`.
    pub fn rmdir(&mut self, dir: Inode, n: u32) -> Result<()> {
        let target = self.readdir(dir, n)?.ok_or(FsError::NotFound)?.inode;
        if self.readdir(target, 2)?.is_some() {
            return Err(FsError::NotEmpty);
        }
        self.unlink(dir, n)
    }

    // ---- directory storage helpers ----------------------------------------

    fn read_whole_directory(&mut self, dir: Inode) -> Result<Vec<u8>> {
        if dir == ROOT_INODE {
            let mut buf = vec![0u8; self.bpb.root_sectors() as usize * SECTOR_SIZE];
            cluster_io::read_root_region(&mut self.device, &self.bpb, &mut buf)?;
            Ok(buf)
        } else {
            let record = self.inodes.get(dir)?.clone();
            if !record.is_dir() {
                return Err(FsError::NotADirectory);
            }
            let chain = self.fat.chain(record.first_cluster);
            let cs = self.bpb.cluster_size() as usize;
            let mut buf = vec![0u8; chain.len() * cs];
            for (i, &c) in chain.iter().enumerate() {
                cluster_io::read_clusters(&mut self.device, &self.bpb, c, 1, &mut buf[i * cs..(i + 1) * cs])?;
            }
            Ok(buf)
        }
    }

    fn write_whole_directory(&mut self, dir: Inode, bytes: &[u8]) -> Result<()> {
        if dir == ROOT_INODE {
            cluster_io::write_root_region(&mut self.device, &self.bpb, bytes)
        } else {
            let record = self.inodes.get(dir)?.clone();
            let chain = self.fat.chain(record.first_cluster);
            let cs = self.bpb.cluster_size() as usize;
            for (i, &c) in chain.iter().enumerate() {
                cluster_io::write_clusters(&mut self.device, &self.bpb, c, 1, &bytes[i * cs..(i + 1) * cs])?;
            }
            Ok(())
        }
    }

    fn grow_directory(&mut self, dir: Inode) -> Result<()> {
        if dir == ROOT_INODE {
            return Err(FsError::NoSpace);
        }
        let record = self.inodes.get(dir)?.clone();
        let chain = self.fat.chain(record.first_cluster);
        let tail = *chain.last().expect("a directory's chain is never empty");
        self.fat.grow_chain(tail)?;
        Ok(())
    }

    /// Scans `dir` for every currently-stamped short name, so a new entry
    /// can be disambiguated against them.
    fn collect_short_names(&mut self, dir: Inode) -> Result<Vec<[u8; 11]>> {
        let bytes = self.read_whole_directory(dir)?;
        let mut names = Vec::new();
        let mut pos = 0usize;
        while pos + dirent::ENTRY_SIZE <= bytes.len() {
            let raw: [u8; dirent::ENTRY_SIZE] = bytes[pos..pos + dirent::ENTRY_SIZE].try_into().unwrap();
            match dirent::marker(&raw) {
                EntryMarker::EndOfDirectory => break,
                EntryMarker::Short => names.push(ShortEntry::decode(&raw).short_name_bytes()),
                _ => {}
            }
            pos += dirent::ENTRY_SIZE;
        }
        Ok(names)
    }

    /// Finds a contiguous run of deleted/unused slots big enough for
    /// `entries`, growing the directory by one cluster if none exists,
    /// then writes `entries` into that run.
    fn insert_entries(&mut self, dir: Inode, entries: &[[u8; dirent::ENTRY_SIZE]]) -> Result<()> {
        let needed = entries.len() * dirent::ENTRY_SIZE;

        loop {
            let mut bytes = self.read_whole_directory(dir)?;
            if let Some(offset) = find_free_run(&bytes, needed) {
                for (i, entry) in entries.iter().enumerate() {
                    bytes[offset + i * dirent::ENTRY_SIZE..offset + (i + 1) * dirent::ENTRY_SIZE].copy_from_slice(entry);
                }
                self.write_whole_directory(dir, &bytes)?;
                return Ok(());
            }

            warn!("directory {dir} has no room for {} new entries, growing by one cluster", entries.len());
            self.grow_directory(dir)?;
        }
    }
}

/// Finds an offset within `bytes` where `needed` consecutive bytes are
/// either deleted entries or past the current end-of-directory marker.
fn find_free_run(bytes: &[u8], needed: usize) -> Option<usize> {
    let n = needed / dirent::ENTRY_SIZE;
    let mut run_start = 0usize;
    let mut run_len = 0usize;
    let mut pos = 0usize;

    while pos + dirent::ENTRY_SIZE <= bytes.len() {
        let raw: [u8; dirent::ENTRY_SIZE] = bytes[pos..pos + dirent::ENTRY_SIZE].try_into().unwrap();
        match dirent::marker(&raw) {
            EntryMarker::Deleted => {
                if run_len == 0 {
                    run_start = pos;
                }
                run_len += 1;
            }
            EntryMarker::EndOfDirectory => {
                // Everything from here to the end of the cluster buffer is
                // free (will be re-zeroed / re-terminated by the write).
                if run_len == 0 {
                    run_start = pos;
                }
                run_len += (bytes.len() - pos) / dirent::ENTRY_SIZE;
                break;
            }
            EntryMarker::LongName | EntryMarker::Short => {
                run_len = 0;
            }
        }
        if run_len >= n {
            return Some(run_start);
        }
        pos += dirent::ENTRY_SIZE;
    }

    if run_len >= n {
        Some(run_start)
    } else {
        None
    }
}

fn decode_entry_times(short: &ShortEntry) -> (i64, i64, i64) {
    let (cy, cm, cd) = dirent::unpack_date(short.cdate);
    let (ch, cmi, cs) = dirent::unpack_time(short.ctime);
    let ctime = fstime::utc_to_epoch(cy, cm, cd, ch, cmi, cs);

    let (ay, am, ad) = dirent::unpack_date(short.adate);
    let atime = fstime::utc_to_epoch(ay, am, ad, 0, 0, 0);

    let (my, mm, md) = dirent::unpack_date(short.mdate);
    let (mh, mmi, ms) = dirent::unpack_time(short.mtime);
    let mtime = fstime::utc_to_epoch(my, mm, md, mh, mmi, ms);

    (atime, ctime, mtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemoryDevice;

    fn small_volume() -> FatFilesystem<MemoryDevice> {
        let device = MemoryDevice::zeroed(2880);
        FatFilesystem::create(device, 2880, 2, 224).unwrap()
    }

    #[test]
    fn find_free_run_locates_a_gap_between_live_entries() {
        let mut bytes = vec![0u8; dirent::ENTRY_SIZE * 4];
        bytes[0] = b'A'; // live short entry in slot 0
        bytes[dirent::ENTRY_SIZE] = 0xE5; // deleted, slot 1
        bytes[dirent::ENTRY_SIZE * 3] = b'B'; // live short entry in slot 3
        let offset = find_free_run(&bytes, dirent::ENTRY_SIZE).unwrap();
        assert_eq!(offset, dirent::ENTRY_SIZE);
    }

    #[test]
    fn find_free_run_treats_end_of_directory_as_free() {
        let mut bytes = vec![0u8; dirent::ENTRY_SIZE * 3];
        bytes[0] = b'A'; // live entry, slot 0; slots 1-2 are zeroed (end-of-directory)
        let offset = find_free_run(&bytes, dirent::ENTRY_SIZE * 2).unwrap();
        assert_eq!(offset, dirent::ENTRY_SIZE);
    }

    #[test]
    fn find_free_run_returns_none_when_nothing_fits() {
        let mut bytes = vec![b'A'; dirent::ENTRY_SIZE * 2];
        bytes[dirent::ENTRY_SIZE] = b'B';
        assert!(find_free_run(&bytes, dirent::ENTRY_SIZE * 2).is_none());
    }

    #[test]
    fn grow_directory_refuses_to_grow_the_root() {
        let mut fs = small_volume();
        assert!(matches!(fs.grow_directory(ROOT_INODE), Err(FsError::NoSpace)));
    }

    #[test]
    fn readdir_falls_back_to_the_short_name_on_checksum_mismatch() {
        let mut fs = small_volume();
        let ino = fs.touch(NewFile { size: 0, directory: false }).unwrap();
        fs.link(ino, ROOT_INODE, "longname.txt").unwrap();

        // Corrupt the stamped checksum on the lone long-name entry so it no
        // longer matches the short entry that follows it.
        let mut bytes = fs.read_whole_directory(ROOT_INODE).unwrap();
        bytes[13] = bytes[13].wrapping_add(1);
        fs.write_whole_directory(ROOT_INODE, &bytes).unwrap();

        let entry = fs.readdir(ROOT_INODE, 2).unwrap().unwrap();
        assert_eq!(entry.name, "LONGNAME.TXT", "must fall back to the short name, not the untrusted long one");
    }

    #[test]
    fn readdir_trusts_the_long_name_when_the_checksum_matches() {
        let mut fs = small_volume();
        let ino = fs.touch(NewFile { size: 0, directory: false }).unwrap();
        fs.link(ino, ROOT_INODE, "longname.txt").unwrap();

        let entry = fs.readdir(ROOT_INODE, 2).unwrap().unwrap();
        assert_eq!(entry.name, "longname.txt");
    }
}
