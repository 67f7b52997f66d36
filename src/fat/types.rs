//! Shared cluster/attribute vocabulary for the FAT12 driver.

/// A cluster index. `0` and `1` are reserved; valid data clusters start at 2.
pub type Cluster = u32;

/// A block (sector) index, relative to the start of the partition.
pub type Sector = u64;

/// Inode handle: an opaque positive integer assigned by the inode registry.
/// `1` is reserved for the root directory.
pub type Inode = u32;

pub const ROOT_INODE: Inode = 1;

/// `parent` sentinel for a freshly `touch`-ed inode that hasn't been `link`ed
/// into a directory yet.
pub const PARENT_UNKNOWN: i64 = -1;

/// Directory-entry attribute bits (offset 11 of a short entry).
pub mod attr {
    pub const READ_ONLY: u8 = 0x01;
    pub const HIDDEN: u8 = 0x02;
    pub const SYSTEM: u8 = 0x04;
    pub const VOLUME_ID: u8 = 0x08;
    pub const DIRECTORY: u8 = 0x10;
    pub const ARCHIVE: u8 = 0x20;
    /// Long-name entries are tagged with all four of read-only/hidden/
    /// system/volume-id set.
    pub const LONG_NAME: u8 = READ_ONLY | HIDDEN | SYSTEM | VOLUME_ID;
}

/// Directory-entry first-name-byte sentinels.
pub mod dirent_marker {
    pub const END_OF_DIRECTORY: u8 = 0x00;
    pub const DELETED: u8 = 0xE5;
    /// `0x05` stands in for a leading `0xE5` in a Japanese-encoding short
    /// name; not otherwise special-cased by this driver since it only emits
    /// ASCII short names, but recognized on read.
    pub const KANJI_E5_ESCAPE: u8 = 0x05;
}

/// `fstat` mode bits: directory bit plus a fixed 0777.
pub const S_DIR: u32 = 0o040000;
pub const DEFAULT_PERM_BITS: u32 = 0o777;
