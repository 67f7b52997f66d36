//! End-to-end exercise of the lifecycle and façade operations against an
//! in-memory device: format, mount, create a file and a directory, write
//! and read back, remove, and confirm the on-disk state survives a close
//! and reload.

use fatimg::block::MemoryDevice;
use fatimg::fat::types::ROOT_INODE;
use fatimg::{FatFilesystem, NewFile};

const TOTAL_SECTORS: u32 = 2880;

#[test]
fn touch_link_write_read_round_trips_through_close_and_reload() {
    let device = MemoryDevice::zeroed(TOTAL_SECTORS as u64);
    let mut fs = FatFilesystem::create(device, TOTAL_SECTORS, 2, 224).unwrap();

    let payload = b"hello from a freshly formatted floppy image";
    let ino = fs.touch(NewFile { size: payload.len() as u32, directory: false }).unwrap();
    fs.link(ino, ROOT_INODE, "hello.txt").unwrap();
    fs.write(ino, payload, payload.len(), 0).unwrap();

    let stat = fs.fstat(ino).unwrap();
    assert_eq!(stat.size, payload.len() as u64);

    let mut readback = vec![0u8; payload.len()];
    let n = fs.read(ino, &mut readback, readback.len(), 0).unwrap();
    assert_eq!(n, payload.len());
    assert_eq!(&readback, payload);

    let device = fs.into_device().unwrap();

    let mut fs = FatFilesystem::load(device).unwrap();
    let entry = fs.readdir(ROOT_INODE, 2).unwrap().expect("one entry beyond . and ..");
    assert_eq!(entry.name, "hello.txt");

    let mut readback = vec![0u8; payload.len()];
    let n = fs.read(entry.inode, &mut readback, readback.len(), 0).unwrap();
    assert_eq!(n, payload.len());
    assert_eq!(&readback, payload);
}

#[test]
fn mkdir_creates_dot_and_dotdot_and_rmdir_refuses_nonempty() {
    let device = MemoryDevice::zeroed(TOTAL_SECTORS as u64);
    let mut fs = FatFilesystem::create(device, TOTAL_SECTORS, 2, 224).unwrap();

    fs.mkdir(ROOT_INODE, "subdir").unwrap();
    let entry = fs.readdir(ROOT_INODE, 2).unwrap().unwrap();
    assert_eq!(entry.name, "subdir");
    let subdir = entry.inode;

    let dot = fs.readdir(subdir, 0).unwrap().unwrap();
    assert_eq!(dot.name, ".");
    assert_eq!(dot.inode, subdir);

    let dotdot = fs.readdir(subdir, 1).unwrap().unwrap();
    assert_eq!(dotdot.name, "..");
    assert_eq!(dotdot.inode, ROOT_INODE);

    assert!(fs.readdir(subdir, 2).unwrap().is_none());

    let file = fs.touch(NewFile { size: 10, directory: false }).unwrap();
    fs.link(file, subdir, "inner.txt").unwrap();
    assert!(fs.rmdir(ROOT_INODE, 2).is_err(), "rmdir must refuse a non-empty directory");

    fs.unlink(subdir, 2).unwrap();
    fs.rmdir(ROOT_INODE, 2).unwrap();
    assert!(fs.readdir(ROOT_INODE, 2).unwrap().is_none());
}

#[test]
fn unlink_reclaims_the_clusters_of_the_removed_file() {
    let device = MemoryDevice::zeroed(TOTAL_SECTORS as u64);
    let mut fs = FatFilesystem::create(device, TOTAL_SECTORS, 2, 224).unwrap();

    let big = fs.touch(NewFile { size: 8192, directory: false }).unwrap();
    fs.link(big, ROOT_INODE, "big.bin").unwrap();
    fs.unlink(ROOT_INODE, 2).unwrap();

    // Touching a file of the same size again must succeed, proving the
    // clusters freed by unlink were returned to the allocator.
    let again = fs.touch(NewFile { size: 8192, directory: false });
    assert!(again.is_ok());
}

#[test]
fn directory_grows_by_a_cluster_once_its_entries_overflow_one() {
    let device = MemoryDevice::zeroed(TOTAL_SECTORS as u64);
    let mut fs = FatFilesystem::create(device, TOTAL_SECTORS, 2, 224).unwrap();

    fs.mkdir(ROOT_INODE, "packed").unwrap();
    let dir = fs.readdir(ROOT_INODE, 2).unwrap().unwrap().inode;

    // One cluster is 1024 bytes / 32-byte entries = 32 slots; `.`/`..`
    // occupy 2 of them, and each short-named file below consumes a
    // long-name plus short-name pair (2 slots), so the 16th file cannot
    // fit without the directory growing by a second cluster.
    for i in 0..16 {
        let file = fs.touch(NewFile { size: 0, directory: false }).unwrap();
        fs.link(file, dir, &format!("f{i}.txt")).unwrap();
    }

    let mut names = Vec::new();
    let mut n = 2;
    while let Some(entry) = fs.readdir(dir, n).unwrap() {
        names.push(entry.name);
        n += 1;
    }
    assert_eq!(names.len(), 16, "all 16 entries must survive the directory growing by a cluster");
    assert!(names.contains(&"f15.txt".to_string()));
}

#[test]
fn unlinking_first_middle_and_last_entries_shifts_remaining_indices() {
    let device = MemoryDevice::zeroed(TOTAL_SECTORS as u64);
    let mut fs = FatFilesystem::create(device, TOTAL_SECTORS, 2, 224).unwrap();

    for name in ["a.txt", "b.txt", "c.txt"] {
        let ino = fs.touch(NewFile { size: 0, directory: false }).unwrap();
        fs.link(ino, ROOT_INODE, name).unwrap();
    }

    // Deleting the middle entry (b.txt, index 3) must shift c.txt down to
    // index 3 while leaving a.txt at index 2 untouched.
    fs.unlink(ROOT_INODE, 3).unwrap();
    assert_eq!(fs.readdir(ROOT_INODE, 2).unwrap().unwrap().name, "a.txt");
    assert_eq!(fs.readdir(ROOT_INODE, 3).unwrap().unwrap().name, "c.txt");
    assert!(fs.readdir(ROOT_INODE, 4).unwrap().is_none());

    // Deleting the (now) first entry, a.txt, shifts c.txt down to index 2.
    fs.unlink(ROOT_INODE, 2).unwrap();
    assert_eq!(fs.readdir(ROOT_INODE, 2).unwrap().unwrap().name, "c.txt");
    assert!(fs.readdir(ROOT_INODE, 3).unwrap().is_none());

    // Deleting the last remaining entry empties the directory.
    fs.unlink(ROOT_INODE, 2).unwrap();
    assert!(fs.readdir(ROOT_INODE, 2).unwrap().is_none());
}

#[test]
fn read_write_round_trip_at_cluster_size_boundaries() {
    let device = MemoryDevice::zeroed(TOTAL_SECTORS as u64);
    let mut fs = FatFilesystem::create(device, TOTAL_SECTORS, 2, 224).unwrap();

    // This geometry's cluster size is 1024 bytes (512-byte sectors, 2
    // sectors per cluster); exercise one cluster short of full, exactly
    // full, and one cluster over.
    for (i, size) in [1023usize, 1024, 1025].into_iter().enumerate() {
        let payload: Vec<u8> = (0..size).map(|b| (b % 251) as u8).collect();
        let ino = fs.touch(NewFile { size: size as u32, directory: false }).unwrap();
        fs.link(ino, ROOT_INODE, &format!("bound{i}.bin")).unwrap();
        fs.write(ino, &payload, payload.len(), 0).unwrap();

        let mut readback = vec![0u8; size];
        let n = fs.read(ino, &mut readback, readback.len(), 0).unwrap();
        assert_eq!(n, size);
        assert_eq!(readback, payload, "size {size} must round-trip exactly");
    }
}

#[test]
fn short_name_collisions_disambiguate_with_a_tilde_suffix() {
    let device = MemoryDevice::zeroed(TOTAL_SECTORS as u64);
    let mut fs = FatFilesystem::create(device, TOTAL_SECTORS, 2, 224).unwrap();

    let a = fs.touch(NewFile { size: 0, directory: false }).unwrap();
    fs.link(a, ROOT_INODE, "longfilename.txt").unwrap();
    let b = fs.touch(NewFile { size: 0, directory: false }).unwrap();
    fs.link(b, ROOT_INODE, "longfilename-two.txt").unwrap();

    let first = fs.readdir(ROOT_INODE, 2).unwrap().unwrap();
    let second = fs.readdir(ROOT_INODE, 3).unwrap().unwrap();
    assert_eq!(first.name, "longfilename.txt");
    assert_eq!(second.name, "longfilename-two.txt");
}
