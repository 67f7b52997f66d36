//! Benchmarks the cluster read/write hot path against an in-memory device,
//! isolating the windowing and bit-packing logic from real storage latency.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fatimg::block::MemoryDevice;
use fatimg::{FatFilesystem, NewFile};

const TOTAL_SECTORS: u32 = 2880;

fn format_volume() -> FatFilesystem<MemoryDevice> {
    let device = MemoryDevice::zeroed(TOTAL_SECTORS as u64);
    FatFilesystem::create(device, TOTAL_SECTORS, 2, 224).unwrap()
}

fn bench_touch_and_link(c: &mut Criterion) {
    c.bench_function("touch_and_link_small_file", |b| {
        b.iter(|| {
            let mut fs = format_volume();
            let ino = fs.touch(NewFile { size: 512, directory: false }).unwrap();
            fs.link(ino, 1, "bench.txt").unwrap();
            black_box(ino);
        })
    });
}

fn bench_write_then_read(c: &mut Criterion) {
    let mut fs = format_volume();
    let ino = fs.touch(NewFile { size: 4096, directory: false }).unwrap();
    fs.link(ino, 1, "payload.bin").unwrap();
    let payload = vec![0xAAu8; 4096];

    c.bench_function("write_4096_bytes", |b| {
        b.iter(|| {
            fs.write(ino, black_box(&payload), payload.len(), 0).unwrap();
        })
    });

    let mut readback = vec![0u8; 4096];
    c.bench_function("read_4096_bytes", |b| {
        b.iter(|| {
            fs.read(ino, black_box(&mut readback), readback.len(), 0).unwrap();
        })
    });
}

criterion_group!(benches, bench_touch_and_link, bench_write_then_read);
criterion_main!(benches);
