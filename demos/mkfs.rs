//! Formats a zero-filled disk image as a bare FAT12 volume with an empty
//! root directory (no partition table — the whole image is the volume).
//!
//! ```text
//! cargo run --example mkfs -- <path> <total-sectors>
//! ```

use std::env;
use std::process::ExitCode;

use fatimg::block::FileBackedDevice;
use fatimg::FatFilesystem;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args().skip(1);
    let (Some(path), Some(total_sectors)) = (args.next(), args.next()) else {
        eprintln!("usage: mkfs <path> <total-sectors>");
        return ExitCode::FAILURE;
    };
    let total_sectors: u32 = match total_sectors.parse() {
        Ok(n) => n,
        Err(e) => {
            eprintln!("invalid sector count: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = (|| -> fatimg::Result<()> {
        let device = FileBackedDevice::create(&path, total_sectors as u64)?;
        let fs = FatFilesystem::create(device, total_sectors, 2, 224)?;
        fs.close()
    })();

    match result {
        Ok(()) => {
            println!("formatted {path} as a {total_sectors}-sector FAT12 volume");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("mkfs failed: {e}");
            ExitCode::FAILURE
        }
    }
}
