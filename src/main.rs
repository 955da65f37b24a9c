//! fatmod command-line frontend
//!
//! One invocation performs one operation and exits. Exit code is 1 only
//! when the image cannot be opened or its boot sector cannot be read;
//! every other failure prints a single line and exits 0.

use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use std::process::exit;

use fatmod::{FatError, ReadMode, Volume};

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    exit(run(&args));
}

fn run(args: &[String]) -> i32 {
    if args.len() == 1 && args[0] == "-h" {
        print_help();
        return 0;
    }
    if args.len() < 2 {
        return invalid_args();
    }

    let disk = &args[0];
    match args[1].as_str() {
        "-l" if args.len() == 2 => with_volume(disk, |volume| {
            volume.list(&mut io::stdout())?;
            Ok(None)
        }),
        "-c" if args.len() == 3 => with_volume(disk, |volume| {
            volume.create(&args[2])?;
            Ok(Some("File created successfully!"))
        }),
        "-w" if args.len() == 6 => {
            let (Ok(offset), Ok(length), Ok(fill)) = (
                args[3].parse::<u64>(),
                args[4].parse::<u64>(),
                args[5].parse::<u8>(),
            ) else {
                return invalid_args();
            };
            with_volume(disk, |volume| {
                volume.write(&args[2], offset, length, fill)?;
                Ok(Some("Bytes written to the file successfully!"))
            })
        }
        "-r" if args.len() == 4 => {
            let mode = match args[2].as_str() {
                "-b" => ReadMode::Binary,
                "-a" => ReadMode::Ascii,
                _ => return invalid_args(),
            };
            with_volume(disk, |volume| {
                volume.read(&args[3], mode, &mut io::stdout())?;
                Ok(Some("Succesfully read!")) // sic
            })
        }
        "-d" if args.len() == 3 => with_volume(disk, |volume| {
            volume.delete(&args[2])?;
            Ok(Some("File deleted successfully!"))
        }),
        _ => invalid_args(),
    }
}

/// Open the image, run one operation, report its outcome.
///
/// The file handle is released on every path out of here.
fn with_volume<F>(path: &str, operation: F) -> i32
where
    F: FnOnce(&mut Volume<File>) -> Result<Option<&'static str>, FatError>,
{
    let file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => file,
        Err(e) => {
            println!("{}", FatError::IoOpen(e));
            return 1;
        }
    };

    let mut volume = match Volume::open(file, &mut io::stdout()) {
        Ok(volume) => volume,
        Err(e) => {
            println!("{}", e);
            return 1;
        }
    };

    match operation(&mut volume) {
        Ok(Some(message)) => {
            println!("{}", message);
            0
        }
        Ok(None) => 0,
        Err(e) => {
            println!("{}", e);
            0
        }
    }
}

fn invalid_args() -> i32 {
    println!("Invalid arguments. Please enter -h for help");
    0
}

fn print_help() {
    println!("fatmod - raw FAT32 disk image editor");
    println!();
    println!("Usage:");
    println!("  fatmod -h");
    println!("  fatmod <DISK> -l                                  list the root directory");
    println!("  fatmod <DISK> -c <NAME>                           create an empty file");
    println!("  fatmod <DISK> -w <NAME> <OFFSET> <LENGTH> <BYTE>  fill a byte range");
    println!("  fatmod <DISK> -r -b <NAME>                        dump file content in hex");
    println!("  fatmod <DISK> -r -a <NAME>                        dump file content as text");
    println!("  fatmod <DISK> -d <NAME>                           delete a file");
    println!();
    println!("Names use the 8.3 form: up to 8 characters, a dot, up to 3 more,");
    println!("drawn from A-Z 0-9 _ -");
}
