//! Command-line driver for the FAT image interpreter.
//!
//! Mirrors the classic inspection flags: print the reserved region, the
//! root listing, the detected variant, the computed geometry or the whole
//! FAT; read a file out of the image or write stdin into a new one.

use std::env;
use std::io::{self, Write};
use std::process;

use chrono::{Datelike, Timelike};

use fatlook::fat::bpb::Bpb;
use fatlook::{
    parse_volume, Error, FatType, FatVolume, FileImage, ImageDevice, TimeSource, Timestamp,
    WalkStep,
};

type CliError = Error<std::io::Error>;

#[derive(Debug, Default)]
struct Flags {
    print_reserved: bool,
    print_root: bool,
    print_type: bool,
    print_info: bool,
    print_fat: bool,
    read_name: Option<String>,
    write_name: Option<String>,
    image_path: Option<String>,
}

impl Flags {
    fn any_action(&self) -> bool {
        self.print_reserved
            || self.print_root
            || self.print_type
            || self.print_info
            || self.print_fat
            || self.read_name.is_some()
            || self.write_name.is_some()
    }
}

fn usage(program: &str) {
    eprintln!(
        "usage: {} [-r] [-d] [-t] [-i] [-a] [-f NAME] [-w NAME] IMAGE",
        program
    );
    eprintln!("  -r       print the reserved region");
    eprintln!("  -d       print the root directory listing");
    eprintln!("  -t       print the detected FAT type");
    eprintln!("  -i       print the computed geometry");
    eprintln!("  -a       print every FAT entry");
    eprintln!("  -f NAME  write the named file's content to stdout");
    eprintln!("  -w NAME  write stdin to a new file with the given name");
}

fn parse_flags<I>(mut args: I) -> Option<Flags>
where
    I: Iterator<Item = String>,
{
    let mut flags = Flags::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" => return None,
            "-r" => flags.print_reserved = true,
            "-d" => flags.print_root = true,
            "-t" => flags.print_type = true,
            "-i" => flags.print_info = true,
            "-a" => flags.print_fat = true,
            "-f" => flags.read_name = Some(args.next()?),
            "-w" => flags.write_name = Some(args.next()?),
            _ if arg.starts_with('-') => return None,
            _ => flags.image_path = Some(arg),
        }
    }
    if flags.image_path.is_none() || !flags.any_action() {
        return None;
    }
    Some(flags)
}

/// Wall-clock time for the entries the write path creates.
struct Clock;

impl TimeSource for Clock {
    fn get_timestamp(&self) -> Timestamp {
        let local: chrono::DateTime<chrono::Local> = chrono::Local::now();
        Timestamp {
            year_since_1970: (local.year() - 1970) as u8,
            zero_indexed_month: local.month0() as u8,
            zero_indexed_day: local.day0() as u8,
            hours: local.hour() as u8,
            minutes: local.minute() as u8,
            seconds: local.second() as u8,
        }
    }
}

fn main() {
    env_logger::init();

    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "fatlook".to_string());
    let flags = match parse_flags(args) {
        Some(flags) => flags,
        None => {
            usage(&program);
            process::exit(1);
        }
    };

    if let Err(e) = run(&flags) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(flags: &Flags) -> Result<(), CliError> {
    // The path is checked during flag parsing.
    let path = flags.image_path.as_deref().unwrap();
    let mut image = if flags.write_name.is_some() {
        FileImage::open_rw(path)
    } else {
        FileImage::open(path)
    }
    .map_err(Error::DeviceError)?;

    let volume = parse_volume(&mut image)?;

    if flags.print_reserved {
        print_reserved(&mut image, &volume)?;
    }
    if flags.print_root {
        print_root(&mut image, &volume)?;
    }
    if flags.print_type {
        println!("{}", volume.fat_type());
    }
    if flags.print_info {
        print_info(&volume);
    }
    if flags.print_fat {
        print_fat(&mut image, &volume)?;
    }
    if let Some(name) = &flags.read_name {
        cat_file(&mut image, &volume, name)?;
    }
    if let Some(name) = &flags.write_name {
        let stdin = io::stdin();
        volume.write_file(&mut image, &Clock, name, &mut stdin.lock())?;
    }
    Ok(())
}

fn print_reserved(image: &mut FileImage, volume: &FatVolume) -> Result<(), CliError> {
    let mut sector = [0u8; Bpb::LEN];
    image.read_at(0, &mut sector).map_err(Error::DeviceError)?;
    let bpb = Bpb::create_from_bytes(&sector);

    println!("reserved region:");
    println!("  jump boot: {:02x?}", bpb.jump_boot());
    println!("  oem name: \"{}\"", String::from_utf8_lossy(bpb.oem_name()));
    println!("  bytes per sector: {}", bpb.bytes_per_sector());
    println!("  sectors per cluster: {}", bpb.sectors_per_cluster());
    println!("  reserved sectors: {}", bpb.reserved_sector_count());
    println!("  FATs: {}", bpb.num_fats());
    println!("  root entries: {}", bpb.root_entry_count());
    println!("  total sectors (16): {}", bpb.total_sectors16());
    println!("  media: {:#04x}", bpb.media());
    println!("  sectors per FAT (16): {}", bpb.fat_size16());
    println!("  sectors per track: {}", bpb.sectors_per_track());
    println!("  heads: {}", bpb.num_heads());
    println!("  hidden sectors: {}", bpb.hidden_sectors());
    println!("  total sectors (32): {}", bpb.total_sectors32());

    match volume.fat_type() {
        FatType::Fat12 | FatType::Fat16 => {
            println!("ext 12/16:");
            println!("  drive number: {:#04x}", bpb.drive_number());
            println!("  boot signature: {:#04x}", bpb.boot_signature());
            println!("  volume id: {:#010x}", bpb.volume_id());
            println!(
                "  volume label: \"{}\"",
                String::from_utf8_lossy(bpb.volume_label())
            );
            println!("  fs type: \"{}\"", String::from_utf8_lossy(bpb.fs_type()));
        }
        FatType::Fat32 => {
            println!("ext 32:");
            println!("  sectors per FAT (32): {}", bpb.fat_size32());
            println!("  ext flags: {:#06x}", bpb.ext_flags());
            println!("  fs version: {:#06x}", bpb.fs_version());
            println!("  root cluster: {}", bpb.root_cluster());
            println!("  FSInfo sector: {}", bpb.fs_info_sector());
            println!("  backup boot sector: {}", bpb.backup_boot_sector());
            println!("  drive number: {:#04x}", bpb.drive_number32());
            println!("  boot signature: {:#04x}", bpb.boot_signature32());
            println!("  volume id: {:#010x}", bpb.volume_id32());
            println!(
                "  volume label: \"{}\"",
                String::from_utf8_lossy(bpb.volume_label32())
            );
            println!("  fs type: \"{}\"", String::from_utf8_lossy(bpb.fs_type32()));
        }
    }
    println!("  signature word: {:#06x}", bpb.signature_word());
    Ok(())
}

fn print_root(image: &mut FileImage, volume: &FatVolume) -> Result<(), CliError> {
    println!("files in root dir:");
    volume.iterate_dir(image, volume.info().root_dir_offset, |entry| {
        println!(
            "  {:<12} attr={} cluster={} size={} long={:?}",
            entry.name.to_string(),
            entry.attributes,
            entry.cluster,
            entry.size,
            entry.long_name.as_deref().unwrap_or("")
        );
    })
}

fn print_info(volume: &FatVolume) {
    let info = volume.info();
    println!("FAT Quantity: {}", info.fat_count);
    println!("FAT Region Sectors: {}", info.fat_sectors);
    println!("FAT Region offset: {:#x}", info.fat_offset);
    println!("Root Region Sectors: {}", info.root_dir_sectors);
    println!("Root Region offset: {:#x}", info.root_dir_offset);
    println!("Data Region Sectors: {}", info.data_sectors);
    println!("Data Region offset: {:#x}", info.data_offset);
    println!("Total Sectors: {}", info.total_sectors);
    println!("Cluster Count: {}", info.cluster_count);
    println!("Cluster Size: {}", info.cluster_size);
    println!("Sector Size: {}", info.sector_size);
    if let Some(warning) = &info.warning {
        println!("-----------------------------------");
        println!("Warn: {}", warning);
    }
}

fn print_fat(image: &mut FileImage, volume: &FatVolume) -> Result<(), CliError> {
    let entry_size = u64::from(volume.fat_type().fat_entry_size());
    let fat_offset = volume.info().fat_offset;
    volume.scan_fat(image, |index, raw, next| {
        let offset = fat_offset + u64::from(index) * entry_size;
        println!("({}: {:#x}) {:02x?} -> {}", index, offset, raw, next);
    })
}

fn cat_file(image: &mut FileImage, volume: &FatVolume, path: &str) -> Result<(), CliError> {
    let mut components = path.split('/').filter(|c| !c.is_empty()).peekable();
    let mut dir_offset = volume.info().root_dir_offset;
    let mut file = None;

    while let Some(component) = components.next() {
        match volume.walk(image, dir_offset, component)? {
            WalkStep::Directory(offset) => {
                if components.peek().is_none() {
                    // The path names a directory, not a file.
                    return Err(Error::NotFound);
                }
                dir_offset = offset;
            }
            WalkStep::File(entry) => {
                if components.peek().is_some() {
                    // A file in the middle of the path.
                    return Err(Error::NotFound);
                }
                file = Some(entry);
            }
        }
    }

    let entry = file.ok_or(Error::NotFound)?;
    let data = volume.read_file(image, entry.cluster, entry.size)?;
    io::stdout().write_all(&data).map_err(Error::DeviceError)?;
    Ok(())
}
