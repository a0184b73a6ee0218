//! Reader and writer for raw FAT volume images.
//!
//! Interprets FAT12, FAT16 and FAT32 volumes stored as plain files (no
//! partition table): detects the variant, derives the region geometry from
//! the BIOS Parameter Block, enumerates directories with VFAT long-name
//! reassembly, follows cluster chains to read file contents, and appends new
//! files to the root directory by allocating fresh chains.
//!
//! ```rust,no_run
//! use fatlook::{parse_volume, FileImage};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut image = FileImage::open("volume.img")?;
//! let volume = parse_volume(&mut image)?;
//! println!("{}", volume.fat_type());
//! volume.iterate_dir(&mut image, volume.info().root_dir_offset, |entry| {
//!     println!("{}", entry.name);
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! The image handle is owned by the caller and borrowed per operation; the
//! core keeps no state beyond the geometry derived once at open.
//!
//! Two deliberate simplifications are carried over from the tool this crate
//! grew out of: FAT12 entries are read and written as 16-bit values rather
//! than packed 12-bit ones, and writes touch only the primary FAT, leaving
//! redundant copies stale.

pub mod fat;
pub mod filesystem;
pub mod image;

pub use crate::fat::info::FatInfo;
pub use crate::fat::volume::{parse_volume, FatVolume, WalkStep};
pub use crate::fat::FatType;
pub use crate::filesystem::attributes::Attributes;
pub use crate::filesystem::cluster::ClusterId;
pub use crate::filesystem::directory::DirEntry;
pub use crate::filesystem::filename::{FilenameError, ShortFileName};
pub use crate::filesystem::timestamp::{TimeSource, Timestamp};
pub use crate::image::{FileImage, ImageDevice};

/// The errors the core surfaces. Generic over the error type of the image
/// device the operation ran against.
#[derive(Debug)]
pub enum Error<E>
where
    E: core::fmt::Debug,
{
    /// The underlying image returned an error.
    DeviceError(E),
    /// The image does not carry a FAT boot signature.
    NotFat,
    /// A structurally malformed on-disk record.
    FormatError(&'static str),
    /// The named entry is not present in the directory.
    NotFound,
    /// Every entry in the FAT region is in use.
    NoSpace,
    /// The supplied name cannot be converted to a short filename.
    FilenameError(FilenameError),
    /// Reading from the byte source being written out failed.
    Input(std::io::Error),
}

impl<E> core::fmt::Display for Error<E>
where
    E: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::DeviceError(e) => write!(f, "image error: {:?}", e),
            Error::NotFat => write!(f, "not a msdos FAT FS"),
            Error::FormatError(msg) => write!(f, "malformed volume: {}", msg),
            Error::NotFound => write!(f, "entry not found"),
            Error::NoSpace => write!(f, "no more empty FAT entries left"),
            Error::FilenameError(e) => write!(f, "invalid name: {}", e),
            Error::Input(e) => write!(f, "reading input: {}", e),
        }
    }
}

impl<E> std::error::Error for Error<E> where E: core::fmt::Debug {}
