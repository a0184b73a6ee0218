//! Access to the raw bytes of a volume image.
//!
//! The core addresses the image purely by absolute byte offset; every
//! transfer repositions before reading or writing, so no cursor state leaks
//! between operations.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::trace;

/// Abstract byte-level access to a raw FAT volume image.
pub trait ImageDevice {
    /// The error type returned by the underlying storage.
    type E: core::fmt::Debug;

    /// Fill `buf` from the image, starting at byte `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), Self::E>;

    /// Write all of `buf` to the image, starting at byte `offset`.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), Self::E>;
}

/// A volume image backed by a regular file.
#[derive(Debug)]
pub struct FileImage {
    file: File,
}

impl FileImage {
    /// Open an image file read-only.
    pub fn open<P>(path: P) -> Result<FileImage, std::io::Error>
    where
        P: AsRef<Path>,
    {
        Ok(FileImage {
            file: OpenOptions::new().read(true).open(path)?,
        })
    }

    /// Open an image file for reading and writing.
    pub fn open_rw<P>(path: P) -> Result<FileImage, std::io::Error>
    where
        P: AsRef<Path>,
    {
        Ok(FileImage {
            file: OpenOptions::new().read(true).write(true).open(path)?,
        })
    }
}

impl ImageDevice for FileImage {
    type E = std::io::Error;

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), Self::E> {
        trace!("read {} bytes at {:#x}", buf.len(), offset);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), Self::E> {
        trace!("write {} bytes at {:#x}", buf.len(), offset);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)
    }
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
