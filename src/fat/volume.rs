//! FAT volume operations: opening, the FAT itself, cluster chains and
//! directories.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace, warn};

use crate::fat::bpb::Bpb;
use crate::fat::info::FatInfo;
use crate::fat::ondiskdirentry::OnDiskDirEntry;
use crate::fat::{FatType, FIRST_SEARCH_INDEX};
use crate::filesystem::attributes::Attributes;
use crate::filesystem::cluster::ClusterId;
use crate::filesystem::directory::{DirEntry, LongNameAccumulator};
use crate::filesystem::filename::ShortFileName;
use crate::filesystem::timestamp::TimeSource;
use crate::image::ImageDevice;
use crate::Error;

/// Read the reserved sector of `image` and derive the volume's geometry.
///
/// Everything else in this module hangs off the returned [`FatVolume`].
/// Opening the same image twice yields identical geometry; nothing here
/// mutates the image.
pub fn parse_volume<D>(image: &mut D) -> Result<FatVolume, Error<D::E>>
where
    D: ImageDevice,
{
    let mut sector = [0u8; Bpb::LEN];
    image.read_at(0, &mut sector).map_err(Error::DeviceError)?;
    let bpb = Bpb::create_from_bytes(&sector);
    if !bpb.looks_fat() {
        return Err(Error::NotFat);
    }
    let info = FatInfo::compute(&bpb).map_err(Error::FormatError)?;
    if let Some(warning) = &info.warning {
        warn!("{}", warning);
    }
    debug!(
        "detected {} volume, {} clusters of {} bytes",
        info.fat_type, info.cluster_count, info.cluster_size
    );
    Ok(FatVolume { info })
}

/// One step of a path walk: either the next directory region to search, or
/// the file entry the component resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStep {
    /// Byte offset of the named subdirectory's region.
    Directory(u64),
    /// The named entry is a file.
    File(DirEntry),
}

/// An open FAT volume: the derived geometry plus the operations that
/// interpret the FAT, cluster chains and directories.
///
/// The image handle is borrowed per call and never retained, so a
/// `FatVolume` is nothing but the geometry. Directory listings are only
/// consistent at the moment they are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatVolume {
    info: FatInfo,
}

impl FatVolume {
    /// The derived geometry.
    pub fn info(&self) -> &FatInfo {
        &self.info
    }

    /// Which variant this volume carries.
    pub fn fat_type(&self) -> FatType {
        self.info.fat_type
    }

    /// Byte offset of FAT entry `index` in the primary FAT.
    fn fat_entry_offset(&self, index: u32) -> u64 {
        self.info.fat_offset + u64::from(index) * u64::from(self.info.fat_type.fat_entry_size())
    }

    fn decode_fat_entry(&self, buf: &[u8]) -> u32 {
        match self.info.fat_type {
            FatType::Fat12 | FatType::Fat16 => u32::from(LittleEndian::read_u16(&buf[..2])),
            FatType::Fat32 => LittleEndian::read_u32(&buf[..4]),
        }
    }

    /// Read one FAT entry.
    pub fn fat_entry<D>(&self, image: &mut D, index: u32) -> Result<u32, Error<D::E>>
    where
        D: ImageDevice,
    {
        let len = self.info.fat_type.fat_entry_size() as usize;
        let mut buf = [0u8; 4];
        image
            .read_at(self.fat_entry_offset(index), &mut buf[..len])
            .map_err(Error::DeviceError)?;
        Ok(self.decode_fat_entry(&buf))
    }

    /// Write one FAT entry. Only the primary FAT is touched; redundant
    /// copies are left as they were.
    pub fn set_fat_entry<D>(&self, image: &mut D, index: u32, value: u32) -> Result<(), Error<D::E>>
    where
        D: ImageDevice,
    {
        let len = self.info.fat_type.fat_entry_size() as usize;
        let mut buf = [0u8; 4];
        match self.info.fat_type {
            FatType::Fat12 | FatType::Fat16 => LittleEndian::write_u16(&mut buf[..2], value as u16),
            FatType::Fat32 => LittleEndian::write_u32(&mut buf[..4], value),
        }
        trace!("FAT[{}] <- {:#x}", index, value);
        image
            .write_at(self.fat_entry_offset(index), &buf[..len])
            .map_err(Error::DeviceError)
    }

    /// Does `value` terminate a cluster chain?
    pub fn is_end_of_chain(&self, value: u32) -> bool {
        value == self.info.fat_type.eof_marker()
    }

    /// Find the smallest free FAT entry at or after `start`. The search
    /// covers the whole FAT region and fails with [`Error::NoSpace`] when
    /// nothing there is free.
    pub fn find_free_entry<D>(&self, image: &mut D, start: u32) -> Result<u32, Error<D::E>>
    where
        D: ImageDevice,
    {
        let end = self.info.fat_offset + self.info.fat_region_len();
        let mut index = start;
        while self.fat_entry_offset(index) < end {
            if self.fat_entry(image, index)? == 0 {
                trace!("free FAT entry at {}", index);
                return Ok(index);
            }
            index += 1;
        }
        Err(Error::NoSpace)
    }

    /// Visit every entry of the FAT region in order.
    ///
    /// The callback receives the entry index, the raw little-endian entry
    /// bytes and the interpreted next-cluster value.
    pub fn scan_fat<D, F>(&self, image: &mut D, mut func: F) -> Result<(), Error<D::E>>
    where
        D: ImageDevice,
        F: FnMut(u32, &[u8], u32),
    {
        let len = self.info.fat_type.fat_entry_size() as usize;
        let end = self.info.fat_offset + self.info.fat_region_len();
        let mut buf = [0u8; 4];
        let mut index = 0u32;
        while self.fat_entry_offset(index) < end {
            image
                .read_at(self.fat_entry_offset(index), &mut buf[..len])
                .map_err(Error::DeviceError)?;
            func(index, &buf[..len], self.decode_fat_entry(&buf));
            index += 1;
        }
        Ok(())
    }

    /// Call `func` for each entry of the directory region starting at
    /// `offset`, in on-disk order, with long names reassembled onto the
    /// short entry that owns them. Enumeration halts at the terminator
    /// slot; whatever follows it is never looked at.
    pub fn iterate_dir<D, F>(&self, image: &mut D, offset: u64, mut func: F) -> Result<(), Error<D::E>>
    where
        D: ImageDevice,
        F: FnMut(&DirEntry),
    {
        let mut long_names = LongNameAccumulator::new();
        let mut slot = [0u8; OnDiskDirEntry::LEN];
        let mut offset = offset;
        loop {
            image.read_at(offset, &mut slot).map_err(Error::DeviceError)?;
            offset += OnDiskDirEntry::LEN as u64;

            let on_disk = OnDiskDirEntry::new(&slot);
            if on_disk.is_end() {
                break;
            }
            if on_disk.is_lfn() {
                long_names.push(&on_disk);
                continue;
            }
            if on_disk.attributes().is_volume_label() {
                // A label carries a name and nothing else.
                func(&DirEntry {
                    name: on_disk.short_name(),
                    long_name: None,
                    attributes: on_disk.attributes(),
                    cluster: ClusterId::EMPTY,
                    size: 0,
                });
                continue;
            }
            let mut entry = on_disk.get_entry();
            entry.long_name = long_names.take_pending();
            func(&entry);
        }
        Ok(())
    }

    /// Collect a directory listing.
    pub fn list_dir<D>(&self, image: &mut D, offset: u64) -> Result<Vec<DirEntry>, Error<D::E>>
    where
        D: ImageDevice,
    {
        let mut entries = Vec::new();
        self.iterate_dir(image, offset, |entry| entries.push(entry.clone()))?;
        Ok(entries)
    }

    /// Resolve one path component against the directory at `dir_offset`.
    pub fn walk<D>(&self, image: &mut D, dir_offset: u64, name: &str) -> Result<WalkStep, Error<D::E>>
    where
        D: ImageDevice,
    {
        let mut found: Option<DirEntry> = None;
        self.iterate_dir(image, dir_offset, |entry| {
            if found.is_none() && entry.matches(name) {
                found = Some(entry.clone());
            }
        })?;
        let entry = found.ok_or(Error::NotFound)?;
        if entry.attributes.is_directory() {
            if entry.cluster < ClusterId::FIRST_DATA {
                return Err(Error::FormatError("directory entry in the reserved range"));
            }
            Ok(WalkStep::Directory(self.info.cluster_offset(entry.cluster)))
        } else {
            Ok(WalkStep::File(entry))
        }
    }

    /// Read `size` bytes of file content by following the FAT chain from
    /// `cluster`. The padding of the final cluster is trimmed away.
    pub fn read_file<D>(
        &self,
        image: &mut D,
        cluster: ClusterId,
        size: u32,
    ) -> Result<Vec<u8>, Error<D::E>>
    where
        D: ImageDevice,
    {
        let cluster_size = self.info.cluster_size as usize;
        let mut data = Vec::new();
        let mut current = cluster;
        let mut hops = 0u32;
        loop {
            if current < ClusterId::FIRST_DATA {
                return Err(Error::FormatError("cluster chain entered the reserved range"));
            }
            // A chain with more links than the volume has clusters loops.
            if hops > self.info.cluster_count {
                return Err(Error::FormatError("cluster chain does not terminate"));
            }
            hops += 1;

            let start = data.len();
            data.resize(start + cluster_size, 0);
            image
                .read_at(self.info.cluster_offset(current), &mut data[start..])
                .map_err(Error::DeviceError)?;

            let next = self.fat_entry(image, current.0)?;
            if self.is_end_of_chain(next) {
                break;
            }
            current = ClusterId(next);
        }
        data.truncate(size as usize);
        Ok(data)
    }

    /// Write `input` out as a new file called `name` in the root directory.
    ///
    /// Clusters are claimed first-fit from the FAT, the data is copied a
    /// cluster at a time, the chain is terminated with the variant's EOF
    /// sentinel, and only then does the root directory learn the name. A
    /// failure part-way therefore leaves claimed-but-unreferenced clusters
    /// behind, never a directory entry pointing at a broken chain.
    pub fn write_file<D, T, R>(
        &self,
        image: &mut D,
        time_source: &T,
        name: &str,
        input: &mut R,
    ) -> Result<DirEntry, Error<D::E>>
    where
        D: ImageDevice,
        T: TimeSource,
        R: std::io::Read,
    {
        let short_name = ShortFileName::create_from_str(name).map_err(Error::FilenameError)?;
        let start = self.find_free_entry(image, FIRST_SEARCH_INDEX)?;

        let mut entry = DirEntry {
            name: short_name,
            long_name: Some(name.to_string()),
            attributes: Attributes::create_from_fat(Attributes::ARCHIVE),
            cluster: ClusterId(start),
            size: 0,
        };

        let cluster_size = self.info.cluster_size as usize;
        let mut chunk = vec![0u8; cluster_size];
        let mut filled = read_full(input, &mut chunk).map_err(Error::Input)?;
        let mut current = start;
        let mut total = 0u32;

        loop {
            image
                .write_at(self.info.cluster_offset(ClusterId(current)), &chunk[..filled])
                .map_err(Error::DeviceError)?;
            total += filled as u32;

            if filled < cluster_size {
                // Input ran out mid-cluster: terminate the chain.
                self.set_fat_entry(image, current, self.info.fat_type.eof_marker())?;
                break;
            }

            // A full cluster went out. Look ahead before linking, so an
            // input of exactly N clusters does not claim an empty tail.
            filled = read_full(input, &mut chunk).map_err(Error::Input)?;
            if filled == 0 {
                self.set_fat_entry(image, current, self.info.fat_type.eof_marker())?;
                break;
            }

            let next = self.find_free_entry(image, current + 1)?;
            self.set_fat_entry(image, current, next)?;
            current = next;
        }

        entry.size = total;
        debug!("wrote {} bytes as {} starting at cluster {}", total, name, start);
        self.add_root_entry(image, time_source, &entry)?;
        Ok(entry)
    }

    /// Place `entry` in the first free slot of the root directory, stamped
    /// with the current time.
    fn add_root_entry<D, T>(
        &self,
        image: &mut D,
        time_source: &T,
        entry: &DirEntry,
    ) -> Result<(), Error<D::E>>
    where
        D: ImageDevice,
        T: TimeSource,
    {
        let mut slot = [0u8; OnDiskDirEntry::LEN];
        let mut offset = self.info.root_dir_offset;
        loop {
            image.read_at(offset, &mut slot).map_err(Error::DeviceError)?;
            if OnDiskDirEntry::new(&slot).raw_attributes() == 0x00 {
                break;
            }
            offset += OnDiskDirEntry::LEN as u64;
        }
        trace!("root entry for {} at {:#x}", entry.name, offset);
        let data = entry.serialize(time_source.get_timestamp());
        image.write_at(offset, &data).map_err(Error::DeviceError)
    }
}

/// Fill as much of `buf` as the reader can provide: like
/// [`std::io::Read::read`], but retrying until the buffer is full or the
/// source is exhausted.
fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: std::io::Read,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}


// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
