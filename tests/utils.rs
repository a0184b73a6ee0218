//! Shared test helpers: a RAM-backed image device and tiny formatted
//! volumes to run the interpreter against.
#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};
use hex_literal::hex;

use fatlook::{ImageDevice, TimeSource, Timestamp};

/// A volume image held in memory.
pub struct RamImage {
    data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamImageError {
    OutOfBounds,
}

impl RamImage {
    pub fn new(len: usize) -> RamImage {
        RamImage {
            data: vec![0u8; len],
        }
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    pub fn contents_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl ImageDevice for RamImage {
    type E = RamImageError;

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), Self::E> {
        let start = offset as usize;
        let end = start
            .checked_add(buf.len())
            .ok_or(RamImageError::OutOfBounds)?;
        if end > self.data.len() {
            return Err(RamImageError::OutOfBounds);
        }
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), Self::E> {
        let start = offset as usize;
        let end = start
            .checked_add(buf.len())
            .ok_or(RamImageError::OutOfBounds)?;
        if end > self.data.len() {
            return Err(RamImageError::OutOfBounds);
        }
        self.data[start..end].copy_from_slice(buf);
        Ok(())
    }
}

/// A time source pinned to 2003-04-04 13:30:05.
pub struct TestTimeSource;

impl TimeSource for TestTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 33,
            zero_indexed_month: 3,
            zero_indexed_day: 3,
            hours: 13,
            minutes: 30,
            seconds: 5,
        }
    }
}

pub fn make_time_source() -> TestTimeSource {
    TestTimeSource
}

// FAT16 fixture: 512-byte sectors, 4 sectors per cluster, 4 reserved
// sectors, 2 FATs of 17 sectors, 512 root entries, 16870 total sectors.
pub const FAT16_SECTOR_SIZE: u64 = 512;
pub const FAT16_CLUSTER_SIZE: u64 = 2048;
pub const FAT16_FAT_OFFSET: u64 = 4 * 512;
pub const FAT16_SECOND_FAT_OFFSET: u64 = FAT16_FAT_OFFSET + 17 * 512;
pub const FAT16_ROOT_OFFSET: u64 = (4 + 2 * 17) * 512;
pub const FAT16_DATA_OFFSET: u64 = (4 + 2 * 17 + 32) * 512;
pub const FAT16_TOTAL_SECTORS: u32 = 16870;
pub const FAT16_CLUSTER_COUNT: u32 = 4200;

/// A freshly formatted, empty FAT16 volume.
pub fn make_fat16_image() -> RamImage {
    let mut image = RamImage::new(FAT16_TOTAL_SECTORS as usize * 512);
    let data = image.contents_mut();
    data[0..3].copy_from_slice(&hex!("eb 58 90"));
    data[3..11].copy_from_slice(b"mkfs.fat");
    LittleEndian::write_u16(&mut data[11..13], 512);
    data[13] = 4;
    LittleEndian::write_u16(&mut data[14..16], 4);
    data[16] = 2;
    LittleEndian::write_u16(&mut data[17..19], 512);
    LittleEndian::write_u16(&mut data[19..21], 16870);
    data[21] = 0xF8;
    LittleEndian::write_u16(&mut data[22..24], 17);
    LittleEndian::write_u16(&mut data[24..26], 32);
    LittleEndian::write_u16(&mut data[26..28], 64);
    // FAT12/16 extension
    data[36] = 0x80;
    data[38] = 0x29;
    LittleEndian::write_u32(&mut data[39..43], 0x1234_5678);
    data[43..54].copy_from_slice(b"NO NAME    ");
    data[54..62].copy_from_slice(b"FAT16   ");
    data[510] = 0x55;
    data[511] = 0xAA;
    // Media and end-of-chain markers open both FATs.
    for fat in [FAT16_FAT_OFFSET as usize, FAT16_SECOND_FAT_OFFSET as usize] {
        LittleEndian::write_u16(&mut data[fat..fat + 2], 0xFFF8);
        LittleEndian::write_u16(&mut data[fat + 2..fat + 4], 0xFFFF);
    }
    image
}

// FAT32 fixture: 512-byte sectors, 1 sector per cluster, 32 reserved
// sectors, 2 FATs of 520 sectors, root directory at cluster 2, 67072 total
// sectors (66000 clusters).
pub const FAT32_FAT_OFFSET: u64 = 32 * 512;
pub const FAT32_ROOT_OFFSET: u64 = (32 + 2 * 520) * 512;
pub const FAT32_DATA_OFFSET: u64 = FAT32_ROOT_OFFSET;
pub const FAT32_CLUSTER_SIZE: u64 = 512;
pub const FAT32_TOTAL_SECTORS: u32 = 67072;
pub const FAT32_CLUSTER_COUNT: u32 = 66000;

/// A freshly formatted, empty FAT32 volume.
pub fn make_fat32_image() -> RamImage {
    let mut image = RamImage::new(FAT32_TOTAL_SECTORS as usize * 512);
    let data = image.contents_mut();
    data[0..3].copy_from_slice(&hex!("eb 58 90"));
    data[3..11].copy_from_slice(b"mkfs.fat");
    LittleEndian::write_u16(&mut data[11..13], 512);
    data[13] = 1;
    LittleEndian::write_u16(&mut data[14..16], 32);
    data[16] = 2;
    data[21] = 0xF8;
    // FAT32 extension
    LittleEndian::write_u32(&mut data[32..36], FAT32_TOTAL_SECTORS);
    LittleEndian::write_u32(&mut data[36..40], 520);
    LittleEndian::write_u32(&mut data[44..48], 2); // root cluster
    LittleEndian::write_u16(&mut data[48..50], 1); // FSInfo sector
    LittleEndian::write_u16(&mut data[50..52], 6); // backup boot sector
    data[64] = 0x80;
    data[66] = 0x29;
    LittleEndian::write_u32(&mut data[67..71], 0x8765_4321);
    data[71..82].copy_from_slice(b"NO NAME    ");
    data[82..90].copy_from_slice(b"FAT32   ");
    data[510] = 0x55;
    data[511] = 0xAA;
    let fat = FAT32_FAT_OFFSET as usize;
    LittleEndian::write_u32(&mut data[fat..fat + 4], 0x0FFF_FFF8);
    LittleEndian::write_u32(&mut data[fat + 4..fat + 8], 0x0FFF_FFFF);
    // Root directory cluster is in use.
    LittleEndian::write_u32(&mut data[fat + 8..fat + 12], 0x0FFF_FFFF);
    image
}

// FAT12 fixture: 512-byte sectors, 1 sector per cluster, 1 reserved
// sector, 2 FATs of 12 sectors, 16 root entries, 3026 total sectors
// (3000 clusters).
pub const FAT12_FAT_OFFSET: u64 = 512;
pub const FAT12_FAT_REGION_LEN: u64 = 2 * 12 * 512;
pub const FAT12_ROOT_OFFSET: u64 = (1 + 2 * 12) * 512;
pub const FAT12_TOTAL_SECTORS: u32 = 3026;

/// A freshly formatted, empty FAT12 volume.
pub fn make_fat12_image() -> RamImage {
    let mut image = RamImage::new(FAT12_TOTAL_SECTORS as usize * 512);
    let data = image.contents_mut();
    data[0..3].copy_from_slice(&hex!("eb 3c 90"));
    data[3..11].copy_from_slice(b"mkfs.fat");
    LittleEndian::write_u16(&mut data[11..13], 512);
    data[13] = 1;
    LittleEndian::write_u16(&mut data[14..16], 1);
    data[16] = 2;
    LittleEndian::write_u16(&mut data[17..19], 16);
    LittleEndian::write_u16(&mut data[19..21], 3026);
    data[21] = 0xF8;
    LittleEndian::write_u16(&mut data[22..24], 12);
    data[510] = 0x55;
    data[511] = 0xAA;
    image
}

/// A boot sector whose FAT32 extension disagrees with its cluster count
/// (40000 clusters is FAT16 territory). Only the reserved sector is backed.
pub fn make_mismatched_image() -> RamImage {
    let mut image = RamImage::new(512);
    let data = image.contents_mut();
    data[0..3].copy_from_slice(&hex!("eb 58 90"));
    data[3..11].copy_from_slice(b"mkfs.fat");
    LittleEndian::write_u16(&mut data[11..13], 512);
    data[13] = 1;
    LittleEndian::write_u16(&mut data[14..16], 32);
    data[16] = 2;
    LittleEndian::write_u32(&mut data[32..36], 40658);
    LittleEndian::write_u32(&mut data[36..40], 313);
    LittleEndian::write_u32(&mut data[44..48], 2);
    data[510] = 0x55;
    data[511] = 0xAA;
    image
}

/// Overwrite one 16-bit entry of the primary FAT16 FAT.
pub fn set_fat16_entry(image: &mut RamImage, index: u32, value: u16) {
    let offset = FAT16_FAT_OFFSET as usize + index as usize * 2;
    LittleEndian::write_u16(&mut image.contents_mut()[offset..offset + 2], value);
}

/// Overwrite one 32-bit entry of the primary FAT32 FAT.
pub fn set_fat32_entry(image: &mut RamImage, index: u32, value: u32) {
    let offset = FAT32_FAT_OFFSET as usize + index as usize * 4;
    LittleEndian::write_u32(&mut image.contents_mut()[offset..offset + 4], value);
}

/// Build one 32-byte short directory entry.
pub fn short_entry(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[0..11].copy_from_slice(name);
    slot[11] = attr;
    LittleEndian::write_u16(&mut slot[20..22], (cluster >> 16) as u16);
    LittleEndian::write_u16(&mut slot[26..28], (cluster & 0xFFFF) as u16);
    LittleEndian::write_u32(&mut slot[28..32], size);
    slot
}

/// Build one 32-byte VFAT long-name fragment slot.
pub fn lfn_slot(ordinal: u8, checksum: u8, part: &str) -> [u8; 32] {
    let mut slot = [0xFFu8; 32];
    slot[0] = ordinal;
    slot[11] = 0x0F;
    slot[12] = 0;
    slot[13] = checksum;
    slot[26] = 0;
    slot[27] = 0;
    let mut units: Vec<u16> = part.chars().map(|c| c as u16).collect();
    if units.len() < 13 {
        units.push(0);
    }
    while units.len() < 13 {
        units.push(0xFFFF);
    }
    for (i, unit) in units.iter().enumerate() {
        let offset = match i {
            0..=4 => 1 + i * 2,
            5..=10 => 14 + (i - 5) * 2,
            _ => 28 + (i - 11) * 2,
        };
        slot[offset..offset + 2].copy_from_slice(&unit.to_le_bytes());
    }
    slot
}

/// Drop a pre-built directory slot into the image.
pub fn plant_slot(image: &mut RamImage, dir_offset: u64, slot_index: usize, slot: &[u8; 32]) {
    let offset = dir_offset as usize + slot_index * 32;
    image.contents_mut()[offset..offset + 32].copy_from_slice(slot);
}

/// Write raw bytes into the image at an absolute offset.
pub fn plant_bytes(image: &mut RamImage, offset: u64, bytes: &[u8]) {
    let offset = offset as usize;
    image.contents_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
