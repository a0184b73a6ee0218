//! The BIOS Parameter Block, as stored in the reserved sector.

use byteorder::{ByteOrder, LittleEndian};

/// A borrowed view over the 512-byte reserved sector.
///
/// The first 36 bytes are common to every variant. After that the layout
/// forks: volumes with a populated root-entry count carry the FAT12/16
/// extension, volumes with a zero root-entry count carry the FAT32 one. The
/// extension accessors are only meaningful for the form actually on disk.
pub struct Bpb<'a> {
    data: &'a [u8; 512],
}

impl<'a> Bpb<'a> {
    /// The reserved sector is always this long.
    pub const LEN: usize = 512;

    /// Attach to the bytes of a reserved sector.
    pub fn create_from_bytes(data: &'a [u8; 512]) -> Bpb<'a> {
        Bpb { data }
    }

    /// Does this look like a FAT volume at all? Every FAT formatter writes
    /// one of the two x86 jump opcodes as the first byte of the boot code.
    pub fn looks_fat(&self) -> bool {
        matches!(self.data[0], 0xEB | 0xE9)
    }

    pub fn jump_boot(&self) -> &[u8] {
        &self.data[0..3]
    }

    pub fn oem_name(&self) -> &[u8] {
        &self.data[3..11]
    }

    pub fn bytes_per_sector(&self) -> u16 {
        LittleEndian::read_u16(&self.data[11..13])
    }

    pub fn sectors_per_cluster(&self) -> u8 {
        self.data[13]
    }

    pub fn reserved_sector_count(&self) -> u16 {
        LittleEndian::read_u16(&self.data[14..16])
    }

    pub fn num_fats(&self) -> u8 {
        self.data[16]
    }

    /// Fixed root-directory capacity in entries; zero on FAT32.
    pub fn root_entry_count(&self) -> u16 {
        LittleEndian::read_u16(&self.data[17..19])
    }

    /// 16-bit total sector count; zero when the 32-bit field is in use.
    pub fn total_sectors16(&self) -> u16 {
        LittleEndian::read_u16(&self.data[19..21])
    }

    pub fn media(&self) -> u8 {
        self.data[21]
    }

    /// 16-bit sectors-per-FAT; zero when the FAT32 field is in use.
    pub fn fat_size16(&self) -> u16 {
        LittleEndian::read_u16(&self.data[22..24])
    }

    pub fn sectors_per_track(&self) -> u16 {
        LittleEndian::read_u16(&self.data[24..26])
    }

    pub fn num_heads(&self) -> u16 {
        LittleEndian::read_u16(&self.data[26..28])
    }

    pub fn hidden_sectors(&self) -> u32 {
        LittleEndian::read_u32(&self.data[28..32])
    }

    pub fn total_sectors32(&self) -> u32 {
        LittleEndian::read_u32(&self.data[32..36])
    }

    // FAT12/16 extension

    pub fn drive_number(&self) -> u8 {
        self.data[36]
    }

    pub fn boot_signature(&self) -> u8 {
        self.data[38]
    }

    pub fn volume_id(&self) -> u32 {
        LittleEndian::read_u32(&self.data[39..43])
    }

    pub fn volume_label(&self) -> &[u8] {
        &self.data[43..54]
    }

    pub fn fs_type(&self) -> &[u8] {
        &self.data[54..62]
    }

    // FAT32 extension

    /// 32-bit sectors-per-FAT, FAT32 only.
    pub fn fat_size32(&self) -> u32 {
        LittleEndian::read_u32(&self.data[36..40])
    }

    pub fn ext_flags(&self) -> u16 {
        LittleEndian::read_u16(&self.data[40..42])
    }

    pub fn fs_version(&self) -> u16 {
        LittleEndian::read_u16(&self.data[42..44])
    }

    /// The cluster where the root directory begins inside the data region.
    pub fn root_cluster(&self) -> u32 {
        LittleEndian::read_u32(&self.data[44..48])
    }

    pub fn fs_info_sector(&self) -> u16 {
        LittleEndian::read_u16(&self.data[48..50])
    }

    pub fn backup_boot_sector(&self) -> u16 {
        LittleEndian::read_u16(&self.data[50..52])
    }

    pub fn drive_number32(&self) -> u8 {
        self.data[64]
    }

    pub fn boot_signature32(&self) -> u8 {
        self.data[66]
    }

    pub fn volume_id32(&self) -> u32 {
        LittleEndian::read_u32(&self.data[67..71])
    }

    pub fn volume_label32(&self) -> &[u8] {
        &self.data[71..82]
    }

    pub fn fs_type32(&self) -> &[u8] {
        &self.data[82..90]
    }

    /// The 0xAA55 word closing the sector.
    pub fn signature_word(&self) -> u16 {
        LittleEndian::read_u16(&self.data[510..512])
    }
}


// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
