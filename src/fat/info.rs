//! Geometry derived from the BIOS Parameter Block.

use crate::fat::bpb::Bpb;
use crate::fat::ondiskdirentry::OnDiskDirEntry;
use crate::fat::{FatType, RESERVED_ENTRIES};
use crate::filesystem::cluster::ClusterId;

/// Everything the rest of the crate needs to know about a volume's layout.
///
/// Computed once when the reserved sector is read and immutable afterwards.
/// All offsets are absolute byte positions inside the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatInfo {
    /// Which FAT variant the volume carries.
    pub fat_type: FatType,
    /// Set when the cluster-count classification disagrees with the
    /// extension found in the header.
    pub warning: Option<String>,
    /// Bytes per sector.
    pub sector_size: u32,
    /// Bytes per cluster.
    pub cluster_size: u32,
    /// Number of FATs on the volume.
    pub fat_count: u32,
    /// Sectors per FAT.
    pub fat_sectors: u32,
    /// Sectors occupied by the fixed root directory; zero on FAT32.
    pub root_dir_sectors: u32,
    /// Sectors in the data region.
    pub data_sectors: u32,
    /// Total sectors of the volume.
    pub total_sectors: u32,
    /// Data clusters on the volume.
    pub cluster_count: u32,
    /// Byte offset of the first FAT.
    pub fat_offset: u64,
    /// Byte offset of the root directory region.
    pub root_dir_offset: u64,
    /// Byte offset of the data region.
    pub data_offset: u64,
}

impl FatInfo {
    /// Derive the full geometry from a reserved sector.
    ///
    /// The variant is pinned by the header when the FAT32 extension is
    /// present (zero root-entry count); otherwise the cluster-count
    /// thresholds assign it. A disagreement between the two is reported
    /// through `warning` while the header keeps the final say.
    pub(crate) fn compute(bpb: &Bpb) -> Result<FatInfo, &'static str> {
        let sector_size = u32::from(bpb.bytes_per_sector());
        let sectors_per_cluster = u32::from(bpb.sectors_per_cluster());
        let reserved = u32::from(bpb.reserved_sector_count());
        let fat_count = u32::from(bpb.num_fats());
        if sector_size == 0 || sectors_per_cluster == 0 {
            return Err("zero sector or cluster size");
        }

        let root_entry_count = u32::from(bpb.root_entry_count());
        let root_dir_sectors =
            (root_entry_count * OnDiskDirEntry::LEN as u32 + sector_size - 1) / sector_size;

        // A populated root-entry count means the FAT12/16 extension follows
        // the shared prefix; FAT32 zeroes it and stores its own extension.
        let header_type = if root_entry_count == 0 {
            Some(FatType::Fat32)
        } else {
            None
        };

        // Exactly one of each 16/32-bit pair is populated.
        let total_sectors = if bpb.total_sectors16() != 0 {
            u32::from(bpb.total_sectors16())
        } else {
            bpb.total_sectors32()
        };
        let fat_sectors = if bpb.fat_size16() != 0 {
            u32::from(bpb.fat_size16())
        } else {
            bpb.fat_size32()
        };

        let data_sectors = total_sectors
            .checked_sub(reserved + fat_count * fat_sectors + root_dir_sectors)
            .ok_or("regions do not fit in the declared total sectors")?;
        let cluster_count = data_sectors / sectors_per_cluster;
        let cluster_size = sectors_per_cluster * sector_size;

        let counted_type = FatType::from_cluster_count(cluster_count);
        let (fat_type, warning) = match header_type {
            None => (counted_type, None),
            Some(header) if header == counted_type => (header, None),
            Some(header) => (
                header,
                Some(format!(
                    "header extension says {} but the cluster count points to {}",
                    header, counted_type
                )),
            ),
        };

        let root_dir_offset = match fat_type {
            FatType::Fat12 | FatType::Fat16 => {
                u64::from(reserved + fat_count * fat_sectors) * u64::from(sector_size)
            }
            FatType::Fat32 => {
                let root_cluster = bpb.root_cluster().saturating_sub(RESERVED_ENTRIES);
                u64::from(reserved + fat_count * fat_sectors + root_cluster * sectors_per_cluster)
                    * u64::from(sector_size)
            }
        };

        Ok(FatInfo {
            fat_type,
            warning,
            sector_size,
            cluster_size,
            fat_count,
            fat_sectors,
            root_dir_sectors,
            data_sectors,
            total_sectors,
            cluster_count,
            fat_offset: u64::from(reserved) * u64::from(sector_size),
            root_dir_offset,
            data_offset: u64::from(reserved + fat_count * fat_sectors + root_dir_sectors)
                * u64::from(sector_size),
        })
    }

    /// Byte offset of a data cluster. Clusters 0 and 1 are reserved, so
    /// callers must pass a cluster at or past [`ClusterId::FIRST_DATA`].
    pub fn cluster_offset(&self, cluster: ClusterId) -> u64 {
        self.data_offset
            + u64::from(cluster.0 - RESERVED_ENTRIES) * u64::from(self.cluster_size)
    }

    /// Total byte length of the FAT region, every copy included.
    pub fn fat_region_len(&self) -> u64 {
        u64::from(self.fat_sectors) * u64::from(self.fat_count) * u64::from(self.sector_size)
    }
}


// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
