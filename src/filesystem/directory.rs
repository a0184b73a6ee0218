//! The logical view of directory entries, including long-name reassembly.

use byteorder::{ByteOrder, LittleEndian};

use crate::fat::ondiskdirentry::OnDiskDirEntry;
use crate::filesystem::attributes::Attributes;
use crate::filesystem::cluster::ClusterId;
use crate::filesystem::filename::ShortFileName;
use crate::filesystem::timestamp::Timestamp;

/// A long name spans at most this many 32-byte fragments.
const MAX_LFN_FRAGMENTS: usize = 20;

/// Raw bytes carried by one fragment: 13 UCS-2 code units.
const LFN_FRAGMENT_LEN: usize = 26;

type Fragment = heapless::Vec<u8, LFN_FRAGMENT_LEN>;

/// A directory entry as surfaced by directory enumeration: the short entry,
/// plus the long name reassembled from any VFAT run preceding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// The 8.3 name stored in the short entry.
    pub name: ShortFileName,
    /// The long filename, when the short entry was preceded by a VFAT run.
    /// The ASCII projection of the on-disk UCS-2 data.
    pub long_name: Option<String>,
    /// The attribute byte.
    pub attributes: Attributes,
    /// The starting cluster; the FAT gives the rest of the chain.
    pub cluster: ClusterId,
    /// File size in bytes.
    pub size: u32,
}

impl DirEntry {
    /// Does `name` refer to this entry? Either the long name matches
    /// verbatim or the 8.3 conversion of `name` matches the short one.
    pub fn matches(&self, name: &str) -> bool {
        if let Some(long) = &self.long_name {
            if long == name {
                return true;
            }
        }
        ShortFileName::create_from_str(name)
            .map(|sfn| sfn == self.name)
            .unwrap_or(false)
    }

    /// Encode as a fresh 32-byte short entry: name, attributes, size, the
    /// low half of the starting cluster and the write date/time. Every
    /// other field stays zero; in particular the high cluster half is not
    /// stored, so FAT32 chains starting past cluster 0xFFFF truncate.
    pub(crate) fn serialize(&self, mtime: Timestamp) -> [u8; OnDiskDirEntry::LEN] {
        let mut data = [0u8; OnDiskDirEntry::LEN];
        data[0..11].copy_from_slice(&self.name.contents);
        data[11] = self.attributes.0;
        LittleEndian::write_u16(&mut data[22..24], mtime.fat_time());
        LittleEndian::write_u16(&mut data[24..26], mtime.fat_date());
        LittleEndian::write_u16(&mut data[26..28], (self.cluster.0 & 0xFFFF) as u16);
        LittleEndian::write_u32(&mut data[28..32], self.size);
        data
    }
}

/// One in-flight VFAT run: the fragments seen so far for one checksum.
struct LongNameRun {
    checksum: u8,
    fragments: heapless::Vec<Fragment, MAX_LFN_FRAGMENTS>,
}

impl LongNameRun {
    /// Rebuild the name. Fragments appear on disk tail-first, so they are
    /// walked in reverse insertion order, keeping the low byte of each
    /// UCS-2 unit. The tail fragment (inserted first) drops its trailing
    /// unit, the null terminator.
    fn build(&self) -> String {
        let mut name = Vec::new();
        for (idx, fragment) in self.fragments.iter().enumerate().rev() {
            let mut limit = fragment.len();
            if idx == 0 {
                limit = limit.saturating_sub(2);
            }
            let mut pos = 0;
            while pos < limit {
                name.push(fragment[pos]);
                pos += 2;
            }
        }
        String::from_utf8_lossy(&name).into_owned()
    }
}

/// Collects VFAT long-filename fragments until the short entry that owns
/// them arrives.
///
/// Fragments are bucketed by the checksum byte each one carries. A run is
/// complete once the fragment with ordinal 1 (the head of the name, placed
/// last on disk) has been seen; the next short entry drains that bucket.
/// Runs never claimed by a short entry are simply dropped.
pub(crate) struct LongNameAccumulator {
    runs: Vec<LongNameRun>,
    pending: Option<u8>,
}

impl LongNameAccumulator {
    pub(crate) fn new() -> LongNameAccumulator {
        LongNameAccumulator {
            runs: Vec::new(),
            pending: None,
        }
    }

    /// Record one long-name slot.
    pub(crate) fn push(&mut self, on_disk: &OnDiskDirEntry) {
        let checksum = on_disk.lfn_checksum();
        let (run1, run2, run3) = on_disk.lfn_name_runs();

        let mut fragment = Fragment::new();
        for run in [run1, run2, run3] {
            for byte in run {
                if *byte == 0xFF {
                    break;
                }
                // Capacity equals the three runs combined.
                fragment.push(*byte).unwrap();
            }
        }

        let run = match self.runs.iter_mut().find(|r| r.checksum == checksum) {
            Some(run) => run,
            None => {
                self.runs.push(LongNameRun {
                    checksum,
                    fragments: heapless::Vec::new(),
                });
                self.runs.last_mut().unwrap()
            }
        };
        // A name longer than the format allows is truncated rather than
        // grown past the fragment bound.
        run.fragments.push(fragment).ok();

        if on_disk.lfn_ordinal() & 0x3F == 1 {
            self.pending = Some(checksum);
        }
    }

    /// Hand back the reassembled name for the short entry that follows a
    /// completed run, if there is one, draining its bucket.
    pub(crate) fn take_pending(&mut self) -> Option<String> {
        let checksum = self.pending.take()?;
        let idx = self.runs.iter().position(|r| r.checksum == checksum)?;
        let run = self.runs.swap_remove(idx);
        Some(run.build())
    }
}


// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
