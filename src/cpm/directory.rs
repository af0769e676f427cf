//! CP/M directories

use std::fmt;
use std::io;

use log::{debug, trace};

use crate::cpm::CpmFormat;
use crate::disk::{DiskError, Track};

/// Every directory entry (extent) is 32 bytes.
pub const ENTRY_SIZE: usize = 32;
/// User number of a deleted or never-used entry; also the format filler.
pub const DELETED: u8 = 0xE5;
/// Largest user number a file entry can carry.
pub const MAX_USER: u8 = 31;

pub const NAME_SIZE: usize = 8;
pub const TYPE_SIZE: usize = 3;
pub const ALLOCATION_SIZE: usize = 16;

const ENTRY_USER_OFFSET: usize = 0x00;
const ENTRY_NAME_OFFSET: usize = 0x01;
const ENTRY_TYPE_OFFSET: usize = 0x09;
const ENTRY_EXTENT_LOW_OFFSET: usize = 0x0C;
const ENTRY_S1_OFFSET: usize = 0x0D;
const ENTRY_EXTENT_HIGH_OFFSET: usize = 0x0E;
const ENTRY_RECORD_COUNT_OFFSET: usize = 0x0F;
const ENTRY_ALLOCATION_OFFSET: usize = 0x10;

const ATTRIBUTE_MASK: u8 = 0x80;

/// The width of the block numbers in an entry's allocation area.  Disks with
/// fewer than 256 blocks use sixteen 8-bit numbers, larger disks eight 16-bit
/// numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerWidth {
    Byte,
    Word,
}

/// The file attributes CP/M keeps in the high bits of the type bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileAttributes {
    /// T1': the file cannot be written or erased.
    pub read_only: bool,
    /// T2': the file is hidden from directory listings.
    pub system: bool,
    /// T3': the file has not changed since it was last backed up.
    pub archive: bool,
}

impl fmt::Display for FileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read_only { 'R' } else { '-' },
            if self.system { 'S' } else { '-' },
            if self.archive { 'A' } else { '-' },
        )
    }
}

/// One 32-byte directory entry.  Names and types are kept as raw bytes,
/// attribute bits included, so that entries compare exactly as stored.
#[derive(Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub user: u8,
    pub name: [u8; NAME_SIZE],
    pub file_type: [u8; TYPE_SIZE],
    /// EX: low five bits of the extent number.
    pub extent_low: u8,
    /// S1: reserved (last record byte count under CP/M 3).
    pub s1: u8,
    /// S2: high bits of the extent number.
    pub extent_high: u8,
    /// RC: number of 128-byte records used in this extent.
    pub record_count: u8,
    pub allocation: [u8; ALLOCATION_SIZE],
}

impl DirectoryRecord {
    /// Parse a 32-byte directory entry.
    pub fn from_bytes(bytes: &[u8]) -> DirectoryRecord {
        assert_eq!(bytes.len(), ENTRY_SIZE);
        let mut name = [0u8; NAME_SIZE];
        name.copy_from_slice(&bytes[ENTRY_NAME_OFFSET..ENTRY_NAME_OFFSET + NAME_SIZE]);
        let mut file_type = [0u8; TYPE_SIZE];
        file_type.copy_from_slice(&bytes[ENTRY_TYPE_OFFSET..ENTRY_TYPE_OFFSET + TYPE_SIZE]);
        let mut allocation = [0u8; ALLOCATION_SIZE];
        allocation.copy_from_slice(
            &bytes[ENTRY_ALLOCATION_OFFSET..ENTRY_ALLOCATION_OFFSET + ALLOCATION_SIZE],
        );
        DirectoryRecord {
            user: bytes[ENTRY_USER_OFFSET],
            name,
            file_type,
            extent_low: bytes[ENTRY_EXTENT_LOW_OFFSET],
            s1: bytes[ENTRY_S1_OFFSET],
            extent_high: bytes[ENTRY_EXTENT_HIGH_OFFSET],
            record_count: bytes[ENTRY_RECORD_COUNT_OFFSET],
            allocation,
        }
    }

    /// Entries with user numbers 0-31 describe files.  Everything else,
    /// including `DELETED`, is not part of the catalog.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.user <= MAX_USER
    }

    pub fn attributes(&self) -> FileAttributes {
        FileAttributes {
            read_only: self.file_type[0] & ATTRIBUTE_MASK != 0,
            system: self.file_type[1] & ATTRIBUTE_MASK != 0,
            archive: self.file_type[2] & ATTRIBUTE_MASK != 0,
        }
    }

    /// The extent number, combined from EX and S2.
    pub fn extent(&self) -> u16 {
        ((self.extent_high as u16 & 0x3F) << 5) | (self.extent_low as u16 & 0x1F)
    }

    /// The block numbers in the allocation area.  Zero marks an unused slot
    /// and is never returned.
    pub fn blocks(&self, width: PointerWidth) -> Vec<u16> {
        match width {
            PointerWidth::Byte => self
                .allocation
                .iter()
                .map(|&b| b as u16)
                .filter(|&b| b != 0)
                .collect(),
            PointerWidth::Word => self
                .allocation
                .chunks(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .filter(|&b| b != 0)
                .collect(),
        }
    }

    /// The number of used slots in the allocation area.
    pub fn block_count(&self, width: PointerWidth) -> usize {
        self.blocks(width).len()
    }

    /// The name with attribute bits stripped and padding kept.
    pub fn name_string(&self) -> String {
        display_bytes(&self.name)
    }

    /// The type with attribute bits stripped and padding kept.
    pub fn type_string(&self) -> String {
        display_bytes(&self.file_type)
    }
}

impl fmt::Debug for DirectoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "DirectoryRecord {{ user: {}, name: \"{}.{}\", attributes: {}, extent: {}, records: {}, allocation: {:02x?} }}",
            self.user,
            self.name_string(),
            self.type_string(),
            self.attributes(),
            self.extent(),
            self.record_count,
            self.allocation
        )
    }
}

/// Render name or type bytes for display, masking off attribute bits.
pub fn display_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b & !ATTRIBUTE_MASK {
            c @ 0x20..=0x7E => c as char,
            _ => '?',
        })
        .collect()
}

/// The number of sectors at the start of the track that hold the directory.
pub fn directory_sectors(format: &CpmFormat, sector_size: usize) -> usize {
    (format.directory_entries * ENTRY_SIZE + sector_size - 1) / sector_size
}

/// Decode the directory held in the first sectors of `track`.  The sectors'
/// data is concatenated in file order and cut into 32-byte entries until the
/// data runs out; entries that do not describe files are dropped.  A short
/// track yields a shorter directory, not an error.
///
/// Whole sectors are read, so when a sector holds more than the format's
/// directory capacity (4096-byte sectors hold 128 entries) the entries past
/// the capacity are decoded too.
pub fn read_directory(track: &Track, format: &CpmFormat) -> io::Result<Vec<DirectoryRecord>> {
    let sector_size = track
        .sector_size()
        .ok_or_else(|| DiskError::UnknownSectorSize(track.size_code).to_io_error())?;
    let count = directory_sectors(format, sector_size);

    let buffer: Vec<u8> = track
        .sectors
        .iter()
        .take(count)
        .flat_map(|s| s.data.iter().cloned())
        .collect();

    let records: Vec<DirectoryRecord> = buffer
        .chunks_exact(ENTRY_SIZE)
        .map(DirectoryRecord::from_bytes)
        .filter(|record| {
            if !record.is_file() {
                trace!("dropping directory entry with user 0x{:02x}", record.user);
            }
            record.is_file()
        })
        .collect();

    debug!(
        "directory: {} bytes from {} sectors, {} file entries",
        buffer.len(),
        count.min(track.sectors.len()),
        records.len()
    );
    Ok(records)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cpm::AMSTRAD;
    use crate::disk::{Sector, SectorId};

    /// Build a raw directory entry.
    pub(crate) fn entry(user: u8, name: &str, file_type: &str, blocks: &[u8]) -> [u8; ENTRY_SIZE] {
        let mut bytes = [0u8; ENTRY_SIZE];
        bytes[ENTRY_USER_OFFSET] = user;
        let name = format!("{:8}", name);
        let file_type = format!("{:3}", file_type);
        bytes[ENTRY_NAME_OFFSET..ENTRY_NAME_OFFSET + NAME_SIZE].copy_from_slice(name.as_bytes());
        bytes[ENTRY_TYPE_OFFSET..ENTRY_TYPE_OFFSET + TYPE_SIZE]
            .copy_from_slice(file_type.as_bytes());
        bytes[ENTRY_RECORD_COUNT_OFFSET] = (blocks.len() * 8).min(0x80) as u8;
        bytes[ENTRY_ALLOCATION_OFFSET..ENTRY_ALLOCATION_OFFSET + blocks.len()]
            .copy_from_slice(blocks);
        bytes
    }

    fn directory_track(entries: &[[u8; ENTRY_SIZE]], sectors: usize) -> Track {
        let mut data = vec![DELETED; sectors * 512];
        for (i, e) in entries.iter().enumerate() {
            data[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE].copy_from_slice(e);
        }
        Track {
            track: 0,
            side: 0,
            size_code: 2,
            sector_count: 9,
            gap3: 0x52,
            filler: DELETED,
            sectors: data
                .chunks(512)
                .enumerate()
                .map(|(i, chunk)| Sector {
                    id: SectorId {
                        track: 0,
                        side: 0,
                        id: 0xC1 + i as u8,
                        size_code: 2,
                    },
                    status1: 0,
                    status2: 0,
                    data: chunk.to_vec(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_directory_record() {
        let mut bytes = entry(3, "GAME", "BAS", &[2, 3, 0, 4]);
        bytes[ENTRY_TYPE_OFFSET] |= 0x80;
        bytes[ENTRY_TYPE_OFFSET + 2] |= 0x80;
        bytes[ENTRY_EXTENT_LOW_OFFSET] = 0x03;
        bytes[ENTRY_EXTENT_HIGH_OFFSET] = 0x01;
        let record = DirectoryRecord::from_bytes(&bytes);
        assert_eq!(record.user, 3);
        assert_eq!(&record.name, b"GAME    ");
        assert_eq!(record.file_type, [b'B' | 0x80, b'A', b'S' | 0x80]);
        assert_eq!(record.name_string(), "GAME    ");
        assert_eq!(record.type_string(), "BAS");
        assert_eq!(
            record.attributes(),
            FileAttributes {
                read_only: true,
                system: false,
                archive: true
            }
        );
        assert_eq!(record.attributes().to_string(), "R-A");
        assert_eq!(record.extent(), 35);
        assert_eq!(record.blocks(PointerWidth::Byte), vec![2, 3, 4]);
        assert_eq!(record.block_count(PointerWidth::Byte), 3);
        // As 16-bit numbers the same bytes are 0x0302 and 0x0400.
        assert_eq!(record.blocks(PointerWidth::Word), vec![0x0302, 0x0400]);
    }

    #[test]
    fn test_directory_sectors() {
        assert_eq!(directory_sectors(&AMSTRAD, 512), 4);
        assert_eq!(directory_sectors(&AMSTRAD, 256), 8);
        assert_eq!(directory_sectors(&AMSTRAD, 1024), 2);
        assert_eq!(directory_sectors(&AMSTRAD, 8192), 1);
    }

    #[test]
    fn test_read_directory() {
        let entries = [
            entry(0, "GAME", "BAS", &[2, 3, 4]),
            entry(DELETED, "OLD", "BAK", &[5]),
            entry(0x20, "LABEL", "", &[]),
            entry(31, "LAST", "USR", &[6]),
        ];
        let track = directory_track(&entries, 9);
        let records = read_directory(&track, &AMSTRAD).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0].name, b"GAME    ");
        assert_eq!(records[1].user, 31);
    }

    #[test]
    fn test_all_deleted_directory() {
        let track = directory_track(&[], 9);
        assert!(read_directory(&track, &AMSTRAD).unwrap().is_empty());
    }

    #[test]
    fn test_directory_beyond_capacity_is_ignored() {
        // The fifth sector is not part of the directory.
        let mut entries = vec![[DELETED; ENTRY_SIZE]; 64];
        entries.push(entry(0, "HIDDEN", "BIN", &[9]));
        let track = directory_track(&entries, 9);
        assert!(read_directory(&track, &AMSTRAD).unwrap().is_empty());
    }

    #[test]
    fn test_large_sector_directory() {
        let mut track = directory_track(&[], 9);
        track.size_code = 5;
        track.sector_count = 1;
        let mut data = vec![DELETED; 4096];
        for i in 0..128 {
            data[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE]
                .copy_from_slice(&entry(0, &format!("F{}", i), "", &[]));
        }
        track.sectors.truncate(1);
        track.sectors[0].data = data;
        assert_eq!(directory_sectors(&AMSTRAD, 4096), 1);
        // One sector is read whole: 128 entries against a capacity of 64.
        let records = read_directory(&track, &AMSTRAD).unwrap();
        assert_eq!(records.len(), 128);
        assert_eq!(records[127].name_string(), "F127    ");
    }

    #[test]
    fn test_short_directory_track() {
        let entries = [entry(1, "A", "", &[2])];
        let mut track = directory_track(&entries, 2);
        track.sectors[1].data.truncate(100);
        // 512 bytes from the first sector and 100 from the second: the
        // trailing partial entry is ignored.
        let records = read_directory(&track, &AMSTRAD).unwrap();
        assert_eq!(records.len(), 1);
    }
}
