//! The AMSDOS `CAT` listing: one entry per file, sizes in kilobytes, and the
//! free space left on the disk.

use std::fmt;

use log::trace;

use crate::cpm::directory::{display_bytes, DirectoryRecord, NAME_SIZE, TYPE_SIZE};
use crate::cpm::dpb::DiskParameterBlock;

const DEFAULT_DRIVE: char = 'A';

/// One logical file, with the counts of all its extents summed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: [u8; NAME_SIZE],
    pub file_type: [u8; TYPE_SIZE],
    pub blocks: usize,
    /// 128-byte records, summed from each extent's RC.
    pub records: usize,
}

impl CatalogEntry {
    fn new(record: &DirectoryRecord, blocks: usize) -> CatalogEntry {
        CatalogEntry {
            name: record.name,
            file_type: record.file_type,
            blocks,
            records: record.record_count as usize,
        }
    }

    /// Return true if `record` is an extent of this file.  Names compare as
    /// stored, attribute bits included.
    #[inline]
    fn matches(&self, record: &DirectoryRecord) -> bool {
        self.name == record.name && self.file_type == record.file_type
    }

    #[inline]
    fn sort_key(&self) -> ([u8; NAME_SIZE], [u8; TYPE_SIZE]) {
        (self.name, self.file_type)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    pub drive: char,
    pub user: u8,
    /// Free allocation blocks.  Signed, since a directory claiming more blocks
    /// than the disk holds drives it negative.
    pub free_blocks: i32,
    pub block_size: usize,
    /// Entries sorted by name, then type.
    pub entries: Vec<CatalogEntry>,
    /// Whether any extents were merged while building the catalog.
    pub merged: bool,
}

impl Catalog {
    /// Build the catalog from directory records in on-disk order.  Runs of
    /// adjacent records with the same name and type become one entry; a
    /// repeat of a name further down the directory is a separate entry.
    ///
    /// Free space starts at DSM and every record's blocks are subtracted as
    /// it is read.  If any records were merged, one more block is subtracted
    /// at the end, matching the figure AMSDOS tools have always printed.
    pub fn build(records: &[DirectoryRecord], dpb: &DiskParameterBlock) -> Catalog {
        let width = dpb.pointer_width();
        let mut free_blocks = dpb.dsm as i32;
        let mut merged = false;
        let mut entries: Vec<CatalogEntry> = vec![];

        for record in records {
            let blocks = record.block_count(width);
            free_blocks -= blocks as i32;

            match entries.last_mut() {
                Some(entry) if entry.matches(record) => {
                    trace!(
                        "merging extent {} of {}.{}",
                        record.extent(),
                        record.name_string(),
                        record.type_string()
                    );
                    entry.blocks += blocks;
                    entry.records += record.record_count as usize;
                    merged = true;
                }
                _ => entries.push(CatalogEntry::new(record, blocks)),
            }
        }

        if merged {
            free_blocks -= 1;
        }
        entries.sort_by_key(CatalogEntry::sort_key);

        Catalog {
            drive: DEFAULT_DRIVE,
            user: records.first().map(|r| r.user).unwrap_or(0),
            free_blocks,
            block_size: dpb.block_size(),
            entries,
            merged,
        }
    }

    /// Convert a block count to kilobytes for display.
    #[inline]
    pub fn kilobytes(&self, blocks: i64) -> i64 {
        blocks * self.block_size as i64 / 1024
    }

    #[inline]
    pub fn free_kilobytes(&self) -> i64 {
        self.kilobytes(self.free_blocks as i64)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Drive {}: user {:2}", self.drive, self.user)?;
        writeln!(f)?;
        for entry in self.entries.iter() {
            writeln!(
                f,
                "{}.{} {:3}K",
                display_bytes(&entry.name),
                display_bytes(&entry.file_type),
                self.kilobytes(entry.blocks as i64)
            )?;
        }
        writeln!(f)?;
        write!(f, "{:3}K free", self.free_kilobytes())
    }
}

/// A plain listing of every directory record in on-disk order, without
/// merging.  Free space is DSM less every listed block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryListing {
    pub user: u8,
    pub block_size: usize,
    pub free_blocks: i32,
    /// Each record with its block count.
    pub records: Vec<(DirectoryRecord, usize)>,
}

impl DirectoryListing {
    pub fn build(records: &[DirectoryRecord], dpb: &DiskParameterBlock) -> DirectoryListing {
        let width = dpb.pointer_width();
        let records: Vec<(DirectoryRecord, usize)> = records
            .iter()
            .map(|r| (r.clone(), r.block_count(width)))
            .collect();
        let used: usize = records.iter().map(|(_, blocks)| blocks).sum();
        DirectoryListing {
            user: records.first().map(|(r, _)| r.user).unwrap_or(0),
            block_size: dpb.block_size(),
            free_blocks: dpb.dsm as i32 - used as i32,
            records,
        }
    }
}

impl fmt::Display for DirectoryListing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kilobytes = |blocks: i64| blocks * self.block_size as i64 / 1024;
        writeln!(f, "Drive {}: user {}", DEFAULT_DRIVE, self.user)?;
        writeln!(f)?;
        for (record, blocks) in self.records.iter() {
            writeln!(
                f,
                "{}.{} {:3}K  {} extent {}",
                record.name_string(),
                record.type_string(),
                kilobytes(*blocks as i64),
                record.attributes(),
                record.extent()
            )?;
        }
        writeln!(f)?;
        write!(f, "{:3}K free", kilobytes(self.free_blocks as i64))
    }
}
