//! The CP/M 2.2/3 filesystem as found on Amstrad CPC, PCW and Spectrum +3
//! disks.  Everything here is read-only and derived from a decoded `Disk`.

pub mod catalog;
pub mod directory;
pub mod dpb;

use std::io;

use log::debug;

use crate::disk::Disk;

pub use self::catalog::{Catalog, CatalogEntry, DirectoryListing};
pub use self::directory::{DirectoryRecord, FileAttributes, PointerWidth};
pub use self::dpb::{DiskFamily, DiskParameterBlock, DpbVariant};

/// The fixed parameters of a CP/M disk format.  These are chosen by the
/// machine's BIOS and are not recorded anywhere on the disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpmFormat {
    pub name: &'static str,
    /// Allocation block size in bytes.
    pub block_size: usize,
    /// The directory capacity (DRM + 1).
    pub directory_entries: usize,
    /// The uPD765A read/write gap the BIOS uses for this format.
    pub read_write_gap: u8,
}

/// The format shared by the CPC data and system formats and the PCW/+3
/// single-sided format: 1K blocks and a 64-entry directory.
pub static AMSTRAD: CpmFormat = CpmFormat {
    name: "AMSDOS",
    block_size: 1024,
    directory_entries: 64,
    read_write_gap: 0x2A,
};

/// The CP/M view of one disk: its directory records and the DPB derived for
/// it.
#[derive(Clone, Debug, PartialEq)]
pub struct AmsDos {
    pub format: &'static CpmFormat,
    pub dpb: DiskParameterBlock,
    /// The file entries of the directory, in on-disk order.
    pub records: Vec<DirectoryRecord>,
}

impl AmsDos {
    /// Read the filesystem of an Amstrad format disk.
    pub fn new(disk: &Disk) -> io::Result<AmsDos> {
        AmsDos::with_format(disk, &AMSTRAD)
    }

    /// Read the filesystem using the parameters of `format`.  The directory is
    /// read from the first track in the image.
    pub fn with_format(disk: &Disk, format: &'static CpmFormat) -> io::Result<AmsDos> {
        let track = disk.first_track()?;
        let records = directory::read_directory(track, format)?;
        let dpb = DiskParameterBlock::derive(disk, format, records.len())?;
        debug!(
            "{}: {} directory records, {} blocks of {} bytes",
            format.name,
            records.len(),
            dpb.total_blocks(),
            dpb.block_size()
        );
        Ok(AmsDos {
            format,
            dpb,
            records,
        })
    }

    /// The merged, sorted catalog, as the AMSDOS `CAT` command shows it.
    pub fn catalog(&self) -> Catalog {
        Catalog::build(&self.records, &self.dpb)
    }

    /// Every directory record, unmerged and in on-disk order.
    pub fn listing(&self) -> DirectoryListing {
        DirectoryListing::build(&self.records, &self.dpb)
    }
}
