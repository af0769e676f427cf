//! The disk parameter block (DPB).
//!
//! CP/M does not store its DPB on disk; the BIOS supplies it.  Amstrad
//! machines pick one of a handful of fixed formats, so the DPB is
//! reconstructed here from the decoded geometry, the format's fixed block
//! size and directory capacity, and the number of directory entries in use.

use std::fmt;
use std::io;

use log::{debug, warn};

use crate::cpm::directory::PointerWidth;
use crate::cpm::CpmFormat;
use crate::disk::geometry::{self, RECORD_SIZE};
use crate::disk::{Disk, DiskError};

/// DSM must not exceed this value.
pub const MAX_DSM: usize = 0x7FFF;

/// The allocation bitmap (AL0/AL1) has one bit per directory block.
const BITMAP_BITS: usize = 16;

const MEDIA_SINGLE_SIDED: u8 = 0;
const MEDIA_DOUBLE_SIDED_ALTERNATE: u8 = 1;

/// Which of the DPB's fields are meaningful.  One DPB type carries the
/// superset of the CP/M 2.2, CP/M 3 and Amstrad extended fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DpbVariant {
    /// The CP/M 2.2 fields only.  Used for 128-byte sectors, which need no
    /// physical record translation.
    Cpm22,
    /// CP/M 2.2 fields plus PSH/PHM.
    Cpm3,
    /// CP/M 3 fields plus the Amstrad extended (XDPB) fields.
    AmstradExtended,
}

impl DpbVariant {
    #[inline]
    pub fn has_physical_fields(&self) -> bool {
        *self != DpbVariant::Cpm22
    }

    #[inline]
    pub fn has_extended_fields(&self) -> bool {
        *self == DpbVariant::AmstradExtended
    }
}

/// Amstrad machines identify a disk's format from the id of the first
/// physical sector on track 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiskFamily {
    /// CPC data format: sectors 0xC1-0xC9, no reserved tracks.
    CpcData,
    /// CPC system format: sectors 0x41-0x49, two reserved tracks.
    CpcSystem,
    /// PCW / Spectrum +3 format: sectors 0x01-0x09, one reserved track.
    PcwSpectrum,
    Unknown,
}

impl DiskFamily {
    pub fn from_first_sector(id: u8) -> DiskFamily {
        match id {
            0xC1 => DiskFamily::CpcData,
            0x41 => DiskFamily::CpcSystem,
            0x01 => DiskFamily::PcwSpectrum,
            _ => DiskFamily::Unknown,
        }
    }
}

impl fmt::Display for DiskFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            DiskFamily::CpcData => "CPC data",
            DiskFamily::CpcSystem => "CPC system",
            DiskFamily::PcwSpectrum => "PCW/Spectrum +3",
            DiskFamily::Unknown => "unknown",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiskParameterBlock {
    pub variant: DpbVariant,

    /// SPT: 128-byte records per track.
    pub spt: u16,
    /// BSH: block shift, records per block = 1 << bsh.
    pub bsh: u8,
    /// BLM: block mask, records per block - 1.
    pub blm: u8,
    /// EXM: extent mask.
    pub exm: u8,
    /// DSM: the highest block number, i.e. total blocks - 1.
    pub dsm: u16,
    /// DRM: directory entries - 1.
    pub drm: u16,
    /// AL0/AL1: blocks reserved for the directory, from the high bit of AL0.
    pub al0: u8,
    pub al1: u8,
    /// CKS: size of the directory check vector.
    pub cks: u16,
    /// OFF: reserved tracks before the directory.
    pub off: u16,
    /// PSH: physical record shift (CP/M 3).
    pub psh: u8,
    /// PHM: physical record mask (CP/M 3).
    pub phm: u8,

    // Amstrad extended parameters.  These describe the media and are not
    // needed to read the filesystem.
    pub family: DiskFamily,
    /// Bits 0-1: 0 single sided, 1 double sided alternating, 2 double sided
    /// successive.
    pub media_type: u8,
    pub tracks_per_side: u8,
    pub sectors_per_track: u8,
    pub first_sector_id: u8,
    pub sector_size: u16,
    /// uPD765A read/write gap length.
    pub read_write_gap: u8,
    /// uPD765A format gap length.
    pub format_gap: u8,
    /// Bit 7 multitrack, bit 6 MFM, bit 5 skip deleted data.
    pub multitrack_flags: u8,
    /// Non-zero forces this format instead of detecting one at log-in.
    pub freeze_flag: u8,
}

impl DiskParameterBlock {
    /// Derive the DPB for a decoded disk.  `directory_records` is the number
    /// of file entries found in the directory; the blocks holding them are
    /// marked as reserved.
    pub fn derive(
        disk: &Disk,
        format: &CpmFormat,
        directory_records: usize,
    ) -> io::Result<DiskParameterBlock> {
        let track = disk.first_track()?;
        let sector_size = track
            .sector_size()
            .ok_or_else(|| DiskError::UnknownSectorSize(track.size_code).to_io_error())?;
        let physical = geometry::physical_geometry(sector_size)
            .ok_or_else(|| DiskError::UnresolvedSectorSize(sector_size).to_io_error())?;
        let block = geometry::block_geometry(format.block_size)
            .ok_or_else(|| DiskError::UnsupportedBlockSize(format.block_size).to_io_error())?;

        let reserved_blocks = directory_records / block.entries_per_block + 1;
        if reserved_blocks > BITMAP_BITS {
            return Err(DiskError::DirectoryOverflow.into());
        }
        let bitmap = !0u16 << (BITMAP_BITS - reserved_blocks);

        let capacity = declared_capacity(disk, sector_size * track.sector_count as usize);
        let dsm = match (capacity / format.block_size).checked_sub(1) {
            Some(dsm) if dsm <= MAX_DSM => dsm,
            Some(_) => return Err(DiskError::CapacityOverflow.into()),
            None => return Err(DiskError::NoAllocationBlocks.into()),
        };

        let exm = if dsm < 256 {
            block.exm_small
        } else {
            match block.exm_large {
                Some(exm) => exm,
                None => {
                    warn!(
                        "{} blocks of {} bytes cannot be addressed by CP/M; using EXM 0",
                        dsm + 1,
                        format.block_size
                    );
                    0
                }
            }
        };

        let first_sector_id = track.first_sector_id().unwrap_or(0);
        let family = DiskFamily::from_first_sector(first_sector_id);
        let variant = if family != DiskFamily::Unknown {
            DpbVariant::AmstradExtended
        } else if sector_size == RECORD_SIZE {
            DpbVariant::Cpm22
        } else {
            DpbVariant::Cpm3
        };

        let dpb = DiskParameterBlock {
            variant,
            spt: (track.sector_count as usize * sector_size / RECORD_SIZE) as u16,
            bsh: block.bsh,
            blm: block.blm,
            exm,
            dsm: dsm as u16,
            drm: (format.directory_entries - 1) as u16,
            al0: (bitmap >> 8) as u8,
            al1: bitmap as u8,
            cks: 0,
            off: 0,
            psh: physical.psh,
            phm: physical.phm,
            family,
            media_type: if disk.info.sides > 1 {
                MEDIA_DOUBLE_SIDED_ALTERNATE
            } else {
                MEDIA_SINGLE_SIDED
            },
            tracks_per_side: disk.info.tracks,
            sectors_per_track: track.sector_count,
            first_sector_id,
            sector_size: sector_size as u16,
            read_write_gap: format.read_write_gap,
            format_gap: track.gap3,
            multitrack_flags: 0,
            freeze_flag: 1,
        };
        debug!(
            "derived DPB: DSM {} DRM {} reserved blocks {} ({} family)",
            dpb.dsm, dpb.drm, reserved_blocks, family
        );
        Ok(dpb)
    }

    /// Allocation block size in bytes.
    #[inline]
    pub fn block_size(&self) -> usize {
        RECORD_SIZE << self.bsh
    }

    /// Total allocation blocks, including those holding the directory.
    #[inline]
    pub fn total_blocks(&self) -> usize {
        self.dsm as usize + 1
    }

    #[inline]
    pub fn directory_entries(&self) -> usize {
        self.drm as usize + 1
    }

    /// The width of block numbers in directory entries on this disk.
    #[inline]
    pub fn pointer_width(&self) -> PointerWidth {
        if self.dsm < 256 {
            PointerWidth::Byte
        } else {
            PointerWidth::Word
        }
    }

    /// AL0 and AL1 as one 16-bit bitmap; bit 15 is block 0.
    #[inline]
    pub fn allocation_bitmap(&self) -> u16 {
        ((self.al0 as u16) << 8) | self.al1 as u16
    }

    /// The number of blocks reserved for the directory.
    pub fn reserved_blocks(&self) -> usize {
        self.allocation_bitmap().count_ones() as usize
    }

    /// Return true if `block` is reserved for the directory.
    pub fn is_reserved(&self, block: usize) -> bool {
        block < BITMAP_BITS && self.allocation_bitmap() & (0x8000 >> block) != 0
    }
}

/// The formatted capacity of the disk in bytes, from the geometry the image
/// declares rather than the data it holds.  Each track block counts at its
/// declared sector count and size.  Blocks missing from the end of the image
/// count as `full_track` bytes, the declared size of track 0, unless an
/// extended image's size table marks them unformatted.
fn declared_capacity(disk: &Disk, full_track: usize) -> usize {
    (0..disk.info.track_blocks())
        .map(|index| match disk.tracks.get(index) {
            Some(track) => track
                .sector_size()
                .map_or(0, |size| size * track.sector_count as usize),
            None => match disk.info.track_sizes.get(index) {
                Some(&0) => 0,
                _ => full_track,
            },
        })
        .sum()
}

impl fmt::Display for DiskParameterBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "SPT: {}", self.spt)?;
        writeln!(f, "BSH: {}  BLM: {}  EXM: {}", self.bsh, self.blm, self.exm)?;
        writeln!(f, "DSM: {}  DRM: {}", self.dsm, self.drm)?;
        writeln!(f, "AL0: {:08b}  AL1: {:08b}", self.al0, self.al1)?;
        write!(f, "CKS: {}  OFF: {}", self.cks, self.off)?;
        if self.variant.has_physical_fields() {
            write!(f, "\nPSH: {}  PHM: {}", self.psh, self.phm)?;
        }
        if self.variant.has_extended_fields() {
            writeln!(f)?;
            writeln!(f, "Format:     {}", self.family)?;
            writeln!(f, "Media type: {}", self.media_type)?;
            writeln!(
                f,
                "Geometry:   {} tracks, {} sectors of {} bytes, first sector 0x{:02x}",
                self.tracks_per_side, self.sectors_per_track, self.sector_size, self.first_sector_id
            )?;
            writeln!(
                f,
                "Gaps:       read/write 0x{:02x}, format 0x{:02x}",
                self.read_write_gap, self.format_gap
            )?;
            write!(
                f,
                "Flags:      multitrack 0x{:02x}, freeze {}",
                self.multitrack_flags, self.freeze_flag
            )?;
        }
        Ok(())
    }
}
