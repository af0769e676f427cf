use std::fmt;
use std::io;

use log::{debug, trace, warn};

use crate::disk::error::DiskError;
use crate::disk::geometry;
use crate::disk::header::DiskKind;
use crate::util::ByteReader;

/// Every track block starts with a 256-byte track information block.
pub const TRACK_INFO_SIZE: usize = 0x100;

const TRACK_TAG: &[u8] = b"Track-Info";
const TRACK_NUMBER_OFFSET: usize = 0x10;
const SIDE_NUMBER_OFFSET: usize = 0x11;
const SECTOR_SIZE_OFFSET: usize = 0x14;
const SECTOR_COUNT_OFFSET: usize = 0x15;
const GAP3_OFFSET: usize = 0x16;
const FILLER_OFFSET: usize = 0x17;
const SECTOR_INFO_OFFSET: usize = 0x18;
const SECTOR_INFO_SIZE: usize = 8;

/// The number of sector information entries that fit in a track information
/// block.
pub const MAX_SECTORS: usize = (TRACK_INFO_SIZE - SECTOR_INFO_OFFSET) / SECTOR_INFO_SIZE;

/// The uPD765 sector ID: cylinder (C), head (H), record (R) and size code
/// (N), as recorded in the sector's address mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectorId {
    pub track: u8,
    pub side: u8,
    pub id: u8,
    pub size_code: u8,
}

#[derive(Clone, PartialEq)]
pub struct Sector {
    pub id: SectorId,
    /// FDC status register 1 after reading this sector.
    pub status1: u8,
    /// FDC status register 2 after reading this sector.
    pub status2: u8,
    pub data: Vec<u8>,
}

impl fmt::Debug for Sector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Sector {{ id: 0x{:02x}, c: {}, h: {}, n: {}, st1: 0x{:02x}, st2: 0x{:02x}, {} bytes }}",
            self.id.id,
            self.id.track,
            self.id.side,
            self.id.size_code,
            self.status1,
            self.status2,
            self.data.len()
        )
    }
}

/// An anomaly found while decoding a track.  These are tolerated, since
/// partially-written images are common, but must be reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackWarning {
    /// The track declares no sectors.
    Blank,
    /// Fewer (or more) sectors were read than the track declares.
    Short { declared: usize, read: usize },
}

impl fmt::Display for TrackWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrackWarning::Blank => f.write_str("track is blank"),
            TrackWarning::Short { declared, read } => {
                write!(f, "only {} of {} sectors read", read, declared)
            }
        }
    }
}

/// One physical track: a side/cylinder pair and its sectors in file order.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub track: u8,
    pub side: u8,
    pub size_code: u8,
    /// The sector count declared by the track information block.  This may
    /// differ from `sectors.len()` on truncated images.
    pub sector_count: u8,
    pub gap3: u8,
    pub filler: u8,
    pub sectors: Vec<Sector>,
}

impl Track {
    /// An unformatted track, as listed with a zero size in an extended
    /// image's track table.
    pub(super) fn unformatted(track: u8, side: u8) -> Track {
        Track {
            track,
            side,
            size_code: 0,
            sector_count: 0,
            gap3: 0,
            filler: 0,
            sectors: vec![],
        }
    }

    /// Decode one track block of `block_size` bytes from the reader.  Returns
    /// `None` if the reader is exhausted before a track information block
    /// could be read.  A block cut short by the end of the image yields a
    /// track holding only the sectors that were read completely.
    pub(super) fn read(
        reader: &mut ByteReader,
        kind: DiskKind,
        block_size: usize,
    ) -> io::Result<Option<Track>> {
        let start = reader.offset();
        let info = match reader.take(TRACK_INFO_SIZE) {
            Some(info) => info,
            None => return Ok(None),
        };
        if !info.starts_with(TRACK_TAG) {
            warn!("track block at offset 0x{:x} has no track information tag", start);
        }

        let mut track = Track {
            track: info[TRACK_NUMBER_OFFSET],
            side: info[SIDE_NUMBER_OFFSET],
            size_code: info[SECTOR_SIZE_OFFSET],
            sector_count: info[SECTOR_COUNT_OFFSET],
            gap3: info[GAP3_OFFSET],
            filler: info[FILLER_OFFSET],
            sectors: vec![],
        };

        let declared = track.sector_count as usize;
        if declared > MAX_SECTORS {
            warn!(
                "side {} track {} declares {} sectors; only {} can be described",
                track.side, track.track, declared, MAX_SECTORS
            );
        }

        if declared > 0 {
            let sector_size = track
                .sector_size()
                .ok_or_else(|| DiskError::UnknownSectorSize(track.size_code).to_io_error())?;

            for index in 0..declared.min(MAX_SECTORS) {
                let entry = &info[SECTOR_INFO_OFFSET + index * SECTOR_INFO_SIZE..]
                    [..SECTOR_INFO_SIZE];
                let data_length = match kind {
                    DiskKind::Extended => match u16::from_le_bytes([entry[6], entry[7]]) {
                        0 => sector_size,
                        length => length as usize,
                    },
                    DiskKind::Standard => sector_size,
                };
                let data = match reader.take(data_length) {
                    Some(data) => data,
                    None => break,
                };
                track.sectors.push(Sector {
                    id: SectorId {
                        track: entry[0],
                        side: entry[1],
                        id: entry[2],
                        size_code: entry[3],
                    },
                    status1: entry[4],
                    status2: entry[5],
                    data: data.to_vec(),
                });
            }
        }

        // Sector data may be followed by padding up to the block size.
        let consumed = reader.offset() - start;
        if block_size > consumed {
            reader.skip(block_size - consumed);
        }

        trace!(
            "side {} track {}: {} of {} sectors",
            track.side,
            track.track,
            track.sectors.len(),
            declared
        );
        // Blank and short tracks are reported through `Disk::warnings`.
        if let Some(warning) = track.warning() {
            debug!("side {} track {}: {}", track.side, track.track, warning);
        }
        Ok(Some(track))
    }

    /// The size in bytes of this track's sectors, if its size code is known.
    #[inline]
    pub fn sector_size(&self) -> Option<usize> {
        geometry::sector_size(self.size_code)
    }

    /// The id of the first sector in file order.
    pub fn first_sector_id(&self) -> Option<u8> {
        self.sectors.first().map(|s| s.id.id)
    }

    /// Report whether the track is blank or holds a different number of
    /// sectors than it declares.
    pub fn warning(&self) -> Option<TrackWarning> {
        let declared = self.sector_count as usize;
        if declared == 0 && self.sectors.is_empty() {
            Some(TrackWarning::Blank)
        } else if declared != self.sectors.len() {
            Some(TrackWarning::Short {
                declared,
                read: self.sectors.len(),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SIDE {}, TRACK {:02}: ", self.side, self.track)?;
        if self.sector_count == 0 {
            write!(f, "[Track is blank] ")?;
        }
        write!(f, "{:02} sectors", self.sector_count)?;
        match self.sector_size() {
            Some(size) => write!(f, " ({} bytes)", size)?,
            None => write!(f, " (size code 0x{:02x})", self.size_code)?,
        }
        if let Some(TrackWarning::Short { read, .. }) = self.warning() {
            write!(f, " WARNING only {} sectors read", read)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a standard track block with `sector_count` declared sectors of
    /// 512 bytes, ids starting at 0xC1, each filled with `fill`.
    pub(crate) fn track_block(track: u8, side: u8, sector_count: u8, fill: u8) -> Vec<u8> {
        let mut block = vec![0u8; TRACK_INFO_SIZE];
        block[..12].copy_from_slice(b"Track-Info\r\n");
        block[TRACK_NUMBER_OFFSET] = track;
        block[SIDE_NUMBER_OFFSET] = side;
        block[SECTOR_SIZE_OFFSET] = 2;
        block[SECTOR_COUNT_OFFSET] = sector_count;
        block[GAP3_OFFSET] = 0x4E;
        block[FILLER_OFFSET] = 0xE5;
        for i in 0..sector_count as usize {
            let entry = SECTOR_INFO_OFFSET + i * SECTOR_INFO_SIZE;
            block[entry] = track;
            block[entry + 1] = side;
            block[entry + 2] = 0xC1 + i as u8;
            block[entry + 3] = 2;
        }
        block.extend(vec![fill; sector_count as usize * 512]);
        block
    }

    #[test]
    fn test_read_track() {
        let block = track_block(3, 0, 9, 0xE5);
        let mut reader = ByteReader::new(&block);
        let track = Track::read(&mut reader, DiskKind::Standard, 0x1300)
            .unwrap()
            .unwrap();
        assert_eq!(track.track, 3);
        assert_eq!(track.side, 0);
        assert_eq!(track.sector_count, 9);
        assert_eq!(track.sector_size(), Some(512));
        assert_eq!(track.gap3, 0x4E);
        assert_eq!(track.sectors.len(), 9);
        assert_eq!(track.first_sector_id(), Some(0xC1));
        assert_eq!(track.sectors[8].id.id, 0xC9);
        assert!(track.sectors.iter().all(|s| s.data == vec![0xE5; 512]));
        assert_eq!(track.warning(), None);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(track.to_string(), "SIDE 0, TRACK 03: 09 sectors (512 bytes)");
    }

    #[test]
    fn test_truncated_track() {
        let block = track_block(0, 0, 9, 0x00);
        // Keep seven whole sectors and half of the eighth.
        let truncated = &block[..TRACK_INFO_SIZE + 7 * 512 + 256];
        let mut reader = ByteReader::new(truncated);
        let track = Track::read(&mut reader, DiskKind::Standard, 0x1300)
            .unwrap()
            .unwrap();
        assert_eq!(track.sectors.len(), 7);
        assert_eq!(
            track.warning(),
            Some(TrackWarning::Short {
                declared: 9,
                read: 7
            })
        );
        assert_eq!(
            track.to_string(),
            "SIDE 0, TRACK 00: 09 sectors (512 bytes) WARNING only 7 sectors read"
        );
    }

    #[test]
    fn test_blank_track() {
        let block = track_block(5, 1, 0, 0);
        let mut reader = ByteReader::new(&block);
        let track = Track::read(&mut reader, DiskKind::Standard, 0x100)
            .unwrap()
            .unwrap();
        assert_eq!(track.warning(), Some(TrackWarning::Blank));
        assert_eq!(
            track.to_string(),
            "SIDE 1, TRACK 05: [Track is blank] 00 sectors (512 bytes)"
        );
    }

    #[test]
    fn test_unknown_sector_size() {
        let mut block = track_block(0, 0, 1, 0);
        block[SECTOR_SIZE_OFFSET] = 0x09;
        let mut reader = ByteReader::new(&block);
        let error = Track::read(&mut reader, DiskKind::Standard, 0x300).unwrap_err();
        assert_eq!(
            DiskError::from_io_error(&error),
            Some(DiskError::UnknownSectorSize(0x09))
        );
    }

    #[test]
    fn test_extended_sector_lengths() {
        let mut block = track_block(0, 0, 2, 0x11);
        // The first sector only stores 256 bytes of data.
        let entry = SECTOR_INFO_OFFSET;
        block[entry + 6] = 0x00;
        block[entry + 7] = 0x01;
        block.truncate(TRACK_INFO_SIZE + 256 + 512);
        let mut reader = ByteReader::new(&block);
        let track = Track::read(&mut reader, DiskKind::Extended, block.len())
            .unwrap()
            .unwrap();
        assert_eq!(track.sectors[0].data.len(), 256);
        assert_eq!(track.sectors[1].data.len(), 512);
        assert_eq!(track.warning(), None);
    }

    #[test]
    fn test_exhausted_reader() {
        let mut reader = ByteReader::new(&[0u8; 0x80]);
        assert!(Track::read(&mut reader, DiskKind::Standard, 0x1300)
            .unwrap()
            .is_none());
    }
}
