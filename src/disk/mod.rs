//! The CPCEMU "DSK" disk image container: a disk information block followed
//! by one block per track, each holding its sectors' ids and data.

mod error;
mod header;
mod image;

pub mod geometry;
pub mod track;

use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use log::debug;

use crate::util::{self, ByteReader};

pub use self::error::DiskError;
pub use self::header::{DiskInformation, DiskKind, DISK_INFO_SIZE};
pub use self::image::Image;
pub use self::track::{Sector, SectorId, Track, TrackWarning};

/// Open a disk image file read-only and decode it.
pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Disk> {
    let image = Image::open_read_only(path)?;
    Disk::from_image(&image)
}

/// An anomaly found while decoding a disk image.  Decoding still succeeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiskWarning {
    /// The image ended before all declared track blocks were read.
    MissingTracks { declared: usize, read: usize },
    /// A track is blank or short; `index` is its position in file order.
    Track { index: usize, warning: TrackWarning },
}

impl fmt::Display for DiskWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DiskWarning::MissingTracks { declared, read } => {
                write!(f, "only {} of {} tracks read", read, declared)
            }
            DiskWarning::Track { index, warning } => write!(f, "track #{}: {}", index, warning),
        }
    }
}

/// A decoded disk image.  Tracks are kept in file order: for double-sided
/// images, track 0 side 0, track 0 side 1, track 1 side 0, and so on.
#[derive(Clone, Debug, PartialEq)]
pub struct Disk {
    pub info: DiskInformation,
    pub tracks: Vec<Track>,
}

impl Disk {
    pub fn from_image(image: &Image) -> io::Result<Disk> {
        Disk::from_bytes(image.as_bytes())
    }

    /// Decode a disk image.  Track blocks are read sequentially; no offsets
    /// are computed from the header other than each block's size.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Disk> {
        let info = DiskInformation::read(bytes)?;
        debug!(
            "{} image: {} tracks, {} sides, track size {}",
            info.kind, info.tracks, info.sides, info.track_size
        );

        let mut reader = ByteReader::new(bytes);
        reader.skip(DISK_INFO_SIZE);

        let sides = info.sides.max(1) as usize;
        let mut tracks = Vec::with_capacity(info.track_blocks());
        for index in 0..info.track_blocks() {
            let block_size = match info.kind {
                DiskKind::Standard => info.track_size as usize,
                DiskKind::Extended => match info.track_sizes.get(index) {
                    Some(&size) if size > 0 => size,
                    _ => {
                        let track = Track::unformatted((index / sides) as u8, (index % sides) as u8);
                        tracks.push(track);
                        continue;
                    }
                },
            };
            match Track::read(&mut reader, info.kind, block_size)? {
                Some(track) => tracks.push(track),
                None => break,
            }
        }

        let disk = Disk { info, tracks };
        if disk.tracks.len() < disk.info.track_blocks() {
            debug!(
                "image ends after {} of {} track blocks",
                disk.tracks.len(),
                disk.info.track_blocks()
            );
        }
        Ok(disk)
    }

    /// Return the track for a cylinder and side, if it was read.
    pub fn track(&self, track: u8, side: u8) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|t| t.track == track && t.side == side)
    }

    /// Return the first track in the image, which must hold sectors for a
    /// filesystem to be read from it.
    pub fn first_track(&self) -> io::Result<&Track> {
        match self.tracks.first() {
            Some(track) if !track.sectors.is_empty() => Ok(track),
            _ => Err(DiskError::EmptyTrackOrDisk.into()),
        }
    }

    /// All warnings for this image: missing tracks, then blank or short
    /// tracks in file order.
    pub fn warnings(&self) -> Vec<DiskWarning> {
        let mut warnings = vec![];
        if self.tracks.len() < self.info.track_blocks() {
            warnings.push(DiskWarning::MissingTracks {
                declared: self.info.track_blocks(),
                read: self.tracks.len(),
            });
        }
        warnings.extend(
            self.tracks
                .iter()
                .enumerate()
                .filter_map(|(index, t)| t.warning().map(|warning| DiskWarning::Track { index, warning })),
        );
        warnings
    }

    /// Write a hex dump of the selected tracks (all tracks if `selection` is
    /// `None`) to the provided writer.
    pub fn dump(&self, writer: &mut dyn Write, selection: Option<(u8, u8)>) -> io::Result<()> {
        let tracks = self.tracks.iter().filter(|t| match selection {
            Some((track, side)) => t.track == track && t.side == side,
            None => true,
        });
        for track in tracks {
            for sector in track.sectors.iter() {
                writeln!(writer)?;
                writeln!(
                    writer,
                    "side {} track {:02} sector 0x{:02x}",
                    track.side, track.track, sector.id.id
                )?;
                writeln!(writer, "{}", util::hex(&sector.data))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Disk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "DISK INFORMATION:")?;
        writeln!(f, "{}", self.info)?;
        writeln!(f)?;
        for track in self.tracks.iter() {
            writeln!(f, "{}", track)?;
        }
        if self.tracks.len() < self.info.track_blocks() {
            writeln!(
                f,
                "WARNING only {} of {} tracks read",
                self.tracks.len(),
                self.info.track_blocks()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::track::tests::track_block;
    use super::*;

    /// Build a standard single-sided image of 9 x 512-byte sector tracks.
    /// Track 0 is filled with `directory_fill`; the others with zeros.
    pub(crate) fn standard_image(tracks: u8, directory_fill: u8) -> Vec<u8> {
        let mut bytes = vec![0u8; DISK_INFO_SIZE];
        bytes[..34].copy_from_slice(b"MV - CPCEMU Disk-File\r\nDisk-Info\r\n");
        bytes[0x30] = tracks;
        bytes[0x31] = 1;
        bytes[0x32..0x34].copy_from_slice(&0x1300u16.to_le_bytes());
        for track in 0..tracks {
            let fill = if track == 0 { directory_fill } else { 0 };
            bytes.extend(track_block(track, 0, 9, fill));
        }
        bytes
    }

    #[test]
    fn test_decode_standard() {
        let bytes = standard_image(40, 0xE5);
        let disk = Disk::from_bytes(&bytes).unwrap();
        assert_eq!(disk.info.kind, DiskKind::Standard);
        assert_eq!(disk.tracks.len(), 40);
        assert!(disk.warnings().is_empty());
        assert_eq!(disk.track(39, 0).map(|t| t.track), Some(39));
        assert!(disk.track(40, 0).is_none());
        assert_eq!(disk.first_track().unwrap().sectors.len(), 9);
    }

    #[test]
    fn test_missing_tracks() {
        let bytes = standard_image(40, 0xE5);
        // Cut the image in the middle of the third track's sector data.
        let cut = DISK_INFO_SIZE + 2 * 0x1300 + 0x100 + 7 * 512;
        let disk = Disk::from_bytes(&bytes[..cut]).unwrap();
        assert_eq!(disk.tracks.len(), 3);
        assert_eq!(
            disk.warnings(),
            vec![
                DiskWarning::MissingTracks {
                    declared: 40,
                    read: 3
                },
                DiskWarning::Track {
                    index: 2,
                    warning: TrackWarning::Short {
                        declared: 9,
                        read: 7
                    }
                },
            ]
        );
        assert!(disk.to_string().ends_with("WARNING only 3 of 40 tracks read\n"));
    }

    #[test]
    fn test_extended_unformatted_track() {
        let mut bytes = vec![0u8; DISK_INFO_SIZE];
        bytes[..34].copy_from_slice(b"EXTENDED CPC DSK File\r\nDisk-Info\r\n");
        bytes[0x30] = 2;
        bytes[0x31] = 2;
        // Track 0 side 0 and track 1 side 1 are formatted.
        bytes[0x34] = 0x13;
        bytes[0x35] = 0x00;
        bytes[0x36] = 0x00;
        bytes[0x37] = 0x13;
        bytes.extend(track_block(0, 0, 9, 0xE5));
        bytes.extend(track_block(1, 1, 9, 0x00));
        let disk = Disk::from_bytes(&bytes).unwrap();
        assert_eq!(disk.tracks.len(), 4);
        assert_eq!((disk.tracks[1].track, disk.tracks[1].side), (0, 1));
        assert_eq!((disk.tracks[2].track, disk.tracks[2].side), (1, 0));
        assert_eq!(disk.tracks[1].warning(), Some(TrackWarning::Blank));
        assert_eq!(disk.tracks[3].sectors.len(), 9);
    }

    #[test]
    fn test_empty_disk() {
        let bytes = standard_image(0, 0xE5);
        let disk = Disk::from_bytes(&bytes).unwrap();
        let error = disk.first_track().unwrap_err();
        assert_eq!(
            DiskError::from_io_error(&error),
            Some(DiskError::EmptyTrackOrDisk)
        );
    }

    #[test]
    fn test_dump() {
        let bytes = standard_image(2, 0xE5);
        let disk = Disk::from_bytes(&bytes).unwrap();
        let mut output = Vec::new();
        disk.dump(&mut output, Some((1, 0))).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("\nside 0 track 01 sector 0xc1\n0000: 00 00"));
        assert_eq!(output.matches("sector 0x").count(), 9);
    }
}
