use std::fmt;
use std::io;

use crate::disk::error::DiskError;
use crate::util::ByteReader;

/// The disk information block is always at offset 0 and occupies the first
/// 256 bytes of the image.
pub const DISK_INFO_SIZE: usize = 0x100;

const IDENTIFIER_SIZE: usize = 34;
const CREATOR_SIZE: usize = 14;
const TRACK_SIZE_TABLE_OFFSET: usize = 0x34;

const STANDARD_SIGNATURE: &[u8] = b"MV - CPC";
const EXTENDED_SIGNATURE: &[u8] = b"EXTENDED CPC DSK File";

/// The two flavors of the CPCEMU container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiskKind {
    /// Every track block has the same size, given in the header.
    Standard,
    /// Each track block's size is listed in a table in the header.
    Extended,
}

impl fmt::Display for DiskKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            DiskKind::Standard => "standard",
            DiskKind::Extended => "extended",
        })
    }
}

/// The decoded disk information block.
#[derive(Clone, Debug, PartialEq)]
pub struct DiskInformation {
    pub kind: DiskKind,
    pub identifier: [u8; IDENTIFIER_SIZE],
    pub creator: [u8; CREATOR_SIZE],
    /// Tracks per side.
    pub tracks: u8,
    pub sides: u8,
    /// Size of every track block, including its 256-byte track information
    /// block.  Unused by extended images.
    pub track_size: u16,
    /// Extended images only: the size of each track block in bytes, in file
    /// order.  Zero marks an unformatted track with no block in the file.
    pub track_sizes: Vec<usize>,
}

impl DiskInformation {
    pub fn read(bytes: &[u8]) -> io::Result<DiskInformation> {
        if bytes.len() < DISK_INFO_SIZE {
            return Err(DiskError::TruncatedHeader.into());
        }
        let truncated = || DiskError::TruncatedHeader.to_io_error();
        let mut reader = ByteReader::new(&bytes[..DISK_INFO_SIZE]);
        let identifier: [u8; IDENTIFIER_SIZE] = reader.array().ok_or_else(truncated)?;
        let kind = if identifier.starts_with(EXTENDED_SIGNATURE) {
            DiskKind::Extended
        } else if identifier.starts_with(STANDARD_SIGNATURE) {
            DiskKind::Standard
        } else {
            return Err(DiskError::InvalidSignature.into());
        };
        let creator: [u8; CREATOR_SIZE] = reader.array().ok_or_else(truncated)?;
        let tracks = reader.u8().ok_or_else(truncated)?;
        let sides = reader.u8().ok_or_else(truncated)?;
        let track_size = reader.u16_le().ok_or_else(truncated)?;

        let block_count = tracks as usize * sides as usize;
        let track_sizes = match kind {
            DiskKind::Standard => vec![],
            DiskKind::Extended => {
                // The table holds the high byte of each block size.  It cannot
                // extend past the information block.
                let table = &bytes[TRACK_SIZE_TABLE_OFFSET..DISK_INFO_SIZE];
                table
                    .iter()
                    .take(block_count)
                    .map(|&msb| (msb as usize) << 8)
                    .collect()
            }
        };

        Ok(DiskInformation {
            kind,
            identifier,
            creator,
            tracks,
            sides,
            track_size,
            track_sizes,
        })
    }

    /// The number of track blocks the header declares.
    #[inline]
    pub fn track_blocks(&self) -> usize {
        self.tracks as usize * self.sides as usize
    }

    /// The identifier with NULs dropped and its CR/LF separated lines joined.
    pub fn identifier_string(&self) -> String {
        let text: String = self
            .identifier
            .iter()
            .filter(|&&b| b > 0)
            .map(|&b| b as char)
            .collect();
        text.trim_matches(|c| c == '\r' || c == '\n')
            .split("\r\n")
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn creator_string(&self) -> String {
        self.creator
            .iter()
            .take_while(|&&b| b > 0)
            .map(|&b| b as char)
            .collect::<String>()
            .trim_end()
            .to_string()
    }
}

impl fmt::Display for DiskInformation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Identifier: {}", self.identifier_string())?;
        writeln!(f, "Creator:    {}", self.creator_string())?;
        writeln!(f, "Format:     {}", self.kind)?;
        writeln!(f, "Tracks:     {}", self.tracks)?;
        writeln!(f, "Sides:      {}", self.sides)?;
        write!(f, "Track Size: {}", self.track_size)
    }
}
