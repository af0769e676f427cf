use std::io;

/// Errors that can be returned from disk image operations.  These are
/// generally converted into `io::Error`.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum DiskError {
    /// Unknown error
    #[error("unknown error")]
    Unknown,
    /// The disk information block does not carry a DSK identifier
    #[error("invalid disk image signature")]
    InvalidSignature,
    /// The image is shorter than the disk information block
    #[error("disk information block is truncated")]
    TruncatedHeader,
    /// A track declares a sector size code with no known byte count
    #[error("unknown sector size code 0x{0:02x}")]
    UnknownSectorSize(u8),
    /// A sector size has no physical shift/mask entry
    #[error("unresolved sector size of {0} bytes")]
    UnresolvedSectorSize(usize),
    /// There are no tracks, or track 0 has no sectors
    #[error("disk image has no tracks or track 0 is empty")]
    EmptyTrackOrDisk,
    /// The disk holds less than one allocation block
    #[error("disk holds less than one allocation block")]
    NoAllocationBlocks,
    /// The derived block count cannot be represented
    #[error("disk capacity cannot be represented in the disk parameter block")]
    CapacityOverflow,
    /// More directory blocks are needed than the allocation bitmap can mark
    #[error("directory needs more blocks than the allocation bitmap holds")]
    DirectoryOverflow,
    /// A CP/M format names a block size with no disk parameter entry
    #[error("unsupported allocation block size of {0} bytes")]
    UnsupportedBlockSize(usize),
}

impl Into<io::Error> for DiskError {
    fn into(self) -> io::Error {
        use self::DiskError::*;
        use std::io::ErrorKind::*;
        match self {
            Unknown => io::Error::new(Other, self),
            InvalidSignature => io::Error::new(InvalidData, self),
            TruncatedHeader => io::Error::new(UnexpectedEof, self),
            UnknownSectorSize(_) => io::Error::new(InvalidData, self),
            UnresolvedSectorSize(_) => io::Error::new(InvalidData, self),
            EmptyTrackOrDisk => io::Error::new(InvalidData, self),
            NoAllocationBlocks => io::Error::new(InvalidData, self),
            CapacityOverflow => io::Error::new(InvalidData, self),
            DirectoryOverflow => io::Error::new(InvalidData, self),
            UnsupportedBlockSize(_) => io::Error::new(InvalidInput, self),
        }
    }
}

impl From<io::Error> for DiskError {
    fn from(error: io::Error) -> DiskError {
        DiskError::from_io_error(&error).unwrap_or(DiskError::Unknown)
    }
}

impl DiskError {
    /// If the provided `io::Error` contains a `DiskError`, return the
    /// underlying `DiskError`.  If not, return None.
    pub fn from_io_error(error: &io::Error) -> Option<DiskError> {
        error
            .get_ref()
            .and_then(|e| e.downcast_ref::<DiskError>())
            .cloned()
    }

    /// This is sometimes useful instead of .into() when the compiler doesn't
    /// have enough information to perform type inference.
    pub fn to_io_error(&self) -> io::Error {
        self.clone().into()
    }
}

impl PartialEq<io::Error> for DiskError {
    fn eq(&self, other: &io::Error) -> bool {
        match DiskError::from_io_error(other) {
            Some(ref e) if e == self => true,
            _ => false,
        }
    }
}

impl PartialEq<DiskError> for io::Error {
    fn eq(&self, other: &DiskError) -> bool {
        match DiskError::from_io_error(self) {
            Some(ref e) if e == other => true,
            _ => false,
        }
    }
}
