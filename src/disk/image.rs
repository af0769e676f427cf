use std::fs::File;
use std::io;
use std::path::Path;

use memmap::{Mmap, MmapOptions};

/// Provide backing storage (file or memory) for disk images.  Images are only
/// ever read, so a file is mapped read-only.
pub enum Image {
    ReadOnlyMap(Mmap),
    Memory(Box<[u8]>),
}

impl Image {
    pub fn from_bytes(bytes: &[u8]) -> Image {
        Image::Memory(bytes.to_vec().into_boxed_slice())
    }

    pub fn open_read_only<P: AsRef<Path>>(path: P) -> io::Result<Image> {
        let file = File::open(path)?;
        // A zero-length file cannot be mapped on every platform.
        if file.metadata()?.len() == 0 {
            return Ok(Image::Memory(Box::new([])));
        }
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(Image::ReadOnlyMap(mmap))
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Image::ReadOnlyMap(mmap) => &mmap[..],
            Image::Memory(array) => &array[..],
        }
    }
}
