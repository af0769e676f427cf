use std::fmt;

/// Write a hexdump of the provided byte slice.
pub fn hexdump(
    f: &mut fmt::Formatter,
    prefix: &str,
    buffer: &[u8],
) -> std::result::Result<(), std::fmt::Error> {
    const COLUMNS: usize = 16;
    let mut offset: usize = 0;
    if buffer.is_empty() {
        // For a zero-length buffer, at least print an offset instead of
        // nothing.
        write!(f, "{}{:04x}: ", prefix, 0)?;
    }
    while offset < buffer.len() {
        write!(f, "{}{:04x}: ", prefix, offset)?;

        let row_size = COLUMNS.min(buffer.len() - offset);
        let padding = COLUMNS - row_size;
        let row = &buffer[offset..offset + row_size];

        for b in row {
            write!(f, "{:02x} ", b)?;
        }
        for _ in 0..padding {
            write!(f, "   ")?;
        }

        // CP/M text is 7-bit; attribute bits are masked off for display.
        for b in row {
            write!(
                f,
                "{}",
                match *b & 0x7F {
                    c @ 0x20..=0x7E => c as char,
                    _ => '.',
                }
            )?;
        }

        offset += COLUMNS;
        if offset < buffer.len() {
            writeln!(f)?;
        }
    }
    Ok(())
}

pub struct Hex<'a>(pub &'a [u8]);
impl<'a> fmt::Display for Hex<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        hexdump(f, "", self.0)
    }
}

pub fn hex(bytes: &[u8]) -> Hex {
    Hex(bytes)
}

/// A bounds-checked little-endian cursor over a byte slice.  Every read
/// returns `None` instead of panicking when the slice is exhausted, so
/// truncated images stop decoding at the first short read.
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> ByteReader<'a> {
        ByteReader { bytes, offset: 0 }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn take(&mut self, size: usize) -> Option<&'a [u8]> {
        if size > self.remaining() {
            return None;
        }
        let slice = &self.bytes[self.offset..self.offset + size];
        self.offset += size;
        Some(slice)
    }

    /// Advance by up to `size` bytes, returning how many were skipped.
    pub fn skip(&mut self, size: usize) -> usize {
        let skipped = size.min(self.remaining());
        self.offset += skipped;
        skipped
    }

    pub fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub fn u16_le(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Some(array)
    }
}
