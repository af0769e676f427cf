//! Static geometry tables shared by the container decoder and the CP/M
//! layer.  Lookups return `None` for sizes outside the tables; a missing
//! entry is never confused with an entry whose fields are zero.

/// The unit of data transfer as seen by the CP/M BDOS.
pub const RECORD_SIZE: usize = 128;

/// Block-size dependent parameters of a CP/M disk parameter block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockGeometry {
    /// Allocation block size in bytes.
    pub block_size: usize,
    /// Block shift factor: records per block = 1 << bsh.
    pub bsh: u8,
    /// Block mask: records per block - 1.
    pub blm: u8,
    /// Extent mask when the disk has fewer than 256 blocks.
    pub exm_small: u8,
    /// Extent mask when the disk has 256 blocks or more.  CP/M has no such
    /// layout for 1K blocks.
    pub exm_large: Option<u8>,
    /// Directory entries held by one block.
    pub entries_per_block: usize,
}

/// Physical sector translation parameters (CP/M 3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysicalGeometry {
    /// Physical sector size in bytes.
    pub sector_size: usize,
    /// Physical record shift: log2(sector_size / 128).
    pub psh: u8,
    /// Physical record mask: sector_size / 128 - 1.
    pub phm: u8,
}

/// DSK sector size codes (the uPD765 "N" value) map to 128 << N bytes.
static SECTOR_SIZES: [usize; 7] = [128, 256, 512, 1024, 2048, 4096, 8192];

#[rustfmt::skip]
static BLOCK_GEOMETRIES: [BlockGeometry; 5] = [
    BlockGeometry { block_size: 1024,  bsh: 3, blm: 7,   exm_small: 0,  exm_large: None,     entries_per_block: 32,  },
    BlockGeometry { block_size: 2048,  bsh: 4, blm: 15,  exm_small: 1,  exm_large: Some(0),  entries_per_block: 64,  },
    BlockGeometry { block_size: 4096,  bsh: 5, blm: 31,  exm_small: 3,  exm_large: Some(1),  entries_per_block: 128, },
    BlockGeometry { block_size: 8192,  bsh: 6, blm: 63,  exm_small: 7,  exm_large: Some(3),  entries_per_block: 256, },
    BlockGeometry { block_size: 16384, bsh: 7, blm: 127, exm_small: 15, exm_large: Some(7),  entries_per_block: 512, },
];

#[rustfmt::skip]
static PHYSICAL_GEOMETRIES: [PhysicalGeometry; 6] = [
    PhysicalGeometry { sector_size: 128,  psh: 0, phm: 0,  },
    PhysicalGeometry { sector_size: 256,  psh: 1, phm: 1,  },
    PhysicalGeometry { sector_size: 512,  psh: 2, phm: 3,  },
    PhysicalGeometry { sector_size: 1024, psh: 3, phm: 7,  },
    PhysicalGeometry { sector_size: 2048, psh: 4, phm: 15, },
    PhysicalGeometry { sector_size: 4096, psh: 5, phm: 31, },
];

/// Return the number of bytes for a sector size code.
pub fn sector_size(code: u8) -> Option<usize> {
    SECTOR_SIZES.get(code as usize).cloned()
}

/// Return the CP/M parameters for an allocation block size.
pub fn block_geometry(block_size: usize) -> Option<&'static BlockGeometry> {
    BLOCK_GEOMETRIES.iter().find(|g| g.block_size == block_size)
}

/// Return the physical shift and mask for a sector size in bytes.
pub fn physical_geometry(sector_size: usize) -> Option<&'static PhysicalGeometry> {
    PHYSICAL_GEOMETRIES
        .iter()
        .find(|g| g.sector_size == sector_size)
}
