//! This is a Rust library for reading the floppy disk images of Amstrad's
//! 8-bit machines (the CPC range, the PCW and the Spectrum +3) and the CP/M
//! filesystems stored on them.
//!
//! Features:
//!
//! * Decode standard ("MV - CPC") and extended ("EXTENDED CPC DSK File") DSK
//! images into tracks and sectors, tolerating truncated images.
//! * Report blank tracks, short tracks, and missing tracks.
//! * Reconstruct the CP/M disk parameter block (DPB), including the Amstrad
//! extended fields, from the image geometry.
//! * Decode the CP/M directory and build the AMSDOS `CAT` listing: files with
//! their extents merged, sorted by name, with sizes and free space.
//! * A sample `cdsk` program for examining DSK images.
//!
//! Current shortcomings:
//!
//! * Images are read-only.
//! * File contents cannot be extracted, and AMSDOS file headers are not
//! interpreted.
//! * The directory is always read from the first track in the image, so
//! system format disks (two reserved tracks) list the wrong directory.
//!
//! # Example
//!
//! The following example opens a disk image and prints its catalog:
//!
//! ```
//! use std::io;
//! use cpcdsk::cpm::AmsDos;
//! use cpcdsk::disk;
//! # fn print_catalog(disk_image_filename: &str) -> io::Result<()> {
//! # let disk_image_filename = "/tmp/disk.dsk";
//!
//! let disk = disk::open(disk_image_filename)?;
//! for warning in disk.warnings() {
//!     eprintln!("warning: {}", warning);
//! }
//! let amsdos = AmsDos::new(&disk)?;
//! println!("{}", amsdos.catalog());
//! # Ok(())
//! # }
//! ```
//!
//! On a freshly formatted data disk with two files:
//!
//! ```text
//! Drive A: user  0
//!
//! DISC    .BAS   1K
//! GAME    .BIN  17K
//!
//! 160K free
//! ```
//!
//! # Design of disk image access
//!
//! 1. `Image` provides access to the underlying storage containing the disk
//!    image -- either a read-only mapping of a file or an in-memory buffer.
//! 2. `Disk` decodes the disk information block and the track blocks that
//!    follow it into `Track`s and `Sector`s.  It knows nothing about
//!    filesystems.
//! 3. `CpmFormat` describes the parameters a machine's BIOS imposes on a
//!    disk: block size and directory capacity.
//! 4. `AmsDos` reads the directory from the first track, derives the
//!    `DiskParameterBlock`, and produces the `Catalog`.
//!
//! All decoded values are owned; nothing refers back into the image after
//! decoding.

pub mod cpm;
pub mod disk;

mod util;

pub use crate::cpm::{AmsDos, Catalog, DiskParameterBlock};
pub use crate::disk::{Disk, DiskError};
