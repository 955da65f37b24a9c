//! Crate-wide error type

use std::io;

use thiserror::Error;

/// Failure kinds surfaced by volume operations
///
/// Each variant prints as the single line the frontend shows the user.
#[derive(Debug, Error)]
pub enum FatError {
    /// Backing store could not be opened
    #[error("could not open disk image")]
    IoOpen(#[source] io::Error),
    /// Fewer bytes than requested came back from the backing store
    #[error("short read from disk image")]
    IoShort,
    /// A write or flush to the backing store failed
    #[error("write to disk image failed")]
    IoWrite(#[source] io::Error),
    /// Boot sector unparseable
    #[error("invalid boot sector: {0}")]
    InvalidGeometry(&'static str),
    /// Name does not fit 8.3 or contains disallowed characters
    #[error("invalid file name (must fit 8.3, characters A-Z 0-9 _ -)")]
    InvalidName,
    /// Write offset exceeds the current file size
    #[error("offset is beyond the end of the file")]
    InvalidOffset,
    /// Named file absent from the root directory
    #[error("file not found")]
    NotFound,
    /// Create collides with a live entry
    #[error("File already exists!")]
    AlreadyExists,
    /// No free slot left in the root directory
    #[error("no free slot in the root directory")]
    DirectoryFull,
    /// No free cluster left on the volume
    #[error("no free cluster on the volume")]
    NoSpace,
    /// FAT chain contains an out-of-range pointer or a cycle
    #[error("corrupt FAT chain")]
    BadChain,
}
