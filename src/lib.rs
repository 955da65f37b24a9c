//! Raw FAT32 disk-image editor
//!
//! Opens a FAT32 volume stored in an ordinary host file and edits it in
//! place, without mounting. The volume is addressed through computed sector
//! and cluster offsets; every modifying operation is flushed to stable
//! storage before it returns.
//!
//! ## On-Disk Format
//! FAT32 uses:
//! - Boot sector with BIOS Parameter Block (BPB)
//! - File Allocation Table (FAT) for cluster chains
//! - 32-byte directory entries in the root directory cluster
//!
//! Only the single-cluster root directory and 8.3 short names are handled;
//! long-name fragments and subdirectories are reported and skipped.

pub mod blockdev;
pub mod dir;
pub mod error;
pub mod fat;
pub mod fsck;
pub mod geometry;
pub mod timestamp;
pub mod volume;

pub use blockdev::{BackingStore, Disk};
pub use error::FatError;
pub use geometry::Geometry;
pub use volume::{ReadMode, Volume};
