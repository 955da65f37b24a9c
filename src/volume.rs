//! Volume-level file operations
//!
//! `Volume` ties the parsed geometry, the FAT, and the loaded root
//! directory together and exposes the five commands. All state lives in
//! this value; nothing is module-global.

use std::io;

use log::{debug, warn};

use crate::blockdev::{BackingStore, Disk};
use crate::dir::{FileEntry, RootDirectory, ShortName};
use crate::error::FatError;
use crate::fat::FatTable;
use crate::fsck;
use crate::geometry::Geometry;
use crate::timestamp::FatTimestamp;

/// How `read` renders file content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Hex dump, 16 bytes per offset-prefixed line
    Binary,
    /// Raw bytes
    Ascii,
}

/// An opened FAT32 volume
pub struct Volume<B: BackingStore> {
    disk: Disk<B>,
    geometry: Geometry,
    fat: FatTable,
    root: RootDirectory,
}

impl<B: BackingStore> Volume<B> {
    /// Read the boot sector, parse the geometry, and load the root
    /// directory. Geometry oddities are written to `warning_sink` as
    /// `WARNING:` lines; only an unreadable or unusable boot sector fails.
    pub fn open<W: io::Write>(store: B, warning_sink: &mut W) -> Result<Volume<B>, FatError> {
        let mut disk = Disk::new(store);
        let boot = disk.read_sector(0)?;
        let geometry = Geometry::parse(&boot)?;
        for note in geometry.warnings() {
            warn!("{}", note);
            writeln!(warning_sink, "WARNING: {}", note).map_err(FatError::IoWrite)?;
        }
        disk.set_layout(&geometry);

        let fat = FatTable::new(&geometry);
        let root = RootDirectory::load(&mut disk, &geometry)?;
        Ok(Volume {
            disk,
            geometry,
            fat,
            root,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Consume the volume and hand back the backing store.
    pub fn into_backing(self) -> B {
        self.disk.into_inner()
    }

    /// Emit the root directory listing. An empty directory is not an error.
    pub fn list<W: io::Write>(&self, sink: &mut W) -> Result<(), FatError> {
        self.root.list(sink).map_err(FatError::IoWrite)
    }

    /// Create an empty file: a fresh directory entry with current stamps,
    /// no clusters, size 0. The FAT is untouched.
    pub fn create(&mut self, name: &str) -> Result<(), FatError> {
        let short = ShortName::encode(name)?;
        if self.root.find(name)?.is_some() {
            return Err(FatError::AlreadyExists);
        }
        let slot = self.root.find_free_slot().ok_or(FatError::DirectoryFull)?;

        let entry = FileEntry::new_empty(short, FatTimestamp::now());
        debug!("creating {} in slot {}", entry.name, slot);
        self.root.write_entry(&mut self.disk, slot, &entry)
    }

    /// Overwrite `length` bytes at `offset` with `fill`.
    ///
    /// Writing may start anywhere up to and including the current end of
    /// file; clusters are allocated on demand for the part past the end.
    /// The directory entry is persisted with the final size before the
    /// data pass, so an I/O failure can leave spare clusters on the chain
    /// but never a size the chain cannot back.
    pub fn write(&mut self, name: &str, offset: u64, length: u64, fill: u8) -> Result<(), FatError> {
        let (slot, mut entry) = self.root.find(name)?.ok_or(FatError::NotFound)?;
        let size = entry.size as u64;
        if offset > size {
            return Err(FatError::InvalidOffset);
        }
        let end = offset + length;
        if end > u32::MAX as u64 {
            // FAT32 sizes are 32-bit
            return Err(FatError::InvalidOffset);
        }

        let cluster_size = self.geometry.cluster_size() as u64;
        let need = end.div_ceil(cluster_size);
        let have = size.div_ceil(cluster_size);
        if need > have {
            let tail = if entry.first_cluster == 0 {
                0
            } else {
                let chain = self.fat.chain(&mut self.disk, entry.first_cluster)?;
                *chain.last().ok_or(FatError::BadChain)?
            };
            let added =
                self.fat
                    .allocate_and_link(&mut self.disk, tail, (need - have) as usize)?;
            if entry.first_cluster == 0 {
                entry.first_cluster = added[0];
            }
        }

        if end > size {
            entry.size = end as u32;
        }
        let stamp = FatTimestamp::now();
        entry.write_time = stamp.time;
        entry.write_date = stamp.date;
        entry.access_date = stamp.date;
        self.root.write_entry(&mut self.disk, slot, &entry)?;

        if length == 0 {
            return Ok(());
        }

        // Fill pass: walk to the cluster holding `offset`, then overwrite
        // cluster by cluster, writing each one back before moving on.
        let chain = self.fat.chain(&mut self.disk, entry.first_cluster)?;
        let mut index = (offset / cluster_size) as usize;
        let mut position = offset;
        let mut remaining = length;
        while remaining > 0 {
            let cluster = *chain.get(index).ok_or(FatError::BadChain)?;
            let in_cluster = (position % cluster_size) as usize;
            let span = remaining.min(cluster_size - in_cluster as u64) as usize;

            let mut buf = self.disk.read_cluster(cluster)?;
            buf[in_cluster..in_cluster + span].fill(fill);
            self.disk.write_cluster(cluster, &buf)?;

            position += span as u64;
            remaining -= span as u64;
            index += 1;
        }
        Ok(())
    }

    /// Emit a file's content: exactly `size` bytes, the final cluster
    /// truncated.
    pub fn read<W: io::Write>(
        &mut self,
        name: &str,
        mode: ReadMode,
        sink: &mut W,
    ) -> Result<(), FatError> {
        let (_, entry) = self.root.find(name)?.ok_or(FatError::NotFound)?;
        let size = entry.size as u64;
        if size == 0 || entry.first_cluster == 0 {
            return Ok(());
        }

        let cluster_size = self.geometry.cluster_size() as u64;
        let chain = self.fat.chain(&mut self.disk, entry.first_cluster)?;

        let mut emitted = 0u64;
        let mut line = Vec::with_capacity(16);
        let mut line_offset = 0u64;
        for &cluster in &chain {
            let buf = self.disk.read_cluster(cluster)?;
            let span = (size - emitted).min(cluster_size) as usize;
            match mode {
                ReadMode::Ascii => {
                    sink.write_all(&buf[..span]).map_err(FatError::IoWrite)?;
                }
                ReadMode::Binary => {
                    for &byte in &buf[..span] {
                        line.push(byte);
                        if line.len() == 16 {
                            dump_line(sink, line_offset, &line).map_err(FatError::IoWrite)?;
                            line_offset += 16;
                            line.clear();
                        }
                    }
                }
            }
            emitted += span as u64;
            if emitted == size {
                break;
            }
        }
        if !line.is_empty() {
            dump_line(sink, line_offset, &line).map_err(FatError::IoWrite)?;
        }
        Ok(())
    }

    /// Delete a file: reclaim its chain, then tombstone the slot.
    pub fn delete(&mut self, name: &str) -> Result<(), FatError> {
        let (slot, entry) = self.root.find(name)?.ok_or(FatError::NotFound)?;
        if entry.first_cluster != 0 {
            self.fat.free_chain(&mut self.disk, entry.first_cluster)?;
        }
        debug!("tombstoning {} in slot {}", entry.name, slot);
        self.root.tombstone(&mut self.disk, slot)
    }

    /// Verify the named file's chain integrity; returns the chain.
    pub fn check(&mut self, name: &str) -> Result<Vec<u32>, FatError> {
        let (_, entry) = self.root.find(name)?.ok_or(FatError::NotFound)?;
        fsck::verify_chain(
            &self.fat,
            &mut self.disk,
            &entry,
            self.geometry.cluster_size(),
        )
    }
}

/// One hex-dump line: 8-digit uppercase offset, then the bytes.
fn dump_line<W: io::Write>(sink: &mut W, offset: u64, bytes: &[u8]) -> io::Result<()> {
    write!(sink, "{:08X}", offset)?;
    for byte in bytes {
        write!(sink, " {:02X}", byte)?;
    }
    writeln!(sink)
}
