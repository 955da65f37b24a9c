//! Root directory access
//!
//! The root directory is a single cluster of 32-byte slots. Slots are
//! parsed into a tagged view rather than overlaid on a packed struct;
//! every multi-byte field is read and written little-endian at its fixed
//! offset.

use std::fmt;
use std::io;

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};

use crate::blockdev::{BackingStore, Disk};
use crate::error::FatError;
use crate::geometry::Geometry;
use crate::timestamp::FatTimestamp;

/// Directory slots are 32 bytes.
pub const DIR_ENTRY_SIZE: usize = 32;
/// Byte 0 of a slot that was never used
pub const SLOT_UNUSED: u8 = 0x00;
/// Byte 0 of a deleted (reusable) slot
pub const SLOT_DELETED: u8 = 0xE5;

bitflags! {
    /// Directory entry attribute bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
    }
}

impl Attributes {
    /// Long-name fragments set the four low bits together.
    pub fn is_long_name(self) -> bool {
        self.bits() & 0x3F == 0x0F
    }
}

/// 8.3 short name: 8 name bytes and 3 extension bytes, space padded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortName([u8; 11]);

impl ShortName {
    pub fn from_raw(raw: [u8; 11]) -> ShortName {
        ShortName(raw)
    }

    pub fn raw(&self) -> &[u8; 11] {
        &self.0
    }

    /// Encode a user-supplied name.
    ///
    /// Uppercases, splits at the first `'.'`, left-justifies the parts and
    /// space-pads. Names are 1-8 characters, extensions 0-3, both drawn
    /// from `A-Z 0-9 _ -`.
    pub fn encode(input: &str) -> Result<ShortName, FatError> {
        let upper = input.to_ascii_uppercase();
        let (base, ext) = match upper.split_once('.') {
            Some((base, ext)) => (base, ext),
            None => (upper.as_str(), ""),
        };

        if base.is_empty() || base.len() > 8 || ext.len() > 3 {
            return Err(FatError::InvalidName);
        }
        let allowed = |part: &str| {
            part.bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
        };
        if !allowed(base) || !allowed(ext) {
            return Err(FatError::InvalidName);
        }

        let mut raw = [b' '; 11];
        raw[..base.len()].copy_from_slice(base.as_bytes());
        raw[8..8 + ext.len()].copy_from_slice(ext.as_bytes());
        Ok(ShortName(raw))
    }

    /// Display form: padding stripped, `.` reinserted iff the extension is
    /// non-empty. A byte outside `A-Z a-z 0-9 _ -` ends its part early.
    pub fn decode(&self) -> String {
        fn visible(field: &[u8]) -> String {
            field
                .iter()
                .take_while(|&&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
                .map(|&b| b as char)
                .collect()
        }
        let base = visible(&self.0[..8]);
        let ext = visible(&self.0[8..]);
        if ext.is_empty() { base } else { format!("{}.{}", base, ext) }
    }

    /// Volume labels use all 11 bytes as one field.
    pub fn decode_label(&self) -> String {
        String::from_utf8_lossy(&self.0).trim_end().to_string()
    }
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.decode())
    }
}

/// Parsed regular-file directory entry (the 32-byte layout, bit-exact)
#[derive(Debug, Clone, Copy)]
pub struct FileEntry {
    pub name: ShortName,
    pub attributes: Attributes,
    /// Creation time, 0..199 centiseconds
    pub creation_centis: u8,
    pub creation_time: u16,
    pub creation_date: u16,
    pub access_date: u16,
    pub write_time: u16,
    pub write_date: u16,
    /// `(high << 16) | low`; 0 means no clusters allocated
    pub first_cluster: u32,
    pub size: u32,
}

impl FileEntry {
    /// Fresh zero-length entry with all three stamps set to `stamp`.
    pub fn new_empty(name: ShortName, stamp: FatTimestamp) -> FileEntry {
        FileEntry {
            name,
            attributes: Attributes::ARCHIVE,
            creation_centis: 0,
            creation_time: stamp.time,
            creation_date: stamp.date,
            access_date: stamp.date,
            write_time: stamp.time,
            write_date: stamp.date,
            first_cluster: 0,
            size: 0,
        }
    }

    /// Parse one 32-byte slot.
    pub fn parse(slot: &[u8]) -> FileEntry {
        debug_assert_eq!(slot.len(), DIR_ENTRY_SIZE);
        let mut raw_name = [0u8; 11];
        raw_name.copy_from_slice(&slot[0..11]);

        let cluster_high = LittleEndian::read_u16(&slot[20..22]) as u32;
        let cluster_low = LittleEndian::read_u16(&slot[26..28]) as u32;

        FileEntry {
            name: ShortName::from_raw(raw_name),
            attributes: Attributes::from_bits_retain(slot[11]),
            creation_centis: slot[13],
            creation_time: LittleEndian::read_u16(&slot[14..16]),
            creation_date: LittleEndian::read_u16(&slot[16..18]),
            access_date: LittleEndian::read_u16(&slot[18..20]),
            write_time: LittleEndian::read_u16(&slot[22..24]),
            write_date: LittleEndian::read_u16(&slot[24..26]),
            first_cluster: (cluster_high << 16) | cluster_low,
            size: LittleEndian::read_u32(&slot[28..32]),
        }
    }

    /// Serialize back to the 32-byte on-disk layout.
    pub fn serialize(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut slot = [0u8; DIR_ENTRY_SIZE];
        slot[0..11].copy_from_slice(self.name.raw());
        slot[11] = self.attributes.bits();
        slot[13] = self.creation_centis;
        LittleEndian::write_u16(&mut slot[14..16], self.creation_time);
        LittleEndian::write_u16(&mut slot[16..18], self.creation_date);
        LittleEndian::write_u16(&mut slot[18..20], self.access_date);
        LittleEndian::write_u16(&mut slot[20..22], (self.first_cluster >> 16) as u16);
        LittleEndian::write_u16(&mut slot[22..24], self.write_time);
        LittleEndian::write_u16(&mut slot[24..26], self.write_date);
        LittleEndian::write_u16(&mut slot[26..28], self.first_cluster as u16);
        LittleEndian::write_u32(&mut slot[28..32], self.size);
        slot
    }
}

/// Tagged view of one directory slot
#[derive(Debug, Clone)]
pub enum DirSlot {
    Unused,
    Tombstoned,
    VolumeLabel(ShortName),
    LongName,
    Subdirectory(FileEntry),
    File(FileEntry),
}

/// Classify and parse one 32-byte slot.
pub fn parse_slot(slot: &[u8]) -> DirSlot {
    match slot[0] {
        SLOT_UNUSED => DirSlot::Unused,
        SLOT_DELETED => DirSlot::Tombstoned,
        _ => {
            let attributes = Attributes::from_bits_retain(slot[11]);
            if attributes.is_long_name() {
                DirSlot::LongName
            } else if attributes.contains(Attributes::VOLUME_ID) {
                let mut raw = [0u8; 11];
                raw.copy_from_slice(&slot[0..11]);
                DirSlot::VolumeLabel(ShortName::from_raw(raw))
            } else if attributes.contains(Attributes::DIRECTORY) {
                DirSlot::Subdirectory(FileEntry::parse(slot))
            } else {
                DirSlot::File(FileEntry::parse(slot))
            }
        }
    }
}

/// The root directory cluster, loaded into memory
///
/// All reads go through the buffer; every mutation is written back to the
/// slot's on-disk offset before the operation reports success.
pub struct RootDirectory {
    buf: Vec<u8>,
    base_offset: u64,
}

impl RootDirectory {
    /// Read the root cluster.
    pub fn load<B: BackingStore>(
        disk: &mut Disk<B>,
        geometry: &Geometry,
    ) -> Result<RootDirectory, FatError> {
        let cluster = geometry.root_first_cluster;
        let buf = disk.read_cluster(cluster)?;
        let base_offset = disk.cluster_offset(cluster);
        Ok(RootDirectory { buf, base_offset })
    }

    pub fn slot_count(&self) -> usize {
        self.buf.len() / DIR_ENTRY_SIZE
    }

    fn slot_bytes(&self, index: usize) -> &[u8] {
        &self.buf[index * DIR_ENTRY_SIZE..(index + 1) * DIR_ENTRY_SIZE]
    }

    /// Iterate every slot with its parsed view.
    pub fn slots(&self) -> impl Iterator<Item = (usize, DirSlot)> + '_ {
        (0..self.slot_count()).map(|i| (i, parse_slot(self.slot_bytes(i))))
    }

    /// Locate the live file entry matching `name` (case-insensitive).
    ///
    /// The query must itself be a valid 8.3 name; comparing encoded names
    /// makes the match case-insensitive by construction.
    pub fn find(&self, name: &str) -> Result<Option<(usize, FileEntry)>, FatError> {
        let query = ShortName::encode(name)?;
        for (index, slot) in self.slots() {
            if let DirSlot::File(entry) = slot
                && entry.name == query
            {
                return Ok(Some((index, entry)));
            }
        }
        Ok(None)
    }

    /// First never-used or tombstoned slot.
    pub fn find_free_slot(&self) -> Option<usize> {
        (0..self.slot_count()).find(|&i| {
            let first = self.slot_bytes(i)[0];
            first == SLOT_UNUSED || first == SLOT_DELETED
        })
    }

    /// Serialize `entry` into slot `index` and persist it.
    pub fn write_entry<B: BackingStore>(
        &mut self,
        disk: &mut Disk<B>,
        index: usize,
        entry: &FileEntry,
    ) -> Result<(), FatError> {
        let bytes = entry.serialize();
        let start = index * DIR_ENTRY_SIZE;
        self.buf[start..start + DIR_ENTRY_SIZE].copy_from_slice(&bytes);
        disk.write_range(self.base_offset + start as u64, &bytes)
    }

    /// Mark slot `index` deleted by overwriting byte 0 with `0xE5`.
    pub fn tombstone<B: BackingStore>(
        &mut self,
        disk: &mut Disk<B>,
        index: usize,
    ) -> Result<(), FatError> {
        let start = index * DIR_ENTRY_SIZE;
        self.buf[start] = SLOT_DELETED;
        disk.write_range(self.base_offset + start as u64, &[SLOT_DELETED])
    }

    /// Emit the listing: one `NAME.EXT size` line per live file, the volume
    /// label if present, and a warning per slot kind this tool skips.
    pub fn list<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        for (_, slot) in self.slots() {
            match slot {
                DirSlot::File(entry) => writeln!(sink, "{} {}", entry.name, entry.size)?,
                DirSlot::VolumeLabel(label) => {
                    writeln!(sink, "Volume label: {}", label.decode_label())?
                }
                DirSlot::LongName => {
                    writeln!(sink, "WARNING: long file name entry ignored")?
                }
                DirSlot::Subdirectory(entry) => {
                    writeln!(sink, "WARNING: subdirectory {} ignored", entry.name)?
                }
                DirSlot::Unused | DirSlot::Tombstoned => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_basic() {
        let name = ShortName::encode("file.txt").unwrap();
        assert_eq!(name.raw(), b"FILE    TXT");
    }

    #[test]
    fn test_encode_no_extension() {
        let name = ShortName::encode("README").unwrap();
        assert_eq!(name.raw(), b"README     ");
    }

    #[test]
    fn test_encode_rejects_bad_input() {
        assert!(ShortName::encode("").is_err());
        assert!(ShortName::encode(".txt").is_err());
        assert!(ShortName::encode("toolongname.txt").is_err());
        assert!(ShortName::encode("file.text").is_err());
        assert!(ShortName::encode("a b.txt").is_err());
        assert!(ShortName::encode("a.b.c").is_err());
        assert!(ShortName::encode("f*le.txt").is_err());
    }

    #[test]
    fn test_decode_round_trip() {
        for input in ["file.txt", "A.B", "NO_EXT", "dash-1.x", "12345678.abc"] {
            let name = ShortName::encode(input).unwrap();
            assert_eq!(name.decode(), input.to_ascii_uppercase());
        }
    }

    #[test]
    fn test_decode_stops_at_padding() {
        let name = ShortName::from_raw(*b"AB\x01CDEF GHI");
        assert_eq!(name.decode(), "AB.GHI");
    }

    #[test]
    fn test_entry_round_trip() {
        let stamp = FatTimestamp {
            date: 0x58A1,
            time: 0x6433,
        };
        let mut entry = FileEntry::new_empty(ShortName::encode("data.bin").unwrap(), stamp);
        entry.first_cluster = 0x0012_0034;
        entry.size = 123_456;

        let bytes = entry.serialize();
        let parsed = FileEntry::parse(&bytes);

        assert_eq!(parsed.name, entry.name);
        assert_eq!(parsed.attributes, Attributes::ARCHIVE);
        assert_eq!(parsed.creation_time, stamp.time);
        assert_eq!(parsed.creation_date, stamp.date);
        assert_eq!(parsed.write_time, stamp.time);
        assert_eq!(parsed.write_date, stamp.date);
        assert_eq!(parsed.first_cluster, 0x0012_0034);
        assert_eq!(parsed.size, 123_456);
    }

    #[test]
    fn test_entry_layout_offsets() {
        let mut entry = FileEntry::new_empty(ShortName::encode("A").unwrap(), FatTimestamp {
            date: 0,
            time: 0,
        });
        entry.first_cluster = 0x000A_000B;
        entry.size = 0x0102_0304;
        let bytes = entry.serialize();

        assert_eq!(bytes[11], 0x20);
        assert_eq!(&bytes[20..22], &[0x0A, 0x00]); // cluster high, LE
        assert_eq!(&bytes[26..28], &[0x0B, 0x00]); // cluster low, LE
        assert_eq!(&bytes[28..32], &[0x04, 0x03, 0x02, 0x01]); // size, LE
    }

    #[test]
    fn test_parse_slot_kinds() {
        let mut slot = [0u8; DIR_ENTRY_SIZE];
        assert!(matches!(parse_slot(&slot), DirSlot::Unused));

        slot[0] = SLOT_DELETED;
        assert!(matches!(parse_slot(&slot), DirSlot::Tombstoned));

        slot[0] = b'A';
        slot[11] = 0x0F;
        assert!(matches!(parse_slot(&slot), DirSlot::LongName));

        slot[11] = 0x08;
        assert!(matches!(parse_slot(&slot), DirSlot::VolumeLabel(_)));

        slot[11] = 0x10;
        assert!(matches!(parse_slot(&slot), DirSlot::Subdirectory(_)));

        slot[11] = 0x20;
        assert!(matches!(parse_slot(&slot), DirSlot::File(_)));
    }
}
