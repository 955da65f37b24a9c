//! Shared test fixture: an in-memory 8 MiB FAT32 image with the default
//! layout (512-byte sectors, 2 sectors per cluster, 32 reserved sectors,
//! one 64-sector FAT, root directory in cluster 2).

use std::io::Cursor;

use byteorder::{ByteOrder, LittleEndian};
use fatmod::Volume;

pub const SECTOR_SIZE: usize = 512;
pub const CLUSTER_SIZE: usize = 1024;
pub const RESERVED_SECTORS: usize = 32;
pub const FAT_SECTORS: usize = 64;
pub const TOTAL_SECTORS: usize = 16 * 1024; // 8 MiB

pub const FAT_OFFSET: usize = RESERVED_SECTORS * SECTOR_SIZE;
pub const DATA_OFFSET: usize = (RESERVED_SECTORS + FAT_SECTORS) * SECTOR_SIZE;
/// The root directory occupies cluster 2, the first data cluster.
pub const ROOT_DIR_OFFSET: usize = DATA_OFFSET;

pub const FAT_EOC: u32 = 0x0FFF_FFF8;

/// Build a freshly formatted image: boot sector, FAT with the two
/// reserved entries plus the root cluster, empty root directory.
pub fn build_image() -> Vec<u8> {
    let mut image = vec![0u8; TOTAL_SECTORS * SECTOR_SIZE];

    LittleEndian::write_u16(&mut image[11..13], SECTOR_SIZE as u16);
    image[13] = 2; // sectors per cluster
    LittleEndian::write_u16(&mut image[14..16], RESERVED_SECTORS as u16);
    image[16] = 1; // one FAT
    LittleEndian::write_u32(&mut image[32..36], TOTAL_SECTORS as u32);
    LittleEndian::write_u32(&mut image[36..40], FAT_SECTORS as u32);
    LittleEndian::write_u32(&mut image[44..48], 2); // root cluster
    image[510] = 0x55;
    image[511] = 0xAA;

    set_fat_entry(&mut image, 0, 0x0FFF_FFF8); // media descriptor entry
    set_fat_entry(&mut image, 1, 0x0FFF_FFFF);
    set_fat_entry(&mut image, 2, FAT_EOC); // root directory cluster

    image
}

/// Read a FAT entry straight from the image bytes (low 28 bits).
pub fn fat_entry(image: &[u8], cluster: u32) -> u32 {
    let offset = FAT_OFFSET + cluster as usize * 4;
    LittleEndian::read_u32(&image[offset..offset + 4]) & 0x0FFF_FFFF
}

pub fn set_fat_entry(image: &mut [u8], cluster: u32, value: u32) {
    let offset = FAT_OFFSET + cluster as usize * 4;
    LittleEndian::write_u32(&mut image[offset..offset + 4], value);
}

/// Open a volume over the image, requiring a warning-free boot sector.
pub fn open(image: Vec<u8>) -> Volume<Cursor<Vec<u8>>> {
    let mut warnings = Vec::new();
    let volume = Volume::open(Cursor::new(image), &mut warnings).expect("volume should open");
    assert!(
        warnings.is_empty(),
        "unexpected warnings: {}",
        String::from_utf8_lossy(&warnings)
    );
    volume
}

/// Tear the volume down and hand back the raw image bytes.
pub fn close(volume: Volume<Cursor<Vec<u8>>>) -> Vec<u8> {
    volume.into_backing().into_inner()
}

/// Run the listing into a string.
pub fn listing(volume: &Volume<Cursor<Vec<u8>>>) -> String {
    let mut sink = Vec::new();
    volume.list(&mut sink).expect("list should succeed");
    String::from_utf8(sink).expect("listing is ASCII")
}
