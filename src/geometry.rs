//! Boot sector parsing
//!
//! The BIOS Parameter Block at the start of sector 0 carries the volume
//! layout. It is parsed once when the volume is opened; everything derived
//! from it is immutable for the rest of the command.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FatError;

/// FAT32 caps cluster numbers at 28 bits.
const MAX_CLUSTERS: u64 = 1 << 28;

/// Volume layout parsed from the boot sector
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    /// Bytes per sector (typically 512)
    pub sector_size: u32,
    /// Sectors per allocation unit
    pub sectors_per_cluster: u32,
    /// Sectors before the first FAT
    pub reserved_sectors: u32,
    /// Number of FATs on the volume; only the first is used
    pub num_fats: u32,
    /// Length of each FAT in sectors
    pub fat_length_sectors: u32,
    /// First cluster of the root directory
    pub root_first_cluster: u32,
    /// Total sectors on the volume
    pub total_sectors: u32,
    /// Boot sector carried the 0x55AA signature
    signature_ok: bool,
}

impl Geometry {
    /// Parse the boot sector.
    ///
    /// Only an unusable layout is fatal; any merely unusual value is
    /// reported through [`Geometry::warnings`] and accepted.
    pub fn parse(boot: &[u8]) -> Result<Geometry, FatError> {
        if boot.len() < 512 {
            return Err(FatError::InvalidGeometry("boot sector too short"));
        }

        let sector_size = LittleEndian::read_u16(&boot[11..13]) as u32;
        let sectors_per_cluster = boot[13] as u32;
        let reserved_sectors = LittleEndian::read_u16(&boot[14..16]) as u32;
        let num_fats = boot[16] as u32;
        let total_sectors = LittleEndian::read_u32(&boot[32..36]);
        let fat_length_sectors = LittleEndian::read_u32(&boot[36..40]);
        let root_first_cluster = LittleEndian::read_u32(&boot[44..48]);
        let signature_ok = boot[510] == 0x55 && boot[511] == 0xAA;

        if sector_size == 0 {
            return Err(FatError::InvalidGeometry("sector size is zero"));
        }
        if sectors_per_cluster == 0 {
            return Err(FatError::InvalidGeometry("sectors per cluster is zero"));
        }

        let geometry = Geometry {
            sector_size,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            fat_length_sectors,
            root_first_cluster,
            total_sectors,
            signature_ok,
        };

        // The derived offsets must stay representable.
        let fat_span = (num_fats as u64)
            .checked_mul(fat_length_sectors as u64)
            .and_then(|s| s.checked_add(reserved_sectors as u64))
            .and_then(|s| s.checked_mul(sector_size as u64));
        if fat_span.is_none() {
            return Err(FatError::InvalidGeometry("derived offsets overflow"));
        }

        Ok(geometry)
    }

    /// Byte offset of the first FAT.
    pub fn fat_region_offset(&self) -> u64 {
        self.reserved_sectors as u64 * self.sector_size as u64
    }

    /// Byte offset of the data region (cluster 2).
    pub fn data_region_offset(&self) -> u64 {
        (self.reserved_sectors as u64 + self.num_fats as u64 * self.fat_length_sectors as u64)
            * self.sector_size as u64
    }

    /// Allocation unit size in bytes.
    pub fn cluster_size(&self) -> u32 {
        self.sectors_per_cluster * self.sector_size
    }

    /// Number of data clusters the volume can actually address
    ///
    /// Bounded by the data region, by the FAT length, and by the 28-bit
    /// cluster number space.
    pub fn usable_clusters(&self) -> u32 {
        let overhead =
            self.reserved_sectors as u64 + self.num_fats as u64 * self.fat_length_sectors as u64;
        let data_sectors = (self.total_sectors as u64).saturating_sub(overhead);
        let by_data = data_sectors / self.sectors_per_cluster as u64;
        let by_fat =
            (self.fat_length_sectors as u64 * self.sector_size as u64 / 4).saturating_sub(2);
        by_data.min(by_fat).min(MAX_CLUSTERS) as u32
    }

    /// Human-readable notes about values that differ from the layout this
    /// tool was written against. None of them stop the command.
    pub fn warnings(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if !self.signature_ok {
            notes.push("boot sector signature 0x55AA is missing".to_string());
        }
        if self.sector_size != 512 {
            notes.push(format!("sector size is {}, expected 512", self.sector_size));
        }
        if self.sectors_per_cluster != 2 {
            notes.push(format!(
                "sectors per cluster is {}, expected 2",
                self.sectors_per_cluster
            ));
        }
        if self.num_fats != 1 {
            notes.push(format!(
                "volume has {} FATs, only the first will be updated",
                self.num_fats
            ));
        }
        if self.root_first_cluster != 2 {
            notes.push(format!(
                "root directory cluster is {}, expected 2",
                self.root_first_cluster
            ));
        }
        if self.reserved_sectors != 32 {
            notes.push(format!(
                "reserved sector count is {}, expected 32",
                self.reserved_sectors
            ));
        }
        notes
    }
}
