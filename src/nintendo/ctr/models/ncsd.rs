use crate::nintendo::ctr::constants::NCCH_MEDIA_UNIT;
use binrw::{BinRead, BinWrite};

/// The "MultiContainer" of spec.md §3 (MC): NCSD, a cartridge-dump wrapper
/// around up to 8 NCCH partitions (Main/Manual/DownloadPlay/.../UpdateData),
/// identified by the `NCSD` magic at offset 0x100.
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
pub struct MultiContainerHeader {
    #[br(count = 0x100)]
    pub signature: Vec<u8>,
    #[br(assert(&magic == b"NCSD", "bad NCSD magic"))]
    pub magic: [u8; 4],
    pub image_size_media_units: u32,
    pub media_id: u64,
    pub partitions_fs_type: [u8; 8],
    pub partitions_crypt_type: [u8; 8],
    #[br(count = 8)]
    pub partitions: Vec<NcsdPartitionEntry>,
    #[br(count = 0x20)]
    pub ext_header_hash: Vec<u8>,
    pub additional_header_size: u32,
    pub sector_zero_offset: u32,
    pub partition_flags: [u8; 8],
    #[br(count = 8)]
    pub partition_id_table: Vec<u64>,
    #[br(count = 0x30)]
    pub reserved: Vec<u8>,
}

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
pub struct NcsdPartitionEntry {
    pub offset_media_units: u32,
    pub size_media_units: u32,
}

impl NcsdPartitionEntry {
    pub fn is_present(&self) -> bool {
        self.size_media_units != 0
    }

    pub fn byte_offset(&self) -> u64 {
        self.offset_media_units as u64 * NCCH_MEDIA_UNIT
    }

    pub fn byte_size(&self) -> u64 {
        self.size_media_units as u64 * NCCH_MEDIA_UNIT
    }
}

impl MultiContainerHeader {
    pub const SIZE: usize = 0x200;

    /// Partition names in table order, matching GodMode9's fixed labels.
    pub const PARTITION_NAMES: [&'static str; 8] = [
        "Main",
        "Manual",
        "Download Play",
        "Partition4",
        "Partition5",
        "Partition6",
        "N3DSUpdateData",
        "UpdateData",
    ];

    /// Iterate present (non-zero-sized) partitions, matching
    /// `VerifyNcsdFile`'s skip-if-size-zero behavior.
    pub fn present_partitions(&self) -> impl Iterator<Item = (usize, &NcsdPartitionEntry)> {
        self.partitions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_present())
    }
}
