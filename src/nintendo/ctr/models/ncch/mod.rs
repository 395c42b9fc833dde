pub mod ext_header;
pub mod exefs;
pub mod hash_fs;

use crate::nintendo::ctr::constants::NCCH_MEDIA_UNIT;
use binrw::{BinRead, BinWrite};

/// The "Secondary Container" of spec.md §3 (SC): a single NCCH, identified by
/// the `NCCH` magic at offset 0x100 of the partition. Holds an optional
/// ExtHeader, ExeFS and RomFS region, each independently offset/sized in
/// media units (0x200 bytes) and independently hash-checked.
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
pub struct NcchHeader {
    #[br(count = 0x100)]
    pub signature: Vec<u8>,

    #[br(assert(&magic == b"NCCH", "bad NCCH magic"))]
    pub magic: [u8; 4],

    pub content_size_media_units: u32,
    pub partition_id: u64,
    pub maker_code: [u8; 2],
    pub version: u16,
    pub seed_hash_check: u32,
    pub program_id: u64,
    #[br(count = 0x10)]
    pub reserved1: Vec<u8>,
    #[br(count = 0x20)]
    pub logo_region_hash: Vec<u8>,
    #[br(count = 0x10)]
    pub product_code: Vec<u8>,
    #[br(count = 0x20)]
    pub ext_header_hash: Vec<u8>,
    pub ext_header_size: u32,
    pub reserved2: u32,
    pub flags: NcchFlags,
    pub plain_region_offset: u32,
    pub plain_region_size: u32,
    pub logo_region_offset: u32,
    pub logo_region_size: u32,
    pub exefs_offset: u32,
    pub exefs_size: u32,
    pub exefs_hash_region_size: u32,
    pub reserved3: u32,
    pub romfs_offset: u32,
    pub romfs_size: u32,
    pub romfs_hash_region_size: u32,
    pub reserved4: u32,
    #[br(count = 0x20)]
    pub exefs_superblock_hash: Vec<u8>,
    #[br(count = 0x20)]
    pub romfs_superblock_hash: Vec<u8>,
}

/// The 8-byte flags field at NCCH header offset 0x188.
#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
pub struct NcchFlags {
    pub reserved0: u8,
    pub reserved1: u8,
    pub reserved2: u8,
    pub crypto_method: u8,
    pub content_platform: u8,
    pub content_type: u8,
    pub content_unit_size_log: u8,
    pub bitmasks: u8,
}

const BIT_FIXED_CRYPTO_KEY: u8 = 1 << 0;
const BIT_NO_MOUNT_ROMFS: u8 = 1 << 1;
const BIT_NO_CRYPTO: u8 = 1 << 2;
const BIT_USES_SEED_CRYPTO: u8 = 1 << 5;

impl NcchFlags {
    pub fn is_fixed_key(&self) -> bool {
        self.bitmasks & BIT_FIXED_CRYPTO_KEY != 0
    }

    pub fn no_romfs(&self) -> bool {
        self.bitmasks & BIT_NO_MOUNT_ROMFS != 0
    }

    pub fn no_crypto(&self) -> bool {
        self.bitmasks & BIT_NO_CRYPTO != 0
    }

    pub fn uses_seed_crypto(&self) -> bool {
        self.bitmasks & BIT_USES_SEED_CRYPTO != 0
    }

    /// Content unit size in bytes: media units shift left by this log2 value.
    pub fn content_unit_size(&self) -> u64 {
        NCCH_MEDIA_UNIT << self.content_unit_size_log
    }

    /// Key slot used for the ExeFS/RomFS secondary key, mirroring
    /// GodMode9's `crypto_method` switch: 0x00 is the original key, later
    /// values select the "7.x"/"9.3"/"9.6" New3DS key generators.
    pub fn secondary_key_slot(&self) -> u8 {
        use crate::nintendo::ctr::constants::*;
        match self.crypto_method {
            0x00 => KEYSLOT_0X2C,
            0x01 => KEYSLOT_0X25,
            0x0A => KEYSLOT_0X18,
            0x0B => KEYSLOT_0X1B,
            _ => KEYSLOT_0X2C,
        }
    }
}

impl NcchHeader {
    pub fn has_ext_header(&self) -> bool {
        self.ext_header_size > 0
    }

    pub fn has_exefs(&self) -> bool {
        self.exefs_offset != 0 && self.exefs_size != 0
    }

    pub fn has_romfs(&self) -> bool {
        self.romfs_offset != 0 && self.romfs_size != 0 && !self.flags.no_romfs()
    }

    pub fn exefs_byte_offset(&self) -> u64 {
        self.exefs_offset as u64 * NCCH_MEDIA_UNIT
    }

    pub fn exefs_byte_size(&self) -> u64 {
        self.exefs_size as u64 * NCCH_MEDIA_UNIT
    }

    pub fn romfs_byte_offset(&self) -> u64 {
        self.romfs_offset as u64 * NCCH_MEDIA_UNIT
    }

    pub fn romfs_byte_size(&self) -> u64 {
        self.romfs_size as u64 * NCCH_MEDIA_UNIT
    }

    pub fn product_code_str(&self) -> String {
        let end = self
            .product_code
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.product_code.len());
        String::from_utf8_lossy(&self.product_code[..end]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> NcchHeader {
        NcchHeader {
            signature: vec![0xAA; 0x100],
            magic: *b"NCCH",
            content_size_media_units: 0x10,
            partition_id: 0x0004000012345600,
            maker_code: *b"00",
            version: 2,
            seed_hash_check: 0,
            program_id: 0x0004000012345600,
            reserved1: vec![0; 0x10],
            logo_region_hash: vec![0; 0x20],
            product_code: {
                let mut v = b"CTR-P-TEST".to_vec();
                v.resize(0x10, 0);
                v
            },
            ext_header_hash: vec![0; 0x20],
            ext_header_size: 0x400,
            reserved2: 0,
            flags: NcchFlags {
                reserved0: 0,
                reserved1: 0,
                reserved2: 0,
                crypto_method: 0,
                content_platform: 1,
                content_type: 2,
                content_unit_size_log: 0,
                bitmasks: 0,
            },
            plain_region_offset: 0,
            plain_region_size: 0,
            logo_region_offset: 0,
            logo_region_size: 0,
            exefs_offset: 4,
            exefs_size: 4,
            exefs_hash_region_size: 1,
            reserved3: 0,
            romfs_offset: 8,
            romfs_size: 8,
            romfs_hash_region_size: 1,
            reserved4: 0,
            exefs_superblock_hash: vec![0; 0x20],
            romfs_superblock_hash: vec![0; 0x20],
        }
    }

    #[test]
    fn roundtrip() {
        let header = sample();
        let mut buf = Vec::new();
        header.write(&mut Cursor::new(&mut buf)).unwrap();
        assert_eq!(buf.len(), 0x200);

        let read_back = NcchHeader::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(read_back.partition_id, header.partition_id);
        assert_eq!(read_back.product_code_str(), "CTR-P-TEST");
        assert!(read_back.has_exefs());
        assert!(read_back.has_romfs());
    }

    #[test]
    fn secondary_key_slot_selection() {
        let mut header = sample();
        header.flags.crypto_method = 0x0B;
        assert_eq!(
            header.flags.secondary_key_slot(),
            crate::nintendo::ctr::constants::KEYSLOT_0X1B
        );
    }
}
