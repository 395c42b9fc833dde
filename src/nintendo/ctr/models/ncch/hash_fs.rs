use binrw::{BinRead, BinWrite};

/// The "Hash File System" of spec.md §3 (HFS): RomFS's IVFC 3-level hash
/// tree. Level 1 is small enough to keep resident (it hashes level 2), level
/// 2 hashes level 3, and level 3 is the actual file data, verified by
/// streaming rather than loading in full (spec.md §4.5/§8 property "large
/// RomFS verifies in bounded memory").
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little, magic = b"IVFC")]
pub struct HashFileSystemHeader {
    pub id: u32,
    pub master_hash_size: u32,
    pub level1: IvfcLevelHeader,
    pub level2: IvfcLevelHeader,
    pub level3: IvfcLevelHeader,
    pub header_size: u32,
    pub reserved: u32,
}

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
pub struct IvfcLevelHeader {
    pub logical_offset: u64,
    pub hash_data_size: u64,
    pub block_size_log2: u32,
    pub reserved: u32,
}

impl IvfcLevelHeader {
    pub fn block_size(&self) -> u64 {
        1u64 << self.block_size_log2
    }
}

impl HashFileSystemHeader {
    pub const HEADER_SIZE: u64 = 0x5C;

    /// Master hash (hashes level 1 in its entirety) begins right after the
    /// fixed-size header.
    pub fn master_hash_offset(&self) -> u64 {
        Self::HEADER_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let header = HashFileSystemHeader {
            id: 0x10000,
            master_hash_size: 0x20,
            level1: IvfcLevelHeader {
                logical_offset: 0,
                hash_data_size: 0x1000,
                block_size_log2: 12,
                reserved: 0,
            },
            level2: IvfcLevelHeader {
                logical_offset: 0x1000,
                hash_data_size: 0x8000,
                block_size_log2: 12,
                reserved: 0,
            },
            level3: IvfcLevelHeader {
                logical_offset: 0x9000,
                hash_data_size: 0x100000,
                block_size_log2: 12,
                reserved: 0,
            },
            header_size: 0x5C,
            reserved: 0,
        };

        let mut buf = Vec::new();
        header.write(&mut Cursor::new(&mut buf)).unwrap();
        assert_eq!(buf.len(), HashFileSystemHeader::HEADER_SIZE as usize);

        let back = HashFileSystemHeader::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(back.level3.block_size(), 0x1000);
        assert_eq!(back.master_hash_offset(), 0x5C);
    }
}
