use binrw::{BinRead, BinWrite};

/// The "Flat Archive" of spec.md §3 (FA): ExeFS, a flat table of up to 10
/// named sub-files (code, banner, icon, logo, ...) followed by a SHA-256 hash
/// per entry, stored in *reverse* table order (entry 9's hash comes first).
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
pub struct FlatArchiveHeader {
    #[br(count = 10)]
    pub entries: Vec<ExeFsFileHeader>,
    #[br(count = 10)]
    pub hashes: Vec<[u8; 0x20]>,
}

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
pub struct ExeFsFileHeader {
    pub name: [u8; 8],
    pub offset: u32,
    pub size: u32,
}

impl ExeFsFileHeader {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

impl FlatArchiveHeader {
    pub const SIZE: usize = 0x200;

    /// Hash for table entry `index`, stored at `9 - index` in the on-disk
    /// table (GodMode9's thorough ExeFS check walks this same inversion).
    pub fn hash_for_entry(&self, index: usize) -> Option<&[u8; 0x20]> {
        self.hashes.get(9 - index)
    }

    pub fn find(&self, name: &str) -> Option<(usize, &ExeFsFileHeader)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, e)| !e.is_empty() && e.name_str() == name)
    }
}
