use binrw::{BinRead, BinWrite};

/// The "HandheldROM" of spec.md §3: a DS/DSi cartridge header. Unlike CIA/TMD
/// containers this is a flat, unencrypted header with no payload hash tree —
/// `verify` is a no-op for this kind (spec.md §4.10 lists HandheldROM verify
/// as "(skip)") and `repackage` only ever touches the TMD/ticket wrapper, per
/// `BuildInstallFromNdsFile` in the original tool.
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
pub struct HandheldRomHeader {
    #[br(count = 12)]
    pub game_title: Vec<u8>,
    pub game_code: [u8; 4],
    pub maker_code: [u8; 2],
    pub unit_code: u8,
    pub encryption_seed_select: u8,
    pub device_capacity: u8,
    #[br(count = 7)]
    pub reserved1: Vec<u8>,
    pub reserved2: u8,
    pub region: u8,
    pub rom_version: u8,
    pub autostart: u8,

    pub arm9_rom_offset: u32,
    pub arm9_entry_address: u32,
    pub arm9_ram_address: u32,
    pub arm9_size: u32,
    pub arm7_rom_offset: u32,
    pub arm7_entry_address: u32,
    pub arm7_ram_address: u32,
    pub arm7_size: u32,

    pub fnt_offset: u32,
    pub fnt_size: u32,
    pub fat_offset: u32,
    pub fat_size: u32,

    pub arm9_overlay_offset: u32,
    pub arm9_overlay_size: u32,
    pub arm7_overlay_offset: u32,
    pub arm7_overlay_size: u32,

    pub normal_card_control: u32,
    pub secure_card_control: u32,
    pub icon_title_offset: u32,
    pub secure_area_checksum: u16,
    pub secure_area_delay: u16,

    pub arm9_autoload_list_ram: u32,
    pub arm7_autoload_list_ram: u32,
    pub secure_area_disable: u64,

    pub total_used_rom_size: u32,
    pub rom_header_size: u32,
    #[br(count = 0x38)]
    pub reserved3: Vec<u8>,

    #[br(count = 0x9C)]
    pub nintendo_logo: Vec<u8>,
    pub nintendo_logo_crc: u16,
    pub header_crc: u16,

    #[br(count = 0x20)]
    pub debugger_reserved: Vec<u8>,

    /// DSi extension block, present only when `unit_code` indicates a DSi or
    /// DSi-enhanced title; absent on plain DS headers.
    #[br(if(unit_code != 0))]
    pub twl_extension: Option<TwlExtension>,
}

#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
pub struct TwlExtension {
    #[br(count = 0x10)]
    pub memory_bank_control: Vec<u8>,
    pub arm9i_rom_offset: u32,
    pub reserved1: u32,
    pub arm9i_ram_address: u32,
    pub arm9i_size: u32,
    pub arm7i_rom_offset: u32,
    #[br(count = 4)]
    pub reserved2: Vec<u8>,
    pub arm7i_ram_address: u32,
    pub arm7i_size: u32,

    #[br(count = 0x10)]
    pub reserved3: Vec<u8>,
    pub total_used_rom_size_twl: u32,
    #[br(count = 0xC)]
    pub reserved4: Vec<u8>,

    pub title_id: u64,
    pub public_savedata_size: u32,
    pub private_savedata_size: u32,
    #[br(count = 0xB0)]
    pub reserved5: Vec<u8>,
}

impl HandheldRomHeader {
    pub const SIZE: usize = 0x200;

    pub fn is_twl(&self) -> bool {
        self.unit_code != 0
    }

    pub fn game_title_str(&self) -> String {
        let end = self.game_title.iter().position(|&b| b == 0).unwrap_or(12);
        String::from_utf8_lossy(&self.game_title[..end]).into_owned()
    }

    pub fn game_code_str(&self) -> String {
        String::from_utf8_lossy(&self.game_code).into_owned()
    }

    /// Title-id-high/low split the way every other container in this crate
    /// exposes it, synthesized from the DSi extension when present.
    pub fn title_id(&self) -> Option<u64> {
        self.twl_extension.as_ref().map(|e| e.title_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_plain_ds() {
        let mut header = plain();
        header.unit_code = 0;
        let mut buf = Vec::new();
        header.write(&mut Cursor::new(&mut buf)).unwrap();
        assert_eq!(buf.len(), HandheldRomHeader::SIZE);

        let back = HandheldRomHeader::read(&mut Cursor::new(&buf)).unwrap();
        assert!(!back.is_twl());
        assert!(back.title_id().is_none());
    }

    #[test]
    fn roundtrip_twl() {
        let mut header = plain();
        header.unit_code = 3;
        header.twl_extension = Some(TwlExtension {
            memory_bank_control: vec![0; 0x10],
            arm9i_rom_offset: 0,
            reserved1: 0,
            arm9i_ram_address: 0,
            arm9i_size: 0,
            arm7i_rom_offset: 0,
            reserved2: vec![0; 4],
            arm7i_ram_address: 0,
            arm7i_size: 0,
            reserved3: vec![0; 0x10],
            total_used_rom_size_twl: 0,
            reserved4: vec![0; 0xC],
            title_id: 0x00048004_00001234,
            public_savedata_size: 0x20000,
            private_savedata_size: 0,
            reserved5: vec![0; 0xB0],
        });

        let mut buf = Vec::new();
        header.write(&mut Cursor::new(&mut buf)).unwrap();
        let back = HandheldRomHeader::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(back.title_id(), Some(0x00048004_00001234));
    }

    fn plain() -> HandheldRomHeader {
        HandheldRomHeader {
            game_title: {
                let mut v = b"TESTGAME".to_vec();
                v.resize(12, 0);
                v
            },
            game_code: *b"ABCD",
            maker_code: *b"01",
            unit_code: 0,
            encryption_seed_select: 0,
            device_capacity: 9,
            reserved1: vec![0; 7],
            reserved2: 0,
            region: 0,
            rom_version: 0,
            autostart: 0,
            arm9_rom_offset: 0x4000,
            arm9_entry_address: 0x2000000,
            arm9_ram_address: 0x2000000,
            arm9_size: 0x10000,
            arm7_rom_offset: 0x8000,
            arm7_entry_address: 0x2380000,
            arm7_ram_address: 0x2380000,
            arm7_size: 0x10000,
            fnt_offset: 0,
            fnt_size: 0,
            fat_offset: 0,
            fat_size: 0,
            arm9_overlay_offset: 0,
            arm9_overlay_size: 0,
            arm7_overlay_offset: 0,
            arm7_overlay_size: 0,
            normal_card_control: 0,
            secure_card_control: 0,
            icon_title_offset: 0,
            secure_area_checksum: 0,
            secure_area_delay: 0,
            arm9_autoload_list_ram: 0,
            arm7_autoload_list_ram: 0,
            secure_area_disable: 0,
            total_used_rom_size: 0x20000,
            rom_header_size: 0x4000,
            reserved3: vec![0; 0x38],
            nintendo_logo: vec![0; 0x9C],
            nintendo_logo_crc: 0,
            header_crc: 0,
            debugger_reserved: vec![0; 0x20],
            twl_extension: None,
        }
    }
}
