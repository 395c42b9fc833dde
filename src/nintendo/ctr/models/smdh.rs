use binrw::{BinRead, BinWrite};

/// SMDH: the icon/metadata blob stored as the `icon` file inside a title's
/// ExeFS. The toolkit only needs the title strings and region lockout bits
/// to drive `naming::good_name` — icon pixel data is explicitly out of scope
/// (spec.md §1) and isn't modeled here.
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little, magic = b"SMDH")]
pub struct Smdh {
    pub version: u16,
    pub reserved1: u16,
    #[br(count = 16)]
    pub titles: Vec<SmdhTitle>,
    pub region_lockout: u32,
    #[br(count = 0x2C)]
    pub settings: Vec<u8>,
    pub reserved2: u64,
}

/// One per-language entry; index follows Nintendo's fixed language table
/// (0 = Japanese, 1 = English, 2 = French, ...).
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
pub struct SmdhTitle {
    #[br(count = 0x40)]
    pub short_description: Vec<u16>,
    #[br(count = 0x80)]
    pub long_description: Vec<u16>,
    #[br(count = 0x40)]
    pub publisher: Vec<u16>,
}

pub const LANG_ENGLISH: usize = 1;

/// Region lockout bits, matching GetGoodName's compact region-string
/// composition ({J, U/E, E, C, K, T}, `W` standing in for "regionless").
pub const REGION_JAPAN: u32 = 1 << 0;
pub const REGION_NORTH_AMERICA: u32 = 1 << 1;
pub const REGION_EUROPE: u32 = 1 << 2;
pub const REGION_AUSTRALIA: u32 = 1 << 3;
pub const REGION_CHINA: u32 = 1 << 4;
pub const REGION_KOREA: u32 = 1 << 5;
pub const REGION_TAIWAN: u32 = 1 << 6;

impl SmdhTitle {
    pub fn short_description_str(&self) -> String {
        decode_utf16_nul(&self.short_description)
    }
}

fn decode_utf16_nul(units: &[u16]) -> String {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

impl Smdh {
    pub const SIZE: usize = 0x36C0;

    pub fn title(&self, lang: usize) -> Option<&SmdhTitle> {
        self.titles.get(lang)
    }
}
